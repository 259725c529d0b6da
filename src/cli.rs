//! 命令行参数定义
//!
//! 只负责参数的声明和解析，默认值的环境变量回退在 `Config::resolve` 中完成

use std::path::PathBuf;

use clap::Parser;

/// 学习单照片批量评估工具
///
/// 扫描 <输入根目录>/<案例名>/images/ 下的照片，归一化后交给多模态模型评估，
/// 每个案例落盘 result.json / result.md / meta.json，最后生成跨案例汇总
#[derive(Parser, Debug)]
#[command(name = "worksheet_vision_eval", about = "学习单照片批量评估工具")]
pub struct Cli {
    /// 输入根目录（<案例名>/images/ 结构）
    #[arg(long, default_value = "inputs")]
    pub input_dir: PathBuf,

    /// 输出根目录
    #[arg(long, default_value = "outputs")]
    pub output_dir: PathBuf,

    /// 模型名称（缺省时读取 LLM_MODEL_NAME 环境变量）
    #[arg(long)]
    pub model: Option<String>,

    /// 只处理指定名称的单个案例
    #[arg(long)]
    pub case: Option<String>,

    /// 采样温度
    #[arg(long, default_value_t = 0.0)]
    pub temperature: f32,

    /// 自定义提示词文件（整体替换内置提示词）
    #[arg(long)]
    pub prompt_file: Option<PathBuf>,

    /// 同时处理的案例数量上限
    #[arg(long, default_value_t = 1)]
    pub max_concurrent_cases: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["worksheet_vision_eval"]);
        assert_eq!(cli.input_dir, PathBuf::from("inputs"));
        assert_eq!(cli.output_dir, PathBuf::from("outputs"));
        assert!(cli.model.is_none());
        assert!(cli.case.is_none());
        assert_eq!(cli.temperature, 0.0);
        assert!(cli.prompt_file.is_none());
        assert_eq!(cli.max_concurrent_cases, 1);
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "worksheet_vision_eval",
            "--input-dir",
            "data/in",
            "--output-dir",
            "data/out",
            "--model",
            "gemini-2.5-pro",
            "--case",
            "case03",
            "--temperature",
            "0.7",
            "--max-concurrent-cases",
            "4",
        ]);
        assert_eq!(cli.input_dir, PathBuf::from("data/in"));
        assert_eq!(cli.output_dir, PathBuf::from("data/out"));
        assert_eq!(cli.model.as_deref(), Some("gemini-2.5-pro"));
        assert_eq!(cli.case.as_deref(), Some("case03"));
        assert_eq!(cli.temperature, 0.7);
        assert_eq!(cli.max_concurrent_cases, 4);
    }
}

//! 配置管理模块
//!
//! 配置来源的优先级：命令行参数 > 环境变量 > 内置默认值。
//! 凭证只能来自环境变量（或 .env 文件），不提供命令行入口。

use std::path::PathBuf;

use crate::cli::Cli;
use crate::error::ConfigError;
use crate::prompt;

/// 应用程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 输入根目录（<案例名>/images/ 结构）
    pub input_dir: PathBuf,
    /// 输出根目录
    pub output_dir: PathBuf,
    /// 只处理指定名称的案例（None 表示全部）
    pub case_filter: Option<String>,
    /// 采样温度
    pub temperature: f32,
    /// 评估提示词全文（构造时注入，运行期不再读取任何全局状态）
    pub instruction: String,
    /// 同时处理的案例数量上限
    pub max_concurrent_cases: usize,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("inputs"),
            output_dir: PathBuf::from("outputs"),
            case_filter: None,
            temperature: 0.0,
            instruction: prompt::DEFAULT_INSTRUCTION.to_string(),
            max_concurrent_cases: 1,
            llm_api_key: String::new(),
            llm_api_base_url: "http://menshen.xdf.cn/v1".to_string(),
            llm_model_name: "gemini-2.5-flash".to_string(),
        }
    }
}

impl Config {
    /// 从命令行参数和环境变量解析完整配置
    ///
    /// 凭证检查先于一切文件系统访问：缺少 LLM_API_KEY 时
    /// 不读提示词文件，更不扫描任何案例目录。
    ///
    /// # 参数
    /// - `cli`: 已解析的命令行参数
    ///
    /// # 返回
    /// 返回可直接运行的配置；任何缺口都是致命配置错误
    pub async fn resolve(cli: Cli) -> Result<Self, ConfigError> {
        let default = Self::default();

        let llm_api_key = require_credential(std::env::var("LLM_API_KEY").ok())?;

        // 模型名称：命令行 > 环境变量 > 内置默认
        let llm_model_name = cli
            .model
            .or_else(|| std::env::var("LLM_MODEL_NAME").ok())
            .unwrap_or(default.llm_model_name);

        let instruction = prompt::load_instruction(cli.prompt_file.as_deref()).await?;

        Ok(Self {
            input_dir: cli.input_dir,
            output_dir: cli.output_dir,
            case_filter: cli.case,
            temperature: cli.temperature,
            instruction,
            // 0 会让批处理无事可做，静默提升为串行
            max_concurrent_cases: cli.max_concurrent_cases.max(1),
            llm_api_key,
            llm_api_base_url: std::env::var("LLM_API_BASE_URL")
                .unwrap_or(default.llm_api_base_url),
            llm_model_name,
        })
    }
}

/// 校验 API 凭证存在且非空
fn require_credential(value: Option<String>) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingCredential)
}

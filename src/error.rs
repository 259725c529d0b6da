//! 错误类型定义
//!
//! 错误分为两层：
//! - `ConfigError`：启动阶段的致命错误，进程直接以非零状态退出，不处理任何案例
//! - `CaseError`：单个案例的错误，在批处理边界被折叠为结果值，不影响其他案例

use std::path::PathBuf;

use thiserror::Error;

use crate::logger::truncate_text;

/// 配置错误（致命）
///
/// 凭证、提示词文件、输入目录等启动前置条件不满足时产生
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 缺少 API 凭证
    #[error("缺少 LLM_API_KEY，请在环境变量或 .env 文件中设置")]
    MissingCredential,

    /// 提示词文件读取失败
    #[error("无法读取提示词文件 ({}): {source}", .path.display())]
    PromptFileUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// 输入根目录读取失败
    #[error("无法读取输入目录 ({}): {source}", .path.display())]
    InputDirUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// 通过 --case 指定的案例不存在
    #[error("指定的案例不存在: {}", .path.display())]
    CaseNotFound { path: PathBuf },

    /// 输入根目录下没有任何案例
    #[error("在 {} 下没有找到任何案例（期望 <案例名>/images/ 结构）", .path.display())]
    EmptyCaseSet { path: PathBuf },
}

/// 案例错误（非致命）
///
/// 任意一种都只标记当前案例失败，批处理继续执行后续案例
#[derive(Debug, Error)]
pub enum CaseError {
    /// 案例目录中没有可用图片
    #[error("在 {} 中没有找到图片（支持 png/jpg/jpeg/webp）", .dir.display())]
    Input { dir: PathBuf },

    /// 原始图片不可读或无法解码
    #[error("图片解码失败 ({}): {source}", .path.display())]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },

    /// 模型调用失败（网络错误、服务错误或空响应）
    #[error("模型调用失败 (模型: {model}): {source}")]
    Invocation {
        model: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// 模型响应无法收编为结构化结果，原始文本原样保留
    #[error("模型响应无法解析为结构化结果: {}", truncate_text(.raw_text, 120))]
    Schema { raw_text: String },

    /// 案例产物写入失败
    #[error("写入产物失败 ({}): {source}", .path.display())]
    Persist {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

// ========== 便捷构造函数 ==========

impl CaseError {
    /// 创建图片解码错误
    pub fn decode(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        CaseError::Decode {
            path: path.into(),
            source,
        }
    }

    /// 创建模型调用错误
    ///
    /// `source` 接受任何可装箱的错误，包括纯文本描述（如"返回内容为空"）
    pub fn invocation(
        model: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        CaseError::Invocation {
            model: model.into(),
            source: source.into(),
        }
    }

    /// 创建产物写入错误
    pub fn persist(
        path: impl Into<PathBuf>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        CaseError::Persist {
            path: path.into(),
            source: Box::new(source),
        }
    }
}

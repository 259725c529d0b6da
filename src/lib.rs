//! # Worksheet Vision Eval
//!
//! 一个批量评估"学习单/错题本"照片并生成结构化反馈的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 数据模型层（Models）
//! - `models/` - 案例、反馈结果、溯源记录、汇总统计
//! - `WorksheetCase` - 一个待评估的案例（输入子目录）
//! - `FeedbackResult` - 模型返回的结构化反馈
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个案例
//! - `ImagePreprocessor` - 照片归一化能力
//! - `VisionLlmService` - 视觉模型调用能力
//! - `ReportWriter` - 案例产物落盘能力
//! - `Summarizer` - 跨案例汇总能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个案例"的完整处理流程
//! - `CaseCtx` - 上下文封装（案例名 + 序号）
//! - `CaseFlow` - 流程编排（发现 → 预处理 → 模型 → 落盘）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量案例处理器，管理并发和全局统计

pub mod cli;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod prompt;
pub mod services;
pub mod workflow;

// 重新导出常用类型
pub use cli::Cli;
pub use config::Config;
pub use error::{CaseError, ConfigError};
pub use models::{CaseMeta, CaseOutcome, FeedbackResult, Mistake, SummaryStats, WorksheetCase};
pub use orchestrator::App;
pub use services::{ImagePreprocessor, ReportWriter, Summarizer, VisionLlmService, VisionModel};
pub use workflow::{CaseCtx, CaseFlow};

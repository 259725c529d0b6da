//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量案例处理器
//! - 管理应用生命周期（初始化、运行、汇总）
//! - 批量加载案例（Vec<WorksheetCase>）
//! - 控制并发数量（Semaphore）
//! - 隔离单案例失败
//! - 输出全局统计信息并触发汇总
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<WorksheetCase>)
//!     ↓
//! workflow::CaseFlow (处理单个 WorksheetCase)
//!     ↓
//! services (能力层：preprocess / vision_llm / report / summarize)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：batch_processor 管批量，CaseFlow 管单个
//! 2. **向下依赖**：编排层 → workflow → services
//! 3. **无业务逻辑**：只做调度和统计，不做具体业务判断

pub mod batch_processor;

// 重新导出主要类型
pub use batch_processor::App;

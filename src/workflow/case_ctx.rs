//! 案例处理上下文
//!
//! 封装"我正在处理第几个案例"这一信息

use std::fmt::Display;

/// 案例处理上下文
///
/// 包含处理单个案例所需的所有上下文信息
#[derive(Debug, Clone)]
pub struct CaseCtx {
    /// 案例名（即输入子目录名）
    pub case_name: String,

    /// 案例序号（从1开始，仅用于日志显示）
    pub case_index: usize,
}

impl CaseCtx {
    /// 创建新的案例上下文
    pub fn new(case_name: String, case_index: usize) -> Self {
        Self {
            case_name,
            case_index,
        }
    }
}

impl Display for CaseCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[案例#{} {}]", self.case_index, self.case_name)
    }
}

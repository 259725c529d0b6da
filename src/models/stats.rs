//! 跨案例汇总统计模型

use serde::{Deserialize, Serialize};

/// 输出根目录下全部已落盘结果的汇总（summary_stats.json）
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SummaryStats {
    /// 参与统计的案例数量
    pub cases: usize,
    /// 本次运行使用的模型
    pub model: String,
    /// confidence 均值
    pub avg_confidence: f64,
    /// questions_to_student 条数均值
    pub avg_questions_to_student: f64,
    /// 修剪后 image_quality_issues 的频次表
    ///
    /// 次数降序；同次数按首次出现顺序，序列化为 [["问题", 次数], ...]
    pub image_quality_issues_top: Vec<(String, usize)>,
}

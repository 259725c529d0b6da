//! 评估提示词
//!
//! 内置提示词在这里定义，通过配置注入处理流程；
//! 用户可以用 --prompt-file 整体替换，但输出字段契约保持不变

use std::path::Path;

use crate::error::ConfigError;

/// 内置评估提示词
///
/// 与 `FeedbackResult` 的字段一一对应，修改字段时必须同步修改两处
pub const DEFAULT_INSTRUCTION: &str = r#"你是一名批改"学习单/错题本"照片并给学员反馈的辅导老师。
输入是学员上传的照片（可能有多张）。

【必须遵守】
- 不要编造照片中看不到的内容（禁止猜测）
- 字迹或算式看不清时，把确认问题写进 questions_to_student，并调低 confidence
- 反馈以"下一步行动"为中心，写得具体：用什么性质/定理、怎么比较、是哪种错误模式

只输出 JSON，准确填写以下字段：
- summary: 整体一句话总结
- extracted_problem: 题目条件/问题的摘要（仅限照片中可见的范围）
- student_work_summary: 学员解题思路的摘要
- mistakes: [{where, why, fix}] 形式的错误点列表（至少 1 个）
- feedback_actions: 学员马上能执行的行动，3~5 条
- next_practice: 练习同类型题目的小任务，2~4 条
- questions_to_student: 针对不确定之处的确认问题（没有则为空数组）
- image_quality_issues: 照片质量问题（模糊/倾斜/阴影/需要裁剪等）
- confidence: 0~1 之间的数值
"#;

/// 加载评估提示词
///
/// # 参数
/// - `path`: 自定义提示词文件路径；为 `None` 时使用内置提示词
///
/// # 返回
/// 返回提示词全文；文件不可读属于致命配置错误
pub async fn load_instruction(path: Option<&Path>) -> Result<String, ConfigError> {
    match path {
        Some(p) => tokio::fs::read_to_string(p)
            .await
            .map_err(|e| ConfigError::PromptFileUnreadable {
                path: p.to_path_buf(),
                source: e,
            }),
        None => Ok(DEFAULT_INSTRUCTION.to_string()),
    }
}

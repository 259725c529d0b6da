//! 案例产物写入服务 - 业务能力层
//!
//! 只负责"把一个案例的结果落盘"能力，不关心流程
//!
//! 每个案例固定三份产物：
//! - result.json：结构化反馈（线上字段名）
//! - result.md：面向人读的报告
//! - meta.json：溯源记录

use std::path::Path;

use tracing::debug;

use crate::error::CaseError;
use crate::models::CaseOutcome;

/// 案例产物写入服务
///
/// 职责：
/// - 将单个案例的三份产物写入案例输出目录
/// - 只处理单个案例
/// - 不出现 Vec<WorksheetCase>
/// - 不关心流程顺序
pub struct ReportWriter;

impl ReportWriter {
    /// 创建新的产物写入服务
    pub fn new() -> Self {
        Self
    }

    /// 写入全部案例产物
    ///
    /// # 参数
    /// - `case_output_dir`: 案例输出目录（<输出根目录>/<案例名>）
    /// - `outcome`: 案例的完整产出
    ///
    /// # 返回
    /// 任何一份产物写入失败都算整个案例失败
    pub async fn persist(
        &self,
        case_output_dir: &Path,
        outcome: &CaseOutcome,
    ) -> Result<(), CaseError> {
        tokio::fs::create_dir_all(case_output_dir)
            .await
            .map_err(|e| CaseError::persist(case_output_dir, e))?;

        let result_path = case_output_dir.join("result.json");
        let result_json = serde_json::to_string_pretty(&outcome.result)
            .map_err(|e| CaseError::persist(&result_path, e))?;
        tokio::fs::write(&result_path, result_json)
            .await
            .map_err(|e| CaseError::persist(&result_path, e))?;

        let report_path = case_output_dir.join("result.md");
        tokio::fs::write(&report_path, render_report(outcome))
            .await
            .map_err(|e| CaseError::persist(&report_path, e))?;

        let meta_path = case_output_dir.join("meta.json");
        let meta_json = serde_json::to_string_pretty(&outcome.meta)
            .map_err(|e| CaseError::persist(&meta_path, e))?;
        tokio::fs::write(&meta_path, meta_json)
            .await
            .map_err(|e| CaseError::persist(&meta_path, e))?;

        debug!("案例产物已写入: {}", case_output_dir.display());
        Ok(())
    }
}

impl Default for ReportWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// 渲染 result.md 全文
///
/// 小节顺序固定；"确认问题"与"图片质量问题"两节仅在非空时出现
fn render_report(outcome: &CaseOutcome) -> String {
    let result = &outcome.result;
    let meta = &outcome.meta;

    let mut lines: Vec<String> = Vec::new();
    lines.push(format!("# {} - 学习单视觉反馈", meta.case));
    lines.push(format!("- generated_at: {}", meta.generated_at));
    lines.push(format!("- model: {}", meta.model));
    lines.push(format!("- confidence: {}", result.confidence));

    lines.push(format!("\n## 总结\n{}", result.summary));
    lines.push(format!(
        "\n## 题目摘要（可见范围）\n{}",
        result.extracted_problem
    ));
    lines.push(format!("\n## 学员解题思路\n{}", result.student_work_summary));

    lines.push("\n## 错误点".to_string());
    for (i, mistake) in result.mistakes.iter().enumerate() {
        lines.push(format!("### {}. {}", i + 1, mistake.location));
        lines.push(format!("- 为什么是问题: {}", mistake.rationale));
        lines.push(format!("- 如何改正: {}", mistake.remedy));
    }

    lines.push("\n## 下一步行动（清单）".to_string());
    for action in &result.feedback_actions {
        lines.push(format!("- {}", action));
    }

    lines.push("\n## 后续练习（任务）".to_string());
    for task in &result.next_practice {
        lines.push(format!("- {}", task));
    }

    if !result.questions_to_student.is_empty() {
        lines.push("\n## 确认问题（不确定处）".to_string());
        for question in &result.questions_to_student {
            lines.push(format!("- {}", question));
        }
    }

    if !result.image_quality_issues.is_empty() {
        lines.push("\n## 图片质量问题".to_string());
        for issue in &result.image_quality_issues {
            lines.push(format!("- {}", issue));
        }
    }

    lines.join("\n")
}

//! 汇总统计服务 - 业务能力层
//!
//! 扫描输出根目录下所有已落盘的 result.json（跨运行累积），
//! 计算整体统计并写出 summary_stats.json 与 summary_report.md
//!
//! 汇总只认磁盘上的产物，不依赖本次运行的内存状态：
//! 之前运行留下的案例同样计入

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::models::{FeedbackResult, SummaryStats};

/// 频次表保留的条目数
const TOP_ISSUES: usize = 10;

/// 汇总统计服务
///
/// 职责：
/// - 收集输出根目录下全部 result.json
/// - 计算均值与问题频次表
/// - 写出两份汇总产物
/// - 不参与单个案例的处理
pub struct Summarizer;

impl Summarizer {
    /// 创建新的汇总统计服务
    pub fn new() -> Self {
        Self
    }

    /// 汇总输出根目录下的全部结果
    ///
    /// # 参数
    /// - `output_root`: 输出根目录
    /// - `model`: 本次运行使用的模型（记入统计）
    ///
    /// # 返回
    /// 没有任何可读结果时返回 Ok(None)，此时不写任何汇总文件
    pub async fn summarize(
        &self,
        output_root: &Path,
        model: &str,
    ) -> Result<Option<SummaryStats>> {
        let results = collect_results(output_root).await?;
        if results.is_empty() {
            return Ok(None);
        }

        let stats = build_stats(&results, model);

        let stats_path = output_root.join("summary_stats.json");
        let stats_json = serde_json::to_string_pretty(&stats).context("序列化汇总统计失败")?;
        tokio::fs::write(&stats_path, stats_json)
            .await
            .with_context(|| format!("写入 {} 失败", stats_path.display()))?;

        let report_path = output_root.join("summary_report.md");
        tokio::fs::write(&report_path, render_summary(&stats))
            .await
            .with_context(|| format!("写入 {} 失败", report_path.display()))?;

        Ok(Some(stats))
    }
}

impl Default for Summarizer {
    fn default() -> Self {
        Self::new()
    }
}

/// 收集所有案例子目录中的 result.json（按目录名字典序）
///
/// 单个文件不可读或不合规时跳过并告警，不拖垮整体汇总
async fn collect_results(output_root: &Path) -> Result<Vec<FeedbackResult>> {
    let mut entries = match tokio::fs::read_dir(output_root).await {
        Ok(entries) => entries,
        // 输出根目录还不存在，等同于没有结果
        Err(_) => return Ok(Vec::new()),
    };

    let mut case_dirs: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.is_dir() {
            case_dirs.push(path);
        }
    }
    case_dirs.sort();

    let mut results = Vec::new();
    for case_dir in case_dirs {
        let result_path = case_dir.join("result.json");
        if !result_path.is_file() {
            continue;
        }
        let text = match tokio::fs::read_to_string(&result_path).await {
            Ok(text) => text,
            Err(e) => {
                warn!("⚠️ 跳过不可读的结果文件 {}: {}", result_path.display(), e);
                continue;
            }
        };
        match serde_json::from_str::<FeedbackResult>(&text) {
            Ok(result) => results.push(result),
            Err(e) => {
                warn!("⚠️ 跳过不合规的结果文件 {}: {}", result_path.display(), e);
            }
        }
    }

    debug!("汇总到 {} 份结果", results.len());
    Ok(results)
}

/// 折叠统计：均值与问题频次表
fn build_stats(results: &[FeedbackResult], model: &str) -> SummaryStats {
    let cases = results.len();
    let avg_confidence = results.iter().map(|r| r.confidence).sum::<f64>() / cases as f64;
    let avg_questions_to_student = results
        .iter()
        .map(|r| r.questions_to_student.len())
        .sum::<usize>() as f64
        / cases as f64;

    // 修剪空白后按首次出现顺序计数；纯空白条目修剪后并入空串键
    let mut counter: IndexMap<String, usize> = IndexMap::new();
    for result in results {
        for issue in &result.image_quality_issues {
            *counter.entry(issue.trim().to_string()).or_insert(0) += 1;
        }
    }

    // 次数降序；同次数按首次出现顺序（显式带序号，不依赖容器迭代细节）
    let mut entries: Vec<(usize, String, usize)> = counter
        .into_iter()
        .enumerate()
        .map(|(seen, (issue, count))| (seen, issue, count))
        .collect();
    entries.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));
    entries.truncate(TOP_ISSUES);

    SummaryStats {
        cases,
        model: model.to_string(),
        avg_confidence,
        avg_questions_to_student,
        image_quality_issues_top: entries
            .into_iter()
            .map(|(_, issue, count)| (issue, count))
            .collect(),
    }
}

/// 渲染 summary_report.md 全文
fn render_summary(stats: &SummaryStats) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push("# 学习单视觉反馈批量汇总".to_string());
    lines.push(format!("- cases: {}", stats.cases));
    lines.push(format!("- model: {}", stats.model));
    lines.push(format!("- avg_confidence: {:.3}", stats.avg_confidence));
    lines.push(format!(
        "- avg_questions_to_student: {:.2}",
        stats.avg_questions_to_student
    ));

    lines.push("\n## image_quality_issues Top".to_string());
    if stats.image_quality_issues_top.is_empty() {
        lines.push("- (无)".to_string());
    } else {
        for (issue, count) in &stats.image_quality_issues_top {
            lines.push(format!("- {}: {}", issue, count));
        }
    }

    lines.push("\n## 解读与下一步".to_string());
    lines.push(
        "- avg_confidence 偏低或 questions_to_student 偏多时，优先改进上传引导（正面拍摄、光线充足、裁剪到题目区域），或启用人工复核"
            .to_string(),
    );
    lines.push("- 按 image_quality_issues Top 的分布调整拍摄提示文案，高频问题写在最前".to_string());

    lines.join("\n")
}

//! 批量案例处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量案例的处理和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：启动日志、准备输出根目录、创建视觉模型服务
//! 2. **批量加载**：扫描并加载所有待处理的案例（`Vec<WorksheetCase>`）
//! 3. **并发控制**：使用 Semaphore 限制并发数量
//! 4. **分批处理**：将案例分批次处理，每批完成后再开始下一批
//! 5. **失败隔离**：单个案例失败只计入统计，不中断其余案例
//! 6. **全局统计**：汇总所有案例的处理结果并触发跨运行汇总
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单个案例的细节
//! - **向下委托**：委托 workflow::CaseFlow 处理单个案例
//! - **并发安全**：通过 Semaphore 和 tokio::spawn 实现并发

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Semaphore;
use tracing::{error, info};

use crate::config::Config;
use crate::models::{discover_cases, SummaryStats, WorksheetCase};
use crate::services::{Summarizer, VisionLlmService, VisionModel};
use crate::workflow::{CaseCtx, CaseFlow};

/// 应用主结构
pub struct App {
    config: Config,
    flow: Arc<CaseFlow>,
    model_name: String,
    summarizer: Summarizer,
}

impl App {
    /// 初始化应用
    ///
    /// 使用配置里的网关凭证构建真实的视觉模型服务
    pub fn initialize(config: Config) -> Result<Self> {
        // 准备输出根目录
        fs::create_dir_all(&config.output_dir)
            .with_context(|| format!("无法创建输出根目录 {}", config.output_dir.display()))?;

        log_startup(&config);

        let model: Arc<dyn VisionModel> = Arc::new(VisionLlmService::new(&config));
        Ok(Self::with_model(config, model))
    }

    /// 用指定的视觉模型组装应用
    ///
    /// 测试或二次封装时从这里注入模型实现
    pub fn with_model(config: Config, model: Arc<dyn VisionModel>) -> Self {
        let model_name = model.model_name().to_string();
        let flow = Arc::new(CaseFlow::new(&config, model));
        Self {
            config,
            flow,
            model_name,
            summarizer: Summarizer::new(),
        }
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        // 加载所有待处理的案例
        let all_cases =
            discover_cases(&self.config.input_dir, self.config.case_filter.as_deref()).await?;

        let total_cases = all_cases.len();
        log_cases_loaded(total_cases, self.config.max_concurrent_cases);

        // 处理所有案例
        let stats = self.process_all_cases(all_cases).await?;

        // 输出最终统计
        print_final_stats(&stats, &self.config);

        // 汇总磁盘上的全部已落盘结果（含之前运行留下的）
        if let Some(summary) = self
            .summarizer
            .summarize(&self.config.output_dir, &self.model_name)
            .await?
        {
            log_summary_written(&summary, &self.config.output_dir);
        }

        Ok(())
    }

    /// 处理所有案例
    async fn process_all_cases(&self, all_cases: Vec<WorksheetCase>) -> Result<ProcessingStats> {
        let max_concurrent = self.config.max_concurrent_cases;
        let semaphore = Arc::new(Semaphore::new(max_concurrent));
        let total_cases = all_cases.len();
        let mut stats = ProcessingStats {
            total: total_cases,
            ..Default::default()
        };

        // 分批处理
        for batch_start in (0..total_cases).step_by(max_concurrent) {
            let batch_end = (batch_start + max_concurrent).min(total_cases);
            let batch_cases = &all_cases[batch_start..batch_end];
            let batch_num = (batch_start / max_concurrent) + 1;
            let total_batches = (total_cases + max_concurrent - 1) / max_concurrent;

            log_batch_start(
                batch_num,
                total_batches,
                batch_start + 1,
                batch_end,
                total_cases,
            );

            // 处理本批
            let batch_result = self
                .process_batch(batch_cases, batch_start, semaphore.clone())
                .await?;

            stats.success += batch_result.success;
            stats.failed += batch_result.failed;

            log_batch_complete(batch_num, &batch_result);
        }

        Ok(stats)
    }

    /// 处理单个批次
    async fn process_batch(
        &self,
        batch_cases: &[WorksheetCase],
        batch_start: usize,
        semaphore: Arc<Semaphore>,
    ) -> Result<BatchResult> {
        let mut batch_handles = Vec::new();

        // 为本批创建并发任务
        for (idx, case) in batch_cases.iter().enumerate() {
            let case_index = batch_start + idx + 1;
            let permit = semaphore.clone().acquire_owned().await?;

            let flow = self.flow.clone();
            let case = case.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let ctx = CaseCtx::new(case.name.clone(), case_index);
                log_case_start(&ctx, &case);

                match flow.run(&case, &ctx).await {
                    Ok(outcome) => {
                        info!(
                            "[案例 {}] ✅ {} 处理完成 (confidence: {})",
                            ctx.case_index, ctx.case_name, outcome.result.confidence
                        );
                        Ok(outcome)
                    }
                    Err(e) => {
                        error!(
                            "[案例 {}] ❌ {} 处理失败: {}",
                            ctx.case_index, ctx.case_name, e
                        );
                        Err(e)
                    }
                }
            });
            batch_handles.push((case_index, handle));
        }

        // 等待本批所有任务完成
        let mut result = BatchResult::default();

        for (case_index, handle) in batch_handles {
            match handle.await {
                Ok(Ok(_)) => {
                    result.success += 1;
                }
                Ok(Err(_)) => {
                    result.failed += 1;
                }
                Err(e) => {
                    error!("[案例 {}] 任务执行失败: {}", case_index, e);
                    result.failed += 1;
                }
            }
        }

        Ok(result)
    }
}

/// 处理统计
#[derive(Debug, Default)]
struct ProcessingStats {
    success: usize,
    failed: usize,
    total: usize,
}

/// 批次处理结果
#[derive(Debug, Default)]
struct BatchResult {
    success: usize,
    failed: usize,
}

// ========== 日志辅助函数 ==========

fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 学习单批量评估模式");
    info!("📊 模型: {}", config.llm_model_name);
    info!("📊 最大并发数: {}", config.max_concurrent_cases);
    info!("{}", "=".repeat(60));
}

fn log_cases_loaded(total: usize, max_concurrent: usize) {
    info!("✓ 找到 {} 个待处理的案例", total);
    info!("📋 将以每批 {} 个的方式处理", max_concurrent);
    info!("💡 每批完成后再开始下一批\n");
}

fn log_batch_start(batch_num: usize, total_batches: usize, start: usize, end: usize, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 批", batch_num, total_batches);
    info!("📄 本批案例: {}-{} / 共 {} 个", start, end, total);
    info!("{}", "=".repeat(60));
}

fn log_case_start(ctx: &CaseCtx, case: &WorksheetCase) {
    info!("[案例 {}] 开始处理", ctx.case_index);
    info!("[案例 {}] 名称: {}", ctx.case_index, ctx.case_name);
    info!("[案例 {}] 目录: {}", ctx.case_index, case.dir.display());
}

fn log_batch_complete(batch_num: usize, result: &BatchResult) {
    info!("\n{}", "─".repeat(60));
    info!(
        "✓ 第 {} 批完成: 成功 {}/{}",
        batch_num,
        result.success,
        result.success + result.failed
    );
    info!("{}", "─".repeat(60));
}

fn print_final_stats(stats: &ProcessingStats, config: &Config) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", stats.success, stats.total);
    info!("❌ 失败: {}", stats.failed);
    info!("{}", "=".repeat(60));
    info!("\n产物根目录: {}", config.output_dir.display());
}

fn log_summary_written(summary: &SummaryStats, output_root: &Path) {
    info!("\n{}", "=".repeat(60));
    info!("🎉 全部完成！汇总统计已生成");
    info!("📄 {}", output_root.join("summary_report.md").display());
    info!("📄 {}", output_root.join("summary_stats.json").display());
    info!(
        "📊 累计案例: {}，平均置信度: {:.3}",
        summary.cases, summary.avg_confidence
    );
    info!("{}", "=".repeat(60));
}

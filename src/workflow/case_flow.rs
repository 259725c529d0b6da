//! 案例处理流程 - 流程层
//!
//! 核心职责：定义"一个案例"的完整处理流程
//!
//! 流程顺序：
//! 1. 发现原始图片（字典序）
//! 2. 逐张预处理（灰度 + 对比度/亮度/锐化）
//! 3. 调用视觉模型生成结构化反馈
//! 4. 落盘 result.json / result.md / meta.json

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::error::CaseError;
use crate::models::{CaseMeta, CaseOutcome, WorksheetCase};
use crate::services::{ImagePreprocessor, ReportWriter, VisionModel};
use crate::workflow::case_ctx::CaseCtx;

/// 案例处理流程
///
/// - 编排完整的单案例处理流程
/// - 决定何时预处理、何时调用模型、何时落盘
/// - 任一环节失败立即返回，失败只影响本案例
/// - 不持有批处理资源（信号量在编排层）
pub struct CaseFlow {
    preprocessor: ImagePreprocessor,
    model: Arc<dyn VisionModel>,
    report_writer: ReportWriter,
    instruction: String,
    temperature: f32,
    output_dir: PathBuf,
}

impl CaseFlow {
    /// 创建新的案例处理流程
    pub fn new(config: &Config, model: Arc<dyn VisionModel>) -> Self {
        Self {
            preprocessor: ImagePreprocessor::new(),
            model,
            report_writer: ReportWriter::new(),
            instruction: config.instruction.clone(),
            temperature: config.temperature,
            output_dir: config.output_dir.clone(),
        }
    }

    pub async fn run(
        &self,
        case: &WorksheetCase,
        ctx: &CaseCtx,
    ) -> Result<CaseOutcome, CaseError> {
        let case_output_dir = self.output_dir.join(&case.name);

        // ========== 流程 1: 发现原始图片 ==========
        let raw_images = case.list_raw_images()?;
        info!(
            "[案例 {}] 🔍 找到 {} 张原始图片",
            ctx.case_index,
            raw_images.len()
        );

        // ========== 流程 2: 逐张预处理 ==========
        let mut preprocessed = Vec::with_capacity(raw_images.len());
        for raw_path in &raw_images {
            let out_path = self.preprocessor.normalize(raw_path, &case_output_dir)?;
            preprocessed.push(out_path);
        }
        info!(
            "[案例 {}] ✓ 预处理完成，共 {} 张",
            ctx.case_index,
            preprocessed.len()
        );

        // ========== 流程 3: 调用视觉模型 ==========
        info!(
            "[案例 {}] 📤 调用视觉模型 {} 生成反馈...",
            ctx.case_index,
            self.model.model_name()
        );

        let result = self
            .model
            .generate_feedback(&self.instruction, &preprocessed, self.temperature)
            .await?;

        // ========== 流程 4: 落盘产物 ==========
        let meta = CaseMeta::new(
            &case.name,
            self.model.model_name(),
            &raw_images,
            &preprocessed,
            self.temperature,
        );
        let outcome = CaseOutcome { result, meta };

        self.report_writer
            .persist(&case_output_dir, &outcome)
            .await?;

        info!(
            "[案例 {}] ✓ 产物已写入 {}",
            ctx.case_index,
            case_output_dir.display()
        );

        Ok(outcome)
    }
}

//! 反馈结果数据模型
//!
//! 与推理服务约定的输出契约：字段集合固定，多出或缺少字段都视为不合规。
//! 序列化产物 result.json 使用线上字段名（where/why/fix）。

use std::path::PathBuf;

use chrono::Local;
use serde::{Deserialize, Serialize};

/// 单个错误点
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Mistake {
    /// 错在哪里
    #[serde(rename = "where")]
    pub location: String,
    /// 为什么是问题
    #[serde(rename = "why")]
    pub rationale: String,
    /// 怎么改正
    #[serde(rename = "fix")]
    pub remedy: String,
}

/// 推理服务返回的结构化反馈（一个案例一份）
///
/// 数组字段的条数要求（mistakes 至少 1 条等）写在提示词里，属于软约束：
/// 解析时只校验字段集合与类型，不校验条数
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FeedbackResult {
    /// 整体一句话总结
    pub summary: String,
    /// 题目条件/问题摘要（仅限照片可见范围）
    pub extracted_problem: String,
    /// 学员解题思路摘要
    pub student_work_summary: String,
    /// 错误点列表
    pub mistakes: Vec<Mistake>,
    /// 马上能执行的行动
    pub feedback_actions: Vec<String>,
    /// 同类型题目的练习任务
    pub next_practice: Vec<String>,
    /// 针对不确定之处的确认问题
    pub questions_to_student: Vec<String>,
    /// 照片质量问题（模糊/倾斜/阴影等）
    pub image_quality_issues: Vec<String>,
    /// 模型自报的可靠度，名义区间 [0,1]，原样透传不做裁剪
    pub confidence: f64,
}

/// 案例溯源记录（meta.json）
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CaseMeta {
    /// 案例名
    pub case: String,
    /// 使用的模型
    pub model: String,
    /// 原始图片路径（处理顺序）
    pub raw_images: Vec<String>,
    /// 归一化后图片路径（与原始图片一一对应）
    pub preprocessed_images: Vec<String>,
    /// 采样温度
    pub temperature: f32,
    /// 生成时间（本地时间，秒级精度）
    pub generated_at: String,
}

impl CaseMeta {
    /// 生成带当前本地时间戳的溯源记录
    pub fn new(
        case: &str,
        model: &str,
        raw_images: &[PathBuf],
        preprocessed_images: &[PathBuf],
        temperature: f32,
    ) -> Self {
        Self {
            case: case.to_string(),
            model: model.to_string(),
            raw_images: raw_images.iter().map(|p| p.display().to_string()).collect(),
            preprocessed_images: preprocessed_images
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            temperature,
            generated_at: Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }
}

/// 一个成功案例的完整产出
#[derive(Clone, Debug)]
pub struct CaseOutcome {
    /// 结构化反馈
    pub result: FeedbackResult,
    /// 溯源记录
    pub meta: CaseMeta,
}

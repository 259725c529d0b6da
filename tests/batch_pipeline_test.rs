//! 批量评估管线端到端测试
//!
//! 用桩模型替换真实视觉模型，覆盖从案例发现到汇总落盘的完整链路。
//! 最后一个用例需要真实网关凭证，默认忽略。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{GrayImage, Luma};
use serde_json::Value;

use worksheet_vision_eval::config::Config;
use worksheet_vision_eval::error::{CaseError, ConfigError};
use worksheet_vision_eval::logger;
use worksheet_vision_eval::models::{FeedbackResult, Mistake, SummaryStats};
use worksheet_vision_eval::orchestrator::App;
use worksheet_vision_eval::services::VisionModel;

/// 固定返回同一份反馈的桩模型
struct StubVisionModel {
    result: FeedbackResult,
}

#[async_trait::async_trait]
impl VisionModel for StubVisionModel {
    fn model_name(&self) -> &str {
        "stub-vision"
    }

    async fn generate_feedback(
        &self,
        _instruction: &str,
        _image_paths: &[PathBuf],
        _temperature: f32,
    ) -> Result<FeedbackResult, CaseError> {
        Ok(self.result.clone())
    }
}

/// 每次调用都失败的桩模型
struct FailingVisionModel;

#[async_trait::async_trait]
impl VisionModel for FailingVisionModel {
    fn model_name(&self) -> &str {
        "failing-vision"
    }

    async fn generate_feedback(
        &self,
        _instruction: &str,
        _image_paths: &[PathBuf],
        _temperature: f32,
    ) -> Result<FeedbackResult, CaseError> {
        Err(CaseError::invocation("failing-vision", "桩模型注定失败"))
    }
}

/// 生成一张带灰度渐变的测试照片
fn write_test_image(path: &Path) {
    let img = GrayImage::from_fn(24, 24, |x, y| Luma([((x * 7 + y * 5) % 256) as u8]));
    img.save(path).unwrap();
}

/// 搭建 <输入根>/<案例名>/images/ 并写入照片
fn make_case_with_images(input_root: &Path, case: &str, files: &[&str]) {
    let images_dir = input_root.join(case).join("images");
    std::fs::create_dir_all(&images_dir).unwrap();
    for file in files {
        write_test_image(&images_dir.join(file));
    }
}

/// 批量评估用的基础配置（桩模型下凭证与网关字段不参与）
fn test_config(input_dir: &Path, output_dir: &Path) -> Config {
    Config {
        input_dir: input_dir.to_path_buf(),
        output_dir: output_dir.to_path_buf(),
        temperature: 0.5,
        instruction: "请评估这份学习单".to_string(),
        max_concurrent_cases: 2,
        llm_api_key: "test-key".to_string(),
        ..Config::default()
    }
}

/// 一份字段齐全的桩反馈
fn stub_feedback(confidence: f64, questions: &[&str], issues: &[&str]) -> FeedbackResult {
    FeedbackResult {
        summary: "整体思路正确，计算有一处粗心".to_string(),
        extracted_problem: "解一元二次方程 x^2-5x+6=0".to_string(),
        student_work_summary: "用因式分解法，第二步符号写反".to_string(),
        mistakes: vec![Mistake {
            location: "第二步因式分解".to_string(),
            rationale: "符号写反导致两个根都错误".to_string(),
            remedy: "展开 (x-2)(x-3) 验算后重写".to_string(),
        }],
        feedback_actions: vec![
            "用代入法验算两个根".to_string(),
            "把第二步重写一遍".to_string(),
            "总结一条符号检查口诀".to_string(),
        ],
        next_practice: vec![
            "再做 3 道因式分解解方程".to_string(),
            "做 1 道含负系数的同类题".to_string(),
        ],
        questions_to_student: questions.iter().map(|s| s.to_string()).collect(),
        image_quality_issues: issues.iter().map(|s| s.to_string()).collect(),
        confidence,
    }
}

fn stub_app(config: Config, result: FeedbackResult) -> App {
    App::with_model(config, Arc::new(StubVisionModel { result }))
}

#[tokio::test]
async fn test_batch_run_writes_case_artifacts_and_summary() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    make_case_with_images(input.path(), "case01", &["b.png", "a.jpg"]);
    make_case_with_images(input.path(), "case02", &["only.png"]);

    let app = stub_app(
        test_config(input.path(), output.path()),
        stub_feedback(0.4, &["q1", "q2"], &["模糊"]),
    );
    app.run().await.expect("批量运行应该成功");

    // 每个案例的三份文字产物都已落盘
    for case in ["case01", "case02"] {
        let case_dir = output.path().join(case);
        assert!(case_dir.join("result.json").is_file());
        assert!(case_dir.join("result.md").is_file());
        assert!(case_dir.join("meta.json").is_file());
    }

    // 预处理产物统一为 PNG，主名沿用原文件
    assert!(output.path().join("case01/preprocessed/a.png").is_file());
    assert!(output.path().join("case01/preprocessed/b.png").is_file());
    assert!(output.path().join("case02/preprocessed/only.png").is_file());

    // 汇总统计覆盖两个案例
    let stats_text = std::fs::read_to_string(output.path().join("summary_stats.json")).unwrap();
    let stats: SummaryStats = serde_json::from_str(&stats_text).unwrap();
    assert_eq!(stats.cases, 2);
    assert_eq!(stats.model, "stub-vision");
    assert!((stats.avg_confidence - 0.4).abs() < 1e-9);
    assert!((stats.avg_questions_to_student - 2.0).abs() < 1e-9);
    assert_eq!(
        stats.image_quality_issues_top,
        vec![("模糊".to_string(), 2)]
    );

    let report = std::fs::read_to_string(output.path().join("summary_report.md")).unwrap();
    assert!(report.contains("- cases: 2"));
    assert!(report.contains("- 模糊: 2"));
}

#[tokio::test]
async fn test_result_json_uses_wire_field_names() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    make_case_with_images(input.path(), "case01", &["a.png"]);

    let app = stub_app(
        test_config(input.path(), output.path()),
        stub_feedback(0.9, &["看不清第 3 行"], &[]),
    );
    app.run().await.unwrap();

    let text = std::fs::read_to_string(output.path().join("case01/result.json")).unwrap();
    let value: Value = serde_json::from_str(&text).unwrap();

    // 顶层字段集合与线上契约完全一致
    let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(|k| k.as_str()).collect();
    keys.sort_unstable();
    assert_eq!(
        keys,
        vec![
            "confidence",
            "extracted_problem",
            "feedback_actions",
            "image_quality_issues",
            "mistakes",
            "next_practice",
            "questions_to_student",
            "student_work_summary",
            "summary",
        ]
    );

    // 错误点使用 where/why/fix 线上字段名
    let mut mistake_keys: Vec<&str> = value["mistakes"][0]
        .as_object()
        .unwrap()
        .keys()
        .map(|k| k.as_str())
        .collect();
    mistake_keys.sort_unstable();
    assert_eq!(mistake_keys, vec!["fix", "where", "why"]);

    // 溯源记录指向正确的案例与模型
    let meta_text = std::fs::read_to_string(output.path().join("case01/meta.json")).unwrap();
    let meta: Value = serde_json::from_str(&meta_text).unwrap();
    assert_eq!(meta["case"], "case01");
    assert_eq!(meta["model"], "stub-vision");
    assert_eq!(meta["temperature"], 0.5);
    assert_eq!(meta["raw_images"].as_array().unwrap().len(), 1);
    assert_eq!(meta["preprocessed_images"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_failed_case_is_isolated() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    make_case_with_images(input.path(), "case01", &["a.jpg", "b.png"]);
    // case02 连 images/ 都没有，属于案例级输入错误
    std::fs::create_dir_all(input.path().join("case02")).unwrap();

    let app = stub_app(
        test_config(input.path(), output.path()),
        stub_feedback(0.4, &["q1", "q2"], &[]),
    );
    app.run().await.expect("单案例失败不应中断批量运行");

    assert!(output.path().join("case01/result.json").is_file());
    assert!(!output.path().join("case02/result.json").exists());

    // 汇总只统计成功案例
    let stats_text = std::fs::read_to_string(output.path().join("summary_stats.json")).unwrap();
    let stats: SummaryStats = serde_json::from_str(&stats_text).unwrap();
    assert_eq!(stats.cases, 1);
    assert!((stats.avg_confidence - 0.4).abs() < 1e-9);
    assert!((stats.avg_questions_to_student - 2.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_failing_model_leaves_no_summary() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    make_case_with_images(input.path(), "case01", &["a.png"]);

    let app = App::with_model(
        test_config(input.path(), output.path()),
        Arc::new(FailingVisionModel),
    );
    app.run().await.expect("调用失败属于案例级错误");

    assert!(!output.path().join("case01/result.json").exists());
    assert!(!output.path().join("summary_stats.json").exists());
    assert!(!output.path().join("summary_report.md").exists());
}

#[tokio::test]
async fn test_missing_input_root_is_fatal() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(&root.path().join("不存在"), &root.path().join("out"));

    let app = stub_app(config, stub_feedback(0.9, &[], &[]));
    let err = app.run().await.unwrap_err();

    let config_err = err.downcast_ref::<ConfigError>().expect("应是配置错误");
    assert!(matches!(config_err, ConfigError::InputDirUnreadable { .. }));
}

#[tokio::test]
async fn test_case_filter_miss_is_fatal() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    make_case_with_images(input.path(), "case01", &["a.png"]);

    let mut config = test_config(input.path(), output.path());
    config.case_filter = Some("case99".to_string());

    let app = stub_app(config, stub_feedback(0.9, &[], &[]));
    let err = app.run().await.unwrap_err();

    let config_err = err.downcast_ref::<ConfigError>().expect("应是配置错误");
    assert!(matches!(config_err, ConfigError::CaseNotFound { .. }));
}

#[tokio::test]
async fn test_case_filter_runs_only_named_case() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    make_case_with_images(input.path(), "case01", &["a.png"]);
    make_case_with_images(input.path(), "case02", &["a.png"]);

    let mut config = test_config(input.path(), output.path());
    config.case_filter = Some("case02".to_string());

    let app = stub_app(config, stub_feedback(0.7, &[], &[]));
    app.run().await.unwrap();

    assert!(!output.path().join("case01").exists());
    assert!(output.path().join("case02/result.json").is_file());
}

#[tokio::test]
async fn test_summary_accumulates_across_runs() {
    let input_a = tempfile::tempdir().unwrap();
    let input_b = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    make_case_with_images(input_a.path(), "case01", &["a.png"]);
    make_case_with_images(input_b.path(), "case02", &["a.png"]);

    stub_app(
        test_config(input_a.path(), output.path()),
        stub_feedback(0.2, &[], &[]),
    )
    .run()
    .await
    .unwrap();

    stub_app(
        test_config(input_b.path(), output.path()),
        stub_feedback(0.8, &[], &[]),
    )
    .run()
    .await
    .unwrap();

    // 第二次运行的汇总把第一次落盘的结果一并计入
    let stats_text = std::fs::read_to_string(output.path().join("summary_stats.json")).unwrap();
    let stats: SummaryStats = serde_json::from_str(&stats_text).unwrap();
    assert_eq!(stats.cases, 2);
    assert!((stats.avg_confidence - 0.5).abs() < 1e-9);
}

#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_live_gateway_batch() {
    // 初始化日志
    logger::init();

    // 凭证来自环境变量
    let api_key = std::env::var("LLM_API_KEY").expect("需要设置 LLM_API_KEY");

    // 搭建一个最小案例
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    make_case_with_images(input.path(), "live_case", &["sample.png"]);

    let mut config = test_config(input.path(), output.path());
    config.llm_api_key = api_key;
    config.instruction = worksheet_vision_eval::prompt::DEFAULT_INSTRUCTION.to_string();
    if let Ok(base) = std::env::var("LLM_API_BASE_URL") {
        config.llm_api_base_url = base;
    }
    if let Ok(model) = std::env::var("LLM_MODEL_NAME") {
        config.llm_model_name = model;
    }

    let app = App::initialize(config).expect("初始化应用失败");
    app.run().await.expect("批量运行失败");

    let result_path = output.path().join("live_case").join("result.json");
    println!("结果文件: {}", result_path.display());
    assert!(result_path.is_file(), "应该生成 result.json");
}

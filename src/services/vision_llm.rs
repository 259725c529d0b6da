//! 视觉模型调用服务 - 业务能力层
//!
//! 只负责"把图片和提示词发给多模态模型并拿回结构化反馈"这一能力
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 兼容 OpenAI API 的服务（如 Azure, Gemini, Doubao 等）
//! - response_format 使用 JSON Schema 约束输出为 `FeedbackResult`
//! - 解析走两段式：严格反序列化优先，失败后做围栏剥离与对象提取

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestUserMessageArgs,
        ChatCompletionRequestUserMessageContent, ChatCompletionRequestUserMessageContentPart,
        CreateChatCompletionRequestArgs, ImageDetail, ImageUrl, ResponseFormat,
        ResponseFormatJsonSchema,
    },
    Client,
};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use regex::Regex;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::CaseError;
use crate::models::FeedbackResult;

/// 围栏剥离：```json ... ``` 或 ``` ... ```
static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("内置正则表达式合法"));

/// 响应解析结果
///
/// 显式区分"通过校验的结构化结果"与"无法收编的原始文本"；
/// 后者由调用方上报为 Schema 错误，不做静默矫正
#[derive(Debug)]
pub enum ParseOutcome {
    /// 解析成功并通过字段校验
    Validated(FeedbackResult),
    /// 两段解析都失败，原始文本原样保留
    Malformed(String),
}

/// 视觉模型能力接口
///
/// 流程层只依赖这一接口，测试中用桩实现替换真实网络调用
#[async_trait::async_trait]
pub trait VisionModel: Send + Sync {
    /// 模型标识（用于日志与溯源记录）
    fn model_name(&self) -> &str;

    /// 发送评估指令与有序图片序列，返回结构化反馈
    async fn generate_feedback(
        &self,
        instruction: &str,
        image_paths: &[PathBuf],
        temperature: f32,
    ) -> Result<FeedbackResult, CaseError>;
}

/// 基于 async-openai 的视觉模型服务
///
/// 职责：
/// - 调用兼容 OpenAI API 的多模态端点
/// - 用 JSON Schema 约束模型输出格式
/// - 只处理单个案例的一次调用
/// - 不出现 Vec<WorksheetCase>
/// - 不关心流程顺序
pub struct VisionLlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl VisionLlmService {
    /// 创建新的视觉模型服务
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        let client = Client::with_config(openai_config);

        Self {
            client,
            model_name: config.llm_model_name.clone(),
        }
    }
}

#[async_trait::async_trait]
impl VisionModel for VisionLlmService {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn generate_feedback(
        &self,
        instruction: &str,
        image_paths: &[PathBuf],
        temperature: f32,
    ) -> Result<FeedbackResult, CaseError> {
        debug!(
            "调用视觉模型，模型: {}, 图片: {} 张",
            self.model_name,
            image_paths.len()
        );

        // 构建用户消息内容：指令文本 + 按处理顺序内嵌的图片
        let mut content_parts: Vec<ChatCompletionRequestUserMessageContentPart> = Vec::new();

        content_parts.push(ChatCompletionRequestUserMessageContentPart::Text(
            ChatCompletionRequestMessageContentPartText {
                text: instruction.to_string(),
            },
        ));

        for path in image_paths {
            let data_url = encode_image_data_url(path)
                .await
                .map_err(|e| CaseError::invocation(&self.model_name, e))?;
            content_parts.push(ChatCompletionRequestUserMessageContentPart::ImageUrl(
                ChatCompletionRequestMessageContentPartImage {
                    image_url: ImageUrl {
                        url: data_url,
                        detail: Some(ImageDetail::Auto),
                    },
                },
            ));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(ChatCompletionRequestUserMessageContent::Array(
                content_parts,
            ))
            .build()
            .map_err(|e| CaseError::invocation(&self.model_name, e))?;

        // 构建请求：response_format 把输出约束在 FeedbackResult 的字段集合内
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![ChatCompletionRequestMessage::User(user_msg)])
            .temperature(temperature)
            .response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    description: Some("学习单照片的结构化评估反馈".to_string()),
                    name: "worksheet_feedback".to_string(),
                    schema: Some(feedback_schema()),
                    strict: Some(true),
                },
            })
            .build()
            .map_err(|e| CaseError::invocation(&self.model_name, e))?;

        // 调用 API
        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("视觉模型 API 调用失败: {}", e);
            CaseError::invocation(&self.model_name, e)
        })?;

        // 提取响应内容；传输成功但内容为空同样算调用失败
        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| CaseError::invocation(&self.model_name, "模型返回内容为空"))?;

        debug!("视觉模型 API 调用成功，响应 {} 字符", content.len());

        // 两段式解析；无法收编的响应带原文上报
        match parse_feedback(&content) {
            ParseOutcome::Validated(result) => Ok(result),
            ParseOutcome::Malformed(raw_text) => Err(CaseError::Schema { raw_text }),
        }
    }
}

/// 两段式解析模型响应
///
/// 第一段把全文直接当 JSON 严格反序列化；失败后第二段剥离代码围栏、
/// 提取最外层 JSON 对象，先读成通用文档再收编为 `FeedbackResult`。
/// 两段都失败时返回 `Malformed`，原始文本一字不动。
pub fn parse_feedback(content: &str) -> ParseOutcome {
    let trimmed = content.trim();
    if let Ok(result) = serde_json::from_str::<FeedbackResult>(trimmed) {
        return ParseOutcome::Validated(result);
    }

    if let Some(candidate) = extract_json_object(trimmed) {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&candidate) {
            if let Ok(result) = serde_json::from_value::<FeedbackResult>(value) {
                return ParseOutcome::Validated(result);
            }
        }
    }

    ParseOutcome::Malformed(content.to_string())
}

/// 从自由文本中提取最外层的 JSON 对象文本
fn extract_json_object(text: &str) -> Option<String> {
    // 优先取围栏内的内容
    let inner = FENCE_RE
        .captures(text)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text);

    // 退回到最外层花括号包围的片段
    let start = inner.find('{')?;
    let end = inner.rfind('}')?;
    if end < start {
        return None;
    }
    Some(inner[start..=end].to_string())
}

/// `FeedbackResult` 的 JSON Schema（全部字段必填，不允许多余字段）
///
/// 修改 `FeedbackResult` 字段时必须同步修改这里和内置提示词
fn feedback_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": [
            "summary",
            "extracted_problem",
            "student_work_summary",
            "mistakes",
            "feedback_actions",
            "next_practice",
            "questions_to_student",
            "image_quality_issues",
            "confidence"
        ],
        "properties": {
            "summary": { "type": "string" },
            "extracted_problem": { "type": "string" },
            "student_work_summary": { "type": "string" },
            "mistakes": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["where", "why", "fix"],
                    "properties": {
                        "where": { "type": "string" },
                        "why": { "type": "string" },
                        "fix": { "type": "string" }
                    }
                }
            },
            "feedback_actions": { "type": "array", "items": { "type": "string" } },
            "next_practice": { "type": "array", "items": { "type": "string" } },
            "questions_to_student": { "type": "array", "items": { "type": "string" } },
            "image_quality_issues": { "type": "array", "items": { "type": "string" } },
            "confidence": { "type": "number" }
        }
    })
}

/// 把本地图片编码为 data URL（归一化产物恒为 PNG）
async fn encode_image_data_url(path: &Path) -> Result<String, std::io::Error> {
    let bytes = tokio::fs::read(path).await?;
    Ok(format!(
        "data:image/png;base64,{}",
        BASE64_STANDARD.encode(bytes)
    ))
}

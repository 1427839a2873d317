//! Gemini `generateContent` client.
//!
//! Request/response wire types live here; the rest of the crate only sees
//! [`Turn`]s and [`ToolDescriptor`]s.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, instrument, warn};

use crate::core::conversation::{Part, Role, ToolResult, Turn};
use crate::core::types::{ParamType, ToolCall, ToolDescriptor, Usage};
use crate::io::config::ApiConfig;
use crate::io::model::{ModelClient, ModelRequest, ModelResponse};

/// Blocking HTTP client for the Gemini API.
pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api: &ApiConfig, model: &str, api_key: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(api.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        let model = self.model.trim_start_matches("models/");
        format!("{}/models/{model}:generateContent", self.base_url)
    }
}

impl ModelClient for GeminiClient {
    #[instrument(skip_all, fields(model = %self.model, turns = request.conversation.len()))]
    fn generate(&self, request: &ModelRequest<'_>) -> Result<ModelResponse> {
        let body = build_request(request)?;
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .context("send generateContent request")?;
        let status = response.status();
        let text = response.text().context("read generateContent response")?;
        if !status.is_success() {
            warn!(%status, "model request failed");
            return Err(anyhow!(
                "model API returned {status}: {}",
                error_message(&text).unwrap_or(text)
            ));
        }
        let parsed = parse_response(&text)?;
        debug!(
            candidates = parsed.candidates.len(),
            usage = ?parsed.usage,
            "model responded"
        );
        Ok(parsed)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Value>,
    system_instruction: WireContent,
    tools: Vec<WireTool>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<WireFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<ToolResult>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    args: Map<String, Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTool {
    function_declarations: Vec<WireFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct WireFunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
    usage_metadata: Option<WireUsage>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct WireCandidate {
    content: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUsage {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

fn build_request(request: &ModelRequest<'_>) -> Result<GenerateContentRequest> {
    let contents = request
        .conversation
        .iter()
        .map(wire_content)
        .collect::<Result<Vec<_>>>()?;
    Ok(GenerateContentRequest {
        contents,
        system_instruction: WireContent {
            role: None,
            parts: vec![WirePart {
                text: Some(request.system_instruction.to_string()),
                ..WirePart::default()
            }],
        },
        tools: vec![WireTool {
            function_declarations: request.tools.iter().map(declaration).collect(),
        }],
    })
}

fn wire_content(turn: &Turn) -> Result<Value> {
    if let Some(raw) = &turn.raw {
        return Ok(raw.clone());
    }
    serde_json::to_value(content_from_turn(turn)).context("encode conversation turn")
}

fn content_from_turn(turn: &Turn) -> WireContent {
    // The API has no dedicated role for tool output; results travel as user turns.
    let role = match turn.role {
        Role::Model => "model",
        Role::User | Role::Tool => "user",
    };
    let parts = turn
        .parts
        .iter()
        .map(|part| match part {
            Part::Text(text) => WirePart {
                text: Some(text.clone()),
                ..WirePart::default()
            },
            Part::ToolCall(call) => WirePart {
                function_call: Some(WireFunctionCall {
                    name: call.name.clone(),
                    args: call.args.clone(),
                }),
                ..WirePart::default()
            },
            Part::ToolResult(result) => WirePart {
                function_response: Some(result.clone()),
                ..WirePart::default()
            },
        })
        .collect();
    WireContent {
        role: Some(role.to_string()),
        parts,
    }
}

fn turn_from_content(content: WireContent) -> Turn {
    let role = match content.role.as_deref() {
        Some("user") => Role::User,
        _ => Role::Model,
    };
    let mut parts = Vec::new();
    for part in content.parts {
        if let Some(text) = part.text {
            parts.push(Part::Text(text));
        }
        if let Some(call) = part.function_call {
            parts.push(Part::ToolCall(ToolCall {
                name: call.name,
                args: call.args,
            }));
        }
        if let Some(result) = part.function_response {
            parts.push(Part::ToolResult(result));
        }
    }
    Turn {
        role,
        parts,
        raw: None,
    }
}

fn declaration(descriptor: &ToolDescriptor) -> WireFunctionDeclaration {
    let mut properties = Map::new();
    for param in &descriptor.params {
        let mut schema = param_schema(&param.ty);
        if let Value::Object(ref mut map) = schema {
            map.insert("description".to_string(), json!(param.description));
        }
        properties.insert(param.name.clone(), schema);
    }
    WireFunctionDeclaration {
        name: descriptor.name.clone(),
        description: descriptor.description.clone(),
        parameters: json!({
            "type": "OBJECT",
            "properties": Value::Object(properties),
            "required": descriptor.required_params(),
        }),
    }
}

fn param_schema(ty: &ParamType) -> Value {
    match ty {
        ParamType::String => json!({ "type": "STRING" }),
        ParamType::Array(items) => json!({ "type": "ARRAY", "items": param_schema(items) }),
    }
}

fn parse_response(body: &str) -> Result<ModelResponse> {
    let parsed: GenerateContentResponse =
        serde_json::from_str(body).context("parse generateContent response")?;
    if let Some(error) = parsed.error {
        return Err(anyhow!("model API error: {}", error.message));
    }
    let mut candidates = Vec::new();
    for content in parsed.candidates.into_iter().filter_map(|c| c.content) {
        let wire: WireContent =
            serde_json::from_value(content.clone()).context("parse candidate content")?;
        let mut turn = turn_from_content(wire);
        turn.raw = Some(content);
        candidates.push(turn);
    }
    let usage = parsed.usage_metadata.map(|usage| Usage {
        prompt_tokens: usage.prompt_token_count,
        response_tokens: usage.candidates_token_count,
    });
    Ok(ModelResponse { candidates, usage })
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error.message)
}

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;

use super::{Assistant, AssistantBackend, AssistantError};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const SUPPORTED_PROVIDERS: [&str; 1] = ["openai"];

/// Subset of the generated configuration this backend reads. Unknown sections
/// are ignored.
#[derive(Debug, Deserialize)]
struct GeneratedConfig {
    llm: LlmSection,
    vectordb: VectorDbSection,
}

#[derive(Debug, Deserialize)]
struct LlmSection {
    provider: String,
    config: LlmConfig,
}

#[derive(Debug, Deserialize)]
struct LlmConfig {
    model: String,
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    system_prompt: Option<String>,
    #[serde(default)]
    temperature: Option<f64>,
    #[serde(default)]
    max_tokens: Option<u32>,
    #[serde(default)]
    top_p: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct VectorDbSection {
    config: VectorDbConfig,
}

#[derive(Debug, Deserialize)]
struct VectorDbConfig {
    dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct ChatMessage {
    role: String,
    content: String,
}

impl ChatMessage {
    fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
        }
    }
}

/// Builds [`RemoteAssistant`]s that talk to an OpenAI-compatible
/// chat completions endpoint.
#[derive(Clone, Default)]
pub struct RemoteBackend {
    client: Client,
}

impl RemoteBackend {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

#[async_trait]
impl AssistantBackend for RemoteBackend {
    fn name(&self) -> &str {
        "remote"
    }

    async fn from_config(&self, config_path: &Path) -> Result<Arc<dyn Assistant>, AssistantError> {
        let contents = tokio::fs::read_to_string(config_path).await.map_err(|e| {
            AssistantError::Construction(format!(
                "cannot read {}: {}",
                config_path.display(),
                e
            ))
        })?;
        let assistant = RemoteAssistant::from_yaml(self.client.clone(), &contents)?;
        Ok(Arc::new(assistant))
    }
}

pub struct RemoteAssistant {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
    top_p: Option<f64>,
    history: Mutex<Vec<ChatMessage>>,
}

impl RemoteAssistant {
    fn from_yaml(client: Client, contents: &str) -> Result<Self, AssistantError> {
        let config: GeneratedConfig = serde_yaml::from_str(contents)
            .map_err(|e| AssistantError::Construction(format!("malformed config: {}", e)))?;

        let provider = config.llm.provider.trim().to_lowercase();
        if !SUPPORTED_PROVIDERS.contains(&provider.as_str()) {
            return Err(AssistantError::Construction(format!(
                "unsupported llm provider '{}'",
                config.llm.provider
            )));
        }

        let llm = config.llm.config;
        let api_key = llm
            .api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| AssistantError::Construction("missing llm api_key".to_string()))?;
        if llm.model.trim().is_empty() {
            return Err(AssistantError::Construction("missing llm model".to_string()));
        }

        let storage_dir = &config.vectordb.config.dir;
        if !storage_dir.is_dir() {
            return Err(AssistantError::Construction(format!(
                "vectordb dir {} does not exist",
                storage_dir.display()
            )));
        }

        let base_url = llm
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        let mut history = Vec::new();
        if let Some(system_prompt) = llm.system_prompt.filter(|p| !p.trim().is_empty()) {
            history.push(ChatMessage::new("system", &system_prompt));
        }

        Ok(Self {
            client,
            endpoint: format!("{}/v1/chat/completions", base_url),
            api_key,
            model: llm.model,
            temperature: llm.temperature,
            max_tokens: llm.max_tokens,
            top_p: llm.top_p,
            history: Mutex::new(history),
        })
    }

    fn request_body(&self, messages: &[ChatMessage]) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = self.temperature {
                obj.insert("temperature".to_string(), json!(t));
            }
            if let Some(t) = self.max_tokens {
                obj.insert("max_tokens".to_string(), json!(t));
            }
            if let Some(t) = self.top_p {
                obj.insert("top_p".to_string(), json!(t));
            }
        }
        body
    }
}

#[async_trait]
impl Assistant for RemoteAssistant {
    async fn chat(&self, prompt: &str) -> Result<String, AssistantError> {
        // Held for the whole exchange so turns stay in order.
        let mut history = self.history.lock().await;
        let mut messages = history.clone();
        messages.push(ChatMessage::new("user", prompt));

        let res = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(&messages))
            .send()
            .await
            .map_err(|e| AssistantError::Invocation(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(AssistantError::Invocation(format!(
                "{}: {}",
                status,
                error_message(&text)
            )));
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|e| AssistantError::Invocation(e.to_string()))?;
        let content = completion_content(&payload)
            .ok_or_else(|| AssistantError::Invocation("empty completion".to_string()))?;

        messages.push(ChatMessage::new("assistant", &content));
        *history = messages;
        Ok(content)
    }
}

fn completion_content(payload: &Value) -> Option<String> {
    payload["choices"][0]["message"]["content"]
        .as_str()
        .map(str::trim)
        .filter(|content| !content.is_empty())
        .map(str::to_string)
}

/// Pulls `error.message` out of an OpenAI-style error body, falling back to
/// the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::{Json, Router};

    fn config_yaml(dir: &Path, extra_llm: &str) -> String {
        format!(
            "llm:\n  provider: openai\n  config:\n    model: gpt-3.5-turbo\n    api_key: sk-ABC\n{}vectordb:\n  provider: chroma\n  config:\n    dir: {}\nplatform:\n  api_key: ec-XYZ\n",
            extra_llm,
            dir.display()
        )
    }

    #[test]
    fn from_yaml_reads_llm_settings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let yaml = config_yaml(
            dir.path(),
            "    temperature: 0.5\n    max_tokens: 1000\n    base_url: http://localhost:1234/\n    system_prompt: Be brief.\n",
        );

        let assistant = RemoteAssistant::from_yaml(Client::new(), &yaml).expect("construct");

        assert_eq!(assistant.endpoint, "http://localhost:1234/v1/chat/completions");
        assert_eq!(assistant.api_key, "sk-ABC");
        let body = assistant.request_body(&[ChatMessage::new("user", "hi")]);
        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["temperature"], 0.5);
        assert_eq!(body["max_tokens"], 1000);
        assert!(body.get("top_p").is_none());
        assert_eq!(
            assistant.history.try_lock().expect("unlocked").as_slice(),
            &[ChatMessage::new("system", "Be brief.")]
        );
    }

    #[test]
    fn from_yaml_defaults_to_openai_endpoint() {
        let dir = tempfile::tempdir().expect("tempdir");

        let assistant =
            RemoteAssistant::from_yaml(Client::new(), &config_yaml(dir.path(), "")).expect("construct");

        assert_eq!(
            assistant.endpoint,
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn from_yaml_rejects_malformed_config() {
        let err = RemoteAssistant::from_yaml(Client::new(), "llm: [").err().expect("error");
        assert!(matches!(err, AssistantError::Construction(_)));

        let err = RemoteAssistant::from_yaml(Client::new(), "app: {}\n").err().expect("error");
        assert!(matches!(err, AssistantError::Construction(_)));
    }

    #[test]
    fn from_yaml_rejects_blank_api_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let yaml = config_yaml(dir.path(), "").replace("api_key: sk-ABC", "api_key: \"  \"");

        let err = RemoteAssistant::from_yaml(Client::new(), &yaml).err().expect("error");

        assert!(matches!(err, AssistantError::Construction(ref msg) if msg.contains("api_key")));
    }

    #[test]
    fn from_yaml_rejects_unknown_provider() {
        let dir = tempfile::tempdir().expect("tempdir");
        let yaml = config_yaml(dir.path(), "").replace("provider: openai", "provider: cohere");

        let err = RemoteAssistant::from_yaml(Client::new(), &yaml).err().expect("error");

        assert!(matches!(err, AssistantError::Construction(ref msg) if msg.contains("cohere")));
    }

    #[test]
    fn from_yaml_requires_existing_storage_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("gone");

        let err = RemoteAssistant::from_yaml(Client::new(), &config_yaml(&missing, ""))
            .err()
            .expect("error");

        assert!(matches!(err, AssistantError::Construction(ref msg) if msg.contains("does not exist")));
    }

    #[tokio::test]
    async fn backend_reports_unreadable_config() {
        let dir = tempfile::tempdir().expect("tempdir");

        let err = RemoteBackend::new()
            .from_config(&dir.path().join("missing.yaml"))
            .await
            .err()
            .expect("error");

        assert!(matches!(err, AssistantError::Construction(_)));
    }

    type Requests = Arc<std::sync::Mutex<Vec<Value>>>;

    /// Replies based on the last user message: "fail" gets a 429, "empty" an
    /// empty completion, anything else the number of messages received.
    async fn completions(
        State(requests): State<Requests>,
        Json(body): Json<Value>,
    ) -> axum::response::Response {
        let messages = body["messages"].as_array().cloned().unwrap_or_default();
        let last = messages
            .last()
            .and_then(|m| m["content"].as_str())
            .unwrap_or_default()
            .to_string();
        if let Ok(mut seen) = requests.lock() {
            seen.push(body);
        }

        match last.as_str() {
            "fail" => (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({ "error": { "message": "quota" } })),
            )
                .into_response(),
            "empty" => Json(json!({ "choices": [{ "message": { "content": "" } }] }))
                .into_response(),
            _ => Json(json!({
                "choices": [{ "message": { "content": format!("msgs={}", messages.len()) } }]
            }))
            .into_response(),
        }
    }

    async fn spawn_completions_server() -> (String, Requests) {
        let requests = Requests::default();
        let app = Router::new()
            .route("/v1/chat/completions", post(completions))
            .with_state(requests.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (format!("http://{}", addr), requests)
    }

    fn assistant_at(base_url: &str, dir: &Path) -> RemoteAssistant {
        let yaml = config_yaml(dir, &format!("    base_url: {}\n", base_url));
        RemoteAssistant::from_yaml(Client::new(), &yaml).expect("construct")
    }

    fn roles_and_contents(request: &Value) -> Vec<(String, String)> {
        request["messages"]
            .as_array()
            .expect("messages")
            .iter()
            .map(|m| {
                (
                    m["role"].as_str().unwrap_or_default().to_string(),
                    m["content"].as_str().unwrap_or_default().to_string(),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn chat_sends_running_history_and_skips_failed_turns() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (base_url, requests) = spawn_completions_server().await;
        let assistant = assistant_at(&base_url, dir.path());

        assert_eq!(assistant.chat("hello").await.expect("first"), "msgs=1");

        let err = assistant.chat("fail").await.expect_err("rate limited");
        assert!(
            matches!(err, AssistantError::Invocation(ref msg) if msg.contains("429") && msg.contains("quota")),
            "{err}"
        );

        let err = assistant.chat("empty").await.expect_err("empty completion");
        assert!(matches!(err, AssistantError::Invocation(_)));

        assert_eq!(assistant.chat("again").await.expect("second"), "msgs=3");

        let seen = requests.lock().expect("requests").clone();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0]["model"], "gpt-3.5-turbo");
        assert_eq!(
            roles_and_contents(&seen[3]),
            vec![
                ("user".to_string(), "hello".to_string()),
                ("assistant".to_string(), "msgs=1".to_string()),
                ("user".to_string(), "again".to_string()),
            ]
        );
        assert_eq!(assistant.history.lock().await.len(), 4);
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_invocation_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);
        let assistant = assistant_at(&format!("http://{}", addr), dir.path());

        let err = assistant.chat("hello").await.expect_err("connection refused");

        assert!(matches!(err, AssistantError::Invocation(_)));
        assert!(assistant.history.lock().await.is_empty());
    }

    #[test]
    fn completion_content_extracts_first_choice() {
        let payload = json!({
            "choices": [{ "message": { "role": "assistant", "content": "  Hello!  " } }]
        });
        assert_eq!(completion_content(&payload).as_deref(), Some("Hello!"));

        let empty = json!({ "choices": [{ "message": { "content": "" } }] });
        assert_eq!(completion_content(&empty), None);
        assert_eq!(completion_content(&json!({})), None);
    }

    #[test]
    fn error_message_prefers_structured_body() {
        let body = r#"{"error": {"message": "You exceeded your current quota", "type": "insufficient_quota"}}"#;
        assert_eq!(error_message(body), "You exceeded your current quota");
        assert_eq!(error_message(" upstream down \n"), "upstream down");
    }
}

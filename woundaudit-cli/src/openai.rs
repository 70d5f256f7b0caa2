//! Chat-completions client for OpenAI-compatible endpoints
//!
//! One blocking POST per audit run. Transport errors and non-2xx statuses
//! surface as `ServiceUnavailable`; a response without usable message
//! content surfaces as `EmptyReport`. No retry.

use serde::Deserialize;
use std::time::Duration;
use woundaudit_core::{
    validate_response, AuditError, AuditRequest, ServiceConfig, TextGenerationService,
};

/// Blocking client for `POST {endpoint}/chat/completions`
pub struct OpenAiChatService {
    agent: ureq::Agent,
    url: String,
    model: String,
    api_key: Option<String>,
    api_key_env: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiChatService {
    pub fn new(config: &ServiceConfig, api_key: Option<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();
        Self {
            agent,
            url: format!("{}/chat/completions", config.endpoint.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            api_key_env: config.api_key_env.clone(),
        }
    }

    /// Read the credential from the environment variable named in the config
    pub fn from_env(config: &ServiceConfig) -> Self {
        Self::new(config, std::env::var(&config.api_key_env).ok())
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// JSON body for one request: model plus the system and user messages
    pub fn request_body(&self, request: &AuditRequest) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": request.messages(),
        })
    }
}

/// Pull the first choice's message content out of a completion response
pub fn parse_completion(body: &str) -> woundaudit_core::Result<String> {
    let completion: ChatCompletion = serde_json::from_str(body).map_err(|e| {
        tracing::warn!(error = %e, "malformed chat completion response");
        AuditError::EmptyReport
    })?;
    let content = completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content);
    validate_response(content)
}

impl TextGenerationService for OpenAiChatService {
    fn generate(&self, request: &AuditRequest) -> woundaudit_core::Result<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AuditError::ServiceUnavailable(format!(
                "no credential: environment variable {} is not set",
                self.api_key_env
            ))
        })?;

        let body = self.request_body(request).to_string();
        tracing::debug!(url = %self.url, model = %self.model, bytes = body.len(), "posting chat completion");

        let response = self
            .agent
            .post(&self.url)
            .set("Authorization", &format!("Bearer {api_key}"))
            .set("Content-Type", "application/json")
            .send_string(&body);

        let response = match response {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let detail = response.into_string().unwrap_or_default();
                return Err(AuditError::ServiceUnavailable(format!(
                    "HTTP {code}: {}",
                    detail.trim()
                )));
            }
            Err(e) => return Err(AuditError::ServiceUnavailable(e.to_string())),
        };

        let text = response
            .into_string()
            .map_err(|e| AuditError::ServiceUnavailable(format!("failed to read response: {e}")))?;
        parse_completion(&text)
    }

    fn name(&self) -> &str {
        "openai-chat"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use woundaudit_core::RunId;

    fn request() -> AuditRequest {
        AuditRequest {
            run_id: RunId::new_v4(),
            framework: "cms-lcd".to_string(),
            instructions: "You are a CMS wound care compliance auditor.".to_string(),
            user_content: "Surface Area: 10".to_string(),
        }
    }

    #[test]
    fn body_carries_model_and_two_messages() {
        let service = OpenAiChatService::new(&ServiceConfig::default(), Some("sk-test".to_string()));
        let body = service.request_body(&request());
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Surface Area: 10");
    }

    #[test]
    fn endpoint_trailing_slash_is_ignored() {
        let config = ServiceConfig {
            endpoint: "http://localhost:8080/v1/".to_string(),
            ..ServiceConfig::default()
        };
        let service = OpenAiChatService::new(&config, None);
        assert_eq!(service.url(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn completion_content_is_extracted() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"1. **Audit Summary**"}}]}"#;
        assert_eq!(parse_completion(body).unwrap(), "1. **Audit Summary**");
    }

    #[test]
    fn missing_or_blank_content_is_empty_report() {
        for body in [
            r#"{"choices":[]}"#,
            r#"{"choices":[{"message":{"content":null}}]}"#,
            r#"{"choices":[{"message":{"content":"  "}}]}"#,
            "not json",
        ] {
            assert!(matches!(parse_completion(body), Err(AuditError::EmptyReport)));
        }
    }

    #[test]
    fn missing_credential_is_unavailable() {
        let service = OpenAiChatService::new(&ServiceConfig::default(), Some("   ".to_string()));
        assert!(!service.has_credential());
        let err = service.generate(&request()).unwrap_err();
        assert!(matches!(err, AuditError::ServiceUnavailable(ref m) if m.contains("OPENAI_API_KEY")));
    }

    #[test]
    fn unreachable_endpoint_is_unavailable() {
        let config = ServiceConfig {
            endpoint: "http://127.0.0.1:9/v1".to_string(),
            timeout_secs: 2,
            ..ServiceConfig::default()
        };
        let service = OpenAiChatService::new(&config, Some("sk-test".to_string()));
        assert!(matches!(
            service.generate(&request()),
            Err(AuditError::ServiceUnavailable(_))
        ));
    }
}

use super::error::OracleError;
use super::transport::{OracleRequest, VisionTransport};
use log::debug;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// OpenAI 兼容的聊天补全接口 (Groq)
pub struct GroqTransport {
    client: Client,
    base_url: String,
    api_key: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl GroqTransport {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, OracleError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(OracleError::MissingApiKey);
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            temperature: 0.1,
            max_tokens: 1024,
        })
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_body<'a>(&self, request: &'a OracleRequest<'a>) -> ChatRequest<'a> {
        let mut content = Vec::with_capacity(request.images.len() + 1);
        content.push(ContentPart::Text {
            text: request.prompt,
        });
        content.extend(request.images.iter().map(|img| ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: img.data_url(),
            },
        }));

        ChatRequest {
            model: request.model,
            messages: vec![ChatMessage {
                role: "user",
                content,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        }
    }
}

impl VisionTransport for GroqTransport {
    fn complete(&self, request: &OracleRequest<'_>) -> Result<String, OracleError> {
        debug!(
            "🌐 POST {} model={} images={}",
            self.endpoint(),
            request.model,
            request.images.len()
        );
        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&self.build_body(request))
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(OracleError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = resp.json()?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(OracleError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::oracle::EncodedImage;

    #[test]
    fn test_missing_api_key() {
        let err = GroqTransport::new("  ", DEFAULT_BASE_URL, Duration::from_secs(5));
        assert!(matches!(err, Err(OracleError::MissingApiKey)));
    }

    #[test]
    fn test_request_body_shape() {
        let transport =
            GroqTransport::new("key", "http://localhost:9/v1/", Duration::from_secs(5)).unwrap();
        assert_eq!(transport.endpoint(), "http://localhost:9/v1/chat/completions");

        let images = vec![
            EncodedImage::from_bytes(b"a", "image/jpeg"),
            EncodedImage::from_bytes(b"b", "image/png"),
        ];
        let request = OracleRequest {
            model: "scout",
            prompt: "look",
            images: &images,
        };
        let body = serde_json::to_value(transport.build_body(&request)).unwrap();

        assert_eq!(body["model"], "scout");
        assert_eq!(body["response_format"]["type"], "json_object");
        let content = body["messages"][0]["content"].as_array().unwrap();
        assert_eq!(content.len(), 3);
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[0]["text"], "look");
        assert_eq!(content[2]["type"], "image_url");
        assert_eq!(content[2]["image_url"]["url"], "data:image/png;base64,Yg==");
    }

    #[test]
    fn test_response_without_content() {
        let parsed: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(parsed.choices.is_empty());
        let parsed: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"{}"}}]}"#).unwrap();
        assert_eq!(
            parsed.choices[0].message.as_ref().unwrap().content.as_deref(),
            Some("{}")
        );
    }
}

//! Client for the text-generation service that rewrites source text into the dialect.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::GeneratorConfig;
use crate::error::GenerateError;
use crate::normalize::normalize;
use crate::prompts::{FORMATTING_RULES, SYSTEM_PROMPT};

/// Receives human-readable status updates while a request is in flight.
pub type Progress<'a> = Option<&'a (dyn Fn(&str) + Send + Sync)>;

/// Something that rewrites text according to an instruction.
///
/// Output is dialect text, already normalized.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        source: &str,
        instruction: &str,
        progress: Progress<'_>,
    ) -> Result<String, GenerateError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat-completions endpoint, such as a
/// locally served model.
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    config: GeneratorConfig,
}

impl ChatClient {
    pub fn new(config: GeneratorConfig) -> Result<Self, GenerateError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    fn request<'a>(&'a self, source: &str, instruction: &str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: format!("{}\n{}", SYSTEM_PROMPT, FORMATTING_RULES),
                },
                ChatMessage {
                    role: "user",
                    content: user_message(source, instruction),
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            stream: false,
        }
    }

    /// Timeouts and refused connections get their own variants, whether they
    /// happen while sending or while reading the body.
    fn transport_error(&self, e: reqwest::Error) -> GenerateError {
        if e.is_timeout() {
            GenerateError::Timeout(self.config.timeout_secs)
        } else if e.is_connect() {
            GenerateError::Connect(self.config.api_url.clone())
        } else {
            GenerateError::Http(e)
        }
    }
}

#[async_trait]
impl TextGenerator for ChatClient {
    async fn generate(
        &self,
        source: &str,
        instruction: &str,
        progress: Progress<'_>,
    ) -> Result<String, GenerateError> {
        let report = |message: &str| {
            log::info!("{}", message);
            if let Some(progress) = progress {
                progress(message);
            }
        };

        report(&format!(
            "Sending request to {} with model '{}'...",
            self.config.api_url, self.config.model
        ));
        let response = self
            .client
            .post(&self.config.api_url)
            .json(&self.request(source, instruction))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        if !status.is_success() {
            log::warn!("Generation API returned {}: {}", status, body);
            return Err(GenerateError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        report("Receiving and parsing response...");
        let output = extract_content(&body)?;
        report("Generation complete.");
        Ok(output)
    }
}

/// How much of the model's context window a source would take up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextUsage {
    Normal,
    /// Above 80% of the window.
    Near,
    Exceeded,
}

/// Rough token count: the larger of the word count and one token per four
/// characters.
pub fn estimate_tokens(text: &str) -> usize {
    let words = text.split_whitespace().count();
    words.max(text.chars().count().div_ceil(4))
}

pub fn context_usage(tokens: usize, context_window: usize) -> ContextUsage {
    if tokens > context_window {
        ContextUsage::Exceeded
    } else if tokens * 5 > context_window * 4 {
        ContextUsage::Near
    } else {
        ContextUsage::Normal
    }
}

fn user_message(source: &str, instruction: &str) -> String {
    format!("{}\n\nText to process:\n{}", instruction, source)
}

/// Pull the first choice's text out of a response body and normalize it.
fn extract_content(body: &str) -> Result<String, GenerateError> {
    let response: ChatResponse = serde_json::from_str(body)?;
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .ok_or(GenerateError::EmptyContent)?;

    Ok(normalize(content.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn extracts_and_normalizes_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  # T\n\n\n\nIt is **big**. \n"}},{"message":{"content":"other"}}]}"#;
        assert_eq!(extract_content(body).unwrap(), "# T\n\nIt is <b>big</b>.");
    }

    #[test]
    fn missing_content_is_empty_error() {
        for body in [r#"{"choices":[]}"#, r#"{}"#, r#"{"choices":[{"message":{"content":null}}]}"#] {
            assert!(matches!(extract_content(body), Err(GenerateError::EmptyContent)), "{body}");
        }
    }

    #[test]
    fn malformed_json_is_parse_error() {
        assert!(matches!(extract_content("not json"), Err(GenerateError::Parse(_))));
    }

    #[test]
    fn request_carries_instruction_and_source() {
        let client = ChatClient::new(GeneratorConfig::default()).unwrap();
        let request = serde_json::to_value(client.request("raw text", "Rewrite it.")).unwrap();

        assert_eq!(request["model"], "qwen2.5-7b-instruct-1m");
        assert_eq!(request["stream"], false);
        assert_eq!(request["max_tokens"], 2000);
        assert_eq!(request["messages"][0]["role"], "system");
        assert_eq!(
            request["messages"][1]["content"],
            "Rewrite it.\n\nText to process:\nraw text"
        );
    }

    #[tokio::test]
    async fn unreachable_server_is_reported() {
        let config = GeneratorConfig {
            api_url: "http://127.0.0.1:9/v1/chat/completions".to_string(),
            timeout_secs: 5,
            ..GeneratorConfig::default()
        };
        let client = ChatClient::new(config).unwrap();
        let result = client.generate("text", "instruction", None).await;
        assert!(
            matches!(
                result,
                Err(GenerateError::Connect(_) | GenerateError::Timeout(_) | GenerateError::Http(_))
            ),
            "{result:?}"
        );
    }

    #[tokio::test]
    async fn stalled_body_is_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            // Promise more body than is ever sent
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 1000\r\n\r\n{\"choices\"")
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let config = GeneratorConfig {
            api_url: format!("http://{addr}/v1/chat/completions"),
            timeout_secs: 1,
            ..GeneratorConfig::default()
        };
        let result = ChatClient::new(config).unwrap().generate("text", "instruction", None).await;
        assert!(matches!(result, Err(GenerateError::Timeout(1))), "{result:?}");
    }

    #[rstest]
    #[case("", 0)]
    #[case("one two three", 4)]
    #[case("a b c d e f g h", 8)]
    #[case("supercalifragilistic", 5)]
    fn estimates_tokens(#[case] text: &str, #[case] expected: usize) {
        assert_eq!(estimate_tokens(text), expected);
    }

    #[rstest]
    #[case(100, 8192, ContextUsage::Normal)]
    #[case(6553, 8192, ContextUsage::Normal)]
    #[case(6554, 8192, ContextUsage::Near)]
    #[case(8192, 8192, ContextUsage::Near)]
    #[case(8193, 8192, ContextUsage::Exceeded)]
    fn classifies_context_usage(
        #[case] tokens: usize,
        #[case] window: usize,
        #[case] expected: ContextUsage,
    ) {
        assert_eq!(context_usage(tokens, window), expected);
    }
}

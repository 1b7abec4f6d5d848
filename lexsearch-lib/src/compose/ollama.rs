use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::compose::LlmClient;
use crate::{Error, Result};

/// Default Ollama generate endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434/api/generate";

/// Default local model.
pub const DEFAULT_OLLAMA_MODEL: &str = "deepseek-r1:1.5b";

/// Ollama `/api/generate` client.
///
/// Non-streaming. Each request is bounded by the client timeout and retried
/// once after a short backoff.
#[derive(Clone)]
pub struct OllamaClient {
    url: String,
    model: String,
    client: Client,
    retry_backoff: Duration,
}

impl OllamaClient {
    pub fn new(url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Llm(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            url: url.into(),
            model: model.into(),
            client,
            retry_backoff: Duration::from_millis(500),
        })
    }

    /// Override the pause before the single retry.
    #[must_use]
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Llm(format!("failed to call {}: {e}", self.url)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(Error::Llm(format!("ollama returned {status}: {text}")));
        }

        let parsed: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| Error::Llm(format!("failed to parse ollama response: {e}")))?;
        Ok(parsed.response)
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        match self.generate(prompt).await {
            Ok(text) => Ok(text),
            Err(first) => {
                tracing::warn!(error = %first, "ollama request failed, retrying once");
                tokio::time::sleep(self.retry_backoff).await;
                self.generate(prompt).await
            }
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    use super::*;

    /// Read one HTTP request (headers plus Content-Length body) and return it.
    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    async fn respond(stream: &mut TcpStream, status: &str, body: &str) {
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_generate_request_and_retry() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut first, _) = listener.accept().await.unwrap();
            let request = read_request(&mut first).await;
            respond(&mut first, "500 Internal Server Error", "{}").await;

            let (mut second, _) = listener.accept().await.unwrap();
            read_request(&mut second).await;
            respond(&mut second, "200 OK", r#"{"response":"Theft is punishable.","done":true}"#).await;
            request
        });

        let client = OllamaClient::new(
            format!("http://{addr}/api/generate"),
            "deepseek-r1:1.5b",
            Duration::from_secs(5),
        )
        .unwrap()
        .with_retry_backoff(Duration::from_millis(10));

        let answer = client.complete("what is theft").await.unwrap();
        assert_eq!(answer, "Theft is punishable.");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/generate"));
        assert!(request.contains(r#""model":"deepseek-r1:1.5b""#));
        assert!(request.contains(r#""prompt":"what is theft""#));
        assert!(request.contains(r#""stream":false"#));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_llm_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = OllamaClient::new(format!("http://{addr}/api/generate"), "m", Duration::from_secs(2))
            .unwrap()
            .with_retry_backoff(Duration::from_millis(1));

        let err = client.complete("prompt").await.unwrap_err();
        assert!(matches!(err, Error::Llm(_)));
    }
}

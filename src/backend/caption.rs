use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Caption collaborator: an opaque remote call turning an image into text.
#[async_trait]
pub trait CaptionGenerator: Send + Sync {
    async fn generate_caption(&self, image: &[u8], mime_type: &str) -> Result<String>;
}

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

const CAPTION_PROMPT: &str = "Tu es Ti-Guy, l'assistant IA de Zyeuté, le réseau social québécois. \
Génère une caption en joual québécois pour cette image. Sois créatif, drôle, et authentique. \
Utilise des expressions québécoises. Ajoute 2-3 hashtags québécois pertinents à la fin. \
Maximum 280 caractères.";

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData<'a> },
}

#[derive(Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content
            .parts
            .into_iter()
            .find_map(|part| part.text)
            .filter(|text| !text.trim().is_empty())
    }
}

/// `CaptionGenerator` backed by the Gemini `generateContent` API.
pub struct GeminiCaptioner {
    api_key: String,
    model: String,
    endpoint: String,
    http_client: reqwest::Client,
}

impl GeminiCaptioner {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            endpoint: GEMINI_ENDPOINT.to_string(),
            http_client: reqwest::Client::new(),
        }
    }

    /// Points the client at another base URL (proxies, local fakes).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl CaptionGenerator for GeminiCaptioner {
    async fn generate_caption(&self, image: &[u8], mime_type: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text { text: CAPTION_PROMPT },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type,
                            data: STANDARD.encode(image),
                        },
                    },
                ],
            }],
        };

        let url = format!("{}/{}:generateContent", self.endpoint, self.model);
        let response = self
            .http_client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("Caption API error: {} - {}", status, body);
            return Err(AppError::Network(format!("caption API returned {}", status)));
        }

        let body: GenerateResponse = response.json().await?;
        body.first_text()
            .ok_or_else(|| AppError::Network("caption API returned no text".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn request_complete(request: &[u8]) -> bool {
        let Some(header_end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
            return false;
        };
        let headers = String::from_utf8_lossy(&request[..header_end]);
        let length = headers
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        request.len() >= header_end + 4 + length
    }

    /// Answers one request with `status` and `body`, returning the raw request.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            while !request_complete(&request) {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&request).into_owned()
        });

        (address, handle)
    }

    #[tokio::test]
    async fn test_caption_from_remote() {
        let (address, server) = serve_once(
            "200 OK",
            r#"{"candidates":[{"content":{"parts":[{"text":"Belle soirée à Québec #qc"}]}}]}"#,
        )
        .await;
        let captioner = GeminiCaptioner::new("test-key", "gemini-test").with_endpoint(address);

        let caption = captioner.generate_caption(&[1, 2, 3], "image/png").await.unwrap();
        assert_eq!(caption, "Belle soirée à Québec #qc");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /gemini-test:generateContent?key=test-key "));
        assert!(request.contains(r#""mime_type":"image/png""#));
        assert!(request.contains(r#""data":"AQID""#));
    }

    #[tokio::test]
    async fn test_error_status_is_network_failure() {
        let (address, server) = serve_once("500 Internal Server Error", r#"{"error":"boom"}"#).await;
        let captioner = GeminiCaptioner::new("k", "gemini-test").with_endpoint(address);

        let err = captioner.generate_caption(b"img", "image/jpeg").await.unwrap_err();
        assert!(matches!(err, AppError::Network(_)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_candidates_is_network_failure() {
        let (address, server) = serve_once("200 OK", r#"{"candidates":[]}"#).await;
        let captioner = GeminiCaptioner::new("k", "gemini-test").with_endpoint(address);

        let err = captioner.generate_caption(b"img", "image/jpeg").await.unwrap_err();
        assert!(matches!(err, AppError::Network(_)));
        server.await.unwrap();
    }

    #[test]
    fn test_request_shape() {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text { text: "hi" },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: "image/png",
                            data: STANDARD.encode([1u8, 2, 3]),
                        },
                    },
                ],
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(json["contents"][0]["parts"][1]["inline_data"]["mime_type"], "image/png");
        assert_eq!(json["contents"][0]["parts"][1]["inline_data"]["data"], "AQID");
    }

    #[test]
    fn test_response_first_text() {
        let body: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Belle journée à Montréal #mtl"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(body.first_text().as_deref(), Some("Belle journée à Montréal #mtl"));

        let empty: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.first_text().is_none());
    }
}

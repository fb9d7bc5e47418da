//! Completion client and error types.
//!
//! [`CodexClient`] issues a single `POST {base}/responses` per call under a
//! deadline of `ClientConfig::timeout`. The deadline is created once when
//! the call starts and is owned by the call, so it is released on every
//! exit path. There are no retries.

use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Sleep;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::http::{authorized_post, build_http_client};
use crate::request::{RequestOptions, ResponsesRequest};
use crate::response::ResponseEnvelope;
use crate::sse::SSEResponseExt;

const RESPONSES_PATH: &str = "responses";

/// Errors that can occur while fulfilling a call.
#[derive(Error, Debug)]
pub enum CodexError {
    #[error("Request timeout after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Non-success HTTP status. The body is kept verbatim.
    #[error("Codex API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unexpected response status: {0}")]
    UnexpectedStatus(String),

    #[error("No text content in response")]
    NoContent,

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}

/// Something that turns request options into generated text.
///
/// [`CodexClient`] is the production implementation; the dispatcher only
/// depends on this trait.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, options: RequestOptions) -> Result<String, CodexError>;
}

/// Client for a Responses-style completion endpoint.
#[derive(Debug, Clone)]
pub struct CodexClient {
    config: Arc<ClientConfig>,
    http: reqwest::Client,
}

impl CodexClient {
    pub fn new(config: Arc<ClientConfig>) -> Result<Self, CodexError> {
        Ok(Self {
            config,
            http: build_http_client()?,
        })
    }

    /// Send the request and classify the HTTP status.
    async fn send(&self, body: &ResponsesRequest) -> Result<reqwest::Response, CodexError> {
        debug!(
            "POST {}/{} model={} stream={}",
            self.config.base_url,
            RESPONSES_PATH,
            body.model,
            body.stream.unwrap_or(false)
        );

        let response = authorized_post(&self.http, &self.config, RESPONSES_PATH)
            .json(body)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Completion endpoint returned {}", status);
            return Err(CodexError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    /// Non-streaming call returning the raw response envelope.
    pub async fn request(&self, options: &RequestOptions) -> Result<ResponseEnvelope, CodexError> {
        let mut body = ResponsesRequest::build(&self.config, options);
        body.stream = None;

        let call = async {
            let response = self.send(&body).await?;
            let text = response.text().await?;
            Ok::<_, CodexError>(serde_json::from_str::<ResponseEnvelope>(&text)?)
        };

        match tokio::time::timeout(self.config.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(CodexError::Timeout(self.config.timeout)),
        }
    }

    /// Non-streaming call returning the generated text.
    pub async fn generate(&self, options: &RequestOptions) -> Result<String, CodexError> {
        let envelope = self.request(options).await?;
        match envelope.usage {
            Some(usage) => debug!(
                "Response {} finished with status {} ({} input, {} output tokens)",
                envelope.id, envelope.status, usage.input_tokens, usage.output_tokens
            ),
            None => debug!("Response {} finished with status {}", envelope.id, envelope.status),
        }
        envelope.into_text()
    }

    /// Streaming call as a lazy, single-pass stream of text deltas.
    ///
    /// Nothing is sent and no deadline runs until the stream is first
    /// polled. From then on the deadline covers the connection and every
    /// chunk read; on expiry a single
    /// [`CodexError::Timeout`] is yielded and the stream ends.
    pub fn generate_stream(
        &self,
        options: &RequestOptions,
    ) -> impl Stream<Item = Result<String, CodexError>> + Send + '_ {
        let mut body = ResponsesRequest::build(&self.config, options);
        body.stream = Some(true);

        let deltas = stream::once(async move { self.send(&body).await })
            .map_ok(|response| response.output_text_deltas())
            .try_flatten();

        with_deadline(deltas, self.config.timeout)
    }

    /// Streaming call delivering each delta to `on_delta`, returning the
    /// concatenated text.
    pub async fn generate_stream_with<F>(
        &self,
        options: &RequestOptions,
        mut on_delta: F,
    ) -> Result<String, CodexError>
    where
        F: FnMut(&str) + Send,
    {
        let mut text = String::new();
        let mut deltas = Box::pin(self.generate_stream(options));

        while let Some(delta) = deltas.next().await {
            let delta = delta?;
            on_delta(&delta);
            text.push_str(&delta);
        }

        if text.is_empty() {
            return Err(CodexError::NoContent);
        }
        Ok(text)
    }
}

#[async_trait]
impl Completion for CodexClient {
    async fn complete(&self, options: RequestOptions) -> Result<String, CodexError> {
        if options.stream {
            let mut deltas = 0usize;
            let text = self.generate_stream_with(&options, |_| deltas += 1).await?;
            debug!("Stream finished after {} deltas", deltas);
            Ok(text)
        } else {
            self.generate(&options).await
        }
    }
}

/// Bound a stream by a deadline that starts on its first poll.
///
/// When the deadline fires first, one `Timeout` error is yielded and both
/// the inner stream and the timer are dropped. The timer is also dropped
/// as soon as the inner stream ends.
fn with_deadline<S>(
    inner: S,
    timeout: Duration,
) -> impl Stream<Item = Result<String, CodexError>>
where
    S: Stream<Item = Result<String, CodexError>>,
{
    let state: Option<(Pin<Box<S>>, Option<Pin<Box<Sleep>>>)> = Some((Box::pin(inner), None));

    stream::unfold(state, move |state| async move {
        let Some((mut inner, deadline)) = state else {
            return None;
        };
        let mut deadline = deadline.unwrap_or_else(|| Box::pin(tokio::time::sleep(timeout)));

        tokio::select! {
            item = inner.next() => item.map(|item| (item, Some((inner, Some(deadline))))),
            _ = &mut deadline => Some((Err(CodexError::Timeout(timeout)), None)),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReasoningEffort;
    use crate::request::OutputSchema;
    use mockito::Matcher;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn client_for(base_url: &str, timeout: Duration) -> CodexClient {
        let config = ClientConfig::new(base_url, "sk-test")
            .with_model("gpt-5.3-codex")
            .with_timeout(timeout);
        CodexClient::new(Arc::new(config)).unwrap()
    }

    fn completed(text: &str) -> String {
        json!({
            "id": "resp_1",
            "status": "completed",
            "output": [{
                "type": "message",
                "role": "assistant",
                "content": [{ "type": "output_text", "text": text }]
            }]
        })
        .to_string()
    }

    /// Accepts connections, reads the request, writes `head` and then
    /// holds the socket open without finishing the response.
    async fn stalling_server(head: &'static str) -> String {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 8192];
                    let _ = socket.read(&mut buf).await;
                    let _ = socket.write_all(head.as_bytes()).await;
                    tokio::time::sleep(Duration::from_secs(30)).await;
                });
            }
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_generate_sends_expected_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/responses")
            .match_header("authorization", "Bearer sk-test")
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-5.3-codex",
                "instructions": "Write code.",
                "input": [{ "role": "user", "content": "## Task\nhello" }],
                "max_output_tokens": 4096,
                "store": false,
                "reasoning": { "effort": "high" },
                "text": { "format": { "type": "json_schema", "name": "generated_code", "strict": true } }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completed("fn main() {}"))
            .create_async()
            .await;

        let client = client_for(&server.url(), Duration::from_secs(5));
        let options = RequestOptions::new("Write code.", "## Task\nhello")
            .with_reasoning_effort(ReasoningEffort::High)
            .with_output_schema(OutputSchema::new("generated_code", json!({ "type": "object" })));

        let text = client.generate(&options).await.unwrap();
        assert_eq!(text, "fn main() {}");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_error_carries_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/responses")
            .with_status(429)
            .with_body("rate limited")
            .create_async()
            .await;

        let client = client_for(&server.url(), Duration::from_secs(5));
        let err = client
            .generate(&RequestOptions::new("i", "x"))
            .await
            .unwrap_err();

        assert!(matches!(err, CodexError::Api { status: 429, .. }));
        assert_eq!(err.to_string(), "Codex API error (429): rate limited");
    }

    #[tokio::test]
    async fn test_non_completed_status_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/responses")
            .with_status(200)
            .with_body(json!({ "id": "resp_1", "status": "incomplete", "output": [] }).to_string())
            .create_async()
            .await;

        let client = client_for(&server.url(), Duration::from_secs(5));
        let err = client
            .generate(&RequestOptions::new("i", "x"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unexpected response status: incomplete");
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/responses")
            .with_status(200)
            .with_body("<html>gateway</html>")
            .create_async()
            .await;

        let client = client_for(&server.url(), Duration::from_secs(5));
        let err = client
            .generate(&RequestOptions::new("i", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, CodexError::Parse(_)));
    }

    #[tokio::test]
    async fn test_timeout_is_distinct() {
        let base = stalling_server("").await;
        let client = client_for(&base, Duration::from_millis(200));

        let err = client
            .generate(&RequestOptions::new("i", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, CodexError::Timeout(d) if d == Duration::from_millis(200)));
        assert_eq!(err.to_string(), "Request timeout after 200ms");
    }

    #[tokio::test]
    async fn test_stream_collects_deltas() {
        let mut server = mockito::Server::new_async().await;
        let body = concat!(
            "data: {\"type\":\"response.created\"}\n\n",
            "data: {\"type\":\"response.output_text.delta\",\"delta\":\"Hel\"}\n\n",
            ": ping\n\n",
            "data: {\"type\":\"response.output_text.delta\",\"delta\":\"lo\"}\n\n",
            "data: [DONE]\n\n",
        );
        let mock = server
            .mock("POST", "/responses")
            .match_body(Matcher::PartialJson(json!({ "stream": true })))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await;

        let client = client_for(&server.url(), Duration::from_secs(5));
        let options = RequestOptions::new("i", "x").with_stream(true);

        let mut seen = Vec::new();
        let text = client
            .generate_stream_with(&options, |d| seen.push(d.to_string()))
            .await
            .unwrap();

        assert_eq!(text, "Hello");
        assert_eq!(seen, vec!["Hel".to_string(), "lo".to_string()]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_stream_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/responses")
            .with_status(500)
            .with_body("{\"error\":\"boom\"}")
            .create_async()
            .await;

        let client = client_for(&server.url(), Duration::from_secs(5));
        let items: Vec<_> = client
            .generate_stream(&RequestOptions::new("i", "x"))
            .collect()
            .await;

        assert_eq!(items.len(), 1);
        let err = items.into_iter().next().unwrap().unwrap_err();
        assert_eq!(err.to_string(), "Codex API error (500): {\"error\":\"boom\"}");
    }

    #[tokio::test]
    async fn test_stream_timeout_after_partial_output() {
        const HEAD: &str = concat!(
            "HTTP/1.1 200 OK\r\n",
            "content-type: text/event-stream\r\n",
            "transfer-encoding: chunked\r\n",
            "\r\n",
            "3b\r\n",
            "data: {\"type\":\"response.output_text.delta\",\"delta\":\"par\"}\n\n",
            "\r\n",
        );
        let base = stalling_server(HEAD).await;
        let client = client_for(&base, Duration::from_millis(300));

        let items: Vec<_> = client
            .generate_stream(&RequestOptions::new("i", "x"))
            .collect()
            .await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "par");
        assert!(matches!(items[1], Err(CodexError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_stream_deadline_starts_on_first_poll() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/responses")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(concat!(
                "data: {\"type\":\"response.output_text.delta\",\"delta\":\"ok\"}\n\n",
                "data: [DONE]\n\n",
            ))
            .create_async()
            .await;

        let client = client_for(&server.url(), Duration::from_millis(200));
        let options = RequestOptions::new("i", "x");
        let deltas = client.generate_stream(&options);

        tokio::time::sleep(Duration::from_millis(300)).await;

        let items: Vec<String> = deltas.map(|item| item.unwrap()).collect().await;
        assert_eq!(items, vec!["ok".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_not_started_before_poll() {
        let inner = stream::iter(vec![Ok("a".to_string())]);
        let deltas = with_deadline(inner, Duration::from_secs(1));

        tokio::time::advance(Duration::from_secs(5)).await;

        let items: Vec<String> = deltas.map(|item| item.unwrap()).collect().await;
        assert_eq!(items, vec!["a".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_released_when_stream_finishes() {
        let inner = stream::iter(vec![Ok("a".to_string()), Ok("b".to_string())]);
        let mut deltas = Box::pin(with_deadline(inner, Duration::from_secs(1)).fuse());

        assert_eq!(deltas.next().await.unwrap().unwrap(), "a");
        assert_eq!(deltas.next().await.unwrap().unwrap(), "b");
        assert!(deltas.next().await.is_none());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(deltas.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_released_after_transport_error() {
        let inner = stream::iter(vec![Err(CodexError::Api {
            status: 502,
            body: "bad gateway".to_string(),
        })]);
        let mut deltas = Box::pin(with_deadline(inner, Duration::from_secs(1)).fuse());

        let err = deltas.next().await.unwrap().unwrap_err();
        assert!(matches!(err, CodexError::Api { status: 502, .. }));
        assert!(deltas.next().await.is_none());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(deltas.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fires_once_on_stall() {
        let stalled = stream::pending::<Result<String, CodexError>>();
        let items: Vec<_> = with_deadline(stalled, Duration::from_millis(50)).collect().await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(CodexError::Timeout(d)) if d == Duration::from_millis(50)));
    }
}

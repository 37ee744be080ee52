//! HTTP transport for signed TRTC TTS requests.
//!
//! Two exchange shapes share one `reqwest::Client`:
//!
//! - [`HttpTransport::send`]: single POST, whole JSON body read under a hard
//!   30 second deadline.
//! - [`HttpTransport::send_stream`]: POST answered with `text/event-stream`.
//!   Bytes are fed to an [`SseDemuxer`] as they arrive and events are yielded
//!   lazily. Opening the exchange and every wait for the next chunk are bounded
//!   by 60 seconds.
//!
//! Dropping a future or stream returned here drops the in-flight response,
//! which aborts the exchange and releases the connection.

use std::fmt;
use std::pin::Pin;
use std::time::Duration;

use async_stream::try_stream;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use url::Url;

use super::messages::{ResponseEnvelope, SynthesisPayload};
use super::signer::SignedHeaders;
use super::stream::{SseDemuxer, StreamEvent};
use crate::error::{FlowTTSError, FlowTTSResult, NetworkErrorKind};

/// Deadline for a complete single-shot exchange.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Deadline for opening a stream and for each chunk wait after that.
pub const STREAM_TIMEOUT: Duration = Duration::from_secs(60);

const EVENT_STREAM: &str = "text/event-stream";
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Lazily produced events of one streaming synthesis.
pub type EventStream = Pin<Box<dyn Stream<Item = FlowTTSResult<StreamEvent>> + Send>>;

// =============================================================================
// Request Envelope
// =============================================================================

/// Signed headers plus the exact payload bytes they were computed over.
#[derive(Clone)]
pub struct RequestEnvelope {
    action: &'static str,
    signed: SignedHeaders,
    body: Bytes,
}

impl RequestEnvelope {
    pub fn new(action: &'static str, signed: SignedHeaders, body: impl Into<Bytes>) -> Self {
        Self {
            action,
            signed,
            body: body.into(),
        }
    }

    pub fn action(&self) -> &'static str {
        self.action
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    fn header_map(&self) -> FlowTTSResult<HeaderMap> {
        let mut headers = HeaderMap::with_capacity(self.signed.headers.len());
        for (name, value) in &self.signed.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                FlowTTSError::InvalidConfiguration(format!("invalid header name {name}: {e}"))
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|_| {
                FlowTTSError::InvalidConfiguration(format!(
                    "header {name} contains characters not allowed in HTTP headers"
                ))
            })?;
            headers.insert(header_name, header_value);
        }
        Ok(headers)
    }
}

// Authorization stays out of Debug output
impl fmt::Debug for RequestEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestEnvelope")
            .field("action", &self.action)
            .field("body_len", &self.body.len())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// HttpTransport
// =============================================================================

/// Executes signed exchanges against the TTS endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: Url,
    request_timeout: Duration,
    stream_timeout: Duration,
}

impl HttpTransport {
    pub fn new(endpoint: Url) -> FlowTTSResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("flow-tts/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                FlowTTSError::InvalidConfiguration(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            endpoint,
            request_timeout: REQUEST_TIMEOUT,
            stream_timeout: STREAM_TIMEOUT,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_timeouts(mut self, request: Duration, stream: Duration) -> Self {
        self.request_timeout = request;
        self.stream_timeout = stream;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Single-shot exchange. Returns the `Response` object of a successful reply.
    pub async fn send(&self, envelope: RequestEnvelope) -> FlowTTSResult<SynthesisPayload> {
        let headers = envelope.header_map()?;
        let action = envelope.action;
        debug!(action, body_len = envelope.body.len(), "Sending TTS request");

        let exchange = async {
            let response = self
                .client
                .post(self.endpoint.clone())
                .headers(headers)
                .body(envelope.body)
                .send()
                .await?;
            let status = response.status();
            let body = response.bytes().await?;
            Ok::<_, FlowTTSError>((status, body))
        };

        let (status, body) = timeout(self.request_timeout, exchange)
            .await
            .map_err(|_| {
                warn!(action, "TTS request timed out");
                FlowTTSError::timeout(self.request_timeout)
            })??;

        let payload = parse_single_shot(status, &body)?;
        info!(
            action,
            request_id = payload.request_id.as_deref().unwrap_or(""),
            "TTS request completed"
        );
        Ok(payload)
    }

    /// Streaming exchange. Nothing is sent until the stream is first polled.
    pub fn send_stream(&self, envelope: RequestEnvelope) -> EventStream {
        Box::pin(event_stream(
            self.client.clone(),
            self.endpoint.clone(),
            self.stream_timeout,
            envelope,
        ))
    }
}

fn event_stream(
    client: reqwest::Client,
    endpoint: Url,
    idle: Duration,
    envelope: RequestEnvelope,
) -> impl Stream<Item = FlowTTSResult<StreamEvent>> + Send {
    try_stream! {
        let action = envelope.action;
        let headers = envelope.header_map()?;
        debug!(action, body_len = envelope.body.len(), "Opening TTS stream");

        let response = open_stream(&client, endpoint, headers, envelope.body, idle).await?;
        let mut body = Box::pin(response.bytes_stream());
        let mut demuxer = SseDemuxer::new();

        loop {
            let Some(chunk) = next_chunk(&mut body, idle).await? else {
                demuxer.finish();
                break;
            };
            demuxer.push(&chunk);

            while let Some(event) = demuxer.next_event() {
                let event = event?;
                if event.is_end() {
                    info!(action, audio_chunks = demuxer.emitted(), "TTS stream completed");
                    yield event;
                    return;
                }
                yield event;
            }
        }
    }
}

async fn open_stream(
    client: &reqwest::Client,
    endpoint: Url,
    headers: HeaderMap,
    body: Bytes,
    idle: Duration,
) -> FlowTTSResult<reqwest::Response> {
    let request = client
        .post(endpoint)
        .headers(headers)
        .header(ACCEPT, EVENT_STREAM)
        .body(body)
        .send();

    let response = timeout(idle, request)
        .await
        .map_err(|_| FlowTTSError::timeout(idle))??;

    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        let body = timeout(idle, response.bytes())
            .await
            .map_err(|_| FlowTTSError::timeout(idle))??;
        warn!(status = status.as_u16(), "TTS stream rejected");
        return Err(status_error(status, &body));
    }

    Ok(response)
}

async fn next_chunk<S>(body: &mut S, idle: Duration) -> FlowTTSResult<Option<Bytes>>
where
    S: Stream<Item = reqwest::Result<Bytes>> + Unpin,
{
    match timeout(idle, body.next()).await {
        Err(_) => Err(FlowTTSError::timeout(idle)),
        Ok(None) => Ok(None),
        Ok(Some(chunk)) => Ok(Some(chunk?)),
    }
}

// =============================================================================
// Response Mapping
// =============================================================================

/// Map a single-shot reply to its payload or error.
///
/// An embedded `Error` object wins over the HTTP status.
pub(crate) fn parse_single_shot(status: StatusCode, body: &[u8]) -> FlowTTSResult<SynthesisPayload> {
    let envelope: ResponseEnvelope = match serde_json::from_slice(body) {
        Ok(envelope) => envelope,
        Err(e) if status.is_success() => {
            return Err(FlowTTSError::decode(format!("response body is not JSON: {e}")));
        }
        Err(_) => return Err(http_status_error(status, body)),
    };

    let Some(response) = envelope.response else {
        if status.is_success() {
            return Err(FlowTTSError::decode("response has no Response object"));
        }
        return Err(http_status_error(status, body));
    };

    if let Some(error) = response.error {
        return Err(FlowTTSError::Protocol {
            code: error.code,
            message: error.message,
            request_id: response.request_id,
            status: Some(status.as_u16()),
        });
    }

    if !status.is_success() {
        return Err(http_status_error(status, body));
    }

    let audio = response
        .audio
        .filter(|audio| !audio.is_empty())
        .ok_or_else(|| FlowTTSError::decode("response has no Audio field"))?;

    Ok(SynthesisPayload {
        audio,
        request_id: response.request_id,
    })
}

fn status_error(status: StatusCode, body: &[u8]) -> FlowTTSError {
    let embedded = serde_json::from_slice::<ResponseEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.response)
        .and_then(|response| response.error.map(|error| (error, response.request_id)));

    match embedded {
        Some((error, request_id)) => FlowTTSError::Protocol {
            code: error.code,
            message: error.message,
            request_id,
            status: Some(status.as_u16()),
        },
        None => http_status_error(status, body),
    }
}

fn http_status_error(status: StatusCode, body: &[u8]) -> FlowTTSError {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    let excerpt: String = text.chars().take(MAX_ERROR_BODY_CHARS).collect();
    let message = if excerpt.len() < text.len() {
        format!("{excerpt}...")
    } else {
        excerpt
    };
    FlowTTSError::network(NetworkErrorKind::HttpStatus(status.as_u16()), message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::signer::{ACTION_TEXT_TO_SPEECH, ACTION_TEXT_TO_SPEECH_SSE, Credentials, Tc3Signer};
    use crate::error::ErrorKind;
    use futures::TryStreamExt;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn envelope(action: &'static str, body: &'static str) -> RequestEnvelope {
        let signer = Tc3Signer::new(Credentials::new("AKIDtest", "secret"));
        let signed = signer
            .sign_at(action, "ap-beijing", body.as_bytes(), 1_700_000_000)
            .unwrap();
        RequestEnvelope::new(action, signed, body)
    }

    fn transport(server: &MockServer) -> HttpTransport {
        HttpTransport::new(Url::parse(&server.uri()).unwrap()).unwrap()
    }

    const AUDIO_LINE: &str = "data: {\"Type\":\"audio\",\"Audio\":\"AAE=\"}\n\n";

    async fn read_request_head(socket: &mut TcpStream) {
        let mut received = Vec::new();
        let mut buf = [0u8; 1024];
        while !received.windows(4).any(|window| window == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            assert!(n > 0, "client closed before sending a request");
            received.extend_from_slice(&buf[..n]);
        }
    }

    /// Single-connection server that answers with a chunked event stream,
    /// sends `first_chunk`, then hands the open socket to `then`.
    async fn chunked_sse_server<F, Fut>(first_chunk: &'static str, then: F) -> Url
    where
        F: FnOnce(TcpStream) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request_head(&mut socket).await;

            let head = "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ntransfer-encoding: chunked\r\n\r\n";
            let chunk = format!("{:x}\r\n{first_chunk}\r\n", first_chunk.len());
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(chunk.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();

            then(socket).await;
        });
        Url::parse(&format!("http://{addr}/")).unwrap()
    }

    fn first_audio() -> StreamEvent {
        StreamEvent::Audio {
            data: Bytes::from_static(&[0, 1]),
            sequence: 0,
        }
    }

    // -------------------------------------------------------------------------
    // Response mapping
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_single_shot_success() {
        let payload = parse_single_shot(
            StatusCode::OK,
            br#"{"Response":{"Audio":"UklGRg==","RequestId":"r-1"}}"#,
        )
        .unwrap();
        assert_eq!(payload.audio, "UklGRg==");
        assert_eq!(payload.request_id.as_deref(), Some("r-1"));
    }

    #[test]
    fn test_parse_single_shot_embedded_error_wins_over_status() {
        let body = br#"{"Response":{"Error":{"Code":"AuthFailure.SignatureFailure","Message":"bad signature"},"RequestId":"r-2"}}"#;
        for status in [StatusCode::OK, StatusCode::FORBIDDEN] {
            let err = parse_single_shot(status, body).unwrap_err();
            match err {
                FlowTTSError::Protocol {
                    code,
                    request_id,
                    status: reported,
                    ..
                } => {
                    assert_eq!(code, "AuthFailure.SignatureFailure");
                    assert_eq!(request_id.as_deref(), Some("r-2"));
                    assert_eq!(reported, Some(status.as_u16()));
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn test_parse_single_shot_decode_failures() {
        let not_json = parse_single_shot(StatusCode::OK, b"<html>oops</html>").unwrap_err();
        assert_eq!(not_json.kind(), ErrorKind::Decode);

        let no_response = parse_single_shot(StatusCode::OK, b"{}").unwrap_err();
        assert_eq!(no_response.kind(), ErrorKind::Decode);

        let no_audio =
            parse_single_shot(StatusCode::OK, br#"{"Response":{"RequestId":"r"}}"#).unwrap_err();
        assert_eq!(no_audio.kind(), ErrorKind::Decode);
    }

    #[test]
    fn test_parse_single_shot_unstructured_http_error() {
        let err = parse_single_shot(StatusCode::BAD_GATEWAY, b"upstream unavailable").unwrap_err();
        match err {
            FlowTTSError::Network { kind, message } => {
                assert_eq!(kind, NetworkErrorKind::HttpStatus(502));
                assert_eq!(message, "upstream unavailable");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_http_status_error_truncates_body() {
        let body = "x".repeat(2000);
        let err = http_status_error(StatusCode::INTERNAL_SERVER_ERROR, body.as_bytes());
        match err {
            FlowTTSError::Network { message, .. } => {
                assert_eq!(message.len(), MAX_ERROR_BODY_CHARS + 3);
                assert!(message.ends_with("..."));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_envelope_debug_hides_authorization() {
        let envelope = envelope(ACTION_TEXT_TO_SPEECH, "{}");
        let printed = format!("{envelope:?}");
        assert!(!printed.contains("TC3-HMAC-SHA256"));
        assert!(printed.contains("TextToSpeech"));
    }

    #[test]
    fn test_invalid_header_value_is_configuration_error() {
        let signer = Tc3Signer::new(Credentials::new("AKIDtest", "secret"));
        let signed = signer
            .sign_at(ACTION_TEXT_TO_SPEECH, "ap-bei\njing", b"{}", 1_700_000_000)
            .unwrap();
        let envelope = RequestEnvelope::new(ACTION_TEXT_TO_SPEECH, signed, "{}");
        let err = envelope.header_map().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    // -------------------------------------------------------------------------
    // Single-shot exchange
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_send_posts_signed_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(header("x-tc-action", "TextToSpeech"))
            .and(header("x-tc-version", "2019-07-22"))
            .and(header("x-tc-region", "ap-beijing"))
            .and(header("content-type", "application/json; charset=utf-8"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Response": {"Audio": "AAEC", "RequestId": "req-123"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let payload = transport(&server)
            .send(envelope(ACTION_TEXT_TO_SPEECH, r#"{"Text":"hi"}"#))
            .await
            .unwrap();
        assert_eq!(payload.audio, "AAEC");
        assert_eq!(payload.request_id.as_deref(), Some("req-123"));
    }

    #[tokio::test]
    async fn test_send_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"Response": {"Audio": "AA=="}}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let transport = transport(&server)
            .with_timeouts(Duration::from_millis(50), Duration::from_millis(50));
        let err = transport
            .send(envelope(ACTION_TEXT_TO_SPEECH, "{}"))
            .await
            .unwrap_err();
        match err {
            FlowTTSError::Network { kind, .. } => assert_eq!(kind, NetworkErrorKind::Timeout),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_connection_refused() {
        // Bind and release a port so nothing is listening on it
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let endpoint = Url::parse(&format!("http://{addr}/")).unwrap();
        let transport = HttpTransport::new(endpoint).unwrap();
        let err = transport
            .send(envelope(ACTION_TEXT_TO_SPEECH, "{}"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(err.is_retryable());
    }

    // -------------------------------------------------------------------------
    // Streaming exchange
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_send_stream_yields_events() {
        let server = MockServer::start().await;
        let body = concat!(
            "data: {\"Type\":\"audio\",\"Audio\":\"AAE=\",\"ChunkId\":5}\n\n",
            "data: {\"Type\":\"audio\",\"Audio\":\"AgM=\",\"ChunkId\":6}\n\n",
            "data: {\"Type\":\"end\",\"RequestId\":\"req-s\"}\n\n",
        );
        Mock::given(method("POST"))
            .and(header("x-tc-action", "TextToSpeechSSE"))
            .and(header("accept", "text/event-stream"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let events: Vec<StreamEvent> = transport(&server)
            .send_stream(envelope(ACTION_TEXT_TO_SPEECH_SSE, "{}"))
            .try_collect()
            .await
            .unwrap();

        assert_eq!(
            events,
            vec![
                StreamEvent::Audio {
                    data: Bytes::from_static(&[0, 1]),
                    sequence: 0
                },
                StreamEvent::Audio {
                    data: Bytes::from_static(&[2, 3]),
                    sequence: 1
                },
                StreamEvent::End {
                    total_chunks: 2,
                    request_id: Some("req-s".to_string())
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_send_stream_is_lazy() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("data: {\"Type\":\"end\"}\n"))
            .expect(0)
            .mount(&server)
            .await;

        let stream = transport(&server).send_stream(envelope(ACTION_TEXT_TO_SPEECH_SSE, "{}"));
        drop(stream);
        server.verify().await;
    }

    #[tokio::test]
    async fn test_send_stream_embedded_error() {
        let server = MockServer::start().await;
        let body = concat!(
            "data: {\"Type\":\"audio\",\"Audio\":\"AAE=\"}\n",
            "data: {\"Error\":{\"Code\":\"FailedOperation\",\"Message\":\"engine busy\"}}\n",
            "data: {\"Type\":\"audio\",\"Audio\":\"AgM=\"}\n",
        );
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let mut stream = transport(&server).send_stream(envelope(ACTION_TEXT_TO_SPEECH_SSE, "{}"));
        assert!(stream.next().await.unwrap().is_ok());
        let err = stream.next().await.unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_send_stream_http_error_with_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "Response": {
                    "Error": {"Code": "AuthFailure.SecretIdNotFound", "Message": "unknown key"},
                    "RequestId": "req-e"
                }
            })))
            .mount(&server)
            .await;

        let mut stream = transport(&server).send_stream(envelope(ACTION_TEXT_TO_SPEECH_SSE, "{}"));
        let err = stream.next().await.unwrap().unwrap_err();
        match err {
            FlowTTSError::Protocol {
                code,
                request_id,
                status,
                ..
            } => {
                assert_eq!(code, "AuthFailure.SecretIdNotFound");
                assert_eq!(request_id.as_deref(), Some("req-e"));
                assert_eq!(status, Some(401));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_send_stream_http_error_without_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("service unavailable"))
            .mount(&server)
            .await;

        let mut stream = transport(&server).send_stream(envelope(ACTION_TEXT_TO_SPEECH_SSE, "{}"));
        let err = stream.next().await.unwrap().unwrap_err();
        match &err {
            FlowTTSError::Network { kind, message } => {
                assert_eq!(*kind, NetworkErrorKind::HttpStatus(503));
                assert_eq!(message, "service unavailable");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_send_stream_eof_without_end() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "data: {\"Type\":\"audio\",\"Audio\":\"AAE=\"}\ndata: {\"Type\":\"aud",
            ))
            .mount(&server)
            .await;

        let events: Vec<StreamEvent> = transport(&server)
            .send_stream(envelope(ACTION_TEXT_TO_SPEECH_SSE, "{}"))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert!(!events[0].is_end());
    }

    #[tokio::test]
    async fn test_send_stream_open_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("data: {\"Type\":\"end\"}\n")
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let transport = transport(&server)
            .with_timeouts(Duration::from_millis(50), Duration::from_millis(50));
        let mut stream = transport.send_stream(envelope(ACTION_TEXT_TO_SPEECH_SSE, "{}"));
        let err = stream.next().await.unwrap().unwrap_err();
        match err {
            FlowTTSError::Network { kind, .. } => assert_eq!(kind, NetworkErrorKind::Timeout),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_stream_idle_timeout_after_audio() {
        let endpoint = chunked_sse_server(AUDIO_LINE, |socket| async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(socket);
        })
        .await;

        let transport = HttpTransport::new(endpoint)
            .unwrap()
            .with_timeouts(Duration::from_secs(5), Duration::from_millis(300));
        let mut stream = transport.send_stream(envelope(ACTION_TEXT_TO_SPEECH_SSE, "{}"));

        assert_eq!(stream.next().await.unwrap().unwrap(), first_audio());
        match stream.next().await.unwrap().unwrap_err() {
            FlowTTSError::Network { kind, .. } => assert_eq!(kind, NetworkErrorKind::Timeout),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_send_stream_connection_lost_after_audio() {
        let endpoint = chunked_sse_server(AUDIO_LINE, |socket| async move {
            drop(socket);
        })
        .await;

        let transport = HttpTransport::new(endpoint).unwrap();
        let mut stream = transport.send_stream(envelope(ACTION_TEXT_TO_SPEECH_SSE, "{}"));

        assert_eq!(stream.next().await.unwrap().unwrap(), first_audio());
        let err = stream.next().await.unwrap().unwrap_err();
        match &err {
            FlowTTSError::Network { kind, .. } => assert_eq!(*kind, NetworkErrorKind::Body),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_retryable());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_dropping_stream_mid_way_closes_connection() {
        let (closed_tx, closed_rx) = tokio::sync::oneshot::channel();
        let endpoint = chunked_sse_server(AUDIO_LINE, |mut socket| async move {
            let mut buf = [0u8; 256];
            while let Ok(n) = socket.read(&mut buf).await {
                if n == 0 {
                    break;
                }
            }
            let _ = closed_tx.send(());
        })
        .await;

        let transport = HttpTransport::new(endpoint).unwrap();
        let mut stream = transport.send_stream(envelope(ACTION_TEXT_TO_SPEECH_SSE, "{}"));
        assert_eq!(stream.next().await.unwrap().unwrap(), first_audio());

        drop(stream);
        tokio::time::timeout(Duration::from_secs(5), closed_rx)
            .await
            .expect("connection still open after the stream was dropped")
            .unwrap();
        drop(transport);
    }
}

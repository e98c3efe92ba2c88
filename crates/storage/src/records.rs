//! Record service client for profile and listing records.
//!
//! Speaks the REST interface of the backing key-value record service:
//! `PUT` replaces the record at a path, `PATCH` merges fields into it, and a
//! server-sent-events stream delivers the current value followed by
//! subsequent changes for a watched path.

use futures::stream::{self, Stream, StreamExt};
use reqwest::{header, Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use roomshare_common::{RoomshareError, RoomshareResult};

/// Configuration for the record service connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordStoreConfig {
    /// Base URL of the record service
    pub base_url: String,
    /// Auth token appended to every request, when present
    pub auth_token: Option<String>,
    /// HTTP request timeout in seconds (writes and reads, not subscriptions)
    pub timeout_secs: u64,
}

impl Default for RecordStoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://records:8080".to_string(),
            auth_token: None,
            timeout_secs: 30,
        }
    }
}

/// A change notification for a watched record path.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordEvent {
    pub kind: RecordEventKind,
    /// Path of the change, relative to the watched path
    pub path: String,
    pub data: Value,
}

/// How the record at the event path changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordEventKind {
    /// The value at the path was replaced
    Put,
    /// Fields were merged into the value at the path
    Patch,
}

/// Record service client.
pub struct RecordStore {
    client: Client,
    /// Separate client without a request timeout, for long-lived subscriptions
    stream_client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl RecordStore {
    /// Create a new record store client from config.
    pub fn new(config: &RecordStoreConfig) -> RoomshareResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                RoomshareError::InvalidConfig(format!("Failed to create HTTP client: {}", e))
            })?;

        let stream_client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                RoomshareError::InvalidConfig(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            stream_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        })
    }

    /// Replace the record at a path with the given value.
    #[instrument(skip(self, value), fields(path = %path))]
    pub async fn write<T: Serialize + ?Sized>(
        &self,
        path: &str,
        value: &T,
    ) -> RoomshareResult<()> {
        let request = self.client.put(self.record_url(path)).json(value);
        self.send_write(request, path).await
    }

    /// Merge the given fields into the record at a path.
    #[instrument(skip(self, value), fields(path = %path))]
    pub async fn merge<T: Serialize + ?Sized>(
        &self,
        path: &str,
        value: &T,
    ) -> RoomshareResult<()> {
        let request = self.client.patch(self.record_url(path)).json(value);
        self.send_write(request, path).await
    }

    /// Read the current value at a path; `None` when no record exists.
    #[instrument(skip(self), fields(path = %path))]
    pub async fn get(&self, path: &str) -> RoomshareResult<Option<Value>> {
        let request = self.with_auth(self.client.get(self.record_url(path)));

        let response = request.send().await.map_err(|e| {
            RoomshareError::Internal(format!("Read of {} failed: {}", path, e))
        })?;

        if !response.status().is_success() {
            return Err(RoomshareError::Internal(format!(
                "Read of {} failed: HTTP {}",
                path,
                response.status()
            )));
        }

        let value: Value = response.json().await.map_err(|e| {
            RoomshareError::Internal(format!("Read of {} returned invalid JSON: {}", path, e))
        })?;

        // The service encodes "no record" as a JSON null body
        Ok(match value {
            Value::Null => None,
            value => Some(value),
        })
    }

    /// Subscribe to a path, receiving the current value and subsequent
    /// changes as a stream of [`RecordEvent`]s.
    ///
    /// The stream ends when the server closes the connection; there is no
    /// client-side reconnect.
    #[instrument(skip(self), fields(path = %path))]
    pub async fn subscribe(
        &self,
        path: &str,
    ) -> RoomshareResult<impl Stream<Item = RoomshareResult<RecordEvent>>> {
        let request = self
            .with_auth(self.stream_client.get(self.record_url(path)))
            .header(header::ACCEPT, "text/event-stream");

        let response = request.send().await.map_err(|e| {
            RoomshareError::Internal(format!("Subscribe to {} failed: {}", path, e))
        })?;

        if !response.status().is_success() {
            return Err(RoomshareError::Internal(format!(
                "Subscribe to {} failed: HTTP {}",
                path,
                response.status()
            )));
        }

        debug!("Subscription established");

        let events = response
            .bytes_stream()
            .scan(SseParser::default(), |parser, chunk| {
                let frames = match chunk {
                    Ok(bytes) => Ok(parser.push(&bytes)),
                    Err(e) => Err(RoomshareError::Internal(format!(
                        "Subscription stream failed: {}",
                        e
                    ))),
                };
                futures::future::ready(Some(frames))
            })
            .flat_map(|frames| {
                let items: Vec<RoomshareResult<(String, String)>> = match frames {
                    Ok(frames) => frames.into_iter().map(Ok).collect(),
                    Err(e) => vec![Err(e)],
                };
                stream::iter(items)
            })
            .filter_map(|frame| async move {
                match frame {
                    Ok((event, data)) => parse_event(&event, &data).transpose(),
                    Err(e) => Some(Err(e)),
                }
            });

        Ok(events)
    }

    fn record_url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path.trim_matches('/'))
    }

    fn with_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.query(&[("auth", token)]),
            None => request,
        }
    }

    async fn send_write(&self, request: RequestBuilder, path: &str) -> RoomshareResult<()> {
        let response = self.with_auth(request).send().await.map_err(|e| {
            RoomshareError::Persist(format!("Request for {} failed: {}", path, e))
        })?;

        if !response.status().is_success() {
            return Err(RoomshareError::Persist(format!(
                "Write to {} failed: HTTP {}",
                path,
                response.status()
            )));
        }

        debug!("Record written");
        Ok(())
    }
}

/// Path builder for consistent record layout.
pub struct RecordPath;

impl RecordPath {
    /// Build path for a user's profile record.
    /// Format: users/{userId}
    pub fn user(user_id: &str) -> String {
        format!("users/{}", user_id)
    }

    /// Build path for a user's listing record.
    /// Format: users/{userId}/residenceInfo
    pub fn residence_info(user_id: &str) -> String {
        format!("users/{}/residenceInfo", user_id)
    }
}

/// Incremental parser for a server-sent-events byte stream.
///
/// Frames are separated by a blank line; each frame carries `event:` and
/// `data:` lines. Partial frames are buffered until the separator arrives.
#[derive(Debug, Default)]
struct SseParser {
    buffer: String,
}

impl SseParser {
    /// Feed a chunk of bytes, returning any completed `(event, data)` frames.
    fn push(&mut self, chunk: &[u8]) -> Vec<(String, String)> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        let mut frames = Vec::new();
        while let Some(end) = self.buffer.find("\n\n") {
            let frame: String = self.buffer.drain(..end + 2).collect();

            let mut event = String::new();
            let mut data = String::new();
            for line in frame.lines() {
                if let Some(rest) = line.strip_prefix("event:") {
                    event = rest.trim().to_string();
                } else if let Some(rest) = line.strip_prefix("data:") {
                    if !data.is_empty() {
                        data.push('\n');
                    }
                    data.push_str(rest.trim_start());
                }
            }

            if !event.is_empty() {
                frames.push((event, data));
            }
        }

        frames
    }
}

/// Decode one SSE frame into a record event.
///
/// Keep-alive and unrecognized frames yield `None`; a server-side
/// cancellation yields an error.
fn parse_event(event: &str, data: &str) -> RoomshareResult<Option<RecordEvent>> {
    let kind = match event {
        "put" => RecordEventKind::Put,
        "patch" => RecordEventKind::Patch,
        "keep-alive" => return Ok(None),
        "cancel" | "auth_revoked" => {
            return Err(RoomshareError::Internal(format!(
                "Subscription closed by server: {}",
                event
            )))
        }
        other => {
            warn!(event = %other, "Ignoring unknown subscription event");
            return Ok(None);
        }
    };

    let payload: Value = serde_json::from_str(data).map_err(|e| {
        RoomshareError::Internal(format!("Invalid subscription payload: {}", e))
    })?;

    let path = payload
        .get("path")
        .and_then(Value::as_str)
        .unwrap_or("/")
        .to_string();
    let data = payload.get("data").cloned().unwrap_or(Value::Null);

    Ok(Some(RecordEvent { kind, path, data }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_paths() {
        assert_eq!(RecordPath::user("uid123"), "users/uid123");
        assert_eq!(
            RecordPath::residence_info("uid123"),
            "users/uid123/residenceInfo"
        );
    }

    #[test]
    fn test_record_url_formatting() {
        let store = RecordStore::new(&RecordStoreConfig {
            base_url: "http://records:8080/".to_string(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(
            store.record_url("users/uid123"),
            "http://records:8080/users/uid123.json"
        );
        assert_eq!(
            store.record_url("/users/uid123/residenceInfo/"),
            "http://records:8080/users/uid123/residenceInfo.json"
        );
    }

    #[test]
    fn test_sse_parser_handles_split_chunks() {
        let mut parser = SseParser::default();

        assert!(parser.push(b"event: put\ndata: {\"path\":\"/\",").is_empty());
        let frames = parser.push(b"\"data\":{\"name\":\"Anna\"}}\n\n");

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].0, "put");
        assert_eq!(frames[0].1, r#"{"path":"/","data":{"name":"Anna"}}"#);
    }

    #[test]
    fn test_sse_parser_multiple_frames_in_one_chunk() {
        let mut parser = SseParser::default();
        let frames = parser.push(
            b"event: put\ndata: {\"path\":\"/\",\"data\":null}\n\n\
              event: keep-alive\ndata: null\n\n",
        );

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].0, "put");
        assert_eq!(frames[1].0, "keep-alive");
    }

    #[test]
    fn test_parse_event_put() {
        let event = parse_event("put", r#"{"path":"/","data":{"name":"Anna"}}"#)
            .unwrap()
            .unwrap();

        assert_eq!(event.kind, RecordEventKind::Put);
        assert_eq!(event.path, "/");
        assert_eq!(event.data, json!({"name": "Anna"}));
    }

    #[test]
    fn test_parse_event_patch_with_subpath() {
        let event = parse_event("patch", r#"{"path":"/images","data":["a","b"]}"#)
            .unwrap()
            .unwrap();

        assert_eq!(event.kind, RecordEventKind::Patch);
        assert_eq!(event.path, "/images");
        assert_eq!(event.data, json!(["a", "b"]));
    }

    #[test]
    fn test_parse_event_keep_alive_is_skipped() {
        assert!(parse_event("keep-alive", "null").unwrap().is_none());
    }

    #[test]
    fn test_parse_event_cancel_is_an_error() {
        assert!(parse_event("cancel", "null").is_err());
        assert!(parse_event("auth_revoked", "null").is_err());
    }
}

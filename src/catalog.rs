//! Client for the remote video catalog.
//!
//! The catalog exposes two JSON endpoints under a configurable base URL:
//! `GET max-timestamp` (newest `created_at` it holds) and `POST store`
//! (register one video). [`Catalog`] is the seam the processor talks to so
//! tests can swap in an in-memory double.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::CatalogError;
use crate::filename::MediaRecord;

/// Body of `POST store`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoPayload {
    pub title: String,
    /// Reserved by the catalog, sent empty unless set by the caller
    pub name: String,
    pub file_name: String,
    pub created_at: String,
    pub updated_at: String,
}

impl VideoPayload {
    /// Both timestamps carry the file's own capture time
    pub fn from_record(record: &MediaRecord) -> Self {
        VideoPayload {
            title: record.title.clone(),
            name: String::new(),
            file_name: record.file_name.clone(),
            created_at: record.normalized_timestamp.clone(),
            updated_at: record.normalized_timestamp.clone(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct MaxTimestampResponse {
    #[serde(default)]
    max_created_at: Option<String>,
}

pub trait Catalog {
    /// Newest creation timestamp the catalog holds, as sent by the server.
    /// An empty catalog answers with an empty string.
    fn max_timestamp(&self) -> Result<String, CatalogError>;

    /// Register one video
    fn store(&self, payload: &VideoPayload) -> Result<(), CatalogError>;
}

/// [`Catalog`] over HTTP
pub struct HttpCatalog {
    max_timestamp_url: String,
    store_url: String,
    read_agent: ureq::Agent,
    write_agent: ureq::Agent,
}

impl HttpCatalog {
    pub fn new(base_url: &str, read_timeout: Duration, write_timeout: Duration) -> Self {
        let base = base_url.trim_end_matches('/');
        HttpCatalog {
            max_timestamp_url: format!("{}/max-timestamp", base),
            store_url: format!("{}/store", base),
            read_agent: ureq::AgentBuilder::new().timeout(read_timeout).build(),
            write_agent: ureq::AgentBuilder::new().timeout(write_timeout).build(),
        }
    }

    pub fn max_timestamp_url(&self) -> &str {
        &self.max_timestamp_url
    }

    pub fn store_url(&self) -> &str {
        &self.store_url
    }
}

impl Catalog for HttpCatalog {
    fn max_timestamp(&self) -> Result<String, CatalogError> {
        debug!(url = %self.max_timestamp_url, "fetching catalog watermark");

        let response = self
            .read_agent
            .get(&self.max_timestamp_url)
            .set("Accept", "application/json")
            .call()
            .map_err(into_catalog_error)?;
        let response = require_success(response)?;

        let body = response
            .into_string()
            .map_err(|e| CatalogError::Body(e.to_string()))?;
        let parsed: MaxTimestampResponse =
            serde_json::from_str(&body).map_err(|e| CatalogError::Body(format!("{e}: {body}")))?;

        Ok(parsed.max_created_at.unwrap_or_default())
    }

    fn store(&self, payload: &VideoPayload) -> Result<(), CatalogError> {
        let body = serde_json::to_string(payload).map_err(|e| CatalogError::Body(e.to_string()))?;
        debug!(url = %self.store_url, file = %payload.file_name, "posting video");

        let response = self
            .write_agent
            .post(&self.store_url)
            .set("Content-Type", "application/json")
            .set("Accept", "application/json")
            .send_string(&body)
            .map_err(into_catalog_error)?;
        require_success(response)?;

        Ok(())
    }
}

/// ureq reports 4xx/5xx as errors; keep the body, the catalog explains
/// validation failures there.
fn into_catalog_error(err: ureq::Error) -> CatalogError {
    match err {
        ureq::Error::Status(status, response) => CatalogError::Status {
            status,
            body: read_body(response),
        },
        ureq::Error::Transport(transport) => CatalogError::Transport(transport.to_string()),
    }
}

/// Redirects are followed, so anything else outside 2xx lands here
fn require_success(response: ureq::Response) -> Result<ureq::Response, CatalogError> {
    let status = response.status();
    if (200..300).contains(&status) {
        Ok(response)
    } else {
        Err(CatalogError::Status {
            status,
            body: read_body(response),
        })
    }
}

fn read_body(response: ureq::Response) -> String {
    response
        .into_string()
        .unwrap_or_else(|e| format!("<failed to read response body: {e}>"))
}

#[cfg(test)]
pub(crate) mod stub {
    //! One-shot HTTP responders for exercising the real client

    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};
    use std::time::Duration;

    /// A request as seen by the stub server
    #[derive(Debug)]
    pub struct Captured {
        pub request_line: String,
        pub headers: Vec<(String, String)>,
        pub body: String,
    }

    impl Captured {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }
    }

    /// Serve `responses` in order, one per connection, then stop.
    /// Returns the base URL and a handle yielding the captured requests.
    pub fn serve(responses: Vec<(u16, String)>) -> (String, JoinHandle<Vec<Captured>>) {
        serve_with_delay(responses, Duration::ZERO)
    }

    pub fn serve_with_delay(
        responses: Vec<(u16, String)>,
        delay: Duration,
    ) -> (String, JoinHandle<Vec<Captured>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let mut captured = Vec::new();
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());

                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();

                let mut headers = Vec::new();
                let mut content_length = 0;
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).unwrap();
                    let line = line.trim_end();
                    if line.is_empty() {
                        break;
                    }
                    if let Some((k, v)) = line.split_once(':') {
                        let (k, v) = (k.trim().to_string(), v.trim().to_string());
                        if k.eq_ignore_ascii_case("content-length") {
                            content_length = v.parse().unwrap();
                        }
                        headers.push((k, v));
                    }
                }

                let mut request_body = vec![0; content_length];
                reader.read_exact(&mut request_body).unwrap();

                thread::sleep(delay);

                let response = format!(
                    "HTTP/1.1 {} STUB\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                // The client may have given up already
                let _ = stream.write_all(response.as_bytes());

                captured.push(Captured {
                    request_line: request_line.trim_end().to_string(),
                    headers,
                    body: String::from_utf8(request_body).unwrap(),
                });
            }
            captured
        });

        (format!("http://{}", addr), handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(base: &str) -> HttpCatalog {
        HttpCatalog::new(base, Duration::from_secs(2), Duration::from_secs(5))
    }

    fn record() -> MediaRecord {
        MediaRecord {
            title: "Trip A".to_string(),
            raw_timestamp: "2024-01-02 03-04-05".to_string(),
            file_name: "Trip A 2024-01-02 03-04-05.mp4".to_string(),
            normalized_timestamp: "2024-01-02 03:04:05".to_string(),
        }
    }

    #[test]
    fn test_endpoint_urls_tolerate_trailing_slash() {
        let a = catalog("http://catalog.local/hv/api/videos");
        let b = catalog("http://catalog.local/hv/api/videos/");
        assert_eq!(a.store_url(), "http://catalog.local/hv/api/videos/store");
        assert_eq!(b.store_url(), a.store_url());
        assert_eq!(b.max_timestamp_url(), "http://catalog.local/hv/api/videos/max-timestamp");
    }

    #[test]
    fn test_payload_from_record() {
        let payload = VideoPayload::from_record(&record());
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "title": "Trip A",
                "name": "",
                "file_name": "Trip A 2024-01-02 03-04-05.mp4",
                "created_at": "2024-01-02 03:04:05",
                "updated_at": "2024-01-02 03:04:05",
            })
        );
        assert_eq!(payload.with_name("alt").name, "alt");
    }

    #[test]
    fn test_max_timestamp_reads_field() {
        let (base, server) = stub::serve(vec![(
            200,
            r#"{"max_created_at":"2024-01-02 03:04:05"}"#.to_string(),
        )]);

        let value = catalog(&base).max_timestamp().unwrap();
        assert_eq!(value, "2024-01-02 03:04:05");

        let requests = server.join().unwrap();
        assert_eq!(requests[0].request_line, "GET /max-timestamp HTTP/1.1");
        assert_eq!(requests[0].header("accept"), Some("application/json"));
    }

    #[test]
    fn test_max_timestamp_null_or_missing_is_empty() {
        let (base, server) = stub::serve(vec![
            (200, r#"{"max_created_at":null}"#.to_string()),
            (200, "{}".to_string()),
        ]);

        let client = catalog(&base);
        assert_eq!(client.max_timestamp().unwrap(), "");
        assert_eq!(client.max_timestamp().unwrap(), "");
        server.join().unwrap();
    }

    #[test]
    fn test_max_timestamp_malformed_body() {
        let (base, server) = stub::serve(vec![(200, "<html>oops</html>".to_string())]);

        let err = catalog(&base).max_timestamp().unwrap_err();
        assert!(matches!(err, CatalogError::Body(_)), "{err:?}");
        server.join().unwrap();
    }

    #[test]
    fn test_store_posts_json() {
        let (base, server) = stub::serve(vec![(201, r#"{"id":1}"#.to_string())]);

        catalog(&base).store(&VideoPayload::from_record(&record())).unwrap();

        let requests = server.join().unwrap();
        assert_eq!(requests[0].request_line, "POST /store HTTP/1.1");
        assert_eq!(requests[0].header("content-type"), Some("application/json"));
        let sent: VideoPayload = serde_json::from_str(&requests[0].body).unwrap();
        assert_eq!(sent, VideoPayload::from_record(&record()));
    }

    #[test]
    fn test_store_error_keeps_status_and_body() {
        let detail = r#"{"message":"The file name has already been taken."}"#;
        let (base, server) = stub::serve(vec![(422, detail.to_string())]);

        let err = catalog(&base)
            .store(&VideoPayload::from_record(&record()))
            .unwrap_err();
        match err {
            CatalogError::Status { status, body } => {
                assert_eq!(status, 422);
                assert_eq!(body, detail);
            }
            other => panic!("expected status error, got {other:?}"),
        }
        server.join().unwrap();
    }

    #[test]
    fn test_connection_refused_is_transport_error() {
        // Bind then drop to get a port nobody listens on
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        let err = catalog(&format!("http://127.0.0.1:{port}")).max_timestamp().unwrap_err();
        assert!(matches!(err, CatalogError::Transport(_)), "{err:?}");
    }

    #[test]
    fn test_read_timeout_is_transport_error() {
        let (base, server) = stub::serve_with_delay(
            vec![(200, r#"{"max_created_at":""}"#.to_string())],
            Duration::from_millis(800),
        );

        let client = HttpCatalog::new(&base, Duration::from_millis(200), Duration::from_secs(5));
        let err = client.max_timestamp().unwrap_err();
        assert!(matches!(err, CatalogError::Transport(_)), "{err:?}");
        server.join().unwrap();
    }
}

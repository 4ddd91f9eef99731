//! HTTP client abstraction for testability.
//!
//! Every network call the engine makes goes through [`HttpClient`], so the
//! fetcher, link resolver and transfer executor can be driven by a mock in
//! tests. Each call carries its own timeout; no request blocks indefinitely.

use std::io::{self, Read, Write};
use std::time::Duration;

use thiserror::Error;

/// User agent sent with every request.
const USER_AGENT: &str = concat!("archsync/", env!("CARGO_PKG_VERSION"));

/// Buffer size for streaming response bodies (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Errors from a single HTTP exchange.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The HTTP client itself could not be constructed.
    #[error("failed to create HTTP client: {0}")]
    Client(String),

    /// Connection refused, DNS failure, TLS failure and similar.
    #[error("cannot reach {url}: {reason}")]
    Unreachable { url: String, reason: String },

    /// The request did not complete within its timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// The connection broke while reading the body.
    #[error("failed to read response from {url}: {reason}")]
    Body { url: String, reason: String },

    /// The local sink rejected downloaded bytes.
    #[error("failed to write downloaded data: {0}")]
    Write(#[source] io::Error),
}

impl HttpError {
    /// Whether this failure means the remote side could not be reached at all.
    pub fn is_offline(&self) -> bool {
        matches!(self, Self::Unreachable { .. } | Self::Timeout { .. })
    }
}

/// Trait for HTTP client operations.
///
/// Implementations must be usable from any thread; hosts may run a sync pass
/// on a worker thread while polling progress elsewhere.
pub trait HttpClient: Send + Sync {
    /// Performs a GET request and returns the whole body.
    ///
    /// Intended for small documents (manifests, API responses).
    fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, HttpError>;

    /// Performs a GET request and streams the body into `sink` in bounded
    /// chunks. Returns the number of bytes written.
    fn download(&self, url: &str, timeout: Duration, sink: &mut dyn Write)
        -> Result<u64, HttpError>;
}

/// Real HTTP client implementation using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Creates a new client. Timeouts are applied per request.
    pub fn new() -> Result<Self, HttpError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| HttpError::Client(e.to_string()))?;

        Ok(Self { client })
    }

    fn send(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<reqwest::blocking::Response, HttpError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .map_err(|e| classify_send_error(url, timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, HttpError> {
        tracing::trace!(url = %url, "GET");
        let response = self.send(url, timeout)?;

        response.bytes().map(|b| b.to_vec()).map_err(|e| {
            if e.is_timeout() {
                timeout_error(url, timeout)
            } else {
                HttpError::Body {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })
    }

    fn download(
        &self,
        url: &str,
        timeout: Duration,
        sink: &mut dyn Write,
    ) -> Result<u64, HttpError> {
        tracing::trace!(url = %url, "GET (streaming)");
        let mut response = self.send(url, timeout)?;

        let mut buffer = vec![0u8; BUFFER_SIZE];
        let mut written = 0u64;

        loop {
            let bytes_read = match response.read(&mut buffer) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                    return Err(timeout_error(url, timeout))
                }
                Err(e) => {
                    return Err(HttpError::Body {
                        url: url.to_string(),
                        reason: e.to_string(),
                    })
                }
            };

            if bytes_read == 0 {
                break;
            }

            sink.write_all(&buffer[..bytes_read])
                .map_err(HttpError::Write)?;
            written += bytes_read as u64;
        }

        sink.flush().map_err(HttpError::Write)?;
        Ok(written)
    }
}

fn timeout_error(url: &str, timeout: Duration) -> HttpError {
    HttpError::Timeout {
        url: url.to_string(),
        timeout_secs: timeout.as_secs(),
    }
}

fn classify_send_error(url: &str, timeout: Duration, e: reqwest::Error) -> HttpError {
    if e.is_timeout() {
        return timeout_error(url, timeout);
    }
    if let Some(status) = e.status() {
        return HttpError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        };
    }
    HttpError::Unreachable {
        url: url.to_string(),
        reason: e.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Canned response for a mocked URL.
    #[derive(Debug, Clone)]
    pub(crate) enum MockResponse {
        Body(Vec<u8>),
        Status(u16),
        Timeout,
    }

    /// Mock HTTP client for testing.
    ///
    /// URLs are matched exactly first, then with the query string removed, so
    /// routes for download URLs do not need to know the cache-busting token.
    /// Unknown URLs behave like a refused connection.
    #[derive(Debug, Default)]
    pub(crate) struct MockHttpClient {
        routes: HashMap<String, MockResponse>,
        requests: Mutex<Vec<String>>,
    }

    impl MockHttpClient {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn route(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
            self.routes
                .insert(url.to_string(), MockResponse::Body(body.into()));
            self
        }

        pub(crate) fn route_status(mut self, url: &str, status: u16) -> Self {
            self.routes
                .insert(url.to_string(), MockResponse::Status(status));
            self
        }

        pub(crate) fn route_timeout(mut self, url: &str) -> Self {
            self.routes.insert(url.to_string(), MockResponse::Timeout);
            self
        }

        /// Every URL requested so far, in order.
        pub(crate) fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }

        /// Number of requests whose URL starts with `prefix`.
        pub(crate) fn count_requests(&self, prefix: &str) -> usize {
            self.requests()
                .iter()
                .filter(|u| u.starts_with(prefix))
                .count()
        }

        fn respond(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, HttpError> {
            self.requests.lock().unwrap().push(url.to_string());

            let base = url.split('?').next().unwrap_or(url);
            let response = self.routes.get(url).or_else(|| self.routes.get(base));

            match response {
                Some(MockResponse::Body(body)) => Ok(body.clone()),
                Some(MockResponse::Status(status)) => Err(HttpError::Status {
                    url: url.to_string(),
                    status: *status,
                }),
                Some(MockResponse::Timeout) => Err(timeout_error(url, timeout)),
                None => Err(HttpError::Unreachable {
                    url: url.to_string(),
                    reason: "connection refused".to_string(),
                }),
            }
        }
    }

    impl HttpClient for MockHttpClient {
        fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, HttpError> {
            self.respond(url, timeout)
        }

        fn download(
            &self,
            url: &str,
            timeout: Duration,
            sink: &mut dyn Write,
        ) -> Result<u64, HttpError> {
            let body = self.respond(url, timeout)?;
            sink.write_all(&body).map_err(HttpError::Write)?;
            Ok(body.len() as u64)
        }
    }

    #[test]
    fn test_mock_client_success() {
        let mock = MockHttpClient::new().route("http://example.com/a", vec![1, 2, 3, 4]);

        let result = mock.get("http://example.com/a", Duration::from_secs(1));
        assert_eq!(result.unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_mock_client_ignores_query_for_fallback() {
        let mock = MockHttpClient::new().route("http://example.com/a", b"data".to_vec());

        let mut sink = Vec::new();
        let written = mock
            .download("http://example.com/a?v=123", Duration::from_secs(1), &mut sink)
            .unwrap();

        assert_eq!(written, 4);
        assert_eq!(sink, b"data");
        assert_eq!(mock.requests(), vec!["http://example.com/a?v=123"]);
    }

    #[test]
    fn test_mock_client_unknown_url_is_offline() {
        let mock = MockHttpClient::new();

        let err = mock
            .get("http://example.com/missing", Duration::from_secs(1))
            .unwrap_err();
        assert!(err.is_offline());
    }

    #[test]
    fn test_status_error_is_not_offline() {
        let err = HttpError::Status {
            url: "http://example.com".to_string(),
            status: 404,
        };
        assert!(!err.is_offline());
        assert_eq!(err.to_string(), "HTTP 404 from http://example.com");
    }

    #[test]
    fn test_timeout_error_is_offline() {
        let err = timeout_error("http://example.com", Duration::from_secs(6));
        assert!(err.is_offline());
        assert!(err.to_string().contains("6s"));
    }

    #[test]
    fn test_reqwest_client_new() {
        assert!(ReqwestClient::new().is_ok());
    }
}

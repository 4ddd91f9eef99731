//! pCloud public-link resolver.
//!
//! A folder handle is a pCloud share URL (`https://u.pcloud.link/publink/show?code=XYZ`)
//! or the bare share code. Resolution uses two API calls:
//!
//! - `showpublink?code=…` returns the folder tree; files are matched by name;
//! - `getpublinkdownload?code=…&fileid=…` returns `hosts` and `path`, which
//!   combine into `https://{hosts[0]}{path}`.
//!
//! Both calls report failure through a non-zero `result` field.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use serde_json::Value;

use super::{FolderListing, LinkResolver, ResolveError, ResolveResult};
use crate::http::HttpClient;

/// Public pCloud API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.pcloud.com";

const SHOW_CALL: &str = "showpublink";
const DOWNLOAD_CALL: &str = "getpublinkdownload";

/// Resolver for pCloud shared folders.
#[derive(Clone)]
pub struct PcloudResolver {
    client: Arc<dyn HttpClient>,
    api_base: String,
}

impl std::fmt::Debug for PcloudResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PcloudResolver")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl PcloudResolver {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self::with_api_base(client, DEFAULT_API_BASE)
    }

    /// Use a different API endpoint (regional mirrors, tests).
    pub fn with_api_base(client: Arc<dyn HttpClient>, api_base: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn call(
        &self,
        method: &'static str,
        params: &[(&str, String)],
        timeout: Duration,
    ) -> ResolveResult<Value> {
        let url = Url::parse_with_params(&format!("{}/{}", self.api_base, method), params)
            .map_err(|e| ResolveError::InvalidResponse {
                call: method,
                reason: format!("bad API URL: {e}"),
            })?;

        tracing::trace!(call = method, url = %url, "pCloud API call");
        let body = self.client.get(url.as_str(), timeout)?;

        let data: Value =
            serde_json::from_slice(&body).map_err(|e| ResolveError::InvalidResponse {
                call: method,
                reason: e.to_string(),
            })?;

        if !data.is_object() {
            return Err(ResolveError::InvalidResponse {
                call: method,
                reason: "expected a JSON object".to_string(),
            });
        }

        let code = result_code(&data);
        if code != 0 {
            return Err(ResolveError::Api { call: method, code });
        }

        Ok(data)
    }
}

impl LinkResolver for PcloudResolver {
    fn list_folder(&self, handle: &str, timeout: Duration) -> ResolveResult<FolderListing> {
        let code = share_code(handle)?;
        let data = self.call(SHOW_CALL, &[("code", code)], timeout)?;

        let mut listing = FolderListing::new();
        if let Some(metadata) = data.get("metadata") {
            walk_files(metadata, &mut listing);
        }

        tracing::debug!(handle = %handle, files = listing.len(), "Shared folder listed");
        Ok(listing)
    }

    fn download_link(
        &self,
        handle: &str,
        file_id: u64,
        timeout: Duration,
    ) -> ResolveResult<String> {
        let code = share_code(handle)?;
        let data = self.call(
            DOWNLOAD_CALL,
            &[("code", code), ("fileid", file_id.to_string())],
            timeout,
        )?;

        let host = data
            .get("hosts")
            .and_then(Value::as_array)
            .and_then(|hosts| hosts.first())
            .and_then(Value::as_str)
            .filter(|h| !h.is_empty())
            .ok_or(ResolveError::MissingField {
                call: DOWNLOAD_CALL,
                field: "hosts",
            })?;

        let path = data
            .get("path")
            .and_then(Value::as_str)
            .filter(|p| !p.is_empty())
            .ok_or(ResolveError::MissingField {
                call: DOWNLOAD_CALL,
                field: "path",
            })?;

        Ok(format!("https://{host}{path}"))
    }
}

/// Extract the share code from a folder handle.
///
/// Accepts a URL carrying a `code` query parameter, or a bare code.
pub fn share_code(handle: &str) -> ResolveResult<String> {
    let handle = handle.trim();

    if let Ok(url) = Url::parse(handle) {
        return url
            .query_pairs()
            .find(|(k, _)| k == "code")
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ResolveError::MissingCode(handle.to_string()));
    }

    let bare = !handle.is_empty()
        && handle
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if bare {
        Ok(handle.to_string())
    } else {
        Err(ResolveError::MissingCode(handle.to_string()))
    }
}

fn result_code(data: &Value) -> i64 {
    match data.get("result") {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(-1),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(-1),
        Some(Value::Null) | None => 0,
        Some(_) => -1,
    }
}

fn walk_files(node: &Value, out: &mut FolderListing) {
    let Some(obj) = node.as_object() else {
        return;
    };

    if obj.get("isfolder").is_some_and(truthy) {
        if let Some(children) = obj.get("contents").and_then(Value::as_array) {
            for child in children {
                walk_files(child, out);
            }
        }
        return;
    }

    let name = obj.get("name").and_then(Value::as_str).unwrap_or_default();
    let file_id = obj.get("fileid").and_then(|v| match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    });
    out.push(name, file_id.filter(|id| *id != 0));
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Null => false,
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::tests::MockHttpClient;
    use crate::resolver::ResolutionCache;

    const HANDLE: &str = "https://u.pcloud.link/publink/show?code=kZabc123";
    const SHOW_URL: &str = "https://api.pcloud.com/showpublink?code=kZabc123";
    const TIMEOUT: Duration = Duration::from_secs(5);

    const LISTING: &str = r#"{
        "result": 0,
        "metadata": {
            "isfolder": true,
            "name": "archive",
            "contents": [
                {"isfolder": false, "name": "a_thumb.jpg", "fileid": 101},
                {"isfolder": true, "name": "nested", "contents": [
                    {"isfolder": false, "name": "b_thumb.jpg", "fileid": 202}
                ]},
                {"isfolder": false, "name": "no_id.jpg"}
            ]
        }
    }"#;

    fn download_url(file_id: u64) -> String {
        format!("https://api.pcloud.com/getpublinkdownload?code=kZabc123&fileid={file_id}")
    }

    fn resolver(mock: MockHttpClient) -> (Arc<MockHttpClient>, PcloudResolver) {
        let mock = Arc::new(mock);
        let resolver = PcloudResolver::new(mock.clone());
        (mock, resolver)
    }

    #[test]
    fn test_share_code_from_url_and_bare() {
        assert_eq!(share_code(HANDLE).unwrap(), "kZabc123");
        assert_eq!(share_code("kZabc123").unwrap(), "kZabc123");
        assert!(matches!(
            share_code("https://u.pcloud.link/publink/show"),
            Err(ResolveError::MissingCode(_))
        ));
        assert!(share_code("").is_err());
    }

    #[test]
    fn test_list_folder_walks_nested_contents() {
        let (_, resolver) = resolver(MockHttpClient::new().route(SHOW_URL, LISTING));

        let listing = resolver.list_folder(HANDLE, TIMEOUT).unwrap();
        assert_eq!(listing.len(), 3);
        assert_eq!(listing.find("b_thumb.jpg").unwrap().file_id, Some(202));
        assert_eq!(listing.find("no_id.jpg").unwrap().file_id, None);
    }

    #[test]
    fn test_download_link_combines_host_and_path() {
        let (_, resolver) = resolver(MockHttpClient::new().route(
            &download_url(101),
            r#"{"result": 0, "hosts": ["p-def1.pcloud.com", "c123.pcloud.com"], "path": "/cBZ/a_thumb.jpg"}"#,
        ));

        let url = resolver.download_link(HANDLE, 101, TIMEOUT).unwrap();
        assert_eq!(url, "https://p-def1.pcloud.com/cBZ/a_thumb.jpg");
    }

    #[test]
    fn test_non_zero_result_is_api_error() {
        let (_, resolver) = resolver(
            MockHttpClient::new().route(SHOW_URL, r#"{"result": 7001, "error": "Invalid link"}"#),
        );

        let err = resolver.list_folder(HANDLE, TIMEOUT).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Api {
                call: "showpublink",
                code: 7001
            }
        ));
    }

    #[test]
    fn test_missing_hosts_or_path() {
        let (_, resolver) = resolver(
            MockHttpClient::new()
                .route(&download_url(1), r#"{"result": 0, "hosts": [], "path": "/x"}"#)
                .route(&download_url(2), r#"{"result": 0, "hosts": ["h"]}"#),
        );

        assert!(matches!(
            resolver.download_link(HANDLE, 1, TIMEOUT),
            Err(ResolveError::MissingField { field: "hosts", .. })
        ));
        assert!(matches!(
            resolver.download_link(HANDLE, 2, TIMEOUT),
            Err(ResolveError::MissingField { field: "path", .. })
        ));
    }

    #[test]
    fn test_cache_lists_folder_once() {
        let (mock, resolver) = resolver(
            MockHttpClient::new()
                .route(SHOW_URL, LISTING)
                .route(&download_url(101), r#"{"result": 0, "hosts": ["h"], "path": "/a"}"#)
                .route(&download_url(202), r#"{"result": 0, "hosts": ["h"], "path": "/b"}"#),
        );
        let mut cache = ResolutionCache::new();

        let a = cache.resolve(&resolver, HANDLE, "a_thumb.jpg", TIMEOUT).unwrap();
        let b = cache.resolve(&resolver, HANDLE, "b_thumb.jpg", TIMEOUT).unwrap();

        assert_eq!(a, "https://h/a");
        assert_eq!(b, "https://h/b");
        assert_eq!(mock.count_requests("https://api.pcloud.com/showpublink"), 1);
    }

    #[test]
    fn test_custom_api_base() {
        let (mock, _) = resolver(MockHttpClient::new());
        let resolver = PcloudResolver::with_api_base(mock.clone(), "https://eapi.pcloud.com/");

        let _ = resolver.list_folder("abc", TIMEOUT);
        assert_eq!(
            mock.requests(),
            vec!["https://eapi.pcloud.com/showpublink?code=abc"]
        );
    }
}

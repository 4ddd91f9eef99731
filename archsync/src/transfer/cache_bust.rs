//! Cache-busting query parameter for download URLs.

use reqwest::Url;

/// Query parameter carrying the manifest version token.
pub const CACHE_BUST_PARAM: &str = "v";

/// Set the `v` query parameter of `url` to `token`.
///
/// Existing parameters keep their order; any previous `v` pairs are dropped
/// and the new one is appended. An empty token or an unparseable URL leaves
/// the URL untouched.
pub fn with_cache_buster(url: &str, token: &str) -> String {
    let token = token.trim();
    if token.is_empty() {
        return url.to_string();
    }

    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != CACHE_BUST_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    parsed
        .query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(CACHE_BUST_PARAM, token);

    parsed.into()
}

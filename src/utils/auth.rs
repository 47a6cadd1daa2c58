//! Authentication utilities for API requests

const BEARER_PREFIX: &str = "Bearer ";

/// Build the `Authorization` header value for an API key.
///
/// Keys pasted together with their scheme (`Bearer sk-...`) are used as-is
/// so the header never ends up with a doubled prefix.
pub fn bearer_value(api_key: &str) -> String {
    let key = api_key.trim();
    if key.starts_with(BEARER_PREFIX) {
        key.to_string()
    } else {
        format!("{BEARER_PREFIX}{key}")
    }
}

/// Add bearer authentication to an HTTP request.
pub fn add_auth_headers(
    request: reqwest::RequestBuilder,
    api_key: &str,
) -> reqwest::RequestBuilder {
    request.header(reqwest::header::AUTHORIZATION, bearer_value(api_key))
}

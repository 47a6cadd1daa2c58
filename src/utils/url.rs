//! Joining provider base URLs with endpoint paths.

/// Strip surrounding whitespace and trailing slashes from a base URL.
///
/// ```
/// use fluentcoach::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url(" https://api.groq.com/openai/v1/ "), "https://api.groq.com/openai/v1");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Join a base URL and an endpoint with exactly one slash between them.
///
/// ```
/// use fluentcoach::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("https://api.siliconflow.com/v1/", "/chat/completions"),
///     "https://api.siliconflow.com/v1/chat/completions"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let endpoint = endpoint.trim().trim_start_matches('/');
    format!("{}/{}", normalize_base_url(base_url), endpoint)
}

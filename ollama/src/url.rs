/// Strip trailing slashes and an API suffix (`/api` or the OpenAI-compatible
/// `/v1`) so endpoint paths can be appended uniformly.
pub(crate) fn base_url_to_host_root(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    let without_suffix = trimmed
        .strip_suffix("/api")
        .or_else(|| trimmed.strip_suffix("/v1"))
        .unwrap_or(trimmed);
    without_suffix.trim_end_matches('/').to_string()
}

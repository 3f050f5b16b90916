use url::Url;

use crate::error::ChatApiError;

/// Default host serving the streaming chat endpoint.
pub const DEFAULT_CHAT_BASE_URL: &str = "http://localhost:3000";
/// Default instance lifecycle API.
pub const DEFAULT_INSTANCE_API_URL: &str = "https://api.scrapybara.com/v1";

/// Normalize a base URL to the streaming chat endpoint.
///
/// Normalization rules:
/// 1) keep `/api/chat` unchanged
/// 2) append `/chat` when path ends in `/api`
/// 3) append `/api/chat` otherwise
pub fn normalize_chat_url(input: &str) -> String {
    let base = if input.trim().is_empty() {
        DEFAULT_CHAT_BASE_URL
    } else {
        input.trim()
    };

    let trimmed = base.trim_end_matches('/');
    if trimmed.ends_with("/api/chat") {
        return trimmed.to_string();
    }
    if trimmed.ends_with("/api") {
        return format!("{trimmed}/chat");
    }
    format!("{trimmed}/api/chat")
}

/// Join path segments onto the instance API base URL.
pub fn instance_endpoint(base: &str, segments: &[&str]) -> Result<Url, ChatApiError> {
    let base = if base.trim().is_empty() {
        DEFAULT_INSTANCE_API_URL
    } else {
        base.trim()
    };

    let mut url = Url::parse(base).map_err(|error| {
        ChatApiError::InvalidBaseUrl(format!("{base}: {error}"))
    })?;
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| ChatApiError::InvalidBaseUrl(format!("{base}: cannot be a base")))?;
        path.pop_if_empty();
        path.extend(segments);
    }
    Ok(url)
}

use url::Url;

/// Display name for a website: the explicit name when it is non-blank,
/// otherwise the URL's host without a leading `www.`.
///
/// Falls back to the raw URL when it has no host.
pub fn display_name(url: &str, name: Option<&str>) -> String {
    if let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) {
        return name.to_string();
    }

    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.strip_prefix("www.").unwrap_or(h).to_string()))
        .unwrap_or_else(|| url.to_string())
}

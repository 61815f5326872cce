use super::{Error, Result};

pub(super) fn has_header(headers: &[(String, String)], name: &str) -> bool {
    headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
}

pub(super) fn host_header_value(parsed: &url::Url) -> Option<String> {
    let host = parsed.host_str()?;
    match parsed.port() {
        Some(port) => Some(format!("{host}:{port}")),
        None => Some(host.to_string()),
    }
}

/// Parses `url` into both representations the client needs, rejecting non-HTTP schemes.
pub(super) fn parse_http_url(url: &str) -> Result<(url::Url, hyper::Uri)> {
    let parsed = url::Url::parse(url).map_err(|_| Error::InvalidUrl(url.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::UnsupportedScheme(url.to_string()));
    }

    let uri: hyper::Uri = url
        .parse()
        .map_err(|_| Error::InvalidUrl(url.to_string()))?;
    Ok((parsed, uri))
}

use super::util::{has_header, host_header_value, parse_http_url};
use super::{HttpRequest, Result};

const CRLF: u64 = 2;

/// Best-effort HTTP/1.1 size of a request: request line, headers, blank line and body.
///
/// Host and Content-Length are counted when the client would add them implicitly.
pub fn estimate_http_request_bytes(req: &HttpRequest) -> Result<u64> {
    estimate_http_request_bytes_parts(&req.method, &req.url, &req.headers, req.body.len() as u64)
}

pub(super) fn estimate_http_request_bytes_parts(
    method: &http::Method,
    url: &str,
    headers: &[(String, String)],
    body_len: u64,
) -> Result<u64> {
    let (parsed, uri) = parse_http_url(url)?;

    let path = uri.path_and_query().map_or("/", |p| p.as_str());
    // "METHOD SP path SP HTTP/1.1 CRLF"
    let mut bytes = (method.as_str().len() + 1 + path.len() + 1 + "HTTP/1.1".len()) as u64 + CRLF;

    for (k, v) in headers {
        bytes = bytes.saturating_add(header_bytes(k.as_bytes(), v.as_bytes()));
    }

    if !has_header(headers, "host")
        && let Some(host) = host_header_value(&parsed)
    {
        bytes = bytes.saturating_add(header_bytes(b"host", host.as_bytes()));
    }

    if body_len != 0 && !has_header(headers, "content-length") {
        let v = body_len.to_string();
        bytes = bytes.saturating_add(header_bytes(b"content-length", v.as_bytes()));
    }

    Ok(bytes.saturating_add(CRLF).saturating_add(body_len))
}

pub(super) fn estimate_http1_response_head_bytes(
    version: http::Version,
    status: http::StatusCode,
    headers: &http::HeaderMap,
) -> u64 {
    let version_str = match version {
        http::Version::HTTP_10 => "HTTP/1.0",
        http::Version::HTTP_2 => "HTTP/2",
        http::Version::HTTP_3 => "HTTP/3",
        _ => "HTTP/1.1",
    };

    // "HTTP/1.1 SP 200 CRLF"; the reason phrase is not counted.
    let status_line = (version_str.len() + 1 + status.as_str().len()) as u64 + CRLF;

    headers
        .iter()
        .fold(status_line, |acc, (name, value)| {
            acc.saturating_add(header_bytes(name.as_str().as_bytes(), value.as_bytes()))
        })
        .saturating_add(CRLF)
}

fn header_bytes(name: &[u8], value: &[u8]) -> u64 {
    // "name: value\r\n"
    (name.len() as u64)
        .saturating_add(2)
        .saturating_add(value.len() as u64)
        .saturating_add(CRLF)
}

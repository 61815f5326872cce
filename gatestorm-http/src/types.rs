use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
    /// Response headers with lowercased names, one entry per received value.
    pub headers: Vec<(String, String)>,
    /// Estimated bytes sent on the wire for this request (HTTP/1.1 request line + headers + body).
    pub bytes_sent: u64,
    /// Estimated bytes received on the wire for this response (HTTP/1.1 status line + headers + body).
    pub bytes_received: u64,
}

impl HttpResponse {
    pub fn body_utf8(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// First value of header `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: http::Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: http::Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: Bytes::new(),
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(http::Method::GET, url)
    }

    pub fn post(url: impl Into<String>, body: Bytes) -> Self {
        Self {
            body,
            ..Self::new(http::Method::POST, url)
        }
    }

    /// POST with a JSON body and `content-type: application/json`.
    pub fn post_json<T: Serialize + ?Sized>(
        url: impl Into<String>,
        value: &T,
    ) -> serde_json::Result<Self> {
        let body = serde_json::to_vec(value)?;
        Ok(Self::post(url, Bytes::from(body)).header("content-type", "application/json"))
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(headers: &[(&str, &str)], body: &'static [u8]) -> HttpResponse {
        HttpResponse {
            status: 200,
            body: Bytes::from_static(body),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            bytes_sent: 0,
            bytes_received: 0,
        }
    }

    #[test]
    fn repeated_headers_stay_separate() {
        let res = response(&[("set-cookie", "a=1"), ("set-cookie", "b=2")], b"");
        let values: Vec<_> = res.header_values("Set-Cookie").collect();
        assert_eq!(values, vec!["a=1", "b=2"]);
        assert_eq!(res.header("set-cookie"), Some("a=1"));
        assert_eq!(res.header("x-missing"), None);
    }

    #[test]
    fn json_body_decodes() {
        #[derive(serde::Deserialize)]
        struct Token {
            access_token: String,
        }

        let res = response(&[], br#"{"access_token":"abc"}"#);
        let token: Token = res.json().unwrap_or_else(|e| panic!("decode failed: {e}"));
        assert_eq!(token.access_token, "abc");
    }

    #[test]
    fn post_json_sets_content_type() {
        let req = HttpRequest::post_json("http://h/login", &serde_json::json!({"a": 1}))
            .unwrap_or_else(|e| panic!("encode failed: {e}"));
        assert_eq!(req.method, http::Method::POST);
        assert_eq!(req.body.as_ref(), br#"{"a":1}"#);
        assert!(
            req.headers
                .iter()
                .any(|(k, v)| k == "content-type" && v == "application/json")
        );
    }
}

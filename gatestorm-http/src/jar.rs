//! Minimal per-client cookie store.
//!
//! The jar is scoped to a single origin (one virtual user talking to one gateway), so
//! `Domain` is recorded but not used for matching. Cookies are keyed by name.

use std::collections::BTreeMap;

use cookie::time::Duration;
use cookie::{Cookie, SameSite};

use super::HttpResponse;

/// Parses one `Set-Cookie` value. Returns `None` when there is no `name=value` pair.
pub fn parse_set_cookie(raw: &str) -> Option<Cookie<'static>> {
    Cookie::parse(raw.to_string()).ok()
}

/// A `Max-Age` of zero or less asks the client to drop the cookie.
pub fn is_removal(cookie: &Cookie<'_>) -> bool {
    cookie.max_age().is_some_and(|age| age <= Duration::ZERO)
}

/// Attribute summary for logs, e.g. `Secure; HttpOnly; SameSite=Strict; Path=/`.
pub fn attribute_summary(cookie: &Cookie<'_>) -> String {
    let mut out: Vec<String> = Vec::new();
    if cookie.secure().unwrap_or(false) {
        out.push("Secure".to_string());
    }
    if cookie.http_only().unwrap_or(false) {
        out.push("HttpOnly".to_string());
    }
    if let Some(same_site) = cookie.same_site() {
        out.push(format!("SameSite={same_site}"));
    }
    if let Some(path) = cookie.path() {
        out.push(format!("Path={path}"));
    }
    if let Some(max_age) = cookie.max_age() {
        out.push(format!("Max-Age={}", max_age.whole_seconds()));
    }
    out.join("; ")
}

/// Whether the cookie restricts cross-site sending at all.
pub fn is_same_site_restricted(cookie: &Cookie<'_>) -> bool {
    matches!(cookie.same_site(), Some(SameSite::Strict | SameSite::Lax))
}

#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    cookies: BTreeMap<String, Cookie<'static>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn get(&self, name: &str) -> Option<&Cookie<'static>> {
        self.cookies.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cookie<'static>> {
        self.cookies.values()
    }

    pub fn clear(&mut self) {
        self.cookies.clear();
    }

    pub fn insert(&mut self, cookie: Cookie<'static>) {
        if is_removal(&cookie) {
            self.cookies.remove(cookie.name());
        } else {
            self.cookies.insert(cookie.name().to_string(), cookie);
        }
    }

    /// Applies every `Set-Cookie` header from `res`. Returns how many were seen.
    pub fn store_from(&mut self, res: &HttpResponse) -> usize {
        let mut seen = 0;
        for cookie in res.header_values("set-cookie").filter_map(parse_set_cookie) {
            seen += 1;
            self.insert(cookie);
        }
        seen
    }

    /// `Cookie` request header value, or `None` when the jar is empty.
    pub fn header_value(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }

        Some(
            self.cookies
                .values()
                .map(|c| c.stripped().to_string())
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn response(set_cookies: &[&str]) -> HttpResponse {
        HttpResponse {
            status: 200,
            body: Bytes::new(),
            headers: set_cookies
                .iter()
                .map(|v| ("set-cookie".to_string(), v.to_string()))
                .collect(),
            bytes_sent: 0,
            bytes_received: 0,
        }
    }

    #[test]
    fn parses_attributes() {
        let c = parse_set_cookie("sid=abc123; Path=/; HttpOnly; Secure; SameSite=Strict; Max-Age=3600")
            .unwrap_or_else(|| panic!("expected cookie"));
        assert_eq!(c.name(), "sid");
        assert_eq!(c.value(), "abc123");
        assert_eq!(c.path(), Some("/"));
        assert_eq!(c.http_only(), Some(true));
        assert_eq!(c.secure(), Some(true));
        assert_eq!(c.same_site(), Some(SameSite::Strict));
        assert!(is_same_site_restricted(&c));
        assert_eq!(
            attribute_summary(&c),
            "Secure; HttpOnly; SameSite=Strict; Path=/; Max-Age=3600"
        );
    }

    #[test]
    fn rejects_values_without_pair() {
        assert!(parse_set_cookie("garbage").is_none());
        assert!(parse_set_cookie("=value").is_none());
    }

    #[test]
    fn jar_keeps_each_set_cookie_and_replaces_by_name() {
        let mut jar = CookieJar::new();
        assert_eq!(jar.store_from(&response(&["sid=one", "token=t"])), 2);
        assert_eq!(jar.store_from(&response(&["sid=two"])), 1);

        assert_eq!(jar.len(), 2);
        assert_eq!(jar.get("sid").map(|c| c.value()), Some("two"));
        assert_eq!(jar.header_value().as_deref(), Some("sid=two; token=t"));
    }

    #[test]
    fn max_age_zero_removes_cookie() {
        let mut jar = CookieJar::new();
        jar.store_from(&response(&["token=t", "sid=s"]));
        jar.store_from(&response(&["token=; Max-Age=0"]));

        assert!(jar.get("token").is_none());
        assert_eq!(jar.header_value().as_deref(), Some("sid=s"));

        jar.clear();
        assert!(jar.is_empty());
        assert_eq!(jar.header_value(), None);
    }
}

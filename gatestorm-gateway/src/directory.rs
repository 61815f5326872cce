use gatestorm_http::{HttpClient, HttpRequest};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::auth::access_token;
use crate::config::GatewayConfig;
use crate::routes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub id: String,
    pub email: String,
}

/// Known users of the gateway. Filled once before the run, then shared read-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserDirectory {
    entries: Vec<DirectoryEntry>,
}

impl UserDirectory {
    pub fn new(entries: Vec<DirectoryEntry>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    pub fn id_for_email(&self, email: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.email.eq_ignore_ascii_case(email))
            .map(|e| e.id.as_str())
    }

    pub fn pick(&self, rng: &mut fastrand::Rng) -> Option<&DirectoryEntry> {
        self.pick_except(rng, None)
    }

    /// Uniform choice among entries whose id differs from `exclude`.
    pub fn pick_except(
        &self,
        rng: &mut fastrand::Rng,
        exclude: Option<&str>,
    ) -> Option<&DirectoryEntry> {
        let eligible = |e: &&DirectoryEntry| exclude != Some(e.id.as_str());
        let count = self.entries.iter().filter(eligible).count();
        if count == 0 {
            return None;
        }
        self.entries.iter().filter(eligible).nth(rng.usize(0..count))
    }

    /// Accepts a top-level array or a `{"data": [...]}` envelope. Entries without a string
    /// (or numeric) `id` and a string `email` are skipped.
    pub fn parse(body: &[u8]) -> serde_json::Result<Self> {
        let value: Value = serde_json::from_slice(body)?;
        let items = match &value {
            Value::Array(items) => items.as_slice(),
            Value::Object(obj) => obj
                .get("data")
                .and_then(Value::as_array)
                .map_or(&[][..], Vec::as_slice),
            _ => &[],
        };

        let entries = items
            .iter()
            .filter_map(|item| {
                let id = match item.get("id")? {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    _ => return None,
                };
                let email = item.get("email")?.as_str()?.to_string();
                Some(DirectoryEntry { id, email })
            })
            .collect();

        Ok(Self { entries })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error(transparent)]
    Http(#[from] gatestorm_http::Error),

    #[error("invalid response body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("admin authentication failed with status {status}: {body}")]
    AdminLogin { status: u16, body: String },

    #[error("admin login response carried no access token")]
    MissingToken,

    #[error("failed to fetch users, status {0}")]
    Users(u16),
}

async fn try_discover(
    client: &HttpClient,
    cfg: &GatewayConfig,
) -> Result<UserDirectory, DiscoveryError> {
    let login = HttpRequest::post_json(cfg.url(routes::LOGIN), &cfg.identities.admin)?;
    let res = client.request(login).await?;
    if res.status != 200 {
        return Err(DiscoveryError::AdminLogin {
            status: res.status,
            body: res.body_utf8().unwrap_or_default().to_string(),
        });
    }
    let token = access_token(&res).ok_or(DiscoveryError::MissingToken)?;

    let users = HttpRequest::get(cfg.url(routes::USERS))
        .header("authorization", format!("Bearer {token}"));
    let res = client.request(users).await?;
    debug!(body = res.body_utf8().unwrap_or_default(), "users response");
    if res.status != 200 {
        return Err(DiscoveryError::Users(res.status));
    }

    Ok(UserDirectory::parse(&res.body)?)
}

/// Best-effort admin discovery. Failures are logged and yield an empty directory.
pub async fn discover(client: &HttpClient, cfg: &GatewayConfig) -> UserDirectory {
    match try_discover(client, cfg).await {
        Ok(directory) => {
            info!(users = directory.len(), "loaded users from the gateway");
            directory
        }
        Err(err) => {
            error!(error = %err, "user discovery failed; continuing with an empty directory");
            UserDirectory::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str) -> DirectoryEntry {
        DirectoryEntry {
            id: id.to_string(),
            email: format!("{id}@example.com"),
        }
    }

    #[test]
    fn parses_array_and_envelope() {
        let array = br#"[{"id":"a","email":"a@example.com"},{"id":7,"email":"b@example.com"}]"#;
        let dir = UserDirectory::parse(array).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(dir.len(), 2);
        assert_eq!(dir.id_for_email("B@example.com"), Some("7"));

        let envelope = br#"{"data":[{"id":"a","email":"a@example.com"}]}"#;
        let dir = UserDirectory::parse(envelope).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(dir.entries(), &[entry("a")]);
    }

    #[test]
    fn skips_incomplete_entries() {
        let body = br#"[{"id":"a"},{"email":"x@example.com"},{"id":null,"email":"y@example.com"},{"id":"b","email":"b@example.com"}]"#;
        let dir = UserDirectory::parse(body).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(dir.entries(), &[entry("b")]);

        let dir = UserDirectory::parse(br#"{"message":"ok"}"#).unwrap_or_else(|e| panic!("{e}"));
        assert!(dir.is_empty());
        assert!(UserDirectory::parse(b"<html>").is_err());
    }

    #[test]
    fn pick_except_never_returns_excluded_id() {
        let dir = UserDirectory::new(vec![entry("self"), entry("a"), entry("b")]);
        let mut rng = fastrand::Rng::with_seed(3);

        let mut seen_a = false;
        let mut seen_b = false;
        for _ in 0..500 {
            let picked = dir
                .pick_except(&mut rng, Some("self"))
                .map(|e| e.id.as_str());
            assert_ne!(picked, Some("self"));
            seen_a |= picked == Some("a");
            seen_b |= picked == Some("b");
        }
        assert!(seen_a && seen_b);
    }

    #[test]
    fn pick_except_without_candidates() {
        let mut rng = fastrand::Rng::with_seed(1);
        assert!(UserDirectory::default().pick(&mut rng).is_none());

        let only_self = UserDirectory::new(vec![entry("self")]);
        assert!(only_self.pick_except(&mut rng, Some("self")).is_none());
        assert!(only_self.pick_except(&mut rng, None).is_some());
    }
}

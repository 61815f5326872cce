use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::TestServerOptions;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    #[serde(skip)]
    pub password: String,
    #[serde(skip)]
    pub admin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub sender_id: String,
    pub recipient_id: String,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct TestServerStats {
    requests_total: Arc<AtomicU64>,
    logins_ok: Arc<AtomicU64>,
    logins_failed: Arc<AtomicU64>,
    logins_rate_limited: Arc<AtomicU64>,
    logouts: Arc<AtomicU64>,
    unauthorized: Arc<AtomicU64>,
    public_requests: Arc<AtomicU64>,
    public_rate_limited: Arc<AtomicU64>,
    messages: Arc<Mutex<Vec<SentMessage>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TestServerStats {
    pub(crate) fn inc_requests_total(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_logins_ok(&self) {
        self.logins_ok.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of failed logins including this one.
    pub(crate) fn inc_logins_failed(&self) -> u64 {
        self.logins_failed.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn inc_logins_rate_limited(&self) {
        self.logins_rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_logouts(&self) {
        self.logouts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_unauthorized(&self) {
        self.unauthorized.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of public requests including this one.
    pub(crate) fn inc_public_requests(&self) -> u64 {
        self.public_requests.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn inc_public_rate_limited(&self) {
        self.public_rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn push_message(&self, message: SentMessage) {
        lock(&self.messages).push(message);
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn logins_ok(&self) -> u64 {
        self.logins_ok.load(Ordering::Relaxed)
    }

    pub fn logins_failed(&self) -> u64 {
        self.logins_failed.load(Ordering::Relaxed)
    }

    pub fn logins_rate_limited(&self) -> u64 {
        self.logins_rate_limited.load(Ordering::Relaxed)
    }

    pub fn logouts(&self) -> u64 {
        self.logouts.load(Ordering::Relaxed)
    }

    pub fn unauthorized(&self) -> u64 {
        self.unauthorized.load(Ordering::Relaxed)
    }

    pub fn public_requests(&self) -> u64 {
        self.public_requests.load(Ordering::Relaxed)
    }

    pub fn public_rate_limited(&self) -> u64 {
        self.public_rate_limited.load(Ordering::Relaxed)
    }

    pub fn messages(&self) -> Vec<SentMessage> {
        lock(&self.messages).clone()
    }
}

#[derive(Debug, Default)]
struct Tokens {
    active: HashMap<String, String>,
    revoked: HashSet<String>,
}

/// In-memory user store and token table shared by all handlers.
#[derive(Debug, Clone)]
pub(crate) struct AppState {
    pub(crate) options: Arc<TestServerOptions>,
    pub(crate) stats: TestServerStats,
    users: Arc<Vec<UserRecord>>,
    tokens: Arc<Mutex<Tokens>>,
}

impl AppState {
    pub(crate) fn new(options: TestServerOptions, stats: TestServerStats) -> Self {
        let mut users: Vec<UserRecord> = (1..=options.users)
            .map(|i| UserRecord {
                id: uuid::Uuid::new_v4().to_string(),
                email: format!("user{i}@example.com"),
                password: options.password.clone(),
                admin: false,
            })
            .collect();
        users.push(UserRecord {
            id: uuid::Uuid::new_v4().to_string(),
            email: options.admin_email.clone(),
            password: options.admin_password.clone(),
            admin: true,
        });

        Self {
            options: Arc::new(options),
            stats,
            users: Arc::new(users),
            tokens: Arc::new(Mutex::new(Tokens::default())),
        }
    }

    pub(crate) fn users(&self) -> &[UserRecord] {
        &self.users
    }

    pub(crate) fn user_by_email(&self, email: &str) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.email == email)
    }

    pub(crate) fn user_by_id(&self, id: &str) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.id == id)
    }

    pub(crate) fn issue_token(&self, user: &UserRecord) -> String {
        let token = uuid::Uuid::new_v4().simple().to_string();
        lock(&self.tokens)
            .active
            .insert(token.clone(), user.id.clone());
        token
    }

    /// The user behind `token`, unless the token is unknown or revoked.
    pub(crate) fn authenticate(&self, token: &str) -> Option<&UserRecord> {
        let user_id = {
            let tokens = lock(&self.tokens);
            if tokens.revoked.contains(token) {
                return None;
            }
            tokens.active.get(token).cloned()
        };
        match user_id {
            Some(id) => self.user_by_id(&id),
            None if self.options.accept_any_token => self.users.first(),
            None => None,
        }
    }

    /// Returns false for unknown tokens. Without revocation enforcement the token stays active.
    pub(crate) fn revoke(&self, token: &str) -> bool {
        let mut tokens = lock(&self.tokens);
        if !self.options.enforce_revocation {
            return tokens.active.contains_key(token);
        }
        if tokens.active.remove(token).is_some() {
            tokens.revoked.insert(token.to_string());
            true
        } else {
            false
        }
    }
}

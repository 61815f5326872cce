use std::net::SocketAddr;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

mod api;
mod state;

pub use axum::http::StatusCode;
pub use state::{SentMessage, TestServerStats, UserRecord};

use state::AppState;

pub const PATH_LOGIN: &str = "/auth/login";
pub const PATH_ME: &str = "/auth/me";
pub const PATH_LOGOUT: &str = "/auth/logout";
pub const PATH_ALL_USERS: &str = "/profile/all-users";
pub const PATH_NEWSFEED: &str = "/newsfeed";
pub const PATH_USER_NEWSFEED: &str = "/newsfeed/{user_id}";
pub const PATH_MESSAGE: &str = "/message";
pub const PATH_USERS: &str = "/users";
pub const PATH_PUBLIC: &str = "/public-endpoint";

#[derive(Debug, Clone)]
pub struct TestServerOptions {
    /// Mount point of every route, e.g. `/api/v1`. Empty mounts at the root.
    pub prefix: String,
    /// Seeds `user1@example.com` ..= `user{users}@example.com`.
    pub users: u32,
    pub password: String,
    pub admin_email: String,
    pub admin_password: String,
    /// Failed logins answered with `login_failure_status` before the server switches to 429.
    pub login_failure_budget: Option<u64>,
    pub login_failure_status: StatusCode,
    /// Requests to the public endpoint answered with 200 before 429.
    pub public_request_budget: Option<u64>,
    /// When false the public endpoint is not mounted and answers 404.
    pub public_endpoint: bool,
    /// Wrap the `/users` list in `{"data": [...]}`.
    pub users_envelope: bool,
    pub secure_cookies: bool,
    /// When false, logout answers 200 but the token keeps working.
    pub enforce_revocation: bool,
    /// Anything else than 200 fails every logout with this status.
    pub logout_status: StatusCode,
    /// Unknown bearer tokens authenticate as the first seeded user.
    pub accept_any_token: bool,
}

impl Default for TestServerOptions {
    fn default() -> Self {
        Self {
            prefix: "/api/v1".to_string(),
            users: 30,
            password: "password123".to_string(),
            admin_email: "admin@example.com".to_string(),
            admin_password: "password123".to_string(),
            login_failure_budget: Some(5),
            login_failure_status: StatusCode::UNAUTHORIZED,
            public_request_budget: Some(20),
            public_endpoint: true,
            users_envelope: false,
            secure_cookies: false,
            enforce_revocation: true,
            logout_status: StatusCode::OK,
            accept_any_token: false,
        }
    }
}

pub fn router(options: TestServerOptions, stats: TestServerStats) -> Router {
    let prefix = options.prefix.trim_end_matches('/').to_string();
    let public_endpoint = options.public_endpoint;
    let state = AppState::new(options, stats);

    let mut api = Router::new()
        .route(PATH_LOGIN, post(api::login))
        .route(PATH_ME, get(api::me))
        .route(PATH_LOGOUT, post(api::logout))
        .route(PATH_ALL_USERS, get(api::all_users))
        .route(PATH_NEWSFEED, get(api::newsfeed))
        .route(PATH_USER_NEWSFEED, get(api::user_newsfeed))
        .route(PATH_MESSAGE, post(api::message))
        .route(PATH_USERS, get(api::users));
    if public_endpoint {
        api = api.route(PATH_PUBLIC, get(api::public_endpoint));
    }
    let api = api.with_state(state);

    if prefix.is_empty() {
        api
    } else {
        Router::new().nest(&prefix, api)
    }
}

pub struct TestServer {
    addr: SocketAddr,
    base_url: String,
    prefix: String,
    stats: TestServerStats,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    pub async fn start() -> std::io::Result<Self> {
        Self::start_with(TestServerOptions::default()).await
    }

    pub async fn start_with(options: TestServerOptions) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let stats = TestServerStats::default();
        let prefix = options.prefix.clone();
        let app = router(options, stats.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = serve.await;
        });

        Ok(Self {
            addr,
            base_url: format!("http://{addr}"),
            prefix,
            stats,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Scheme and authority, without the prefix.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Absolute URL of a route below the prefix.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.prefix, path)
    }

    pub fn stats(&self) -> &TestServerStats {
        &self.stats
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some()
            && let Some(task) = self.task.take()
        {
            task.abort();
        }
    }
}

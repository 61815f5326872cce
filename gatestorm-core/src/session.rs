use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use gatestorm_http::{CookieJar, HttpRequest, HttpResponse, estimate_http_request_bytes};
use serde::Serialize;
use tracing::{debug, warn};

use crate::credential::Credential;
use crate::error::TaskError;
use crate::request_metrics::RequestSample;
use crate::run::RunContext;

/// Which `Authorization` header a call carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Auth {
    /// The session credential, if any.
    #[default]
    Session,
    Anonymous,
    /// An explicit bearer token, regardless of the session credential.
    Bearer(String),
}

/// How the engine classifies a response for the failure counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Judgment {
    /// Status >= 400 counts as a failed request.
    #[default]
    Status,
    /// The caller judges the response via [`Session::check`]; only transport errors fail.
    Manual,
}

#[derive(Debug, Clone)]
pub struct Call {
    pub method: http::Method,
    pub path: String,
    pub name: Option<String>,
    pub body: Option<Bytes>,
    pub auth: Auth,
    pub judgment: Judgment,
    pub timeout: Option<Duration>,
    json: bool,
}

impl Call {
    pub fn new(method: http::Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            name: None,
            body: None,
            auth: Auth::Session,
            judgment: Judgment::Status,
            timeout: None,
            json: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(http::Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(http::Method::POST, path)
    }

    pub fn post_json<T: Serialize + ?Sized>(
        path: impl Into<String>,
        value: &T,
    ) -> serde_json::Result<Self> {
        let body = serde_json::to_vec(value)?;
        Ok(Self {
            body: Some(Bytes::from(body)),
            json: true,
            ..Self::post(path)
        })
    }

    /// Statistics label. Defaults to the prefixed path.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    #[must_use]
    pub fn anonymous(self) -> Self {
        self.auth(Auth::Anonymous)
    }

    #[must_use]
    pub fn bearer(self, token: impl Into<String>) -> Self {
        self.auth(Auth::Bearer(token.into()))
    }

    #[must_use]
    pub fn manual(mut self) -> Self {
        self.judgment = Judgment::Manual;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Per-VU state: credential, cookie jar, RNG, and the HTTP helpers that feed request metrics.
pub struct Session {
    vu_id: u64,
    scenario: Arc<str>,
    ctx: Arc<RunContext>,
    credential: Option<Credential>,
    cookies: CookieJar,
    rng: fastrand::Rng,
    skipped: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("vu_id", &self.vu_id)
            .field("scenario", &self.scenario)
            .field("credential", &self.credential)
            .field("cookies", &self.cookies.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(ctx: Arc<RunContext>, scenario: impl Into<Arc<str>>, vu_id: u64) -> Self {
        let rng = match ctx.seed {
            Some(seed) => fastrand::Rng::with_seed(seed ^ vu_id),
            None => fastrand::Rng::new(),
        };

        Self {
            vu_id,
            scenario: scenario.into(),
            ctx,
            credential: None,
            cookies: CookieJar::new(),
            rng,
            skipped: false,
        }
    }

    pub fn vu_id(&self) -> u64 {
        self.vu_id
    }

    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    pub fn rng(&mut self) -> &mut fastrand::Rng {
        &mut self.rng
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn set_credential(&mut self, credential: Credential) {
        self.credential = Some(credential);
    }

    pub fn clear_credential(&mut self) {
        self.credential = None;
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    pub fn cookies_mut(&mut self) -> &mut CookieJar {
        &mut self.cookies
    }

    pub fn prefix(&self) -> &str {
        &self.ctx.prefix
    }

    /// Absolute URL for a path below the configured prefix.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.ctx.host, self.ctx.prefix, path)
    }

    fn default_name(&self, path: &str) -> String {
        let path = path.split_once('?').map_or(path, |(p, _)| p);
        format!("{}{}", self.ctx.prefix, path)
    }

    pub async fn get(&mut self, path: &str) -> gatestorm_http::Result<HttpResponse> {
        self.send(Call::get(path)).await
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &mut self,
        path: &str,
        value: &T,
    ) -> Result<HttpResponse, TaskError> {
        Ok(self.send(Call::post_json(path, value)?).await?)
    }

    /// Issues one request and records it. Transport errors are recorded and returned.
    pub async fn send(&mut self, call: Call) -> gatestorm_http::Result<HttpResponse> {
        let name = call
            .name
            .clone()
            .unwrap_or_else(|| self.default_name(&call.path));
        let method = call.method.to_string();

        let mut req = HttpRequest::new(call.method, self.url(&call.path)).timeout(call.timeout);
        if let Some(body) = call.body {
            req.body = body;
        }
        if call.json {
            req = req.header("content-type", "application/json");
        }
        match call.auth {
            Auth::Session => {
                if let Some(credential) = &self.credential {
                    req = req.header("authorization", credential.authorization_header());
                }
            }
            Auth::Anonymous => {}
            Auth::Bearer(token) => {
                req = req.header("authorization", format!("Bearer {token}"));
            }
        }
        if let Some(cookie) = self.cookies.header_value() {
            req = req.header("cookie", cookie);
        }

        let estimated_sent = estimate_http_request_bytes(&req).unwrap_or(0);
        let started = Instant::now();
        let res = self.ctx.client.request(req).await;
        let latency = started.elapsed();

        let metrics = &self.ctx.metrics;
        match &res {
            Ok(r) => {
                self.cookies.store_from(r);
                let failed = call.judgment == Judgment::Status && r.status >= 400;
                debug!(
                    vu = self.vu_id,
                    scenario = %self.scenario,
                    name = %name,
                    status = r.status,
                    "request"
                );
                self.ctx.request_ids.record_request(
                    metrics,
                    RequestSample {
                        scenario: &self.scenario,
                        name: &name,
                        method: &method,
                        status: Some(r.status),
                        failed,
                        latency,
                        bytes_received: r.bytes_received,
                        bytes_sent: r.bytes_sent,
                        error_kind: None,
                    },
                );
            }
            Err(err) => {
                let kind = err.transport_error_kind().to_string();
                debug!(
                    vu = self.vu_id,
                    scenario = %self.scenario,
                    name = %name,
                    error = %err,
                    "request failed"
                );
                self.ctx.request_ids.record_request(
                    metrics,
                    RequestSample {
                        scenario: &self.scenario,
                        name: &name,
                        method: &method,
                        status: None,
                        failed: true,
                        latency,
                        bytes_received: 0,
                        bytes_sent: estimated_sent,
                        error_kind: Some(&kind),
                    },
                );
            }
        }

        res
    }

    /// Records a named pass/fail result. Returns `passed`.
    ///
    /// `message` only runs for a failed check.
    pub fn check<M, F>(&self, name: &str, passed: bool, message: F) -> bool
    where
        M: std::fmt::Display,
        F: FnOnce() -> M,
    {
        self.ctx
            .task_ids
            .record_check(&self.ctx.metrics, &self.scenario, name, passed);
        if !passed {
            warn!(vu = self.vu_id, scenario = %self.scenario, check = name, "{}", message());
        }
        passed
    }

    /// Marks the current task invocation as skipped.
    pub fn skip(&mut self, reason: &str) {
        warn!(vu = self.vu_id, scenario = %self.scenario, "{reason}");
        self.skipped = true;
    }

    pub(crate) fn take_skipped(&mut self) -> bool {
        std::mem::take(&mut self.skipped)
    }
}

use std::sync::Arc;

use gatestorm_core::{
    BoxFuture, Call, Cookie, CookieJar, Session, Task, TaskResult, TaskSet, VirtualUser,
    attribute_summary, is_same_site_restricted,
};
use tracing::info;

use crate::auth;
use crate::config::GatewayConfig;
use crate::routes;

/// Observes session-cookie handling around login. Logs only; records no checks.
#[derive(Debug)]
pub struct SessionSecurityTester {
    cfg: Arc<GatewayConfig>,
}

/// Cookie value shortened to a prefix plus its length, so logs never carry a full session id.
pub fn fingerprint(value: &str) -> String {
    let prefix: String = value.chars().take(4).collect();
    format!("{prefix}...({} chars)", value.chars().count())
}

fn describe(cookie: &Cookie<'_>) -> String {
    let attributes = attribute_summary(cookie);
    if attributes.is_empty() {
        format!("{}={}", cookie.name(), fingerprint(cookie.value()))
    } else {
        format!(
            "{}={} [{attributes}]",
            cookie.name(),
            fingerprint(cookie.value())
        )
    }
}

fn describe_jar(jar: &CookieJar) -> Vec<String> {
    jar.iter().map(describe).collect()
}

/// Security attributes a session cookie is expected to carry but does not.
/// `SameSite=None` counts as missing.
pub fn missing_attributes(cookie: &Cookie<'_>) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if !cookie.secure().unwrap_or(false) {
        missing.push("Secure");
    }
    if !cookie.http_only().unwrap_or(false) {
        missing.push("HttpOnly");
    }
    if !is_same_site_restricted(cookie) {
        missing.push("SameSite");
    }
    if cookie.path().is_none() {
        missing.push("Path");
    }
    missing
}

/// Names of cookies whose value is identical before and after login.
pub fn surviving_cookies(before: &CookieJar, after: &CookieJar) -> Vec<String> {
    before
        .iter()
        .filter(|c| after.get(c.name()).is_some_and(|a| a.value() == c.value()))
        .map(|c| c.name().to_string())
        .collect()
}

impl SessionSecurityTester {
    pub fn new(cfg: Arc<GatewayConfig>) -> Self {
        Self { cfg }
    }

    async fn login(&self, session: &mut Session) -> bool {
        auth::login(session, &self.cfg.identities.fixed).await
    }

    fn session_regeneration<'a>(
        &'a mut self,
        session: &'a mut Session,
    ) -> BoxFuture<'a, TaskResult> {
        Box::pin(async move {
            session.cookies_mut().clear();
            session
                .send(Call::get(routes::ME).anonymous().manual())
                .await?;
            let before = session.cookies().clone();

            let logged_in = self.login(session).await;
            let after = session.cookies().clone();
            let survived = surviving_cookies(&before, &after);

            info!(
                vu = session.vu_id(),
                logged_in,
                before = ?describe_jar(&before),
                after = ?describe_jar(&after),
                survived = ?survived,
                "session cookies around login"
            );
            if !survived.is_empty() {
                info!(
                    vu = session.vu_id(),
                    cookies = ?survived,
                    "pre-login cookie value survived login"
                );
            }
            Ok(())
        })
    }

    fn secure_attributes<'a>(
        &'a mut self,
        session: &'a mut Session,
    ) -> BoxFuture<'a, TaskResult> {
        Box::pin(async move {
            self.login(session).await;
            session.get(routes::ME).await?;

            for cookie in session.cookies().iter() {
                info!(
                    vu = session.vu_id(),
                    cookie = %describe(cookie),
                    missing = ?missing_attributes(cookie),
                    "cookie attributes"
                );
            }
            if session.cookies().is_empty() {
                info!(vu = session.vu_id(), "no cookies set by the gateway");
            }
            Ok(())
        })
    }
}

impl VirtualUser for SessionSecurityTester {
    fn tasks() -> TaskSet<Self> {
        TaskSet::new([
            Task::new("session_regeneration", 3, Self::session_regeneration),
            Task::new("secure_attributes", 2, Self::secure_attributes),
        ])
    }

    fn on_start<'a>(&'a mut self, session: &'a mut Session) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            session.cookies_mut().clear();
            let logged_in = self.login(session).await;
            info!(
                vu = session.vu_id(),
                logged_in,
                cookies = ?describe_jar(session.cookies()),
                "initial session cookies"
            );
        })
    }
}

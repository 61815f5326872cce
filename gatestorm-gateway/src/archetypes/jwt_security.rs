use std::sync::Arc;

use gatestorm_core::{BoxFuture, Call, Session, Task, TaskResult, TaskSet, VirtualUser};

use crate::auth;
use crate::config::GatewayConfig;
use crate::routes;

pub const CHECK_EXPIRED_TOKEN: &str = "expired_token_rejected";
pub const CHECK_INVALID_TOKEN: &str = "invalid_token_rejected";

/// Probes `/auth/me` with the session token, an expired JWT and a malformed bearer value.
#[derive(Debug)]
pub struct JwtSecurityTester {
    cfg: Arc<GatewayConfig>,
}

impl JwtSecurityTester {
    pub fn new(cfg: Arc<GatewayConfig>) -> Self {
        Self { cfg }
    }

    fn valid_token<'a>(&'a mut self, session: &'a mut Session) -> BoxFuture<'a, TaskResult> {
        Box::pin(async move {
            session.get(routes::ME).await?;
            Ok(())
        })
    }

    fn expired_token<'a>(&'a mut self, session: &'a mut Session) -> BoxFuture<'a, TaskResult> {
        Box::pin(async move {
            let token = self.cfg.probes.expired_token.clone();
            expect_unauthorized(session, token, CHECK_EXPIRED_TOKEN, "expired token").await
        })
    }

    fn invalid_token<'a>(&'a mut self, session: &'a mut Session) -> BoxFuture<'a, TaskResult> {
        Box::pin(async move {
            let token = self.cfg.probes.invalid_token.clone();
            expect_unauthorized(session, token, CHECK_INVALID_TOKEN, "malformed token").await
        })
    }
}

async fn expect_unauthorized(
    session: &mut Session,
    token: String,
    check: &str,
    what: &str,
) -> TaskResult {
    let res = session
        .send(Call::get(routes::ME).bearer(token).manual())
        .await?;

    let passed = res.status == 401;
    session.check(
        check,
        passed,
        || format!("{what} was not rejected: expected 401, got {}", res.status),
    );
    Ok(())
}

impl VirtualUser for JwtSecurityTester {
    fn tasks() -> TaskSet<Self> {
        TaskSet::new([
            Task::new("valid_token", 5, Self::valid_token),
            Task::new("expired_token", 2, Self::expired_token),
            Task::new("invalid_token", 2, Self::invalid_token),
        ])
    }

    fn on_start<'a>(&'a mut self, session: &'a mut Session) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            auth::login(session, &self.cfg.identities.fixed).await;
        })
    }
}

use std::sync::Arc;

use gatestorm_core::{BoxFuture, Call, Session, Task, TaskResult, TaskSet, VirtualUser};
use tracing::error;

use crate::auth;
use crate::config::GatewayConfig;
use crate::routes;

pub const CHECK_ACCESS_BEFORE_LOGOUT: &str = "access_before_logout";
pub const CHECK_REVOKED_TOKEN: &str = "revoked_token_rejected";

/// Logs out and verifies that the revoked token is refused right away.
#[derive(Debug)]
pub struct JwtBlacklistTester {
    cfg: Arc<GatewayConfig>,
}

impl JwtBlacklistTester {
    pub fn new(cfg: Arc<GatewayConfig>) -> Self {
        Self { cfg }
    }

    fn token_blacklisting<'a>(
        &'a mut self,
        session: &'a mut Session,
    ) -> BoxFuture<'a, TaskResult> {
        Box::pin(async move {
            let probe = probe_revocation(session).await;
            // Relogin regardless of where the probe stopped.
            auth::login(session, &self.cfg.identities.fixed).await;
            probe
        })
    }
}

async fn probe_revocation(session: &mut Session) -> TaskResult {
    let res = session.send(Call::get(routes::ME).manual()).await?;
    if !session.check(
        CHECK_ACCESS_BEFORE_LOGOUT,
        res.status == 200,
        || {
            format!(
                "could not access protected route before logout: status {}",
                res.status
            )
        },
    ) {
        return Ok(());
    }

    let res = session.send(Call::post(routes::LOGOUT)).await?;
    if res.status != 200 {
        error!(
            vu = session.vu_id(),
            status = res.status,
            "logout failed; skipping revocation check"
        );
        return Ok(());
    }

    // The session still carries the credential that was just revoked.
    let res = session.send(Call::get(routes::ME).manual()).await?;
    session.check(
        CHECK_REVOKED_TOKEN,
        res.status == 401,
        || {
            format!(
                "token still accepted after logout: expected 401, got {}",
                res.status
            )
        },
    );
    Ok(())
}

impl VirtualUser for JwtBlacklistTester {
    fn tasks() -> TaskSet<Self> {
        TaskSet::new([Task::new("token_blacklisting", 1, Self::token_blacklisting)])
    }

    fn on_start<'a>(&'a mut self, session: &'a mut Session) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            auth::login(session, &self.cfg.identities.fixed).await;
        })
    }
}

use std::sync::Arc;

use gatestorm_core::{BoxFuture, Call, Session, Task, TaskResult, TaskSet, VirtualUser};
use tracing::info;

use crate::config::{GatewayConfig, Identities, Login};
use crate::routes;

pub const CHECK_LOGIN_RATE_LIMIT: &str = "login_rate_limiting";
pub const CHECK_API_RATE_LIMIT: &str = "api_rate_limiting";
/// Passes once per VU, on its first 429. Never fails.
pub const CHECK_RATE_LIMIT_ENGAGED: &str = "rate_limit_engaged";

const LOGIN_ACCEPTED: [u16; 2] = [429, 401];
const API_ACCEPTED: [u16; 3] = [429, 200, 404];

/// Hammers login and a public endpoint to provoke rate limiting.
#[derive(Debug)]
pub struct BruteForceProtectionTester {
    cfg: Arc<GatewayConfig>,
    rate_limited: bool,
}

impl BruteForceProtectionTester {
    pub fn new(cfg: Arc<GatewayConfig>) -> Self {
        Self {
            cfg,
            rate_limited: false,
        }
    }

    fn observe(&mut self, session: &Session, status: u16, probe: &str) {
        if status == 429 && !self.rate_limited {
            self.rate_limited = true;
            info!(vu = session.vu_id(), probe, "rate limit engaged");
            session.check(CHECK_RATE_LIMIT_ENGAGED, true, || "");
        }
    }

    fn login_rate_limiting<'a>(
        &'a mut self,
        session: &'a mut Session,
    ) -> BoxFuture<'a, TaskResult> {
        Box::pin(async move {
            let probes = &self.cfg.probes;
            let n = session
                .rng()
                .u32(probes.brute_force_user_min..=probes.brute_force_user_max);
            let login = Login::new(Identities::user_email(n), probes.wrong_password.clone());

            let res = session
                .send(Call::post_json(routes::LOGIN, &login)?.anonymous().manual())
                .await?;
            self.observe(session, res.status, "login");
            session.check(
                CHECK_LOGIN_RATE_LIMIT,
                LOGIN_ACCEPTED.contains(&res.status),
                || format!("unexpected status for a wrong-password login: {}", res.status),
            );
            Ok(())
        })
    }

    fn api_rate_limiting<'a>(
        &'a mut self,
        session: &'a mut Session,
    ) -> BoxFuture<'a, TaskResult> {
        Box::pin(async move {
            let res = session
                .send(Call::get(routes::PUBLIC_ENDPOINT).manual())
                .await?;
            self.observe(session, res.status, "public_endpoint");
            session.check(
                CHECK_API_RATE_LIMIT,
                API_ACCEPTED.contains(&res.status),
                || format!("unexpected status from the public endpoint: {}", res.status),
            );
            Ok(())
        })
    }
}

impl VirtualUser for BruteForceProtectionTester {
    fn tasks() -> TaskSet<Self> {
        TaskSet::new([
            Task::new("login_rate_limiting", 1, Self::login_rate_limiting),
            Task::new("api_rate_limiting", 1, Self::api_rate_limiting),
        ])
    }
}

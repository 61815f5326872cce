use std::sync::Arc;
use std::time::Duration;

use gatestorm_core::{RunConfig, ScenarioConfig, ScenarioOptions, VirtualUser, scenario_for};
use strum::{Display, EnumString, IntoStaticStr};

use crate::config::{GatewayConfig, WaitRange};
use crate::directory::UserDirectory;
use crate::error::{Error, Result};

mod api_gateway;
mod brute_force;
mod jwt_blacklist;
mod jwt_security;
mod session_security;

pub use api_gateway::ApiGatewayUser;
pub use brute_force::{
    BruteForceProtectionTester, CHECK_API_RATE_LIMIT, CHECK_LOGIN_RATE_LIMIT,
    CHECK_RATE_LIMIT_ENGAGED,
};
pub use jwt_blacklist::{CHECK_ACCESS_BEFORE_LOGOUT, CHECK_REVOKED_TOKEN, JwtBlacklistTester};
pub use jwt_security::{CHECK_EXPIRED_TOKEN, CHECK_INVALID_TOKEN, JwtSecurityTester};
pub use session_security::{
    SessionSecurityTester, fingerprint, missing_attributes, surviving_cookies,
};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum Archetype {
    ApiGateway,
    JwtSecurity,
    JwtBlacklist,
    SessionSecurity,
    BruteForce,
}

impl Archetype {
    pub const ALL: [Archetype; 5] = [
        Archetype::ApiGateway,
        Archetype::JwtSecurity,
        Archetype::JwtBlacklist,
        Archetype::SessionSecurity,
        Archetype::BruteForce,
    ];

    /// Scenario name used as the `scenario` metric tag.
    pub fn scenario_name(self) -> &'static str {
        match self {
            Self::ApiGateway => "ApiGatewayUser",
            Self::JwtSecurity => "JwtSecurityTester",
            Self::JwtBlacklist => "JwtBlacklistTester",
            Self::SessionSecurity => "SessionSecurityTester",
            Self::BruteForce => "BruteForceProtectionTester",
        }
    }

    pub fn task_names(self) -> Vec<&'static str> {
        match self {
            Self::ApiGateway => ApiGatewayUser::tasks().names(),
            Self::JwtSecurity => JwtSecurityTester::tasks().names(),
            Self::JwtBlacklist => JwtBlacklistTester::tasks().names(),
            Self::SessionSecurity => SessionSecurityTester::tasks().names(),
            Self::BruteForce => BruteForceProtectionTester::tasks().names(),
        }
    }

    /// Weighted task table as `(name, weight)` pairs.
    pub fn task_weights(self) -> Vec<(&'static str, u32)> {
        fn pairs<U: VirtualUser>() -> Vec<(&'static str, u32)> {
            U::tasks().iter().map(|t| (t.name, t.weight)).collect()
        }
        match self {
            Self::ApiGateway => pairs::<ApiGatewayUser>(),
            Self::JwtSecurity => pairs::<JwtSecurityTester>(),
            Self::JwtBlacklist => pairs::<JwtBlacklistTester>(),
            Self::SessionSecurity => pairs::<SessionSecurityTester>(),
            Self::BruteForce => pairs::<BruteForceProtectionTester>(),
        }
    }

    pub fn default_wait(self) -> WaitRange {
        let secs = Duration::from_secs;
        let millis = Duration::from_millis;
        match self {
            Self::ApiGateway | Self::JwtSecurity | Self::SessionSecurity => {
                WaitRange::new(secs(1), secs(3))
            }
            // Slower, so logouts do not interfere with the tester's own relogins.
            Self::JwtBlacklist => WaitRange::new(secs(3), secs(5)),
            Self::BruteForce => WaitRange::new(millis(100), millis(500)),
        }
    }

    /// Validates `cfg` first; VUs draw from its ranges without further checks.
    pub fn scenario(
        self,
        cfg: &Arc<GatewayConfig>,
        directory: &Arc<UserDirectory>,
        run: &RunConfig,
    ) -> Result<ScenarioConfig> {
        cfg.validate()?;
        let settings = cfg.archetypes.get(self);
        let opts = ScenarioOptions {
            vus: settings.users,
            ..ScenarioOptions::new(self.scenario_name(), cfg.wait_time(self)?)
        };

        let cfg = cfg.clone();
        let scenario = match self {
            Self::ApiGateway => {
                let directory = directory.clone();
                scenario_for(opts, run, move |_| {
                    ApiGatewayUser::new(cfg.clone(), directory.clone())
                })
            }
            Self::JwtSecurity => scenario_for(opts, run, move |_| JwtSecurityTester::new(cfg.clone())),
            Self::JwtBlacklist => {
                scenario_for(opts, run, move |_| JwtBlacklistTester::new(cfg.clone()))
            }
            Self::SessionSecurity => {
                scenario_for(opts, run, move |_| SessionSecurityTester::new(cfg.clone()))
            }
            Self::BruteForce => {
                scenario_for(opts, run, move |_| BruteForceProtectionTester::new(cfg.clone()))
            }
        }?;
        Ok(scenario)
    }
}

/// Scenarios for `selected`, or for every enabled archetype when `selected` is empty.
pub fn build_scenarios(
    cfg: &Arc<GatewayConfig>,
    directory: &Arc<UserDirectory>,
    run: &RunConfig,
    selected: &[Archetype],
) -> Result<Vec<ScenarioConfig>> {
    let mut archetypes: Vec<Archetype> = if selected.is_empty() {
        Archetype::ALL
            .into_iter()
            .filter(|a| cfg.archetypes.get(*a).enabled)
            .collect()
    } else {
        selected.to_vec()
    };
    archetypes.sort();
    archetypes.dedup();

    if archetypes.is_empty() {
        return Err(Error::NothingSelected);
    }
    cfg.validate()?;

    archetypes
        .into_iter()
        .map(|a| a.scenario(cfg, directory, run))
        .collect()
}

//! Gateway routes, relative to the configured prefix.

pub const LOGIN: &str = "/auth/login";
pub const ME: &str = "/auth/me";
pub const LOGOUT: &str = "/auth/logout";
pub const ALL_USERS: &str = "/profile/all-users";
pub const NEWSFEED: &str = "/newsfeed";
pub const MESSAGE: &str = "/message";
pub const USERS: &str = "/users";
pub const PUBLIC_ENDPOINT: &str = "/public-endpoint";

pub fn user_newsfeed(user_id: &str) -> String {
    format!("{NEWSFEED}/{user_id}")
}

/// Statistics name for per-user feeds; keeps one series regardless of the id.
pub fn user_newsfeed_name(prefix: &str) -> String {
    format!("{prefix}{NEWSFEED}/{{userId}}")
}

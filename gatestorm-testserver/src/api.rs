use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use cookie::time::Duration;
use cookie::{Cookie, SameSite};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::state::{AppState, SentMessage, UserRecord};

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    identifier: String,
    password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MessageRequest {
    recipient_id: String,
    content: String,
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

const SESSION_COOKIE: &str = "sid";

fn has_session_cookie(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .any(|c| c.name() == SESSION_COOKIE)
}

/// `Set-Cookie` value for the session id. `max_age` of zero clears it.
fn session_cookie(state: &AppState, value: &str, max_age: Option<Duration>) -> String {
    let mut cookie = Cookie::build((SESSION_COOKIE, value.to_string()))
        .path("/")
        .http_only(true)
        .secure(state.options.secure_cookies)
        .same_site(SameSite::Strict)
        .build();
    if let Some(max_age) = max_age {
        cookie.set_max_age(max_age);
    }
    cookie.to_string()
}

fn respond(status: StatusCode, body: Value, set_cookie: Option<String>) -> Response {
    let mut res = (status, Json(body)).into_response();
    if let Some(value) = set_cookie.and_then(|c| HeaderValue::from_str(&c).ok()) {
        res.headers_mut().append(header::SET_COOKIE, value);
    }
    res
}

fn unauthorized(state: &AppState) -> Response {
    state.stats.inc_unauthorized();
    respond(
        StatusCode::UNAUTHORIZED,
        json!({"error": "unauthorized"}),
        None,
    )
}

fn authenticated<'a>(state: &'a AppState, headers: &HeaderMap) -> Option<&'a UserRecord> {
    state.authenticate(bearer(headers)?)
}

fn new_sid() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

pub(crate) async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Response {
    state.stats.inc_requests_total();

    let user = state
        .user_by_email(&req.identifier)
        .filter(|u| u.password == req.password)
        .cloned();

    let Some(user) = user else {
        let failed = state.stats.inc_logins_failed();
        if state
            .options
            .login_failure_budget
            .is_some_and(|budget| failed > budget)
        {
            state.stats.inc_logins_rate_limited();
            let mut res = respond(
                StatusCode::TOO_MANY_REQUESTS,
                json!({"error": "too many login attempts"}),
                None,
            );
            res.headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static("60"));
            return res;
        }
        return respond(
            state.options.login_failure_status,
            json!({"error": "invalid credentials"}),
            None,
        );
    };

    state.stats.inc_logins_ok();
    let token = state.issue_token(&user);
    respond(
        StatusCode::OK,
        json!({"data": {"access_token": token, "user": user}}),
        Some(session_cookie(&state, &new_sid(), None)),
    )
}

pub(crate) async fn me(State(state): State<AppState>, headers: HeaderMap) -> Response {
    state.stats.inc_requests_total();

    let set_cookie =
        (!has_session_cookie(&headers)).then(|| session_cookie(&state, &new_sid(), None));

    match authenticated(&state, &headers) {
        Some(user) => respond(StatusCode::OK, json!({"data": user}), set_cookie),
        None => {
            state.stats.inc_unauthorized();
            respond(
                StatusCode::UNAUTHORIZED,
                json!({"error": "unauthorized"}),
                set_cookie,
            )
        }
    }
}

pub(crate) async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    state.stats.inc_requests_total();

    let Some(token) = bearer(&headers) else {
        return unauthorized(&state);
    };
    if state.options.logout_status != StatusCode::OK {
        return respond(
            state.options.logout_status,
            json!({"error": "logout unavailable"}),
            None,
        );
    }
    if !state.revoke(token) {
        return unauthorized(&state);
    }

    state.stats.inc_logouts();
    respond(
        StatusCode::OK,
        json!({"data": {"message": "logged out"}}),
        Some(session_cookie(&state, "", Some(Duration::ZERO))),
    )
}

pub(crate) async fn all_users(State(state): State<AppState>, headers: HeaderMap) -> Response {
    state.stats.inc_requests_total();
    if authenticated(&state, &headers).is_none() {
        return unauthorized(&state);
    }

    let users: Vec<&UserRecord> = state.users().iter().filter(|u| !u.admin).collect();
    respond(StatusCode::OK, json!({"data": users}), None)
}

pub(crate) async fn newsfeed(State(state): State<AppState>, headers: HeaderMap) -> Response {
    state.stats.inc_requests_total();
    let Some(user) = authenticated(&state, &headers) else {
        return unauthorized(&state);
    };

    respond(
        StatusCode::OK,
        json!({"data": [{"author": user.id, "content": "Hello from the feed"}]}),
        None,
    )
}

pub(crate) async fn user_newsfeed(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.stats.inc_requests_total();
    if authenticated(&state, &headers).is_none() {
        return unauthorized(&state);
    }

    match state.user_by_id(&user_id) {
        Some(user) => respond(
            StatusCode::OK,
            json!({"data": [{"author": user.id, "content": "Hello from the feed"}]}),
            None,
        ),
        None => respond(
            StatusCode::NOT_FOUND,
            json!({"error": "user not found"}),
            None,
        ),
    }
}

pub(crate) async fn message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<MessageRequest>,
) -> Response {
    state.stats.inc_requests_total();
    let Some(sender) = authenticated(&state, &headers).cloned() else {
        return unauthorized(&state);
    };

    if state.user_by_id(&req.recipient_id).is_none() {
        return respond(
            StatusCode::NOT_FOUND,
            json!({"error": "recipient not found"}),
            None,
        );
    }
    if req.recipient_id == sender.id {
        return respond(
            StatusCode::BAD_REQUEST,
            json!({"error": "cannot message yourself"}),
            None,
        );
    }

    state.stats.push_message(SentMessage {
        sender_id: sender.id,
        recipient_id: req.recipient_id,
        content: req.content,
    });
    respond(StatusCode::CREATED, json!({"data": {"sent": true}}), None)
}

pub(crate) async fn users(State(state): State<AppState>, headers: HeaderMap) -> Response {
    state.stats.inc_requests_total();
    let Some(caller) = authenticated(&state, &headers) else {
        return unauthorized(&state);
    };
    if !caller.admin {
        return respond(StatusCode::FORBIDDEN, json!({"error": "forbidden"}), None);
    }

    let list = json!(state.users());
    let body = if state.options.users_envelope {
        json!({"data": list})
    } else {
        list
    };
    respond(StatusCode::OK, body, None)
}

pub(crate) async fn public_endpoint(State(state): State<AppState>) -> Response {
    state.stats.inc_requests_total();

    let served = state.stats.inc_public_requests();
    if state
        .options
        .public_request_budget
        .is_some_and(|budget| served > budget)
    {
        state.stats.inc_public_rate_limited();
        return respond(
            StatusCode::TOO_MANY_REQUESTS,
            json!({"error": "rate limit exceeded"}),
            None,
        );
    }
    respond(StatusCode::OK, json!({"data": {"status": "ok"}}), None)
}

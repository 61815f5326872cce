use gatestorm_core::{Call, Credential, HttpResponse, Session};
use serde::Deserialize;
use tracing::warn;

use crate::config::Login;
use crate::routes;

#[derive(Debug, Deserialize)]
struct LoginEnvelope {
    data: Option<LoginData>,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    access_token: Option<String>,
}

/// `data.access_token` of a login response, if present and non-empty.
pub fn access_token(res: &HttpResponse) -> Option<String> {
    let envelope: LoginEnvelope = res.json().ok()?;
    envelope
        .data?
        .access_token
        .filter(|token| !token.is_empty())
}

/// Logs in and stores the credential on success.
///
/// Any failure (transport error, non-200 status, missing token) clears the credential and
/// lets the VU continue anonymously.
pub async fn login(session: &mut Session, login: &Login) -> bool {
    let call = match Call::post_json(routes::LOGIN, login) {
        Ok(call) => call,
        Err(err) => {
            warn!(vu = session.vu_id(), error = %err, "failed to encode login request");
            session.clear_credential();
            return false;
        }
    };

    match session.send(call).await {
        Ok(res) if res.status == 200 => match access_token(&res) {
            Some(token) => {
                session.set_credential(Credential::bearer(token));
                true
            }
            None => {
                warn!(
                    vu = session.vu_id(),
                    identifier = %login.identifier,
                    "login response carried no access token; continuing without credential"
                );
                session.clear_credential();
                false
            }
        },
        Ok(res) => {
            warn!(
                vu = session.vu_id(),
                identifier = %login.identifier,
                status = res.status,
                "login rejected; continuing without credential"
            );
            session.clear_credential();
            false
        }
        Err(err) => {
            warn!(
                vu = session.vu_id(),
                identifier = %login.identifier,
                error = %err,
                "login failed; continuing without credential"
            );
            session.clear_credential();
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(body: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            body: body.as_bytes().to_vec().into(),
            headers: Vec::new(),
            bytes_sent: 0,
            bytes_received: 0,
        }
    }

    #[test]
    fn extracts_access_token() {
        assert_eq!(
            access_token(&response(r#"{"data":{"access_token":"t1"}}"#)).as_deref(),
            Some("t1")
        );
        assert_eq!(access_token(&response(r#"{"data":{"access_token":""}}"#)), None);
        assert_eq!(access_token(&response(r#"{"data":{}}"#)), None);
        assert_eq!(access_token(&response(r#"{"error":"nope"}"#)), None);
        assert_eq!(access_token(&response("not json")), None);
    }
}

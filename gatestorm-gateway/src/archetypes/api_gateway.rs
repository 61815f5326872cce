use std::sync::Arc;

use gatestorm_core::{BoxFuture, Call, Session, Task, TaskResult, TaskSet, VirtualUser};
use serde::Serialize;
use tracing::{debug, warn};

use crate::auth;
use crate::config::{GatewayConfig, Identities, Login};
use crate::directory::UserDirectory;
use crate::messages::random_phrase;
use crate::routes;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MessageBody<'a> {
    recipient_id: &'a str,
    content: &'a str,
}

/// General traffic: profile listing, identity, feeds and direct messages as a random
/// seeded user.
#[derive(Debug)]
pub struct ApiGatewayUser {
    cfg: Arc<GatewayConfig>,
    directory: Arc<UserDirectory>,
    identifier: String,
    user_id: Option<String>,
}

impl ApiGatewayUser {
    pub fn new(cfg: Arc<GatewayConfig>, directory: Arc<UserDirectory>) -> Self {
        Self {
            cfg,
            directory,
            identifier: String::new(),
            user_id: None,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    fn take_all_users<'a>(&'a mut self, session: &'a mut Session) -> BoxFuture<'a, TaskResult> {
        Box::pin(async move {
            session.get(routes::ALL_USERS).await?;
            Ok(())
        })
    }

    fn view_self_me<'a>(&'a mut self, session: &'a mut Session) -> BoxFuture<'a, TaskResult> {
        Box::pin(async move {
            session.get(routes::ME).await?;
            Ok(())
        })
    }

    fn get_self_news_feed<'a>(
        &'a mut self,
        session: &'a mut Session,
    ) -> BoxFuture<'a, TaskResult> {
        Box::pin(async move {
            session.get(routes::NEWSFEED).await?;
            Ok(())
        })
    }

    fn get_user_news_feed<'a>(
        &'a mut self,
        session: &'a mut Session,
    ) -> BoxFuture<'a, TaskResult> {
        Box::pin(async move {
            let Some(target) = self.directory.pick(session.rng()) else {
                session.skip("user directory is empty; skipping user news feed");
                return Ok(());
            };

            let call = Call::get(routes::user_newsfeed(&target.id))
                .name(routes::user_newsfeed_name(session.prefix()));
            session.send(call).await?;
            Ok(())
        })
    }

    fn send_message<'a>(&'a mut self, session: &'a mut Session) -> BoxFuture<'a, TaskResult> {
        Box::pin(async move {
            let Some(recipient) = self
                .directory
                .pick_except(session.rng(), self.user_id.as_deref())
            else {
                session.skip("no eligible message recipient; skipping send_message");
                return Ok(());
            };

            let body = MessageBody {
                recipient_id: &recipient.id,
                content: random_phrase(session.rng()),
            };
            session.post_json(routes::MESSAGE, &body).await?;
            Ok(())
        })
    }

    async fn start(&mut self, session: &mut Session) {
        let ids = &self.cfg.identities;
        let index = session.rng().u32(ids.user_index_min..ids.user_index_max);
        self.identifier = Identities::user_email(index);

        let login = Login::new(self.identifier.clone(), ids.user_password.clone());
        if !auth::login(session, &login).await {
            return;
        }

        self.user_id = self.directory.id_for_email(&self.identifier).map(str::to_string);
        if self.user_id.is_none() && !self.directory.is_empty() {
            warn!(
                vu = session.vu_id(),
                identifier = %self.identifier,
                "own user id not found in the user directory"
            );
        }
        debug!(
            vu = session.vu_id(),
            identifier = %self.identifier,
            user_id = ?self.user_id,
            "api gateway user ready"
        );
    }
}

impl VirtualUser for ApiGatewayUser {
    fn tasks() -> TaskSet<Self> {
        TaskSet::new([
            Task::new("take_all_users", 10, Self::take_all_users),
            Task::new("view_self_me", 10, Self::view_self_me),
            Task::new("get_self_news_feed", 10, Self::get_self_news_feed),
            Task::new("get_user_news_feed", 25, Self::get_user_news_feed),
            Task::new("send_message", 3, Self::send_message),
        ])
    }

    fn on_start<'a>(&'a mut self, session: &'a mut Session) -> BoxFuture<'a, ()> {
        Box::pin(self.start(session))
    }
}

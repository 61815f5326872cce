use futures::future::BoxFuture;

use crate::session::Session;
use crate::task::TaskSet;

/// A virtual-user archetype: per-VU state plus the weighted task table the engine draws from.
pub trait VirtualUser: Send + Sized + 'static {
    fn tasks() -> TaskSet<Self>;

    /// Runs once per VU after the synchronized start, before the first task.
    fn on_start<'a>(&'a mut self, _session: &'a mut Session) -> BoxFuture<'a, ()> {
        Box::pin(async {})
    }
}

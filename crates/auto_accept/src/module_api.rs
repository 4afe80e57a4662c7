use std::{panic::AssertUnwindSafe, sync::Arc, time::Duration};

use async_trait::async_trait;
use futures::{future::BoxFuture, FutureExt};
use serde_json::{Map, Value};
use shared::domain::{Membership, MembershipEvent, RoomId, UserId};
use tokio::task::JoinHandle;
use tracing::error;

pub type AccountData = Map<String, Value>;

pub type DetachedTask = BoxFuture<'static, anyhow::Result<()>>;

/// Receives every new event the host persists.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn on_new_event(&self, event: &MembershipEvent) -> anyhow::Result<()>;
}

/// The slice of the host server the module talks to.
#[async_trait]
pub trait ModuleApi: Send + Sync {
    /// Whether `user_id` lives on this server.
    fn is_mine(&self, user_id: &UserId) -> bool;

    /// Name of the current worker, `None` on the main process.
    fn worker_name(&self) -> Option<&str>;

    fn register_event_handler(&self, handler: Arc<dyn EventHandler>);

    async fn update_room_membership(
        &self,
        sender: &UserId,
        target: &UserId,
        room_id: &RoomId,
        new_membership: Membership,
    ) -> anyhow::Result<MembershipEvent>;

    async fn get_global_account_data(
        &self,
        user_id: &UserId,
        data_type: &str,
    ) -> anyhow::Result<Option<AccountData>>;

    async fn put_global_account_data(
        &self,
        user_id: &UserId,
        data_type: &str,
        content: AccountData,
    ) -> anyhow::Result<()>;

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// Runs `task` without blocking the caller. Failures never reach the caller.
    fn run_detached(&self, description: &'static str, task: DetachedTask) {
        spawn_detached(description, task);
    }
}

/// Spawns `task` on the runtime, logging an `Err` or a panic instead of
/// letting either escape.
pub fn spawn_detached(description: &'static str, task: DetachedTask) -> JoinHandle<()> {
    tokio::spawn(async move {
        match AssertUnwindSafe(task).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                error!(task = description, error = %format!("{error:#}"), "background task failed");
            }
            Err(_) => {
                error!(task = description, "background task panicked");
            }
        }
    })
}

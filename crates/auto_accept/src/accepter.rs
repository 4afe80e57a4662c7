use std::sync::Arc;

use async_trait::async_trait;
use shared::domain::{Membership, MembershipEvent, UserId};
use tracing::info;

use crate::{
    config::AutoAcceptConfig,
    direct::mark_as_direct_message,
    error::AutoAcceptError,
    join::retry_make_join,
    module_api::{EventHandler, ModuleApi},
};

/// Accepts invites sent to local users as soon as the host sees them.
pub struct InviteAutoAccepter {
    config: Arc<AutoAcceptConfig>,
    api: Arc<dyn ModuleApi>,
    active: bool,
}

impl InviteAutoAccepter {
    /// Builds the accepter and subscribes it to the host's events, unless this
    /// process is not the worker configured to run it.
    pub fn new(config: AutoAcceptConfig, api: Arc<dyn ModuleApi>) -> Arc<Self> {
        let active = config.runs_on(api.worker_name());
        let accepter = Arc::new(Self {
            config: Arc::new(config),
            api,
            active,
        });

        if active {
            accepter
                .api
                .register_event_handler(Arc::clone(&accepter) as Arc<dyn EventHandler>);
        } else {
            info!(
                configured = ?accepter.config.worker_to_run_on,
                here = ?accepter.api.worker_name(),
                "not accepting invites on this worker"
            );
        }

        accepter
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Reacts to one event. Only failures to update `m.direct` are returned;
    /// the join itself runs in the background.
    pub async fn on_new_event(&self, event: &MembershipEvent) -> Result<(), AutoAcceptError> {
        let Some(invitee) = self.local_invitee(event) else {
            return Ok(());
        };

        let is_direct = event.is_direct();
        if self.config.accept_invites_only_for_direct_messages && !is_direct {
            return Ok(());
        }
        if self.config.accept_invites_only_from_local_users && !self.api.is_mine(&event.sender) {
            return Ok(());
        }

        let api = Arc::clone(&self.api);
        let user_id = invitee.clone();
        let room_id = event.room_id.clone();
        self.api.run_detached(
            "retry_make_join",
            Box::pin(async move {
                retry_make_join(api.as_ref(), &user_id, &room_id).await;
                Ok(())
            }),
        );

        if is_direct {
            mark_as_direct_message(self.api.as_ref(), &invitee, &event.sender, &event.room_id)
                .await?;
        }

        Ok(())
    }

    fn local_invitee(&self, event: &MembershipEvent) -> Option<UserId> {
        if !event.is_member_event()
            || !event.is_state()
            || event.membership() != Some(Membership::Invite)
        {
            return None;
        }
        event.target().filter(|target| self.api.is_mine(target))
    }
}

#[async_trait]
impl EventHandler for InviteAutoAccepter {
    async fn on_new_event(&self, event: &MembershipEvent) -> anyhow::Result<()> {
        InviteAutoAccepter::on_new_event(self, event).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/accepter_tests.rs"]
mod tests;

use std::time::Duration;

use shared::domain::{Membership, MembershipEvent, RoomId, UserId};
use tracing::info;

use crate::module_api::ModuleApi;

/// Join attempts made for one invite before giving up.
pub const MAX_JOIN_ATTEMPTS: u32 = 5;

#[derive(Debug, Default)]
struct RetryState {
    attempt: u32,
    backoff: Duration,
    joined: Option<MembershipEvent>,
}

impl RetryState {
    fn should_retry(&self) -> bool {
        self.joined.is_none() && self.attempt < MAX_JOIN_ATTEMPTS
    }

    fn record_failure(&mut self) {
        self.backoff = Duration::from_secs(1 << self.attempt);
        self.attempt += 1;
    }
}

/// Makes `user_id` join `room_id` on its own behalf, retrying with
/// exponential backoff (0s, 1s, 2s, 4s, 8s).
///
/// An invite that arrived over federation may be processed before the room
/// state is usable locally, so the first attempts are allowed to fail.
/// Returns the join event, or `None` once every attempt failed.
pub async fn retry_make_join(
    api: &dyn ModuleApi,
    user_id: &UserId,
    room_id: &RoomId,
) -> Option<MembershipEvent> {
    let mut state = RetryState::default();

    while state.should_retry() {
        api.sleep(state.backoff).await;

        match api
            .update_room_membership(user_id, user_id, room_id, Membership::Join)
            .await
        {
            Ok(event) => state.joined = Some(event),
            Err(error) => {
                info!(
                    user_id = %user_id,
                    room_id = %room_id,
                    attempt = state.attempt + 1,
                    error = %format!("{error:#}"),
                    "failed to join room after invite"
                );
                state.record_failure();
            }
        }
    }

    match &state.joined {
        Some(_) => info!(
            user_id = %user_id,
            room_id = %room_id,
            attempts = state.attempt + 1,
            "joined room after invite"
        ),
        None => info!(
            user_id = %user_id,
            room_id = %room_id,
            attempts = state.attempt,
            "giving up on joining room"
        ),
    }

    state.joined
}

#[cfg(test)]
#[path = "tests/join_tests.rs"]
mod tests;

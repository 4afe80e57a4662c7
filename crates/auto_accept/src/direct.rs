use serde_json::{map::Entry, Value};
use shared::domain::{RoomId, UserId};
use tracing::{debug, warn};

use crate::{
    error::AutoAcceptError,
    module_api::{AccountData, ModuleApi},
};

/// Global account data type holding a user's direct-message rooms, keyed by
/// the other party's user id.
pub const DIRECT_ACCOUNT_DATA_TYPE: &str = "m.direct";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectUpdate {
    /// First room recorded with this counterparty.
    Created,
    /// Room appended to the counterparty's existing list.
    Appended,
    /// The counterparty's entry is not a list; nothing was written.
    Skipped,
}

/// Adds `room_id` to `counterparty`'s entry. Other entries are left alone.
pub fn merge_direct_room(
    direct: &mut AccountData,
    counterparty: &UserId,
    room_id: &RoomId,
) -> DirectUpdate {
    let room = Value::String(room_id.to_string());
    match direct.entry(counterparty.as_str()) {
        Entry::Vacant(entry) => {
            entry.insert(Value::Array(vec![room]));
            DirectUpdate::Created
        }
        Entry::Occupied(mut entry) => match entry.get_mut() {
            Value::Array(rooms) => {
                rooms.push(room);
                DirectUpdate::Appended
            }
            _ => DirectUpdate::Skipped,
        },
    }
}

/// Records `room_id` as a direct-message room between `user_id` and
/// `counterparty` in `user_id`'s `m.direct` account data.
///
/// The fetch and the store are two separate host calls; a concurrent update
/// for the same user landing in between is lost.
pub async fn mark_as_direct_message(
    api: &dyn ModuleApi,
    user_id: &UserId,
    counterparty: &UserId,
    room_id: &RoomId,
) -> Result<DirectUpdate, AutoAcceptError> {
    let mut direct = api
        .get_global_account_data(user_id, DIRECT_ACCOUNT_DATA_TYPE)
        .await
        .map_err(|source| AutoAcceptError::AccountDataFetch {
            user_id: user_id.clone(),
            data_type: DIRECT_ACCOUNT_DATA_TYPE,
            source,
        })?
        .unwrap_or_default();

    let update = merge_direct_room(&mut direct, counterparty, room_id);
    if update == DirectUpdate::Skipped {
        warn!(
            user_id = %user_id,
            counterparty = %counterparty,
            room_id = %room_id,
            "m.direct entry is not a list, not marking room as direct"
        );
        return Ok(update);
    }

    api.put_global_account_data(user_id, DIRECT_ACCOUNT_DATA_TYPE, direct)
        .await
        .map_err(|source| AutoAcceptError::AccountDataStore {
            user_id: user_id.clone(),
            data_type: DIRECT_ACCOUNT_DATA_TYPE,
            source,
        })?;

    debug!(user_id = %user_id, counterparty = %counterparty, room_id = %room_id, ?update, "marked room as direct");
    Ok(update)
}

#[cfg(test)]
#[path = "tests/direct_tests.rs"]
mod tests;

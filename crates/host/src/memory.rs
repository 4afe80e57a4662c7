use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex as StdMutex, PoisonError, RwLock},
};

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use auto_accept::{
    module_api::spawn_detached, AccountData, DetachedTask, EventHandler, ModuleApi,
};
use serde::Serialize;
use shared::domain::{Membership, MembershipEvent, RoomId, UserId};
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, error};

/// Final state of the in-memory server, printed after a replay.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HostReport {
    pub memberships: BTreeMap<RoomId, BTreeMap<UserId, Membership>>,
    pub account_data: BTreeMap<UserId, BTreeMap<String, AccountData>>,
}

/// A single-process server keeping room membership and account data in
/// memory. Joins only succeed for users holding an invite (or already joined).
pub struct MemoryHost {
    server_name: String,
    worker_name: Option<String>,
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
    rooms: Mutex<HashMap<RoomId, HashMap<UserId, Membership>>>,
    account_data: Mutex<HashMap<UserId, HashMap<String, AccountData>>>,
    unready_rooms: Mutex<HashMap<RoomId, u32>>,
    detached: StdMutex<Vec<JoinHandle<()>>>,
}

impl MemoryHost {
    pub fn new(server_name: impl Into<String>, worker_name: Option<String>) -> Self {
        Self {
            server_name: server_name.into(),
            worker_name,
            handlers: RwLock::new(Vec::new()),
            rooms: Mutex::new(HashMap::new()),
            account_data: Mutex::new(HashMap::new()),
            unready_rooms: Mutex::new(HashMap::new()),
            detached: StdMutex::new(Vec::new()),
        }
    }

    /// The next `failures` joins into `room_id` fail, as if the invite had not
    /// finished propagating.
    pub async fn delay_room_readiness(&self, room_id: &RoomId, failures: u32) {
        self.unready_rooms
            .lock()
            .await
            .insert(room_id.clone(), failures);
    }

    pub async fn set_account_data(&self, user_id: &UserId, data_type: &str, content: AccountData) {
        self.account_data
            .lock()
            .await
            .entry(user_id.clone())
            .or_default()
            .insert(data_type.to_string(), content);
    }

    pub async fn membership(&self, room_id: &RoomId, user_id: &UserId) -> Option<Membership> {
        self.rooms
            .lock()
            .await
            .get(room_id)
            .and_then(|members| members.get(user_id))
            .copied()
    }

    /// Persists `event` and hands it to every registered handler. Handler
    /// failures are logged.
    pub async fn dispatch(&self, event: &MembershipEvent) {
        if event.is_member_event() {
            if let (Some(target), Some(membership)) = (event.target(), event.membership()) {
                self.rooms
                    .lock()
                    .await
                    .entry(event.room_id.clone())
                    .or_default()
                    .insert(target, membership);
            }
        }

        let handlers = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for handler in handlers {
            if let Err(error) = handler.on_new_event(event).await {
                error!(
                    room_id = %event.room_id,
                    event_type = %event.event_type,
                    error = %format!("{error:#}"),
                    "event handler failed"
                );
            }
        }
    }

    /// Waits until every background task, including ones spawned while
    /// waiting, has finished.
    pub async fn drain_detached(&self) {
        loop {
            let handles = std::mem::take(
                &mut *self.detached.lock().unwrap_or_else(PoisonError::into_inner),
            );
            if handles.is_empty() {
                return;
            }
            for handle in handles {
                if let Err(error) = handle.await {
                    error!(%error, "background task did not complete");
                }
            }
        }
    }

    pub async fn report(&self) -> HostReport {
        let memberships = self
            .rooms
            .lock()
            .await
            .iter()
            .map(|(room_id, members)| {
                (
                    room_id.clone(),
                    members
                        .iter()
                        .map(|(user_id, membership)| (user_id.clone(), *membership))
                        .collect(),
                )
            })
            .collect();
        let account_data = self
            .account_data
            .lock()
            .await
            .iter()
            .map(|(user_id, data)| {
                (
                    user_id.clone(),
                    data.iter()
                        .map(|(data_type, content)| (data_type.clone(), content.clone()))
                        .collect(),
                )
            })
            .collect();
        HostReport {
            memberships,
            account_data,
        }
    }
}

#[async_trait]
impl ModuleApi for MemoryHost {
    fn is_mine(&self, user_id: &UserId) -> bool {
        user_id.server_name() == self.server_name
    }

    fn worker_name(&self) -> Option<&str> {
        self.worker_name.as_deref()
    }

    fn register_event_handler(&self, handler: Arc<dyn EventHandler>) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }

    async fn update_room_membership(
        &self,
        sender: &UserId,
        target: &UserId,
        room_id: &RoomId,
        new_membership: Membership,
    ) -> anyhow::Result<MembershipEvent> {
        if new_membership == Membership::Join {
            if sender != target {
                bail!("{sender} cannot join {room_id} on behalf of {target}");
            }
            if let Some(remaining) = self.unready_rooms.lock().await.get_mut(room_id) {
                if *remaining > 0 {
                    *remaining -= 1;
                    bail!("room {room_id} is not ready yet");
                }
            }
        }

        let mut rooms = self.rooms.lock().await;
        let members = rooms.entry(room_id.clone()).or_default();
        let current = members.get(target).copied();
        if new_membership == Membership::Join
            && !matches!(current, Some(Membership::Invite | Membership::Join))
        {
            return Err(anyhow!("{target} is not invited to {room_id}"));
        }
        members.insert(target.clone(), new_membership);
        debug!(%room_id, %target, membership = %new_membership, "membership updated");

        Ok(MembershipEvent::member(
            sender.clone(),
            target,
            room_id.clone(),
            new_membership,
        ))
    }

    async fn get_global_account_data(
        &self,
        user_id: &UserId,
        data_type: &str,
    ) -> anyhow::Result<Option<AccountData>> {
        Ok(self
            .account_data
            .lock()
            .await
            .get(user_id)
            .and_then(|data| data.get(data_type))
            .cloned())
    }

    async fn put_global_account_data(
        &self,
        user_id: &UserId,
        data_type: &str,
        content: AccountData,
    ) -> anyhow::Result<()> {
        self.set_account_data(user_id, data_type, content).await;
        Ok(())
    }

    fn run_detached(&self, description: &'static str, task: DetachedTask) {
        let handle = spawn_detached(description, task);
        self.detached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
    }
}

#[cfg(test)]
#[path = "tests/memory_tests.rs"]
mod tests;

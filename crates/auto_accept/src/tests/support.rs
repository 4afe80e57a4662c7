use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::anyhow;
use async_trait::async_trait;
use shared::domain::{Membership, MembershipEvent, RoomId, UserId};
use tokio::task::JoinHandle;

use crate::module_api::{spawn_detached, AccountData, DetachedTask, EventHandler, ModuleApi};

pub(crate) const LOCAL_SERVER: &str = "test";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MembershipCall {
    pub sender: UserId,
    pub target: UserId,
    pub room_id: RoomId,
    pub new_membership: Membership,
}

/// Host double recording every call the module makes.
#[derive(Default)]
pub(crate) struct FakeHost {
    worker_name: Option<String>,
    failing_joins: u32,
    failing_account_data: bool,
    failing_account_data_store: bool,
    handlers: Mutex<Vec<Arc<dyn EventHandler>>>,
    membership_calls: Mutex<Vec<MembershipCall>>,
    account_data: Mutex<HashMap<(UserId, String), AccountData>>,
    account_data_gets: Mutex<Vec<(UserId, String)>>,
    account_data_puts: Mutex<Vec<(UserId, String, AccountData)>>,
    sleeps: Mutex<Vec<Duration>>,
    detached: Mutex<Vec<JoinHandle<()>>>,
}

impl FakeHost {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn on_worker(mut self, worker_name: &str) -> Self {
        self.worker_name = Some(worker_name.to_string());
        self
    }

    /// The first `count` join attempts fail.
    pub(crate) fn failing_joins(mut self, count: u32) -> Self {
        self.failing_joins = count;
        self
    }

    pub(crate) fn failing_account_data(mut self) -> Self {
        self.failing_account_data = true;
        self
    }

    /// Reads succeed, every write fails.
    pub(crate) fn failing_account_data_store(mut self) -> Self {
        self.failing_account_data_store = true;
        self
    }

    pub(crate) fn with_account_data(
        self,
        user_id: &UserId,
        data_type: &str,
        content: serde_json::Value,
    ) -> Self {
        let serde_json::Value::Object(content) = content else {
            panic!("account data must be an object");
        };
        self.account_data
            .lock()
            .expect("lock")
            .insert((user_id.clone(), data_type.to_string()), content);
        self
    }

    pub(crate) fn handler_count(&self) -> usize {
        self.handlers.lock().expect("lock").len()
    }

    pub(crate) fn membership_calls(&self) -> Vec<MembershipCall> {
        self.membership_calls.lock().expect("lock").clone()
    }

    pub(crate) fn account_data_gets(&self) -> Vec<(UserId, String)> {
        self.account_data_gets.lock().expect("lock").clone()
    }

    pub(crate) fn account_data_puts(&self) -> Vec<(UserId, String, AccountData)> {
        self.account_data_puts.lock().expect("lock").clone()
    }

    pub(crate) fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().expect("lock").clone()
    }

    /// Waits for every task handed to `run_detached` so far.
    pub(crate) async fn drain_detached(&self) {
        let handles = std::mem::take(&mut *self.detached.lock().expect("lock"));
        for handle in handles {
            handle.await.expect("detached task");
        }
    }
}

#[async_trait]
impl ModuleApi for FakeHost {
    fn is_mine(&self, user_id: &UserId) -> bool {
        user_id.server_name() == LOCAL_SERVER
    }

    fn worker_name(&self) -> Option<&str> {
        self.worker_name.as_deref()
    }

    fn register_event_handler(&self, handler: Arc<dyn EventHandler>) {
        self.handlers.lock().expect("lock").push(handler);
    }

    async fn update_room_membership(
        &self,
        sender: &UserId,
        target: &UserId,
        room_id: &RoomId,
        new_membership: Membership,
    ) -> anyhow::Result<MembershipEvent> {
        let attempt = {
            let mut calls = self.membership_calls.lock().expect("lock");
            calls.push(MembershipCall {
                sender: sender.clone(),
                target: target.clone(),
                room_id: room_id.clone(),
                new_membership,
            });
            calls.len() as u32
        };
        if attempt <= self.failing_joins {
            return Err(anyhow!("room {room_id} not ready (attempt {attempt})"));
        }
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
        self.account_data_gets
            .lock()
            .expect("lock")
            .push((user_id.clone(), data_type.to_string()));
        if self.failing_account_data {
            return Err(anyhow!("account data store unavailable"));
        }
        Ok(self
            .account_data
            .lock()
            .expect("lock")
            .get(&(user_id.clone(), data_type.to_string()))
            .cloned())
    }

    async fn put_global_account_data(
        &self,
        user_id: &UserId,
        data_type: &str,
        content: AccountData,
    ) -> anyhow::Result<()> {
        self.account_data_puts.lock().expect("lock").push((
            user_id.clone(),
            data_type.to_string(),
            content.clone(),
        ));
        if self.failing_account_data_store {
            return Err(anyhow!("disk full"));
        }
        self.account_data
            .lock()
            .expect("lock")
            .insert((user_id.clone(), data_type.to_string()), content);
        Ok(())
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().expect("lock").push(duration);
    }

    fn run_detached(&self, description: &'static str, task: DetachedTask) {
        let handle = spawn_detached(description, task);
        self.detached.lock().expect("lock").push(handle);
    }
}

pub(crate) fn user(raw: &str) -> UserId {
    UserId::parse(raw).expect("user id")
}

pub(crate) fn room(raw: &str) -> RoomId {
    RoomId::parse(raw).expect("room id")
}

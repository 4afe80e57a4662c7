use shared::domain::UserId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("module config must be a mapping, got {0}")]
    NotAMapping(&'static str),
    #[error("invalid module config: {0}")]
    Invalid(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum AutoAcceptError {
    #[error("failed to fetch '{data_type}' account data for {user_id}")]
    AccountDataFetch {
        user_id: UserId,
        data_type: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to store '{data_type}' account data for {user_id}")]
    AccountDataStore {
        user_id: UserId,
        data_type: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

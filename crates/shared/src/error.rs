use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("{kind} '{value}' must start with '{sigil}'")]
    MissingSigil {
        kind: &'static str,
        sigil: char,
        value: String,
    },
    #[error("{kind} '{value}' has no server name")]
    MissingServerName { kind: &'static str, value: String },
    #[error("{kind} '{value}' has an empty localpart")]
    EmptyLocalpart { kind: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown membership '{0}'")]
pub struct UnknownMembership(pub String);

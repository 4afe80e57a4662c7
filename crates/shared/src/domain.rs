use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{IdError, UnknownMembership};

macro_rules! id_newtype {
    ($name:ident, $sigil:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn parse(raw: impl Into<String>) -> Result<Self, IdError> {
                let raw = raw.into();
                if !raw.starts_with($sigil) {
                    return Err(IdError::MissingSigil {
                        kind: stringify!($name),
                        sigil: $sigil,
                        value: raw,
                    });
                }
                let Some((localpart, server_name)) = raw.split_once(':') else {
                    return Err(IdError::MissingServerName {
                        kind: stringify!($name),
                        value: raw,
                    });
                };
                if server_name.is_empty() {
                    return Err(IdError::MissingServerName {
                        kind: stringify!($name),
                        value: raw,
                    });
                }
                if localpart.len() <= 1 {
                    return Err(IdError::EmptyLocalpart {
                        kind: stringify!($name),
                        value: raw,
                    });
                }
                Ok(Self(raw))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Everything after the first `:`.
            pub fn server_name(&self) -> &str {
                self.0
                    .split_once(':')
                    .map(|(_, server_name)| server_name)
                    .unwrap_or_default()
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(UserId, '@');
id_newtype!(RoomId, '!');

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Membership {
    Invite,
    Join,
    Leave,
    Ban,
    Knock,
}

impl Membership {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invite => "invite",
            Self::Join => "join",
            Self::Leave => "leave",
            Self::Ban => "ban",
            Self::Knock => "knock",
        }
    }
}

impl FromStr for Membership {
    type Err = UnknownMembership;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "invite" => Ok(Self::Invite),
            "join" => Ok(Self::Join),
            "leave" => Ok(Self::Leave),
            "ban" => Ok(Self::Ban),
            "knock" => Ok(Self::Knock),
            other => Err(UnknownMembership(other.to_string())),
        }
    }
}

impl fmt::Display for Membership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const MEMBER_EVENT_TYPE: &str = "m.room.member";

/// A room event as the host delivers it. Every event type flows through this
/// shape; only the membership fields of `content` are ever interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_key: Option<String>,
    pub sender: UserId,
    pub room_id: RoomId,
    #[serde(default)]
    pub content: Value,
}

impl MembershipEvent {
    /// Builds an `m.room.member` state event for `target`.
    pub fn member(sender: UserId, target: &UserId, room_id: RoomId, membership: Membership) -> Self {
        Self {
            event_type: MEMBER_EVENT_TYPE.to_string(),
            state_key: Some(target.to_string()),
            sender,
            room_id,
            content: json!({ "membership": membership.as_str() }),
        }
    }

    pub fn with_direct(mut self, is_direct: bool) -> Self {
        if let Value::Object(content) = &mut self.content {
            content.insert("is_direct".to_string(), Value::Bool(is_direct));
        }
        self
    }

    pub fn is_state(&self) -> bool {
        self.state_key.is_some()
    }

    pub fn is_member_event(&self) -> bool {
        self.event_type == MEMBER_EVENT_TYPE
    }

    /// `None` when `content.membership` is absent or not a known value.
    pub fn membership(&self) -> Option<Membership> {
        self.content
            .get("membership")
            .and_then(Value::as_str)
            .and_then(|raw| raw.parse().ok())
    }

    /// The subject of a membership change, if the state key is a valid user id.
    pub fn target(&self) -> Option<UserId> {
        self.state_key
            .as_deref()
            .and_then(|state_key| UserId::parse(state_key).ok())
    }

    /// Only a literal JSON `true` counts.
    pub fn is_direct(&self) -> bool {
        matches!(self.content.get("is_direct"), Some(Value::Bool(true)))
    }
}

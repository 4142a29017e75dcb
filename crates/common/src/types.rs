//! Platform identifiers.
//!
//! Chat platforms hand out 64-bit snowflakes for users, channels and
//! messages. The newtypes keep them from being mixed up when they are used
//! as session-store keys or reply targets.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            #[must_use]
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u64>()
                    .map(Self)
                    .map_err(|source| Error::InvalidId {
                        value: s.to_string(),
                        source,
                    })
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

snowflake!(
    /// A chat user (including the bot itself).
    UserId
);
snowflake!(
    /// A channel, DM or thread.
    ChannelId
);
snowflake!(
    /// A single chat message.
    MessageId
);
snowflake!(
    /// A server (guild) grouping channels.
    GuildId
);

/// Opaque state a backend needs to resume a conversation with memory.
///
/// Ollama-style backends return an integer context vector; some backends
/// hand out a session token instead. Either may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Continuation {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
}

impl Continuation {
    #[must_use]
    pub fn from_context(context: Vec<i64>) -> Self {
        Self {
            context,
            session: None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.context.is_empty() && self.session.is_none()
    }
}

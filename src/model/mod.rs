//! Domain records exchanged with the chat backend
//!
//! These types mirror the backend's JSON shapes (camelCase keys, numeric or
//! string identifiers) and are read-only to the widget layer.

pub mod message;
pub mod session;
pub mod tree;

pub use message::{parse_timestamp, parse_timestamp_in, Message, SendMessageRequest};
pub use session::Session;
pub use tree::{find_in, find_in_mut, TreeNode};

use serde::{Deserialize, Deserializer};

/// Identifier as it may appear on the wire
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => s,
            RawId::Signed(n) => n.to_string(),
            RawId::Unsigned(n) => n.to_string(),
        }
    }
}

/// Deserialize an optional identifier given as a JSON string or number
pub(crate) fn deserialize_opt_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(deserializer)?.map(String::from))
}

/// Deserialize a required identifier given as a JSON string or number
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(RawId::deserialize(deserializer)?.into())
}

/// Deserialize a value that may be `null`, falling back to its default
pub(crate) fn deserialize_null_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

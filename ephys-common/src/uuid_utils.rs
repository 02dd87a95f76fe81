//! Session identifier utilities
//!
//! A session is named by the canonical textual form of a version-4 UUID
//! (lowercase, hyphenated). Anything that does not survive a parse/format
//! round trip unchanged is rejected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::{Uuid, Variant};

use crate::Error;

/// Check whether `token` is a canonical session identifier
pub fn validate_id(token: &str) -> bool {
    parse(token).is_some()
}

fn parse(token: &str) -> Option<Uuid> {
    let uuid = Uuid::parse_str(token).ok()?;
    if uuid.get_version_num() != 4 || uuid.get_variant() != Variant::RFC4122 {
        return None;
    }
    // Rejects braced, urn, simple and uppercase spellings
    if uuid.hyphenated().to_string() != token {
        return None;
    }
    Some(uuid)
}

/// Validated session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Parse a canonical session identifier
    pub fn parse(token: &str) -> Result<Self, Error> {
        parse(token)
            .map(Self)
            .ok_or_else(|| Error::InvalidIdentifier(token.to_string()))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for SessionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for SessionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SessionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        Self::parse(&token).map_err(serde::de::Error::custom)
    }
}

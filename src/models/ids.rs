//! Content-addressed ids for team sets, games and players.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Hex digits kept from the digest.
const ID_LEN: usize = 16;

/// Field separator fed to the hasher. Unit layouts never contain it.
const FIELD_SEPARATOR: char = '\u{1f}';

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: String) -> Self {
        Self(id)
    }

    /// Digest of `fields`, so equal content always yields the same id.
    pub fn generate(fields: &[&str]) -> Self {
        let joined = fields.join(&FIELD_SEPARATOR.to_string());
        let mut id = hex::encode(Sha256::digest(joined.as_bytes()));
        id.truncate(ID_LEN);
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntityId").field(&self.0).finish()
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// Hash of the game type and the sorted unit layout.
pub type TeamSetId = EntityId;
pub type GameId = EntityId;
pub type PlayerId = EntityId;

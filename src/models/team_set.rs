//! Team set model.

use serde::{Deserialize, Serialize};

use super::{EntityId, TeamSetId, TeamSetStats};

/// A unit placed on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPlacement {
    /// Unit type from the game's catalog
    #[serde(rename = "type")]
    pub unit_type: String,

    /// Board column
    pub x: i32,

    /// Board row
    pub y: i32,
}

impl UnitPlacement {
    pub fn new(unit_type: impl Into<String>, x: i32, y: i32) -> Self {
        Self {
            unit_type: unit_type.into(),
            x,
            y,
        }
    }

    fn layout_key(&self) -> String {
        format!("{}@{},{}", self.unit_type, self.x, self.y)
    }
}

/// A facet derived from a team set's composition.
///
/// Countable tags (unit counts, for example) carry the cardinal count.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    #[serde(rename = "type")]
    pub tag_type: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
}

impl Tag {
    /// Create an uncounted tag.
    pub fn new(tag_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            tag_type: tag_type.into(),
            name: name.into(),
            count: None,
        }
    }

    /// Create a countable tag.
    pub fn counted(tag_type: impl Into<String>, name: impl Into<String>, count: u32) -> Self {
        Self {
            count: Some(count),
            ..Self::new(tag_type, name)
        }
    }

    pub fn is_countable(&self) -> bool {
        self.count.is_some()
    }
}

/// A user-authored unit composition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamSet {
    /// Content hash of the normalized unit layout
    pub id: TeamSetId,

    /// Game type this set belongs to
    pub game_type_id: String,

    /// Display name (designer sets are usually named)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub units: Vec<UnitPlacement>,

    /// Derived facets, supplied by the game type
    #[serde(default)]
    pub tags: Vec<Tag>,

    #[serde(default)]
    pub stats: TeamSetStats,
}

impl TeamSet {
    /// Create a new TeamSet with an ID derived from its unit layout.
    ///
    /// Placement order does not affect the ID.
    pub fn new(game_type_id: impl Into<String>, units: Vec<UnitPlacement>, tags: Vec<Tag>) -> Self {
        let game_type_id = game_type_id.into();
        let id = Self::layout_id(&game_type_id, &units);

        Self {
            id,
            game_type_id,
            name: None,
            units,
            tags,
            stats: TeamSetStats::default(),
        }
    }

    /// Compute the content ID of a unit layout.
    pub fn layout_id(game_type_id: &str, units: &[UnitPlacement]) -> TeamSetId {
        let mut keys: Vec<String> = units.iter().map(UnitPlacement::layout_key).collect();
        keys.sort();

        let mut fields: Vec<&str> = Vec::with_capacity(keys.len() + 1);
        fields.push(game_type_id);
        fields.extend(keys.iter().map(String::as_str));
        EntityId::generate(&fields)
    }

    /// Builder method to set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Same set, stats reset to defaults.
    pub fn with_default_stats(&self) -> Self {
        Self {
            stats: TeamSetStats::default(),
            ..self.clone()
        }
    }
}

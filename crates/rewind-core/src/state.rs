//! Block, entity and item state as recorded in activities and read from the world

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Material key, e.g. `stone` or `oak_planks`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Material(pub String);

impl Material {
    /// Create a new material key
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn air() -> Self {
        Self::new("air")
    }

    pub fn lava() -> Self {
        Self::new("lava")
    }

    /// Get the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_air(&self) -> bool {
        matches!(self.0.as_str(), "air" | "cave_air" | "void_air")
    }

    pub fn is_lava(&self) -> bool {
        self.0 == "lava"
    }

    /// Whether entities can stand inside a block of this material
    pub fn is_passable(&self) -> bool {
        self.is_air() || matches!(self.0.as_str(), "water" | "lava" | "short_grass" | "torch")
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Material {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Full state of one block: its material plus serialized block data
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockState {
    pub material: Material,
    /// Serialized block data such as `facing=north,half=top`
    #[serde(default)]
    pub data: Option<String>,
}

impl BlockState {
    pub fn new(material: impl Into<Material>) -> Self {
        Self {
            material: material.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn air() -> Self {
        Self::new(Material::air())
    }

    pub fn is_air(&self) -> bool {
        self.material.is_air()
    }
}

impl Default for BlockState {
    fn default() -> Self {
        Self::air()
    }
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data {
            Some(data) => write!(f, "{}[{}]", self.material, data),
            None => write!(f, "{}", self.material),
        }
    }
}

/// Entity type key, e.g. `sheep` or `villager`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityType(pub String);

impl EntityType {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Everything needed to bring an entity back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub kind: EntityType,
    #[serde(default)]
    pub custom_name: Option<String>,
    /// Serialized extra data (color, profession, health...), insertion ordered
    #[serde(default)]
    pub data: IndexMap<String, String>,
}

impl EntitySnapshot {
    pub fn new(kind: impl Into<EntityType>) -> Self {
        Self {
            kind: kind.into(),
            custom_name: None,
            data: IndexMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.custom_name = Some(name.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// A stack of items
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemStack {
    pub material: Material,
    pub quantity: u32,
}

impl ItemStack {
    pub fn new(material: impl Into<Material>, quantity: u32) -> Self {
        Self {
            material: material.into(),
            quantity,
        }
    }
}

impl fmt::Display for ItemStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x{}", self.material, self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_air_variants() {
        assert!(Material::air().is_air());
        assert!(Material::new("cave_air").is_air());
        assert!(!Material::new("stone").is_air());
        assert!(BlockState::default().is_air());
    }

    #[test]
    fn test_block_state_equality_includes_data() {
        let a = BlockState::new("oak_stairs").with_data("facing=north");
        let b = BlockState::new("oak_stairs").with_data("facing=south");
        assert_ne!(a, b);
        assert_eq!(format!("{}", a), "oak_stairs[facing=north]");
    }

    #[test]
    fn test_entity_snapshot_from_ron() {
        let snapshot: EntitySnapshot = ron::from_str(
            r#"(kind: "sheep", custom_name: Some("Dolly"), data: {"color": "white"})"#,
        )
        .unwrap();
        assert_eq!(snapshot.kind.as_str(), "sheep");
        assert_eq!(snapshot.custom_name.as_deref(), Some("Dolly"));
        assert_eq!(snapshot.data.get("color").map(String::as_str), Some("white"));
    }
}

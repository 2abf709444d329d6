use serde::{Deserialize, Serialize};

/// A single piece of evidence as authored in content or granted by a recipe.
/// Immutable once created; identity is the `id` string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceDef {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub pack_id: String,
}

impl EvidenceDef {
    pub fn new(id: &str, name: &str, description: &str, pack_id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            icon: None,
            pack_id: pack_id.to_string(),
        }
    }
}

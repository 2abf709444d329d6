/// Voice the hint broker falls back to when a recipe declares no voices at all.
pub const DEFAULT_VOICE: &str = "logic";

/// A voice of the detective's inner parliament, as authored in content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceDef {
    pub id: String,
    pub name: String,
    pub group: String,
}

impl VoiceDef {
    pub fn new(id: &str, name: &str, group: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            group: group.to_string(),
        }
    }
}

use std::collections::BTreeMap;

use bevy_ecs::prelude::*;

/// Per-session skill levels of the inner parliament. Unset voices are level 0.
#[derive(Resource, Debug, Clone, Default)]
pub struct VoiceState {
    levels: BTreeMap<String, i64>,
}

impl VoiceState {
    pub fn level(&self, voice_id: &str) -> i64 {
        self.levels.get(voice_id).copied().unwrap_or(0)
    }

    pub fn set_level(&mut self, voice_id: &str, level: i64) {
        self.levels.insert(voice_id.to_string(), level.max(0));
    }

    pub fn levels(&self) -> &BTreeMap<String, i64> {
        &self.levels
    }

    pub fn replace_levels(&mut self, levels: BTreeMap<String, i64>) {
        self.levels = levels;
    }
}

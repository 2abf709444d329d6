use bevy_ecs::prelude::*;

/// Capability for reporting side effects outward (progression, scripting).
/// Injected into the resolver so the engine never reaches back into the
/// systems that consume it.
pub trait RewardSink {
    fn grant_xp(&mut self, amount: u64);
    fn set_flag(&mut self, flag: &str, value: bool);
}

/// Default in-session sink: accumulates XP and mirrors flags for collaborators
/// that poll instead of subscribing.
#[derive(Resource, Debug, Default, Clone)]
pub struct RewardLog {
    pub xp: u64,
    pub flags: Vec<(String, bool)>,
}

impl RewardSink for RewardLog {
    fn grant_xp(&mut self, amount: u64) {
        self.xp += amount;
    }

    fn set_flag(&mut self, flag: &str, value: bool) {
        self.flags.push((flag.to_string(), value));
    }
}

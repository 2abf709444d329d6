use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::content::repository::RecipeRegistry;
use crate::rules::evidence::EvidenceDef;
use crate::simulation::dossier::{Dossier, EvidenceMutation, PointState};
use crate::simulation::hypotheses::{HypothesisLedger, HypothesisState};
use crate::simulation::rewards::RewardLog;
use crate::simulation::voices::VoiceState;

/// Serializable snapshot of one investigation session. Only dynamic state is
/// captured; the static registries are reloaded from content on restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default = "default_snapshot_version")]
    pub version: u32,
    pub evidence: Vec<EvidenceDef>,
    pub solved: Vec<String>,
    #[serde(default)]
    pub flags: BTreeMap<String, bool>,
    #[serde(default)]
    pub point_states: BTreeMap<String, PointState>,
    #[serde(default)]
    pub history: Vec<EvidenceMutation>,
    #[serde(default)]
    pub thought_points: u32,
    #[serde(default)]
    pub hypotheses: BTreeMap<String, HypothesisState>,
    #[serde(default)]
    pub voice_levels: BTreeMap<String, i64>,
    #[serde(default)]
    pub xp: u64,
}

fn default_snapshot_version() -> u32 {
    1
}

/// Extract a serializable snapshot of the session resources.
pub fn extract_state_from_world(world: &World) -> SessionSnapshot {
    let dossier = world.resource::<Dossier>();
    let voices = world.resource::<VoiceState>();
    let ledger = world.resource::<HypothesisLedger>();
    let rewards = world
        .get_resource::<RewardLog>()
        .cloned()
        .unwrap_or_default();

    SessionSnapshot {
        version: default_snapshot_version(),
        evidence: dossier.evidence.clone(),
        solved: dossier.solved.clone(),
        flags: dossier.flags.clone(),
        point_states: dossier.point_states.clone(),
        history: dossier.history.clone(),
        thought_points: dossier.thought_points,
        hypotheses: ledger.entries().clone(),
        voice_levels: voices.levels().clone(),
        xp: rewards.xp,
    }
}

/// Apply a snapshot back onto the session resources. Confidence scores are
/// recomputed rather than trusted from the file.
pub fn apply_state_to_world(state: SessionSnapshot, world: &mut World, registry: &RecipeRegistry) {
    {
        let mut dossier = world.resource_mut::<Dossier>();
        dossier.evidence = state.evidence;
        dossier.solved = state.solved;
        dossier.flags = state.flags;
        dossier.point_states = state.point_states;
        dossier.history = state.history;
        dossier.thought_points = state.thought_points;
        dossier.sync_next_seq();
    }

    {
        let mut voices = world.resource_mut::<VoiceState>();
        voices.replace_levels(state.voice_levels);
    }

    {
        let mut rewards = world.resource_mut::<RewardLog>();
        rewards.xp = state.xp;
        rewards.flags.clear();
    }

    let dossier = world.resource::<Dossier>().clone();
    let mut ledger = world.resource_mut::<HypothesisLedger>();
    ledger.replace_all(state.hypotheses);
    ledger.recompute(registry, &dossier);
}

/// Serialize a snapshot into JSON for persistence.
pub fn save_state_to_json(state: &SessionSnapshot) -> serde_json::Result<String> {
    serde_json::to_string_pretty(state)
}

/// Deserialize JSON back into a snapshot.
pub fn load_state_from_json(data: &str) -> serde_json::Result<SessionSnapshot> {
    serde_json::from_str(data)
}

/// Write a snapshot to a file path.
pub fn save_state_to_path<P: AsRef<Path>>(state: &SessionSnapshot, path: P) -> std::io::Result<()> {
    let json =
        save_state_to_json(state).map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    fs::write(path, json)
}

/// Read a snapshot from a file path.
pub fn load_state_from_path<P: AsRef<Path>>(path: P) -> std::io::Result<SessionSnapshot> {
    let data = fs::read_to_string(&path)?;
    load_state_from_json(&data).map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::recipe::{DeductionRecipe, Outcome, OutcomePayload};

    fn seeded_world() -> World {
        let mut world = World::new();
        world.insert_resource(Dossier::default());
        world.insert_resource(VoiceState::default());
        world.insert_resource(HypothesisLedger::default());
        world.insert_resource(RewardLog::default());
        world
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let mut registry = RecipeRegistry::default();
        registry.register(DeductionRecipe::new(
            "r1",
            "a",
            "b",
            Outcome {
                id: "h1".to_string(),
                label: "theory".to_string(),
                description: String::new(),
                tier: 1,
                payload: OutcomePayload::Hypothesis {
                    base_confidence: Some(60),
                },
            },
        ));

        let mut world = seeded_world();
        {
            let mut dossier = world.resource_mut::<Dossier>();
            dossier.add_evidence(EvidenceDef::new("a", "A", "desc", "t"), None);
            dossier.add_evidence(EvidenceDef::new("b", "B", "desc", "t"), Some("r0"));
            dossier.mark_solved("r1");
            dossier.set_flag("case_open", true);
            dossier.discover_point("loc_mill");
            dossier.thought_points = 3;
        }
        world.resource_mut::<VoiceState>().set_level("logic", 4);
        world.resource_mut::<RewardLog>().xp = 25;
        {
            let mut ledger = world.resource_mut::<HypothesisLedger>();
            ledger.insert(HypothesisState {
                source_recipe_id: "r1".to_string(),
                outcome_id: "h1".to_string(),
                label: "theory".to_string(),
                description: String::new(),
                base_confidence: 60,
                confidence: 0,
                voice_modifiers: BTreeMap::new(),
                is_red_herring: false,
                tier: 1,
            });
        }

        let snapshot = extract_state_from_world(&world);
        let json = save_state_to_json(&snapshot).expect("serialize");
        let restored = load_state_from_json(&json).expect("deserialize");

        let mut fresh = seeded_world();
        apply_state_to_world(restored, &mut fresh, &registry);

        let dossier = fresh.resource::<Dossier>();
        assert!(dossier.has_evidence("a"));
        assert!(dossier.is_solved("r1"));
        assert!(dossier.flag("case_open"));
        assert_eq!(dossier.point_state("loc_mill"), Some(PointState::Discovered));
        assert_eq!(dossier.thought_points, 3);
        assert_eq!(dossier.history.len(), 2);
        assert_eq!(fresh.resource::<VoiceState>().level("logic"), 4);
        assert_eq!(fresh.resource::<RewardLog>().xp, 25);

        // Confidence is recomputed on load: both inputs held gives 60 + 4.
        let ledger = fresh.resource::<HypothesisLedger>();
        assert_eq!(ledger.get("h1").map(|h| h.confidence), Some(64));
    }

    #[test]
    fn history_counter_resumes_after_load() {
        let registry = RecipeRegistry::default();
        let mut world = seeded_world();
        {
            let mut dossier = world.resource_mut::<Dossier>();
            dossier.add_evidence(EvidenceDef::new("a", "A", "desc", "t"), None);
            dossier.add_evidence(EvidenceDef::new("b", "B", "desc", "t"), None);
        }

        let snapshot = extract_state_from_world(&world);
        let mut fresh = seeded_world();
        apply_state_to_world(snapshot, &mut fresh, &registry);

        let mut dossier = fresh.resource_mut::<Dossier>();
        dossier.add_evidence(EvidenceDef::new("c", "C", "desc", "t"), None);
        assert_eq!(dossier.history.last().map(|entry| entry.seq), Some(3));
    }
}

use std::path::Path;

use bevy_ecs::prelude::*;

use crate::content::repository::{ContentRepository, EvidenceCatalog, RecipeRegistry, VoiceRoster};
use crate::core::serialization::{
    apply_state_to_world, extract_state_from_world, load_state_from_path, save_state_to_path,
    SessionSnapshot,
};
use crate::rules::evidence::EvidenceDef;
use crate::simulation::dossier::Dossier;
use crate::simulation::hypotheses::{HypothesisLedger, HypothesisState};
use crate::simulation::rewards::RewardLog;
use crate::simulation::voices::VoiceState;
use crate::systems::deduction::{combine, CombineResult};
use crate::systems::hints::{request_hint, Hint};

/// Wrapper around the ECS world holding one live investigation, plus the
/// static content registries it runs against.
pub struct Session {
    world: World,
    catalog: EvidenceCatalog,
    registry: RecipeRegistry,
    roster: VoiceRoster,
}

impl Session {
    /// Create a fresh session over already-loaded content.
    pub fn new(catalog: EvidenceCatalog, registry: RecipeRegistry, roster: VoiceRoster) -> Self {
        let mut world = World::new();
        world.insert_resource(Dossier::default());
        world.insert_resource(VoiceState::default());
        world.insert_resource(HypothesisLedger::default());
        world.insert_resource(RewardLog::default());

        Self {
            world,
            catalog,
            registry,
            roster,
        }
    }

    /// Create a fresh session, loading content from a repository.
    pub fn from_repository(
        repository: &dyn ContentRepository,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let catalog = repository.load_evidence_catalog()?;
        let registry = repository.load_recipe_registry()?;
        let roster = repository.load_voice_roster()?;
        Ok(Self::new(catalog, registry, roster))
    }

    /// Hand the player a piece of catalog evidence. Returns false when the id
    /// is unknown or already held.
    pub fn add_evidence(&mut self, evidence_id: &str) -> bool {
        let Some(def) = self.catalog.get(evidence_id).cloned() else {
            return false;
        };
        self.world
            .resource_mut::<Dossier>()
            .add_evidence(def, None)
    }

    /// Hand the player an evidence item that is not in the catalog, e.g. one
    /// minted by a scripted event. Returns false when the id is already held.
    pub fn add_evidence_item(&mut self, def: EvidenceDef) -> bool {
        self.world
            .resource_mut::<Dossier>()
            .add_evidence(def, None)
    }

    /// Attempt to combine two held pieces of evidence.
    pub fn combine(&mut self, id_a: &str, id_b: &str) -> Option<CombineResult> {
        let registry = &self.registry;
        self.world
            .resource_scope(|world, mut dossier: Mut<Dossier>| {
                world.resource_scope(|world, mut ledger: Mut<HypothesisLedger>| {
                    world.resource_scope(|world, mut rewards: Mut<RewardLog>| {
                        let voices = world.resource::<VoiceState>();
                        combine(
                            registry,
                            &mut dossier,
                            voices,
                            &mut ledger,
                            &mut *rewards,
                            id_a,
                            id_b,
                        )
                    })
                })
            })
    }

    /// Spend one thought point for a hint about a held piece of evidence.
    pub fn request_hint(&mut self, evidence_id: &str) -> Option<Hint> {
        let registry = &self.registry;
        let catalog = &self.catalog;
        let roster = &self.roster;
        self.world
            .resource_scope(|world, mut dossier: Mut<Dossier>| {
                let voices = world.resource::<VoiceState>();
                request_hint(registry, catalog, roster, &mut dossier, voices, evidence_id)
            })
    }

    pub fn set_voice_level(&mut self, voice_id: &str, level: i64) {
        self.world
            .resource_mut::<VoiceState>()
            .set_level(voice_id, level);
    }

    pub fn voice_level(&self, voice_id: &str) -> i64 {
        self.world.resource::<VoiceState>().level(voice_id)
    }

    pub fn thought_points(&self) -> u32 {
        self.world.resource::<Dossier>().thought_points
    }

    pub fn grant_thought_points(&mut self, amount: u32) {
        self.world.resource_mut::<Dossier>().thought_points += amount;
    }

    pub fn xp(&self) -> u64 {
        self.world.resource::<RewardLog>().xp
    }

    pub fn dossier(&self) -> &Dossier {
        self.world.resource::<Dossier>()
    }

    pub fn hypothesis(&self, outcome_id: &str) -> Option<&HypothesisState> {
        self.world.resource::<HypothesisLedger>().get(outcome_id)
    }

    /// Extract a serializable snapshot of the current session.
    pub fn snapshot(&self) -> SessionSnapshot {
        extract_state_from_world(&self.world)
    }

    /// Apply a snapshot back into the live session.
    pub fn restore(&mut self, snapshot: SessionSnapshot) {
        apply_state_to_world(snapshot, &mut self.world, &self.registry);
    }

    /// Save the session directly to a file path.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        save_state_to_path(&self.snapshot(), path)
    }

    /// Load a session directly from a file path.
    pub fn load_from_path<P: AsRef<Path>>(&mut self, path: P) -> std::io::Result<()> {
        let snapshot = load_state_from_path(path)?;
        self.restore(snapshot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::recipe::{DeductionRecipe, Outcome, OutcomePayload};
    use crate::rules::voice::VoiceDef;

    fn fixture() -> Session {
        let mut catalog = EvidenceCatalog::default();
        catalog.register(EvidenceDef::new("shard", "Glass Shard", "desc", "case1"));
        catalog.register(EvidenceDef::new("sample", "Factory Sample", "desc", "case1"));

        let mut registry = RecipeRegistry::default();
        registry.register(DeductionRecipe::new(
            "r_origin",
            "shard",
            "sample",
            Outcome {
                id: "h_origin".to_string(),
                label: "The glass came from the factory".to_string(),
                description: String::new(),
                tier: 1,
                payload: OutcomePayload::Hypothesis {
                    base_confidence: Some(60),
                },
            },
        ));

        let mut roster = VoiceRoster::default();
        roster.register(VoiceDef::new("logic", "Logic", "intellect"));

        Session::new(catalog, registry, roster)
    }

    #[test]
    fn evidence_flows_from_catalog_into_the_dossier() {
        let mut session = fixture();
        assert!(session.add_evidence("shard"));
        assert!(!session.add_evidence("shard"));
        assert!(!session.add_evidence("ghost"));
        assert!(session.dossier().has_evidence("shard"));
    }

    #[test]
    fn scripted_evidence_bypasses_the_catalog() {
        let mut session = fixture();
        let note = EvidenceDef::new("torn_note", "Torn Note", "desc", "event");
        assert!(session.add_evidence_item(note));
        assert!(session.dossier().has_evidence("torn_note"));
        assert!(!session.add_evidence_item(EvidenceDef::new(
            "torn_note",
            "Torn Note",
            "desc",
            "event"
        )));
    }

    #[test]
    fn combine_resolves_and_awards_xp() {
        let mut session = fixture();
        session.add_evidence("shard");
        session.add_evidence("sample");

        let result = session.combine("shard", "sample").expect("match");
        assert!(!result.is_blocked());
        assert_eq!(session.xp(), 15);
        // 60 base + 2 per held input.
        assert_eq!(session.hypothesis("h_origin").map(|h| h.confidence), Some(64));
    }

    #[test]
    fn snapshot_restores_into_a_fresh_session() {
        let mut session = fixture();
        session.add_evidence("shard");
        session.add_evidence("sample");
        session.set_voice_level("logic", 2);
        session.grant_thought_points(3);
        session.combine("shard", "sample");

        let snapshot = session.snapshot();

        let mut restored = fixture();
        restored.restore(snapshot);
        assert!(restored.dossier().is_solved("r_origin"));
        assert_eq!(restored.voice_level("logic"), 2);
        assert_eq!(restored.thought_points(), 3);
        assert_eq!(restored.xp(), 15);
        assert_eq!(
            restored.hypothesis("h_origin").map(|h| h.confidence),
            Some(64)
        );

        // The solved recipe stays solved after restore.
        assert!(restored.combine("shard", "sample").is_none());
    }
}

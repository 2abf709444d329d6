use std::collections::BTreeMap;

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::content::repository::RecipeRegistry;
use crate::simulation::dossier::Dossier;

/// Confidence gained per trigger-input evidence still held when recomputing.
const EVIDENCE_SUPPORT_BONUS: i64 = 2;

/// A scored narrative conclusion. Created the first time its owning recipe
/// resolves; never deleted during a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HypothesisState {
    pub source_recipe_id: String,
    pub outcome_id: String,
    pub label: String,
    pub description: String,
    pub base_confidence: i64,
    pub confidence: i64,
    pub voice_modifiers: BTreeMap<String, i64>,
    pub is_red_herring: bool,
    pub tier: u8,
}

/// Derived ledger of every hypothesis produced this session, keyed by outcome
/// id. Confidence is recomputed in full whenever evidence or modifiers change,
/// never served stale.
#[derive(Resource, Debug, Clone, Default)]
pub struct HypothesisLedger {
    hypotheses: BTreeMap<String, HypothesisState>,
}

impl HypothesisLedger {
    pub fn get(&self, outcome_id: &str) -> Option<&HypothesisState> {
        self.hypotheses.get(outcome_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &HypothesisState> {
        self.hypotheses.values()
    }

    pub fn len(&self) -> usize {
        self.hypotheses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hypotheses.is_empty()
    }

    /// Create or overwrite a hypothesis entry.
    pub fn insert(&mut self, state: HypothesisState) {
        self.hypotheses.insert(state.outcome_id.clone(), state);
    }

    pub fn replace_all(&mut self, hypotheses: BTreeMap<String, HypothesisState>) {
        self.hypotheses = hypotheses;
    }

    pub fn entries(&self) -> &BTreeMap<String, HypothesisState> {
        &self.hypotheses
    }

    /// Apply conflict pressure from one hypothesis onto the rivals its owning
    /// recipe declares. The modifier key is unique to the source, so repeated
    /// propagation from the same source overwrites instead of accumulating.
    pub fn propagate_conflict(
        &mut self,
        registry: &RecipeRegistry,
        source_outcome_id: &str,
        delta: i64,
    ) {
        let Some(source) = self.hypotheses.get(source_outcome_id) else {
            return;
        };
        let Some(source_recipe) = registry.get(&source.source_recipe_id) else {
            return;
        };
        if source_recipe.conflicts_with.is_empty() {
            return;
        }

        let impact = (delta.abs() + 1) / 2;
        let impact = impact.max(1);
        let signed = if delta >= 0 { -impact } else { impact };
        let key = format!("conflict:{}", source_outcome_id);
        let targets: Vec<String> = source_recipe
            .conflicts_with
            .iter()
            .cloned()
            .collect();

        for state in self.hypotheses.values_mut() {
            if state.outcome_id == source_outcome_id {
                continue;
            }
            if targets.iter().any(|target| *target == state.source_recipe_id) {
                state.voice_modifiers.insert(key.clone(), signed);
            }
        }
    }

    /// Full recompute of every confidence score from base, modifiers, and the
    /// evidence-support bonus for trigger inputs still held.
    pub fn recompute(&mut self, registry: &RecipeRegistry, dossier: &Dossier) {
        for state in self.hypotheses.values_mut() {
            let support = registry
                .get(&state.source_recipe_id)
                .map(|recipe| {
                    recipe
                        .inputs
                        .iter()
                        .filter(|input| dossier.has_evidence(input))
                        .count() as i64
                        * EVIDENCE_SUPPORT_BONUS
                })
                .unwrap_or(0);
            let modifiers: i64 = state.voice_modifiers.values().sum();
            state.confidence = clamp_confidence(state.base_confidence + modifiers + support);
        }
    }
}

pub fn clamp_confidence(value: i64) -> i64 {
    value.clamp(0, 100)
}

/// Bonus for a success-trigger voice reaction whose threshold is met.
pub fn success_bonus(level: i64, threshold: i64) -> i64 {
    (5 + 3 * (level - threshold)).clamp(5, 15)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::recipe::{DeductionRecipe, Outcome, OutcomePayload};

    fn hypothesis_recipe(recipe_id: &str, a: &str, b: &str, outcome_id: &str) -> DeductionRecipe {
        DeductionRecipe::new(
            recipe_id,
            a,
            b,
            Outcome {
                id: outcome_id.to_string(),
                label: "theory".to_string(),
                description: String::new(),
                tier: 1,
                payload: OutcomePayload::Hypothesis {
                    base_confidence: Some(50),
                },
            },
        )
    }

    fn state(recipe_id: &str, outcome_id: &str, base: i64) -> HypothesisState {
        HypothesisState {
            source_recipe_id: recipe_id.to_string(),
            outcome_id: outcome_id.to_string(),
            label: "theory".to_string(),
            description: String::new(),
            base_confidence: base,
            confidence: base,
            voice_modifiers: BTreeMap::new(),
            is_red_herring: false,
            tier: 1,
        }
    }

    #[test]
    fn success_bonus_clamps_to_range() {
        assert_eq!(success_bonus(1, 1), 5);
        assert_eq!(success_bonus(4, 1), 14);
        assert_eq!(success_bonus(10, 1), 15);
        assert_eq!(success_bonus(0, 3), 5);
    }

    #[test]
    fn recompute_adds_support_for_held_inputs() {
        let mut registry = RecipeRegistry::default();
        registry.register(hypothesis_recipe("r1", "a", "b", "h1"));

        let mut dossier = Dossier::default();
        dossier.add_evidence(crate::rules::evidence::EvidenceDef::new("a", "A", "", "t"), None);
        dossier.add_evidence(crate::rules::evidence::EvidenceDef::new("b", "B", "", "t"), None);

        let mut ledger = HypothesisLedger::default();
        ledger.insert(state("r1", "h1", 50));
        ledger.recompute(&registry, &dossier);
        assert_eq!(ledger.get("h1").unwrap().confidence, 54);

        dossier.remove_evidence(
            "a",
            crate::simulation::dossier::MutationKind::Destroyed,
            None,
        );
        ledger.recompute(&registry, &dossier);
        assert_eq!(ledger.get("h1").unwrap().confidence, 52);
    }

    #[test]
    fn conflict_overwrites_instead_of_accumulating() {
        let mut registry = RecipeRegistry::default();
        let mut strong = hypothesis_recipe("r_strong", "a", "b", "h_strong");
        strong.conflicts_with = vec!["r_weak".to_string()];
        registry.register(strong);
        registry.register(hypothesis_recipe("r_weak", "c", "d", "h_weak"));

        let mut ledger = HypothesisLedger::default();
        ledger.insert(state("r_strong", "h_strong", 70));
        ledger.insert(state("r_weak", "h_weak", 60));

        ledger.propagate_conflict(&registry, "h_strong", 14);
        let first = ledger
            .get("h_weak")
            .unwrap()
            .voice_modifiers
            .get("conflict:h_strong")
            .copied();
        assert_eq!(first, Some(-7));

        // A second propagation from the same source replaces the old value.
        ledger.propagate_conflict(&registry, "h_strong", 4);
        let second = ledger
            .get("h_weak")
            .unwrap()
            .voice_modifiers
            .get("conflict:h_strong")
            .copied();
        assert_eq!(second, Some(-2));
        assert_eq!(ledger.get("h_weak").unwrap().voice_modifiers.len(), 1);
    }

    #[test]
    fn minimum_impact_is_one_even_for_zero_delta() {
        let mut registry = RecipeRegistry::default();
        let mut strong = hypothesis_recipe("r_strong", "a", "b", "h_strong");
        strong.conflicts_with = vec!["r_weak".to_string()];
        registry.register(strong);
        registry.register(hypothesis_recipe("r_weak", "c", "d", "h_weak"));

        let mut ledger = HypothesisLedger::default();
        ledger.insert(state("r_strong", "h_strong", 70));
        ledger.insert(state("r_weak", "h_weak", 60));

        ledger.propagate_conflict(&registry, "h_strong", 0);
        assert_eq!(
            ledger
                .get("h_weak")
                .unwrap()
                .voice_modifiers
                .get("conflict:h_strong"),
            Some(&-1)
        );
    }

    #[test]
    fn negative_delta_pushes_rivals_up() {
        let mut registry = RecipeRegistry::default();
        let mut strong = hypothesis_recipe("r_strong", "a", "b", "h_strong");
        strong.conflicts_with = vec!["r_weak".to_string()];
        registry.register(strong);
        registry.register(hypothesis_recipe("r_weak", "c", "d", "h_weak"));

        let mut ledger = HypothesisLedger::default();
        ledger.insert(state("r_strong", "h_strong", 70));
        ledger.insert(state("r_weak", "h_weak", 60));

        ledger.propagate_conflict(&registry, "h_strong", -6);
        assert_eq!(
            ledger
                .get("h_weak")
                .unwrap()
                .voice_modifiers
                .get("conflict:h_strong"),
            Some(&3)
        );
    }

    #[test]
    fn confidence_stays_clamped() {
        let mut registry = RecipeRegistry::default();
        registry.register(hypothesis_recipe("r1", "a", "b", "h1"));

        let dossier = Dossier::default();
        let mut ledger = HypothesisLedger::default();
        let mut high = state("r1", "h1", 95);
        high.voice_modifiers.insert("voice:logic".to_string(), 40);
        ledger.insert(high);
        ledger.recompute(&registry, &dossier);
        assert_eq!(ledger.get("h1").unwrap().confidence, 100);

        let mut low = state("r1", "h1", 3);
        low.voice_modifiers.insert("conflict:x".to_string(), -40);
        ledger.insert(low);
        ledger.recompute(&registry, &dossier);
        assert_eq!(ledger.get("h1").unwrap().confidence, 0);
    }
}

use crate::content::repository::RecipeRegistry;
use crate::rules::recipe::{
    BranchCondition, DeductionRecipe, Outcome, OutcomeKind, OutcomePayload, ReactionTrigger,
    RecipeOutcome, VoiceGate,
};
use crate::simulation::dossier::{Dossier, MutationKind};
use crate::simulation::hypotheses::{success_bonus, HypothesisLedger, HypothesisState};
use crate::simulation::rewards::RewardSink;
use crate::simulation::voices::VoiceState;

/// Neutral prior for hypothesis content that slipped past validation without
/// a base confidence.
const FALLBACK_BASE_CONFIDENCE: i64 = 50;

/// Flavor line attributed to one voice, surfaced with a combine result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionLine {
    pub voice_id: String,
    pub text: String,
}

/// Result of a successful or blocked combination. A `None` from [`combine`]
/// means no recipe matched (or it was already solved) and nothing changed.
#[derive(Debug, Clone, PartialEq)]
pub enum CombineResult {
    Resolved {
        recipe_id: String,
        outcome_id: String,
        kind: OutcomeKind,
        label: String,
        description: String,
        /// Ledger confidence after resolution, for hypothesis outcomes only.
        confidence: Option<i64>,
        is_red_herring: bool,
        reactions: Vec<ReactionLine>,
    },
    Blocked {
        recipe_id: String,
        /// The failed gate, absent when every conditional branch failed.
        gate: Option<VoiceGate>,
        reactions: Vec<ReactionLine>,
    },
}

impl CombineResult {
    pub fn is_blocked(&self) -> bool {
        matches!(self, CombineResult::Blocked { .. })
    }
}

/// Resolve a combination of two held evidence ids against the recipe registry.
///
/// The call is atomic: all checks and branch selection happen before any
/// state is touched, so a `None` or `Blocked` return leaves the session
/// exactly as it was.
pub fn combine(
    registry: &RecipeRegistry,
    dossier: &mut Dossier,
    voices: &VoiceState,
    ledger: &mut HypothesisLedger,
    sink: &mut dyn RewardSink,
    id_a: &str,
    id_b: &str,
) -> Option<CombineResult> {
    if id_a == id_b {
        return None;
    }
    if !dossier.has_evidence(id_a) || !dossier.has_evidence(id_b) {
        return None;
    }

    let recipe = registry.find_by_pair(id_a, id_b)?;

    // Recipes fire at most once per session.
    if dossier.is_solved(&recipe.id) {
        return None;
    }

    if let Some(gate) = &recipe.required_gate {
        if voices.level(&gate.voice_id) < gate.min_level {
            return Some(CombineResult::Blocked {
                recipe_id: recipe.id.clone(),
                gate: Some(gate.clone()),
                reactions: collect_reactions(recipe, voices, ReactionTrigger::Locked),
            });
        }
    }

    let outcome = match select_outcome(recipe, voices) {
        Some(outcome) => outcome,
        None => {
            let reactions = collect_reactions(recipe, voices, ReactionTrigger::Fail);
            if reactions.is_empty() {
                return None;
            }
            return Some(CombineResult::Blocked {
                recipe_id: recipe.id.clone(),
                gate: None,
                reactions,
            });
        }
    };

    // Commit point: everything below mutates session state.
    apply_outcome(recipe, outcome, dossier, voices, ledger, sink);
    dossier.mark_solved(&recipe.id);
    sink.grant_xp(10 + 5 * u64::from(outcome.tier));
    ledger.recompute(registry, dossier);
    if matches!(outcome.payload, OutcomePayload::Hypothesis { .. }) {
        // Conflict pressure rides on the seeded bonus sum; a plain resolution
        // still pushes rivals by the minimum impact.
        let delta = seeded_bonus_sum(recipe, voices);
        ledger.propagate_conflict(registry, &outcome.id, delta);
        ledger.recompute(registry, dossier);
    }

    Some(CombineResult::Resolved {
        recipe_id: recipe.id.clone(),
        outcome_id: outcome.id.clone(),
        kind: outcome.kind(),
        label: outcome.label.clone(),
        description: outcome.description.clone(),
        confidence: ledger.get(&outcome.id).map(|state| state.confidence),
        is_red_herring: recipe.is_red_herring,
        reactions: collect_reactions(recipe, voices, ReactionTrigger::Success),
    })
}

/// Pick the outcome a recipe yields at the current voice levels: single
/// outcomes always apply, conditional lists evaluate top to bottom with the
/// first satisfied branch winning.
fn select_outcome<'a>(recipe: &'a DeductionRecipe, voices: &VoiceState) -> Option<&'a Outcome> {
    match &recipe.outcome {
        RecipeOutcome::Single(outcome) => Some(outcome),
        RecipeOutcome::Conditional(branches) => branches
            .iter()
            .find(|branch| match &branch.condition {
                BranchCondition::Default => true,
                BranchCondition::Gate(gate) => voices.level(&gate.voice_id) >= gate.min_level,
            })
            .map(|branch| &branch.outcome),
    }
}

fn apply_outcome(
    recipe: &DeductionRecipe,
    outcome: &Outcome,
    dossier: &mut Dossier,
    voices: &VoiceState,
    ledger: &mut HypothesisLedger,
    sink: &mut dyn RewardSink,
) {
    match &outcome.payload {
        OutcomePayload::AddFlag => {
            dossier.set_flag(&outcome.id, true);
            sink.set_flag(&outcome.id, true);
        }
        OutcomePayload::UnlockPoint => {
            dossier.discover_point(&outcome.id);
        }
        OutcomePayload::GrantEvidence { grants } => {
            dossier.add_evidence(grants.clone(), Some(&recipe.id));
        }
        OutcomePayload::UpgradeEvidence { removes, grants } => {
            for id in removes {
                dossier.remove_evidence(id, MutationKind::Destroyed, Some(&recipe.id));
            }
            dossier.add_upgraded_evidence(grants.clone(), Some(&recipe.id));
        }
        OutcomePayload::DestroyEvidence { removes } => {
            for id in removes {
                dossier.remove_evidence(id, MutationKind::Destroyed, Some(&recipe.id));
            }
        }
        OutcomePayload::Hypothesis { base_confidence } => {
            let base = base_confidence.unwrap_or(FALLBACK_BASE_CONFIDENCE);
            let mut state = HypothesisState {
                source_recipe_id: recipe.id.clone(),
                outcome_id: outcome.id.clone(),
                label: outcome.label.clone(),
                description: outcome.description.clone(),
                base_confidence: base,
                confidence: base,
                voice_modifiers: Default::default(),
                is_red_herring: recipe.is_red_herring,
                tier: outcome.tier,
            };
            for reaction in &recipe.voice_reactions {
                if reaction.trigger != ReactionTrigger::Success {
                    continue;
                }
                let level = voices.level(&reaction.voice_id);
                let threshold = reaction.threshold.unwrap_or(1);
                // An unmet success threshold stays silent: no bonus, no line.
                if level < threshold {
                    continue;
                }
                // Several success reactions may share one voice; their bonuses
                // accumulate under the shared key.
                *state
                    .voice_modifiers
                    .entry(format!("voice:{}", reaction.voice_id))
                    .or_insert(0) += success_bonus(level, threshold);
            }
            ledger.insert(state);
        }
        OutcomePayload::Narrative | OutcomePayload::Minigame => {}
    }
}

fn seeded_bonus_sum(recipe: &DeductionRecipe, voices: &VoiceState) -> i64 {
    recipe
        .voice_reactions
        .iter()
        .filter(|reaction| reaction.trigger == ReactionTrigger::Success)
        .filter_map(|reaction| {
            let level = voices.level(&reaction.voice_id);
            let threshold = reaction.threshold.unwrap_or(1);
            (level >= threshold).then(|| success_bonus(level, threshold))
        })
        .sum()
}

fn collect_reactions(
    recipe: &DeductionRecipe,
    voices: &VoiceState,
    trigger: ReactionTrigger,
) -> Vec<ReactionLine> {
    recipe
        .voice_reactions
        .iter()
        .filter(|reaction| reaction.trigger == trigger)
        .filter(|reaction| reaction.fires_at(voices.level(&reaction.voice_id)))
        .map(|reaction| ReactionLine {
            voice_id: reaction.voice_id.clone(),
            text: reaction.text.clone(),
        })
        .collect()
}

use crate::content::repository::{EvidenceCatalog, RecipeRegistry, VoiceRoster};
use crate::rules::recipe::{DeductionRecipe, ReactionTrigger};
use crate::rules::voice::DEFAULT_VOICE;
use crate::simulation::dossier::Dossier;
use crate::simulation::voices::VoiceState;

/// Advisory pointer toward one unsolved recipe, voiced by the strongest
/// relevant member of the parliament.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    pub recipe_id: String,
    pub voice_id: String,
    pub text: String,
    pub partner_evidence_id: String,
}

/// Spend one thought point for a hint about the given evidence. Fails closed,
/// without spending, when the resource is empty, the evidence is not held, or
/// no unsolved recipe consumes it.
pub fn request_hint(
    registry: &RecipeRegistry,
    catalog: &EvidenceCatalog,
    roster: &VoiceRoster,
    dossier: &mut Dossier,
    voices: &VoiceState,
    evidence_id: &str,
) -> Option<Hint> {
    if dossier.thought_points == 0 {
        return None;
    }
    if !dossier.has_evidence(evidence_id) {
        return None;
    }

    // First unsolved recipe in registration order that consumes this evidence.
    let recipe = registry.iter().find(|recipe| {
        !dossier.is_solved(&recipe.id) && recipe.inputs.iter().any(|input| input == evidence_id)
    })?;

    let voice_id = pick_voice(recipe, roster, voices);
    let partner = partner_input(recipe, evidence_id);
    let text = reaction_text(recipe, voices, &voice_id)
        .unwrap_or_else(|| generic_hint(catalog, dossier, &partner));

    dossier.thought_points -= 1;

    Some(Hint {
        recipe_id: recipe.id.clone(),
        voice_id,
        text,
        partner_evidence_id: partner,
    })
}

/// Strongest voice relevant to the recipe; roster order breaks level ties and
/// `logic` stands in when the recipe declares no voices at all.
fn pick_voice(recipe: &DeductionRecipe, roster: &VoiceRoster, voices: &VoiceState) -> String {
    let candidates = recipe.relevant_voice_ids();
    if candidates.is_empty() {
        return DEFAULT_VOICE.to_string();
    }
    let mut ranked: Vec<&str> = candidates;
    ranked.sort_by_key(|id| {
        (
            -voices.level(id),
            roster.position(id).unwrap_or(usize::MAX),
        )
    });
    ranked[0].to_string()
}

fn partner_input(recipe: &DeductionRecipe, evidence_id: &str) -> String {
    if recipe.inputs[0] == evidence_id {
        recipe.inputs[1].clone()
    } else {
        recipe.inputs[0].clone()
    }
}

/// First attempt- or success-trigger reaction for the chosen voice whose
/// threshold the player currently meets.
fn reaction_text(recipe: &DeductionRecipe, voices: &VoiceState, voice_id: &str) -> Option<String> {
    recipe
        .voice_reactions
        .iter()
        .filter(|reaction| {
            matches!(
                reaction.trigger,
                ReactionTrigger::Attempt | ReactionTrigger::Success
            )
        })
        .filter(|reaction| reaction.voice_id == voice_id)
        .find(|reaction| reaction.fires_at(voices.level(voice_id)))
        .map(|reaction| reaction.text.clone())
}

fn generic_hint(catalog: &EvidenceCatalog, dossier: &Dossier, partner_id: &str) -> String {
    let partner_name = catalog
        .get(partner_id)
        .map(|def| def.name.as_str())
        .or_else(|| dossier.evidence(partner_id).map(|def| def.name.as_str()))
        .unwrap_or(partner_id);
    format!("This feels connected to {}.", partner_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::evidence::EvidenceDef;
    use crate::rules::recipe::{Outcome, OutcomePayload, VoiceGate, VoiceReaction};
    use crate::rules::voice::VoiceDef;

    fn evidence(id: &str, name: &str) -> EvidenceDef {
        EvidenceDef::new(id, name, "desc", "test")
    }

    fn flag_recipe(id: &str, a: &str, b: &str) -> DeductionRecipe {
        DeductionRecipe::new(
            id,
            a,
            b,
            Outcome {
                id: format!("{}_flag", id),
                label: String::new(),
                description: String::new(),
                tier: 0,
                payload: OutcomePayload::AddFlag,
            },
        )
    }

    fn fixture() -> (RecipeRegistry, EvidenceCatalog, VoiceRoster) {
        let mut registry = RecipeRegistry::default();
        registry.register(flag_recipe("r1", "shard", "sample"));

        let mut catalog = EvidenceCatalog::default();
        catalog.register(evidence("shard", "Glass Shard"));
        catalog.register(evidence("sample", "Factory Sample"));

        let mut roster = VoiceRoster::default();
        roster.register(VoiceDef::new("logic", "Logic", "intellect"));
        roster.register(VoiceDef::new("forensics", "Forensics", "physical"));
        (registry, catalog, roster)
    }

    #[test]
    fn exhausted_thought_points_fail_closed() {
        let (registry, catalog, roster) = fixture();
        let mut dossier = Dossier::default();
        dossier.add_evidence(evidence("shard", "Glass Shard"), None);
        let voices = VoiceState::default();

        let hint = request_hint(&registry, &catalog, &roster, &mut dossier, &voices, "shard");
        assert!(hint.is_none());
        assert_eq!(dossier.thought_points, 0);
    }

    #[test]
    fn unheld_evidence_does_not_spend() {
        let (registry, catalog, roster) = fixture();
        let mut dossier = Dossier::default();
        dossier.thought_points = 2;
        let voices = VoiceState::default();

        assert!(request_hint(&registry, &catalog, &roster, &mut dossier, &voices, "shard").is_none());
        assert_eq!(dossier.thought_points, 2);
    }

    #[test]
    fn solved_recipes_are_skipped() {
        let (registry, catalog, roster) = fixture();
        let mut dossier = Dossier::default();
        dossier.thought_points = 1;
        dossier.add_evidence(evidence("shard", "Glass Shard"), None);
        dossier.mark_solved("r1");
        let voices = VoiceState::default();

        assert!(request_hint(&registry, &catalog, &roster, &mut dossier, &voices, "shard").is_none());
        assert_eq!(dossier.thought_points, 1);
    }

    #[test]
    fn generic_hint_names_the_partner_and_spends_one_point() {
        let (registry, catalog, roster) = fixture();
        let mut dossier = Dossier::default();
        dossier.thought_points = 2;
        dossier.add_evidence(evidence("shard", "Glass Shard"), None);
        let voices = VoiceState::default();

        let hint = request_hint(&registry, &catalog, &roster, &mut dossier, &voices, "shard")
            .expect("hint should be produced");
        assert_eq!(hint.recipe_id, "r1");
        assert_eq!(hint.voice_id, "logic");
        assert_eq!(hint.partner_evidence_id, "sample");
        assert!(hint.text.contains("Factory Sample"));
        assert_eq!(dossier.thought_points, 1);
    }

    #[test]
    fn strongest_relevant_voice_speaks() {
        let (_, catalog, roster) = fixture();
        let mut recipe = flag_recipe("r1", "shard", "sample");
        recipe.required_gate = Some(VoiceGate::new("logic", 2));
        recipe.voice_reactions.push(VoiceReaction {
            voice_id: "forensics".to_string(),
            trigger: ReactionTrigger::Attempt,
            threshold: Some(2),
            text: "Compare the refraction indices.".to_string(),
        });
        let mut registry = RecipeRegistry::default();
        registry.register(recipe);

        let mut dossier = Dossier::default();
        dossier.thought_points = 1;
        dossier.add_evidence(evidence("shard", "Glass Shard"), None);
        let mut voices = VoiceState::default();
        voices.set_level("forensics", 4);
        voices.set_level("logic", 1);

        let hint = request_hint(&registry, &catalog, &roster, &mut dossier, &voices, "shard")
            .expect("hint should be produced");
        assert_eq!(hint.voice_id, "forensics");
        assert_eq!(hint.text, "Compare the refraction indices.");
    }

    #[test]
    fn unmet_reaction_threshold_falls_back_to_template() {
        let (_, catalog, roster) = fixture();
        let mut recipe = flag_recipe("r1", "shard", "sample");
        recipe.voice_reactions.push(VoiceReaction {
            voice_id: "forensics".to_string(),
            trigger: ReactionTrigger::Attempt,
            threshold: Some(5),
            text: "Too advanced for now.".to_string(),
        });
        let mut registry = RecipeRegistry::default();
        registry.register(recipe);

        let mut dossier = Dossier::default();
        dossier.thought_points = 1;
        dossier.add_evidence(evidence("shard", "Glass Shard"), None);
        let mut voices = VoiceState::default();
        voices.set_level("forensics", 2);

        let hint = request_hint(&registry, &catalog, &roster, &mut dossier, &voices, "shard")
            .expect("hint should be produced");
        assert_eq!(hint.voice_id, "forensics");
        assert!(hint.text.contains("Factory Sample"));
    }
}

pub mod evidence;
pub mod recipe;
pub mod voice;

pub use evidence::EvidenceDef;
pub use recipe::{
    normalize_pair, recipe_outcome_from_json, BranchCondition, ConditionalOutcome, DeductionRecipe,
    Outcome, OutcomeKind, OutcomePayload, ParseEnumError, ReactionTrigger, RecipeDataError,
    RecipeOutcome, VoiceGate, VoiceReaction,
};
pub use voice::{VoiceDef, DEFAULT_VOICE};

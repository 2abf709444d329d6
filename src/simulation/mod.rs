pub mod dossier;
pub mod hypotheses;
pub mod rewards;
pub mod voices;

pub use dossier::{Dossier, EvidenceMutation, MutationKind, PointState};
pub use hypotheses::{clamp_confidence, success_bonus, HypothesisLedger, HypothesisState};
pub use rewards::{RewardLog, RewardSink};
pub use voices::VoiceState;

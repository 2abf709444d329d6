// Re-export core modules for use by the binary or other consumers
pub mod content;
pub mod core;
pub mod rules;
pub mod simulation;
pub mod systems;

// Expose the main Session wrapper and types needed for interaction
pub use crate::core::serialization::SessionSnapshot;
pub use crate::core::session::Session;
pub use crate::systems::deduction::{CombineResult, ReactionLine};
pub use crate::systems::hints::Hint;

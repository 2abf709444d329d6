pub mod deduction;
pub mod hints;

pub use deduction::{combine, CombineResult, ReactionLine};
pub use hints::{request_hint, Hint};

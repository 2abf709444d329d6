pub mod repository;
pub mod schema;
pub mod sqlite;
pub mod validation;

pub use repository::{ContentRepository, ContentStats, EvidenceCatalog, RecipeRegistry, VoiceRoster};
pub use sqlite::SqliteContentRepository;
pub use validation::{validate_content, IssueSeverity, ValidationIssue, ValidationReport};

/// Expected layout version of the content database.
pub const CONTENT_SCHEMA_VERSION: i64 = 1;

/// Expected content export version stamped by the authoring pipeline.
pub const CONTENT_VERSION: &str = "case_pack_v1";

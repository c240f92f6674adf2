pub const DEFAULT_GENERATED_SUFFIX: &str = "Generated";
pub const DEFAULT_COLLECTION_SUFFIX: &str = "Collection";
pub const DEFAULT_STARTER_OBJECT_SUFFIX: &str = "";
pub const DEFAULT_GENERATED_DIR: &str = "generated";
pub const DEFAULT_STARTER_DIR: &str = "concrete";
pub const DEFAULT_RUNTIME_PATH: &str = "dbclassgen::runtime";
pub const DEFAULT_RUST_LOG: &str = "info";
pub const DEFAULT_ID_TO_TABLE_REGEX: &str = "^(.+)_id$";
pub const DEFAULT_JOIN_TABLE_REGEX: &str = "^(.+)2(.+)$";
pub const DEFAULT_STRIP_FIELD_PREFIXES: &[&str] = &["default_", "primary_"];
pub const ENV_PREFIX: &str = "DBCLASSGEN";

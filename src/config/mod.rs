pub mod loader;
pub mod schema;

pub use loader::{
    discover, load_from_path, load_from_str, ConfigError, CONFIG_ENV_VAR, CONFIG_FILE_NAME,
};
pub use schema::{
    GeneratorConfig, PromptConfig, SessionConfig, SpliceConfig, ValidationError, ValidationIssue,
};

pub mod loader;
pub mod schema;

pub use loader::{apply_overrides, load_config, load_config_from_str, load_from_env};
pub use schema::{BlockfrostConfig, Config, InferenceConfig, ServerConfig};

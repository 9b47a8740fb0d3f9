pub mod manifest;
pub mod mask;
pub mod registry;
pub mod validation;

pub use manifest::{load_manifest, PluginManifest, PluginManifestEntry};
pub use mask::mask_value;
pub use registry::{PluginRegistry, PluginUpdate, RegistryError};
pub use validation::{
    resolve_config_mutation_rejections, validate_plugin_config, PluginValidation,
    ValidationRequest, BLOCKED_CONFIG_KEYS,
};

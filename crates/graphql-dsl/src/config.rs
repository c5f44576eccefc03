//! Schema build configuration.
//!
//! Configuration can be built in code or loaded from a `[schema]` TOML section.
//!
//! # Example Configuration
//!
//! ```toml
//! [schema]
//! convert_streams_to_publisher = true
//! max_depth = 15
//! max_complexity = 500
//! introspection = true
//! validate_names = true
//! ```

use serde::{Deserialize, Serialize};

/// Options applied once, when a schema is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Adapt stream results of subscription fields to publishers.
    /// When disabled, a subscription field returning a raw stream fails
    /// unless the caller adapts it with its own execution strategy.
    /// Default: true
    #[serde(default = "default_convert_streams")]
    pub convert_streams_to_publisher: bool,

    /// Maximum query depth accepted by the built schema.
    /// Default: unlimited
    #[serde(default)]
    pub max_depth: Option<usize>,

    /// Maximum query complexity accepted by the built schema.
    /// Default: unlimited
    #[serde(default)]
    pub max_complexity: Option<usize>,

    /// Allow introspection queries against the built schema.
    /// Default: true
    #[serde(default = "default_introspection")]
    pub introspection: bool,

    /// Reject type, field and argument names outside GraphQL name syntax.
    /// Default: true
    #[serde(default = "default_validate_names")]
    pub validate_names: bool,
}

fn default_convert_streams() -> bool {
    true
}

fn default_introspection() -> bool {
    true
}

fn default_validate_names() -> bool {
    true
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            convert_streams_to_publisher: default_convert_streams(),
            max_depth: None,
            max_complexity: None,
            introspection: default_introspection(),
            validate_names: default_validate_names(),
        }
    }
}

impl SchemaConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration values are invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_depth == Some(0) {
            return Err("schema.max_depth must be > 0".into());
        }
        if self.max_complexity == Some(0) {
            return Err("schema.max_complexity must be > 0".into());
        }
        Ok(())
    }
}

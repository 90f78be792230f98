use super::BackdropConfig;

/// Generates a JSON Schema for the Backdrop configuration.
#[must_use]
pub fn generate_schema() -> schemars::Schema { schemars::schema_for!(BackdropConfig) }

/// Generates a pretty-printed JSON Schema string for the configuration.
#[must_use]
pub fn generate_schema_json() -> String {
    serde_json::to_string_pretty(&generate_schema()).unwrap_or_default()
}

//! Configuration template generation.

use std::fs;
use std::path::Path;

/// Generates a configuration template with every option commented out at
/// its default value.
#[must_use]
pub fn generate_config_template() -> String {
    r#"// Backdrop Configuration File
// ============================
// This file uses JSONC format (JSON with comments).
// All options below are commented out and show their default values.
// Uncomment and modify the options you want to configure.

{
  // ============================================================================
  // Schedule
  // ============================================================================
  // "scheduler": {
  //   // Initial cadence: "hourly", "daily" or "weekly".
  //   // Changing it at runtime (`backdrop interval`) takes precedence.
  //   "interval": "daily",
  //
  //   // "production" or "mock" (minutes instead of hours/days/weeks)
  //   "profile": "production",
  //
  //   // Seconds to wait before the first wallpaper change after launch
  //   "settleDelaySecs": 3
  // },

  // ============================================================================
  // Access Keys
  // ============================================================================
  // "credentials": {
  //   // Candidate keys, tried in order when the active key stops working
  //   "keys": [],
  //
  //   // Path to a .env file with BACKDROP_ACCESS_KEY* entries
  //   "keysFile": ""
  // },

  // ============================================================================
  // Connectivity
  // ============================================================================
  // "connectivity": {
  //   "probeHost": "api.unsplash.com:443",
  //   "probeIntervalSecs": 5,
  //   "debounceMs": 2000,
  //   "probeTimeoutMs": 3000
  // },

  // ============================================================================
  // Photo API
  // ============================================================================
  // "provider": {
  //   "apiBase": "https://api.unsplash.com",
  //   "query": "mountains",
  //   "orientation": "landscape"
  // },

  // ============================================================================
  // Sleep Detection
  // ============================================================================
  // "wake": {
  //   "pollIntervalSecs": 5,
  //   "jumpThresholdSecs": 30
  // }
}
"#
    .to_string()
}

/// Creates a configuration file with the template at the specified path.
///
/// Creates parent directories if they don't exist.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn create_config_file(path: &Path) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, generate_config_template())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackdropConfig;

    #[test]
    fn test_generate_config_template_parses_to_defaults() {
        let template = generate_config_template();
        let stripped = json_comments::StripComments::new(template.as_bytes());

        let config: BackdropConfig = serde_json::from_reader(stripped).unwrap();

        assert_eq!(config, BackdropConfig::default());
    }

    #[test]
    fn test_generate_config_template_contains_all_sections() {
        let template = generate_config_template();
        for section in ["scheduler", "credentials", "connectivity", "provider", "wake"] {
            assert!(template.contains(&format!("\"{section}\"")), "missing {section}");
        }
    }

    #[test]
    fn test_create_config_file_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.jsonc");

        create_config_file(&path).unwrap();

        assert!(path.exists());
    }
}

//! Default configuration values

use super::types::Config;

/// Default configuration file name (YAML)
pub const DEFAULT_CONFIG_YAML: &str = "shipshots.yaml";

/// Default configuration file name (TOML)
pub const DEFAULT_CONFIG_TOML: &str = "shipshots.toml";

/// Alternative configuration file name
pub const ALT_CONFIG_FILE: &str = ".shipshots.yaml";

/// Get list of config file names to search for
pub fn config_file_names() -> Vec<&'static str> {
    vec![
        DEFAULT_CONFIG_YAML,
        DEFAULT_CONFIG_TOML,
        ALT_CONFIG_FILE,
        ".shipshots.toml",
    ]
}

/// Generate default configuration YAML
pub fn default_config_yaml() -> String {
    let config = Config::default();
    serde_yaml::to_string(&config).unwrap_or_else(|_| DEFAULT_CONFIG_TEMPLATE.to_string())
}

/// Default configuration template
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# shipshots configuration

app:
  identifier: com.example.app
  platform: ios

screenshots:
  path: ./screenshots
  overwrite: false
  skip: false
  ignore_language_directory_validation: false
  edit_live: false

connect:
  timeout_secs: 30
"#;

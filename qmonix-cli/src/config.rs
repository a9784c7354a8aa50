//! Session file loading and parsing

use anyhow::{Context, Result};
use qmonix_tracker::DispatcherConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A scripted tracker session (loaded from session.toml)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// One action performed against the tracker
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Fire { tag: String },
    Volume { tag: String, volume: i64 },
    Start { tag: String },
    Pause { tag: String },
    Resume { tag: String },
    Stop { tag: String },
    Dispatch,
    Clear,
    Wait { seconds: u64 },
}

/// Load a session from a TOML file
pub fn load_config(path: &Path) -> Result<SessionConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read session file: {:?}", path))?;

    let config: SessionConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse session file: {:?}", path))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            [dispatcher]
            kind = "http"
            endpoint = "http://demo.qmonix.com/event/"

            [[steps]]
            action = "start"
            tag = "checkout"

            [[steps]]
            action = "volume"
            tag = "purchase"
            volume = 3

            [[steps]]
            action = "wait"
            seconds = 2

            [[steps]]
            action = "dispatch"
        "#;

        let config: SessionConfig = toml::from_str(toml_content).unwrap();
        assert!(matches!(config.dispatcher, DispatcherConfig::Http { timeout_ms: 30_000, .. }));
        assert_eq!(config.steps.len(), 4);
        assert_eq!(
            config.steps[1],
            Step::Volume {
                tag: "purchase".to_string(),
                volume: 3
            }
        );
        assert_eq!(config.steps[3], Step::Dispatch);
    }

    #[test]
    fn test_dispatcher_defaults_to_log() {
        let config: SessionConfig = toml::from_str("").unwrap();
        assert!(matches!(config.dispatcher, DispatcherConfig::Log { .. }));
        assert!(config.steps.is_empty());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[[steps]]\naction = \"fire\"\ntag = \"app/start\"").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(
            config.steps,
            vec![Step::Fire {
                tag: "app/start".to_string()
            }]
        );
    }

    #[test]
    fn test_load_config_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[[steps]]\naction = \"explode\"").unwrap();

        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse session file"));
    }
}

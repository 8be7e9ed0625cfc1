//! Optional on-disk configuration (`--config FILE`), read as JSON.
//!
//! Command-line flags still win where both are given: `import_paths`
//! here are prepended to any `-I` flags (so a config's roots are
//! searched first), and `max_parallelism` only applies when the CLI
//! left the flag at its `0` ("unset") default.

use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProjectConfig {
    #[serde(default)]
    pub import_paths: Vec<PathBuf>,
    #[serde(default)]
    pub max_parallelism: Option<usize>,
}

impl ProjectConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| format!("reading \"{}\": {err}", path.display()))?;
        serde_json::from_str(&text).map_err(|err| format!("parsing \"{}\": {err}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_import_paths_and_parallelism() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("protocompile.json");
        std::fs::write(
            &config_path,
            r#"{"import_paths": ["vendor/proto", "proto"], "max_parallelism": 4}"#,
        )
        .unwrap();

        let config = ProjectConfig::load(&config_path).unwrap();
        assert_eq!(config.import_paths, vec![PathBuf::from("vendor/proto"), PathBuf::from("proto")]);
        assert_eq!(config.max_parallelism, Some(4));
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("protocompile.json");
        std::fs::write(&config_path, r#"{}"#).unwrap();

        let config = ProjectConfig::load(&config_path).unwrap();
        assert!(config.import_paths.is_empty());
        assert_eq!(config.max_parallelism, None);
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = ProjectConfig::load(Path::new("/nonexistent/protocompile.json"));
        assert!(result.is_err());
    }
}

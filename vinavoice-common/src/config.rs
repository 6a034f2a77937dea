//! Configuration file resolution and TOML loading

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "VINAVOICE_CONFIG";

/// File name looked up inside the platform configuration directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

const APP_DIR_NAME: &str = "vinavoice";

/// Configuration file resolution, priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. Platform configuration directory
/// 4. None (caller falls back to built-in defaults)
///
/// An explicitly named file (1 or 2) that does not exist is an error;
/// a missing platform file is not.
pub fn resolve_config_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
) -> Result<Option<PathBuf>> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return require_existing(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return require_existing(PathBuf::from(path));
        }
    }

    // Priority 3: Platform configuration directory
    Ok(platform_config_candidates()
        .into_iter()
        .find(|candidate| candidate.exists()))
}

fn require_existing(path: PathBuf) -> Result<Option<PathBuf>> {
    if path.exists() {
        Ok(Some(path))
    } else {
        Err(Error::Config(format!(
            "Config file not found: {}",
            path.display()
        )))
    }
}

/// Platform-specific configuration file candidates, most specific first
fn platform_config_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME));
    }

    if cfg!(target_os = "linux") {
        candidates.push(PathBuf::from("/etc").join(APP_DIR_NAME).join(CONFIG_FILE_NAME));
    }

    candidates
}

/// Read and deserialize a TOML configuration file
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    let value = toml::from_str(&content)?;
    debug!("Loaded configuration from {}", path.display());
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TEST_ENV_VAR: &str = "VINAVOICE_CONFIG_UNIT_TEST";

    #[derive(Debug, Deserialize)]
    struct Sample {
        sample_rate: u32,
        #[serde(default)]
        name: Option<String>,
    }

    #[test]
    #[serial]
    fn test_cli_argument_wins_over_env() {
        let cli_file = NamedTempFile::new().unwrap();
        let env_file = NamedTempFile::new().unwrap();
        std::env::set_var(TEST_ENV_VAR, env_file.path());

        let resolved = resolve_config_path(Some(cli_file.path()), TEST_ENV_VAR).unwrap();
        assert_eq!(resolved.as_deref(), Some(cli_file.path()));

        std::env::remove_var(TEST_ENV_VAR);
    }

    #[test]
    #[serial]
    fn test_env_var_used_without_cli_argument() {
        let env_file = NamedTempFile::new().unwrap();
        std::env::set_var(TEST_ENV_VAR, env_file.path());

        let resolved = resolve_config_path(None, TEST_ENV_VAR).unwrap();
        assert_eq!(resolved.as_deref(), Some(env_file.path()));

        std::env::remove_var(TEST_ENV_VAR);
    }

    #[test]
    #[serial]
    fn test_missing_explicit_file_is_error() {
        std::env::remove_var(TEST_ENV_VAR);
        let result = resolve_config_path(Some(Path::new("/nonexistent/vinavoice.toml")), TEST_ENV_VAR);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample_rate = 24000\nname = \"kore\"").unwrap();

        let sample: Sample = load_toml(file.path()).unwrap();
        assert_eq!(sample.sample_rate, 24000);
        assert_eq!(sample.name.as_deref(), Some("kore"));
    }

    #[test]
    fn test_load_toml_rejects_malformed_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample_rate = = 1").unwrap();

        let result: Result<Sample> = load_toml(file.path());
        assert!(matches!(result, Err(Error::Toml(_))));
    }
}

//! Configuration for wisdomreel.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (WISDOMREEL_HOME, WISDOMREEL_ENDPOINT,
//!    WISDOMREEL_COMPANION_COMMAND)
//! 2. Config file (.wisdomreel/config.yaml)
//! 3. Defaults (~/.wisdomreel, companion on 127.0.0.1:8189)
//!
//! Config file discovery:
//! - Searches current directory and parents for .wisdomreel/config.yaml
//! - Paths in config file are relative to the project root (the parent of
//!   .wisdomreel/), except `paths.home` which is relative to .wisdomreel/

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8189";
const DEFAULT_COMPANION_COMMAND: &str = "wisdomreel-video-server";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub generator: Option<GeneratorConfig>,
    #[serde(default)]
    pub companion: Option<CompanionConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to .wisdomreel/)
    pub home: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneratorConfig {
    pub endpoint: Option<String>,
    pub client_timeout_seconds: Option<u64>,
    pub deadline_seconds: Option<u64>,
    pub max_attempts: Option<u32>,
    pub retry_base_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanionConfig {
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    pub working_dir: Option<String>,
    pub log_file: Option<String>,
    pub startup_timeout_seconds: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub probe_timeout_ms: Option<u64>,
}

/// Settings for talking to the companion service
#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    /// Base URL of the companion service
    pub endpoint: String,
    /// Per-request HTTP timeout
    pub client_timeout: Duration,
    /// Outer deadline over the whole attempt sequence
    pub deadline: Duration,
    /// Attempts per generate call (including the first)
    pub max_attempts: u32,
    /// Linear backoff unit between attempts
    pub retry_base_delay: Duration,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            client_timeout: Duration::from_secs(300), // 5 min
            deadline: Duration::from_secs(480),       // 8 min
            max_attempts: 2,
            retry_base_delay: Duration::from_millis(2000),
        }
    }
}

/// Settings for launching the companion process
#[derive(Debug, Clone)]
pub struct CompanionSettings {
    pub command: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    /// Where the child's stdout/stderr go (discarded when unset)
    pub log_file: Option<PathBuf>,
    pub startup_timeout: Duration,
    pub poll_interval: Duration,
    pub probe_timeout: Duration,
}

impl Default for CompanionSettings {
    fn default() -> Self {
        Self {
            command: DEFAULT_COMPANION_COMMAND.to_string(),
            args: Vec::new(),
            working_dir: None,
            log_file: None,
            startup_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_millis(500),
            probe_timeout: Duration::from_millis(500),
        }
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to wisdomreel home (state, logs)
    pub home: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub generator: GeneratorSettings,
    pub companion: CompanionSettings,
}

impl ResolvedConfig {
    /// Reject settings the orchestrator cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.generator.max_attempts == 0 {
            anyhow::bail!("generator.max_attempts must be at least 1");
        }
        if self.generator.endpoint.trim().is_empty() {
            anyhow::bail!("generator.endpoint cannot be empty");
        }
        if self.companion.command.trim().is_empty() {
            anyhow::bail!("companion.command cannot be empty");
        }
        if self.generator.deadline <= self.generator.client_timeout {
            tracing::warn!(
                deadline_secs = self.generator.deadline.as_secs(),
                client_timeout_secs = self.generator.client_timeout.as_secs(),
                "Outer deadline does not exceed the per-request timeout; retries may never run"
            );
        }
        Ok(())
    }
}

/// Find config file by searching `start` and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(".wisdomreel").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to a base directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Merge a parsed config file over the defaults.
///
/// `config_path` is the location of config.yaml; relative paths in the
/// file are resolved against it. Environment variables are not consulted.
fn resolve_file(config: &ConfigFile, config_path: &Path, default_home: PathBuf) -> ResolvedConfig {
    // .wisdomreel/ and its parent, the project root
    let dot_dir = config_path.parent().unwrap_or(Path::new("."));
    let base_dir = dot_dir.parent().unwrap_or(Path::new("."));

    let home = config
        .paths
        .home
        .as_deref()
        .map(|h| resolve_path(dot_dir, h))
        .unwrap_or(default_home);

    let file_gen = config.generator.clone().unwrap_or_default();
    let defaults = GeneratorSettings::default();
    let generator = GeneratorSettings {
        endpoint: file_gen.endpoint.unwrap_or(defaults.endpoint),
        client_timeout: file_gen
            .client_timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(defaults.client_timeout),
        deadline: file_gen
            .deadline_seconds
            .map(Duration::from_secs)
            .unwrap_or(defaults.deadline),
        max_attempts: file_gen.max_attempts.unwrap_or(defaults.max_attempts),
        retry_base_delay: file_gen
            .retry_base_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry_base_delay),
    };

    let comp = config.companion.clone().unwrap_or_default();
    let defaults = CompanionSettings::default();
    let companion = CompanionSettings {
        command: comp.command.unwrap_or(defaults.command),
        args: comp.args,
        working_dir: comp.working_dir.as_deref().map(|p| resolve_path(base_dir, p)),
        log_file: comp
            .log_file
            .as_deref()
            .map(|p| resolve_path(base_dir, p))
            .or_else(|| Some(home.join("logs").join("companion.log"))),
        startup_timeout: comp
            .startup_timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(defaults.startup_timeout),
        poll_interval: comp
            .poll_interval_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.poll_interval),
        probe_timeout: comp
            .probe_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.probe_timeout),
    };

    ResolvedConfig {
        home,
        config_file: Some(config_path.to_path_buf()),
        generator,
        companion,
    }
}

/// Configuration used when no config file exists
fn default_config(home: PathBuf) -> ResolvedConfig {
    let companion = CompanionSettings {
        log_file: Some(home.join("logs").join("companion.log")),
        ..Default::default()
    };

    ResolvedConfig {
        home,
        config_file: None,
        generator: GeneratorSettings::default(),
        companion,
    }
}

/// Environment variables win over the file and defaults
fn apply_env_overrides(config: &mut ResolvedConfig, var: impl Fn(&str) -> Option<String>) {
    if let Some(env_home) = var("WISDOMREEL_HOME") {
        let home = PathBuf::from(env_home);
        // Keep a defaulted log file next to the overridden home
        if config.companion.log_file == Some(config.home.join("logs").join("companion.log")) {
            config.companion.log_file = Some(home.join("logs").join("companion.log"));
        }
        config.home = home;
    }
    if let Some(endpoint) = var("WISDOMREEL_ENDPOINT") {
        config.generator.endpoint = endpoint;
    }
    if let Some(command) = var("WISDOMREEL_COMPANION_COMMAND") {
        config.companion.command = command;
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".wisdomreel");

    let cwd = std::env::current_dir().context("Failed to determine current directory")?;

    let mut config = match find_config_file(&cwd) {
        Some(config_path) => {
            let file = load_config_file(&config_path)?;
            resolve_file(&file, &config_path, default_home)
        }
        None => default_config(default_home),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config.validate()?;

    Ok(config)
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_config(temp: &TempDir, yaml: &str) -> PathBuf {
        let dot_dir = temp.path().join(".wisdomreel");
        std::fs::create_dir_all(&dot_dir).unwrap();

        let config_path = dot_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "{}", yaml).unwrap();
        config_path
    }

    #[test]
    fn test_defaults_match_generation_profile() {
        let config = default_config(PathBuf::from("/test/.wisdomreel"));

        assert_eq!(config.generator.endpoint, "http://127.0.0.1:8189");
        assert_eq!(config.generator.client_timeout, Duration::from_secs(300));
        assert_eq!(config.generator.deadline, Duration::from_secs(480));
        assert_eq!(config.generator.max_attempts, 2);
        assert_eq!(config.generator.retry_base_delay, Duration::from_secs(2));
        assert_eq!(
            config.companion.log_file,
            Some(PathBuf::from("/test/.wisdomreel/logs/companion.log"))
        );
        assert!(config.config_file.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let config_path = write_config(
            &temp,
            r#"
version: "1.0"
generator:
  endpoint: http://127.0.0.1:9000
  client_timeout_seconds: 60
  deadline_seconds: 90
  max_attempts: 3
  retry_base_delay_ms: 250
companion:
  command: python3
  args: ["server.py", "--port", "9000"]
  startup_timeout_seconds: 30
"#,
        );

        let file = load_config_file(&config_path).unwrap();
        assert_eq!(file.version, "1.0");

        let config = resolve_file(&file, &config_path, PathBuf::from("/default/home"));
        assert_eq!(config.home, PathBuf::from("/default/home"));
        assert_eq!(config.generator.endpoint, "http://127.0.0.1:9000");
        assert_eq!(config.generator.client_timeout, Duration::from_secs(60));
        assert_eq!(config.generator.deadline, Duration::from_secs(90));
        assert_eq!(config.generator.max_attempts, 3);
        assert_eq!(config.generator.retry_base_delay, Duration::from_millis(250));
        assert_eq!(config.companion.command, "python3");
        assert_eq!(config.companion.args, vec!["server.py", "--port", "9000"]);
        assert_eq!(config.companion.startup_timeout, Duration::from_secs(30));
        // Unset values keep their defaults
        assert_eq!(config.companion.poll_interval, Duration::from_millis(500));
        assert_eq!(config.config_file, Some(config_path));
    }

    #[test]
    fn test_companion_paths_relative_to_project_root() {
        let temp = TempDir::new().unwrap();
        let config_path = write_config(
            &temp,
            r#"
version: "1.0"
companion:
  working_dir: video-server
  log_file: /var/log/companion.log
"#,
        );

        let file = load_config_file(&config_path).unwrap();
        let config = resolve_file(&file, &config_path, PathBuf::from("/default/home"));

        assert_eq!(
            config.companion.working_dir,
            Some(temp.path().join("video-server"))
        );
        assert_eq!(
            config.companion.log_file,
            Some(PathBuf::from("/var/log/companion.log"))
        );
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut config = default_config(PathBuf::from("/test/.wisdomreel"));
        config.generator.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "./subdir"),
            PathBuf::from("/home/user/project/subdir")
        );
        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
    }

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: Vec<(String, String)> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| {
            vars.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        }
    }

    #[test]
    fn test_env_overrides_file_values() {
        let temp = TempDir::new().unwrap();
        let config_path = write_config(
            &temp,
            r#"
version: "1.0"
paths:
  home: /from/file
generator:
  endpoint: http://127.0.0.1:9000
  max_attempts: 3
companion:
  command: python3
"#,
        );

        let file = load_config_file(&config_path).unwrap();
        let mut config = resolve_file(&file, &config_path, PathBuf::from("/default/home"));
        apply_env_overrides(
            &mut config,
            env(&[
                ("WISDOMREEL_HOME", "/elsewhere"),
                ("WISDOMREEL_ENDPOINT", "http://127.0.0.1:9999"),
                ("WISDOMREEL_COMPANION_COMMAND", "/opt/video/server"),
            ]),
        );

        assert_eq!(config.home, PathBuf::from("/elsewhere"));
        assert_eq!(config.generator.endpoint, "http://127.0.0.1:9999");
        assert_eq!(config.companion.command, "/opt/video/server");
        // Not overridable from the environment
        assert_eq!(config.generator.max_attempts, 3);
    }

    #[test]
    fn test_no_env_keeps_file_values() {
        let mut config = default_config(PathBuf::from("/test/.wisdomreel"));
        apply_env_overrides(&mut config, env(&[]));

        assert_eq!(config.home, PathBuf::from("/test/.wisdomreel"));
        assert_eq!(config.generator.endpoint, "http://127.0.0.1:8189");
        assert_eq!(
            config.companion.log_file,
            Some(PathBuf::from("/test/.wisdomreel/logs/companion.log"))
        );
    }

    #[test]
    fn test_default_log_file_follows_env_home() {
        let mut config = default_config(PathBuf::from("/test/.wisdomreel"));
        apply_env_overrides(&mut config, env(&[("WISDOMREEL_HOME", "/elsewhere")]));

        assert_eq!(config.home, PathBuf::from("/elsewhere"));
        assert_eq!(
            config.companion.log_file,
            Some(PathBuf::from("/elsewhere/logs/companion.log"))
        );
    }

    #[test]
    fn test_configured_log_file_ignores_env_home() {
        let temp = TempDir::new().unwrap();
        let config_path = write_config(
            &temp,
            r#"
version: "1.0"
companion:
  log_file: /var/log/companion.log
"#,
        );

        let file = load_config_file(&config_path).unwrap();
        let mut config = resolve_file(&file, &config_path, PathBuf::from("/default/home"));
        apply_env_overrides(&mut config, env(&[("WISDOMREEL_HOME", "/elsewhere")]));

        assert_eq!(config.home, PathBuf::from("/elsewhere"));
        assert_eq!(
            config.companion.log_file,
            Some(PathBuf::from("/var/log/companion.log"))
        );
    }

    #[test]
    fn test_find_config_file_from_nested_dir() {
        let temp = TempDir::new().unwrap();
        let config_path = write_config(&temp, "version: \"1.0\"");

        let nested = temp.path().join("content").join("quotes");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_config_file(&nested), Some(config_path));
    }

    #[test]
    fn test_find_config_file_missing() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        // Ancestors of a fresh temp dir may still hold a config; only
        // assert that nothing inside the temp tree is returned
        if let Some(found) = find_config_file(&nested) {
            assert!(!found.starts_with(temp.path()));
        }
    }
}

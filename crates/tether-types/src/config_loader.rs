//! Hierarchical configuration loading with multiple sources merged in priority order.
//!
//! The priority chain (later overrides earlier):
//! 1. Built-in defaults ([`TetherConfig::default()`])
//! 2. User-level: `~/.tether/config.toml`
//! 3. Workspace-level: `./.tether/config.toml`
//! 4. `TETHER_*` environment variables
//! 5. CLI flags (applied by the caller on the returned config)
//!
//! Each field in the final [`EffectiveConfig`] is annotated with the
//! [`ConfigSource`] that determined its value.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::{TetherConfig, CONFIG_FILENAME};
use crate::TetherError;

/// Maximum config file size in bytes.
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Where a configuration value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Built-in default from `TetherConfig::default()`.
    BuiltinDefault,
    /// User-level config file (e.g., `~/.tether/config.toml`).
    UserFile(PathBuf),
    /// Workspace-level config file (e.g., `./.tether/config.toml`).
    WorkspaceFile(PathBuf),
    /// Environment variable.
    EnvVar(String),
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::BuiltinDefault => write!(f, "built-in default"),
            ConfigSource::UserFile(p) => write!(f, "user file: {}", p.display()),
            ConfigSource::WorkspaceFile(p) => write!(f, "workspace file: {}", p.display()),
            ConfigSource::EnvVar(name) => write!(f, "env var: {name}"),
        }
    }
}

/// The merged config plus provenance information for each field.
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    /// The merged configuration.
    pub config: TetherConfig,
    /// Dotted field path -> the source that determined its value.
    pub sources: HashMap<String, ConfigSource>,
    /// All config files that were found and loaded (in priority order).
    pub source_files: Vec<PathBuf>,
}

impl EffectiveConfig {
    /// Source of a dotted field path, falling back to the closest parent.
    pub fn source_of(&self, path: &str) -> &ConfigSource {
        let mut key = path;
        loop {
            if let Some(source) = self.sources.get(key) {
                return source;
            }
            match key.rsplit_once('.') {
                Some((parent, _)) => key = parent,
                None => return &ConfigSource::BuiltinDefault,
            }
        }
    }
}

/// Hierarchical configuration loader.
pub struct ConfigLoader {
    user_config_path: Option<PathBuf>,
    workspace_config_path: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new loader with default paths.
    pub fn new() -> Self {
        Self {
            user_config_path: None,
            workspace_config_path: None,
        }
    }

    /// Override the user config file path.
    #[must_use]
    pub fn with_user_path(mut self, path: PathBuf) -> Self {
        self.user_config_path = Some(path);
        self
    }

    /// Override the workspace config file path.
    #[must_use]
    pub fn with_workspace_path(mut self, path: PathBuf) -> Self {
        self.workspace_config_path = Some(path);
        self
    }

    fn user_path(&self) -> PathBuf {
        self.user_config_path.clone().unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
            PathBuf::from(home).join(".tether").join(CONFIG_FILENAME)
        })
    }

    fn workspace_path(&self) -> PathBuf {
        self.workspace_config_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(".tether").join(CONFIG_FILENAME))
    }

    /// Load and merge configuration from all sources.
    pub fn load(&self) -> Result<EffectiveConfig, TetherError> {
        let mut sources = HashMap::new();
        let mut source_files = Vec::new();

        let default_config = TetherConfig::default();
        let mut merged = toml::Value::try_from(&default_config)
            .map_err(|e| TetherError::ConfigError(format!("failed to serialize defaults: {e}")))?;

        if let toml::Value::Table(ref table) = merged {
            for key in table.keys() {
                sources.insert(key.clone(), ConfigSource::BuiltinDefault);
            }
        }

        let user_path = self.user_path();
        if user_path.exists() {
            let layer = read_layer(&user_path, "user")?;
            deep_merge(&mut merged, &layer);
            record_sources(&layer, &mut sources, ConfigSource::UserFile(user_path.clone()));
            source_files.push(user_path);
        }

        let workspace_path = self.workspace_path();
        if workspace_path.exists() {
            let layer = read_layer(&workspace_path, "workspace")?;
            deep_merge(&mut merged, &layer);
            record_sources(
                &layer,
                &mut sources,
                ConfigSource::WorkspaceFile(workspace_path.clone()),
            );
            source_files.push(workspace_path);
        }

        apply_env_overrides(&mut merged, &mut sources)?;

        let config: TetherConfig = merged
            .try_into()
            .map_err(|e| TetherError::ConfigError(format!("failed to parse merged config: {e}")))?;

        validate_config(&config)?;

        tracing::debug!(files = source_files.len(), "configuration loaded");

        Ok(EffectiveConfig {
            config,
            sources,
            source_files,
        })
    }
}

fn read_layer(path: &Path, label: &str) -> Result<toml::Value, TetherError> {
    let content = read_config_file(path)?;
    toml::from_str(&content)
        .map_err(|e| TetherError::ConfigError(format!("invalid {label} config: {e}")))
}

/// Read a config file with a size limit and a null-byte check.
fn read_config_file(path: &Path) -> Result<String, TetherError> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        TetherError::ConfigError(format!("cannot read config file {}: {e}", path.display()))
    })?;

    if metadata.len() > MAX_CONFIG_FILE_SIZE {
        return Err(TetherError::ConfigError(format!(
            "config file {} exceeds maximum size of {} bytes (actual: {} bytes)",
            path.display(),
            MAX_CONFIG_FILE_SIZE,
            metadata.len()
        )));
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        TetherError::ConfigError(format!("cannot read config file {}: {e}", path.display()))
    })?;

    if content.contains('\0') {
        return Err(TetherError::ConfigError(format!(
            "config file {} contains null bytes",
            path.display()
        )));
    }

    Ok(content)
}

/// Deep-merge `overlay` into `base`. Tables merge field-by-field; arrays and
/// scalars are replaced.
fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge(base_val, overlay_val);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                }
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}

fn record_sources(
    layer: &toml::Value,
    sources: &mut HashMap<String, ConfigSource>,
    source: ConfigSource,
) {
    if let toml::Value::Table(table) = layer {
        for (key, value) in table {
            sources.insert(key.clone(), source.clone());
            record_nested_sources(value, sources, &source, key);
        }
    }
}

fn record_nested_sources(
    value: &toml::Value,
    sources: &mut HashMap<String, ConfigSource>,
    source: &ConfigSource,
    prefix: &str,
) {
    if let toml::Value::Table(table) = value {
        for (key, val) in table {
            let path = format!("{prefix}.{key}");
            sources.insert(path.clone(), source.clone());
            record_nested_sources(val, sources, source, &path);
        }
    }
}

/// Shape of the value an environment variable carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvKind {
    Bool,
    Integer,
    Text,
}

/// Known environment variable mapping.
pub struct EnvMapping {
    /// Environment variable name.
    pub env_var: &'static str,
    /// Dot-separated TOML path segments.
    pub toml_path: &'static [&'static str],
    pub kind: EnvKind,
}

/// All supported `TETHER_*` environment variables (double underscore = nesting).
pub const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        env_var: "TETHER_DEBUG",
        toml_path: &["debug"],
        kind: EnvKind::Bool,
    },
    EnvMapping {
        env_var: "TETHER_TELEGRAM__BOT_TOKEN",
        toml_path: &["telegram", "bot_token"],
        kind: EnvKind::Text,
    },
    EnvMapping {
        env_var: "TETHER_TELEGRAM__CHAT_ID",
        toml_path: &["telegram", "chat_id"],
        kind: EnvKind::Integer,
    },
    EnvMapping {
        env_var: "TETHER_TELEGRAM__ENABLED",
        toml_path: &["telegram", "enabled"],
        kind: EnvKind::Bool,
    },
    EnvMapping {
        env_var: "TETHER_TELEGRAM__API_BASE",
        toml_path: &["telegram", "api_base"],
        kind: EnvKind::Text,
    },
    EnvMapping {
        env_var: "TETHER_NOTIFY__QUESTION",
        toml_path: &["notify", "question"],
        kind: EnvKind::Bool,
    },
    EnvMapping {
        env_var: "TETHER_NOTIFY__LOOP_COMPLETE",
        toml_path: &["notify", "loop_complete"],
        kind: EnvKind::Bool,
    },
    EnvMapping {
        env_var: "TETHER_NOTIFY__ERROR",
        toml_path: &["notify", "error"],
        kind: EnvKind::Bool,
    },
    EnvMapping {
        env_var: "TETHER_NOTIFY__CIRCUIT_BREAKER",
        toml_path: &["notify", "circuit_breaker"],
        kind: EnvKind::Bool,
    },
    EnvMapping {
        env_var: "TETHER_NOTIFY__RATE_LIMIT",
        toml_path: &["notify", "rate_limit"],
        kind: EnvKind::Bool,
    },
    EnvMapping {
        env_var: "TETHER_NOTIFY__QUESTION_TIMEOUT",
        toml_path: &["notify", "question_timeout_minutes"],
        kind: EnvKind::Integer,
    },
    EnvMapping {
        env_var: "TETHER_QUIET_HOURS__ENABLED",
        toml_path: &["quiet_hours", "enabled"],
        kind: EnvKind::Bool,
    },
    EnvMapping {
        env_var: "TETHER_QUIET_HOURS__START",
        toml_path: &["quiet_hours", "start"],
        kind: EnvKind::Text,
    },
    EnvMapping {
        env_var: "TETHER_QUIET_HOURS__END",
        toml_path: &["quiet_hours", "end"],
        kind: EnvKind::Text,
    },
];

fn apply_env_overrides(
    merged: &mut toml::Value,
    sources: &mut HashMap<String, ConfigSource>,
) -> Result<(), TetherError> {
    for mapping in ENV_MAPPINGS {
        if let Ok(raw_value) = std::env::var(mapping.env_var) {
            validate_env_value(mapping.env_var, &raw_value)?;

            let toml_val = env_value_to_toml(mapping, raw_value.trim())?;
            set_nested_value(merged, mapping.toml_path, toml_val);

            sources.insert(
                mapping.toml_path.join("."),
                ConfigSource::EnvVar(mapping.env_var.to_string()),
            );
        }
    }
    Ok(())
}

fn validate_env_value(var_name: &str, value: &str) -> Result<(), TetherError> {
    if value.contains('\0') {
        return Err(TetherError::ConfigError(format!(
            "environment variable {var_name} contains null bytes"
        )));
    }
    for ch in value.chars() {
        if ch.is_control() && ch != '\t' && ch != '\n' && ch != '\r' {
            return Err(TetherError::ConfigError(format!(
                "environment variable {var_name} contains control character U+{:04X}",
                ch as u32
            )));
        }
    }
    Ok(())
}

fn env_value_to_toml(mapping: &EnvMapping, raw: &str) -> Result<toml::Value, TetherError> {
    match mapping.kind {
        EnvKind::Bool => match raw.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(toml::Value::Boolean(true)),
            "0" | "false" | "no" | "off" | "" => Ok(toml::Value::Boolean(false)),
            _ => Err(TetherError::ConfigError(format!(
                "environment variable {} must be a boolean, got {raw:?}",
                mapping.env_var
            ))),
        },
        EnvKind::Integer => {
            let num: i64 = raw.parse().map_err(|e| {
                TetherError::ConfigError(format!(
                    "environment variable {} must be numeric: {e}",
                    mapping.env_var
                ))
            })?;
            Ok(toml::Value::Integer(num))
        }
        EnvKind::Text => Ok(toml::Value::String(raw.to_string())),
    }
}

/// Set a value at a nested path, creating intermediate tables as needed.
fn set_nested_value(root: &mut toml::Value, path: &[&str], value: toml::Value) {
    if path.is_empty() {
        return;
    }
    if path.len() == 1 {
        if let toml::Value::Table(table) = root {
            table.insert(path[0].to_string(), value);
        }
        return;
    }
    if let toml::Value::Table(table) = root {
        let entry = table
            .entry(path[0].to_string())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
        set_nested_value(entry, &path[1..], value);
    }
}

fn validate_config(config: &TetherConfig) -> Result<(), TetherError> {
    let tg = &config.telegram;
    if tg.poll_interval_secs == 0 || tg.poll_interval_secs > 50 {
        return Err(TetherError::ConfigError(format!(
            "telegram.poll_interval_secs must be between 1 and 50 (got {})",
            tg.poll_interval_secs
        )));
    }
    if !tg.api_base.starts_with("http://") && !tg.api_base.starts_with("https://") {
        return Err(TetherError::ConfigError(format!(
            "telegram.api_base must be an http(s) URL (got {:?})",
            tg.api_base
        )));
    }
    if config.notify.question_timeout_minutes == 0 {
        return Err(TetherError::ConfigError(
            "notify.question_timeout_minutes must be at least 1".into(),
        ));
    }

    let qh = &config.quiet_hours;
    if qh.enabled {
        for (field, value, minute) in [
            ("quiet_hours.start", &qh.start, qh.start_minute()),
            ("quiet_hours.end", &qh.end, qh.end_minute()),
        ] {
            if minute.is_none() {
                return Err(TetherError::ConfigError(format!(
                    "{field} must be HH:MM (got {value:?})"
                )));
            }
        }
    }

    let paths = &config.paths;
    validate_path("paths.state_dir", &paths.state_dir)?;
    validate_path("paths.status_file", &paths.status_file)?;
    validate_path("paths.circuit_breaker_file", &paths.circuit_breaker_file)?;
    validate_path("paths.session_file", &paths.session_file)?;
    validate_path("paths.log_file", &paths.log_file)?;

    Ok(())
}

fn validate_path(field: &str, path: &Path) -> Result<(), TetherError> {
    let path_str = path.to_string_lossy();
    if path_str.is_empty() {
        return Err(TetherError::ConfigError(format!("{field}: path is empty")));
    }
    if path_str.contains('\0') {
        return Err(TetherError::ConfigError(format!(
            "{field}: path contains null bytes"
        )));
    }
    if path_str.len() > 4096 {
        return Err(TetherError::ConfigError(format!(
            "{field}: path exceeds maximum length of 4096 characters"
        )));
    }
    Ok(())
}

/// Mask a sensitive value for display: the first 4 characters followed by
/// `***`, or just `***` for short values.
pub fn mask_sensitive(value: &str) -> String {
    if value.chars().count() < 4 {
        "***".to_string()
    } else {
        let prefix: String = value.chars().take(4).collect();
        format!("{prefix}***")
    }
}

/// Check if a field name refers to a sensitive value.
pub fn is_sensitive_field(field_name: &str) -> bool {
    let lower = field_name.to_lowercase();
    lower.contains("token") || lower.contains("secret") || lower.contains("password")
}

/// Flatten a config into dot-separated key/value pairs, masking secrets.
pub fn flatten_config(config: &TetherConfig) -> Result<Vec<(String, String)>, TetherError> {
    let value = toml::Value::try_from(config)
        .map_err(|e| TetherError::ConfigError(format!("failed to serialize config: {e}")))?;
    let mut out = Vec::new();
    flatten_toml(&value, "", &mut out);
    Ok(out)
}

fn flatten_toml(value: &toml::Value, prefix: &str, out: &mut Vec<(String, String)>) {
    match value {
        toml::Value::Table(table) => {
            for (key, val) in table {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_toml(val, &path, out);
            }
        }
        toml::Value::String(s) if is_sensitive_field(prefix) => {
            out.push((prefix.to_string(), mask_sensitive(s)));
        }
        toml::Value::String(s) => out.push((prefix.to_string(), s.clone())),
        other => out.push((prefix.to_string(), other.to_string())),
    }
}

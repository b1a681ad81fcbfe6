//! Service configuration via `eventsync.toml`
//!
//! Every field has a default, so an empty file is a valid configuration. On
//! first start the binary writes a commented template; edit it and restart.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use eventsync_concurrency::LedgerConfig;
use eventsync_core::{Error, Limits, ProjectId, Result, UserId, MAX_TITLE_CHARS};
use eventsync_storage::DEFAULT_HISTORY_DEPTH;

use crate::hub::HubConfig;

/// Config file name looked up by default.
pub const CONFIG_FILE_NAME: &str = "eventsync.toml";

/// Version store settings (`[store]`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreSection {
    /// Prior versions retained per event for the history endpoint.
    #[serde(default = "default_history_depth")]
    pub history_depth: usize,
}

fn default_history_depth() -> usize {
    DEFAULT_HISTORY_DEPTH
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            history_depth: default_history_depth(),
        }
    }
}

/// Idempotency ledger settings (`[idempotency]`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdempotencySection {
    /// How long a committed request id answers replays (default: 24h).
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
    /// How long a duplicate waits for an in-flight original (default: 2000ms).
    #[serde(default = "default_pending_wait_ms")]
    pub pending_wait_ms: u64,
    /// Interval of the expired-record sweep (default: 60s).
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_retention_secs() -> u64 {
    24 * 60 * 60
}

fn default_pending_wait_ms() -> u64 {
    2000
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl Default for IdempotencySection {
    fn default() -> Self {
        Self {
            retention_secs: default_retention_secs(),
            pending_wait_ms: default_pending_wait_ms(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Notification hub settings (`[hub]`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HubSection {
    /// Per-connection outbound queue length; overflow drops the connection.
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
    /// Live sockets allowed per project.
    #[serde(default = "default_max_subscribers")]
    pub max_subscribers_per_project: usize,
}

fn default_outbound_queue() -> usize {
    64
}

fn default_max_subscribers() -> usize {
    256
}

impl Default for HubSection {
    fn default() -> Self {
        Self {
            outbound_queue: default_outbound_queue(),
            max_subscribers_per_project: default_max_subscribers(),
        }
    }
}

/// Input limits (`[limits]`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LimitsSection {
    /// Maximum title length in characters.
    #[serde(default = "default_max_title_chars")]
    pub max_title_chars: usize,
}

fn default_max_title_chars() -> usize {
    MAX_TITLE_CHARS
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            max_title_chars: default_max_title_chars(),
        }
    }
}

/// A provisioned user and its session token (`[[users]]`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserEntry {
    /// User name
    pub id: String,
    /// Session token presented in the `Authorization` header
    pub token: String,
}

/// A project and its members (`[[projects]]`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectEntry {
    /// Project id
    pub id: u64,
    /// Member user names
    #[serde(default)]
    pub members: Vec<String>,
}

/// Service configuration loaded from `eventsync.toml`.
///
/// # Example
///
/// ```toml
/// bind = "127.0.0.1:8080"
///
/// [[users]]
/// id = "alice"
/// token = "alice-dev-token"
///
/// [[projects]]
/// id = 1
/// members = ["alice"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventsyncConfig {
    /// Listen address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Log filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Version store settings.
    #[serde(default)]
    pub store: StoreSection,
    /// Idempotency ledger settings.
    #[serde(default)]
    pub idempotency: IdempotencySection,
    /// Notification hub settings.
    #[serde(default)]
    pub hub: HubSection,
    /// Input limits.
    #[serde(default)]
    pub limits: LimitsSection,
    /// Provisioned users.
    #[serde(default)]
    pub users: Vec<UserEntry>,
    /// Projects and memberships.
    #[serde(default)]
    pub projects: Vec<ProjectEntry>,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for EventsyncConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            log_level: default_log_level(),
            store: StoreSection::default(),
            idempotency: IdempotencySection::default(),
            hub: HubSection::default(),
            limits: LimitsSection::default(),
            users: Vec::new(),
            projects: Vec::new(),
        }
    }
}

impl EventsyncConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# eventsync configuration

# Listen address
bind = "127.0.0.1:8080"

# Log filter used when RUST_LOG is unset
log_level = "info"

[store]
# Prior versions kept per event for GET .../history
history_depth = 16

[idempotency]
# How long a create's request_id answers replays
retention_secs = 86400
# How long a duplicate waits for the in-flight original
pending_wait_ms = 2000
# How often expired request ids are swept
sweep_interval_secs = 60

[hub]
# Outbound queue per socket; a socket that falls this far behind is dropped
outbound_queue = 64
max_subscribers_per_project = 256

[limits]
max_title_chars = 200

# Users and their session tokens
# [[users]]
# id = "alice"
# token = "change-me"

# Projects and their members
# [[projects]]
# id = 1
# members = ["alice"]
"#
    }

    /// Parse and validate config from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EventsyncConfig = toml::from_str(content)
            .map_err(|e| Error::internal(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate config from a file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::internal(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Error::Internal(msg) => Error::internal(format!("{} ({})", msg, path.display())),
            other => other,
        })
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::internal(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Check cross-field consistency.
    ///
    /// Tokens and user ids must be unique and every project member must be a
    /// provisioned user.
    pub fn validate(&self) -> Result<()> {
        if self.hub.outbound_queue == 0 {
            return Err(Error::invalid_input("hub.outbound_queue", "must be > 0"));
        }
        if self.hub.max_subscribers_per_project == 0 {
            return Err(Error::invalid_input(
                "hub.max_subscribers_per_project",
                "must be > 0",
            ));
        }
        if self.limits.max_title_chars == 0 {
            return Err(Error::invalid_input("limits.max_title_chars", "must be > 0"));
        }
        if self.idempotency.sweep_interval_secs == 0 {
            return Err(Error::invalid_input(
                "idempotency.sweep_interval_secs",
                "must be > 0",
            ));
        }

        let mut user_ids = HashSet::new();
        let mut tokens = HashSet::new();
        for user in &self.users {
            if user.token.trim().is_empty() {
                return Err(Error::invalid_input(
                    "users.token",
                    format!("user '{}' has an empty token", user.id),
                ));
            }
            if !user_ids.insert(user.id.as_str()) {
                return Err(Error::invalid_input(
                    "users.id",
                    format!("duplicate user '{}'", user.id),
                ));
            }
            if !tokens.insert(user.token.as_str()) {
                return Err(Error::invalid_input(
                    "users.token",
                    format!("token of user '{}' is already in use", user.id),
                ));
            }
        }

        let mut project_ids = HashSet::new();
        for project in &self.projects {
            if !project_ids.insert(project.id) {
                return Err(Error::invalid_input(
                    "projects.id",
                    format!("duplicate project {}", project.id),
                ));
            }
            if let Some(unknown) = project
                .members
                .iter()
                .find(|m| !user_ids.contains(m.as_str()))
            {
                return Err(Error::invalid_input(
                    "projects.members",
                    format!("project {} lists unknown user '{}'", project.id, unknown),
                ));
            }
        }
        Ok(())
    }

    /// Ledger settings.
    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            retention: Duration::from_secs(self.idempotency.retention_secs),
            pending_wait: Duration::from_millis(self.idempotency.pending_wait_ms),
        }
    }

    /// Hub settings.
    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            outbound_queue: self.hub.outbound_queue,
            max_subscribers_per_project: self.hub.max_subscribers_per_project,
        }
    }

    /// Input limits.
    pub fn limits(&self) -> Limits {
        Limits {
            max_title_chars: self.limits.max_title_chars,
        }
    }

    /// Interval of the ledger sweep.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.idempotency.sweep_interval_secs)
    }

    /// Provisioned `(token, user)` pairs.
    pub fn sessions(&self) -> impl Iterator<Item = (String, UserId)> + '_ {
        self.users
            .iter()
            .map(|u| (u.token.clone(), UserId::new(u.id.clone())))
    }

    /// Provisioned `(project, members)` pairs.
    pub fn memberships(&self) -> impl Iterator<Item = (ProjectId, Vec<UserId>)> + '_ {
        self.projects.iter().map(|p| {
            (
                ProjectId::new(p.id),
                p.members.iter().cloned().map(UserId::new).collect(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_file_uses_defaults() {
        let config = EventsyncConfig::from_toml_str("").unwrap();
        assert_eq!(config, EventsyncConfig::default());
        assert_eq!(config.ledger_config(), LedgerConfig::default());
        assert_eq!(config.limits(), Limits::default());
    }

    #[test]
    fn default_toml_parses_correctly() {
        let config = EventsyncConfig::from_toml_str(EventsyncConfig::default_toml()).unwrap();
        assert_eq!(config.bind, "127.0.0.1:8080");
        assert_eq!(config.hub.outbound_queue, 64);
        assert_eq!(config.store.history_depth, 16);
    }

    #[test]
    fn parses_users_and_projects() {
        let config = EventsyncConfig::from_toml_str(
            r#"
            [[users]]
            id = "alice"
            token = "t-alice"

            [[users]]
            id = "bob"
            token = "t-bob"

            [[projects]]
            id = 1
            members = ["alice", "bob"]
            "#,
        )
        .unwrap();
        let sessions: Vec<_> = config.sessions().collect();
        assert_eq!(sessions[0], ("t-alice".to_string(), UserId::new("alice")));
        let memberships: Vec<_> = config.memberships().collect();
        assert_eq!(memberships[0].0, ProjectId::new(1));
        assert_eq!(memberships[0].1.len(), 2);
    }

    #[test]
    fn rejects_unknown_member() {
        let err = EventsyncConfig::from_toml_str(
            r#"
            [[projects]]
            id = 1
            members = ["ghost"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput { ref field, .. } if field == "projects.members"));
    }

    #[test]
    fn rejects_shared_token() {
        let err = EventsyncConfig::from_toml_str(
            r#"
            [[users]]
            id = "alice"
            token = "same"

            [[users]]
            id = "bob"
            token = "same"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput { ref field, .. } if field == "users.token"));
    }

    #[test]
    fn rejects_zero_queue() {
        let err = EventsyncConfig::from_toml_str("[hub]\noutbound_queue = 0\n").unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }

    #[test]
    fn malformed_toml_is_internal_error() {
        let err = EventsyncConfig::from_toml_str("bind = [").unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn write_default_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        assert!(!path.exists());

        EventsyncConfig::write_default_if_missing(&path).unwrap();
        let config = EventsyncConfig::from_file(&path).unwrap();
        assert_eq!(config.idempotency.retention_secs, 86400);
    }

    #[test]
    fn write_default_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "bind = \"0.0.0.0:9000\"\n").unwrap();

        EventsyncConfig::write_default_if_missing(&path).unwrap();

        let config = EventsyncConfig::from_file(&path).unwrap();
        assert_eq!(config.bind, "0.0.0.0:9000");
    }

    #[test]
    fn missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let err = EventsyncConfig::from_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}

//! OKR Tracker
//!
//! Strategic-planning backend with:
//! - Six-level hierarchy (Project → Initiative → Goal → Objective →
//!   Key Result → Action Item) stored in Neo4j
//! - Bottom-up progress roll-up with per-key-result manual override locks
//! - Cascading soft-delete/restore with audit stamps
//! - Role- and assignment-based project access scoping

pub mod access;
pub mod api;
pub mod auth;
pub mod hierarchy;
pub mod neo4j;

#[cfg(test)]
pub(crate) mod test_helpers;

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: ServerYamlConfig,
    pub neo4j: Neo4jYamlConfig,
    /// Auth section — if absent, auth_config will be None (deny-by-default)
    pub auth: Option<AuthConfig>,
}

/// Server configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerYamlConfig {
    pub port: u16,
}

impl Default for ServerYamlConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

/// Neo4j configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Neo4jYamlConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
}

impl Default for Neo4jYamlConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".into(),
            user: "neo4j".into(),
            password: "okr-tracker123".into(),
        }
    }
}

/// Authentication configuration.
///
/// Tokens are issued by an external identity provider; this service only
/// verifies the HS256 signature and consumes the email claim.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// JWT signing secret (HS256, minimum 32 characters)
    pub jwt_secret: String,
    /// JWT token lifetime in seconds for locally issued tokens
    /// (default: 28800 = 8h)
    #[serde(default = "default_jwt_expiry")]
    pub jwt_expiry_secs: u64,
    /// Optional domain restriction (e.g. "example.com")
    pub allowed_email_domain: Option<String>,
}

fn default_jwt_expiry() -> u64 {
    28800 // 8 hours
}

// ============================================================================
// Runtime config (what the application actually uses)
// ============================================================================

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,
    pub server_port: u16,
    /// Auth config — None means deny-by-default (no auth section in YAML)
    pub auth_config: Option<AuthConfig>,
}

impl Config {
    /// Load configuration from environment variables only.
    /// Equivalent to from_yaml_and_env(None).
    pub fn from_env() -> Result<Self> {
        Self::from_yaml_and_env(None)
    }

    /// Load configuration from an optional YAML file, then override with
    /// env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries "config.yaml" in CWD. If the file
    /// doesn't exist, falls back to pure env var / defaults.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        let yaml = Self::load_yaml(yaml_path);

        Ok(Self {
            neo4j_uri: std::env::var("NEO4J_URI").unwrap_or(yaml.neo4j.uri),
            neo4j_user: std::env::var("NEO4J_USER").unwrap_or(yaml.neo4j.user),
            neo4j_password: std::env::var("NEO4J_PASSWORD").unwrap_or(yaml.neo4j.password),
            server_port: std::env::var("SERVER_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(yaml.server.port),
            auth_config: yaml.auth,
        })
    }

    /// Try to load and parse a YAML config file. Returns defaults on any
    /// failure.
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new("config.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    YamlConfig::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                YamlConfig::default()
            }
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn neo4j::HierarchyStore>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state with the store connected
    pub async fn new(config: Config) -> Result<Self> {
        let store = Arc::new(
            neo4j::Neo4jClient::new(
                &config.neo4j_uri,
                &config.neo4j_user,
                &config.neo4j_password,
            )
            .await?,
        );

        Ok(Self {
            store,
            config: Arc::new(config),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod config_tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_yaml_config_loading() {
        let yaml = r#"
server:
  port: 9090

neo4j:
  uri: bolt://db:7687
  user: admin
  password: secret

auth:
  jwt_secret: "super-secret-key-min-32-characters!"
  jwt_expiry_secs: 3600
  allowed_email_domain: "example.com"
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.neo4j.uri, "bolt://db:7687");
        assert_eq!(config.neo4j.user, "admin");

        let auth = config.auth.unwrap();
        assert_eq!(auth.jwt_expiry_secs, 3600);
        assert_eq!(auth.allowed_email_domain, Some("example.com".into()));
    }

    #[test]
    fn test_auth_config_absent() {
        let yaml = r#"
server:
  port: 8080
neo4j:
  uri: bolt://localhost:7687
"#;
        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.auth.is_none());
    }

    #[test]
    fn test_yaml_defaults() {
        let config = YamlConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.neo4j.uri, "bolt://localhost:7687");
        assert_eq!(config.neo4j.user, "neo4j");
        assert!(config.auth.is_none());
    }

    #[test]
    fn test_jwt_expiry_default() {
        let yaml = r#"
auth:
  jwt_secret: "min-32-chars-secret-key-for-test!"
"#;
        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();
        let auth = config.auth.unwrap();
        assert_eq!(auth.jwt_expiry_secs, 28800); // 8h default
        assert!(auth.allowed_email_domain.is_none());
    }

    /// Combined test for YAML file loading, env var overrides, and
    /// defaults. Runs as a single test to avoid parallel env var races.
    #[test]
    fn test_yaml_and_env_lifecycle() {
        fn clear_env() {
            for var in &["NEO4J_URI", "NEO4J_USER", "NEO4J_PASSWORD", "SERVER_PORT"] {
                std::env::remove_var(var);
            }
        }

        // --- Phase 1: YAML values loaded correctly ---
        let yaml = r#"
server:
  port: 9999
neo4j:
  uri: bolt://yaml-host:7687
  user: yaml-user
  password: yaml-pass
"#;
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("config.yaml");
        let mut file = std::fs::File::create(&file_path).unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        clear_env();

        let config = Config::from_yaml_and_env(Some(&file_path)).unwrap();
        assert_eq!(config.server_port, 9999);
        assert_eq!(config.neo4j_uri, "bolt://yaml-host:7687");
        assert_eq!(config.neo4j_user, "yaml-user");
        assert!(config.auth_config.is_none());

        // --- Phase 2: Env vars override YAML ---
        std::env::set_var("NEO4J_URI", "bolt://env-host:7687");
        std::env::set_var("SERVER_PORT", "7777");

        let config = Config::from_yaml_and_env(Some(&file_path)).unwrap();
        assert_eq!(config.neo4j_uri, "bolt://env-host:7687");
        assert_eq!(config.server_port, 7777);
        // YAML value still used where no env override
        assert_eq!(config.neo4j_user, "yaml-user");

        clear_env();

        // --- Phase 3: No YAML file → defaults ---
        let nonexistent = Path::new("/tmp/nonexistent-config-12345.yaml");
        let config = Config::from_yaml_and_env(Some(nonexistent)).unwrap();
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.neo4j_uri, "bolt://localhost:7687");
        assert!(config.auth_config.is_none());
    }
}

//! Registry credential lookup from the local Docker client configuration.
//!
//! Lookups never fail: a missing or unreadable configuration, or a registry
//! without an entry, resolves to [`Credentials::Anonymous`] so that an
//! anonymous pull is always attempted.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bollard::auth::DockerCredentials;
use log::{debug, warn};
use serde::Deserialize;

use crate::error_handling::types::ConfigError;

const DOCKER_CONFIG_ENV: &str = "DOCKER_CONFIG";
const CONFIG_FILE_NAME: &str = "config.json";
const LEGACY_CONFIG_FILE_NAME: &str = ".dockercfg";

/// Hostnames that all designate Docker Hub.
const HUB_ALIASES: [&str; 3] = ["docker.io", "index.docker.io", "registry-1.docker.io"];

/// Credentials for a single registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Credentials {
    #[default]
    Anonymous,
    Basic { username: String, password: String },
}

impl Credentials {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Credentials::Anonymous)
    }

    /// Converts to the client's credential object. Anonymous access maps to an
    /// empty object rather than `None`, so a registry-auth header is still sent.
    pub fn to_docker_credentials(&self) -> DockerCredentials {
        match self {
            Credentials::Anonymous => DockerCredentials::default(),
            Credentials::Basic { username, password } => DockerCredentials {
                username: Some(username.clone()),
                password: Some(password.clone()),
                ..DockerCredentials::default()
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    auths: BTreeMap<String, AuthEntry>,
}

/// One registry entry. Tokens, emails and other stored fields are ignored.
#[derive(Debug, Default, Clone, Deserialize)]
struct AuthEntry {
    #[serde(default)]
    auth: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

impl AuthEntry {
    fn credentials(&self, key: &str) -> Credentials {
        if let Some(encoded) = self.auth.as_deref().filter(|a| !a.trim().is_empty()) {
            return match decode_auth(encoded) {
                Some((username, password)) => Credentials::Basic { username, password },
                None => {
                    warn!("Ignoring malformed auth entry for registry {}", key);
                    Credentials::Anonymous
                }
            };
        }
        match (&self.username, &self.password) {
            (Some(username), Some(password)) if !username.is_empty() => Credentials::Basic {
                username: username.clone(),
                password: password.clone(),
            },
            _ => Credentials::Anonymous,
        }
    }
}

/// Decodes the base64 `user:password` form stored in the `auth` field.
fn decode_auth(encoded: &str) -> Option<(String, String)> {
    let bytes = STANDARD.decode(encoded.trim()).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    let (username, password) = text.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Reduces a config key such as `https://index.docker.io/v1/` to a bare host.
fn registry_host(key: &str) -> &str {
    let without_scheme = key
        .strip_prefix("https://")
        .or_else(|| key.strip_prefix("http://"))
        .unwrap_or(key);
    let host = without_scheme.split('/').next().unwrap_or(without_scheme);
    if HUB_ALIASES.contains(&host) {
        HUB_ALIASES[0]
    } else {
        host
    }
}

/// Registry entries loaded from a Docker client configuration file.
#[derive(Debug, Default)]
pub struct CredentialStore {
    entries: BTreeMap<String, AuthEntry>,
}

impl CredentialStore {
    /// Reads a configuration file. Files named `.dockercfg` use the legacy
    /// layout where registry entries sit at the top level.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let legacy = path
            .file_name()
            .map(|name| name == LEGACY_CONFIG_FILE_NAME)
            .unwrap_or(false);
        Self::parse(&contents, legacy)
    }

    fn parse(contents: &str, legacy: bool) -> Result<Self, ConfigError> {
        let entries = if legacy {
            serde_json::from_str::<BTreeMap<String, AuthEntry>>(contents)
        } else {
            serde_json::from_str::<ConfigFile>(contents).map(|c| c.auths)
        }
        .map_err(|e| ConfigError::JsonError(e.to_string()))?;
        Ok(CredentialStore { entries })
    }

    /// Loads the first readable configuration among the default locations,
    /// or from `explicit` when given.
    pub fn load(explicit: Option<&Path>) -> Option<Self> {
        for path in candidate_paths(explicit) {
            match Self::from_path(&path) {
                Ok(store) => {
                    debug!("Loaded registry credentials from {}", path.display());
                    return Some(store);
                }
                Err(e) => debug!("Skipping credential file {}: {}", path.display(), e),
            }
        }
        None
    }

    /// Returns the credentials stored for `domain`, trying the exact key first
    /// and then keys that reduce to the same registry host.
    pub fn lookup(&self, domain: &str) -> Credentials {
        if let Some(entry) = self.entries.get(domain) {
            return entry.credentials(domain);
        }
        let wanted = registry_host(domain);
        self.entries
            .iter()
            .find(|(key, _)| registry_host(key) == wanted)
            .map(|(key, entry)| entry.credentials(key))
            .unwrap_or_default()
    }
}

fn candidate_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
    if let Some(path) = explicit {
        return vec![path.to_path_buf()];
    }
    if let Some(dir) = std::env::var_os(DOCKER_CONFIG_ENV).filter(|d| !d.is_empty()) {
        return vec![PathBuf::from(dir).join(CONFIG_FILE_NAME)];
    }
    match dirs::home_dir() {
        Some(home) => vec![
            home.join(".docker").join(CONFIG_FILE_NAME),
            home.join(LEGACY_CONFIG_FILE_NAME),
        ],
        None => Vec::new(),
    }
}

/// Resolves credentials for a registry domain, degrading to anonymous access
/// whenever nothing usable is stored.
pub fn credentials_for(domain: &str, config_path: Option<&Path>) -> Credentials {
    match CredentialStore::load(config_path) {
        Some(store) => store.lookup(domain),
        None => {
            debug!("No registry credential configuration found, using anonymous access");
            Credentials::Anonymous
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn basic(username: &str, password: &str) -> Credentials {
        Credentials::Basic {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn decodes_auth_field() {
        // "robot:s3cr:et" keeps everything after the first colon as password
        let encoded = STANDARD.encode("robot:s3cr:et");
        let config = format!(r#"{{"auths":{{"ghcr.io":{{"auth":"{}"}}}}}}"#, encoded);
        let store = CredentialStore::parse(&config, false).unwrap();
        assert_eq!(store.lookup("ghcr.io"), basic("robot", "s3cr:et"));
    }

    #[test]
    fn explicit_username_and_password_are_used() {
        let config = r#"{"auths":{"quay.io":{"username":"u","password":"p","identitytoken":"tok"}}}"#;
        let store = CredentialStore::parse(config, false).unwrap();
        assert_eq!(store.lookup("quay.io"), basic("u", "p"));
    }

    #[test]
    fn unknown_domain_is_anonymous() {
        let config = r#"{"auths":{"quay.io":{"username":"u","password":"p"}}}"#;
        let store = CredentialStore::parse(config, false).unwrap();
        assert!(store.lookup("ghcr.io").is_anonymous());
    }

    #[test]
    fn hub_keys_with_scheme_match_docker_io() {
        let encoded = STANDARD.encode("hubuser:hubpass");
        let config = format!(
            r#"{{"auths":{{"https://index.docker.io/v1/":{{"auth":"{}"}}}},"credsStore":"desktop"}}"#,
            encoded
        );
        let store = CredentialStore::parse(&config, false).unwrap();
        assert_eq!(store.lookup("docker.io"), basic("hubuser", "hubpass"));
    }

    #[test]
    fn malformed_auth_degrades_to_anonymous() {
        let config = r#"{"auths":{"ghcr.io":{"auth":"!!!not-base64"}}}"#;
        let store = CredentialStore::parse(config, false).unwrap();
        assert!(store.lookup("ghcr.io").is_anonymous());

        let no_colon = STANDARD.encode("justauser");
        let config = format!(r#"{{"auths":{{"ghcr.io":{{"auth":"{}"}}}}}}"#, no_colon);
        let store = CredentialStore::parse(&config, false).unwrap();
        assert!(store.lookup("ghcr.io").is_anonymous());
    }

    #[test]
    fn empty_entry_is_anonymous() {
        let store = CredentialStore::parse(r#"{"auths":{"docker.io":{}}}"#, false).unwrap();
        assert!(store.lookup("docker.io").is_anonymous());
    }

    #[test]
    fn legacy_file_layout_is_supported() {
        let dir = TempDir::new().unwrap();
        let encoded = STANDARD.encode("old:school");
        let path = write_file(
            &dir,
            LEGACY_CONFIG_FILE_NAME,
            &format!(r#"{{"registry.example.com":{{"auth":"{}","email":"a@b"}}}}"#, encoded),
        );
        let store = CredentialStore::from_path(&path).unwrap();
        assert_eq!(store.lookup("registry.example.com"), basic("old", "school"));
    }

    #[test]
    fn missing_or_broken_config_is_anonymous() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(credentials_for("docker.io", Some(&missing)).is_anonymous());

        let broken = write_file(&dir, CONFIG_FILE_NAME, "{ not json");
        assert!(credentials_for("docker.io", Some(&broken)).is_anonymous());
    }

    #[test]
    #[serial]
    fn docker_config_env_selects_directory() {
        let dir = TempDir::new().unwrap();
        let encoded = STANDARD.encode("envuser:envpass");
        write_file(
            &dir,
            CONFIG_FILE_NAME,
            &format!(r#"{{"auths":{{"registry.local:5000":{{"auth":"{}"}}}}}}"#, encoded),
        );

        let previous = std::env::var_os(DOCKER_CONFIG_ENV);
        std::env::set_var(DOCKER_CONFIG_ENV, dir.path());
        let creds = credentials_for("registry.local:5000", None);
        match previous {
            Some(value) => std::env::set_var(DOCKER_CONFIG_ENV, value),
            None => std::env::remove_var(DOCKER_CONFIG_ENV),
        }

        assert_eq!(creds, basic("envuser", "envpass"));
    }

    #[test]
    fn anonymous_converts_to_empty_docker_credentials() {
        let creds = Credentials::Anonymous.to_docker_credentials();
        assert!(creds.username.is_none());
        assert!(creds.password.is_none());

        let creds = basic("u", "p").to_docker_credentials();
        assert_eq!(creds.username.as_deref(), Some("u"));
        assert_eq!(creds.password.as_deref(), Some("p"));
        assert!(creds.identitytoken.is_none());
    }
}

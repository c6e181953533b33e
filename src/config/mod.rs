// ldapsynctool/src/config/mod.rs
pub mod ldap;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;

/// Command-line flags. Any of them may also come from the JSON file given with `--config`.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "ldapsynctool", about = "Sync LDAP users and groups into Harbor")]
pub struct CliArgs {
    /// Comma delimited sync types (users, groups). Example: users,groups
    #[arg(long)]
    pub sync: Option<String>,

    /// Harbor base URL
    #[arg(long = "harbor-url", alias = "harbor_url")]
    pub harbor_url: Option<String>,

    /// Harbor login
    #[arg(long = "harbor-login", alias = "harbor_login")]
    pub harbor_login: Option<String>,

    /// Harbor password
    #[arg(long = "harbor-pass", alias = "harbor_pass", env = "HLS_HARBOR_PASS", hide_env_values = true)]
    pub harbor_pass: Option<String>,

    /// LDAP search password for the bind DN configured in Harbor
    #[arg(long = "ldap-pass", alias = "ldap_pass", env = "HLS_LDAP_PASS", hide_env_values = true)]
    pub ldap_pass: Option<String>,

    /// Print intermediate data
    #[arg(long)]
    pub verbose: bool,

    /// Optional JSON file with default values for the flags above
    #[arg(long)]
    pub config: Option<std::path::PathBuf>,
}

// Structs for deserializing the optional config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJsonConfig {
    pub sync: Option<String>,
    pub harbor_url: Option<String>,
    pub harbor_login: Option<String>,
    pub harbor_pass: Option<String>,
    pub ldap_pass: Option<String>,
    pub verbose: Option<bool>,
}

impl RawJsonConfig {
    pub fn load_from_json(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;
        serde_json::from_str(&config_content).with_context(|| {
            format!(
                "Failed to parse JSON from config file at {}",
                config_path.display()
            )
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SyncKind {
    Users,
    Groups,
}

impl SyncKind {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "users" => Some(SyncKind::Users),
            "groups" => Some(SyncKind::Groups),
            _ => None,
        }
    }
}

impl fmt::Display for SyncKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncKind::Users => write!(f, "user"),
            SyncKind::Groups => write!(f, "group"),
        }
    }
}

#[derive(Clone)]
pub struct HarborConfig {
    pub url: String,
    pub login: String,
    pub password: String,
}

impl fmt::Debug for HarborConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HarborConfig")
            .field("url", &self.url)
            .field("login", &self.login)
            .field("password", &"***")
            .finish()
    }
}

/// Everything one run needs, built once at startup and handed to the sync flow.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub harbor: HarborConfig,
    pub ldap_password: String,
    /// Ordered so users always sync before groups.
    pub sync_kinds: BTreeSet<SyncKind>,
    pub unknown_sync_types: Vec<String>,
    pub verbose: bool,
}

impl AppConfig {
    /// Merges flags over file values. `None` means a required value is missing
    /// and the caller should print usage instead of syncing.
    pub fn from_sources(args: &CliArgs, raw: &RawJsonConfig) -> Option<Self> {
        let sync = pick(&args.sync, &raw.sync)?;
        let url = pick(&args.harbor_url, &raw.harbor_url)?;
        let login = pick(&args.harbor_login, &raw.harbor_login)?;
        let password = pick(&args.harbor_pass, &raw.harbor_pass)?;
        let ldap_password = pick(&args.ldap_pass, &raw.ldap_pass).unwrap_or_default();

        let (sync_kinds, unknown_sync_types) = parse_sync_kinds(&sync);

        Some(AppConfig {
            harbor: HarborConfig { url, login, password },
            ldap_password,
            sync_kinds,
            unknown_sync_types,
            verbose: args.verbose || raw.verbose.unwrap_or(false),
        })
    }
}

/// Loads the `--config` file if one was given, otherwise an empty config.
pub fn load_raw_config(args: &CliArgs) -> Result<RawJsonConfig> {
    match &args.config {
        Some(path) => RawJsonConfig::load_from_json(path),
        None => Ok(RawJsonConfig::default()),
    }
}

fn pick(flag: &Option<String>, file: &Option<String>) -> Option<String> {
    flag.as_ref()
        .filter(|s| !s.is_empty())
        .or_else(|| file.as_ref().filter(|s| !s.is_empty()))
        .cloned()
}

/// Splits a comma delimited list of sync types. Tokens are trimmed and
/// lower-cased; repeats are ignored. Unrecognized tokens are returned separately.
pub fn parse_sync_kinds(raw: &str) -> (BTreeSet<SyncKind>, Vec<String>) {
    let mut kinds = BTreeSet::new();
    let mut unknown = Vec::new();
    for token in raw.split(',') {
        let token = token.trim().to_lowercase();
        match SyncKind::parse(&token) {
            Some(kind) => {
                kinds.insert(kind);
            }
            None if !unknown.contains(&token) => unknown.push(token),
            None => {}
        }
    }
    (kinds, unknown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(flags: &[&str]) -> anyhow::Result<CliArgs> {
        let mut argv = vec!["ldapsynctool"];
        argv.extend_from_slice(flags);
        Ok(CliArgs::try_parse_from(argv)?)
    }

    #[test]
    fn test_parse_sync_kinds_dedups_and_normalizes() {
        let (kinds, unknown) = parse_sync_kinds(" Groups ,users,USERS");
        assert_eq!(
            kinds.into_iter().collect::<Vec<_>>(),
            vec![SyncKind::Users, SyncKind::Groups]
        );
        assert!(unknown.is_empty());
    }

    #[test]
    fn test_parse_sync_kinds_reports_unknown() {
        let (kinds, unknown) = parse_sync_kinds("users,projects,projects");
        assert_eq!(kinds.len(), 1);
        assert!(kinds.contains(&SyncKind::Users));
        assert_eq!(unknown, vec!["projects".to_string()]);
    }

    #[test]
    fn test_from_sources_with_flags() -> anyhow::Result<()> {
        let args = args(&[
            "--sync", "users,groups",
            "--harbor-url", "https://harbor.example.com",
            "--harbor-login", "admin",
            "--harbor-pass", "secret",
            "--ldap-pass", "ldapsecret",
        ])?;
        let config = AppConfig::from_sources(&args, &RawJsonConfig::default())
            .context("config should be complete")?;

        assert_eq!(config.harbor.url, "https://harbor.example.com");
        assert_eq!(config.harbor.login, "admin");
        assert_eq!(config.harbor.password, "secret");
        assert_eq!(config.ldap_password, "ldapsecret");
        assert_eq!(config.sync_kinds.len(), 2);
        assert!(!config.verbose);
        Ok(())
    }

    #[test]
    fn test_from_sources_missing_required_value() -> anyhow::Result<()> {
        let args = args(&["--sync", "users", "--harbor-url", "https://harbor"])?;
        assert!(AppConfig::from_sources(&args, &RawJsonConfig::default()).is_none());
        Ok(())
    }

    #[test]
    fn test_flags_override_file_values() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(
            file,
            r#"{{
                "sync": "groups",
                "harbor_url": "https://from-file",
                "harbor_login": "file-admin",
                "harbor_pass": "file-secret",
                "verbose": true
            }}"#
        )?;

        let path = file.path().to_string_lossy().to_string();
        let args = args(&["--config", path.as_str(), "--harbor-login", "flag-admin"])?;
        let raw = load_raw_config(&args)?;
        let config = AppConfig::from_sources(&args, &raw).context("config should be complete")?;

        assert_eq!(config.harbor.url, "https://from-file");
        assert_eq!(config.harbor.login, "flag-admin");
        assert_eq!(config.harbor.password, "file-secret");
        assert_eq!(config.ldap_password, "");
        assert!(config.sync_kinds.contains(&SyncKind::Groups));
        assert!(config.verbose);
        Ok(())
    }

    #[test]
    fn test_invalid_config_file_is_an_error() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, "not json")?;
        assert!(RawJsonConfig::load_from_json(file.path()).is_err());
        Ok(())
    }

    #[test]
    fn test_password_is_not_debug_printed() {
        let harbor = HarborConfig {
            url: "https://harbor".to_string(),
            login: "admin".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(!format!("{:?}", harbor).contains("hunter2"));
    }
}

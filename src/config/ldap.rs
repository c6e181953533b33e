// ldapsynctool/src/config/ldap.rs
//! LDAP connection parameters stored in Harbor's own configuration.
//!
//! Harbor exposes its settings as a loosely typed map. Each key this tool reads
//! is listed below with the JSON type it must have and the value used when the
//! key is absent:
//!
//! | key                         | type    | default |
//! |-----------------------------|---------|---------|
//! | `ldap_url`                  | string  | ""      |
//! | `ldap_search_dn`            | string  | ""      |
//! | `ldap_group_base_dn`        | string  | ""      |
//! | `ldap_group_search_filter`  | string  | ""      |
//! | `ldap_group_attribute_name` | string  | "cn"    |
//! | `ldap_group_search_scope`   | number  | 2       |
//! | `ldap_verify_cert`          | boolean | true    |
//!
//! A string key that is present but empty is rejected as missing. The URL, the
//! group base DN and the group filter are required by the group search and are
//! checked separately by [`LdapConfig::require_search_params`].
use log::debug;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::directory::{GroupSearch, SearchScope};
use crate::errors::{ConfigError, Result};
use crate::harbor::HarborClient;

pub const LDAP_URL: &str = "ldap_url";
pub const LDAP_SEARCH_DN: &str = "ldap_search_dn";
pub const LDAP_GROUP_BASE_DN: &str = "ldap_group_base_dn";
pub const LDAP_GROUP_SEARCH_FILTER: &str = "ldap_group_search_filter";
pub const LDAP_GROUP_ATTRIBUTE_NAME: &str = "ldap_group_attribute_name";
pub const LDAP_GROUP_SEARCH_SCOPE: &str = "ldap_group_search_scope";
pub const LDAP_VERIFY_CERT: &str = "ldap_verify_cert";

const DEFAULT_GROUP_ATTRIBUTE: &str = "cn";
const DEFAULT_SCOPE_CODE: i64 = 2;

/// One entry of `GET api/v2.0/configurations`. Only the value is used.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingEntry {
    #[serde(default, alias = "Value")]
    pub value: Value,
}

pub type SettingsMap = HashMap<String, SettingEntry>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LdapConfig {
    pub url: String,
    pub search_dn: String,
    pub group_base_dn: String,
    pub group_filter: String,
    pub group_attribute: String,
    /// Raw numeric scope as stored in Harbor, truncated to an integer.
    pub scope_code: i64,
    pub verify_cert: bool,
}

impl Default for LdapConfig {
    fn default() -> Self {
        LdapConfig {
            url: String::new(),
            search_dn: String::new(),
            group_base_dn: String::new(),
            group_filter: String::new(),
            group_attribute: DEFAULT_GROUP_ATTRIBUTE.to_string(),
            scope_code: DEFAULT_SCOPE_CODE,
            verify_cert: true,
        }
    }
}

impl LdapConfig {
    pub fn from_settings(settings: &SettingsMap) -> std::result::Result<Self, ConfigError> {
        let mut config = LdapConfig::default();

        if let Some(url) = read_text(settings, LDAP_URL)? {
            config.url = url;
        }
        if let Some(dn) = read_text(settings, LDAP_SEARCH_DN)? {
            config.search_dn = dn;
        }
        if let Some(dn) = read_text(settings, LDAP_GROUP_BASE_DN)? {
            config.group_base_dn = dn;
        }
        if let Some(filter) = read_text(settings, LDAP_GROUP_SEARCH_FILTER)? {
            config.group_filter = filter;
        }
        if let Some(attribute) = read_text(settings, LDAP_GROUP_ATTRIBUTE_NAME)? {
            config.group_attribute = attribute;
        }
        if let Some(code) = read_number(settings, LDAP_GROUP_SEARCH_SCOPE)? {
            config.scope_code = code;
        }
        if let Some(verify) = read_flag(settings, LDAP_VERIFY_CERT)? {
            config.verify_cert = verify;
        }

        Ok(config)
    }

    /// Fails on the first of URL, group base DN or group filter that is still empty.
    pub fn require_search_params(&self) -> std::result::Result<(), ConfigError> {
        for (key, value) in [
            (LDAP_URL, &self.url),
            (LDAP_GROUP_BASE_DN, &self.group_base_dn),
            (LDAP_GROUP_SEARCH_FILTER, &self.group_filter),
        ] {
            if value.is_empty() {
                return Err(ConfigError::Missing { key });
            }
        }
        Ok(())
    }

    pub fn search_scope(&self) -> SearchScope {
        SearchScope::from_code(self.scope_code)
    }

    pub fn group_search(&self) -> GroupSearch {
        GroupSearch {
            base_dn: self.group_base_dn.clone(),
            scope: self.search_scope(),
            filter: self.group_filter.clone(),
            attribute: self.group_attribute.clone(),
        }
    }
}

/// Fetches Harbor's settings and parses the LDAP part of them. Never cached.
pub async fn resolve_ldap_config(client: &HarborClient) -> Result<LdapConfig> {
    let settings = client.configurations().await?;
    debug!("Harbor config: {:?}", settings);
    Ok(LdapConfig::from_settings(&settings)?)
}

fn read_text(
    settings: &SettingsMap,
    key: &'static str,
) -> std::result::Result<Option<String>, ConfigError> {
    match settings.get(key).map(|entry| &entry.value) {
        None => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Err(ConfigError::Missing { key }),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ConfigError::wrong_type(key, "string", other)),
    }
}

fn read_number(
    settings: &SettingsMap,
    key: &'static str,
) -> std::result::Result<Option<i64>, ConfigError> {
    match settings.get(key).map(|entry| &entry.value) {
        None => Ok(None),
        Some(Value::Number(n)) => Ok(n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))),
        Some(other) => Err(ConfigError::wrong_type(key, "int", other)),
    }
}

fn read_flag(
    settings: &SettingsMap,
    key: &'static str,
) -> std::result::Result<Option<bool>, ConfigError> {
    match settings.get(key).map(|entry| &entry.value) {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(other) => Err(ConfigError::wrong_type(key, "bool", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings(value: Value) -> anyhow::Result<SettingsMap> {
        Ok(serde_json::from_value(value)?)
    }

    fn full_settings() -> Value {
        json!({
            "ldap_url": { "value": "ldaps://ldap.example.com", "editable": true },
            "ldap_search_dn": { "value": "cn=harbor,dc=example,dc=com", "editable": true },
            "ldap_group_base_dn": { "value": "ou=groups,dc=example,dc=com", "editable": true },
            "ldap_group_search_filter": { "value": "(objectClass=groupOfNames)", "editable": true },
            "ldap_group_attribute_name": { "value": "cn", "editable": true },
            "ldap_group_search_scope": { "value": 1, "editable": true },
            "ldap_verify_cert": { "value": false, "editable": true },
            "auth_mode": { "value": "ldap_auth", "editable": false }
        })
    }

    #[test]
    fn parses_every_recognized_key() -> anyhow::Result<()> {
        let config = LdapConfig::from_settings(&settings(full_settings())?)?;

        assert_eq!(config.url, "ldaps://ldap.example.com");
        assert_eq!(config.search_dn, "cn=harbor,dc=example,dc=com");
        assert_eq!(config.group_base_dn, "ou=groups,dc=example,dc=com");
        assert_eq!(config.group_filter, "(objectClass=groupOfNames)");
        assert_eq!(config.group_attribute, "cn");
        assert_eq!(config.search_scope(), SearchScope::OneLevel);
        assert!(!config.verify_cert);
        config.require_search_params()?;
        Ok(())
    }

    #[test]
    fn absent_optional_keys_use_defaults() -> anyhow::Result<()> {
        let config = LdapConfig::from_settings(&settings(json!({
            "ldap_url": { "value": "ldap://ldap" },
            "ldap_group_base_dn": { "value": "ou=groups" },
            "ldap_group_search_filter": { "value": "(cn=*)" }
        }))?)?;

        assert_eq!(config.group_attribute, "cn");
        assert_eq!(config.search_scope(), SearchScope::Subtree);
        assert!(config.verify_cert);
        assert_eq!(config.search_dn, "");
        Ok(())
    }

    #[test]
    fn out_of_range_scope_falls_back_to_subtree() -> anyhow::Result<()> {
        let config = LdapConfig::from_settings(&settings(json!({
            "ldap_group_search_scope": { "value": 5 }
        }))?)?;
        assert_eq!(config.scope_code, 5);
        assert_eq!(config.search_scope(), SearchScope::Subtree);
        Ok(())
    }

    #[test]
    fn fractional_scope_is_truncated() -> anyhow::Result<()> {
        let config = LdapConfig::from_settings(&settings(json!({
            "ldap_group_search_scope": { "value": 1.9 }
        }))?)?;
        assert_eq!(config.search_scope(), SearchScope::OneLevel);
        Ok(())
    }

    #[test]
    fn string_verify_cert_is_rejected() -> anyhow::Result<()> {
        let err = LdapConfig::from_settings(&settings(json!({
            "ldap_verify_cert": { "value": "true" }
        }))?)
        .unwrap_err();

        assert!(matches!(
            err,
            ConfigError::WrongType { key: LDAP_VERIFY_CERT, expected: "bool", observed: "string", .. }
        ));
        Ok(())
    }

    #[test]
    fn string_scope_is_rejected() -> anyhow::Result<()> {
        let err = LdapConfig::from_settings(&settings(json!({
            "ldap_group_search_scope": { "value": "2" }
        }))?)
        .unwrap_err();
        assert!(matches!(err, ConfigError::WrongType { key: LDAP_GROUP_SEARCH_SCOPE, .. }));
        Ok(())
    }

    #[test]
    fn empty_present_string_is_missing() -> anyhow::Result<()> {
        let err = LdapConfig::from_settings(&settings(json!({
            "ldap_url": { "value": "" }
        }))?)
        .unwrap_err();

        assert!(matches!(err, ConfigError::Missing { key: LDAP_URL }));
        assert_eq!(err.to_string(), "ldap_url is missing");
        Ok(())
    }

    #[test]
    fn entry_without_value_is_a_type_error() -> anyhow::Result<()> {
        let err = LdapConfig::from_settings(&settings(json!({
            "ldap_search_dn": { "editable": true }
        }))?)
        .unwrap_err();
        assert!(matches!(err, ConfigError::WrongType { key: LDAP_SEARCH_DN, observed: "null", .. }));
        Ok(())
    }

    #[test]
    fn absent_required_keys_fail_search_params() -> anyhow::Result<()> {
        let config = LdapConfig::from_settings(&settings(json!({
            "ldap_url": { "value": "ldap://ldap" }
        }))?)?;

        let err = config.require_search_params().unwrap_err();
        assert!(matches!(err, ConfigError::Missing { key: LDAP_GROUP_BASE_DN }));
        Ok(())
    }

    #[test]
    fn group_search_uses_configured_attribute() -> anyhow::Result<()> {
        let config = LdapConfig::from_settings(&settings(full_settings())?)?;
        let search = config.group_search();
        assert_eq!(search.base_dn, "ou=groups,dc=example,dc=com");
        assert_eq!(search.attribute, "cn");
        assert_eq!(search.scope, SearchScope::OneLevel);
        Ok(())
    }
}

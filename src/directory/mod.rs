// ldapsynctool/src/directory/mod.rs
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use log::{debug, warn};

use crate::config::ldap::LdapConfig;
use crate::errors::{Result, SyncError};

/// How far below the base DN a group search descends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    Base,
    OneLevel,
    Subtree,
}

impl SearchScope {
    /// Maps Harbor's numeric scope setting. Codes other than 0 and 1 mean the whole subtree.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => SearchScope::Base,
            1 => SearchScope::OneLevel,
            _ => SearchScope::Subtree,
        }
    }
}

impl From<SearchScope> for Scope {
    fn from(scope: SearchScope) -> Self {
        match scope {
            SearchScope::Base => Scope::Base,
            SearchScope::OneLevel => Scope::OneLevel,
            SearchScope::Subtree => Scope::Subtree,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSearch {
    pub base_dn: String,
    pub scope: SearchScope,
    pub filter: String,
    /// The single attribute requested; its value becomes the group's display name.
    pub attribute: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryGroup {
    pub dn: String,
    pub display_name: String,
}

impl DirectoryGroup {
    pub fn from_entry(entry: SearchEntry, attribute: &str) -> Self {
        let display_name = entry
            .attrs
            .get(attribute)
            .or_else(|| {
                entry
                    .attrs
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(attribute))
                    .map(|(_, values)| values)
            })
            .and_then(|values| values.first())
            .cloned()
            .unwrap_or_default();

        DirectoryGroup {
            dn: entry.dn,
            display_name,
        }
    }
}

/// A directory that can be searched for groups.
pub trait Directory {
    async fn search_groups(&mut self, search: &GroupSearch) -> Result<Vec<DirectoryGroup>>;
}

/// The DN and password to bind with, or `None` for an anonymous search.
pub fn bind_credentials<'a>(config: &'a LdapConfig, password: &'a str) -> Option<(&'a str, &'a str)> {
    if config.search_dn.is_empty() || password.is_empty() {
        None
    } else {
        Some((config.search_dn.as_str(), password))
    }
}

fn skip_tls_verify(config: &LdapConfig) -> bool {
    !config.verify_cert
}

fn conn_settings(config: &LdapConfig) -> LdapConnSettings {
    LdapConnSettings::new().set_no_tls_verify(skip_tls_verify(config))
}

pub struct LdapDirectory {
    ldap: Ldap,
}

impl LdapDirectory {
    /// Opens a connection to `config.url` and binds when both a bind DN and a password are set.
    pub async fn connect(config: &LdapConfig, password: &str) -> Result<Self> {
        debug!("Connecting to LDAP server {}", config.url);
        let (conn, mut ldap) = LdapConnAsync::with_settings(conn_settings(config), &config.url)
            .await
            .map_err(|e| SyncError::directory(format!("failed to connect to LDAP at {}", config.url), e))?;
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!("LDAP connection driver error: {}", e);
            }
        });

        if let Some((bind_dn, bind_password)) = bind_credentials(config, password) {
            debug!("Binding as {}", bind_dn);
            ldap.simple_bind(bind_dn, bind_password)
                .await
                .and_then(|res| res.success())
                .map_err(|e| SyncError::directory(format!("failed to bind as {}", bind_dn), e))?;
        } else {
            debug!("No bind DN or password, searching anonymously");
        }

        Ok(LdapDirectory { ldap })
    }

    pub async fn close(mut self) {
        if let Err(e) = self.ldap.unbind().await {
            warn!("LDAP unbind failed: {}", e);
        }
    }
}

impl Directory for LdapDirectory {
    async fn search_groups(&mut self, search: &GroupSearch) -> Result<Vec<DirectoryGroup>> {
        let (entries, _res) = self
            .ldap
            .search(
                &search.base_dn,
                search.scope.into(),
                &search.filter,
                vec![search.attribute.as_str()],
            )
            .await
            .and_then(|result| result.success())
            .map_err(|e| SyncError::directory("failed to search LDAP", e))?;

        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(|entry| DirectoryGroup::from_entry(entry, &search.attribute))
            .collect())
    }
}

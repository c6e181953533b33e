// ldapsynctool/src/sync/groups.rs
use anyhow::{Context, Result};
use log::debug;
use std::collections::HashSet;

use crate::config::ldap::resolve_ldap_config;
use crate::directory::{Directory, GroupSearch, LdapDirectory};
use crate::harbor::{CreateOutcome, HarborClient, NewUserGroup};
use crate::sync::pagination::{PAGE_SIZE, collect_pages};

/// What happened to each group DN returned by the directory search.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GroupSyncReport {
    pub created: Vec<String>,
    /// Harbor answered 409: the group appeared after the existing list was read.
    pub conflicts: Vec<String>,
    pub skipped: Vec<String>,
}

impl GroupSyncReport {
    pub fn has_inserts(&self) -> bool {
        !self.created.is_empty() || !self.conflicts.is_empty()
    }
}

/// Creates a Harbor user group for every LDAP group Harbor does not know by DN.
pub async fn sync_groups(client: &HarborClient, ldap_password: &str) -> Result<GroupSyncReport> {
    let config = resolve_ldap_config(client)
        .await
        .context("failed to get LDAP config")?;
    config
        .require_search_params()
        .context("failed to get LDAP config")?;
    debug!("LDAP config: {:?}", config);

    let existing = existing_group_dns(client).await?;

    let mut directory = LdapDirectory::connect(&config, ldap_password).await?;
    let report = create_missing_groups(client, &mut directory, &config.group_search(), &existing).await;
    directory.close().await;
    report
}

/// DNs of every user group Harbor already has.
pub async fn existing_group_dns(client: &HarborClient) -> Result<HashSet<String>> {
    let groups = collect_pages(PAGE_SIZE, move |page| client.list_user_groups(page, PAGE_SIZE))
        .await
        .context("failed to search existing user groups")?;
    Ok(groups.into_iter().map(|g| g.ldap_group_dn).collect())
}

/// Searches the directory once and inserts each group whose DN is not in `existing`.
///
/// A 409 from Harbor is recorded as a conflict and the loop goes on; any other
/// failure stops it. Groups created before the failure stay created.
pub async fn create_missing_groups<D: Directory>(
    client: &HarborClient,
    directory: &mut D,
    search: &GroupSearch,
    existing: &HashSet<String>,
) -> Result<GroupSyncReport> {
    let entries = directory.search_groups(search).await?;

    let mut report = GroupSyncReport::default();
    for entry in entries {
        if existing.contains(&entry.dn) {
            debug!("{} already exists", entry.dn);
            report.skipped.push(entry.dn);
            continue;
        }

        let group = NewUserGroup::ldap(entry.display_name, entry.dn);
        let outcome = client
            .create_user_group(&group)
            .await
            .with_context(|| format!("failed to insert group {}", group.ldap_group_dn))?;
        match outcome {
            CreateOutcome::Created => {
                println!("created {}", group.ldap_group_dn);
                report.created.push(group.ldap_group_dn);
            }
            CreateOutcome::AlreadyExists => {
                println!("{} already exists but wasn't filtered out", group.ldap_group_dn);
                report.conflicts.push(group.ldap_group_dn);
            }
        }
    }

    if !report.has_inserts() {
        println!("no new LDAP groups");
    }
    Ok(report)
}

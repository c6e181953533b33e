// ldapsynctool/src/sync/users.rs
use anyhow::{Context, Result};
use log::debug;
use std::collections::BTreeSet;

use crate::harbor::HarborClient;
use crate::sync::pagination::{PAGE_SIZE, collect_pages};

/// Usernames known to LDAP but not to Harbor, sorted.
pub fn pending_imports<D, T>(directory: D, existing: T) -> Vec<String>
where
    D: IntoIterator<Item = String>,
    T: IntoIterator<Item = String>,
{
    let mut pending: BTreeSet<String> = directory.into_iter().collect();
    for username in existing {
        pending.remove(&username);
    }
    pending.into_iter().collect()
}

/// Imports every LDAP user Harbor does not have yet, in one batch.
///
/// Returns the imported usernames; empty when there was nothing to do.
pub async fn sync_users(client: &HarborClient) -> Result<Vec<String>> {
    let ldap_users = client
        .search_ldap_users()
        .await
        .context("failed to search LDAP users")?;
    debug!(
        "LDAP user search returned {:?}",
        ldap_users.iter().map(|u| &u.username).collect::<Vec<_>>()
    );

    let existing = collect_pages(PAGE_SIZE, move |page| client.list_users(page, PAGE_SIZE))
        .await
        .context("failed to search existing users")?;

    let pending = pending_imports(
        ldap_users.into_iter().map(|u| u.username),
        existing.into_iter().map(|u| u.username),
    );
    if pending.is_empty() {
        println!("no new LDAP users");
        return Ok(pending);
    }

    client
        .import_ldap_users(&pending)
        .await
        .context("failed to import LDAP users")?;
    println!("new LDAP users {:?}", pending);

    Ok(pending)
}

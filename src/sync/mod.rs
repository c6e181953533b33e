// ldapsynctool/src/sync/mod.rs
pub(crate) mod groups;
pub(crate) mod pagination;
pub(crate) mod users;

use anyhow::{Context, Result};
use log::{error, info};

use crate::config::{AppConfig, SyncKind};
use crate::harbor::HarborClient;

/// Public entry point for the sync process.
///
/// Runs every requested sync kind in order against one Harbor client. A failing
/// kind does not stop the next one; the returned error lists every kind that failed.
pub async fn run_sync_flow(app_config: &AppConfig) -> Result<()> {
    let client = HarborClient::new(&app_config.harbor).context("Failed to set up Harbor client")?;

    let mut failed = Vec::new();
    for kind in &app_config.sync_kinds {
        info!("Starting {} sync", kind);
        let outcome = match kind {
            SyncKind::Users => users::sync_users(&client).await.map(|_| ()),
            SyncKind::Groups => groups::sync_groups(&client, &app_config.ldap_password)
                .await
                .map(|_| ()),
        };
        if let Err(e) = outcome {
            error!("{} sync failed: {:#}", kind, e);
            failed.push(kind.to_string());
        }
    }

    if !failed.is_empty() {
        anyhow::bail!("{} sync failed", failed.join(" and "));
    }
    Ok(())
}

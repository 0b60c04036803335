use layout_restore_core::{AppWidgetId, RestoreError};
use layout_restore_store_sqlite::SqliteLayoutStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::collaborators::WidgetHost;
use crate::prefs::RestorePreferences;
use crate::store_error;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WidgetMigrationSummary {
    pub staged_pairs: usize,
    pub migrated: usize,
    pub failed: Vec<AppWidgetId>,
    pub rows_rebound: usize,
    pub staging_cleared: bool,
}

/// Hand every staged (old, new) widget id pair to the widget host, then drop the staging.
///
/// A pair the host rejects is logged and skipped; the remaining pairs still run. The staged
/// lists are cleared whatever happened, so a bad pair is never retried on the next start.
pub fn restore_widget_ids(
    store: &SqliteLayoutStore,
    prefs: &mut dyn RestorePreferences,
    host: &mut dyn WidgetHost,
) -> WidgetMigrationSummary {
    let mut summary = WidgetMigrationSummary::default();

    match prefs.widget_id_staging() {
        Ok(Some(staging)) if !staging.is_empty() => {
            summary.staged_pairs = staging.old_ids().len();
            for (old, new) in staging.pairs() {
                match migrate_pair(store, host, old, new) {
                    Ok(rows) => {
                        debug!(%old, %new, rows, "migrated app widget id");
                        summary.migrated += 1;
                        summary.rows_rebound += rows;
                    }
                    Err(err) => {
                        warn!(%old, %new, error = %err, "failed to migrate app widget id");
                        summary.failed.push(old);
                    }
                }
            }
            info!(
                staged = summary.staged_pairs,
                migrated = summary.migrated,
                failed = summary.failed.len(),
                "restored app widget ids"
            );
        }
        Ok(_) => info!("no app widget ids to restore"),
        Err(err) => warn!(error = %err, "staged app widget ids are unreadable"),
    }

    match prefs.clear_widget_id_staging() {
        Ok(()) => summary.staging_cleared = true,
        Err(err) => warn!(error = %err, "failed to clear staged app widget ids"),
    }
    summary
}

fn migrate_pair(
    store: &SqliteLayoutStore,
    host: &mut dyn WidgetHost,
    old: AppWidgetId,
    new: AppWidgetId,
) -> Result<usize, RestoreError> {
    host.migrate_widget_id(old, new)?;
    store.favorites().rebind_widget_id(old, new).map_err(store_error)
}

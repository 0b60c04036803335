use layout_restore_core::{LaunchIntent, ProfileId, RestoreError};
use layout_restore_store_sqlite::LayoutTransaction;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::collaborators::{ActivityOverrides, UserManager};
use crate::store_error;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OverrideSummary {
    pub candidates: usize,
    pub applied: usize,
    pub skipped: usize,
}

/// Point application rows of restricted packages at the device's replacement activity.
///
/// Runs in its own savepoint: the rewrites take effect only if every selected row was
/// handled. Rows whose intent cannot be parsed are skipped and leave the savepoint intact.
///
/// # Errors
/// Returns an error when the overrides cannot be read, an override's user has no serial,
/// or a statement fails. Nothing is written in that case.
pub fn override_shortcuts(
    tx: &mut LayoutTransaction<'_>,
    overrides: &dyn ActivityOverrides,
    users: &dyn UserManager,
    profile: ProfileId,
) -> Result<OverrideSummary, RestoreError> {
    let activity_overrides = overrides.activity_overrides()?;
    if activity_overrides.is_empty() {
        return Ok(OverrideSummary::default());
    }

    let savepoint = tx.savepoint().map_err(store_error)?;
    let favorites = savepoint.favorites();
    let packages: Vec<String> = activity_overrides.keys().cloned().collect();
    let candidates =
        favorites.application_rows_mentioning(profile, &packages).map_err(store_error)?;

    let mut summary = OverrideSummary { candidates: candidates.len(), ..OverrideSummary::default() };
    for (row, uri) in candidates {
        let intent = match LaunchIntent::parse(&uri) {
            Ok(intent) => intent,
            Err(err) => {
                warn!(%row, error = %err, "skipping shortcut with unreadable intent");
                summary.skipped += 1;
                continue;
            }
        };
        let target = match intent.package_name() {
            Ok(package) => activity_overrides.get(package),
            Err(err) => {
                warn!(%row, error = %err, "skipping shortcut without a target package");
                summary.skipped += 1;
                continue;
            }
        };
        let Some(target) = target else {
            // Substring match on another package's name.
            summary.skipped += 1;
            continue;
        };

        let serial = users.serial_number_for(target.user)?;
        favorites
            .update_launch_target(row, serial, &target.launch_intent().to_uri())
            .map_err(store_error)?;
        debug!(%row, package = %target.package, %serial, "overrode shortcut");
        summary.applied += 1;
    }

    savepoint.commit().map_err(store_error)?;
    Ok(summary)
}

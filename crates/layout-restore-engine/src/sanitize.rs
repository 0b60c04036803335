use layout_restore_core::{
    plan_profile_migration, ItemType, MigrationPlan, ProfileId, ProfileMapping, RestoreError,
    RestoredFlags,
};
use layout_restore_store_sqlite::Favorites;
use tracing::{debug, info};

use crate::{attempt, store_error};

/// Delete rows owned by profiles that have no mapping; returns how many were deleted.
///
/// The doomed rows are logged first. That dump is diagnostic only and never fails the pass.
///
/// # Errors
/// Returns an error when the delete fails.
pub fn remove_unrestored_rows(
    favorites: &Favorites<'_>,
    mapping: &ProfileMapping,
) -> Result<usize, RestoreError> {
    let retained = mapping.retained_ids();
    attempt("log unrestored items", || log_unrestored_rows(favorites, &retained));

    let deleted = favorites.delete_rows_outside_profiles(&retained).map_err(store_error)?;
    info!(deleted, "items from unrestored users were deleted");
    Ok(deleted)
}

fn log_unrestored_rows(
    favorites: &Favorites<'_>,
    retained: &[ProfileId],
) -> Result<(), RestoreError> {
    let lines = favorites.describe_rows_outside_profiles(retained).map_err(store_error)?;
    if lines.is_empty() {
        debug!("no items found to delete");
    } else {
        debug!(
            "items to be deleted from the favorites table during restore:\n{}",
            lines.join("\n")
        );
    }
    Ok(())
}

/// Flag every surviving row as restored and every app-widget as needing a rebind.
///
/// Returns the number of rows marked and how many of them were app-widgets.
///
/// # Errors
/// Returns an error when either update fails.
pub fn mark_rows_restored(
    favorites: &Favorites<'_>,
    keep_all_icons: bool,
) -> Result<(usize, usize), RestoreError> {
    let marked = favorites
        .set_restored_flags_all(RestoredFlags::restored_icon(keep_all_icons))
        .map_err(store_error)?;
    let widgets = favorites
        .set_restored_flags_for_type(
            ItemType::AppWidget,
            RestoredFlags::widget_pending_rebind(keep_all_icons),
        )
        .map_err(store_error)?;
    Ok((marked, widgets))
}

/// Something whose rows can be moved from one profile id to another.
pub trait ProfileRelabel {
    /// # Errors
    /// Returns an error when the update fails.
    fn relabel(&mut self, from: ProfileId, to: ProfileId) -> Result<usize, RestoreError>;
}

impl ProfileRelabel for Favorites<'_> {
    fn relabel(&mut self, from: ProfileId, to: ProfileId) -> Result<usize, RestoreError> {
        self.migrate_profile_id(from, to).map_err(store_error)
    }
}

/// Move rows to their mapped profile ids, staging colliding targets through temporary ids.
///
/// # Errors
/// Returns an error when any relabel fails.
pub fn migrate_profile_ids(
    mapping: &ProfileMapping,
    target: &mut dyn ProfileRelabel,
) -> Result<MigrationPlan, RestoreError> {
    let plan = plan_profile_migration(mapping);
    for step in &plan.steps {
        let moved = target.relabel(step.from, step.to)?;
        debug!(from = %step.from, to = %step.to, moved, "migrated profile id");
    }
    Ok(plan)
}

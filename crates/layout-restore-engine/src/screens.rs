use layout_restore_core::{plan_screen_compaction, RestoreError, ScreenRemap};
use layout_restore_store_sqlite::Favorites;
use tracing::info;

use crate::store_error;

/// Remove gaps between desktop screen ids so no empty pages are left in between.
///
/// The remap is computed once from a single read of the distinct screens and applied in one
/// statement.
///
/// # Errors
/// Returns an error when the screens cannot be read or rewritten.
pub fn remove_screen_id_gaps(favorites: &Favorites<'_>) -> Result<ScreenRemap, RestoreError> {
    let screens = favorites.distinct_desktop_screens().map_err(store_error)?;
    let remap = plan_screen_compaction(&screens);
    if remap.is_empty() {
        return Ok(remap);
    }

    let updated = favorites.apply_screen_remap(&remap).map_err(store_error)?;
    info!(screens = remap.entries.len(), updated, "removed gaps between screen ids");
    Ok(remap)
}

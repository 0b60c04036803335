use layout_restore_core::{ProfileId, ProfileMapping, RestoreError};
use layout_restore_store_sqlite::Favorites;
use tracing::{debug, warn};

use crate::collaborators::{BackupManager, CollaboratorError, UserManager};
use crate::store_error;

/// Map the profile serials found in the restored store to serials on this device.
///
/// The previous primary serial always maps to the live primary serial. Every other serial
/// is treated as a managed profile and resolved through the backup manager; serials that
/// cannot be resolved are left out, so their rows are deleted later.
///
/// # Errors
/// Returns an error when the store cannot be read or the primary ids are invalid.
pub fn build_profile_mapping(
    favorites: &Favorites<'_>,
    backup: &dyn BackupManager,
    users: &dyn UserManager,
    old_primary: ProfileId,
    new_primary: ProfileId,
) -> Result<ProfileMapping, RestoreError> {
    let mut mapping = ProfileMapping::new(old_primary, new_primary).map_err(|err| {
        RestoreError::Schema(format!("unusable primary profile ids: {err}"))
    })?;

    let candidates = favorites.distinct_profile_ids_except(old_primary).map_err(store_error)?;
    for old in candidates {
        match resolve_managed_profile(backup, users, old) {
            Ok(Some(new)) => match mapping.insert_secondary(old, new) {
                Ok(()) => debug!(%old, %new, "managed profile will be mapped to new id"),
                Err(err) => warn!(%old, error = %err, "managed profile cannot be mapped"),
            },
            Ok(None) => {
                warn!(ancestral_serial = %old, "no user found for old profile id");
            }
            Err(err) => {
                warn!(ancestral_serial = %old, error = %err, "failed to resolve old profile id");
            }
        }
    }

    Ok(mapping)
}

fn resolve_managed_profile(
    backup: &dyn BackupManager,
    users: &dyn UserManager,
    ancestral_serial: ProfileId,
) -> Result<Option<ProfileId>, CollaboratorError> {
    let Some(user) = backup.user_for_ancestral_serial(ancestral_serial)? else {
        return Ok(None);
    };
    users.serial_number_for(user).map(Some)
}

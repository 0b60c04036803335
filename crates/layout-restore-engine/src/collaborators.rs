//! Interfaces of the device subsystems a restore pass talks to.

use std::collections::BTreeMap;

use layout_restore_core::{AppWidgetId, LaunchTarget, ProfileId, RestoreError, UserHandle};

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
#[error("{collaborator}: {message}")]
pub struct CollaboratorError {
    pub collaborator: &'static str,
    pub message: String,
}

impl CollaboratorError {
    #[must_use]
    pub fn new(collaborator: &'static str, message: impl Into<String>) -> Self {
        Self { collaborator, message: message.into() }
    }
}

impl From<CollaboratorError> for RestoreError {
    fn from(err: CollaboratorError) -> Self {
        Self::CollaboratorUnavailable(err.to_string())
    }
}

/// Maps serial numbers recorded at backup time to users on this device.
pub trait BackupManager {
    /// # Errors
    /// Returns an error when the backup service cannot be queried.
    fn user_for_ancestral_serial(
        &self,
        serial: ProfileId,
    ) -> Result<Option<UserHandle>, CollaboratorError>;
}

pub trait UserManager {
    /// The user the launcher runs as.
    fn my_user(&self) -> UserHandle;

    /// # Errors
    /// Returns an error when the user is unknown to the device.
    fn serial_number_for(&self, user: UserHandle) -> Result<ProfileId, CollaboratorError>;
}

pub trait WidgetHost {
    /// Move the host-side binding of `old` to `new`.
    ///
    /// # Errors
    /// Returns an error when the host rejects the pair or is unreachable.
    fn migrate_widget_id(
        &mut self,
        old: AppWidgetId,
        new: AppWidgetId,
    ) -> Result<(), CollaboratorError>;
}

pub trait DeviceProfile {
    /// Reload the grid configuration once the restore flag is gone.
    fn reinitialize_after_restore(&mut self);
}

/// Replacement launch targets for packages that are restricted on this device.
pub trait ActivityOverrides {
    /// # Errors
    /// Returns an error when the override source cannot be read.
    fn activity_overrides(&self) -> Result<BTreeMap<String, LaunchTarget>, CollaboratorError>;
}

/// Everything a restore pass needs from the rest of the device.
pub struct Collaborators<'a> {
    pub users: &'a dyn UserManager,
    pub backup: &'a dyn BackupManager,
    pub overrides: &'a dyn ActivityOverrides,
    pub widget_host: &'a mut dyn WidgetHost,
    pub device_profile: &'a mut dyn DeviceProfile,
}

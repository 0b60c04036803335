//! Restore reconciliation for the launcher layout store.
//!
//! A backup restored from another device references profile serials, screens and widget
//! ids that do not exist here. [`RestoreTask::restore_if_needed`] sanitizes the store in
//! one transaction, falling back to an empty store when that fails.

pub mod collaborators;
pub mod device;
pub mod mapper;
pub mod overrides;
pub mod prefs;
pub mod sanitize;
pub mod screens;
pub mod task;
pub mod widgets;

use layout_restore_core::RestoreError;
use tracing::{error, warn};

pub use collaborators::{
    ActivityOverrides, BackupManager, CollaboratorError, Collaborators, DeviceProfile,
    UserManager, WidgetHost,
};
pub use device::{DeviceDescription, RecordingDeviceProfile, RecordingWidgetHost};
pub use prefs::{JsonPreferences, MemoryPreferences, PreferencesDocument, RestorePreferences};
pub use task::{
    sanitize_db, set_pending, stage_widget_ids, RestoreOptions, RestoreOutcome, RestoreReport,
    RestoreTask, SanitizeSummary,
};

pub(crate) fn store_error(err: anyhow::Error) -> RestoreError {
    RestoreError::Store(format!("{err:#}"))
}

/// Run a step whose failure must not abort the surrounding pass.
pub fn attempt<T>(step: &'static str, op: impl FnOnce() -> Result<T, RestoreError>) -> Option<T> {
    match op() {
        Ok(value) => Some(value),
        Err(err) if err.is_fatal() => {
            error!(step, kind = err.kind(), error = %err, "best-effort restore step failed");
            None
        }
        Err(err) => {
            warn!(step, kind = err.kind(), error = %err, "best-effort restore step failed");
            None
        }
    }
}

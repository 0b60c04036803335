//! A device described by a JSON document, for running restores outside the launcher.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use layout_restore_core::{AppWidgetId, LaunchTarget, ProfileId, UserHandle};
use serde::{Deserialize, Serialize};

use crate::collaborators::{
    ActivityOverrides, BackupManager, CollaboratorError, DeviceProfile, UserManager, WidgetHost,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceDescription {
    pub my_user: UserHandle,
    /// User handle to the serial number stored in layout rows.
    #[serde(default)]
    pub user_serials: BTreeMap<i32, i64>,
    /// Ancestral serial recorded in the backup to the user it belongs to now.
    #[serde(default)]
    pub ancestral_users: BTreeMap<i64, i32>,
    #[serde(default)]
    pub activity_overrides: BTreeMap<String, LaunchTarget>,
    #[serde(default)]
    pub rejected_widget_ids: BTreeSet<AppWidgetId>,
    #[serde(default)]
    pub backup_manager_unavailable: bool,
}

impl DeviceDescription {
    #[must_use]
    pub fn new(my_user: UserHandle, my_serial: ProfileId) -> Self {
        let mut user_serials = BTreeMap::new();
        user_serials.insert(my_user.0, my_serial.0);
        Self {
            my_user,
            user_serials,
            ancestral_users: BTreeMap::new(),
            activity_overrides: BTreeMap::new(),
            rejected_widget_ids: BTreeSet::new(),
            backup_manager_unavailable: false,
        }
    }

    /// # Errors
    /// Returns an error when the file cannot be read or is not a valid description.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read device description {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse device description {}", path.display()))
    }

    /// Register a managed profile restored from backup: its old serial, its user, and the
    /// serial that user has on this device.
    pub fn add_ancestral_user(&mut self, ancestral: ProfileId, user: UserHandle, serial: ProfileId) {
        self.ancestral_users.insert(ancestral.0, user.0);
        self.user_serials.insert(user.0, serial.0);
    }

    pub fn add_override(&mut self, package: &str, target: LaunchTarget) {
        self.activity_overrides.insert(package.to_string(), target);
    }

    #[must_use]
    pub fn widget_host(&self) -> RecordingWidgetHost {
        RecordingWidgetHost::rejecting(self.rejected_widget_ids.clone())
    }
}

impl UserManager for DeviceDescription {
    fn my_user(&self) -> UserHandle {
        self.my_user
    }

    fn serial_number_for(&self, user: UserHandle) -> Result<ProfileId, CollaboratorError> {
        self.user_serials
            .get(&user.0)
            .copied()
            .map(ProfileId)
            .ok_or_else(|| CollaboratorError::new("user_manager", format!("unknown user {user}")))
    }
}

impl BackupManager for DeviceDescription {
    fn user_for_ancestral_serial(
        &self,
        serial: ProfileId,
    ) -> Result<Option<UserHandle>, CollaboratorError> {
        if self.backup_manager_unavailable {
            return Err(CollaboratorError::new("backup_manager", "service unavailable"));
        }
        Ok(self.ancestral_users.get(&serial.0).copied().map(UserHandle))
    }
}

impl ActivityOverrides for DeviceDescription {
    fn activity_overrides(&self) -> Result<BTreeMap<String, LaunchTarget>, CollaboratorError> {
        Ok(self.activity_overrides.clone())
    }
}

/// Widget host that accepts every pair except the listed new ids and remembers what it moved.
#[derive(Debug, Clone, Default)]
pub struct RecordingWidgetHost {
    rejected: BTreeSet<AppWidgetId>,
    pub migrated: Vec<(AppWidgetId, AppWidgetId)>,
}

impl RecordingWidgetHost {
    #[must_use]
    pub fn rejecting(rejected: BTreeSet<AppWidgetId>) -> Self {
        Self { rejected, migrated: Vec::new() }
    }
}

impl WidgetHost for RecordingWidgetHost {
    fn migrate_widget_id(
        &mut self,
        old: AppWidgetId,
        new: AppWidgetId,
    ) -> Result<(), CollaboratorError> {
        if self.rejected.contains(&new) {
            return Err(CollaboratorError::new(
                "widget_host",
                format!("widget id {new} is not allocated"),
            ));
        }
        self.migrated.push((old, new));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RecordingDeviceProfile {
    pub reinitialized: usize,
}

impl DeviceProfile for RecordingDeviceProfile {
    fn reinitialize_after_restore(&mut self) {
        self.reinitialized += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_parses_with_defaults() {
        let device: DeviceDescription = match serde_json::from_str(
            r#"{
                "my_user": 0,
                "user_serials": {"0": 0, "10": 5},
                "ancestral_users": {"11": 10},
                "activity_overrides": {
                    "com.android.dialer": {"package": "com.oem.dialer", "activity": ".Main", "user": 0}
                }
            }"#,
        ) {
            Ok(device) => device,
            Err(err) => panic!("device description should parse: {err}"),
        };

        assert_eq!(device.serial_number_for(UserHandle(10)), Ok(ProfileId(5)));
        assert_eq!(device.user_for_ancestral_serial(ProfileId(11)), Ok(Some(UserHandle(10))));
        assert_eq!(device.user_for_ancestral_serial(ProfileId(12)), Ok(None));
        assert!(device.serial_number_for(UserHandle(99)).is_err());
        assert!(device.rejected_widget_ids.is_empty());
    }
}

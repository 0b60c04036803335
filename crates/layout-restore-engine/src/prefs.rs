//! Persisted restore state: the pending flag and the staged widget id lists.

use std::fs;
use std::path::{Path, PathBuf};

use layout_restore_core::{encode_id_list, parse_id_list, Topology, WidgetIdStaging};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::collaborators::CollaboratorError;

const PREFERENCES: &str = "preferences";

/// The configuration-store collaborator.
pub trait RestorePreferences {
    /// # Errors
    /// Returns an error when the preference store cannot be read.
    fn has_pending_restore(&self) -> Result<bool, CollaboratorError>;

    /// # Errors
    /// Returns an error when the preference store cannot be read.
    fn pending_topology(&self) -> Result<Option<Topology>, CollaboratorError>;

    /// # Errors
    /// Returns an error when the preference store cannot be written.
    fn set_pending_restore(&mut self, topology: Topology) -> Result<(), CollaboratorError>;

    /// # Errors
    /// Returns an error when the preference store cannot be written.
    fn clear_pending_restore(&mut self) -> Result<(), CollaboratorError>;

    /// Both staged lists, or `None` unless both are present.
    ///
    /// # Errors
    /// Returns an error when the store cannot be read or the lists are malformed.
    fn widget_id_staging(&self) -> Result<Option<WidgetIdStaging>, CollaboratorError>;

    /// # Errors
    /// Returns an error when the preference store cannot be written.
    fn set_widget_id_staging(&mut self, staging: &WidgetIdStaging)
        -> Result<(), CollaboratorError>;

    /// # Errors
    /// Returns an error when the preference store cannot be written.
    fn clear_widget_id_staging(&mut self) -> Result<(), CollaboratorError>;
}

/// On-disk shape of the preferences file. Keys this crate does not own are preserved.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PreferencesDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restore_device: Option<Topology>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub restore_marked_at: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appwidget_old_ids: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appwidget_ids: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl PreferencesDocument {
    fn set_pending(&mut self, topology: Topology) {
        self.restore_device = Some(topology);
        self.restore_marked_at = Some(OffsetDateTime::now_utc());
    }

    fn clear_pending(&mut self) {
        self.restore_device = None;
        self.restore_marked_at = None;
    }

    fn widget_staging(&self) -> Result<Option<WidgetIdStaging>, CollaboratorError> {
        let (Some(old), Some(new)) = (&self.appwidget_old_ids, &self.appwidget_ids) else {
            return Ok(None);
        };
        let parse = |raw: &str| {
            parse_id_list(raw).map_err(|err| CollaboratorError::new(PREFERENCES, err.to_string()))
        };
        WidgetIdStaging::new(parse(old)?, parse(new)?)
            .map(Some)
            .map_err(|err| CollaboratorError::new(PREFERENCES, err.to_string()))
    }

    fn set_widget_staging(&mut self, staging: &WidgetIdStaging) {
        self.appwidget_old_ids = Some(encode_id_list(staging.old_ids()));
        self.appwidget_ids = Some(encode_id_list(staging.new_ids()));
    }

    fn clear_widget_staging(&mut self) {
        self.appwidget_old_ids = None;
        self.appwidget_ids = None;
    }
}

/// Preferences kept in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferences {
    pub document: PreferencesDocument,
}

impl RestorePreferences for MemoryPreferences {
    fn has_pending_restore(&self) -> Result<bool, CollaboratorError> {
        Ok(self.document.restore_device.is_some())
    }

    fn pending_topology(&self) -> Result<Option<Topology>, CollaboratorError> {
        Ok(self.document.restore_device)
    }

    fn set_pending_restore(&mut self, topology: Topology) -> Result<(), CollaboratorError> {
        self.document.set_pending(topology);
        Ok(())
    }

    fn clear_pending_restore(&mut self) -> Result<(), CollaboratorError> {
        self.document.clear_pending();
        Ok(())
    }

    fn widget_id_staging(&self) -> Result<Option<WidgetIdStaging>, CollaboratorError> {
        self.document.widget_staging()
    }

    fn set_widget_id_staging(
        &mut self,
        staging: &WidgetIdStaging,
    ) -> Result<(), CollaboratorError> {
        self.document.set_widget_staging(staging);
        Ok(())
    }

    fn clear_widget_id_staging(&mut self) -> Result<(), CollaboratorError> {
        self.document.clear_widget_staging();
        Ok(())
    }
}

/// Preferences persisted as a JSON object; every write replaces the file atomically.
#[derive(Debug, Clone)]
pub struct JsonPreferences {
    path: PathBuf,
}

impl JsonPreferences {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file reads as an empty document.
    ///
    /// # Errors
    /// Returns an error when the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<PreferencesDocument, CollaboratorError> {
        if !self.path.exists() {
            return Ok(PreferencesDocument::default());
        }
        let raw = fs::read_to_string(&self.path).map_err(|err| {
            CollaboratorError::new(
                PREFERENCES,
                format!("failed to read {}: {err}", self.path.display()),
            )
        })?;
        serde_json::from_str(&raw).map_err(|err| {
            CollaboratorError::new(
                PREFERENCES,
                format!("failed to parse {}: {err}", self.path.display()),
            )
        })
    }

    fn save(&self, document: &PreferencesDocument) -> Result<(), CollaboratorError> {
        let io_error = |err: &dyn std::fmt::Display| {
            CollaboratorError::new(
                PREFERENCES,
                format!("failed to write {}: {err}", self.path.display()),
            )
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| io_error(&err))?;
            }
        }
        let json = serde_json::to_string_pretty(document).map_err(|err| io_error(&err))?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, json).map_err(|err| io_error(&err))?;
        fs::rename(&staging, &self.path).map_err(|err| io_error(&err))
    }

    fn update(
        &self,
        change: impl FnOnce(&mut PreferencesDocument),
    ) -> Result<(), CollaboratorError> {
        let mut document = self.load()?;
        change(&mut document);
        self.save(&document)
    }
}

impl RestorePreferences for JsonPreferences {
    fn has_pending_restore(&self) -> Result<bool, CollaboratorError> {
        Ok(self.load()?.restore_device.is_some())
    }

    fn pending_topology(&self) -> Result<Option<Topology>, CollaboratorError> {
        Ok(self.load()?.restore_device)
    }

    fn set_pending_restore(&mut self, topology: Topology) -> Result<(), CollaboratorError> {
        self.update(|document| document.set_pending(topology))
    }

    fn clear_pending_restore(&mut self) -> Result<(), CollaboratorError> {
        self.update(PreferencesDocument::clear_pending)
    }

    fn widget_id_staging(&self) -> Result<Option<WidgetIdStaging>, CollaboratorError> {
        self.load()?.widget_staging()
    }

    fn set_widget_id_staging(
        &mut self,
        staging: &WidgetIdStaging,
    ) -> Result<(), CollaboratorError> {
        self.update(|document| document.set_widget_staging(staging))
    }

    fn clear_widget_id_staging(&mut self) -> Result<(), CollaboratorError> {
        self.update(PreferencesDocument::clear_widget_staging)
    }
}

//! The restore pass run once at startup when a backup was restored onto this device.

use layout_restore_core::{
    AppWidgetId, MigrationStep, ProfileId, RestoreError, RestoreEvent, RestoreState, ScreenRemap,
    Topology, WidgetIdStaging,
};
use layout_restore_store_sqlite::{LayoutTransaction, SqliteLayoutStore};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, error, info, info_span, warn};
use ulid::Ulid;

use crate::collaborators::Collaborators;
use crate::mapper::build_profile_mapping;
use crate::overrides::{override_shortcuts, OverrideSummary};
use crate::prefs::RestorePreferences;
use crate::sanitize::{mark_rows_restored, migrate_profile_ids, remove_unrestored_rows};
use crate::screens::remove_screen_id_gaps;
use crate::widgets::{restore_widget_ids, WidgetMigrationSummary};
use crate::{attempt, store_error};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RestoreOptions {
    /// Keep the restore-started bit on every row so icons are never dropped as stale.
    #[serde(default)]
    pub keep_all_icons: bool,
}

/// What one sanitize pass did to the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SanitizeSummary {
    pub old_primary_profile: ProfileId,
    pub new_primary_profile: ProfileId,
    pub profile_mapping: Vec<(ProfileId, ProfileId)>,
    pub rows_deleted: usize,
    pub rows_marked_restored: usize,
    pub widgets_marked_for_rebind: usize,
    pub migration_steps: Vec<MigrationStep>,
    pub default_profile_rewritten: bool,
    /// `None` when compaction does not apply to the source topology.
    pub screen_remap: Option<ScreenRemap>,
    /// `None` when override resolution failed and was rolled back.
    pub overrides: Option<OverrideSummary>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RestoreOutcome {
    NotPending,
    Committed,
    FallenBack,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RestoreReport {
    pub run_id: Ulid,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    pub outcome: RestoreOutcome,
    pub final_state: RestoreState,
    pub topology: Option<Topology>,
    pub sanitize: Option<SanitizeSummary>,
    /// Error that sent the pass to the empty-store fallback.
    pub failure: Option<String>,
    /// Error from recreating the empty store, if that failed too.
    pub fallback_error: Option<String>,
    pub widgets: Option<WidgetMigrationSummary>,
    pub pending_cleared: bool,
    pub device_profile_reinitialized: bool,
}

impl RestoreReport {
    fn new(run_id: Ulid, started_at: OffsetDateTime, state: RestoreState) -> Self {
        Self {
            run_id,
            started_at,
            outcome: RestoreOutcome::NotPending,
            final_state: state,
            topology: None,
            sanitize: None,
            failure: None,
            fallback_error: None,
            widgets: None,
            pending_cleared: false,
            device_profile_reinitialized: false,
        }
    }
}

/// Drives the restore lifecycle over a layout store.
#[derive(Debug, Clone)]
pub struct RestoreTask {
    options: RestoreOptions,
    state: RestoreState,
}

impl Default for RestoreTask {
    fn default() -> Self {
        Self::new(RestoreOptions::default())
    }
}

impl RestoreTask {
    #[must_use]
    pub fn new(options: RestoreOptions) -> Self {
        Self { options, state: RestoreState::Idle }
    }

    #[must_use]
    pub fn state(&self) -> RestoreState {
        self.state
    }

    #[must_use]
    pub fn options(&self) -> RestoreOptions {
        self.options
    }

    /// Record that a backup payload arrived; the task stays `Pending` until the next restore.
    ///
    /// # Errors
    /// Returns an error when the preference store cannot be written or a restore is already
    /// in progress.
    pub fn mark_pending(
        &mut self,
        prefs: &mut dyn RestorePreferences,
        topology: Topology,
    ) -> Result<(), RestoreError> {
        let next = self.state.on(RestoreEvent::Marked)?;
        set_pending(prefs, topology)?;
        debug!(from = ?self.state, to = ?next, "restore state changed");
        self.state = next;
        Ok(())
    }

    fn advance(&mut self, event: RestoreEvent) -> Result<(), RestoreError> {
        let next = self.state.on(event)?;
        debug!(from = ?self.state, to = ?next, ?event, "restore state changed");
        self.state = next;
        Ok(())
    }

    /// Sanitize the store if a restore is pending, falling back to an empty store on failure.
    ///
    /// Staged widget ids are migrated whatever the outcome. The pending flag is then cleared
    /// and only after that is the device profile asked to reinitialize.
    ///
    /// # Errors
    /// Returns an error when the pending flag cannot be read. Failures inside the pass are
    /// reported in the returned [`RestoreReport`] instead.
    pub fn restore_if_needed(
        &mut self,
        store: &mut SqliteLayoutStore,
        prefs: &mut dyn RestorePreferences,
        collaborators: Collaborators<'_>,
    ) -> Result<RestoreReport, RestoreError> {
        let run_id = Ulid::new();
        let mut report = RestoreReport::new(run_id, OffsetDateTime::now_utc(), self.state);
        if !prefs.has_pending_restore()? {
            debug!("no restore pending");
            return Ok(report);
        }

        let span = info_span!("restore", %run_id);
        let _entered = span.enter();

        let topology = prefs.pending_topology()?.unwrap_or(Topology::Single);
        report.topology = Some(topology);
        // A flag persisted by an earlier process has not been seen by this task yet.
        self.advance(RestoreEvent::Marked)?;
        self.advance(RestoreEvent::Started)?;
        info!(topology = topology.as_str(), "restoring layout store");

        match perform_restore(store, topology, &collaborators, self.options) {
            Ok(summary) => {
                self.advance(RestoreEvent::Succeeded)?;
                info!(
                    deleted = summary.rows_deleted,
                    migrated_profiles = summary.migration_steps.len(),
                    "layout store restored"
                );
                report.outcome = RestoreOutcome::Committed;
                report.sanitize = Some(summary);
            }
            Err(err) => {
                self.advance(RestoreEvent::Failed)?;
                error!(kind = err.kind(), error = %err, "failed to restore layout store, recreating it empty");
                report.outcome = RestoreOutcome::FallenBack;
                report.failure = Some(err.to_string());
                let default_profile = fallback_default_profile(&collaborators);
                if let Err(err) = store.reset_empty(default_profile) {
                    error!(error = %format!("{err:#}"), "failed to recreate empty layout store");
                    report.fallback_error = Some(format!("{err:#}"));
                }
            }
        }

        report.widgets = Some(restore_widget_ids(store, prefs, collaborators.widget_host));

        match prefs.clear_pending_restore() {
            Ok(()) => report.pending_cleared = true,
            Err(err) => error!(error = %err, "failed to clear pending restore flag"),
        }
        self.advance(RestoreEvent::Cleared)?;

        collaborators.device_profile.reinitialize_after_restore();
        report.device_profile_reinitialized = true;
        report.final_state = self.state;
        Ok(report)
    }
}

fn perform_restore(
    store: &mut SqliteLayoutStore,
    topology: Topology,
    collaborators: &Collaborators<'_>,
    options: RestoreOptions,
) -> Result<SanitizeSummary, RestoreError> {
    let mut tx = store.transaction().map_err(store_error)?;
    let summary = sanitize_db(&mut tx, topology, collaborators, options)?;
    tx.commit().map_err(store_error)?;
    Ok(summary)
}

fn fallback_default_profile(collaborators: &Collaborators<'_>) -> ProfileId {
    let users = collaborators.users;
    users.serial_number_for(users.my_user()).unwrap_or_else(|err| {
        warn!(error = %err, "primary user has no serial, recreating store for profile 0");
        ProfileId(0)
    })
}

/// Reconcile a freshly restored store with this device inside `tx`.
///
/// Nothing is committed here; the caller commits `tx` once this returns `Ok`.
///
/// # Errors
/// Returns an error when the previous primary profile cannot be recovered from the schema,
/// the live primary profile has no serial, or any store statement fails.
pub fn sanitize_db(
    tx: &mut LayoutTransaction<'_>,
    topology: Topology,
    collaborators: &Collaborators<'_>,
    options: RestoreOptions,
) -> Result<SanitizeSummary, RestoreError> {
    let users = collaborators.users;
    let favorites = tx.favorites();

    let old_primary = favorites
        .default_profile_id()
        .map_err(|err| RestoreError::Schema(format!("{err:#}")))?
        .ok_or_else(|| {
            RestoreError::Schema("favorites.profileId has no default value".to_string())
        })?;
    let new_primary = users.serial_number_for(users.my_user())?;

    let mapping =
        build_profile_mapping(&favorites, collaborators.backup, users, old_primary, new_primary)?;
    let rows_deleted = remove_unrestored_rows(&favorites, &mapping)?;
    let (rows_marked_restored, widgets_marked_for_rebind) =
        mark_rows_restored(&favorites, options.keep_all_icons)?;

    let mut relabel = favorites;
    let plan = migrate_profile_ids(&mapping, &mut relabel)?;

    let default_profile_rewritten = new_primary != old_primary;
    if default_profile_rewritten {
        favorites.rewrite_default_profile(new_primary).map_err(store_error)?;
    }

    let screen_remap = match topology {
        Topology::Multi => None,
        Topology::Single => Some(remove_screen_id_gaps(&favorites)?),
    };

    let overrides = attempt("override shortcuts", || {
        override_shortcuts(tx, collaborators.overrides, users, new_primary)
    });

    Ok(SanitizeSummary {
        old_primary_profile: old_primary,
        new_primary_profile: new_primary,
        profile_mapping: mapping.iter().collect(),
        rows_deleted,
        rows_marked_restored,
        widgets_marked_for_rebind,
        migration_steps: plan.steps,
        default_profile_rewritten,
        screen_remap,
        overrides,
    })
}

/// Record that a backup payload arrived and a restore should run on next start.
///
/// # Errors
/// Returns an error when the preference store cannot be written.
pub fn set_pending(
    prefs: &mut dyn RestorePreferences,
    topology: Topology,
) -> Result<(), RestoreError> {
    prefs.set_pending_restore(topology)?;
    info!(topology = topology.as_str(), "restore marked pending");
    Ok(())
}

/// Persist the widget ids the backup agent reassigned, for migration after the next restore.
///
/// # Errors
/// Returns an error when the lists differ in length or cannot be written.
pub fn stage_widget_ids(
    prefs: &mut dyn RestorePreferences,
    old: Vec<AppWidgetId>,
    new: Vec<AppWidgetId>,
) -> Result<WidgetIdStaging, RestoreError> {
    let staging = WidgetIdStaging::new(old, new)?;
    prefs.set_widget_id_staging(&staging)?;
    info!(pairs = staging.old_ids().len(), "staged app widget ids");
    Ok(staging)
}

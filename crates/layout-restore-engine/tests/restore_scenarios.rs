use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use layout_restore_core::{
    AppWidgetId, Container, ItemType, LaunchTarget, LayoutRow, ProfileId, RestoreState,
    RestoredFlags, RowId, Topology, UserHandle,
};
use layout_restore_engine::{
    set_pending, stage_widget_ids, Collaborators, DeviceDescription, MemoryPreferences,
    RecordingDeviceProfile, RecordingWidgetHost, RestoreOptions, RestoreOutcome,
    RestorePreferences, RestoreReport, RestoreTask,
};
use layout_restore_store_sqlite::SqliteLayoutStore;
use rusqlite::Connection;

const DIALER: &str =
    "#Intent;action=android.intent.action.MAIN;category=android.intent.category.LAUNCHER;component=com.android.dialer/.Main;end";

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|err| panic!("clock should be >= UNIX_EPOCH: {err}"))
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("{prefix}-{now}"));
    fs::create_dir_all(&dir)
        .unwrap_or_else(|err| panic!("failed to create temp dir {}: {err}", dir.display()));
    dir
}

fn app(profile: i64) -> LayoutRow {
    LayoutRow::new(ItemType::Application, Container::Desktop, ProfileId(profile))
}

fn seeded_store(path: &Path, default_profile: i64, rows: &[LayoutRow]) -> Result<SqliteLayoutStore> {
    let store = SqliteLayoutStore::open(path)?;
    store.ensure_schema(ProfileId(default_profile))?;
    for row in rows {
        store.favorites().insert_row(row)?;
    }
    Ok(store)
}

/// Record every write to `favorites.profileId` in a side table.
fn instrument_profile_updates(db: &Path) -> Result<()> {
    let conn = Connection::open(db)?;
    conn.execute_batch(
        "CREATE TABLE profile_updates (row_id INTEGER, old_profile INTEGER, new_profile INTEGER);
         CREATE TRIGGER log_profile_updates AFTER UPDATE OF profileId ON favorites
         BEGIN
           INSERT INTO profile_updates(row_id, old_profile, new_profile)
           VALUES (old._id, old.profileId, new.profileId);
         END;",
    )?;
    Ok(())
}

fn profile_updates(db: &Path) -> Result<Vec<(i64, i64, i64)>> {
    let conn = Connection::open(db)?;
    let mut stmt =
        conn.prepare("SELECT row_id, old_profile, new_profile FROM profile_updates ORDER BY rowid")?;
    let updates = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(updates)
}

/// Every intermediate profile id a row took was either a temporary slot or its final id.
fn assert_no_transient_collisions(store: &SqliteLayoutStore, updates: &[(i64, i64, i64)]) -> Result<()> {
    let finals: BTreeMap<i64, i64> = store
        .favorites()
        .list_rows()?
        .iter()
        .map(|row| (row.id.0, row.profile_id.0))
        .collect();
    for (row_id, old, new) in updates {
        let Some(final_profile) = finals.get(row_id) else {
            continue;
        };
        assert!(
            ProfileId(*new).is_temporary() || new == final_profile,
            "row {row_id} moved from {old} to {new} on its way to {final_profile}"
        );
    }
    Ok(())
}

fn profiles_of(store: &SqliteLayoutStore) -> Result<Vec<i64>> {
    Ok(store.favorites().list_rows()?.iter().map(|row| row.profile_id.0).collect())
}

struct Run {
    report: RestoreReport,
    host: RecordingWidgetHost,
    profile: RecordingDeviceProfile,
}

fn restore(
    store: &mut SqliteLayoutStore,
    prefs: &mut MemoryPreferences,
    device: &DeviceDescription,
) -> Result<Run> {
    let mut task = RestoreTask::new(RestoreOptions::default());
    let mut host = device.widget_host();
    let mut profile = RecordingDeviceProfile::default();
    let report = task.restore_if_needed(
        store,
        prefs,
        Collaborators {
            users: device,
            backup: device,
            overrides: device,
            widget_host: &mut host,
            device_profile: &mut profile,
        },
    )?;
    assert_eq!(task.state(), RestoreState::Idle);
    Ok(Run { report, host, profile })
}

fn pending(topology: Topology) -> Result<MemoryPreferences> {
    let mut prefs = MemoryPreferences::default();
    set_pending(&mut prefs, topology)?;
    Ok(prefs)
}

#[test]
fn primary_and_managed_profiles_are_remapped_without_deleting_rows() -> Result<()> {
    let dir = unique_temp_dir("layout-restore-remap");
    let db = dir.join("launcher.db");
    let mut store = seeded_store(&db, 10, &[app(10), app(11), app(10), app(11)])?;
    instrument_profile_updates(&db)?;

    let mut device = DeviceDescription::new(UserHandle(0), ProfileId(0));
    device.add_ancestral_user(ProfileId(11), UserHandle(10), ProfileId(5));
    let mut prefs = pending(Topology::Single)?;

    let run = restore(&mut store, &mut prefs, &device)?;
    assert_eq!(run.report.outcome, RestoreOutcome::Committed);
    let summary = run.report.sanitize.unwrap_or_else(|| panic!("pass should have committed"));
    assert_eq!(summary.rows_deleted, 0);
    assert_eq!(
        summary.profile_mapping,
        vec![(ProfileId(10), ProfileId(0)), (ProfileId(11), ProfileId(5))]
    );

    assert_eq!(profiles_of(&store)?, vec![0, 5, 0, 5]);
    assert_eq!(store.favorites().default_profile_id()?, Some(ProfileId(0)));
    assert_no_transient_collisions(&store, &profile_updates(&db)?)?;

    fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn swapped_profiles_never_borrow_each_others_id() -> Result<()> {
    let dir = unique_temp_dir("layout-restore-swap");
    let db = dir.join("launcher.db");
    let mut store = seeded_store(&db, 0, &[app(0), app(10), app(0)])?;
    instrument_profile_updates(&db)?;

    let mut device = DeviceDescription::new(UserHandle(0), ProfileId(10));
    device.add_ancestral_user(ProfileId(10), UserHandle(11), ProfileId(0));
    let mut prefs = pending(Topology::Single)?;

    let run = restore(&mut store, &mut prefs, &device)?;
    assert_eq!(run.report.outcome, RestoreOutcome::Committed);
    assert_eq!(profiles_of(&store)?, vec![10, 0, 10]);

    let updates = profile_updates(&db)?;
    assert!(updates.iter().any(|(_, _, new)| ProfileId(*new).is_temporary()));
    assert_no_transient_collisions(&store, &updates)?;
    assert!(profiles_of(&store)?.iter().all(|profile| !ProfileId(*profile).is_temporary()));

    fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn managed_profile_colliding_with_live_primary_is_staged() -> Result<()> {
    let dir = unique_temp_dir("layout-restore-live-collision");
    let db = dir.join("launcher.db");
    let mut store = seeded_store(&db, 10, &[app(10), app(0)])?;
    instrument_profile_updates(&db)?;

    let mut device = DeviceDescription::new(UserHandle(0), ProfileId(0));
    device.add_ancestral_user(ProfileId(0), UserHandle(10), ProfileId(5));
    let mut prefs = pending(Topology::Single)?;

    let run = restore(&mut store, &mut prefs, &device)?;
    assert_eq!(run.report.outcome, RestoreOutcome::Committed);
    assert_eq!(profiles_of(&store)?, vec![0, 5]);
    assert_no_transient_collisions(&store, &profile_updates(&db)?)?;

    fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn desktop_screens_compact_for_single_display_backups() -> Result<()> {
    let rows: Vec<LayoutRow> = [0, 3, 4, 6, 7].iter().map(|screen| app(0).with_screen(*screen)).collect();
    let mut store = seeded_store(Path::new(":memory:"), 0, &rows)?;
    let device = DeviceDescription::new(UserHandle(0), ProfileId(0));
    let mut prefs = pending(Topology::Single)?;

    let run = restore(&mut store, &mut prefs, &device)?;
    let summary = run.report.sanitize.unwrap_or_else(|| panic!("pass should have committed"));
    let remap = summary.screen_remap.unwrap_or_else(|| panic!("single display should compact"));
    assert_eq!(remap.entries, vec![(0, 0), (3, 1), (4, 2), (6, 3), (7, 4)]);

    let screens: Vec<i64> = store.favorites().list_rows()?.iter().map(|row| row.screen).collect();
    assert_eq!(screens, vec![0, 1, 2, 3, 4]);
    Ok(())
}

#[test]
fn multi_display_backups_keep_sparse_screens() -> Result<()> {
    let rows: Vec<LayoutRow> = [0, 3, 7].iter().map(|screen| app(0).with_screen(*screen)).collect();
    let mut store = seeded_store(Path::new(":memory:"), 0, &rows)?;
    let device = DeviceDescription::new(UserHandle(0), ProfileId(0));
    let mut prefs = pending(Topology::Multi)?;

    let run = restore(&mut store, &mut prefs, &device)?;
    let summary = run.report.sanitize.unwrap_or_else(|| panic!("pass should have committed"));
    assert_eq!(summary.screen_remap, None);

    let screens: Vec<i64> = store.favorites().list_rows()?.iter().map(|row| row.screen).collect();
    assert_eq!(screens, vec![0, 3, 7]);
    Ok(())
}

#[test]
fn unmapped_profiles_are_deleted_and_survivors_flagged() -> Result<()> {
    let mut store = seeded_store(
        Path::new(":memory:"),
        0,
        &[
            app(0),
            LayoutRow::new(ItemType::AppWidget, Container::Desktop, ProfileId(0))
                .with_widget(AppWidgetId(4), "com.example/.Weather"),
            app(7),
            app(7),
        ],
    )?;
    let device = DeviceDescription::new(UserHandle(0), ProfileId(0));
    let mut prefs = pending(Topology::Single)?;

    let run = restore(&mut store, &mut prefs, &device)?;
    let summary = run.report.sanitize.unwrap_or_else(|| panic!("pass should have committed"));
    assert_eq!(summary.rows_deleted, 2);
    assert_eq!(summary.widgets_marked_for_rebind, 1);
    assert!(!summary.default_profile_rewritten);

    let rows = store.favorites().list_rows()?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].restored, RestoredFlags::ICON_RESTORED);
    assert_eq!(rows[1].restored, RestoredFlags::widget_pending_rebind(false));
    assert_eq!(rows[1].restored, RestoredFlags(1 | 2 | 4));
    Ok(())
}

#[test]
fn rows_without_a_profile_are_deleted() -> Result<()> {
    let dir = unique_temp_dir("layout-restore-null-profile");
    let db = dir.join("launcher.db");
    let mut store = seeded_store(&db, 10, &[app(10)])?;
    {
        let conn = Connection::open(&db)?;
        conn.execute(
            "INSERT INTO favorites (title, itemType, container, screen, profileId)
             VALUES ('Stray', 0, -100, 0, NULL)",
            [],
        )?;
    }

    let device = DeviceDescription::new(UserHandle(0), ProfileId(0));
    let mut prefs = pending(Topology::Single)?;

    let run = restore(&mut store, &mut prefs, &device)?;
    assert_eq!(run.report.outcome, RestoreOutcome::Committed);
    let summary = run.report.sanitize.unwrap_or_else(|| panic!("pass should have committed"));
    assert_eq!(summary.rows_deleted, 1);
    assert!(summary.default_profile_rewritten);

    let conn = Connection::open(&db)?;
    let mut stmt = conn.prepare("SELECT profileId FROM favorites ORDER BY _id")?;
    let profiles = stmt
        .query_map([], |row| row.get::<_, Option<i64>>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    assert_eq!(profiles, vec![Some(0)]);

    drop(stmt);
    drop(conn);
    fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn unreadable_diagnostic_dump_does_not_stop_the_delete() -> Result<()> {
    let dir = unique_temp_dir("layout-restore-untitled-schema");
    let db = dir.join("launcher.db");
    {
        let conn = Connection::open(&db)?;
        conn.execute_batch(
            "CREATE TABLE favorites (
               _id INTEGER PRIMARY KEY, intent TEXT, container INTEGER, screen INTEGER,
               cellX INTEGER, cellY INTEGER, spanX INTEGER, spanY INTEGER, itemType INTEGER,
               appWidgetId INTEGER NOT NULL DEFAULT -1, appWidgetProvider TEXT,
               restored INTEGER NOT NULL DEFAULT 0, profileId INTEGER DEFAULT 0,
               rank INTEGER NOT NULL DEFAULT 0
             );
             INSERT INTO favorites (itemType, container, screen, profileId) VALUES (0, -100, 0, 0);
             INSERT INTO favorites (itemType, container, screen, profileId) VALUES (0, -100, 1, 7);
             INSERT INTO favorites (itemType, container, screen, profileId) VALUES (0, -100, 2, 7);",
        )?;
    }
    let mut store = SqliteLayoutStore::open(&db)?;
    let device = DeviceDescription::new(UserHandle(0), ProfileId(0));
    let mut prefs = pending(Topology::Single)?;

    let run = restore(&mut store, &mut prefs, &device)?;
    assert_eq!(run.report.outcome, RestoreOutcome::Committed);
    let summary = run.report.sanitize.unwrap_or_else(|| panic!("pass should have committed"));
    assert_eq!(summary.rows_deleted, 2);
    assert_eq!(store.favorites().row_count()?, 1);

    fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn store_failure_falls_back_to_an_empty_store() -> Result<()> {
    let dir = unique_temp_dir("layout-restore-fallback");
    let db = dir.join("launcher.db");
    let mut store = seeded_store(&db, 10, &[app(10), app(12)])?;
    {
        let conn = Connection::open(&db)?;
        conn.execute_batch(
            "CREATE TRIGGER refuse_deletes BEFORE DELETE ON favorites
             BEGIN SELECT RAISE(ABORT, 'disk I/O error'); END;",
        )?;
    }

    let device = DeviceDescription::new(UserHandle(0), ProfileId(0));
    let mut prefs = pending(Topology::Single)?;
    stage_widget_ids(&mut prefs, vec![AppWidgetId(3)], vec![AppWidgetId(30)])?;

    let run = restore(&mut store, &mut prefs, &device)?;
    assert_eq!(run.report.outcome, RestoreOutcome::FallenBack);
    assert_eq!(run.report.final_state, RestoreState::Idle);
    let failure = run.report.failure.unwrap_or_default();
    assert!(failure.contains("store error"), "unexpected failure: {failure}");
    assert_eq!(run.report.fallback_error, None);

    let integrity = store.integrity_check()?;
    assert!(integrity.quick_check_ok);
    assert!(integrity.has_favorites_table);
    assert_eq!(integrity.row_count, 0);
    assert_eq!(integrity.default_profile_id, Some(ProfileId(0)));

    assert!(run.report.pending_cleared);
    assert!(!prefs.has_pending_restore()?);
    assert_eq!(run.profile.reinitialized, 1);
    assert_eq!(run.host.migrated, vec![(AppWidgetId(3), AppWidgetId(30))]);
    assert_eq!(prefs.widget_id_staging()?, None);

    fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn missing_profile_default_is_a_schema_failure() -> Result<()> {
    let dir = unique_temp_dir("layout-restore-schema");
    let db = dir.join("launcher.db");
    {
        let conn = Connection::open(&db)?;
        conn.execute_batch(
            "CREATE TABLE favorites (
               _id INTEGER PRIMARY KEY, title TEXT, intent TEXT, container INTEGER,
               screen INTEGER, cellX INTEGER, cellY INTEGER, spanX INTEGER, spanY INTEGER,
               itemType INTEGER, appWidgetId INTEGER NOT NULL DEFAULT -1,
               appWidgetProvider TEXT, restored INTEGER NOT NULL DEFAULT 0,
               profileId INTEGER, rank INTEGER NOT NULL DEFAULT 0
             );",
        )?;
    }
    let mut store = seeded_store(&db, 0, &[app(3)])?;
    let device = DeviceDescription::new(UserHandle(0), ProfileId(0));
    let mut prefs = pending(Topology::Single)?;

    let run = restore(&mut store, &mut prefs, &device)?;
    assert_eq!(run.report.outcome, RestoreOutcome::FallenBack);
    let failure = run.report.failure.unwrap_or_default();
    assert!(failure.contains("schema error"), "unexpected failure: {failure}");
    assert_eq!(store.favorites().row_count()?, 0);
    assert_eq!(store.favorites().default_profile_id()?, Some(ProfileId(0)));
    assert_eq!(run.profile.reinitialized, 1);

    fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn empty_override_set_keeps_intents_and_profiles() -> Result<()> {
    let rows = [
        app(0).with_intent(DIALER),
        app(0).with_intent("#Intent;component=com.example.mail/.Inbox;end"),
    ];
    let mut store = seeded_store(Path::new(":memory:"), 0, &rows)?;
    let identity = |store: &SqliteLayoutStore| -> Result<Vec<(RowId, Option<String>, ProfileId)>> {
        Ok(store
            .favorites()
            .list_rows()?
            .into_iter()
            .map(|row| (row.id, row.intent, row.profile_id))
            .collect())
    };
    let before = identity(&store)?;

    let device = DeviceDescription::new(UserHandle(0), ProfileId(0));
    let mut prefs = pending(Topology::Single)?;
    let run = restore(&mut store, &mut prefs, &device)?;
    let summary = run.report.sanitize.unwrap_or_else(|| panic!("pass should have committed"));
    assert_eq!(summary.overrides.map(|overrides| overrides.applied), Some(0));
    assert_eq!(identity(&store)?, before);
    Ok(())
}

#[test]
fn overrides_rewrite_restricted_shortcuts_after_remap() -> Result<()> {
    let mut store = seeded_store(Path::new(":memory:"), 10, &[app(10).with_intent(DIALER)])?;
    let mut device = DeviceDescription::new(UserHandle(0), ProfileId(0));
    device.add_ancestral_user(ProfileId(77), UserHandle(10), ProfileId(5));
    device.add_override(
        "com.android.dialer",
        LaunchTarget {
            package: "com.oem.dialer".to_string(),
            activity: "com.oem.dialer.Dialtacts".to_string(),
            user: UserHandle(10),
        },
    );
    let mut prefs = pending(Topology::Single)?;

    let run = restore(&mut store, &mut prefs, &device)?;
    let summary = run.report.sanitize.unwrap_or_else(|| panic!("pass should have committed"));
    assert_eq!(summary.overrides.map(|overrides| overrides.applied), Some(1));

    let rows = store.favorites().list_rows()?;
    assert_eq!(rows[0].profile_id, ProfileId(5));
    assert!(rows[0].intent.as_deref().unwrap_or_default().contains("component=com.oem.dialer/.Dialtacts;"));
    Ok(())
}

#[test]
fn failing_override_resolution_does_not_fail_the_restore() -> Result<()> {
    let mut store = seeded_store(Path::new(":memory:"), 0, &[app(0).with_intent(DIALER)])?;
    let mut device = DeviceDescription::new(UserHandle(0), ProfileId(0));
    device.add_override(
        "com.android.dialer",
        LaunchTarget {
            package: "com.oem.dialer".to_string(),
            activity: ".Dialtacts".to_string(),
            user: UserHandle(99),
        },
    );
    let mut prefs = pending(Topology::Single)?;

    let run = restore(&mut store, &mut prefs, &device)?;
    assert_eq!(run.report.outcome, RestoreOutcome::Committed);
    let summary = run.report.sanitize.unwrap_or_else(|| panic!("pass should have committed"));
    assert_eq!(summary.overrides, None);

    let rows = store.favorites().list_rows()?;
    assert_eq!(rows[0].intent.as_deref(), Some(DIALER));
    assert_eq!(rows[0].restored, RestoredFlags::ICON_RESTORED);
    Ok(())
}

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use layout_restore_core::{parse_id_list, LayoutRow, ProfileId, Topology};
use layout_restore_engine::{
    stage_widget_ids, Collaborators, DeviceDescription, JsonPreferences, RecordingDeviceProfile,
    RestoreOptions, RestorePreferences, RestoreTask,
};
use layout_restore_store_sqlite::SqliteLayoutStore;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use tracing::info;
use tracing_subscriber::EnvFilter;

const CLI_CONTRACT_VERSION: &str = "lr.v1";

#[derive(Debug, Parser)]
#[command(name = "lr")]
#[command(about = "Launcher layout restore CLI")]
struct Cli {
    #[arg(long, default_value = "./launcher.db")]
    db: PathBuf,

    #[arg(long, default_value = "./launcher_prefs.json")]
    prefs: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Db {
        #[command(subcommand)]
        command: DbCommand,
    },
    Restore {
        #[command(subcommand)]
        command: RestoreCommand,
    },
    Rows {
        #[command(subcommand)]
        command: RowsCommand,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommand {
    Init(DbInitArgs),
    Check,
    Backup(DbBackupArgs),
    Restore(DbRestoreArgs),
}

#[derive(Debug, Args)]
struct DbInitArgs {
    #[arg(long, default_value_t = 0)]
    default_profile: i64,
}

#[derive(Debug, Args)]
struct DbBackupArgs {
    #[arg(long)]
    out: PathBuf,
}

#[derive(Debug, Args)]
struct DbRestoreArgs {
    #[arg(long = "in")]
    input: PathBuf,
    #[arg(long, value_enum, default_value_t = TopologyArg::Single)]
    topology: TopologyArg,
}

#[derive(Debug, Subcommand)]
enum RestoreCommand {
    MarkPending(MarkPendingArgs),
    StageWidgetIds(StageWidgetIdsArgs),
    Status,
    Run(RunArgs),
}

#[derive(Debug, Args)]
struct MarkPendingArgs {
    #[arg(long, value_enum, default_value_t = TopologyArg::Single)]
    topology: TopologyArg,
}

#[derive(Debug, Args)]
struct StageWidgetIdsArgs {
    /// Comma-separated widget ids recorded in the backup.
    #[arg(long)]
    old: String,
    /// Comma-separated widget ids allocated on this device, in the same order.
    #[arg(long)]
    new: String,
}

#[derive(Debug, Args)]
struct RunArgs {
    /// JSON description of the users, overrides and widget host of this device.
    #[arg(long)]
    device: PathBuf,
    #[arg(long, default_value_t = false)]
    keep_all_icons: bool,
}

#[derive(Debug, Subcommand)]
enum RowsCommand {
    List,
    Import(RowsImportArgs),
}

#[derive(Debug, Args)]
struct RowsImportArgs {
    #[arg(long = "in")]
    input: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TopologyArg {
    Single,
    Multi,
}

impl From<TopologyArg> for Topology {
    fn from(value: TopologyArg) -> Self {
        match value {
            TopologyArg::Single => Topology::Single,
            TopologyArg::Multi => Topology::Multi,
        }
    }
}

fn with_contract_version(value: Value) -> Value {
    match value {
        Value::Object(mut object) => {
            object.insert(
                "contract_version".to_string(),
                Value::String(CLI_CONTRACT_VERSION.to_string()),
            );
            Value::Object(object)
        }
        other => serde_json::json!({
            "contract_version": CLI_CONTRACT_VERSION,
            "payload": other
        }),
    }
}

fn emit_json(value: Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&with_contract_version(value))?);
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).try_init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Db { command } => run_db(command, &cli.db, &cli.prefs),
        Command::Restore { command } => run_restore(command, &cli.db, &cli.prefs),
        Command::Rows { command } => {
            let store = SqliteLayoutStore::open(&cli.db)?;
            run_rows(command, &store)
        }
    }
}

fn run_db(command: DbCommand, db: &Path, prefs: &Path) -> Result<()> {
    let mut store = SqliteLayoutStore::open(db)?;
    match command {
        DbCommand::Init(args) => {
            store.ensure_schema(ProfileId(args.default_profile))?;
            emit_json(serde_json::to_value(store.integrity_check()?)?)
        }
        DbCommand::Check => emit_json(serde_json::to_value(store.integrity_check()?)?),
        DbCommand::Backup(args) => {
            store.backup_database(&args.out)?;
            emit_json(serde_json::json!({
                "backup_path": args.out.display().to_string(),
                "row_count": store.favorites().row_count()?
            }))
        }
        DbCommand::Restore(args) => {
            store.restore_database(&args.input)?;
            let topology = Topology::from(args.topology);
            let mut preferences = JsonPreferences::new(prefs.to_path_buf());
            RestoreTask::default().mark_pending(&mut preferences, topology)?;
            info!(input = %args.input.display(), "loaded layout snapshot");
            emit_json(serde_json::json!({
                "restored_from": args.input.display().to_string(),
                "row_count": store.favorites().row_count()?,
                "pending": true,
                "topology": topology.as_str()
            }))
        }
    }
}

fn run_restore(command: RestoreCommand, db: &Path, prefs: &Path) -> Result<()> {
    let mut preferences = JsonPreferences::new(prefs.to_path_buf());
    match command {
        RestoreCommand::MarkPending(args) => {
            let topology = Topology::from(args.topology);
            let mut task = RestoreTask::default();
            task.mark_pending(&mut preferences, topology)?;
            emit_json(serde_json::json!({
                "pending": true,
                "state": task.state(),
                "topology": topology.as_str()
            }))
        }
        RestoreCommand::StageWidgetIds(args) => {
            let old = parse_id_list(&args.old)?;
            let new = parse_id_list(&args.new)?;
            let staging = stage_widget_ids(&mut preferences, old, new)?;
            emit_json(serde_json::json!({
                "old_ids": staging.old_ids(),
                "new_ids": staging.new_ids()
            }))
        }
        RestoreCommand::Status => run_restore_status(&preferences),
        RestoreCommand::Run(args) => run_restore_pass(&args, db, &mut preferences),
    }
}

fn run_restore_status(preferences: &JsonPreferences) -> Result<()> {
    let document = preferences.load()?;
    let marked_at = document
        .restore_marked_at
        .map(|at| at.format(&Rfc3339))
        .transpose()
        .context("failed to format restore_marked_at")?;
    let staging = preferences.widget_id_staging()?;
    emit_json(serde_json::json!({
        "pending": preferences.has_pending_restore()?,
        "topology": document.restore_device.map(Topology::as_str),
        "marked_at": marked_at,
        "widget_id_staging": staging.map(|staging| serde_json::json!({
            "old_ids": staging.old_ids(),
            "new_ids": staging.new_ids()
        }))
    }))
}

fn run_restore_pass(args: &RunArgs, db: &Path, preferences: &mut JsonPreferences) -> Result<()> {
    let device = DeviceDescription::from_json_file(&args.device)?;
    let mut store = SqliteLayoutStore::open(db)?;
    let mut host = device.widget_host();
    let mut profile = RecordingDeviceProfile::default();
    let mut task = RestoreTask::new(RestoreOptions { keep_all_icons: args.keep_all_icons });

    let report = task.restore_if_needed(
        &mut store,
        preferences,
        Collaborators {
            users: &device,
            backup: &device,
            overrides: &device,
            widget_host: &mut host,
            device_profile: &mut profile,
        },
    )?;
    emit_json(serde_json::to_value(&report)?)
}

fn run_rows(command: RowsCommand, store: &SqliteLayoutStore) -> Result<()> {
    match command {
        RowsCommand::List => {
            let rows = store.favorites().list_rows()?;
            emit_json(serde_json::json!({ "rows": rows }))
        }
        RowsCommand::Import(args) => {
            let raw = fs::read_to_string(&args.input)
                .with_context(|| format!("failed to read rows file {}", args.input.display()))?;
            let rows: Vec<LayoutRow> = serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse rows file {}", args.input.display()))?;
            let favorites = store.favorites();
            let ids = rows
                .iter()
                .map(|row| favorites.insert_row(row))
                .collect::<Result<Vec<_>>>()?;
            emit_json(serde_json::json!({
                "imported": ids.len(),
                "row_ids": ids
            }))
        }
    }
}

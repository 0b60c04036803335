use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Offset added to a profile id to park it outside the valid (non-negative) id space.
pub const TEMP_PROFILE_ID_OFFSET: i64 = i64::MIN;

pub const CONTAINER_DESKTOP: i64 = -100;
pub const CONTAINER_HOTSEAT: i64 = -101;

pub const ACTION_MAIN: &str = "android.intent.action.MAIN";
pub const CATEGORY_LAUNCHER: &str = "android.intent.category.LAUNCHER";
/// `FLAG_ACTIVITY_NEW_TASK | FLAG_ACTIVITY_RESET_TASK_IF_NEEDED`
pub const LAUNCH_FLAGS_NEW_TASK_RESET: u32 = 0x1020_0000;

const INTENT_SCHEME_PREFIX: &str = "#Intent;";
const INTENT_SCHEME_END: &str = "end";

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum RestoreError {
    #[error("schema error: {0}")]
    Schema(String),
    #[error("store error: {0}")]
    Store(String),
    #[error("collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),
    #[error("override resolution error: {0}")]
    OverrideResolution(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl RestoreError {
    /// Fatal errors abort the restore transaction and trigger the empty-store fallback.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Schema(_) | Self::Store(_))
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Schema(_) => "schema",
            Self::Store(_) => "store",
            Self::CollaboratorUnavailable(_) => "collaborator_unavailable",
            Self::OverrideResolution(_) => "override_resolution",
            Self::InvalidInput(_) => "invalid_input",
        }
    }
}

/// Serial number of a user profile as persisted in the `profileId` column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(transparent)]
pub struct ProfileId(pub i64);

impl ProfileId {
    /// The parking slot used while relabeling rows whose target collides with a pending source.
    #[must_use]
    pub const fn temp_slot(self) -> Self {
        Self(TEMP_PROFILE_ID_OFFSET.wrapping_add(self.0))
    }

    #[must_use]
    pub const fn is_temporary(self) -> bool {
        self.0 < 0
    }
}

impl Display for ProfileId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Live user handle on the device. Distinct from the serial number stored in rows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(transparent)]
pub struct UserHandle(pub i32);

impl Display for UserHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "UserHandle{{{}}}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(transparent)]
pub struct RowId(pub i64);

impl RowId {
    /// Marker for rows that have not been written yet; the store assigns the id.
    pub const UNASSIGNED: Self = Self(0);
}

impl Display for RowId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(transparent)]
pub struct AppWidgetId(pub i32);

impl AppWidgetId {
    pub const INVALID: Self = Self(-1);
}

impl Display for AppWidgetId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Application,
    Shortcut,
    Folder,
    AppWidget,
    CustomAppWidget,
    DeepShortcut,
    AppPair,
    Other(i64),
}

impl ItemType {
    #[must_use]
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Application => 0,
            Self::Shortcut => 1,
            Self::Folder => 2,
            Self::AppWidget => 4,
            Self::CustomAppWidget => 5,
            Self::DeepShortcut => 6,
            Self::AppPair => 10,
            Self::Other(value) => value,
        }
    }

    #[must_use]
    pub fn from_i64(value: i64) -> Self {
        match value {
            0 => Self::Application,
            1 => Self::Shortcut,
            2 => Self::Folder,
            4 => Self::AppWidget,
            5 => Self::CustomAppWidget,
            6 => Self::DeepShortcut,
            10 => Self::AppPair,
            other => Self::Other(other),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Container {
    Desktop,
    Hotseat,
    /// Row id of the enclosing folder.
    Folder(i64),
    Other(i64),
}

impl Container {
    #[must_use]
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Desktop => CONTAINER_DESKTOP,
            Self::Hotseat => CONTAINER_HOTSEAT,
            Self::Folder(id) | Self::Other(id) => id,
        }
    }

    #[must_use]
    pub fn from_i64(value: i64) -> Self {
        match value {
            CONTAINER_DESKTOP => Self::Desktop,
            CONTAINER_HOTSEAT => Self::Hotseat,
            id if id >= 0 => Self::Folder(id),
            other => Self::Other(other),
        }
    }
}

/// Bitset stored in the `restored` column.
///
/// Icon rows and widget rows interpret the bits differently, so the constants are
/// grouped by the item kind they apply to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
#[serde(transparent)]
pub struct RestoredFlags(pub i64);

impl RestoredFlags {
    pub const NONE: Self = Self(0);

    pub const ICON_RESTORED: Self = Self(1);
    pub const ICON_AUTOINSTALL: Self = Self(2);
    pub const ICON_RESTORE_STARTED: Self = Self(4);

    pub const WIDGET_ID_NOT_VALID: Self = Self(1);
    pub const WIDGET_PROVIDER_NOT_READY: Self = Self(2);
    pub const WIDGET_UI_NOT_READY: Self = Self(4);
    pub const WIDGET_RESTORE_STARTED: Self = Self(8);

    /// Flags applied to every surviving row after a restore.
    #[must_use]
    pub fn restored_icon(keep_all_icons: bool) -> Self {
        let flags = Self::ICON_RESTORED;
        if keep_all_icons {
            flags.union(Self::ICON_RESTORE_STARTED)
        } else {
            flags
        }
    }

    /// Flags applied to app-widget rows, which always need rebinding after a restore.
    #[must_use]
    pub fn widget_pending_rebind(keep_all_icons: bool) -> Self {
        let flags = Self::WIDGET_ID_NOT_VALID
            .union(Self::WIDGET_PROVIDER_NOT_READY)
            .union(Self::WIDGET_UI_NOT_READY);
        if keep_all_icons {
            flags.union(Self::WIDGET_RESTORE_STARTED)
        } else {
            flags
        }
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// One placed item in the `favorites` table.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct LayoutRow {
    #[serde(default = "unassigned_row_id")]
    pub id: RowId,
    #[serde(default)]
    pub title: Option<String>,
    pub profile_id: ProfileId,
    pub item_type: ItemType,
    pub container: Container,
    #[serde(default)]
    pub screen: i64,
    #[serde(default)]
    pub cell_x: i64,
    #[serde(default)]
    pub cell_y: i64,
    #[serde(default = "one")]
    pub span_x: i64,
    #[serde(default = "one")]
    pub span_y: i64,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default = "invalid_widget_id")]
    pub app_widget_id: AppWidgetId,
    #[serde(default)]
    pub app_widget_provider: Option<String>,
    #[serde(default)]
    pub restored: RestoredFlags,
    #[serde(default)]
    pub rank: i64,
}

fn unassigned_row_id() -> RowId {
    RowId::UNASSIGNED
}

fn one() -> i64 {
    1
}

fn invalid_widget_id() -> AppWidgetId {
    AppWidgetId::INVALID
}

impl LayoutRow {
    #[must_use]
    pub fn new(item_type: ItemType, container: Container, profile_id: ProfileId) -> Self {
        Self {
            id: RowId::UNASSIGNED,
            title: None,
            profile_id,
            item_type,
            container,
            screen: 0,
            cell_x: 0,
            cell_y: 0,
            span_x: 1,
            span_y: 1,
            intent: None,
            app_widget_id: AppWidgetId::INVALID,
            app_widget_provider: None,
            restored: RestoredFlags::NONE,
            rank: 0,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    #[must_use]
    pub fn with_screen(mut self, screen: i64) -> Self {
        self.screen = screen;
        self
    }

    #[must_use]
    pub fn with_cell(mut self, cell_x: i64, cell_y: i64) -> Self {
        self.cell_x = cell_x;
        self.cell_y = cell_y;
        self
    }

    #[must_use]
    pub fn with_span(mut self, span_x: i64, span_y: i64) -> Self {
        self.span_x = span_x;
        self.span_y = span_y;
        self
    }

    #[must_use]
    pub fn with_intent(mut self, intent: &str) -> Self {
        self.intent = Some(intent.to_string());
        self
    }

    #[must_use]
    pub fn with_widget(mut self, app_widget_id: AppWidgetId, provider: &str) -> Self {
        self.app_widget_id = app_widget_id;
        self.app_widget_provider = Some(provider.to_string());
        self
    }

    #[must_use]
    pub fn with_restored(mut self, restored: RestoredFlags) -> Self {
        self.restored = restored;
        self
    }
}

/// Topology of the device the backup was taken on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    Single,
    Multi,
}

impl Topology {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Multi => "multi",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "single" => Some(Self::Single),
            "multi" => Some(Self::Multi),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ComponentName {
    pub package: String,
    pub class: String,
}

impl ComponentName {
    /// Parse a flattened `package/class` name; a class starting with `.` is relative to the package.
    ///
    /// # Errors
    /// Returns an error when either half is missing.
    pub fn parse(value: &str) -> Result<Self, RestoreError> {
        let Some((package, class)) = value.split_once('/') else {
            return Err(RestoreError::OverrideResolution(format!(
                "component `{value}` has no class separator"
            )));
        };
        if package.is_empty() || class.is_empty() {
            return Err(RestoreError::OverrideResolution(format!(
                "component `{value}` is missing its package or class"
            )));
        }
        let class =
            if class.starts_with('.') { format!("{package}{class}") } else { class.to_string() };
        Ok(Self { package: package.to_string(), class })
    }

    #[must_use]
    pub fn flatten_to_short_string(&self) -> String {
        match self.class.strip_prefix(self.package.as_str()) {
            Some(rest) if rest.starts_with('.') => format!("{}/{rest}", self.package),
            _ => format!("{}/{}", self.package, self.class),
        }
    }
}

/// The subset of a serialized launch intent that restore needs to read and rewrite.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Default)]
pub struct LaunchIntent {
    pub action: Option<String>,
    pub categories: Vec<String>,
    pub launch_flags: Option<u32>,
    pub package: Option<String>,
    pub component: Option<ComponentName>,
}

impl LaunchIntent {
    /// Parse an `#Intent;key=value;...;end` URI.
    ///
    /// # Errors
    /// Returns an error when the URI is not in intent scheme form or a known field is malformed.
    pub fn parse(uri: &str) -> Result<Self, RestoreError> {
        let Some(start) = uri.find(INTENT_SCHEME_PREFIX) else {
            return Err(RestoreError::OverrideResolution(format!(
                "intent `{uri}` is not in intent scheme form"
            )));
        };

        let mut intent = Self::default();
        let mut terminated = false;
        for part in uri[start + INTENT_SCHEME_PREFIX.len()..].split(';') {
            if part == INTENT_SCHEME_END {
                terminated = true;
                break;
            }
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            match key {
                "action" => intent.action = Some(value.to_string()),
                "category" => intent.categories.push(value.to_string()),
                "package" => intent.package = Some(value.to_string()),
                "component" => intent.component = Some(ComponentName::parse(value)?),
                "launchFlags" => intent.launch_flags = Some(parse_launch_flags(value)?),
                _ => {}
            }
        }

        if !terminated {
            return Err(RestoreError::OverrideResolution(format!(
                "intent `{uri}` is missing its end marker"
            )));
        }
        Ok(intent)
    }

    /// Package the intent launches, preferring the explicit component.
    ///
    /// # Errors
    /// Returns an error when the intent names neither a component nor a package.
    pub fn package_name(&self) -> Result<&str, RestoreError> {
        if let Some(component) = &self.component {
            return Ok(component.package.as_str());
        }
        self.package.as_deref().ok_or_else(|| {
            RestoreError::OverrideResolution("intent has no component or package".to_string())
        })
    }

    #[must_use]
    pub fn to_uri(&self) -> String {
        let mut uri = String::from(INTENT_SCHEME_PREFIX);
        if let Some(action) = &self.action {
            uri.push_str(&format!("action={action};"));
        }
        for category in &self.categories {
            uri.push_str(&format!("category={category};"));
        }
        if let Some(flags) = self.launch_flags {
            uri.push_str(&format!("launchFlags={flags:#x};"));
        }
        if let Some(package) = &self.package {
            uri.push_str(&format!("package={package};"));
        }
        if let Some(component) = &self.component {
            uri.push_str(&format!("component={};", component.flatten_to_short_string()));
        }
        uri.push_str(INTENT_SCHEME_END);
        uri
    }
}

fn parse_launch_flags(value: &str) -> Result<u32, RestoreError> {
    let parsed = match value.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => value.parse::<u32>(),
    };
    parsed.map_err(|err| {
        RestoreError::OverrideResolution(format!("invalid launchFlags `{value}`: {err}"))
    })
}

/// Replacement launch target for a restricted package.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct LaunchTarget {
    pub package: String,
    pub activity: String,
    pub user: UserHandle,
}

impl LaunchTarget {
    /// Main/launcher intent that starts this target in a fresh task.
    #[must_use]
    pub fn launch_intent(&self) -> LaunchIntent {
        let class = if self.activity.starts_with('.') {
            format!("{}{}", self.package, self.activity)
        } else {
            self.activity.clone()
        };
        LaunchIntent {
            action: Some(ACTION_MAIN.to_string()),
            categories: vec![CATEGORY_LAUNCHER.to_string()],
            launch_flags: Some(LAUNCH_FLAGS_NEW_TASK_RESET),
            package: None,
            component: Some(ComponentName { package: self.package.clone(), class }),
        }
    }
}

/// Old profile id to live profile id, built once per restore pass.
#[derive(Debug, Clone, Serialize, Eq, PartialEq)]
pub struct ProfileMapping {
    primary_old: ProfileId,
    primary_new: ProfileId,
    entries: BTreeMap<ProfileId, ProfileId>,
}

impl ProfileMapping {
    /// Start a mapping with the single primary-profile entry.
    ///
    /// # Errors
    /// Returns an error when either id is negative.
    pub fn new(primary_old: ProfileId, primary_new: ProfileId) -> Result<Self, RestoreError> {
        ensure_valid_profile_id(primary_old)?;
        ensure_valid_profile_id(primary_new)?;
        let mut entries = BTreeMap::new();
        entries.insert(primary_old, primary_new);
        Ok(Self { primary_old, primary_new, entries })
    }

    /// Add a resolved secondary profile.
    ///
    /// # Errors
    /// Returns an error when an id is negative or `old` is already mapped.
    pub fn insert_secondary(&mut self, old: ProfileId, new: ProfileId) -> Result<(), RestoreError> {
        ensure_valid_profile_id(old)?;
        ensure_valid_profile_id(new)?;
        if self.entries.contains_key(&old) {
            return Err(RestoreError::InvalidInput(format!("profile {old} is already mapped")));
        }
        self.entries.insert(old, new);
        Ok(())
    }

    #[must_use]
    pub fn primary_old(&self) -> ProfileId {
        self.primary_old
    }

    #[must_use]
    pub fn primary_new(&self) -> ProfileId {
        self.primary_new
    }

    #[must_use]
    pub fn get(&self, old: ProfileId) -> Option<ProfileId> {
        self.entries.get(&old).copied()
    }

    #[must_use]
    pub fn contains_old(&self, id: ProfileId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Old ids whose rows survive the pass.
    #[must_use]
    pub fn retained_ids(&self) -> Vec<ProfileId> {
        self.entries.keys().copied().collect()
    }

    /// Final ids rows end up with after migration.
    #[must_use]
    pub fn live_ids(&self) -> BTreeSet<ProfileId> {
        self.entries.values().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProfileId, ProfileId)> + '_ {
        self.entries.iter().map(|(old, new)| (*old, *new))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn ensure_valid_profile_id(id: ProfileId) -> Result<(), RestoreError> {
    if id.0 < 0 {
        return Err(RestoreError::InvalidInput(format!("profile id {id} is negative")));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
pub struct MigrationStep {
    pub from: ProfileId,
    pub to: ProfileId,
}

/// Ordered relabel statements that move every row to its mapped profile id.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Default)]
pub struct MigrationPlan {
    pub steps: Vec<MigrationStep>,
    /// Final ids that were staged through a temporary slot.
    pub staged: Vec<ProfileId>,
}

impl MigrationPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Plan the relabeling of rows from old to new profile ids.
///
/// A target that is itself a pending source id would merge two profiles if written directly,
/// so those rows are parked in the target's temporary slot first and moved into place only
/// after every source has been vacated.
#[must_use]
pub fn plan_profile_migration(mapping: &ProfileMapping) -> MigrationPlan {
    let mut staged_steps = Vec::new();
    let mut direct_steps = Vec::new();
    let mut staged = BTreeSet::new();

    for (old, new) in mapping.iter() {
        if old == new {
            continue;
        }
        if mapping.contains_old(new) {
            staged_steps.push(MigrationStep { from: old, to: new.temp_slot() });
            staged.insert(new);
        } else {
            direct_steps.push(MigrationStep { from: old, to: new });
        }
    }

    let mut steps = staged_steps;
    steps.extend(direct_steps);
    steps.extend(staged.iter().map(|new| MigrationStep { from: new.temp_slot(), to: *new }));

    MigrationPlan { steps, staged: staged.into_iter().collect() }
}

/// Old screen index to compacted screen index, in ascending order of the old index.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Default)]
pub struct ScreenRemap {
    pub entries: Vec<(i64, i64)>,
}

impl ScreenRemap {
    #[must_use]
    pub fn apply(&self, screen: i64) -> Option<i64> {
        self.entries.iter().find(|(old, _)| *old == screen).map(|(_, new)| *new)
    }

    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.entries.iter().all(|(old, new)| old == new)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Close the gaps in a set of desktop screen indices, e.g. `[0, 3, 4, 6, 7] -> [0, 1, 2, 3, 4]`.
///
/// The range starts at 0 only when screen 0 was present, so a layout without a home
/// screen at 0 keeps starting at 1.
#[must_use]
pub fn plan_screen_compaction(distinct_screens: &[i64]) -> ScreenRemap {
    let screens: BTreeSet<i64> = distinct_screens.iter().copied().collect();
    let mut next = i64::from(!screens.contains(&0));
    let mut entries = Vec::with_capacity(screens.len());
    for screen in screens {
        entries.push((screen, next));
        next += 1;
    }
    ScreenRemap { entries }
}

/// Encode widget ids the way the backup agent stages them: comma-joined decimals.
#[must_use]
pub fn encode_id_list(ids: &[AppWidgetId]) -> String {
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
}

/// Parse a comma-joined widget id list; the empty string is the empty list.
///
/// # Errors
/// Returns an error when any element is not an integer.
pub fn parse_id_list(value: &str) -> Result<Vec<AppWidgetId>, RestoreError> {
    if value.trim().is_empty() {
        return Ok(Vec::new());
    }
    value
        .split(',')
        .map(|part| {
            part.trim().parse::<i32>().map(AppWidgetId).map_err(|err| {
                RestoreError::InvalidInput(format!("invalid widget id `{part}`: {err}"))
            })
        })
        .collect()
}

/// Two parallel widget id lists staged by the backup process.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct WidgetIdStaging {
    old: Vec<AppWidgetId>,
    new: Vec<AppWidgetId>,
}

impl WidgetIdStaging {
    /// # Errors
    /// Returns an error when the lists differ in length.
    pub fn new(old: Vec<AppWidgetId>, new: Vec<AppWidgetId>) -> Result<Self, RestoreError> {
        if old.len() != new.len() {
            return Err(RestoreError::InvalidInput(format!(
                "widget id lists differ in length: {} old vs {} new",
                old.len(),
                new.len()
            )));
        }
        Ok(Self { old, new })
    }

    #[must_use]
    pub fn old_ids(&self) -> &[AppWidgetId] {
        &self.old
    }

    #[must_use]
    pub fn new_ids(&self) -> &[AppWidgetId] {
        &self.new
    }

    pub fn pairs(&self) -> impl Iterator<Item = (AppWidgetId, AppWidgetId)> + '_ {
        self.old.iter().copied().zip(self.new.iter().copied())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.old.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RestoreState {
    Idle,
    Pending,
    Restoring,
    Committed,
    FallenBack,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RestoreEvent {
    /// A backup payload arrived and the pending flag was written.
    Marked,
    Started,
    Succeeded,
    Failed,
    /// The pending flag was removed.
    Cleared,
}

impl RestoreState {
    /// Advance the orchestrator state machine.
    ///
    /// # Errors
    /// Returns an error for transitions the restore lifecycle does not allow.
    pub fn on(self, event: RestoreEvent) -> Result<Self, RestoreError> {
        match (self, event) {
            (Self::Idle | Self::Pending, RestoreEvent::Marked) => Ok(Self::Pending),
            (Self::Pending, RestoreEvent::Started) => Ok(Self::Restoring),
            (Self::Restoring, RestoreEvent::Succeeded) => Ok(Self::Committed),
            (Self::Restoring, RestoreEvent::Failed) => Ok(Self::FallenBack),
            (Self::Committed | Self::FallenBack, RestoreEvent::Cleared) => Ok(Self::Idle),
            (state, event) => Err(RestoreError::InvalidInput(format!(
                "restore cannot handle {event:?} while {state:?}"
            ))),
        }
    }
}

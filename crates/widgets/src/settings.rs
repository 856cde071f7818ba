//! Label tables and defaults for every widget kind.
//!
//! Settings resolve in layers: built-in English defaults, then a JSON file, then
//! `BUBBLES_`-prefixed environment variables (`__` separates nested keys, for example
//! `BUBBLES_CHECKTABLE__CHOOSE=Pick`).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};

pub const SETTINGS_DIRECTORY_NAME: &str = "bubbles";
pub const SETTINGS_FILE_NAME: &str = "widgets.json";
pub const SETTINGS_ENV_PREFIX: &str = "BUBBLES_";

pub const LEFT_ARROW: &str = "⬅️";
pub const RIGHT_ARROW: &str = "➡️";
pub const CHECKBOX_CHECKED: &str = "☑";
pub const CHECKBOX_UNCHECKED: &str = "☐";

const DEFAULT_MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
const DEFAULT_WEEKDAYS: [&str; 7] = ["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarStrings {
    pub left_arrow: String,
    pub right_arrow: String,
    pub select_date: String,
    pub date_selected: String,
    /// January first.
    pub months: Vec<String>,
    /// Monday first.
    pub weekdays: Vec<String>,
}

impl Default for CalendarStrings {
    fn default() -> Self {
        Self {
            left_arrow: LEFT_ARROW.to_string(),
            right_arrow: RIGHT_ARROW.to_string(),
            select_date: "Select a date".to_string(),
            date_selected: "Date selected".to_string(),
            months: DEFAULT_MONTHS.iter().map(|name| name.to_string()).collect(),
            weekdays: DEFAULT_WEEKDAYS.iter().map(|name| name.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarouselStrings {
    pub left_arrow: String,
    pub right_arrow: String,
    /// Used when numbered labels are on; holds exactly two `{}`.
    pub left_numbered: String,
    pub right_numbered: String,
    /// Confirmation text; `{label}` and `{selected_val}` are substituted.
    pub selected_value_label: String,
}

impl Default for CarouselStrings {
    fn default() -> Self {
        Self {
            left_arrow: LEFT_ARROW.to_string(),
            right_arrow: RIGHT_ARROW.to_string(),
            left_numbered: format!("{LEFT_ARROW} ({{}}-{{}})"),
            right_numbered: format!("{RIGHT_ARROW} ({{}}-{{}})"),
            selected_value_label: "{label} {selected_val}".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecklistStrings {
    pub checked: String,
    pub unchecked: String,
}

impl Default for ChecklistStrings {
    fn default() -> Self {
        Self {
            checked: CHECKBOX_CHECKED.to_string(),
            unchecked: CHECKBOX_UNCHECKED.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecktableStrings {
    pub checked: String,
    pub unchecked: String,
    pub empty: String,
    pub fill: String,
    pub choose: String,
}

impl Default for ChecktableStrings {
    fn default() -> Self {
        Self {
            checked: CHECKBOX_CHECKED.to_string(),
            unchecked: CHECKBOX_UNCHECKED.to_string(),
            empty: "[Empty]".to_string(),
            fill: "Fill".to_string(),
            choose: "Choose".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationStrings {
    /// `{left_num}` and `{right_num}` receive the 1-based page bounds.
    pub backward_template: String,
    pub forward_template: String,
    /// Text of slots left over on a short last page.
    pub empty_message: String,
}

impl Default for PaginationStrings {
    fn default() -> Self {
        Self {
            backward_template: format!("{LEFT_ARROW} {{left_num}}-{{right_num}}"),
            forward_template: format!("{{left_num}}-{{right_num}} {RIGHT_ARROW}"),
            empty_message: "-".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetDefaults {
    pub carousel_displayed_count: usize,
    pub pagination_delay_ms: u64,
}

impl Default for WidgetDefaults {
    fn default() -> Self {
        Self {
            carousel_displayed_count: 3,
            pagination_delay_ms: 200,
        }
    }
}

impl WidgetDefaults {
    pub fn pagination_delay(&self) -> Duration {
        Duration::from_millis(self.pagination_delay_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetSettings {
    pub calendar: CalendarStrings,
    pub carousel: CarouselStrings,
    pub checklist: ChecklistStrings,
    pub checktable: ChecktableStrings,
    pub pagination: PaginationStrings,
    pub defaults: WidgetDefaults,
}

impl WidgetSettings {
    /// Repairs values that would make every widget fail validation.
    pub fn normalized(mut self) -> Self {
        let fallback = CalendarStrings::default();
        if self.calendar.months.len() != fallback.months.len() {
            tracing::warn!(
                configured = self.calendar.months.len(),
                "calendar month table must have 12 entries; using defaults"
            );
            self.calendar.months = fallback.months;
        }
        if self.calendar.weekdays.len() != fallback.weekdays.len() {
            tracing::warn!(
                configured = self.calendar.weekdays.len(),
                "calendar weekday table must have 7 entries; using defaults"
            );
            self.calendar.weekdays = fallback.weekdays;
        }

        self.defaults.carousel_displayed_count = self.defaults.carousel_displayed_count.max(1);
        self
    }
}

/// Resolved widget settings, read once per store and shared behind an `ArcSwap`.
pub struct SettingsStore {
    settings: Arc<ArcSwap<WidgetSettings>>,
    config_path: PathBuf,
}

impl SettingsStore {
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".bubbles"))
            .join(SETTINGS_FILE_NAME)
    }

    pub fn new(config_path: PathBuf) -> Self {
        let settings = resolve(&config_path);
        Self {
            settings: Arc::new(ArcSwap::from_pointee(settings)),
            config_path,
        }
    }

    pub fn load() -> Self {
        Self::new(Self::default_config_path())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> Arc<WidgetSettings> {
        self.settings.load_full()
    }

    /// Re-reads the layers; widgets built earlier keep the tables they were given.
    pub fn reload(&self) -> Arc<WidgetSettings> {
        let settings = Arc::new(resolve(&self.config_path));
        self.settings.store(settings.clone());
        settings
    }
}

fn resolve(path: &Path) -> WidgetSettings {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no widget settings file; built-in labels apply");
    }

    let figment = Figment::from(Serialized::defaults(WidgetSettings::default()))
        .merge(Json::file(path))
        .merge(Env::prefixed(SETTINGS_ENV_PREFIX).split("__"));

    match figment.extract::<WidgetSettings>() {
        Ok(settings) => settings.normalized(),
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                %error,
                "widget settings are unreadable; falling back to built-in labels"
            );
            WidgetSettings::default()
        }
    }
}

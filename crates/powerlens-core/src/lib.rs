pub mod error;
pub mod history;
pub mod logging;
pub mod report;

pub use error::Error;
pub use history::{History, HISTORY_LIMIT};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// --- Types (shared with the web UI) ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub enum SolutionType {
    #[default]
    PowerApps,
    PowerAutomate,
    PowerBi,
}

impl SolutionType {
    pub const ALL: [SolutionType; 3] = [
        SolutionType::PowerApps,
        SolutionType::PowerAutomate,
        SolutionType::PowerBi,
    ];

    /// Stable identifier used by the UI and in serialized history items.
    pub fn id(self) -> &'static str {
        match self {
            SolutionType::PowerApps => "powerApps",
            SolutionType::PowerAutomate => "powerAutomate",
            SolutionType::PowerBi => "powerBi",
        }
    }

    /// Full label, also used verbatim in the review prompt.
    pub fn label(self) -> &'static str {
        match self {
            SolutionType::PowerApps => "Power Apps (Power Fx)",
            SolutionType::PowerAutomate => "Power Automate (JSON/Logic)",
            SolutionType::PowerBi => "Power BI (DAX/M Query)",
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            SolutionType::PowerApps => "Power Apps",
            SolutionType::PowerAutomate => "Power Automate",
            SolutionType::PowerBi => "Power BI",
        }
    }

    pub fn placeholder(self) -> &'static str {
        match self {
            SolutionType::PowerApps => "Filter(MyDataSource, Status = \"Active\")",
            SolutionType::PowerAutomate => "{\n  \"inputs\": { ... }\n}",
            SolutionType::PowerBi => "Total Sales = SUM(Sales[Amount])",
        }
    }

    /// Guess the dialect of a file from its extension.
    pub fn from_extension(ext: &str) -> Option<SolutionType> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "fx" | "pa" | "yaml" | "yml" => Some(SolutionType::PowerApps),
            "json" => Some(SolutionType::PowerAutomate),
            "dax" | "msdax" | "m" | "pq" => Some(SolutionType::PowerBi),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<SolutionType> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(SolutionType::from_extension)
    }
}

impl fmt::Display for SolutionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SolutionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "powerapps" | "apps" | "powerfx" | "fx" => Ok(SolutionType::PowerApps),
            "powerautomate" | "automate" | "flow" => Ok(SolutionType::PowerAutomate),
            "powerbi" | "bi" | "dax" => Ok(SolutionType::PowerBi),
            _ => Err(format!(
                "unknown solution type '{s}' (expected power-apps, power-automate or power-bi)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum IssueCategory {
    Logic,
    Performance,
    #[serde(rename = "Best Practice")]
    BestPractice,
    Security,
    Accessibility,
}

impl IssueCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueCategory::Logic => "Logic",
            IssueCategory::Performance => "Performance",
            IssueCategory::BestPractice => "Best Practice",
            IssueCategory::Security => "Security",
            IssueCategory::Accessibility => "Accessibility",
        }
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Issue severity. Variants are declared from least to most severe so that
/// `Ord` ranks `Critical` highest.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Critical => "Critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisIssue {
    pub id: String,
    pub category: IssueCategory,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub recommendation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthBand {
    Good,
    Fair,
    Poor,
}

impl HealthBand {
    pub fn from_score(score: u8) -> HealthBand {
        if score > 80 {
            HealthBand::Good
        } else if score > 50 {
            HealthBand::Fair
        } else {
            HealthBand::Poor
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub summary: String,
    /// Overall health score, 0-100.
    pub score: u8,
    pub issues: Vec<AnalysisIssue>,
    pub optimized_code: String,
}

impl AnalysisResult {
    pub fn health(&self) -> HealthBand {
        HealthBand::from_score(self.score)
    }

    /// Counts of (critical, warning, info) issues.
    pub fn count_by_severity(&self) -> (usize, usize, usize) {
        self.issues
            .iter()
            .fold((0, 0, 0), |(c, w, i), issue| match issue.severity {
                Severity::Critical => (c + 1, w, i),
                Severity::Warning => (c, w + 1, i),
                Severity::Info => (c, w, i + 1),
            })
    }
}

const PREVIEW_CHARS: usize = 40;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: String,
    /// Unix timestamp in milliseconds.
    pub timestamp: i64,
    pub solution_type: SolutionType,
    pub input: String,
    pub result: AnalysisResult,
}

impl HistoryItem {
    /// First line-ish of the input for list display.
    pub fn preview(&self) -> String {
        let mut chars = self.input.trim_start().chars();
        let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
        if chars.next().is_some() {
            format!("{head}...")
        } else {
            head
        }
    }
}

// --- Storage ---

/// Resolve the PowerLens data directory (~/.powerlens/).
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".powerlens")
}

// --- AI Settings ---

pub const DEFAULT_PROVIDER: &str = "google";
pub const DEFAULT_MODEL: &str = "gemini-3-pro-preview";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Environment variables consulted, in order, when the settings file has no key.
pub const API_KEY_ENV_VARS: [&str; 2] = ["POWERLENS_API_KEY", "API_KEY"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AiSettings {
    pub provider: String,
    pub api_key: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            base_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl AiSettings {
    /// Fill an empty API key from the environment.
    pub fn with_env_key(self) -> Self {
        self.with_key_from(|var| std::env::var(var).ok())
    }

    /// Fill an empty API key from the first non-blank [`API_KEY_ENV_VARS`] entry
    /// that `lookup` resolves.
    pub fn with_key_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if self.api_key.trim().is_empty() {
            if let Some(key) = API_KEY_ENV_VARS
                .iter()
                .filter_map(|var| lookup(var))
                .find(|v| !v.trim().is_empty())
            {
                self.api_key = key.trim().to_string();
            }
        }
        self
    }
}

pub fn settings_path() -> PathBuf {
    data_dir().join("settings.json")
}

/// Read settings from the default location, falling back to the environment for the key.
pub fn read_settings() -> AiSettings {
    read_settings_from(&settings_path()).with_env_key()
}

/// Read settings from `path`. A missing or unreadable file yields defaults.
pub fn read_settings_from(path: &Path) -> AiSettings {
    if !path.exists() {
        return AiSettings::default();
    }
    match fs::read_to_string(path).map(|s| serde_json::from_str::<AiSettings>(&s)) {
        Ok(Ok(settings)) => settings,
        Ok(Err(e)) => {
            tracing::warn!("ignoring malformed settings at {}: {e}", path.display());
            AiSettings::default()
        }
        Err(e) => {
            tracing::warn!("could not read settings at {}: {e}", path.display());
            AiSettings::default()
        }
    }
}

pub fn write_settings(settings: &AiSettings) -> Result<(), Error> {
    write_settings_to(&settings_path(), settings)
}

/// Write settings atomically (temp file + rename).
pub fn write_settings_to(path: &Path, settings: &AiSettings) -> Result<(), Error> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn ai_configured(settings: &AiSettings) -> bool {
    !settings.provider.is_empty()
        && !settings.model.is_empty()
        && (settings.provider == "ollama" || !settings.api_key.is_empty())
}

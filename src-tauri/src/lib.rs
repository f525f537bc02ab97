use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use powerlens_core::{AiSettings, AnalysisResult, History, HistoryItem, SolutionType};
use serde::Serialize;
use tauri::{AppHandle, State};
use tauri_plugin_dialog::DialogExt;

/// Managed state wrapping the AI settings as stored on disk (no env key applied).
struct SettingsState(Mutex<AiSettings>);

/// Recent analyses for this session.
struct HistoryState(Mutex<History>);

/// Set while an analysis request is in flight; only one may run at a time.
#[derive(Default)]
struct PendingAnalysis(AtomicBool);

struct PendingGuard<'a>(&'a AtomicBool);

impl PendingAnalysis {
    fn try_begin(&self) -> Option<PendingGuard<'_>> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PendingGuard(&self.0))
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SolutionTypeInfo {
    id: &'static str,
    label: &'static str,
    short_name: &'static str,
    placeholder: &'static str,
}

impl From<SolutionType> for SolutionTypeInfo {
    fn from(t: SolutionType) -> Self {
        Self {
            id: t.id(),
            label: t.label(),
            short_name: t.short_name(),
            placeholder: t.placeholder(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HistorySummary {
    id: String,
    timestamp: i64,
    solution_type: SolutionType,
    preview: String,
    score: u8,
}

impl From<&HistoryItem> for HistorySummary {
    fn from(item: &HistoryItem) -> Self {
        Self {
            id: item.id.clone(),
            timestamp: item.timestamp,
            solution_type: item.solution_type,
            preview: item.preview(),
            score: item.result.score,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoadedSource {
    code: String,
    solution_type: Option<SolutionType>,
    file_name: Option<String>,
}

#[tauri::command]
fn solution_types() -> Vec<SolutionTypeInfo> {
    SolutionType::ALL.into_iter().map(SolutionTypeInfo::from).collect()
}

#[tauri::command]
async fn analyze_code(
    solution_type: SolutionType,
    code: String,
    settings: State<'_, SettingsState>,
    history: State<'_, HistoryState>,
    pending: State<'_, PendingAnalysis>,
) -> Result<AnalysisResult, String> {
    let Some(_guard) = pending.try_begin() else {
        return Err("An analysis is already in progress".to_string());
    };

    let settings = settings
        .0
        .lock()
        .map_err(|e| e.to_string())?
        .clone()
        .with_env_key();

    let result = powerlens_review::analyze(solution_type, &code, &settings)
        .await
        .map_err(|e| e.to_string())?;

    let item = history
        .0
        .lock()
        .map_err(|e| e.to_string())?
        .record(solution_type, &code, result.clone());
    tracing::debug!("recorded history item {}", item.id);

    Ok(result)
}

#[tauri::command]
fn list_history(history: State<'_, HistoryState>) -> Result<Vec<HistorySummary>, String> {
    let history = history.0.lock().map_err(|e| e.to_string())?;
    Ok(history.items().map(HistorySummary::from).collect())
}

#[tauri::command]
fn load_history_item(id: String, history: State<'_, HistoryState>) -> Result<HistoryItem, String> {
    let history = history.0.lock().map_err(|e| e.to_string())?;
    history
        .get(&id)
        .cloned()
        .ok_or_else(|| format!("history item {id} not found"))
}

#[tauri::command]
fn get_ai_settings(state: State<'_, SettingsState>) -> Result<serde_json::Value, String> {
    let settings = state.0.lock().map_err(|e| e.to_string())?.clone();
    let effective = settings.clone().with_env_key();
    // Mask API key, only send whether it is set
    Ok(serde_json::json!({
        "provider": settings.provider,
        "model": settings.model,
        "baseUrl": settings.base_url,
        "hasKey": !effective.api_key.is_empty(),
        "configured": powerlens_core::ai_configured(&effective),
    }))
}

#[tauri::command]
fn save_ai_settings(
    provider: String,
    api_key: String,
    model: String,
    base_url: Option<String>,
    state: State<'_, SettingsState>,
) -> Result<(), String> {
    let mut settings = state.0.lock().map_err(|e| e.to_string())?;
    apply_settings_update(&mut settings, &provider, &api_key, &model, base_url);
    powerlens_core::write_settings(&settings).map_err(|e| e.to_string())?;
    tracing::info!(provider = %settings.provider, model = %settings.model, "AI settings saved");
    Ok(())
}

fn apply_settings_update(
    settings: &mut AiSettings,
    provider: &str,
    api_key: &str,
    model: &str,
    base_url: Option<String>,
) {
    settings.provider = provider.trim().to_string();
    settings.model = model.trim().to_string();
    settings.base_url = base_url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());
    // Empty key means "keep existing"
    if !api_key.trim().is_empty() {
        settings.api_key = api_key.trim().to_string();
    }
}

#[tauri::command]
async fn open_source_file(app: AppHandle) -> Result<Option<LoadedSource>, String> {
    let picked = app
        .dialog()
        .file()
        .add_filter(
            "Power Platform source",
            &["fx", "pa", "yaml", "yml", "json", "dax", "msdax", "m", "pq", "txt"],
        )
        .blocking_pick_file();
    let Some(picked) = picked else {
        return Ok(None);
    };
    let path: PathBuf = picked.into_path().map_err(|e| e.to_string())?;
    let code = std::fs::read_to_string(&path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    tracing::info!("loaded source from {}", path.display());
    Ok(Some(LoadedSource {
        code,
        solution_type: SolutionType::from_path(&path),
        file_name: path.file_name().map(|n| n.to_string_lossy().to_string()),
    }))
}

#[tauri::command]
async fn save_optimized_code(
    code: String,
    solution_type: SolutionType,
    app: AppHandle,
) -> Result<bool, String> {
    let picked = app
        .dialog()
        .file()
        .set_file_name(default_file_name(solution_type))
        .blocking_save_file();
    let Some(picked) = picked else {
        return Ok(false);
    };
    let path: PathBuf = picked.into_path().map_err(|e| e.to_string())?;
    std::fs::write(&path, code).map_err(|e| format!("Failed to write {}: {e}", path.display()))?;
    tracing::info!("saved optimized code to {}", path.display());
    Ok(true)
}

fn default_file_name(solution_type: SolutionType) -> &'static str {
    match solution_type {
        SolutionType::PowerApps => "optimized.fx",
        SolutionType::PowerAutomate => "optimized.json",
        SolutionType::PowerBi => "optimized.dax",
    }
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    if let Err(e) = powerlens_core::logging::init_logging() {
        powerlens_core::logging::init_logging_stderr();
        tracing::warn!("file logging unavailable, using stderr: {e}");
    }

    let settings = powerlens_core::read_settings_from(&powerlens_core::settings_path());

    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .manage(SettingsState(Mutex::new(settings)))
        .manage(HistoryState(Mutex::new(History::new())))
        .manage(PendingAnalysis::default())
        .invoke_handler(tauri::generate_handler![
            solution_types,
            analyze_code,
            list_history,
            load_history_item,
            get_ai_settings,
            save_ai_settings,
            open_source_file,
            save_optimized_code,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}

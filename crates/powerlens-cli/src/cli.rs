use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use powerlens_core::{AiSettings, SolutionType};

/// Top-level CLI for PowerLens.
#[derive(Debug, Parser)]
#[command(name = "powerlens")]
#[command(about = "AI code review for Power Apps, Power Automate and Power BI", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Review a file (or stdin) and print the findings.
    Analyze {
        /// Dialect: power-apps, power-automate or power-bi. Guessed from the file extension when omitted.
        #[arg(long = "type", short = 't')]
        solution_type: Option<SolutionType>,

        /// Print the raw analysis as JSON instead of a text report.
        #[arg(long)]
        json: bool,

        /// Source file; reads stdin when omitted or "-".
        file: Option<PathBuf>,
    },

    /// Show or change the AI provider settings.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Print the JSON schema the model is asked to follow.
    Schema,
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the current settings (API key masked).
    Show,

    /// Update one or more settings.
    Set {
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        api_key: Option<String>,
        /// Custom endpoint, e.g. a local Ollama server. Pass "" to clear.
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Analyze {
            solution_type,
            json,
            file,
        } => analyze(solution_type, json, file)
            .await
            .context("Analysis failed"),
        Command::Config { action } => config(action),
        Command::Schema => {
            let schema = powerlens_review::schema::response_schema();
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
    }
}

async fn analyze(solution_type: Option<SolutionType>, json: bool, file: Option<PathBuf>) -> Result<()> {
    let (code, guessed) = match file.as_deref() {
        Some(path) if path.as_os_str() != "-" => {
            let code = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            (code, SolutionType::from_path(path))
        }
        _ => {
            let mut code = String::new();
            std::io::stdin()
                .read_to_string(&mut code)
                .context("failed to read stdin")?;
            (code, None)
        }
    };
    let solution_type = solution_type.or(guessed).unwrap_or_default();

    if code.trim().is_empty() {
        bail!("no code to analyze");
    }

    let settings = powerlens_core::read_settings();
    let result = powerlens_review::analyze(solution_type, &code, &settings).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", powerlens_core::report::render(solution_type, &result));
    }
    Ok(())
}

fn config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let settings = powerlens_core::read_settings();
            println!("{}", describe(&settings));
            Ok(())
        }
        ConfigAction::Set {
            provider,
            model,
            api_key,
            base_url,
            timeout_secs,
        } => {
            let path = powerlens_core::settings_path();
            let mut settings = powerlens_core::read_settings_from(&path);
            apply(&mut settings, provider, model, api_key, base_url, timeout_secs);
            powerlens_core::write_settings_to(&path, &settings)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!("settings saved to {}", path.display());
            println!("{}", describe(&settings));
            Ok(())
        }
    }
}

fn apply(
    settings: &mut AiSettings,
    provider: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
) {
    if let Some(p) = provider {
        settings.provider = p;
    }
    if let Some(m) = model {
        settings.model = m;
    }
    if let Some(k) = api_key.filter(|k| !k.is_empty()) {
        settings.api_key = k;
    }
    if let Some(url) = base_url {
        settings.base_url = Some(url).filter(|u| !u.is_empty());
    }
    if let Some(t) = timeout_secs {
        settings.timeout_secs = t;
    }
}

fn describe(settings: &AiSettings) -> String {
    format!(
        "provider:   {}\nmodel:      {}\napi key:    {}\nbase url:   {}\ntimeout:    {}s\nconfigured: {}",
        settings.provider,
        settings.model,
        if settings.api_key.is_empty() { "(not set)" } else { "(set)" },
        settings.base_url.as_deref().unwrap_or("(default)"),
        settings.timeout_secs,
        powerlens_core::ai_configured(settings),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_analyze_with_type_and_file() {
        let cli = Cli::try_parse_from(["powerlens", "analyze", "-t", "power-bi", "--json", "m.dax"]).unwrap();
        match cli.command {
            Command::Analyze {
                solution_type,
                json,
                file,
            } => {
                assert_eq!(solution_type, Some(SolutionType::PowerBi));
                assert!(json);
                assert_eq!(file, Some(PathBuf::from("m.dax")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_solution_type() {
        assert!(Cli::try_parse_from(["powerlens", "analyze", "--type", "excel"]).is_err());
    }

    #[test]
    fn parses_config_set() {
        let cli = Cli::try_parse_from([
            "powerlens", "config", "set", "--provider", "openai", "--model", "gpt-4o",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Config {
                action: ConfigAction::Set { provider: Some(_), model: Some(_), api_key: None, .. }
            }
        ));
    }

    #[tokio::test]
    async fn unreadable_file_reports_analysis_failed() {
        let missing = std::env::temp_dir().join("powerlens-missing-dir").join("nope.fx");
        let cli = Cli::try_parse_from(["powerlens", "analyze", missing.to_str().unwrap()]).unwrap();
        let err = run(cli).await.unwrap_err();
        let message = format!("{err:#}");
        assert!(message.starts_with("Analysis failed: failed to read"), "{message}");
        assert_eq!(message.matches("Analysis failed").count(), 1);
    }

    #[test]
    fn apply_keeps_existing_key_and_clears_base_url() {
        let mut settings = AiSettings {
            api_key: "old".into(),
            base_url: Some("http://localhost:11434".into()),
            ..AiSettings::default()
        };
        apply(&mut settings, Some("ollama".into()), None, Some(String::new()), Some(String::new()), None);
        assert_eq!(settings.provider, "ollama");
        assert_eq!(settings.api_key, "old");
        assert_eq!(settings.base_url, None);
    }

    #[test]
    fn describe_masks_the_key() {
        let settings = AiSettings {
            api_key: "sk-secret".into(),
            ..AiSettings::default()
        };
        let text = describe(&settings);
        assert!(!text.contains("sk-secret"));
        assert!(text.contains("api key:    (set)"));
    }
}

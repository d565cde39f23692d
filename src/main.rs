//! PM Dashboard Core - command-line driver
//!
//! Thin wrapper over `api::commands::Dashboard`; every command prints JSON.

use pm_core::api::Dashboard;
use pm_core::constants;
use pm_core::logic::monitor::StartOutcome;
use pm_core::logic::storage::Settings;
use serde::Serialize;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    Command(String),
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidInput(_) => 2,
            _ => 1,
        }
    }
}

enum Command {
    Predict { id: Option<String>, fields: Vec<(String, String)> },
    Batch { input: PathBuf, output: Option<PathBuf> },
    Explore { input: PathBuf, feature: Option<String>, bins: Option<usize> },
    Monitor { duration: Option<Duration> },
    History { limit: Option<usize>, clear: bool, export: Option<PathBuf> },
    SettingsGet,
    SettingsSet { key: String, value: String },
    Status,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run().await {
        eprintln!("error: {}", e);
        process::exit(e.exit_code());
    }
}

async fn run() -> Result<(), CliError> {
    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = parse_command(&args)? else {
        print_help();
        return Ok(());
    };

    let dashboard: Dashboard = Dashboard::open_default().map_err(CliError::Command)?;

    match command {
        Command::Predict { id, fields } => {
            let record = dashboard.submit_form(&fields, id).await.map_err(CliError::Command)?;
            print_json(&record)?;
        }
        Command::Batch { input, output } => {
            let report = dashboard.run_batch_file(&input).await;
            if let Some(path) = output {
                fs::write(&path, report.to_csv())?;
                log::info!("Batch report written to {}", path.display());
            }
            print_json(&report)?;
        }
        Command::Explore { input, feature, bins } => {
            print_json(&dashboard.explore_file(&input, feature.as_deref(), bins))?;
        }
        Command::Monitor { duration } => {
            match dashboard.start_monitoring() {
                StartOutcome::Refused => {
                    print_json(&dashboard.get_alerts())?;
                    return Err(CliError::Command("auto-refresh is disabled in settings".to_string()));
                }
                outcome => log::info!("Monitoring: {:?} (Ctrl+C to stop)", outcome),
            }

            match duration {
                Some(d) => {
                    tokio::select! {
                        _ = tokio::time::sleep(d) => {}
                        _ = tokio::signal::ctrl_c() => {}
                    }
                }
                None => {
                    tokio::signal::ctrl_c().await?;
                }
            }

            dashboard.stop_monitoring();
            print_json(&serde_json::json!({
                "monitor": dashboard.monitor_status(),
                "alerts": dashboard.get_alerts(),
            }))?;
        }
        Command::History { limit, clear, export } => {
            if let Some(path) = export {
                let count = dashboard.export_history_to(&path).map_err(CliError::Command)?;
                log::info!("Exported {} records to {}", count, path.display());
            }
            if clear {
                dashboard.clear_history();
            } else {
                print_json(&dashboard.get_history(limit))?;
            }
        }
        Command::SettingsGet => print_json(&dashboard.get_settings())?,
        Command::SettingsSet { key, value } => {
            let settings = apply_setting(dashboard.get_settings(), &key, &value)?;
            dashboard.save_settings(&settings);
            print_json(&settings)?;
        }
        Command::Status => print_json(&dashboard.get_status().await)?,
    }

    Ok(())
}

fn parse_command(args: &[String]) -> Result<Option<Command>, CliError> {
    let Some(name) = args.first() else {
        return Ok(None);
    };
    let rest = &args[1..];

    let command = match name.as_str() {
        "-h" | "--help" | "help" => return Ok(None),
        "predict" => parse_predict(rest)?,
        "batch" => {
            let (input, flags) = split_positional(rest, "batch <file.csv>")?;
            let mut output = None;
            let mut idx = 0;
            while idx < flags.len() {
                let (flag, inline) = split_flag(&flags[idx])?;
                match flag {
                    "--out" => output = Some(PathBuf::from(take_flag_value(flag, inline, flags, &mut idx)?)),
                    other => return Err(unknown_flag(other)),
                }
                idx += 1;
            }
            Command::Batch { input, output }
        }
        "explore" => {
            let (input, flags) = split_positional(rest, "explore <file.csv>")?;
            let mut feature = None;
            let mut bins = None;
            let mut idx = 0;
            while idx < flags.len() {
                let (flag, inline) = split_flag(&flags[idx])?;
                match flag {
                    "--feature" => feature = Some(take_flag_value(flag, inline, flags, &mut idx)?),
                    "--bins" => {
                        let raw = take_flag_value(flag, inline, flags, &mut idx)?;
                        bins = Some(parse_number::<usize>(&raw, flag)?);
                    }
                    other => return Err(unknown_flag(other)),
                }
                idx += 1;
            }
            Command::Explore { input, feature, bins }
        }
        "monitor" => {
            let mut duration = None;
            let mut idx = 0;
            while idx < rest.len() {
                let (flag, inline) = split_flag(&rest[idx])?;
                match flag {
                    "--duration" => {
                        let raw = take_flag_value(flag, inline, rest, &mut idx)?;
                        duration = Some(Duration::from_secs(parse_number::<u64>(&raw, flag)?));
                    }
                    other => return Err(unknown_flag(other)),
                }
                idx += 1;
            }
            Command::Monitor { duration }
        }
        "history" => {
            let (mut limit, mut clear, mut export) = (None, false, None);
            let mut idx = 0;
            while idx < rest.len() {
                let (flag, inline) = split_flag(&rest[idx])?;
                match flag {
                    "--limit" => {
                        let raw = take_flag_value(flag, inline, rest, &mut idx)?;
                        limit = Some(parse_number::<usize>(&raw, flag)?);
                    }
                    "--clear" => clear = true,
                    "--export" => export = Some(PathBuf::from(take_flag_value(flag, inline, rest, &mut idx)?)),
                    other => return Err(unknown_flag(other)),
                }
                idx += 1;
            }
            Command::History { limit, clear, export }
        }
        "settings" => match rest {
            [] => Command::SettingsGet,
            [get] if get == "get" => Command::SettingsGet,
            [set, key, value] if set == "set" => Command::SettingsSet {
                key: key.clone(),
                value: value.clone(),
            },
            _ => return Err(CliError::invalid_input("usage: settings [get | set <key> <value>]")),
        },
        "status" => Command::Status,
        other => return Err(CliError::invalid_input(format!("unknown command '{}'", other))),
    };

    Ok(Some(command))
}

fn parse_predict(tokens: &[String]) -> Result<Command, CliError> {
    let mut id = None;
    let mut fields = Vec::new();
    let mut idx = 0;

    while idx < tokens.len() {
        let token = &tokens[idx];
        if token.starts_with("--") {
            let (flag, inline) = split_flag(token)?;
            match flag {
                "--id" => id = Some(take_flag_value(flag, inline, tokens, &mut idx)?),
                other => return Err(unknown_flag(other)),
            }
        } else {
            let (name, value) = token
                .split_once('=')
                .ok_or_else(|| CliError::invalid_input(format!("expected name=value, got '{}'", token)))?;
            fields.push((name.to_string(), value.to_string()));
        }
        idx += 1;
    }

    if fields.is_empty() {
        return Err(CliError::invalid_input(
            "predict requires readings, e.g. sensor_1=50 sensor_2=80 sensor_3=100",
        ));
    }
    Ok(Command::Predict { id, fields })
}

fn apply_setting(mut settings: Settings, key: &str, value: &str) -> Result<Settings, CliError> {
    match key {
        "apiBase" => settings.api_base = value.to_string(),
        "darkTheme" => settings.dark_theme = parse_bool(value, key)?,
        "alertThreshold" => {
            let percent = parse_number::<f64>(value, key)?;
            if !(0.0..=100.0).contains(&percent) {
                return Err(CliError::invalid_input("alertThreshold must be between 0 and 100"));
            }
            settings.alert_threshold = percent;
        }
        "autoRefresh" => settings.auto_refresh = parse_bool(value, key)?,
        other => {
            return Err(CliError::invalid_input(format!(
                "unknown setting '{}' (apiBase, darkTheme, alertThreshold, autoRefresh)",
                other
            )))
        }
    }
    Ok(settings)
}

fn split_positional<'a>(tokens: &'a [String], usage: &str) -> Result<(PathBuf, &'a [String]), CliError> {
    match tokens.split_first() {
        Some((first, rest)) if !first.starts_with("--") => Ok((PathBuf::from(first), rest)),
        _ => Err(CliError::invalid_input(format!("usage: {}", usage))),
    }
}

fn split_flag(token: &str) -> Result<(&str, Option<String>), CliError> {
    if !token.starts_with("--") {
        return Err(CliError::invalid_input(format!(
            "unexpected argument '{}'; expected --flag value",
            token
        )));
    }
    if let Some((flag, value)) = token.split_once('=') {
        return Ok((flag, Some(value.to_string())));
    }
    Ok((token, None))
}

fn take_flag_value(
    flag: &str,
    inline: Option<String>,
    tokens: &[String],
    idx: &mut usize,
) -> Result<String, CliError> {
    if let Some(value) = inline {
        return Ok(value);
    }

    *idx += 1;
    match tokens.get(*idx) {
        Some(value) if !value.starts_with("--") => Ok(value.clone()),
        _ => Err(CliError::invalid_input(format!("{} requires a value", flag))),
    }
}

fn unknown_flag(flag: &str) -> CliError {
    CliError::invalid_input(format!("unknown option '{}'", flag))
}

fn parse_number<T: std::str::FromStr>(raw: &str, name: &str) -> Result<T, CliError> {
    raw.trim()
        .parse()
        .map_err(|_| CliError::invalid_input(format!("{} expects a number, got '{}'", name, raw)))
}

fn parse_bool(raw: &str, name: &str) -> Result<bool, CliError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "1" | "yes" => Ok(true),
        "false" | "off" | "0" | "no" => Ok(false),
        _ => Err(CliError::invalid_input(format!("{} expects true or false, got '{}'", name, raw))),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_help() {
    println!("{} v{}", constants::APP_NAME, constants::APP_VERSION);
    println!();
    println!("Usage: pm-core <command> [options]");
    println!();
    println!("Commands:");
    println!("  predict [--id <id>] sensor_1=<v> sensor_2=<v> sensor_3=<v>");
    println!("  batch <file.csv> [--out <report.csv>]");
    println!("  explore <file.csv> [--feature <name>] [--bins <n>]");
    println!("  monitor [--duration <secs>]");
    println!("  history [--limit <n>] [--export <file.csv>] [--clear]");
    println!("  settings [get | set <key> <value>]");
    println!("  status");
    println!();
    println!("Environment: PM_API_BASE_URL, PM_DATA_DIR, PM_HISTORY_LIMIT,");
    println!("             PM_MONITOR_PERIOD_SECS, PM_REQUEST_TIMEOUT_SECS, RUST_LOG");
}

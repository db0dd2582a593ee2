//! Small helpers shared by the binaries: env loading, logging setup and
//! `--flag value` / `--flag=value` argument lookup.

use std::path::PathBuf;

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::config::PipelineConfig;
use crate::store;

pub fn load_env() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

/// Log to stderr, filtered by `RUST_LOG` (info when unset).
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

pub fn args() -> Vec<String> {
    std::env::args().skip(1).collect()
}

/// Value of `--name value` or `--name=value`; blank values are ignored.
pub fn arg_value(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
            && !next.starts_with("--")
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

pub fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|a| a == name)
}

pub fn parse_arg<T: std::str::FromStr>(args: &[String], name: &str) -> Result<Option<T>> {
    let Some(raw) = arg_value(args, name) else {
        return Ok(None);
    };
    raw.parse::<T>()
        .map(Some)
        .map_err(|_| anyhow::anyhow!("invalid value for {name}: {raw:?}"))
}

/// First argument that is neither a flag nor a flag's value.
pub fn positional(args: &[String], value_flags: &[&str]) -> Option<String> {
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg.starts_with("--") {
            skip_next = value_flags.contains(&arg.as_str());
            continue;
        }
        return Some(arg.clone());
    }
    None
}

pub fn parse_db_path_arg(args: &[String]) -> Option<PathBuf> {
    arg_value(args, "--db").map(PathBuf::from)
}

/// Environment config with the `--db` override applied, plus an open store.
pub fn open_store(args: &[String]) -> Result<(PipelineConfig, Connection)> {
    let mut config = PipelineConfig::from_env().context("load configuration")?;
    if let Some(path) = parse_db_path_arg(args) {
        config.db_path = path;
    }
    let conn = store::open_db(&config.db_path)?;
    Ok((config, conn))
}

pub fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reads_both_flag_forms() {
        let args = argv(&["--db=/tmp/a.sqlite", "--date", "2024-05-01", "--n", "--x"]);
        assert_eq!(parse_db_path_arg(&args), Some(PathBuf::from("/tmp/a.sqlite")));
        assert_eq!(arg_value(&args, "--date").as_deref(), Some("2024-05-01"));
        assert_eq!(arg_value(&args, "--n"), None);
        assert!(has_flag(&args, "--x"));
    }

    #[test]
    fn positional_skips_flag_values() {
        let args = argv(&["--db", "x.sqlite", "dump.json", "--predictions", "p.json"]);
        assert_eq!(positional(&args, &["--db", "--predictions"]).as_deref(), Some("dump.json"));
    }

    #[test]
    fn bad_numbers_are_errors() {
        let args = argv(&["--n", "three"]);
        assert!(parse_arg::<usize>(&args, "--n").is_err());
        assert_eq!(parse_arg::<usize>(&argv(&[]), "--n").unwrap(), None);
    }
}

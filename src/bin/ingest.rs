use std::path::PathBuf;

use anyhow::{Context, Result};

use odds_signals::{cli, pipeline};

fn main() -> Result<()> {
    cli::load_env();
    cli::init_tracing();

    let args = cli::args();
    let dump = cli::positional(&args, &["--db", "--predictions"])
        .map(PathBuf::from)
        .context("usage: ingest <dump.json> [--predictions <manual.json>] [--db <path>]")?;
    let (config, mut conn) = cli::open_store(&args)?;

    let written = pipeline::ingest_file(&mut conn, &dump, config.thresholds)?;

    println!("Ingest complete");
    println!("DB: {}", config.db_path.display());
    println!("Dump: {}", dump.display());
    println!("Matches upserted: {written}");

    if let Some(path) = cli::arg_value(&args, "--predictions") {
        let imported = pipeline::import_manual(&conn, &PathBuf::from(&path))?;
        println!("Manual predictions stored: {imported}");
    }
    Ok(())
}

use anyhow::Result;

use odds_signals::{cli, pipeline};

fn main() -> Result<()> {
    cli::load_env();
    cli::init_tracing();

    let args = cli::args();
    let (config, mut conn) = cli::open_store(&args)?;
    let counts = pipeline::relabel_all(&mut conn, config.thresholds)?;

    let total: usize = counts.values().sum();
    println!("Relabelled {total} matches in {}", config.db_path.display());
    let mut rows = counts.into_iter().collect::<Vec<_>>();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    for (label, count) in rows {
        let share = if total == 0 {
            0.0
        } else {
            count as f64 / total as f64 * 100.0
        };
        println!("{label:<22} {count:>6} {share:>6.1}%");
    }
    Ok(())
}

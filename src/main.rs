use anyhow::{Context, Result};
use clap::Parser;
use rna_clique_core::config::{Cli, RunConfig};
use rna_clique_core::run;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let config = RunConfig::from_cli(&cli).context("invalid configuration")?;

    let report = run::run(&config).context("run failed")?;

    if !report.failures.is_empty() {
        log::error!("{} pair(s) failed:", report.failures.len());
        for failure in &report.failures {
            log::error!("  {failure}");
        }
    }

    if report.ideal_component_count == 0 && config.samples.len() >= 2 {
        log::warn!(
            "no ideal components found across {} samples; every off-diagonal entry in the \
             distance matrix is undefined",
            config.samples.len()
        );
    }

    Ok(())
}

/// Map `--quiet`/`-v`/`-vv` onto a `log::LevelFilter`, matching the
/// teacher's own `log`/`env_logger` pair rather than relying on `RUST_LOG`
/// alone (§4.I).
fn init_logging(cli: &Cli) {
    let level = if cli.quiet {
        log::LevelFilter::Warn
    } else {
        match cli.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new().filter_level(level).init();
}

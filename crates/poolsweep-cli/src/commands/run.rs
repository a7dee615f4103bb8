//! Run command - execute the sweep.

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, Table};
use owo_colors::OwoColorize;
use poolsweep_core::{DefaultStoreFactory, RunConfig, Sweep, SweepSummary};
use std::io::IsTerminal;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::cli::RunArgs;

pub fn execute(args: &RunArgs) -> Result<SweepSummary> {
    let config = args.config()?;
    let plan = args
        .sweep
        .matrix(&config)
        .plan()
        .context("Failed to expand the workload matrix")?;

    print_banner(&config, &args.sweep.stores, plan.len());

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        if flag.swap(true, Ordering::SeqCst) {
            return;
        }
        eprintln!("\nReceived interrupt, finishing the current tick...");
    })
    .context("Failed to set signal handler")?;

    let factory = DefaultStoreFactory::new(&config.host, args.connection_settings());
    let sweep = Sweep::new(config, Box::new(factory)).with_shutdown(shutdown);
    let summary = sweep.run(&plan).with_context(|| {
        format!(
            "Sweep aborted: cannot write artifacts under {}",
            sweep.sink().root().display()
        )
    })?;

    print_summary(&summary);
    Ok(summary)
}

/// One-line banner with the sweep size.
fn print_banner(config: &RunConfig, stores: &[poolsweep_core::StoreKind], runs: usize) {
    let stores = stores
        .iter()
        .map(|s| s.name())
        .collect::<Vec<_>>()
        .join(", ");

    eprintln!();
    if std::io::stderr().is_terminal() {
        eprintln!(
            "{}: {} runs on {} ({}) - {} ticks of {:?}",
            "poolsweep".cyan().bold(),
            runs,
            config.host,
            stores,
            config.observation_ticks,
            config.tick
        );
    } else {
        eprintln!(
            "poolsweep: {} runs on {} ({}) - {} ticks of {:?}",
            runs, config.host, stores, config.observation_ticks, config.tick
        );
    }
    eprintln!();
}

fn print_summary(summary: &SweepSummary) {
    let mut table = Table::new();
    table.set_header(vec!["Completed", "Skipped", "Failed", "Status"]);
    let status = if summary.interrupted {
        Cell::new("interrupted").fg(Color::Yellow)
    } else if summary.failed > 0 {
        Cell::new("finished with failures").fg(Color::Red)
    } else {
        Cell::new("finished").fg(Color::Green)
    };
    table.add_row(vec![
        Cell::new(summary.completed),
        Cell::new(summary.skipped),
        Cell::new(summary.failed),
        status,
    ]);
    println!("{table}");

    for path in &summary.artifacts {
        println!("  {}", path.display());
    }
}

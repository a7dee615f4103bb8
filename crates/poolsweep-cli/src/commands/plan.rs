//! Plan command - show the sweep without connecting to any store.

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, Table};
use poolsweep_core::{PlannedRun, ReportSink};
use serde_json::json;

use crate::cli::PlanArgs;

pub fn execute(args: &PlanArgs) -> Result<()> {
    let config = args.sweep.base_config();
    let plan = args
        .sweep
        .matrix(&config)
        .plan()
        .context("Failed to expand the workload matrix")?;
    let sink = ReportSink::new(config.output_dir.clone(), config.host.clone());

    if args.json {
        output_json(&plan, &sink)
    } else {
        output_table(&plan, &sink);
        Ok(())
    }
}

fn is_done(run: &PlannedRun, sink: &ReportSink) -> bool {
    sink.exists(run.spec.store(), &run.spec.canonical())
}

fn output_table(plan: &[PlannedRun], sink: &ReportSink) {
    let mut table = Table::new();
    table.set_header(vec!["#", "Store", "Shape", "Spec", "Status"]);

    let mut done = 0;
    for (index, run) in plan.iter().enumerate() {
        let status = if is_done(run, sink) {
            done += 1;
            Cell::new("done").fg(Color::Green)
        } else {
            Cell::new("pending")
        };
        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(run.spec.store()),
            Cell::new(run.shape),
            Cell::new(run.spec.canonical()),
            status,
        ]);
    }

    println!("{table}");
    eprintln!();
    eprintln!(
        "{} runs, {} already recorded under {}",
        plan.len(),
        done,
        sink.root().join("<store>").join(sink.host()).display()
    );
}

fn output_json(plan: &[PlannedRun], sink: &ReportSink) -> Result<()> {
    let runs: Vec<_> = plan
        .iter()
        .map(|run| {
            json!({
                "store": run.spec.store(),
                "shape": run.shape,
                "spec": run.spec,
                "name": run.spec.canonical(),
                "artifact": sink.artifact_path(run.spec.store(), &run.spec.canonical()),
                "done": is_done(run, sink),
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&runs)?);
    Ok(())
}

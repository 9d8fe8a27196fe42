//! Human and JSON rendering of command results.

use std::io::Write;

use backlog::WorkItem;
use engine::{BatchReport, PatchOutcome, SyncReport};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

pub fn print_json<T: Serialize>(out: &mut impl Write, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

pub fn print_items(
    out: &mut impl Write,
    mode: OutputMode,
    items: &[WorkItem],
) -> anyhow::Result<()> {
    if mode == OutputMode::Json {
        return print_json(out, &items);
    }
    for item in items {
        let order = item
            .order
            .map_or_else(|| "-".to_string(), |o| o.as_f64().to_string());
        writeln!(
            out,
            "{:>8}  {:>14}  {:<12}  {:<10}  {}",
            item.id.as_u64(),
            order,
            item.state,
            item.work_item_type,
            item.title
        )?;
    }
    writeln!(out, "{} item(s)", items.len())?;
    Ok(())
}

pub fn print_report(
    out: &mut impl Write,
    mode: OutputMode,
    report: &SyncReport,
) -> anyhow::Result<()> {
    if mode == OutputMode::Json {
        return print_json(out, report);
    }

    let header = if report.dry_run { "Planned" } else { "Run" };
    writeln!(out, "{header} {}", report.run_id)?;

    if !report.missing.is_empty() {
        let ids: Vec<String> = report.missing.iter().map(|id| format!("#{id}")).collect();
        writeln!(
            out,
            "Skipped {} item(s) no longer returned by the service: {}",
            ids.len(),
            ids.join(", ")
        )?;
    }

    if let Some(renumbered) = &report.resolution.renumbered {
        writeln!(out, "Renumbered {} item(s) to make room", renumbered.len())?;
        if let Some(batch) = &report.renumber {
            print_outcomes(out, batch)?;
        }
    }

    for assignment in &report.resolution.placements {
        let previous = assignment
            .previous
            .map_or_else(|| "-".to_string(), |o| o.as_f64().to_string());
        writeln!(
            out,
            "  #{}: {} -> {}",
            assignment.id,
            previous,
            assignment.new.as_f64()
        )?;
    }

    match &report.placement {
        Some(batch) => print_outcomes(out, batch)?,
        None if report.dry_run => writeln!(out, "Dry run: nothing was patched")?,
        None => writeln!(out, "Placement skipped because renumbering did not complete")?,
    }
    Ok(())
}

fn print_outcomes(out: &mut impl Write, batch: &BatchReport) -> anyhow::Result<()> {
    writeln!(
        out,
        "  applied {}, failed {}, cancelled {}",
        batch.applied().len(),
        batch.failed().len(),
        batch.cancelled().len()
    )?;
    for (id, outcome) in &batch.outcomes {
        if let PatchOutcome::Failed { error } = outcome {
            writeln!(out, "  #{id} failed: {error}")?;
        }
    }
    Ok(())
}

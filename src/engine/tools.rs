//! Result output and CLI helpers

use anyhow::{Context, Result};
use log::{debug, info};
use std::io::Write;

use crate::compare::{CompareCategory, CompareNode, FolderComparison};
use crate::disk_detect::drive_type_for_path;
use crate::engine::opts::RunOpts;
use crate::utils::config::{LIST_THRESHOLD, PackagePaths};
use crate::utils::Colors;

/// Short marker per category, used by list output.
pub fn category_marker(category: CompareCategory) -> &'static str {
    match category {
        CompareCategory::Equal => "==",
        CompareCategory::LeftOnly => "+ ",
        CompareCategory::RightOnly => " +",
        CompareCategory::LeftNewer => "> ",
        CompareCategory::RightNewer => " <",
        CompareCategory::Conflict => "!!",
    }
}

fn category_color(category: CompareCategory) -> &'static str {
    match category {
        CompareCategory::Equal => Colors::EQUAL,
        CompareCategory::LeftOnly | CompareCategory::LeftNewer => Colors::LEFT,
        CompareCategory::RightOnly | CompareCategory::RightNewer => Colors::RIGHT,
        CompareCategory::Conflict => Colors::CONFLICT,
    }
}

/// One line per differing item, without colors.
pub fn format_difference(node: &CompareNode) -> String {
    match &node.conflict_reason {
        Some(reason) => format!(
            "{} {} ({})",
            category_marker(node.category),
            node.rel_path,
            reason
        ),
        None => format!("{} {}", category_marker(node.category), node.rel_path),
    }
}

/// Suggest --parallel-ops for network devices that run with the default.
pub fn log_drive_hints(opts: &RunOpts) {
    for path in [&opts.left, &opts.right] {
        let drive_type = drive_type_for_path(path);
        debug!("{}: {:?}", path.display(), drive_type);
        let suggested = drive_type.suggested_parallel_ops();
        if drive_type.is_network() && opts.device_parallel_ops.is_empty() {
            info!(
                "{} is on a network drive; consider --parallel-ops DEVICE={suggested}",
                path.display()
            );
        }
    }
}

fn print_summary(comparison: &FolderComparison) {
    let s = &comparison.summary;
    info!("{} <-> {}", comparison.left, comparison.right);
    if s.differences() == 0 {
        info!("No differences detected ({} equal items).", s.equal);
        return;
    }
    info!(
        "{} | {} | {} | {} | {} | {}",
        Colors::colorize(Colors::EQUAL, &format!("Equal: {}", s.equal)),
        Colors::colorize(Colors::LEFT, &format!("Left only: {}", s.left_only)),
        Colors::colorize(Colors::RIGHT, &format!("Right only: {}", s.right_only)),
        Colors::colorize(Colors::LEFT, &format!("Left newer: {}", s.left_newer)),
        Colors::colorize(Colors::RIGHT, &format!("Right newer: {}", s.right_newer)),
        Colors::colorize(Colors::CONFLICT, &format!("Conflicts: {}", s.conflict)),
    );
    if !comparison.warnings.is_empty() {
        info!(
            "{}",
            Colors::colorize(
                Colors::SKIPPED,
                &format!("Skipped: {}", comparison.warnings.len())
            )
        );
    }
}

/// Write differences to stdout, or to the results file when there are more than
/// [`LIST_THRESHOLD`].
fn print_list(comparison: &FolderComparison) -> Result<()> {
    let diffs = comparison.differences();
    if diffs.len() > LIST_THRESHOLD {
        let path = PackagePaths::get().results_filename();
        let mut file = std::fs::File::create(path).with_context(|| format!("create {path}"))?;
        for node in &diffs {
            writeln!(file, "{}", format_difference(node)).with_context(|| format!("write {path}"))?;
        }
        info!("{} differences written to {path}", diffs.len());
        return Ok(());
    }
    for node in diffs {
        println!(
            "{}",
            Colors::colorize(category_color(node.category), &format_difference(node))
        );
    }
    Ok(())
}

pub fn report_comparison(comparison: &FolderComparison, opts: &RunOpts) -> Result<()> {
    if opts.json {
        let json = serde_json::to_string_pretty(comparison).context("serialize comparison")?;
        println!("{json}");
        return Ok(());
    }
    print_summary(comparison);
    if opts.list {
        print_list(comparison)?;
    }
    Ok(())
}

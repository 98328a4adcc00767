//! Runs the bulk-load-vs-one-by-one comparison and prints a summary table,
//! the Rust equivalent of `amlayer/test_objective3.c`'s `main`.

use anyhow::Result;
use harness::{compare_bulk_vs_incremental, default_scratch_dir, DEFAULT_NUM_RECORDS};

fn main() -> Result<()> {
    let dir = default_scratch_dir();
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir)?;

    println!(
        "Building a {DEFAULT_NUM_RECORDS}-entry index two ways in {}...",
        dir.display()
    );
    let report = compare_bulk_vs_incremental(&dir, DEFAULT_NUM_RECORDS, 0xC0FFEE)?;

    println!();
    println!("--- FINAL COMPARISON (Building Index with {DEFAULT_NUM_RECORDS} Records) ---");
    println!("| Method                          | Entries | Physical Reads | Physical Writes | Logical Reads |");
    println!("|---------------------------------|---------|----------------|------------------|---------------|");
    println!(
        "| 1: Scan sorted file (bulk load) | {:<7} | {:<14} | {:<16} | {:<13} |",
        report.bulk_load.entries_built,
        report.bulk_load.buffer_stats.physical_reads,
        report.bulk_load.buffer_stats.physical_writes,
        report.bulk_load.buffer_stats.logical_reads,
    );
    println!(
        "| 2: Insert one-by-one (random)   | {:<7} | {:<14} | {:<16} | {:<13} |",
        report.incremental.entries_built,
        report.incremental.buffer_stats.physical_reads,
        report.incremental.buffer_stats.physical_writes,
        report.incremental.buffer_stats.logical_reads,
    );

    let _ = std::fs::remove_dir_all(&dir);
    Ok(())
}

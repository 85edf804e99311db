//! Task completion command

use focuspath_core::{error::Result, CompletedTask};

use super::helpers::{open_companion, print_json, wants_json, GlobalArgs};

/// Handle complete command
pub async fn handle(global: &GlobalArgs, task: CompletedTask, format: String) -> Result<()> {
    let mut companion = open_companion(global)?;
    let report = companion.complete_task(task);

    if wants_json(&format) {
        return print_json(&report);
    }

    println!("Task {} recorded", report.task_id);
    println!(
        "  Estimate: {} (efficiency {:.2})",
        report.verdict, report.efficiency
    );
    println!(
        "  Completed: {} tasks, streak {} days",
        report.total_tasks_completed, report.streak_days
    );
    println!("  Next estimate: {} min", report.next_estimate_minutes);
    Ok(())
}

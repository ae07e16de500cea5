//! Pure formatting functions for UI output.
//!
//! The `format_*` functions build the text and are unit tested; the
//! `display_*` functions only print it.

use console::style;

use crate::workflow::{Rollback, TagOutcome, TagPlan, WorkflowFailure};

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

pub fn display_warning(message: &str) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), message);
}

/// Describe what a run is about to do.
///
/// Shows the version change (or the release bump for a same-version
/// release), the tag, and the changelog lines that will be added.
pub fn format_plan(plan: &TagPlan) -> String {
    let mut out = format!("{}\n", style(format!("Package {}", plan.package)).bold());
    out.push_str(&format!("  Source:  {}\n", plan.source));
    out.push_str(&format!(
        "  From:    {}\n",
        style(format!("{}-{}", plan.previous_version, plan.previous_release)).red()
    ));
    out.push_str(&format!(
        "  To:      {}{}\n",
        style(format!("{}-{}", plan.version, plan.release)).green(),
        if plan.is_zstream() { " (release bump)" } else { "" }
    ));
    out.push_str(&format!("  Tag:     {}\n", style(&plan.tag).cyan()));
    out.push_str(&format!("{}\n", style("Changelog:").underlined()));
    for line in &plan.changelog {
        out.push_str(&format!("  - {}\n", line));
    }
    out
}

pub fn display_plan(plan: &TagPlan) {
    print!("\n{}", format_plan(plan));
}

/// Failure text naming the stage, the cause and what happened to partial work
pub fn format_failure(failure: &WorkflowFailure) -> String {
    let mut out = failure.to_string();
    match &failure.rollback {
        Rollback::NotNeeded => {}
        Rollback::Completed => out.push_str("\nChanges made before the failure were rolled back."),
        Rollback::Failed(reason) => out.push_str(&format!(
            "\nRollback did not complete ({}); check the working tree before retrying.",
            reason
        )),
    }
    out
}

pub fn display_failure(failure: &WorkflowFailure) {
    display_error(&format_failure(failure));
}

/// The commands that publish a tagged release
pub fn format_push_instruction(remote: &str, branch: Option<&str>, tag: &str) -> String {
    match branch {
        Some(branch) => format!(
            "git push {remote} {branch} && git push {remote} {tag}",
            remote = remote,
            branch = branch,
            tag = tag
        ),
        None => format!("git push {} {}", remote, tag),
    }
}

/// Display the success summary and the push command.
pub fn display_tagged(outcome: &TagOutcome, remote: &str, branch: Option<&str>) {
    display_success(&format!(
        "Tagged {} at {}",
        style(&outcome.plan.tag).cyan(),
        short_id(&outcome.commit)
    ));
    println!(
        "\n{} To publish this release, run:\n  {}",
        style("→").yellow(),
        style(format_push_instruction(remote, branch, &outcome.plan.tag)).cyan()
    );
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

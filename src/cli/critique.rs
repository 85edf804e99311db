//! Free-text critique command

use focuspath_core::error::Result;

use super::helpers::{join_or_dash, open_companion, print_json, wants_json, GlobalArgs};

/// Handle critique command
pub async fn handle(
    global: &GlobalArgs,
    text: String,
    subject: String,
    topic: Option<String>,
    format: String,
) -> Result<()> {
    let mut companion = open_companion(global)?;
    let parsed = companion.critique(&text, &subject, topic.as_deref());

    if wants_json(&format) {
        return print_json(&parsed);
    }

    println!("Sentiment: {}", parsed.sentiment);
    println!("Missing: {}", join_or_dash(&parsed.missing_elements));
    if !parsed.quality_issues.is_empty() {
        println!(
            "Unclear: {}",
            join_or_dash(parsed.quality_issues.iter().map(|issue| issue.element))
        );
    }

    if let Some(entry) = companion.memory().topic_info(&subject, topic.as_deref()) {
        println!(
            "Memory: flagged {} times, priority {}",
            entry.times_flagged, entry.priority
        );
    }

    Ok(())
}

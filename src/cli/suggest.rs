//! Adaptation suggestions command

use chrono::{Local, Timelike};
use focuspath_core::{error::Result, types::Priority};

use super::helpers::{join_or_dash, open_companion, print_json, wants_json, GlobalArgs};

/// Handle suggest command
pub async fn handle(
    global: &GlobalArgs,
    task: Option<String>,
    subject: Option<String>,
    apply: bool,
    format: String,
) -> Result<()> {
    let mut companion = open_companion(global)?;

    let adaptations = companion.adaptations();
    let hour = Local::now().hour() as u8;
    let detail_level = subject
        .as_deref()
        .map(|s| companion.profile().suggest_detail_level(s, hour, false));
    let web = match (&task, &subject) {
        (Some(task), Some(subject)) if !global.offline => {
            Some(companion.suggest_web_usage(task, subject))
        }
        _ => None,
    };
    let priority_topics = subject
        .as_deref()
        .map(|s| companion.memory().priority_elements(s, Priority::High))
        .unwrap_or_default();

    let mut applied = Vec::new();
    if apply {
        for suggestion in &adaptations {
            if companion.accept_adaptation(suggestion) {
                applied.push(suggestion.to_string());
            }
        }
    }

    if wants_json(&format) {
        return print_json(&serde_json::json!({
            "adaptations": adaptations,
            "applied": applied,
            "detail_level": detail_level,
            "web": web,
            "priority_topics": priority_topics,
            "break_activity": companion
                .profile()
                .suggest_break_activity(companion.profile().focus_duration()),
        }));
    }

    if adaptations.is_empty() {
        println!("No adaptation needed");
    }
    for suggestion in &adaptations {
        println!("{}", suggestion);
    }
    for change in &applied {
        println!("Applied: {}", change);
    }
    if let (Some(subject), Some(level)) = (&subject, detail_level) {
        println!("Suggested detail level for {} now: {}/5", subject, level);
    }
    for topic in &priority_topics {
        println!(
            "Keep covering {} in {}",
            join_or_dash(&topic.missing_often),
            topic.topic
        );
    }
    if let Some(web) = web {
        println!("{}", web.reason);
        if let Some(message) = web.message {
            println!("{}", message);
        }
    }
    Ok(())
}

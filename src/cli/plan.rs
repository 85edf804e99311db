//! Task planning command

use focuspath_core::{error::Result, DecisionContext};

use super::helpers::{join_or_dash, open_companion, print_json, wants_json, GlobalArgs};

/// Handle plan command
pub async fn handle(
    global: &GlobalArgs,
    task: String,
    subject: String,
    topic: Option<String>,
    level: Option<String>,
    web: bool,
    format: String,
) -> Result<()> {
    let mut companion = open_companion(global)?;
    companion.start_session();

    let ctx = DecisionContext {
        task_text: task,
        subject,
        topic,
        level,
        force_web: web,
        force_offline: global.offline,
    };

    let result = companion.plan(&ctx).await;
    let suggestion = companion.suggest_web_usage(&ctx.task_text, &ctx.subject);

    if wants_json(&format) {
        return print_json(&serde_json::json!({
            "decision": result,
            "web_suggestion": suggestion,
        }));
    }

    println!("Source: {} ({})", result.chosen_source, result.reasons.join(", "));
    println!("Local provider: {}", result.local_bundle.provider);

    if let Some(memory) = &result.memory_bundle {
        println!(
            "Memory: priority {}, flagged {} times, often missing: {}",
            memory.priority,
            memory.times_flagged,
            join_or_dash(&memory.missing_often)
        );
    }

    if let Some(web) = &result.web_bundle {
        match &web.error {
            Some(error) => println!("Web: unavailable ({})", error),
            None => println!(
                "Web: {} definitions, {} dates, {} facts",
                web.definitions.len(),
                web.dates.len(),
                web.facts.len()
            ),
        }
    }

    let fused = &result.fused_bundle;
    println!();
    for definition in &fused.definitions {
        println!("  [définition] {}: {}", definition.term, definition.definition);
    }
    for formula in &fused.formulas {
        println!("  [formule] {}: {}", formula.name, formula.formula);
    }
    for date in &fused.dates {
        println!("  [date] {}: {}", date.date, date.event);
    }
    for figure in &fused.figures {
        println!("  [personnage] {}: {}", figure.name, figure.role);
    }
    for step in &fused.methodology {
        println!("  [méthode] {}", step);
    }
    for fact in &fused.facts {
        println!("  [fait] {}", fact);
    }
    if !fused.elements_to_inject.is_empty() {
        println!("À couvrir en priorité: {}", join_or_dash(&fused.elements_to_inject));
    }

    if let Some(message) = suggestion.message {
        println!();
        println!("{} {}", suggestion.reason, message);
    }

    Ok(())
}

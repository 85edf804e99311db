//! Knowledge memory command

use clap::Subcommand;
use focuspath_core::{error::Result, types::Priority};

use super::helpers::{join_or_dash, open_companion, print_json, wants_json, GlobalArgs};

#[derive(Subcommand)]
pub enum MemoryAction {
    /// Statistics and priority topics
    Stats {
        /// Also list the topics of this subject at medium priority or above
        #[arg(short, long)]
        subject: Option<String>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Remove one flag from entries untouched for too long
    Decay {
        /// Age threshold in days (defaults to configuration)
        #[arg(long)]
        days: Option<i64>,
    },

    /// Forget a topic, a subject, or everything
    Clear {
        #[arg(short, long)]
        subject: Option<String>,

        #[arg(short, long, requires = "subject")]
        topic: Option<String>,

        /// Required to clear the whole memory
        #[arg(long)]
        all: bool,
    },
}

/// Handle memory command
pub async fn handle(global: &GlobalArgs, action: MemoryAction) -> Result<()> {
    let mut companion = open_companion(global)?;

    match action {
        MemoryAction::Stats { subject, format } => {
            let stats = companion.memory().statistics();
            let topics = subject
                .as_deref()
                .map(|s| companion.memory().priority_elements(s, Priority::Medium))
                .unwrap_or_default();

            if wants_json(&format) {
                return print_json(&serde_json::json!({
                    "statistics": stats,
                    "priority_topics": topics,
                }));
            }

            println!(
                "{} subjects, {} topics, {} high priority",
                stats.total_subjects, stats.total_topics, stats.high_priority_topics
            );
            println!(
                "Most common gaps: {}",
                join_or_dash(
                    stats
                        .most_common_missing
                        .iter()
                        .map(|(kind, count)| format!("{} ({})", kind, count))
                )
            );
            for topic in topics {
                println!(
                    "  [{}] {} x{}: {}",
                    topic.priority,
                    topic.topic,
                    topic.times_flagged,
                    join_or_dash(&topic.missing_often)
                );
            }
        }
        MemoryAction::Decay { days } => {
            let decayed = match days {
                Some(days) => companion.memory_mut().decay(days),
                None => companion.decay_memory(),
            };
            println!("Decayed {} entries", decayed);
        }
        MemoryAction::Clear {
            subject,
            topic,
            all,
        } => match (subject, topic) {
            (Some(subject), Some(topic)) => {
                if companion.memory_mut().clear_topic(&subject, &topic) {
                    println!("Cleared {}/{}", subject, topic);
                } else {
                    println!("Nothing recorded for {}/{}", subject, topic);
                }
            }
            (Some(subject), None) => {
                if companion.memory_mut().clear_subject(&subject) {
                    println!("Cleared {}", subject);
                } else {
                    println!("Nothing recorded for {}", subject);
                }
            }
            (None, _) if all => {
                companion.memory_mut().reset();
                println!("Knowledge memory cleared");
            }
            (None, _) => {
                eprintln!("Specify --subject (and optionally --topic), or --all");
            }
        },
    }

    Ok(())
}

//! Learner profile command

use clap::Subcommand;
use focuspath_core::error::Result;

use super::helpers::{join_or_dash, open_companion, print_json, wants_json, GlobalArgs};

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Show the profile and web usage
    Show {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Preferred detail level, clamped to 1..=5
    SetDetail { level: i32 },

    /// Focus duration in minutes, clamped to 5..=60
    SetFocus { minutes: i64 },

    /// Fatigue sensitivity, clamped to 0..=1
    SetFatigue { value: f64 },

    /// Allow or forbid web searches
    Web {
        #[command(subcommand)]
        state: WebState,
    },
}

#[derive(Subcommand)]
pub enum WebState {
    On,
    Off,
}

/// Handle profile command
pub async fn handle(global: &GlobalArgs, action: ProfileAction) -> Result<()> {
    let mut companion = open_companion(global)?;

    match action {
        ProfileAction::Show { format } => {
            let summary = companion.profile().productivity_summary();
            let web = companion.web_guard().usage_stats(summary.web_enabled);

            if wants_json(&format) {
                return print_json(&serde_json::json!({
                    "profile": companion.profile().profile(),
                    "summary": summary,
                    "web_usage": web,
                }));
            }

            println!("Detail level: {}/5", summary.preferred_spiciness);
            println!("Focus duration: {} min", summary.focus_duration);
            println!(
                "Fatigue sensitivity: {:.2}",
                companion.profile().fatigue_sensitivity()
            );
            println!(
                "Completed: {} tasks, streak {} days",
                summary.total_completed, summary.streak_days
            );
            println!("Best hours: {}", join_or_dash(&summary.best_hours));
            println!(
                "Web: {} ({} requests today, {} remaining)",
                if summary.web_enabled { "on" } else { "off" },
                web.requests_today,
                web.remaining_today
            );
            for (subject, bias) in &companion.profile().profile().difficulty_bias {
                if *bias != 0.0 {
                    println!("  {} difficulty bias: {:+.2}", subject, bias);
                }
            }
        }
        ProfileAction::SetDetail { level } => {
            companion.profile_mut().set_preferred_spiciness(level);
            println!(
                "Detail level set to {}",
                companion.profile().preferred_spiciness()
            );
        }
        ProfileAction::SetFocus { minutes } => {
            companion.profile_mut().set_focus_duration(minutes);
            println!(
                "Focus duration set to {} min",
                companion.profile().focus_duration()
            );
        }
        ProfileAction::SetFatigue { value } => {
            companion.profile_mut().set_fatigue_sensitivity(value);
            println!(
                "Fatigue sensitivity set to {:.2}",
                companion.profile().fatigue_sensitivity()
            );
        }
        ProfileAction::Web { state } => {
            let enabled = matches!(state, WebState::On);
            companion.set_web_enabled(enabled);
            if enabled {
                let request = companion.web_guard().permission_request(false, None);
                println!("Web search enabled. {}", request.privacy_note);
            } else {
                println!("Web search disabled");
            }
        }
    }

    Ok(())
}

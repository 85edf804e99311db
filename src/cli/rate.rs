//! Form feedback command

use clap::Subcommand;
use focuspath_core::{
    error::Result,
    types::{DetailVerdict, Difficulty, DurationVerdict},
};
use uuid::Uuid;

use super::helpers::{open_companion, GlobalArgs};

#[derive(Subcommand)]
pub enum RateAction {
    /// Was the answer too detailed, just right or not detailed enough?
    Detail {
        /// too_detailed, just_right or not_enough
        verdict: DetailVerdict,

        /// Detail level the answer used (defaults to the profile's)
        #[arg(long)]
        level: Option<u8>,

        #[arg(short, long)]
        subject: Option<String>,

        #[arg(long)]
        task_id: Option<String>,
    },

    /// Compare estimated and actual minutes
    Duration {
        #[arg(short, long)]
        estimated: u32,

        #[arg(short, long)]
        actual: u32,

        /// too_short, accurate or too_long (derived when absent)
        #[arg(long)]
        verdict: Option<DurationVerdict>,

        #[arg(long)]
        task_id: Option<String>,
    },

    /// Compare estimated and perceived difficulty
    Difficulty {
        #[arg(short, long)]
        estimated: Difficulty,

        #[arg(short, long)]
        perceived: Difficulty,

        #[arg(short, long)]
        subject: Option<String>,

        #[arg(long)]
        task_id: Option<String>,
    },

    /// Session satisfaction from 1 to 5
    Satisfaction {
        score: i32,

        #[arg(short, long)]
        comment: Option<String>,

        #[arg(long)]
        session_id: Option<String>,
    },
}

fn id_or_new(id: Option<String>) -> String {
    id.unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Handle rate command
pub async fn handle(global: &GlobalArgs, action: RateAction) -> Result<()> {
    let mut companion = open_companion(global)?;

    match action {
        RateAction::Detail {
            verdict,
            level,
            subject,
            task_id,
        } => {
            let level = level.unwrap_or_else(|| companion.profile().preferred_spiciness());
            companion.feedback_mut().record_spiciness_feedback(
                &id_or_new(task_id),
                level,
                verdict,
                subject.as_deref(),
            );
            println!("Detail feedback recorded: {} at level {}", verdict, level);
        }
        RateAction::Duration {
            estimated,
            actual,
            verdict,
            task_id,
        } => {
            let verdict = companion.feedback_mut().record_duration_feedback(
                &id_or_new(task_id),
                estimated,
                actual,
                verdict,
            );
            println!("Duration feedback recorded: {}", verdict);
        }
        RateAction::Difficulty {
            estimated,
            perceived,
            subject,
            task_id,
        } => {
            companion.feedback_mut().record_difficulty_feedback(
                &id_or_new(task_id),
                estimated,
                perceived,
                subject.as_deref(),
            );
            if let Some(subject) = subject {
                let delta = (perceived.rank() - estimated.rank()) as f64;
                companion.profile_mut().adjust_difficulty_bias(&subject, delta);
                println!(
                    "Difficulty feedback recorded; bias for {} is now {:.2}",
                    subject,
                    companion.profile().difficulty_bias(&subject)
                );
            } else {
                println!("Difficulty feedback recorded: {} -> {}", estimated, perceived);
            }
        }
        RateAction::Satisfaction {
            score,
            comment,
            session_id,
        } => {
            companion.feedback_mut().record_satisfaction_feedback(
                &id_or_new(session_id),
                score,
                comment.as_deref(),
            );
            println!("Satisfaction recorded: {}/5", score.clamp(1, 5));
        }
    }

    Ok(())
}

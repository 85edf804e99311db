//! Numeric estimators behind the personalization profile
//!
//! Pure functions so the arithmetic can be tested without a profile on disk.

use crate::types::Difficulty;

/// Entries kept per category duration history
pub const MAX_DURATION_HISTORY: usize = 20;
/// History length required before it is blended into estimates
pub const MIN_HISTORY_FOR_BLEND: usize = 3;
/// Weight of the historical average in the blend (tunable)
pub const HISTORY_WEIGHT: f64 = 0.7;
/// Weight of the caller's base time in the blend (tunable)
pub const BASE_WEIGHT: f64 = 0.3;
/// Extra time per unit of fatigue sensitivity
pub const FATIGUE_WEIGHT: f64 = 0.2;
pub const MIN_ESTIMATE_MINUTES: u32 = 5;
pub const MAX_ESTIMATE_MINUTES: u32 = 45;

/// Difficulty bias above which answers get one more detail level
pub const HARD_SUBJECT_BIAS: f64 = 0.3;
/// Hours before this are treated as early morning
pub const EARLY_HOUR: u8 = 8;
/// Hours after this are treated as late evening
pub const LATE_HOUR: u8 = 21;

pub const MIN_DETAIL_LEVEL: i32 = 1;
pub const MAX_DETAIL_LEVEL: i32 = 5;

/// Base minutes, blended with the category history once it is long enough
pub fn blended_base(history: &[u32], base_minutes: u32) -> u32 {
    if history.len() < MIN_HISTORY_FOR_BLEND {
        return base_minutes;
    }
    let avg = history.iter().map(|m| *m as f64).sum::<f64>() / history.len() as f64;
    (avg * HISTORY_WEIGHT + base_minutes as f64 * BASE_WEIGHT) as u32
}

/// Personalized duration in whole minutes.
///
/// Each multiplier step truncates to whole minutes before the next one, and
/// the result is clamped to [5, 45].
pub fn personalized_estimate(
    history: &[u32],
    difficulty: Difficulty,
    base_minutes: u32,
    fatigue_sensitivity: f64,
) -> u32 {
    let estimated = blended_base(history, base_minutes);
    let with_difficulty = (estimated as f64 * difficulty.estimate_multiplier()) as u32;
    let fatigue_mult = 1.0 + fatigue_sensitivity * FATIGUE_WEIGHT;
    let with_fatigue = (with_difficulty as f64 * fatigue_mult) as u32;

    with_fatigue.clamp(MIN_ESTIMATE_MINUTES, MAX_ESTIMATE_MINUTES)
}

/// Detail level for the current context; adjustments stack before clamping.
pub fn suggest_detail_level(
    preferred: u8,
    subject_bias: f64,
    hour: u8,
    fatigue_detected: bool,
) -> u8 {
    let mut level = preferred as i32;

    if fatigue_detected {
        level -= 1;
    }
    if hour < EARLY_HOUR || hour > LATE_HOUR {
        level -= 1;
    }
    if subject_bias > HARD_SUBJECT_BIAS {
        level += 1;
    }

    level.clamp(MIN_DETAIL_LEVEL, MAX_DETAIL_LEVEL) as u8
}

/// Break suggestion sized to the session just finished
pub fn break_activity(session_minutes: u32) -> &'static str {
    if session_minutes < 20 {
        "🧊 Boire de l'eau + étirements (2 min)"
    } else if session_minutes < 40 {
        "🚶 Marcher 5 min + respiration"
    } else {
        "🧘 Pause complète : marche + collation + air frais (10 min)"
    }
}

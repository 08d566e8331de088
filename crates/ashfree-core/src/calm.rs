//! Scripted calm-down content: no model call, so it works when generation is down.

use ashfree_schema::{BreathingExercise, UserContext};

use crate::signals::HIGH_CRAVING_INTENSITY;

const MODERATE_CRAVING_INTENSITY: u8 = 5;
const CELEBRATE_AFTER_DAYS: u32 = 7;
const EXERCISE_SECONDS: u32 = 60;

pub const DEFAULT_CALM_MINUTES: u32 = 5;

pub const EMERGENCY_MESSAGE: &str = "I'm here with you right now. Take a deep breath. This feeling will pass. You're not alone in this. Let's focus on your breathing together. Inhale slowly for 4 counts, hold for 4, exhale for 4. You're stronger than this craving. Remember why you're quitting. You've got this.";

/// Picks a calming script from craving intensity, then days smoke-free.
pub fn calm_message(context: &UserContext) -> String {
    let cravings = context.craving_intensity_or_default();
    let days = context.days_smoke_free_or_default();
    if cravings >= HIGH_CRAVING_INTENSITY {
        "Take a deep breath. This craving will pass. Remember why you're quitting. You're stronger than this craving. Try drinking some water or going for a short walk.".to_string()
    } else if cravings >= MODERATE_CRAVING_INTENSITY {
        "You're doing great. This craving is temporary. Focus on your breathing. Inhale for 4 counts, hold for 4, exhale for 4. You've got this.".to_string()
    } else if days > CELEBRATE_AFTER_DAYS {
        format!("Congratulations on {days} days smoke-free! Your body is healing. Keep up the great work. You're becoming a non-smoker every day.")
    } else {
        "Remember your reasons for quitting. Every craving you resist makes you stronger. You're on the right path. Keep going.".to_string()
    }
}

/// 4-7-8 for strong cravings, box breathing otherwise.
pub fn breathing_exercise(context: &UserContext) -> BreathingExercise {
    let steps = |steps: &[&str]| steps.iter().map(|s| s.to_string()).collect();
    if context.craving_intensity_or_default() >= HIGH_CRAVING_INTENSITY {
        BreathingExercise {
            name: "4-7-8 Breathing".into(),
            description: "Inhale for 4 counts, hold for 7, exhale for 8".into(),
            duration: EXERCISE_SECONDS,
            steps: steps(&[
                "Inhale through your nose for 4 counts",
                "Hold your breath for 7 counts",
                "Exhale through your mouth for 8 counts",
                "Repeat 5 times",
            ]),
        }
    } else {
        BreathingExercise {
            name: "Box Breathing".into(),
            description: "Inhale, hold, exhale, hold - each for 4 counts".into(),
            duration: EXERCISE_SECONDS,
            steps: steps(&[
                "Inhale through your nose for 4 counts",
                "Hold your breath for 4 counts",
                "Exhale through your mouth for 4 counts",
                "Hold your breath for 4 counts",
                "Repeat 5 times",
            ]),
        }
    }
}

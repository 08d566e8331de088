use ashfree_memory::cravings::compute_stats;
use ashfree_schema::{CravingEntry, CravingTally, Dashboard, QuitPlan};
use chrono::NaiveDate;

use crate::config::DashboardConfig;

const TOP_TRIGGERS: usize = 3;
const UNKNOWN_TRIGGER: &str = "Unknown";

const HEALTH_MILESTONES: &[(u32, &str)] = &[
    (1, "Blood pressure and heart rate normalizing"),
    (2, "Sense of taste and smell returning"),
    (3, "Breathing becoming easier"),
    (7, "Lung function improving"),
    (14, "Circulation improving"),
    (30, "Risk of heart disease decreasing"),
];

/// Whole days since the plan's quit date; 0 without a plan or for future dates.
pub fn days_smoke_free(plan: Option<&QuitPlan>, today: NaiveDate) -> u32 {
    plan.and_then(|plan| plan.quit_date)
        .map(|quit| (today - quit).num_days())
        .and_then(|days| u32::try_from(days).ok())
        .unwrap_or(0)
}

pub fn progress_message(days: u32) -> &'static str {
    match days {
        0 => "Start your journey to a smoke-free life today!",
        1..=2 => "You're in the early stages of quitting. Stay strong!",
        3..=6 => "You're making progress! The first week is the hardest.",
        7..=13 => "You're doing great! Your body is starting to heal.",
        14..=29 => "You're making excellent progress! Keep going!",
        _ => "Congratulations! You've reached a major milestone!",
    }
}

/// Rounded to cents.
pub fn money_saved(days: u32, config: &DashboardConfig) -> f64 {
    let saved = f64::from(days) * config.pack_cost * config.packs_per_day;
    (saved * 100.0).round() / 100.0
}

pub fn health_improvements(days: u32) -> Vec<String> {
    HEALTH_MILESTONES
        .iter()
        .take_while(|(after, _)| days >= *after)
        .map(|(_, text)| text.to_string())
        .collect()
}

pub fn goal_percentage(days: u32, goal_days: u32) -> u8 {
    if goal_days == 0 {
        return 100;
    }
    let pct = u64::from(days) * 100 / u64::from(goal_days);
    pct.min(100) as u8
}

pub fn build_dashboard(
    user_id: &str,
    plan: Option<&QuitPlan>,
    cravings: &[CravingEntry],
    today: NaiveDate,
    config: &DashboardConfig,
) -> Dashboard {
    let days = days_smoke_free(plan, today);

    let stats = compute_stats(cravings);
    let mut triggers: Vec<(String, usize)> = stats
        .triggers
        .into_iter()
        .filter(|(name, _)| name != UNKNOWN_TRIGGER)
        .collect();
    // BTreeMap order breaks ties alphabetically; the sort is stable.
    triggers.sort_by(|a, b| b.1.cmp(&a.1));

    Dashboard {
        user_id: user_id.to_string(),
        days_smoke_free: days,
        goal_percentage: goal_percentage(days, config.goal_days),
        progress_message: progress_message(days).to_string(),
        money_saved: money_saved(days, config),
        health_improvements: health_improvements(days),
        cravings: CravingTally {
            resisted: cravings.iter().filter(|entry| !entry.smoked).count(),
            total: cravings.len(),
        },
        top_triggers: triggers
            .into_iter()
            .take(TOP_TRIGGERS)
            .map(|(name, _)| name)
            .collect(),
    }
}

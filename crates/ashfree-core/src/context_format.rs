use std::fmt::Display;

use ashfree_schema::{CravingSummary, UserContext};

/// How much of a `UserContext` ends up in the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextStyle {
    /// Every present field, nothing for absent ones.
    Detailed,
    /// Four headline fields with literal defaults, plus craving stats.
    Summary,
}

pub fn format_context(context: &UserContext, style: ContextStyle) -> String {
    let lines = match style {
        ContextStyle::Detailed => detailed_lines(context),
        ContextStyle::Summary => summary_lines(context),
    };
    lines.join("\n")
}

fn line(label: &str, value: impl Display) -> String {
    format!("- {label}: {value}")
}

fn push_text(lines: &mut Vec<String>, label: &str, value: &Option<String>) {
    if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        lines.push(line(label, value));
    }
}

fn push_value<T: Display>(lines: &mut Vec<String>, label: &str, value: Option<T>) {
    if let Some(value) = value {
        lines.push(line(label, value));
    }
}

fn push_list(lines: &mut Vec<String>, label: &str, values: &[String]) {
    let items: Vec<&str> = values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect();
    if !items.is_empty() {
        lines.push(line(label, items.join(", ")));
    }
}

fn stats_text(stats: &CravingSummary) -> String {
    let average = stats
        .average_intensity
        .map(|avg| format!("{avg:.1}"))
        .unwrap_or_else(|| "N/A".to_string());
    format!(
        "Total logged: {}, Avg intensity: {average}, Last 24h: {}",
        stats.total, stats.last_24h
    )
}

fn detailed_lines(ctx: &UserContext) -> Vec<String> {
    let mut lines = Vec::new();
    push_text(&mut lines, "Current mood", &ctx.mood);
    push_value(&mut lines, "Current craving level (1-10)", ctx.craving_intensity);
    push_value(&mut lines, "Days smoke-free", ctx.days_smoke_free);
    push_value(&mut lines, "Stress level (1-10)", ctx.stress_level);
    push_list(&mut lines, "Triggers", &ctx.triggers);
    push_list(&mut lines, "Goals", &ctx.goals);
    push_list(&mut lines, "Medications", &ctx.medications);
    push_text(&mut lines, "Quit date", &ctx.quit_date);
    push_text(&mut lines, "Last smoke", &ctx.last_smoke);
    push_value(&mut lines, "Previous quit attempts", ctx.quit_attempts);
    push_list(&mut lines, "Support network", &ctx.support_network);
    push_list(
        &mut lines,
        "Preferred coping strategies",
        &ctx.preferred_coping_strategies,
    );
    push_text(&mut lines, "Time of day", &ctx.time_of_day);
    push_text(&mut lines, "Location", &ctx.location);
    push_value(&mut lines, "Sleep hours", ctx.sleep_hours);
    push_value(&mut lines, "Exercise minutes", ctx.exercise_minutes);
    push_value(&mut lines, "Water intake (oz)", ctx.water_intake);
    push_value(&mut lines, "Caffeine intake (mg)", ctx.caffeine_intake);
    push_value(&mut lines, "Alcohol intake (drinks)", ctx.alcohol_intake);
    if let Some(stats) = &ctx.craving_stats {
        lines.push(line("Craving stats", stats_text(stats)));
    }

    // BTreeMap iterates in key order
    for (key, value) in &ctx.other_context {
        let rendered = match value {
            serde_json::Value::Null => continue,
            serde_json::Value::String(s) if s.trim().is_empty() => continue,
            serde_json::Value::String(s) => s.trim().to_string(),
            other => other.to_string(),
        };
        lines.push(line(key, rendered));
    }
    lines
}

fn summary_lines(ctx: &UserContext) -> Vec<String> {
    let mood = ctx
        .mood
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or("neutral");
    let mut lines = vec![
        line("Current mood", mood),
        line("Craving intensity (1-10)", ctx.craving_intensity_or_default()),
        line("Days smoke-free", ctx.days_smoke_free_or_default()),
        line("Previous quit attempts", ctx.quit_attempts.unwrap_or(0)),
    ];
    if let Some(stats) = &ctx.craving_stats {
        lines.push(line("Craving stats", stats_text(stats)));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detailed_omits_absent_fields() {
        let ctx = UserContext {
            days_smoke_free: Some(10),
            craving_intensity: Some(9),
            ..Default::default()
        };
        let text = format_context(&ctx, ContextStyle::Detailed);
        assert_eq!(
            text,
            "- Current craving level (1-10): 9\n- Days smoke-free: 10"
        );
    }

    #[test]
    fn detailed_follows_fixed_order_and_joins_lists() {
        let mut ctx = UserContext {
            mood: Some("tired".into()),
            triggers: vec!["coffee".into(), "  ".into(), "stress".into()],
            location: Some("work".into()),
            alcohol_intake: Some(2),
            ..Default::default()
        };
        ctx.other_context
            .insert("zeta".into(), serde_json::json!(true));
        ctx.other_context
            .insert("alpha".into(), serde_json::json!("note"));

        let text = format_context(&ctx, ContextStyle::Detailed);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "- Current mood: tired",
                "- Triggers: coffee, stress",
                "- Location: work",
                "- Alcohol intake (drinks): 2",
                "- alpha: note",
                "- zeta: true",
            ]
        );
    }

    #[test]
    fn detailed_treats_blank_strings_as_absent() {
        let ctx = UserContext {
            mood: Some("   ".into()),
            goals: vec![],
            ..Default::default()
        };
        assert_eq!(format_context(&ctx, ContextStyle::Detailed), "");
    }

    #[test]
    fn summary_uses_literal_defaults() {
        let text = format_context(&UserContext::default(), ContextStyle::Summary);
        assert_eq!(
            text,
            "- Current mood: neutral\n- Craving intensity (1-10): 5\n- Days smoke-free: 0\n- Previous quit attempts: 0"
        );
    }

    #[test]
    fn summary_appends_craving_stats() {
        let ctx = UserContext {
            craving_stats: Some(CravingSummary {
                total: 4,
                average_intensity: Some(6.5),
                last_24h: 1,
            }),
            ..Default::default()
        };
        let text = format_context(&ctx, ContextStyle::Summary);
        assert!(text.ends_with("- Craving stats: Total logged: 4, Avg intensity: 6.5, Last 24h: 1"));
    }
}

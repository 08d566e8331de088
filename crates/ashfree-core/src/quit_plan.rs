use ashfree_schema::QuitPlan;
use chrono::NaiveDate;

/// Starter plan offered before the user saves their own, quitting `today`.
pub fn default_quit_plan(today: NaiveDate) -> QuitPlan {
    let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
    QuitPlan {
        quit_date: Some(today),
        triggers: owned(&[
            "Stress at work",
            "After meals",
            "Social situations",
            "Driving",
            "Morning coffee",
        ]),
        coping_strategies: owned(&[
            "Deep breathing exercises",
            "Going for a walk",
            "Drinking water",
            "Calling a support person",
            "Using nicotine gum when needed",
        ]),
        support_people: owned(&["A trusted friend", "Family member", "Your doctor", "Quit Smoking Support Group"]),
        rewards: owned(&[
            "New pair of shoes after 1 week",
            "Massage after 1 month",
            "Weekend getaway after 3 months",
        ]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_plan_quits_today() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let plan = default_quit_plan(today);
        assert_eq!(plan.quit_date, Some(today));
        assert_eq!(plan.triggers.len(), 5);
        assert!(plan.coping_strategies.contains(&"Drinking water".to_string()));
        assert!(!plan.rewards.is_empty());
    }
}

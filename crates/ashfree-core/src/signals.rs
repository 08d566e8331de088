//! Keyword classifiers run over the raw user message.
//!
//! Every table is ordered; the first matching row wins.

use ashfree_schema::{Emotion, SuggestedAction, UserContext};

pub const CRAVING_KEYWORDS: &[&str] = &[
    "craving",
    "urge",
    "want to smoke",
    "need a cigarette",
    "temptation",
];

const INTENSITY_TIERS: &[(u8, &[&str])] = &[
    (
        8,
        &[
            "really",
            "very",
            "extremely",
            "intense",
            "strong",
            "powerful",
            "overwhelming",
        ],
    ),
    (5, &["somewhat", "moderate", "fairly", "quite"]),
    (3, &["slight", "mild", "little", "bit"]),
];

const DEFAULT_DETECTED_INTENSITY: u8 = 5;

const EMOTIONS: &[(Emotion, &[&str])] = &[
    (
        Emotion::Happy,
        &["happy", "joy", "excited", "great", "wonderful", "fantastic", "amazing"],
    ),
    (
        Emotion::Sad,
        &["sad", "depressed", "down", "unhappy", "miserable", "terrible", "awful"],
    ),
    (
        Emotion::Angry,
        &["angry", "mad", "furious", "annoyed", "irritated", "frustrated"],
    ),
    (
        Emotion::Anxious,
        &["anxious", "nervous", "worried", "stressed", "overwhelmed", "panicked"],
    ),
    (
        Emotion::Calm,
        &["calm", "relaxed", "peaceful", "serene", "tranquil", "content"],
    ),
];

const CRISIS_KEYWORDS: &[&str] = &[
    "hopeless",
    "suicidal",
    "give up",
    "end it",
    "can't go on",
    "kill myself",
    "emergency",
];

pub const CRISIS_RESOURCES: &str = "It sounds like you're going through a really tough time. If you're in crisis or need immediate help, please call the National Suicide Prevention Lifeline at 1-800-273-8255 or your local emergency number. You are not alone.";

const FOLLOW_UP_TOPICS: &[(&[&str], [&str; 4])] = &[
    (
        CRAVING_KEYWORDS,
        [
            "What triggered this craving?",
            "How intense is the craving on a scale of 1-10?",
            "What coping strategies have worked for you in the past?",
            "Would you like to try a guided breathing exercise?",
        ],
    ),
    (
        &["stress", "anxious", "worried", "nervous", "overwhelmed"],
        [
            "What's causing your stress right now?",
            "How are you feeling physically?",
            "What relaxation techniques have you tried?",
            "Would you like to talk about your stress in more detail?",
        ],
    ),
    (
        &["motivation", "motivated", "inspired", "encouraged", "determined"],
        [
            "What's motivating you to stay smoke-free?",
            "How do you feel about your progress so far?",
            "What are your goals for the next week?",
            "How can I help you stay motivated?",
        ],
    ),
    (
        &["relapse", "slipped", "failed", "gave in", "smoked"],
        [
            "What led to the relapse?",
            "How are you feeling about it?",
            "What can you learn from this experience?",
            "What's your plan to get back on track?",
        ],
    ),
];

const MILESTONE_DAYS: u32 = 7;
pub(crate) const HIGH_CRAVING_INTENSITY: u8 = 8;

fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| haystack.contains(keyword))
}

/// `(detected, intensity)`; intensity is `None` when no craving was found.
pub fn detect_craving(message: &str) -> (bool, Option<u8>) {
    let lower = message.to_lowercase();
    if !contains_any(&lower, CRAVING_KEYWORDS) {
        return (false, None);
    }
    let intensity = INTENSITY_TIERS
        .iter()
        .find(|(_, words)| contains_any(&lower, words))
        .map(|(score, _)| *score)
        .unwrap_or(DEFAULT_DETECTED_INTENSITY);
    (true, Some(intensity))
}

pub fn detect_emotion(message: &str) -> Option<Emotion> {
    let lower = message.to_lowercase();
    EMOTIONS
        .iter()
        .find(|(_, words)| contains_any(&lower, words))
        .map(|(emotion, _)| *emotion)
}

pub fn detect_crisis(message: &str) -> bool {
    contains_any(&message.to_lowercase(), CRISIS_KEYWORDS)
}

pub fn suggested_actions(context: &UserContext, message: &str) -> Vec<SuggestedAction> {
    let (craving, _) = detect_craving(message);
    if craving || context.craving_intensity_or_default() >= HIGH_CRAVING_INTENSITY {
        vec![
            SuggestedAction::new("breathing", "Try a breathing exercise", "breath"),
            SuggestedAction::new("distraction", "Find a distraction", "distraction"),
            SuggestedAction::new("call_friend", "Call a friend", "phone"),
            SuggestedAction::new("emergency", "Emergency support", "emergency"),
        ]
    } else {
        vec![
            SuggestedAction::new("journal", "Write in your journal", "journal"),
            SuggestedAction::new("meditation", "Try a meditation", "meditation"),
            SuggestedAction::new("exercise", "Do some exercise", "exercise"),
            SuggestedAction::new("reward", "Reward yourself", "reward"),
        ]
    }
}

pub fn follow_up_questions(context: &UserContext, message: &str) -> Vec<String> {
    let lower = message.to_lowercase();
    if let Some((_, questions)) = FOLLOW_UP_TOPICS
        .iter()
        .find(|(words, _)| contains_any(&lower, words))
    {
        return questions.iter().map(|q| q.to_string()).collect();
    }

    let days = context.days_smoke_free_or_default();
    if days > MILESTONE_DAYS {
        vec![
            format!("Congratulations on {days} days smoke-free! How are you feeling?"),
            "What's been helping you stay smoke-free?".to_string(),
            "What challenges are you facing?".to_string(),
            "What are your goals for today?".to_string(),
        ]
    } else {
        vec![
            "How are you feeling today?".to_string(),
            "What's been the hardest part of quitting so far?".to_string(),
            "What's been helping you stay smoke-free?".to_string(),
            "What are your goals for today?".to_string(),
        ]
    }
}

//! Folds attempts into a [`StudentProgress`] aggregate.
//!
//! This is the only place counters are mutated. Overall and topic accuracy are
//! kept as percentages (0-100) while concept accuracy is a fraction (0-1);
//! comparisons of a percentage against a fraction threshold go through
//! [`ThresholdScale`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::{Attempt, ConceptStat, StudentProgress, TopicStat, RECENT_ATTEMPTS_LIMIT};

pub const STRUGGLING_ACCURACY: f64 = 0.5;
pub const STRUGGLING_MIN_ATTEMPTS: u32 = 3;
pub const MASTERED_ACCURACY: f64 = 0.8;
pub const MASTERED_MIN_ATTEMPTS: u32 = 5;

/// How a percentage accuracy is projected before it is compared with one of
/// the fraction thresholds (0.5, 0.6, 0.8).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdScale {
    /// Divide by 100, so 85% compares as 0.85.
    #[default]
    Normalized,
    /// Compare the raw percentage, so any accuracy above 0.8% clears `> 0.8`.
    Legacy,
}

impl ThresholdScale {
    pub fn project(self, percent: f64) -> f64 {
        match self {
            ThresholdScale::Normalized => percent / 100.0,
            ThresholdScale::Legacy => percent,
        }
    }
}

impl fmt::Display for ThresholdScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdScale::Normalized => f.write_str("normalized"),
            ThresholdScale::Legacy => f.write_str("legacy"),
        }
    }
}

impl FromStr for ThresholdScale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normalized" => Ok(ThresholdScale::Normalized),
            "legacy" => Ok(ThresholdScale::Legacy),
            other => Err(format!(
                "unknown threshold scale '{}', expected 'normalized' or 'legacy'",
                other
            )),
        }
    }
}

fn percentage(correct: u32, attempts: u32) -> f64 {
    if attempts == 0 {
        return 0.0;
    }
    f64::from(correct) / f64::from(attempts) * 100.0
}

fn fraction(correct: u32, attempts: u32) -> f64 {
    if attempts == 0 {
        return 0.0;
    }
    f64::from(correct) / f64::from(attempts)
}

/// Applies one attempt to the aggregate.
pub fn apply_attempt(progress: &mut StudentProgress, attempt: Attempt) {
    progress.total_problems_attempted += 1;
    if attempt.is_correct {
        progress.total_correct += 1;
        progress.learning_streak += 1;
    } else {
        progress.learning_streak = progress.learning_streak.saturating_sub(1);
    }
    progress.accuracy_rate = percentage(progress.total_correct, progress.total_problems_attempted);
    progress.last_active = attempt.timestamp;

    let topic = progress
        .topics
        .entry(attempt.topic.clone())
        .or_insert_with(|| TopicStat::new(attempt.timestamp));
    topic.problems_attempted += 1;
    if attempt.is_correct {
        topic.correct += 1;
    }
    topic.accuracy_rate = percentage(topic.correct, topic.problems_attempted);
    topic.last_attempt = attempt.timestamp;

    for concept in &attempt.concepts {
        let stat = progress
            .concepts
            .entry(concept.clone())
            .or_insert_with(|| ConceptStat::new(attempt.timestamp, attempt.difficulty));
        stat.attempts += 1;
        if attempt.is_correct {
            stat.correct += 1;
        }
        stat.accuracy_rate = fraction(stat.correct, stat.attempts);
        stat.last_attempt = attempt.timestamp;
        stat.difficulty = attempt.difficulty;

        classify_concept(topic, concept, stat);
    }

    progress.recent_attempts.push_front(attempt);
    progress.recent_attempts.truncate(RECENT_ATTEMPTS_LIMIT);
}

/// Moves a concept between the struggling and mastered sets of its topic.
/// Intermediate accuracy keeps whatever classification the concept had.
fn classify_concept(topic: &mut TopicStat, concept: &str, stat: &ConceptStat) {
    if stat.accuracy_rate < STRUGGLING_ACCURACY && stat.attempts >= STRUGGLING_MIN_ATTEMPTS {
        if !topic.struggling_concepts.iter().any(|c| c == concept) {
            tracing::debug!(
                concept,
                accuracy = stat.accuracy_rate,
                attempts = stat.attempts,
                "Concept classified as struggling"
            );
            topic.struggling_concepts.push(concept.to_string());
        }
        topic.mastered_concepts.retain(|c| c != concept);
    } else if stat.accuracy_rate >= MASTERED_ACCURACY && stat.attempts >= MASTERED_MIN_ATTEMPTS {
        if !topic.mastered_concepts.iter().any(|c| c == concept) {
            tracing::debug!(
                concept,
                accuracy = stat.accuracy_rate,
                attempts = stat.attempts,
                "Concept classified as mastered"
            );
            topic.mastered_concepts.push(concept.to_string());
        }
        topic.struggling_concepts.retain(|c| c != concept);
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::str::FromStr;

/// Most recent attempts kept on a student aggregate.
pub const RECENT_ATTEMPTS_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl Difficulty {
    /// One rung up. Anything that is not `Beginner` lands on `Advanced`,
    /// so `Advanced` maps to itself.
    pub fn next(self) -> Self {
        match self {
            Difficulty::Beginner => Difficulty::Intermediate,
            _ => Difficulty::Advanced,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid difficulty '{0}': must be one of beginner, intermediate, advanced")]
pub struct InvalidDifficulty(pub String);

impl FromStr for Difficulty {
    type Err = InvalidDifficulty;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            other => Err(InvalidDifficulty(other.to_string())),
        }
    }
}

/// One completed problem submission. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub student_id: String,
    pub problem_id: String,
    pub question: String,
    pub student_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
    pub topic: String,
    pub difficulty: Difficulty,
    pub concepts: Vec<String>,
    /// Seconds spent on the problem
    pub time_spent: f64,
    pub hints_used: u32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicStat {
    pub problems_attempted: u32,
    pub correct: u32,
    /// Percentage, 0-100
    pub accuracy_rate: f64,
    pub last_attempt: DateTime<Utc>,
    pub struggling_concepts: Vec<String>,
    pub mastered_concepts: Vec<String>,
}

impl TopicStat {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            problems_attempted: 0,
            correct: 0,
            accuracy_rate: 0.0,
            last_attempt: at,
            struggling_concepts: Vec::new(),
            mastered_concepts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptStat {
    pub attempts: u32,
    pub correct: u32,
    /// Fraction, 0-1 (unlike topic and overall accuracy)
    pub accuracy_rate: f64,
    pub last_attempt: DateTime<Utc>,
    pub difficulty: Difficulty,
}

impl ConceptStat {
    pub fn new(at: DateTime<Utc>, difficulty: Difficulty) -> Self {
        Self {
            attempts: 0,
            correct: 0,
            accuracy_rate: 0.0,
            last_attempt: at,
            difficulty,
        }
    }
}

/// Root aggregate for one student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProgress {
    pub student_id: String,
    pub total_problems_attempted: u32,
    pub total_correct: u32,
    /// Percentage, 0-100
    pub accuracy_rate: f64,
    pub topics: BTreeMap<String, TopicStat>,
    pub concepts: BTreeMap<String, ConceptStat>,
    /// Most recent first
    pub recent_attempts: VecDeque<Attempt>,
    pub learning_streak: u32,
    pub last_active: DateTime<Utc>,
}

impl StudentProgress {
    pub fn new(student_id: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            total_problems_attempted: 0,
            total_correct: 0,
            accuracy_rate: 0.0,
            topics: BTreeMap::new(),
            concepts: BTreeMap::new(),
            recent_attempts: VecDeque::new(),
            learning_streak: 0,
            last_active: Utc::now(),
        }
    }

    /// Checks the counters still agree with each other.
    pub fn verify(&self) -> anyhow::Result<()> {
        if self.total_correct > self.total_problems_attempted {
            anyhow::bail!(
                "student {}: {} correct out of {} attempts",
                self.student_id,
                self.total_correct,
                self.total_problems_attempted
            );
        }
        if self.recent_attempts.len() > RECENT_ATTEMPTS_LIMIT {
            anyhow::bail!(
                "student {}: {} recent attempts kept, limit is {}",
                self.student_id,
                self.recent_attempts.len(),
                RECENT_ATTEMPTS_LIMIT
            );
        }
        for (topic, stat) in &self.topics {
            if stat.correct > stat.problems_attempted {
                anyhow::bail!(
                    "student {}: topic {} has {} correct out of {} attempts",
                    self.student_id,
                    topic,
                    stat.correct,
                    stat.problems_attempted
                );
            }
            if let Some(concept) = stat
                .struggling_concepts
                .iter()
                .find(|c| stat.mastered_concepts.contains(c))
            {
                anyhow::bail!(
                    "student {}: concept {} is both struggling and mastered in topic {}",
                    self.student_id,
                    concept,
                    topic
                );
            }
        }
        for (concept, stat) in &self.concepts {
            if stat.correct > stat.attempts {
                anyhow::bail!(
                    "student {}: concept {} has {} correct out of {} attempts",
                    self.student_id,
                    concept,
                    stat.correct,
                    stat.attempts
                );
            }
        }
        Ok(())
    }
}

/// A recommended next problem. Recomputed per request, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveQuestion {
    pub question: String,
    pub difficulty: Difficulty,
    pub topic: String,
    pub concepts: Vec<String>,
    pub reasoning: String,
    pub is_review: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_problem_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_bump_stays_on_advanced() {
        assert_eq!(Difficulty::Beginner.next(), Difficulty::Intermediate);
        assert_eq!(Difficulty::Intermediate.next(), Difficulty::Advanced);
        assert_eq!(Difficulty::Advanced.next(), Difficulty::Advanced);
    }

    #[test]
    fn difficulty_parses_only_known_levels() {
        assert_eq!("beginner".parse::<Difficulty>(), Ok(Difficulty::Beginner));
        assert_eq!("advanced".parse::<Difficulty>(), Ok(Difficulty::Advanced));
        assert!("expert".parse::<Difficulty>().is_err());
        assert!("Beginner".parse::<Difficulty>().is_err());
    }

    #[test]
    fn fresh_progress_is_zeroed() {
        let progress = StudentProgress::new("s1");
        assert_eq!(progress.total_problems_attempted, 0);
        assert_eq!(progress.accuracy_rate, 0.0);
        assert_eq!(progress.learning_streak, 0);
        assert!(progress.topics.is_empty());
        assert!(progress.verify().is_ok());
    }

    #[test]
    fn verify_rejects_overlapping_classification() {
        let mut progress = StudentProgress::new("s1");
        let mut topic = TopicStat::new(Utc::now());
        topic.problems_attempted = 5;
        topic.struggling_concepts.push("span".to_string());
        topic.mastered_concepts.push("span".to_string());
        progress.topics.insert("vectors".to_string(), topic);

        let err = progress.verify().unwrap_err();
        assert!(err.to_string().contains("both struggling and mastered"));
    }

    #[test]
    fn verify_rejects_more_correct_than_attempted() {
        let mut progress = StudentProgress::new("s1");
        progress.total_correct = 2;
        progress.total_problems_attempted = 1;
        assert!(progress.verify().is_err());
    }

    #[test]
    fn serializes_camel_case() {
        let progress = StudentProgress::new("s1");
        let json = serde_json::to_value(&progress).unwrap();
        assert_eq!(json["studentId"], "s1");
        assert_eq!(json["totalProblemsAttempted"], 0);
        assert_eq!(json["learningStreak"], 0);
        assert!(json["recentAttempts"].as_array().unwrap().is_empty());
    }
}

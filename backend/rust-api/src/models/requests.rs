use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::progress::{AdaptiveQuestion, StudentProgress};

/// Body of `POST /api/progress/update`. Missing strings deserialize as empty
/// so that absence is reported by validation rather than by the JSON parser.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct SubmitAttemptRequest {
    #[validate(length(min = 1, message = "studentId is required"))]
    pub student_id: String,

    #[validate(length(min = 1, message = "problemId is required"))]
    pub problem_id: String,

    #[validate(length(min = 1, message = "question is required"))]
    pub question: String,

    pub student_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,

    #[validate(length(min = 1, message = "topic is required"))]
    pub topic: String,

    /// Raw difficulty, parsed during validation
    pub difficulty: Option<String>,
    pub concepts: Vec<String>,
    /// Seconds, fractional allowed
    #[validate(range(min = 0.0, message = "timeSpent must be a non-negative number of seconds"))]
    pub time_spent: f64,
    pub hints_used: u32,
}

/// Body of `POST /api/progress/adaptive-question`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct AdaptiveQuestionRequest {
    #[validate(length(min = 1, message = "studentId is required"))]
    pub student_id: String,

    #[validate(length(min = 1, message = "topic is required"))]
    pub topic: String,

    pub difficulty: Option<String>,
}

/// Everything produced by one attempt submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub updated_progress: StudentProgress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adaptive_question: Option<AdaptiveQuestion>,
    pub recommendations: Vec<String>,
    pub struggling_areas: Vec<String>,
    pub mastered_areas: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressMetadata {
    pub timestamp: DateTime<Utc>,
    pub accuracy_rate: f64,
    pub learning_streak: u32,
}

impl ProgressMetadata {
    pub fn for_progress(progress: &StudentProgress) -> Self {
        Self {
            timestamp: Utc::now(),
            accuracy_rate: progress.accuracy_rate,
            learning_streak: progress.learning_streak,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressUpdateResponse {
    pub success: bool,
    pub data: ProgressUpdate,
    pub metadata: ProgressMetadata,
}

impl From<ProgressUpdate> for ProgressUpdateResponse {
    fn from(data: ProgressUpdate) -> Self {
        let metadata = ProgressMetadata::for_progress(&data.updated_progress);
        Self {
            success: true,
            data,
            metadata,
        }
    }
}

use std::sync::Arc;
use validator::Validate;

use crate::metrics::{
    ADAPTIVE_QUESTIONS_TOTAL, ATTEMPTS_SUBMITTED_TOTAL, PROGRESS_RESETS_TOTAL, STUDENTS_TRACKED,
};
use crate::models::{
    AdaptiveQuestion, AdaptiveQuestionRequest, Attempt, Difficulty, ProgressUpdate,
    StudentProgress, SubmitAttemptRequest,
};

use super::mastery::{self, ThresholdScale};
use super::progress_store::ProgressStore;
use super::question_selector;

const STRUGGLING_AREA_ACCURACY: f64 = 0.6;
const STRUGGLING_AREA_MIN_ATTEMPTS: u32 = 3;
const MASTERED_AREA_ACCURACY: f64 = 0.8;
const MASTERED_AREA_MIN_ATTEMPTS: u32 = 5;
const LOW_OVERALL_ACCURACY: f64 = 0.5;
const HIGH_OVERALL_ACCURACY: f64 = 0.8;
const STREAK_PRAISE: u32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    #[error("{0}")]
    Validation(String),

    #[error("No progress found for student {0}")]
    NotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

fn validation_error(errors: validator::ValidationErrors) -> ProgressError {
    let mut missing = Vec::new();
    let mut invalid = Vec::new();
    for e in errors.field_errors().values().flat_map(|errs| errs.iter()) {
        let message = e
            .message
            .as_ref()
            .map(|m| m.to_string())
            .unwrap_or_else(|| e.code.to_string());
        // Required strings are the only `length` checks
        if e.code == "length" {
            missing.push(message);
        } else {
            invalid.push(message);
        }
    }
    missing.sort();
    invalid.sort();

    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("Missing required fields: {}", missing.join(", ")));
    }
    if !invalid.is_empty() {
        parts.push(format!("Invalid fields: {}", invalid.join(", ")));
    }
    ProgressError::Validation(parts.join("; "))
}

fn parse_difficulty(raw: Option<&str>) -> Result<Option<Difficulty>, ProgressError> {
    raw.map(str::parse::<Difficulty>)
        .transpose()
        .map_err(|e| ProgressError::Validation(e.to_string()))
}

/// Entry point for everything progress related. Owns the store; the
/// aggregator and selector are pure functions over the snapshots it hands out.
pub struct ProgressService {
    store: Arc<dyn ProgressStore>,
    scale: ThresholdScale,
}

impl ProgressService {
    pub fn new(store: Arc<dyn ProgressStore>, scale: ThresholdScale) -> Self {
        Self { store, scale }
    }

    pub fn threshold_scale(&self) -> ThresholdScale {
        self.scale
    }

    pub async fn submit_attempt(
        &self,
        req: SubmitAttemptRequest,
    ) -> Result<ProgressUpdate, ProgressError> {
        req.validate().map_err(validation_error)?;
        let difficulty = parse_difficulty(req.difficulty.as_deref())?.unwrap_or_default();

        tracing::info!(
            "Recording attempt: student={}, problem={}, topic={}, correct={}",
            req.student_id,
            req.problem_id,
            req.topic,
            req.is_correct
        );

        let attempt = Attempt {
            student_id: req.student_id,
            problem_id: req.problem_id,
            question: req.question,
            student_answer: req.student_answer,
            correct_answer: req.correct_answer,
            is_correct: req.is_correct,
            topic: req.topic,
            difficulty,
            concepts: req.concepts,
            time_spent: req.time_spent,
            hints_used: req.hints_used,
            timestamp: chrono::Utc::now(),
        };

        let recorded = attempt.clone();
        let progress = self
            .store
            .update(
                &attempt.student_id,
                Box::new(move |p: &mut StudentProgress| mastery::apply_attempt(p, recorded)),
            )
            .await?;
        progress.verify()?;

        ATTEMPTS_SUBMITTED_TOTAL
            .with_label_values(&[if attempt.is_correct { "true" } else { "false" }])
            .inc();
        self.refresh_students_gauge().await;

        let adaptive_question =
            match question_selector::select_next_question(&progress, &attempt, self.scale) {
                Some((rule, question)) => {
                    ADAPTIVE_QUESTIONS_TOTAL
                        .with_label_values(&[rule.as_str()])
                        .inc();
                    Some(question)
                }
                None => {
                    ADAPTIVE_QUESTIONS_TOTAL.with_label_values(&["none"]).inc();
                    None
                }
            };

        let recommendations = self.recommendations(&progress, &attempt.topic);
        let struggling_areas = self.struggling_areas(&progress);
        let mastered_areas = self.mastered_areas(&progress);

        tracing::info!(
            "Progress updated: student={}, accuracy={:.1}, streak={}, adaptive={}",
            progress.student_id,
            progress.accuracy_rate,
            progress.learning_streak,
            adaptive_question.is_some()
        );

        Ok(ProgressUpdate {
            updated_progress: progress,
            adaptive_question,
            recommendations,
            struggling_areas,
            mastered_areas,
        })
    }

    pub async fn get_progress(&self, student_id: &str) -> Result<StudentProgress, ProgressError> {
        self.store
            .get(student_id)
            .await?
            .ok_or_else(|| ProgressError::NotFound(student_id.to_string()))
    }

    pub async fn get_all_progress(&self) -> Result<Vec<StudentProgress>, ProgressError> {
        Ok(self.store.get_all().await?)
    }

    pub async fn reset_progress(&self, student_id: &str) -> Result<bool, ProgressError> {
        let existed = self.store.delete(student_id).await?;
        PROGRESS_RESETS_TOTAL
            .with_label_values(&[if existed { "deleted" } else { "not_found" }])
            .inc();
        self.refresh_students_gauge().await;

        if existed {
            tracing::info!("Progress reset for student {}", student_id);
        } else {
            tracing::warn!("Reset requested for unknown student {}", student_id);
        }
        Ok(existed)
    }

    pub async fn get_adaptive_question(
        &self,
        req: AdaptiveQuestionRequest,
    ) -> Result<(StudentProgress, AdaptiveQuestion), ProgressError> {
        req.validate().map_err(validation_error)?;
        let requested = parse_difficulty(req.difficulty.as_deref())?;

        let progress = self.get_progress(&req.student_id).await?;
        let question =
            question_selector::question_for_topic(&progress, &req.topic, requested, self.scale);

        tracing::info!(
            "Adaptive question for student={}, topic={}: difficulty={}, review={}",
            req.student_id,
            req.topic,
            question.difficulty,
            question.is_review
        );
        Ok((progress, question))
    }

    pub async fn students_tracked(&self) -> Result<usize, ProgressError> {
        Ok(self.store.student_count().await?)
    }

    async fn refresh_students_gauge(&self) {
        match self.store.student_count().await {
            Ok(count) => STUDENTS_TRACKED.set(count as i64),
            Err(e) => tracing::warn!("Failed to count tracked students: {:?}", e),
        }
    }

    /// Human-readable advice, in a fixed rule order. Several rules may fire.
    pub fn recommendations(&self, progress: &StudentProgress, topic: &str) -> Vec<String> {
        let mut recommendations = Vec::new();
        let overall = self.scale.project(progress.accuracy_rate);

        if overall < LOW_OVERALL_ACCURACY {
            recommendations.push(
                "Consider reviewing the fundamentals before moving to advanced topics.".to_string(),
            );
            recommendations.push(
                "Try working through more practice problems at the beginner level.".to_string(),
            );
        } else if overall > HIGH_OVERALL_ACCURACY {
            recommendations
                .push("Excellent progress! You're ready for more challenging problems.".to_string());
            recommendations.push(
                "Consider exploring advanced applications of the concepts you've mastered."
                    .to_string(),
            );
        }

        if let Some(stat) = progress.topics.get(topic) {
            if self.scale.project(stat.accuracy_rate) < STRUGGLING_AREA_ACCURACY {
                recommendations.push(format!(
                    "Focus on strengthening your understanding of {} before moving on.",
                    topic
                ));
            }
            if !stat.struggling_concepts.is_empty() {
                recommendations.push(format!(
                    "Pay special attention to: {}",
                    stat.struggling_concepts.join(", ")
                ));
            }
        }

        if progress.learning_streak >= STREAK_PRAISE {
            recommendations
                .push("Great learning streak! Keep up the consistent practice.".to_string());
        } else if progress.learning_streak == 0 {
            recommendations
                .push("Don't get discouraged! Every mistake is a learning opportunity.".to_string());
        }

        recommendations
    }

    pub fn struggling_areas(&self, progress: &StudentProgress) -> Vec<String> {
        progress
            .topics
            .iter()
            .filter(|(_, stat)| {
                self.scale.project(stat.accuracy_rate) < STRUGGLING_AREA_ACCURACY
                    && stat.problems_attempted >= STRUGGLING_AREA_MIN_ATTEMPTS
            })
            .map(|(topic, _)| topic.clone())
            .collect()
    }

    pub fn mastered_areas(&self, progress: &StudentProgress) -> Vec<String> {
        progress
            .topics
            .iter()
            .filter(|(_, stat)| {
                self.scale.project(stat.accuracy_rate) >= MASTERED_AREA_ACCURACY
                    && stat.problems_attempted >= MASTERED_AREA_MIN_ATTEMPTS
            })
            .map(|(topic, _)| topic.clone())
            .collect()
    }
}

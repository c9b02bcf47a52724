//! Picks the next question from the post-update aggregate.

use crate::models::{AdaptiveQuestion, Attempt, Difficulty, StudentProgress};

use super::mastery::ThresholdScale;

const ADVANCEMENT_ACCURACY: f64 = 0.8;

/// Which rule produced a recommendation. First match wins, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionRule {
    Review,
    Remediation,
    Advancement,
}

impl SelectionRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionRule::Review => "review",
            SelectionRule::Remediation => "remediation",
            SelectionRule::Advancement => "advancement",
        }
    }
}

/// Chooses a follow-up for `attempt`, or nothing when no rule applies and the
/// caller should fall back to its regular question source.
pub fn select_next_question(
    progress: &StudentProgress,
    attempt: &Attempt,
    scale: ThresholdScale,
) -> Option<(SelectionRule, AdaptiveQuestion)> {
    let struggling = progress
        .topics
        .get(&attempt.topic)
        .map(|t| t.struggling_concepts.as_slice())
        .unwrap_or_default();

    if !attempt.is_correct {
        let concept = struggling
            .first()
            .or_else(|| attempt.concepts.first())
            .cloned()
            .unwrap_or_else(|| attempt.topic.clone());
        return Some((SelectionRule::Review, review_question(attempt, concept)));
    }

    if let Some(concept) = struggling.first() {
        return Some((
            SelectionRule::Remediation,
            AdaptiveQuestion {
                question: format!(
                    "Let's practice {} with a step-by-step approach. Try this simpler problem:",
                    concept
                ),
                difficulty: Difficulty::Beginner,
                topic: attempt.topic.clone(),
                concepts: vec![concept.clone()],
                reasoning: format!(
                    "Student is struggling with {}. Providing easier practice problems.",
                    concept
                ),
                is_review: false,
                previous_problem_id: None,
            },
        ));
    }

    if scale.project(progress.accuracy_rate) > ADVANCEMENT_ACCURACY {
        let next = attempt.difficulty.next();
        return Some((
            SelectionRule::Advancement,
            AdaptiveQuestion {
                question: format!(
                    "Great work! Let's try a more challenging problem involving {}:",
                    attempt.concepts.join(" and ")
                ),
                difficulty: next,
                topic: attempt.topic.clone(),
                concepts: attempt.concepts.clone(),
                reasoning: format!(
                    "Student is performing well ({:.1}% accuracy). Advancing to {} level.",
                    progress.accuracy_rate, next
                ),
                is_review: false,
                previous_problem_id: None,
            },
        ));
    }

    None
}

fn review_question(attempt: &Attempt, concept: String) -> AdaptiveQuestion {
    AdaptiveQuestion {
        question: format!(
            "Let's review {}. Can you explain the key concept and work through a simpler example?",
            concept
        ),
        difficulty: Difficulty::Beginner,
        topic: attempt.topic.clone(),
        reasoning: format!(
            "Student struggled with {} in the previous question. Reviewing fundamentals.",
            concept
        ),
        concepts: vec![concept],
        is_review: true,
        previous_problem_id: Some(attempt.problem_id.clone()),
    }
}

/// Recommendation outside the submission flow, driven only by stored state.
pub fn question_for_topic(
    progress: &StudentProgress,
    topic: &str,
    requested: Option<Difficulty>,
    scale: ThresholdScale,
) -> AdaptiveQuestion {
    let stat = progress.topics.get(topic);

    if let Some(concept) = stat.and_then(|t| t.struggling_concepts.first()) {
        return AdaptiveQuestion {
            question: format!("Let's practice {} with a step-by-step approach.", concept),
            difficulty: Difficulty::Beginner,
            topic: topic.to_string(),
            concepts: vec![concept.clone()],
            reasoning: format!(
                "Student is struggling with {}. Providing easier practice.",
                concept
            ),
            is_review: true,
            previous_problem_id: None,
        };
    }

    if stat.is_some_and(|t| scale.project(t.accuracy_rate) > ADVANCEMENT_ACCURACY) {
        // Without a requested level the bump lands on advanced.
        let next = requested.map_or(Difficulty::Advanced, Difficulty::next);
        return AdaptiveQuestion {
            question: "Great work! Let's try a more challenging problem.".to_string(),
            difficulty: next,
            topic: topic.to_string(),
            concepts: vec!["advanced_application".to_string()],
            reasoning: format!("Student is performing well. Advancing to {} level.", next),
            is_review: false,
            previous_problem_id: None,
        };
    }

    AdaptiveQuestion {
        question: format!("Let's continue practicing {} concepts.", topic),
        difficulty: requested.unwrap_or_default(),
        topic: topic.to_string(),
        concepts: vec!["general_practice".to_string()],
        reasoning: format!("Standard practice question for {}.", topic),
        is_review: false,
        previous_problem_id: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::mastery::{apply_attempt, tests::attempt};

    fn progress_after(attempts: Vec<Attempt>) -> StudentProgress {
        let mut progress = StudentProgress::new("s1");
        for a in attempts {
            apply_attempt(&mut progress, a);
        }
        progress
    }

    #[test]
    fn miss_triggers_review_on_reported_concept() {
        let miss = attempt("vectors", &["cross_product", "norm"], false);
        let progress = progress_after(vec![miss.clone()]);

        let (rule, q) = select_next_question(&progress, &miss, ThresholdScale::Normalized).unwrap();
        assert_eq!(rule, SelectionRule::Review);
        assert_eq!(q.difficulty, Difficulty::Beginner);
        assert_eq!(q.concepts, vec!["cross_product".to_string()]);
        assert!(q.is_review);
        assert_eq!(q.previous_problem_id.as_deref(), Some("p1"));
        assert!(q.reasoning.contains("struggled with cross_product"));
    }

    #[test]
    fn review_prefers_struggling_concept() {
        let mut attempts: Vec<_> = (0..3)
            .map(|_| attempt("vectors", &["dot_product"], false))
            .collect();
        let miss = attempt("vectors", &["projection"], false);
        attempts.push(miss.clone());
        let progress = progress_after(attempts);

        let (_, q) = select_next_question(&progress, &miss, ThresholdScale::Normalized).unwrap();
        assert_eq!(q.concepts, vec!["dot_product".to_string()]);
    }

    #[test]
    fn review_without_concepts_falls_back_to_topic() {
        let miss = attempt("eigenvalues", &[], false);
        let progress = progress_after(vec![miss.clone()]);

        let (_, q) = select_next_question(&progress, &miss, ThresholdScale::Normalized).unwrap();
        assert_eq!(q.concepts, vec!["eigenvalues".to_string()]);
    }

    #[test]
    fn correct_answer_with_struggling_concept_remediates() {
        let mut attempts: Vec<_> = (0..3)
            .map(|_| attempt("vectors", &["dot_product"], false))
            .collect();
        let hit = attempt("vectors", &["norm"], true);
        attempts.push(hit.clone());
        let progress = progress_after(attempts);

        let (rule, q) = select_next_question(&progress, &hit, ThresholdScale::Normalized).unwrap();
        assert_eq!(rule, SelectionRule::Remediation);
        assert_eq!(q.difficulty, Difficulty::Beginner);
        assert_eq!(q.concepts, vec!["dot_product".to_string()]);
        assert!(!q.is_review);
        assert!(q.previous_problem_id.is_none());
    }

    #[test]
    fn high_accuracy_advances_one_level() {
        // 17 of 20 correct = 85%
        let mut attempts: Vec<_> = (0..3)
            .map(|_| attempt("matrices", &["rank"], false))
            .chain((0..16).map(|_| attempt("matrices", &["rank"], true)))
            .collect();
        let mut hit = attempt("vectors", &["dot_product", "norm"], true);
        hit.difficulty = Difficulty::Intermediate;
        attempts.push(hit.clone());
        let progress = progress_after(attempts);
        assert!((progress.accuracy_rate - 85.0).abs() < 1e-9);

        let (rule, q) = select_next_question(&progress, &hit, ThresholdScale::Normalized).unwrap();
        assert_eq!(rule, SelectionRule::Advancement);
        assert_eq!(q.difficulty, Difficulty::Advanced);
        assert_eq!(q.concepts, vec!["dot_product".to_string(), "norm".to_string()]);
        assert!(q.question.contains("dot_product and norm"));
        assert!(q.reasoning.contains("85.0% accuracy"));
    }

    #[test]
    fn advanced_stays_advanced() {
        let mut hit = attempt("vectors", &["norm"], true);
        hit.difficulty = Difficulty::Advanced;
        let progress = progress_after(vec![hit.clone()]);

        let (_, q) = select_next_question(&progress, &hit, ThresholdScale::Normalized).unwrap();
        assert_eq!(q.difficulty, Difficulty::Advanced);
    }

    #[test]
    fn moderate_accuracy_yields_nothing() {
        // 3 of 4 correct = 75%
        let mut attempts = vec![attempt("vectors", &["norm"], false)];
        attempts.extend((0..2).map(|_| attempt("vectors", &["norm"], true)));
        let hit = attempt("vectors", &["norm"], true);
        attempts.push(hit.clone());
        let progress = progress_after(attempts);

        assert!(select_next_question(&progress, &hit, ThresholdScale::Normalized).is_none());
        // Raw percentages clear the fraction threshold under the legacy scale.
        let (rule, _) = select_next_question(&progress, &hit, ThresholdScale::Legacy).unwrap();
        assert_eq!(rule, SelectionRule::Advancement);
    }

    #[test]
    fn topic_question_reviews_struggling_concept() {
        let progress = progress_after(
            (0..3)
                .map(|_| attempt("vectors", &["dot_product"], false))
                .collect(),
        );
        let q = question_for_topic(&progress, "vectors", None, ThresholdScale::Normalized);
        assert!(q.is_review);
        assert_eq!(q.difficulty, Difficulty::Beginner);
        assert_eq!(q.concepts, vec!["dot_product".to_string()]);
    }

    #[test]
    fn topic_question_advances_strong_topic() {
        let progress = progress_after(vec![attempt("vectors", &["norm"], true)]);

        let q = question_for_topic(
            &progress,
            "vectors",
            Some(Difficulty::Beginner),
            ThresholdScale::Normalized,
        );
        assert_eq!(q.difficulty, Difficulty::Intermediate);
        assert_eq!(q.concepts, vec!["advanced_application".to_string()]);

        let q = question_for_topic(&progress, "vectors", None, ThresholdScale::Normalized);
        assert_eq!(q.difficulty, Difficulty::Advanced);
    }

    #[test]
    fn unknown_topic_gets_practice_question() {
        let progress = progress_after(vec![attempt("vectors", &["norm"], true)]);

        let q = question_for_topic(&progress, "matrices", None, ThresholdScale::Normalized);
        assert_eq!(q.difficulty, Difficulty::Intermediate);
        assert_eq!(q.concepts, vec!["general_practice".to_string()]);
        assert!(!q.is_review);

        let q = question_for_topic(
            &progress,
            "matrices",
            Some(Difficulty::Beginner),
            ThresholdScale::Normalized,
        );
        assert_eq!(q.difficulty, Difficulty::Beginner);
    }
}

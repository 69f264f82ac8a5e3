use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use super::domain::{AnswerOptionId, QuestionId, Quiz, QuizAnswer};

/// Per-question outcome so the result screen can show chosen and correct answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionResult {
    pub question_id: QuestionId,
    pub chosen_option: Option<AnswerOptionId>,
    pub correct_option: AnswerOptionId,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizScore {
    pub correct: usize,
    pub total: usize,
    pub results: Vec<QuestionResult>,
}

impl QuizScore {
    /// Whether the share of correct answers reaches `pass_ratio`. An empty quiz always passes.
    pub fn passes(&self, pass_ratio: f32) -> bool {
        if self.total == 0 {
            return true;
        }
        (self.correct as f32 / self.total as f32) >= pass_ratio
    }
}

impl fmt::Display for QuizScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.correct, self.total)
    }
}

/// Stateless grader comparing chosen options with each question's correct option.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuizScorer;

impl QuizScorer {
    pub fn score(&self, quiz: &Quiz, answers: &[QuizAnswer]) -> QuizScore {
        let mut chosen: HashMap<&QuestionId, &AnswerOptionId> = HashMap::new();
        for answer in answers {
            chosen
                .entry(&answer.question_id)
                .or_insert(&answer.option_id);
        }

        let results: Vec<QuestionResult> = quiz
            .questions
            .iter()
            .map(|question| {
                let chosen_option = chosen.get(&question.id).map(|option| (*option).clone());
                let is_correct = chosen_option.as_ref() == Some(&question.correct_option);
                QuestionResult {
                    question_id: question.id.clone(),
                    chosen_option,
                    correct_option: question.correct_option.clone(),
                    is_correct,
                }
            })
            .collect();

        QuizScore {
            correct: results.iter().filter(|result| result.is_correct).count(),
            total: results.len(),
            results,
        }
    }
}

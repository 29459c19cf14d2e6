//! Quizzes attached to quiz-type lessons, and answer scoring

use crate::storage::collection::Record;
use crate::storage::schema::{self, CollectionSchema};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// A multiple-choice question. `correct_answer` indexes into `options`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl QuizQuestion {
    pub fn new(
        id: impl Into<String>,
        question: impl Into<String>,
        options: &[&str],
        correct_answer: usize,
    ) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_answer,
            explanation: None,
        }
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    pub fn is_correct(&self, answer: usize) -> bool {
        answer == self.correct_answer
    }
}

/// The questions for one lesson. `lesson_id` is a logical foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: String,
    pub lesson_id: String,
    pub questions: Vec<QuizQuestion>,
}

impl Quiz {
    pub fn new(id: impl Into<String>, lesson_id: impl Into<String>, questions: Vec<QuizQuestion>) -> Self {
        Self {
            id: id.into(),
            lesson_id: lesson_id.into(),
            questions,
        }
    }

    /// Number of answers matching the expected option. Answers are matched
    /// to questions by position; `None` and missing answers count as wrong.
    pub fn correct_count(&self, answers: &[Option<usize>]) -> usize {
        self.questions
            .iter()
            .zip(answers.iter())
            .filter(|(q, a)| a.is_some_and(|a| q.is_correct(a)))
            .count()
    }

    /// Percentage score, rounded to the nearest integer. An empty quiz scores 0.
    pub fn score(&self, answers: &[Option<usize>]) -> u8 {
        if self.questions.is_empty() {
            return 0;
        }
        let ratio = self.correct_count(answers) as f64 / self.questions.len() as f64;
        (ratio * 100.0).round() as u8
    }
}

impl Record for Quiz {
    fn schema() -> &'static CollectionSchema {
        &schema::QUIZZES
    }

    fn primary_key(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<()> {
        if self.id.is_empty() || self.lesson_id.is_empty() {
            return Err(Error::InvalidRecord("quiz id and lessonId must not be empty".into()));
        }
        for q in &self.questions {
            if q.correct_answer >= q.options.len() {
                return Err(Error::InvalidRecord(format!(
                    "question '{}' of quiz '{}' points at option {} of {}",
                    q.id,
                    self.id,
                    q.correct_answer,
                    q.options.len()
                )));
            }
        }
        Ok(())
    }
}

/// Feedback band for a quiz score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoreBand {
    Excellent,
    Good,
    NeedsPractice,
}

impl ScoreBand {
    pub fn for_score(score: u8) -> Self {
        match score {
            80.. => ScoreBand::Excellent,
            60..=79 => ScoreBand::Good,
            _ => ScoreBand::NeedsPractice,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreBand::Excellent => "excellent",
            ScoreBand::Good => "good",
            ScoreBand::NeedsPractice => "needs-practice",
        }
    }
}

impl std::fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn math_quiz() -> Quiz {
        Quiz::new(
            "quiz-4",
            "4",
            vec![
                QuizQuestion::new("q1", "What is 5 + 3?", &["6", "7", "8", "9"], 2),
                QuizQuestion::new("q2", "What is 10 - 4?", &["5", "6", "7", "8"], 1),
                QuizQuestion::new("q3", "What is 2 × 3?", &["4", "5", "6", "7"], 2),
            ],
        )
    }

    #[test]
    fn test_two_of_three_scores_67() {
        let quiz = math_quiz();
        assert_eq!(quiz.score(&[Some(2), Some(1), Some(0)]), 67);
        assert_eq!(quiz.score(&[Some(2), Some(1), Some(2)]), 100);
        assert_eq!(quiz.score(&[Some(0), Some(0), Some(0)]), 0);
    }

    #[test]
    fn test_unanswered_count_as_wrong() {
        let quiz = math_quiz();
        assert_eq!(quiz.score(&[Some(2), None]), 33);
        assert_eq!(quiz.score(&[]), 0);
    }

    #[test]
    fn test_empty_quiz_scores_zero() {
        let quiz = Quiz::new("empty", "9", vec![]);
        assert_eq!(quiz.score(&[Some(1)]), 0);
    }

    #[test]
    fn test_bands() {
        assert_eq!(ScoreBand::for_score(100), ScoreBand::Excellent);
        assert_eq!(ScoreBand::for_score(80), ScoreBand::Excellent);
        assert_eq!(ScoreBand::for_score(67), ScoreBand::Good);
        assert_eq!(ScoreBand::for_score(59), ScoreBand::NeedsPractice);
    }

    #[test]
    fn test_validation_checks_answer_index() {
        let mut quiz = math_quiz();
        assert!(quiz.validate().is_ok());
        quiz.questions[0].correct_answer = 4;
        assert!(quiz.validate().is_err());
    }

    #[test]
    fn test_wire_shape() {
        let value = serde_json::to_value(math_quiz()).unwrap();
        assert_eq!(value["lessonId"], "4");
        assert_eq!(value["questions"][0]["correctAnswer"], 2);
    }
}

//! Interview Report Generation
//!
//! This crate defines the immutable [`Report`] produced when an interview ends,
//! the per-answer [`AnswerEvaluation`] records it is built from, and the pure
//! score aggregation that derives the hire recommendation. Reports can be
//! serialized to JSON for storage or rendered to Markdown for reviewers.
//!
//! # Types
//!
//! - [`Report`] - The complete, immutable snapshot of a finished interview
//! - [`QuestionAnswer`] - One question, its answer, and the evaluation of it
//! - [`AnswerEvaluation`] - Structured feedback for a single answer
//! - [`FinalFeedback`] - Narrative feedback for the whole interview
//! - [`HireRecommendation`] - The tier derived from the average score
//!
//! # Aggregation
//!
//! ```rust
//! use interviewer_report::{aggregate, HireRecommendation};
//!
//! let summary = aggregate(&[8.0, 9.0, 7.0]);
//! assert!((summary.average - 8.0).abs() < f64::EPSILON);
//! assert_eq!(summary.recommendation, HireRecommendation::StrongYes);
//! ```
//!
//! # Generators
//!
//! - [`json::JsonGenerator`] - Generate JSON reports with compact or pretty formatting
//! - [`MarkdownGenerator`] - Generate human-readable Markdown reports

pub mod json;
mod markdown;

pub use markdown::MarkdownGenerator;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Failed to serialize the report to JSON.
    #[error("failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid report data.
    #[error("invalid report data: {0}")]
    InvalidData(String),
}

/// Result type for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;

// ============================================================================
// Score policy
// ============================================================================

/// Lowest score an answer can receive.
pub const MIN_SCORE: f64 = 0.0;

/// Highest score an answer can receive.
pub const MAX_SCORE: f64 = 10.0;

/// Score assigned when the evaluator's response carries no usable score.
pub const NEUTRAL_SCORE: f64 = 5.0;

/// Brings a raw evaluator score into the `[MIN_SCORE, MAX_SCORE]` range.
///
/// Non-finite values (NaN, infinities) carry no information and map to
/// [`NEUTRAL_SCORE`].
///
/// # Examples
///
/// ```
/// use interviewer_report::{clamp_score, NEUTRAL_SCORE};
///
/// assert!((clamp_score(12.0) - 10.0).abs() < f64::EPSILON);
/// assert!((clamp_score(-3.0) - 0.0).abs() < f64::EPSILON);
/// assert!((clamp_score(f64::NAN) - NEUTRAL_SCORE).abs() < f64::EPSILON);
/// ```
#[must_use]
pub fn clamp_score(raw: f64) -> f64 {
    if raw.is_finite() {
        raw.clamp(MIN_SCORE, MAX_SCORE)
    } else {
        NEUTRAL_SCORE
    }
}

// ============================================================================
// HireRecommendation and aggregation
// ============================================================================

/// Categorical hire recommendation derived from the average score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HireRecommendation {
    /// Average of 7 or above.
    #[serde(rename = "strong yes")]
    StrongYes,
    /// Average of 6 or above.
    #[serde(rename = "yes")]
    Yes,
    /// Average of 5 or above.
    #[serde(rename = "maybe")]
    Maybe,
    /// Anything lower, including an interview with no scored answers.
    #[default]
    #[serde(rename = "no")]
    No,
}

impl HireRecommendation {
    /// Maps an average score onto a tier using inclusive lower bounds.
    ///
    /// # Examples
    ///
    /// ```
    /// use interviewer_report::HireRecommendation;
    ///
    /// assert_eq!(HireRecommendation::from_average(7.0), HireRecommendation::StrongYes);
    /// assert_eq!(HireRecommendation::from_average(6.5), HireRecommendation::Yes);
    /// assert_eq!(HireRecommendation::from_average(5.0), HireRecommendation::Maybe);
    /// assert_eq!(HireRecommendation::from_average(4.99), HireRecommendation::No);
    /// ```
    #[must_use]
    pub fn from_average(average: f64) -> Self {
        if average >= 7.0 {
            Self::StrongYes
        } else if average >= 6.0 {
            Self::Yes
        } else if average >= 5.0 {
            Self::Maybe
        } else {
            Self::No
        }
    }

    /// Returns the wire label for the tier.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::StrongYes => "strong yes",
            Self::Yes => "yes",
            Self::Maybe => "maybe",
            Self::No => "no",
        }
    }
}

impl std::fmt::Display for HireRecommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Summary statistics over a sequence of per-answer scores.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreSummary {
    /// Arithmetic mean of the scores, or 0 when there are none.
    pub average: f64,
    /// Tier derived from `average`.
    pub recommendation: HireRecommendation,
}

/// Aggregates per-answer scores into an average and a hire recommendation.
///
/// Deterministic and free of side effects. An empty slice yields an average
/// of 0 and [`HireRecommendation::No`].
///
/// # Examples
///
/// ```
/// use interviewer_report::{aggregate, HireRecommendation};
///
/// let empty = aggregate(&[]);
/// assert!(empty.average.abs() < f64::EPSILON);
/// assert_eq!(empty.recommendation, HireRecommendation::No);
///
/// let maybe = aggregate(&[5.0, 5.0]);
/// assert_eq!(maybe.recommendation, HireRecommendation::Maybe);
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn aggregate(scores: &[f64]) -> ScoreSummary {
    let average = if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    };

    ScoreSummary {
        average,
        recommendation: HireRecommendation::from_average(average),
    }
}

// ============================================================================
// Difficulty
// ============================================================================

/// Difficulty tier requested for the interview.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Difficulty {
    /// Entry-level questions.
    Beginner,
    /// Mid-level questions (default).
    #[default]
    Intermediate,
    /// Senior-level questions.
    Advanced,
}

impl Difficulty {
    /// Parses a string into a `Difficulty`, case-insensitively.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Some(Self::Beginner),
            "intermediate" => Some(Self::Intermediate),
            "advanced" => Some(Self::Advanced),
            _ => None,
        }
    }

    /// Returns the lowercase name used in prompts and on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str_case_insensitive(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid difficulty '{s}': expected one of 'beginner', 'intermediate', 'advanced'"
            ))
        })
    }
}

impl Serialize for Difficulty {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

// ============================================================================
// AnswerEvaluation and FinalFeedback
// ============================================================================

/// Structured feedback attached to one answer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnswerEvaluation {
    /// Score in `[MIN_SCORE, MAX_SCORE]`.
    pub score: f64,

    /// Free-text rationale for the score.
    pub rationale: String,

    /// What the answer did well.
    #[serde(default)]
    pub strengths: Vec<String>,

    /// What the answer should improve.
    #[serde(default)]
    pub improvements: Vec<String>,

    /// `true` when the evaluator's response could not be parsed and this
    /// record was synthesized from the raw text.
    #[serde(default)]
    pub fallback: bool,
}

impl AnswerEvaluation {
    /// Creates the default record used when structured parsing fails.
    ///
    /// Carries [`NEUTRAL_SCORE`] and the raw response as rationale.
    #[must_use]
    pub fn fallback(raw_text: impl Into<String>) -> Self {
        Self {
            score: NEUTRAL_SCORE,
            rationale: raw_text.into(),
            strengths: Vec::new(),
            improvements: Vec::new(),
            fallback: true,
        }
    }
}

/// Narrative feedback for a whole interview.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FinalFeedback {
    /// Short professional summary.
    pub summary: String,

    /// Key strengths observed across the interview.
    #[serde(default)]
    pub strengths: Vec<String>,

    /// Areas the candidate should work on.
    #[serde(default)]
    pub weaknesses: Vec<String>,

    /// Actionable advice.
    #[serde(default)]
    pub recommendations: Vec<String>,

    /// `true` when this feedback was synthesized from an unparseable response.
    #[serde(default)]
    pub fallback: bool,
}

impl FinalFeedback {
    /// Creates the default feedback used when structured parsing fails.
    #[must_use]
    pub fn fallback(raw_text: impl Into<String>) -> Self {
        Self {
            summary: raw_text.into(),
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            recommendations: Vec::new(),
            fallback: true,
        }
    }
}

// ============================================================================
// QuestionAnswer
// ============================================================================

/// One completed question of an interview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionAnswer {
    /// Position of the question (1-indexed).
    pub question_number: u32,

    /// The question that was asked.
    pub question: String,

    /// The candidate's answer.
    pub answer: String,

    /// Score given to the answer.
    pub score: f64,

    /// Full evaluation of the answer.
    pub evaluation: AnswerEvaluation,
}

// ============================================================================
// Report
// ============================================================================

/// Immutable snapshot of a finished interview.
///
/// Built once when the session ends and handed to the persistence and export
/// sinks by value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Report {
    /// Identifier of the session that produced this report.
    pub session_id: String,

    /// Candidate's name.
    pub candidate_name: String,

    /// Candidate's years of experience.
    pub candidate_experience: u32,

    /// Job description the interview was run against.
    pub job_description: String,

    /// Difficulty tier of the interview.
    pub difficulty: Difficulty,

    /// Number of questions the interview was configured for.
    pub total_questions: u32,

    /// Every fully evaluated question, in order.
    pub questions_and_answers: Vec<QuestionAnswer>,

    /// Scores in question order.
    pub individual_scores: Vec<f64>,

    /// Arithmetic mean of `individual_scores` (0 when empty).
    pub average_score: f64,

    /// Tier derived from `average_score`.
    pub hire_recommendation: HireRecommendation,

    /// Narrative summary from the final feedback.
    pub summary: String,

    /// Overall strengths.
    #[serde(default)]
    pub strengths: Vec<String>,

    /// Overall weaknesses.
    #[serde(default)]
    pub weaknesses: Vec<String>,

    /// Overall recommendations.
    #[serde(default)]
    pub recommendations: Vec<String>,

    /// `true` when the narrative fields came from the fallback path.
    #[serde(default)]
    pub feedback_fallback: bool,

    /// When the first question was issued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// When the interview ended.
    pub ended_at: DateTime<Utc>,

    /// Wall-clock duration between start and end in seconds.
    pub duration_seconds: u64,

    /// When the report was generated.
    pub timestamp: DateTime<Utc>,
}

impl Report {
    /// Creates a new report builder.
    #[must_use]
    pub fn builder() -> ReportBuilder {
        ReportBuilder::default()
    }

    /// Returns the number of answered questions.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.questions_and_answers.len()
    }

    /// Returns the questions in order.
    pub fn questions(&self) -> impl Iterator<Item = &str> {
        self.questions_and_answers
            .iter()
            .map(|qa| qa.question.as_str())
    }

    /// Returns the answers in order.
    pub fn answers(&self) -> impl Iterator<Item = &str> {
        self.questions_and_answers.iter().map(|qa| qa.answer.as_str())
    }
}

// ============================================================================
// ReportBuilder
// ============================================================================

/// Builder for constructing [`Report`] instances.
///
/// Derived fields (`individual_scores`, `average_score`,
/// `hire_recommendation`, `duration_seconds`) are computed in [`build`].
///
/// [`build`]: ReportBuilder::build
#[derive(Debug, Clone, Default)]
pub struct ReportBuilder {
    session_id: Option<String>,
    candidate_name: String,
    candidate_experience: u32,
    job_description: String,
    difficulty: Difficulty,
    total_questions: u32,
    entries: Vec<QuestionAnswer>,
    feedback: FinalFeedback,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
}

impl ReportBuilder {
    /// Sets the session identifier.
    #[must_use]
    pub fn session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    /// Sets the candidate's name and years of experience.
    #[must_use]
    pub fn candidate(mut self, name: impl Into<String>, experience_years: u32) -> Self {
        self.candidate_name = name.into();
        self.candidate_experience = experience_years;
        self
    }

    /// Sets the job description.
    #[must_use]
    pub fn job_description(mut self, description: impl Into<String>) -> Self {
        self.job_description = description.into();
        self
    }

    /// Sets the difficulty tier.
    #[must_use]
    pub const fn difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Sets the configured question count.
    #[must_use]
    pub const fn total_questions(mut self, total: u32) -> Self {
        self.total_questions = total;
        self
    }

    /// Adds a completed question.
    #[must_use]
    pub fn entry(mut self, entry: QuestionAnswer) -> Self {
        self.entries.push(entry);
        self
    }

    /// Sets all completed questions at once.
    #[must_use]
    pub fn entries(mut self, entries: Vec<QuestionAnswer>) -> Self {
        self.entries = entries;
        self
    }

    /// Sets the narrative feedback.
    #[must_use]
    pub fn feedback(mut self, feedback: FinalFeedback) -> Self {
        self.feedback = feedback;
        self
    }

    /// Sets the start and end timestamps.
    #[must_use]
    pub const fn timestamps(
        mut self,
        started_at: Option<DateTime<Utc>>,
        ended_at: DateTime<Utc>,
    ) -> Self {
        self.started_at = started_at;
        self.ended_at = Some(ended_at);
        self
    }

    /// Builds the report.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::InvalidData` if the session id is missing or if a
    /// score lies outside `[MIN_SCORE, MAX_SCORE]`.
    pub fn build(self) -> Result<Report> {
        let session_id = self
            .session_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ReportError::InvalidData("session_id is required".to_string()))?;

        if let Some(bad) = self
            .entries
            .iter()
            .find(|qa| !(MIN_SCORE..=MAX_SCORE).contains(&qa.score))
        {
            return Err(ReportError::InvalidData(format!(
                "score {} for question {} is outside {MIN_SCORE}..={MAX_SCORE}",
                bad.score, bad.question_number
            )));
        }

        let individual_scores: Vec<f64> = self.entries.iter().map(|qa| qa.score).collect();
        let summary = aggregate(&individual_scores);

        let now = Utc::now();
        let ended_at = self.ended_at.unwrap_or(now);
        let duration_seconds = self
            .started_at
            .map(|start| (ended_at - start).num_seconds())
            .and_then(|secs| u64::try_from(secs).ok())
            .unwrap_or(0);

        Ok(Report {
            session_id,
            candidate_name: self.candidate_name,
            candidate_experience: self.candidate_experience,
            job_description: self.job_description,
            difficulty: self.difficulty,
            total_questions: self.total_questions,
            questions_and_answers: self.entries,
            individual_scores,
            average_score: summary.average,
            hire_recommendation: summary.recommendation,
            summary: self.feedback.summary,
            strengths: self.feedback.strengths,
            weaknesses: self.feedback.weaknesses,
            recommendations: self.feedback.recommendations,
            feedback_fallback: self.feedback.fallback,
            started_at: self.started_at,
            ended_at,
            duration_seconds,
            timestamp: now,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn entry(number: u32, score: f64) -> QuestionAnswer {
        QuestionAnswer {
            question_number: number,
            question: format!("Question {number}?"),
            answer: format!("Answer {number}"),
            score,
            evaluation: AnswerEvaluation {
                score,
                rationale: "Solid".to_string(),
                strengths: vec!["clear".to_string()],
                improvements: vec![],
                fallback: false,
            },
        }
    }

    // ------------------------------------------------------------------------
    // Aggregation tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_aggregate_empty_is_zero_and_no() {
        let summary = aggregate(&[]);
        assert!(summary.average.abs() < f64::EPSILON);
        assert_eq!(summary.recommendation, HireRecommendation::No);
    }

    #[test]
    fn test_aggregate_strong_yes() {
        let summary = aggregate(&[8.0, 9.0, 7.0]);
        assert!((summary.average - 8.0).abs() < f64::EPSILON);
        assert_eq!(summary.recommendation, HireRecommendation::StrongYes);
    }

    #[test]
    fn test_aggregate_maybe() {
        let summary = aggregate(&[5.0, 5.0]);
        assert!((summary.average - 5.0).abs() < f64::EPSILON);
        assert_eq!(summary.recommendation, HireRecommendation::Maybe);
    }

    #[test]
    fn test_tier_boundaries_are_inclusive() {
        assert_eq!(HireRecommendation::from_average(10.0), HireRecommendation::StrongYes);
        assert_eq!(HireRecommendation::from_average(7.0), HireRecommendation::StrongYes);
        assert_eq!(HireRecommendation::from_average(6.99), HireRecommendation::Yes);
        assert_eq!(HireRecommendation::from_average(6.0), HireRecommendation::Yes);
        assert_eq!(HireRecommendation::from_average(5.99), HireRecommendation::Maybe);
        assert_eq!(HireRecommendation::from_average(5.0), HireRecommendation::Maybe);
        assert_eq!(HireRecommendation::from_average(0.0), HireRecommendation::No);
    }

    #[test]
    fn test_hire_recommendation_serialization() {
        assert_eq!(
            serde_json::to_string(&HireRecommendation::StrongYes).unwrap(),
            r#""strong yes""#
        );
        assert_eq!(
            serde_json::to_string(&HireRecommendation::No).unwrap(),
            r#""no""#
        );
        let parsed: HireRecommendation = serde_json::from_str(r#""maybe""#).unwrap();
        assert_eq!(parsed, HireRecommendation::Maybe);
    }

    #[test]
    fn test_clamp_score() {
        assert!((clamp_score(7.5) - 7.5).abs() < f64::EPSILON);
        assert!((clamp_score(11.0) - MAX_SCORE).abs() < f64::EPSILON);
        assert!((clamp_score(-1.0) - MIN_SCORE).abs() < f64::EPSILON);
        assert!((clamp_score(f64::INFINITY) - NEUTRAL_SCORE).abs() < f64::EPSILON);
    }

    // ------------------------------------------------------------------------
    // Difficulty tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_difficulty_case_insensitive() {
        let d: Difficulty = serde_json::from_str(r#""ADVANCED""#).unwrap();
        assert_eq!(d, Difficulty::Advanced);
        assert_eq!(serde_json::to_string(&d).unwrap(), r#""advanced""#);
    }

    #[test]
    fn test_difficulty_rejects_unknown() {
        let result: std::result::Result<Difficulty, _> = serde_json::from_str(r#""expert""#);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("invalid difficulty 'expert'"));
    }

    // ------------------------------------------------------------------------
    // Builder tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_builder_computes_derived_fields() {
        let start = DateTime::parse_from_rfc3339("2026-02-03T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let end = DateTime::parse_from_rfc3339("2026-02-03T10:12:30Z")
            .unwrap()
            .with_timezone(&Utc);

        let report = Report::builder()
            .session_id("abc")
            .candidate("Ada", 4)
            .job_description("Backend engineer")
            .difficulty(Difficulty::Advanced)
            .total_questions(2)
            .entry(entry(1, 6.0))
            .entry(entry(2, 7.0))
            .feedback(FinalFeedback {
                summary: "Good fit".to_string(),
                strengths: vec!["Rust".to_string()],
                weaknesses: vec![],
                recommendations: vec!["Practice SQL".to_string()],
                fallback: false,
            })
            .timestamps(Some(start), end)
            .build()
            .unwrap();

        assert_eq!(report.session_id, "abc");
        assert_eq!(report.individual_scores, vec![6.0, 7.0]);
        assert!((report.average_score - 6.5).abs() < f64::EPSILON);
        assert_eq!(report.hire_recommendation, HireRecommendation::Yes);
        assert_eq!(report.duration_seconds, 750);
        assert_eq!(report.summary, "Good fit");
        assert_eq!(report.answered_count(), 2);
        assert_eq!(report.questions().collect::<Vec<_>>(), vec!["Question 1?", "Question 2?"]);
    }

    #[test]
    fn test_builder_requires_session_id() {
        let result = Report::builder().build();
        assert!(matches!(result, Err(ReportError::InvalidData(_))));
    }

    #[test]
    fn test_builder_rejects_out_of_range_score() {
        let result = Report::builder()
            .session_id("abc")
            .entry(entry(1, 11.0))
            .build();
        assert!(matches!(result, Err(ReportError::InvalidData(msg)) if msg.contains("outside")));
    }

    #[test]
    fn test_evaluation_fallback_is_flagged() {
        let eval = AnswerEvaluation::fallback("not json at all");
        assert!(eval.fallback);
        assert!((eval.score - NEUTRAL_SCORE).abs() < f64::EPSILON);
        assert_eq!(eval.rationale, "not json at all");
    }

    #[test]
    fn test_report_serializes_flat_fields() {
        let report = Report::builder()
            .session_id("s-1")
            .entry(entry(1, 8.0))
            .build()
            .unwrap();

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains(r#""questions_and_answers""#));
        assert!(json.contains(r#""average_score":8.0"#));
        assert!(json.contains(r#""hire_recommendation":"strong yes""#));
        assert!(json.contains(r#""difficulty":"intermediate""#));
        assert!(!json.contains("started_at"));
    }
}

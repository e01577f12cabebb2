//! Prompt construction and reply parsing for text-generating models.
//!
//! Models asked for JSON often wrap it in prose or code fences. Extraction takes
//! the substring from the first `{` to the last `}` and reads fields leniently:
//! numeric strings are accepted as scores, a single string is accepted where a
//! list is expected. When nothing usable is found the reply becomes a fallback
//! record instead of an error.

use std::fmt::Write;

use async_trait::async_trait;
use interviewer_report::{clamp_score, AnswerEvaluation, FinalFeedback, NEUTRAL_SCORE};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::{AnswerRequest, Evaluator, FeedbackRequest, QuestionRequest, TextGenerator};
use crate::error::{InterviewError, Result};

/// Prompt sent by [`Evaluator::probe`].
const PROBE_PROMPT: &str = "Hello";

/// An [`Evaluator`] that prompts a [`TextGenerator`].
#[derive(Debug)]
pub struct LlmEvaluator<G> {
    generator: G,
}

impl<G: TextGenerator> LlmEvaluator<G> {
    /// Creates an evaluator over `generator`.
    #[must_use]
    pub const fn new(generator: G) -> Self {
        Self { generator }
    }

    /// Returns the underlying generator.
    #[must_use]
    pub const fn generator(&self) -> &G {
        &self.generator
    }
}

#[async_trait]
impl<G: TextGenerator> Evaluator for LlmEvaluator<G> {
    async fn generate_question(&self, request: &QuestionRequest<'_>) -> Result<String> {
        let prompt = question_prompt(request);
        debug!(
            question_number = request.question_number,
            prompt_len = prompt.len(),
            "Requesting question"
        );

        let reply = self.generator.generate(&prompt).await?;
        let question = reply.trim();
        if question.is_empty() {
            return Err(InterviewError::empty_response("generate question"));
        }

        info!(
            question_number = request.question_number,
            preview = %preview(question),
            "Generated question"
        );
        Ok(question.to_string())
    }

    async fn evaluate_answer(&self, request: &AnswerRequest<'_>) -> Result<AnswerEvaluation> {
        let prompt = evaluation_prompt(request);
        let reply = self.generator.generate(&prompt).await?;
        Ok(parse_answer_evaluation(&reply))
    }

    async fn generate_final_feedback(
        &self,
        request: &FeedbackRequest<'_>,
    ) -> Result<FinalFeedback> {
        let prompt = feedback_prompt(request);
        let reply = self.generator.generate(&prompt).await?;
        Ok(parse_final_feedback(&reply))
    }

    async fn probe(&self) -> Result<()> {
        self.generator.generate(PROBE_PROMPT).await.map(|_| ())
    }
}

// ============================================================================
// Prompts
// ============================================================================

fn question_prompt(request: &QuestionRequest<'_>) -> String {
    let mut history = String::new();
    if !request.prior_questions.is_empty() {
        history.push_str("\nPREVIOUS QUESTIONS AND ANSWERS:\n");
        for (i, question) in request.prior_questions.iter().enumerate() {
            let answer = request
                .prior_answers
                .get(i)
                .map_or("(no answer)", String::as_str);
            let _ = writeln!(history, "Q{}: {question}\nA{}: {answer}", i + 1, i + 1);
        }
    }

    format!(
        r"You are a professional technical interviewer conducting an interview for the following position:

JOB DESCRIPTION:
{job}

CANDIDATE PROFILE:
- Name: {name}
- Years of Experience: {experience}
{history}
INTERVIEW RULES:
1. Ask ONE clear, specific question
2. Difficulty level: {difficulty}
3. This is question {number} of {total}
4. Focus on skills relevant to the job description
5. If earlier answers were weak, probe deeper
6. Do not repeat a previous question
7. Vary between technical and behavioral questions

Generate the next interview question. Return ONLY the question, nothing else.",
        job = request.job_description,
        name = request.candidate.name,
        experience = request.candidate.experience_years,
        difficulty = request.difficulty,
        number = request.question_number,
        total = request.total_questions,
    )
}

fn evaluation_prompt(request: &AnswerRequest<'_>) -> String {
    format!(
        r#"You are an expert technical interviewer evaluating a candidate's response.

JOB DESCRIPTION:
{job}

QUESTION ASKED:
{question}

CANDIDATE ANSWER:
{answer}

DIFFICULTY LEVEL: {difficulty}

Evaluate this answer and provide:
1. A score from 0-10
2. Brief evaluation (2-3 sentences)
3. 2-3 key strengths
4. 2-3 areas for improvement

Return response in JSON format only:
{{
    "score": <number>,
    "evaluation": "<text>",
    "strengths": ["<item>", "<item>"],
    "improvements": ["<item>", "<item>"]
}}"#,
        job = request.job_description,
        question = request.question,
        answer = request.answer,
        difficulty = request.difficulty,
    )
}

fn feedback_prompt(request: &FeedbackRequest<'_>) -> String {
    let mut transcript = String::new();
    for qa in request.history {
        let _ = writeln!(
            transcript,
            "Q{n}: {q}\nA{n}: {a}\nScore: {s:.1}/10 - {e}\n",
            n = qa.question_number,
            q = qa.question,
            a = qa.answer,
            s = qa.score,
            e = qa.evaluation.rationale,
        );
    }
    if transcript.is_empty() {
        transcript.push_str("(no questions were answered)\n");
    }

    format!(
        r#"You are an expert technical interviewer preparing a final evaluation summary.

JOB DESCRIPTION:
{job}

CANDIDATE PROFILE:
- Name: {name}
- Experience: {experience} years

INTERVIEW TRANSCRIPT:
{transcript}
Average score: {average:.1}/10

Generate a professional final interview evaluation in JSON format:
{{
    "summary": "<2-3 sentence professional summary>",
    "strengths": ["<key strength>", "<key strength>"],
    "weaknesses": ["<area to improve>", "<area to improve>"],
    "recommendations": ["<actionable advice>", "<actionable advice>"]
}}"#,
        job = request.job_description,
        name = request.candidate.name,
        experience = request.candidate.experience_years,
        average = request.average_score,
    )
}

// ============================================================================
// Reply parsing
// ============================================================================

/// Extracts an [`AnswerEvaluation`] from a model reply.
///
/// Never fails. Scores are clamped into range; a reply without a usable score
/// gets [`NEUTRAL_SCORE`] and is flagged as a fallback.
///
/// # Examples
///
/// ```
/// use interviewer_engine::evaluator::parse_answer_evaluation;
///
/// let eval = parse_answer_evaluation(r#"Sure! {"score": "8", "evaluation": "Clear"}"#);
/// assert!((eval.score - 8.0).abs() < f64::EPSILON);
/// assert!(!eval.fallback);
///
/// let eval = parse_answer_evaluation("I cannot grade this.");
/// assert!(eval.fallback);
/// assert_eq!(eval.rationale, "I cannot grade this.");
/// ```
#[must_use]
pub fn parse_answer_evaluation(reply: &str) -> AnswerEvaluation {
    let reply = reply.trim();
    let Some(map) = extract_json_object(reply) else {
        warn!(reply_len = reply.len(), "Evaluation reply is not JSON; using fallback");
        return AnswerEvaluation::fallback(reply);
    };

    let rationale = text_field(&map, &["evaluation", "rationale", "feedback"]);
    let strengths = string_list(map.get("strengths"));
    let improvements = string_list(map.get("improvements"));

    match lenient_number(map.get("score")) {
        Some(raw) => {
            let score = clamp_score(raw);
            if (score - raw).abs() > f64::EPSILON {
                warn!(raw_score = raw, score, "Clamped out-of-range score");
            }
            AnswerEvaluation {
                score,
                rationale,
                strengths,
                improvements,
                fallback: false,
            }
        }
        None => {
            warn!("Evaluation reply has no usable score; using neutral score");
            AnswerEvaluation {
                score: NEUTRAL_SCORE,
                rationale: if rationale.is_empty() {
                    reply.to_string()
                } else {
                    rationale
                },
                strengths,
                improvements,
                fallback: true,
            }
        }
    }
}

/// Extracts a [`FinalFeedback`] from a model reply.
///
/// Never fails. A reply without any recognizable field becomes a fallback
/// record whose summary is the raw text.
#[must_use]
pub fn parse_final_feedback(reply: &str) -> FinalFeedback {
    let reply = reply.trim();
    let map = extract_json_object(reply).filter(|map| {
        ["summary", "strengths", "weaknesses", "recommendations"]
            .iter()
            .any(|key| map.contains_key(*key))
    });

    let Some(map) = map else {
        warn!(reply_len = reply.len(), "Feedback reply is not usable JSON; using fallback");
        return FinalFeedback::fallback(reply);
    };

    FinalFeedback {
        summary: text_field(&map, &["summary", "overall"]),
        strengths: string_list(map.get("strengths")),
        weaknesses: string_list(map.get("weaknesses")),
        recommendations: string_list(map.get("recommendations")),
        fallback: false,
    }
}

fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }

    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Reads a number, accepting numeric strings such as `"7"`, `"7.5"` or `"7/10"`.
fn lenient_number(value: Option<&Value>) -> Option<f64> {
    let number = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            let head = s.split('/').next().unwrap_or(s).trim();
            head.parse::<f64>().ok()
        }
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn text_field(map: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|key| map.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

fn preview(text: &str) -> String {
    const LIMIT: usize = 100;
    if text.chars().count() <= LIMIT {
        text.to_string()
    } else {
        let head: String = text.chars().take(LIMIT).collect();
        format!("{head}...")
    }
}

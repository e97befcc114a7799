// Import necessary crates and modules
use std::future::Future;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::assignment::Assignment;
use crate::error::GradingError;
use crate::rubric::Rubric;
use crate::submission::Submission;

/// System instruction sent with every grading call.
///
/// The instruction pins the model to the evaluator role and to the rubric as
/// the sole grading contract, so responses stay comparable across students.
pub(crate) const GRADING_SYSTEM_INSTRUCTION: &str = "You are an experienced teacher grading a \
student's assignment. Evaluate the student's response strictly against the provided rubric and \
nothing else. Award partial credit per criterion according to the rubric levels. Write the \
feedback directly to the student in a constructive, encouraging tone. Respond only with the \
requested JSON object.";

/// JSON schema the model must follow when grading.
///
/// Every field is required; a response missing any of them is rejected as
/// malformed rather than patched up.
static GRADE_RESPONSE_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "OBJECT",
        "properties": {
            "score": {
                "type": "NUMBER",
                "description": "Total score awarded, between 0 and the assignment maximum."
            },
            "pedagogicalFeedback": {
                "type": "STRING",
                "description": "Feedback addressed to the student, constructive in tone."
            },
            "improvementSuggestions": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "Concrete next steps for the student."
            },
            "justification": {
                "type": "STRING",
                "description": "Criterion-by-criterion justification of the score."
            }
        },
        "required": ["score", "pedagogicalFeedback", "improvementSuggestions", "justification"]
    })
});

/// Matches a fenced code block so the payload inside can be recovered.
static FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").unwrap());

/// Strips a surrounding markdown code fence, if present.
///
/// Despite the structured-output schema, models occasionally wrap the JSON in
/// a ```json fence. The payload inside the fence is returned unchanged; text
/// without a fence passes through trimmed.
pub(crate) fn strip_code_fences(text: &str) -> &str {
    match FENCE_RE.captures(text) {
        Some(captures) => captures.get(1).map_or(text, |m| m.as_str()),
        None => text.trim(),
    }
}

/// The AI's structured evaluation of one submission.
///
/// Fields:
/// - `score`: Awarded score, within `[0, max_points]` of the assignment.
/// - `pedagogical_feedback`: Feedback addressed to the student.
/// - `improvement_suggestions`: Concrete next steps.
/// - `justification`: Criterion-by-criterion explanation of the score.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GradeResult {
    pub score: f64,
    pub pedagogical_feedback: String,
    pub improvement_suggestions: Vec<String>,
    pub justification: String,
}

impl GradeResult {
    /// Checks that the awarded score is a finite number within bounds.
    pub fn validate(&self, max_points: f64) -> Result<(), String> {
        if !self.score.is_finite() {
            return Err(format!("score is not a finite number: {}", self.score));
        }
        if self.score < 0.0 || self.score > max_points {
            return Err(format!(
                "score {} outside the allowed range [0, {}]",
                self.score, max_points
            ));
        }
        Ok(())
    }
}

/// A fully assembled grading request, ready to send.
///
/// Building a request is pure: no network access, no clock, no randomness.
/// The same assignment, rubric and submission always produce the same
/// request, which keeps batch grading reproducible and testable offline.
#[derive(Debug, Clone, PartialEq)]
pub struct GradingRequest {
    pub(crate) prompt: String,
    pub(crate) max_points: f64,
}

impl GradingRequest {
    /// Assembles the grading prompt for one submission.
    ///
    /// Arguments:
    /// - `assignment`: The assignment being graded; supplies title,
    ///   description and the score ceiling.
    /// - `rubric`: The grading contract. Must have at least one criterion.
    /// - `submission`: The student's work. A blank response is sent as-is so
    ///   the model can award the rubric's zero levels.
    ///
    /// Returns:
    /// - `Ok(GradingRequest)`: Prompt plus the score bound for validation.
    /// - `Err(GradingError::EmptyRubric)`: The rubric has no criteria.
    pub fn build(
        assignment: &Assignment,
        rubric: &Rubric,
        submission: &Submission,
    ) -> Result<GradingRequest, GradingError> {
        if rubric.criteria.is_empty() {
            return Err(GradingError::EmptyRubric);
        }

        // The rubric goes in as JSON so criterion/level structure survives
        // verbatim instead of being flattened into prose.
        let rubric_json = serde_json::to_string_pretty(rubric)
            .map_err(|e| GradingError::Unknown(format!("rubric serialization failed: {}", e)))?;

        let prompt = format!(
            "Grade the following student submission.\n\n\
             Assignment title: {title}\n\
             Assignment description: {description}\n\
             Maximum score: {max_points}\n\n\
             Evaluation rubric (JSON):\n{rubric}\n\n\
             Student ({student}) response:\n\"\"\"\n{response}\n\"\"\"",
            title = assignment.title,
            description = assignment.description_or_na(),
            max_points = assignment.max_points,
            rubric = rubric_json,
            student = submission.user_name,
            response = submission.student_response,
        );

        Ok(GradingRequest {
            prompt,
            max_points: assignment.max_points,
        })
    }

    /// Renders the request as a `generateContent` body with structured output.
    pub(crate) fn to_body(&self) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": self.prompt }]
            }],
            "systemInstruction": {
                "parts": [{ "text": GRADING_SYSTEM_INSTRUCTION }]
            },
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": &*GRADE_RESPONSE_SCHEMA
            }
        })
    }

    /// Parses and validates the model's text reply.
    ///
    /// Returns `Malformed` when the text is not the required JSON shape or
    /// the score falls outside `[0, max_points]`. Out-of-range scores are
    /// rejected, never clamped.
    pub(crate) fn parse_response(&self, text: &str) -> Result<GradeResult, GradingError> {
        let payload = strip_code_fences(text);

        let result: GradeResult = serde_json::from_str(payload)
            .map_err(|e| GradingError::Malformed(format!("grade JSON did not parse: {}", e)))?;

        result.validate(self.max_points).map_err(GradingError::Malformed)?;

        Ok(result)
    }
}

/// The grading side of a batch run.
///
/// [`GeminiClient`](crate::gemini::GeminiClient) is the production
/// implementation; tests substitute scripted stubs so orchestration can be
/// exercised without a network.
pub trait GradingBackend: Send + Sync {
    /// Cheap configuration check, run once before a batch starts.
    ///
    /// Returns `GradingError::Config` when no credential is available, so a
    /// misconfigured run fails before any student is touched.
    fn preflight(&self) -> Result<(), GradingError>;

    /// Grades one submission against the assignment's rubric.
    fn grade(
        &self,
        assignment: &Assignment,
        rubric: &Rubric,
        submission: &Submission,
    ) -> impl Future<Output = Result<GradeResult, GradingError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::AssignmentStatus;
    use crate::rubric::{Criterion, CriterionLevel};
    use crate::submission::SubmissionState;

    fn assignment() -> Assignment {
        Assignment {
            id: "a1".to_string(),
            course_id: "c1".to_string(),
            title: "Photosynthesis essay".to_string(),
            description: Some("Explain the light-dependent reactions.".to_string()),
            max_points: 10.0,
            status: AssignmentStatus::Published,
            due_date: None,
        }
    }

    fn rubric() -> Rubric {
        Rubric {
            id: "r1".to_string(),
            name: "Essay rubric".to_string(),
            criteria: vec![Criterion {
                id: "cr1".to_string(),
                title: "Accuracy".to_string(),
                description: "Scientific accuracy of the explanation".to_string(),
                levels: vec![
                    CriterionLevel {
                        score: 10.0,
                        title: "Excellent".to_string(),
                        description: "Fully accurate".to_string(),
                    },
                    CriterionLevel {
                        score: 0.0,
                        title: "Missing".to_string(),
                        description: "Absent or wrong".to_string(),
                    },
                ],
            }],
        }
    }

    fn submission(response: &str) -> Submission {
        Submission {
            id: "sub-1".to_string(),
            user_id: "s1".to_string(),
            user_name: "Ana Souza".to_string(),
            assignment_id: "a1".to_string(),
            student_response: response.to_string(),
            state: SubmissionState::TurnedIn,
            attachments: vec![],
        }
    }

    #[test]
    fn build_is_deterministic() {
        let a = assignment();
        let r = rubric();
        let s = submission("Chlorophyll absorbs light.");

        let first = GradingRequest::build(&a, &r, &s).unwrap();
        let second = GradingRequest::build(&a, &r, &s).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn build_includes_assignment_rubric_and_response() {
        let request = GradingRequest::build(
            &assignment(),
            &rubric(),
            &submission("Chlorophyll absorbs light."),
        )
        .unwrap();

        assert!(request.prompt.contains("Photosynthesis essay"));
        assert!(request.prompt.contains("light-dependent reactions"));
        assert!(request.prompt.contains("Accuracy"));
        assert!(request.prompt.contains("Chlorophyll absorbs light."));
        assert!(request.prompt.contains("Maximum score: 10"));
    }

    #[test]
    fn build_rejects_empty_rubric() {
        let mut empty = rubric();
        empty.criteria.clear();

        assert_eq!(
            GradingRequest::build(&assignment(), &empty, &submission("x")),
            Err(GradingError::EmptyRubric)
        );
    }

    #[test]
    fn missing_description_becomes_na() {
        let mut a = assignment();
        a.description = None;

        let request = GradingRequest::build(&a, &rubric(), &submission("x")).unwrap();

        assert!(request.prompt.contains("Assignment description: N/A"));
    }

    #[test]
    fn blank_response_is_sent_not_rejected() {
        let request = GradingRequest::build(&assignment(), &rubric(), &submission("")).unwrap();

        assert!(request.prompt.contains("response:\n\"\"\"\n\n\"\"\""));
    }

    #[test]
    fn body_requests_structured_output() {
        let request =
            GradingRequest::build(&assignment(), &rubric(), &submission("x")).unwrap();
        let body = request.to_body();

        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert!(body["generationConfig"]["responseSchema"]["required"]
            .as_array()
            .unwrap()
            .iter()
            .any(|f| f == "pedagogicalFeedback"));
    }

    #[test]
    fn parse_accepts_well_formed_grade() {
        let request =
            GradingRequest::build(&assignment(), &rubric(), &submission("x")).unwrap();

        let result = request
            .parse_response(
                r#"{
                    "score": 8.5,
                    "pedagogicalFeedback": "Well argued overall.",
                    "improvementSuggestions": ["Cite the Calvin cycle explicitly."],
                    "justification": "Accuracy: mostly correct."
                }"#,
            )
            .unwrap();

        assert_eq!(result.score, 8.5);
        assert_eq!(result.improvement_suggestions.len(), 1);
    }

    #[test]
    fn parse_accepts_fenced_grade() {
        let request =
            GradingRequest::build(&assignment(), &rubric(), &submission("x")).unwrap();

        let text = "```json\n{\"score\": 7, \"pedagogicalFeedback\": \"Good.\", \
                    \"improvementSuggestions\": [], \"justification\": \"ok\"}\n```";

        assert_eq!(request.parse_response(text).unwrap().score, 7.0);
    }

    #[test]
    fn parse_rejects_missing_fields() {
        let request =
            GradingRequest::build(&assignment(), &rubric(), &submission("x")).unwrap();

        let result = request.parse_response(r#"{ "score": 5 }"#);

        assert!(matches!(result, Err(GradingError::Malformed(_))));
    }

    #[test]
    fn parse_rejects_out_of_range_score() {
        let request =
            GradingRequest::build(&assignment(), &rubric(), &submission("x")).unwrap();

        let text = r#"{
            "score": 11,
            "pedagogicalFeedback": "f",
            "improvementSuggestions": [],
            "justification": "j"
        }"#;

        assert!(matches!(
            request.parse_response(text),
            Err(GradingError::Malformed(_))
        ));
    }

    #[test]
    fn parse_rejects_non_json_text() {
        let request =
            GradingRequest::build(&assignment(), &rubric(), &submission("x")).unwrap();

        assert!(matches!(
            request.parse_response("I would give this an 8 out of 10."),
            Err(GradingError::Malformed(_))
        ));
    }

    #[test]
    fn fence_stripping_passes_plain_text_through() {
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
    }
}

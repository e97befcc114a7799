// Import necessary crates and modules
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde_json::{json, Value};
use tokio::sync::Semaphore;

use crate::assignment::Assignment;
use crate::connection::{extract_text, send_generate_request, SIMULTANEOUS_REQUESTS_LIMIT};
use crate::credentials::GeminiCredentials;
use crate::error::GradingError;
use crate::grading::{GradeResult, GradingBackend, GradingRequest};
use crate::rubric::Rubric;
use crate::submission::Submission;

/// Model used for grading submissions and for chat. Strongest reasoning,
/// slowest and most expensive.
pub const GRADING_MODEL: &str = "gemini-3-pro-preview";

/// Model used to draft rubrics from an assignment description.
pub const RUBRIC_MODEL: &str = "gemini-3-pro-preview";

/// Model used for the quick assignment insight shown while a view loads.
pub const FAST_INSIGHT_MODEL: &str = "gemini-flash-lite-latest";

/// Model used for the fuller assignment insight fetched on demand.
pub const DETAILED_INSIGHT_MODEL: &str = "gemini-3-flash-preview";

/// JSON schema the model must follow when drafting a rubric.
static RUBRIC_RESPONSE_SCHEMA: Lazy<Value> = Lazy::new(|| {
    let level = json!({
        "type": "OBJECT",
        "properties": {
            "score": { "type": "NUMBER" },
            "title": { "type": "STRING" },
            "description": { "type": "STRING" }
        },
        "required": ["score", "title", "description"]
    });

    json!({
        "type": "OBJECT",
        "properties": {
            "id": { "type": "STRING" },
            "name": { "type": "STRING" },
            "criteria": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": { "type": "STRING" },
                        "title": { "type": "STRING" },
                        "description": { "type": "STRING" },
                        "levels": { "type": "ARRAY", "items": level }
                    },
                    "required": ["id", "title", "description", "levels"]
                }
            }
        },
        "required": ["id", "name", "criteria"]
    })
});

const RUBRIC_SYSTEM_INSTRUCTION: &str = "You are an experienced teacher designing an evaluation \
rubric. Produce at least three criteria relevant to the assignment. Each criterion must have \
exactly four levels, scored at 100%, 70%, 40% and 0% of that criterion's share of the total \
points, in that order. Respond only with the requested JSON object.";

const INSIGHT_SYSTEM_INSTRUCTION: &str = "You are a pedagogical assistant. Given an assignment, \
offer the teacher a short insight: what the assignment exercises, where students typically \
struggle, and one suggestion for grading it fairly. Answer in plain prose.";

/// Client for the generative-AI grading service.
///
/// The client is cheap to clone: the HTTP pool, the credential and the
/// request limiter are all shared. One client instance allows at most
/// [`SIMULTANEOUS_REQUESTS_LIMIT`] generate calls in flight at a time;
/// additional callers wait on the internal semaphore.
///
/// A client can be constructed without a credential (see
/// [`GeminiClient::discover`]); every call then fails with
/// `GradingError::Config` until one is configured. [`GradingBackend::preflight`]
/// surfaces that state before a batch run touches any student.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    credentials: Option<GeminiCredentials>,
    limiter: Arc<Semaphore>,
}

impl GeminiClient {
    /// Builds a client from an explicit credential.
    pub fn new(credentials: GeminiCredentials) -> GeminiClient {
        GeminiClient {
            http: reqwest::Client::new(),
            credentials: Some(credentials),
            limiter: Arc::new(Semaphore::new(SIMULTANEOUS_REQUESTS_LIMIT)),
        }
    }

    /// Builds a client from whatever credential source is configured.
    ///
    /// The environment is consulted first, then the system keyring (see
    /// [`GeminiCredentials::credentials`]). When neither holds a key the
    /// client is still returned, unconfigured; `preflight` and every call
    /// report `GradingError::Config` until a credential appears.
    pub fn discover() -> GeminiClient {
        let credentials = match GeminiCredentials::credentials() {
            Ok(credentials) => Some(credentials),
            Err(e) => {
                log::warn!("no grading credential found: {}", e);
                None
            }
        };

        GeminiClient {
            http: reqwest::Client::new(),
            credentials,
            limiter: Arc::new(Semaphore::new(SIMULTANEOUS_REQUESTS_LIMIT)),
        }
    }

    fn credentials(&self) -> Result<&GeminiCredentials, GradingError> {
        self.credentials
            .as_ref()
            .ok_or_else(|| GradingError::Config("client has no API credential".to_string()))
    }

    /// Sends one generate call under the request limiter and returns the
    /// candidate text.
    async fn generate(&self, model: &str, body: &Value) -> Result<String, GradingError> {
        let credentials = self.credentials()?;

        // Acquire never fails here: the semaphore is owned by the client and
        // never closed.
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|e| GradingError::Unknown(format!("request limiter closed: {}", e)))?;

        let response = send_generate_request(&self.http, credentials, model, body).await?;
        extract_text(&response)
    }

    /// Drafts a rubric for an assignment.
    ///
    /// The draft is validated structurally before being returned, so callers
    /// always receive a rubric that [`Rubric::validate`] accepts. A draft the
    /// model got wrong is a `Malformed` error, not a silently broken rubric.
    pub async fn generate_rubric(&self, assignment: &Assignment) -> Result<Rubric, GradingError> {
        let prompt = format!(
            "Create an evaluation rubric for the following assignment.\n\n\
             Title: {title}\n\
             Description: {description}\n\
             Total points: {max_points}",
            title = assignment.title,
            description = assignment.description_or_na(),
            max_points = assignment.max_points,
        );

        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "systemInstruction": { "parts": [{ "text": RUBRIC_SYSTEM_INSTRUCTION }] },
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": &*RUBRIC_RESPONSE_SCHEMA
            }
        });

        let text = self.generate(RUBRIC_MODEL, &body).await?;
        let payload = crate::grading::strip_code_fences(&text);

        let rubric: Rubric = serde_json::from_str(payload)
            .map_err(|e| GradingError::Malformed(format!("rubric JSON did not parse: {}", e)))?;

        check_rubric_draft(&rubric, assignment)?;

        Ok(rubric)
    }

    /// Fetches the quick assignment insight, suitable for prefetching.
    pub async fn fast_insight(
        &self,
        title: &str,
        description: &str,
    ) -> Result<String, GradingError> {
        self.insight(FAST_INSIGHT_MODEL, title, description).await
    }

    /// Fetches the fuller assignment insight.
    pub async fn detailed_insight(
        &self,
        title: &str,
        description: &str,
    ) -> Result<String, GradingError> {
        self.insight(DETAILED_INSIGHT_MODEL, title, description).await
    }

    async fn insight(
        &self,
        model: &str,
        title: &str,
        description: &str,
    ) -> Result<String, GradingError> {
        let prompt = format!(
            "Assignment title: {}\nAssignment description: {}",
            title, description
        );

        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "systemInstruction": { "parts": [{ "text": INSIGHT_SYSTEM_INSTRUCTION }] }
        });

        self.generate(model, &body).await
    }

    /// Opens a chat session with the given system instruction.
    ///
    /// Used for the teacher's follow-up conversation about a produced grade;
    /// the caller typically seeds the instruction with the assignment, rubric
    /// and grade context.
    pub fn start_chat(&self, system_instruction: impl Into<String>) -> ChatSession {
        ChatSession {
            client: self.clone(),
            system_instruction: system_instruction.into(),
            history: Vec::new(),
        }
    }
}

/// Structural checks on a model-drafted rubric.
///
/// Beyond [`Rubric::validate`], the draft's best-level scores must add up to
/// the assignment's maximum: a rubric whose total cannot reach `max_points`
/// would make the top grade unreachable. Fractional point splits leave the
/// sum slightly off, so the comparison carries a small tolerance.
fn check_rubric_draft(rubric: &Rubric, assignment: &Assignment) -> Result<(), GradingError> {
    rubric.validate().map_err(GradingError::Malformed)?;

    let total = rubric.max_score();
    if (total - assignment.max_points).abs() > 0.01 {
        return Err(GradingError::Malformed(format!(
            "rubric totals {} points, assignment is worth {}",
            total, assignment.max_points
        )));
    }

    Ok(())
}

impl GradingBackend for GeminiClient {
    fn preflight(&self) -> Result<(), GradingError> {
        self.credentials().map(|_| ())
    }

    async fn grade(
        &self,
        assignment: &Assignment,
        rubric: &Rubric,
        submission: &Submission,
    ) -> Result<GradeResult, GradingError> {
        let request = GradingRequest::build(assignment, rubric, submission)?;
        let text = self.generate(GRADING_MODEL, &request.to_body()).await?;
        request.parse_response(&text)
    }
}

/// One prior exchange in a chat session.
#[derive(Debug, Clone)]
struct ChatTurn {
    role: &'static str,
    text: String,
}

/// A stateful conversation with the grading model.
///
/// History grows only on successful exchanges: a failed send leaves the
/// session exactly as it was, so the caller can retry the same message.
pub struct ChatSession {
    client: GeminiClient,
    system_instruction: String,
    history: Vec<ChatTurn>,
}

impl ChatSession {
    /// Sends one user message and returns the model's reply.
    pub async fn send(&mut self, message: &str) -> Result<String, GradingError> {
        let mut contents: Vec<Value> = self
            .history
            .iter()
            .map(|turn| {
                json!({ "role": turn.role, "parts": [{ "text": turn.text }] })
            })
            .collect();
        contents.push(json!({ "role": "user", "parts": [{ "text": message }] }));

        let body = json!({
            "contents": contents,
            "systemInstruction": { "parts": [{ "text": self.system_instruction }] }
        });

        let reply = self.client.generate(GRADING_MODEL, &body).await?;

        self.history.push(ChatTurn {
            role: "user",
            text: message.to_string(),
        });
        self.history.push(ChatTurn {
            role: "model",
            text: reply.clone(),
        });

        Ok(reply)
    }

    /// Number of messages exchanged so far (user and model turns combined).
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Whether no exchange has completed yet.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::AssignmentStatus;
    use crate::rubric::{Criterion, CriterionLevel};

    fn unconfigured() -> GeminiClient {
        GeminiClient {
            http: reqwest::Client::new(),
            credentials: None,
            limiter: Arc::new(Semaphore::new(SIMULTANEOUS_REQUESTS_LIMIT)),
        }
    }

    #[test]
    fn preflight_fails_without_credentials() {
        assert!(matches!(
            unconfigured().preflight(),
            Err(GradingError::Config(_))
        ));
    }

    #[test]
    fn preflight_passes_with_credentials() {
        let client = GeminiClient::new(GeminiCredentials::new("secret-key"));
        assert!(client.preflight().is_ok());
    }

    #[tokio::test]
    async fn generate_fails_fast_without_credentials() {
        let client = unconfigured();
        let result = client
            .generate(GRADING_MODEL, &json!({ "contents": [] }))
            .await;

        assert!(matches!(result, Err(GradingError::Config(_))));
    }

    fn assignment(max_points: f64) -> Assignment {
        Assignment {
            id: "a1".to_string(),
            course_id: "c1".to_string(),
            title: "Essay".to_string(),
            description: None,
            max_points,
            status: AssignmentStatus::Published,
            due_date: None,
        }
    }

    fn draft(criterion_points: &[f64]) -> Rubric {
        Rubric {
            id: "r1".to_string(),
            name: "Draft rubric".to_string(),
            criteria: criterion_points
                .iter()
                .enumerate()
                .map(|(i, points)| Criterion {
                    id: format!("cr{}", i + 1),
                    title: format!("Criterion {}", i + 1),
                    description: "Generated".to_string(),
                    levels: vec![
                        CriterionLevel {
                            score: *points,
                            title: "Excellent".to_string(),
                            description: "Full marks".to_string(),
                        },
                        CriterionLevel {
                            score: 0.0,
                            title: "Missing".to_string(),
                            description: "No credit".to_string(),
                        },
                    ],
                })
                .collect(),
        }
    }

    #[test]
    fn draft_matching_assignment_total_passes() {
        let rubric = draft(&[4.0, 3.0, 3.0]);
        assert!(check_rubric_draft(&rubric, &assignment(10.0)).is_ok());
    }

    #[test]
    fn draft_with_fractional_split_passes_within_tolerance() {
        // Three-way split of 10 points rounds to 3.33 each.
        let rubric = draft(&[3.33, 3.33, 3.34]);
        assert!(check_rubric_draft(&rubric, &assignment(10.0)).is_ok());
    }

    #[test]
    fn draft_not_totaling_max_points_is_malformed() {
        let rubric = draft(&[4.0, 3.0]);
        assert!(matches!(
            check_rubric_draft(&rubric, &assignment(10.0)),
            Err(GradingError::Malformed(_))
        ));
    }

    #[test]
    fn structurally_invalid_draft_is_malformed() {
        let mut rubric = draft(&[10.0]);
        rubric.criteria[0].levels[1].score = 1.0;
        assert!(matches!(
            check_rubric_draft(&rubric, &assignment(10.0)),
            Err(GradingError::Malformed(_))
        ));
    }

    #[test]
    fn chat_history_starts_empty() {
        let client = GeminiClient::new(GeminiCredentials::new("secret-key"));
        let session = client.start_chat("You are a helpful assistant.");

        assert!(session.is_empty());
        assert_eq!(session.len(), 0);
    }
}

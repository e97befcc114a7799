// Import necessary crates and modules
use serde::{Deserialize, Serialize};

/// Workflow state of a student submission in the external classroom system.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionState {
    New,
    Created,
    TurnedIn,
    Returned,
    ReclaimedByStudent,
}

/// A file attached to a submission.
///
/// Attachments are carried for display only; grading operates on the text
/// response.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Attachment {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

/// A student's submission to an assignment.
///
/// Fields:
/// - `id`: Unique identifier of the submission.
/// - `user_id`: Identifier of the submitting student.
/// - `user_name`: Display name of the submitting student.
/// - `assignment_id`: Identifier of the assignment.
/// - `student_response`: The student's text answer, possibly empty.
/// - `state`: Workflow state in the classroom system.
/// - `attachments`: Attached files, empty when absent from the payload.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub assignment_id: String,
    pub student_response: String,
    pub state: SubmissionState,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_classroom_shaped_json() {
        let submission: Submission = serde_json::from_str(
            r#"{
                "id": "sub-1",
                "userId": "s1",
                "userName": "Ana Souza",
                "assignmentId": "a1",
                "studentResponse": "My answer.",
                "state": "TURNED_IN",
                "attachments": [
                    { "name": "essay.pdf", "type": "application/pdf", "url": "https://files/essay.pdf" }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(submission.state, SubmissionState::TurnedIn);
        assert_eq!(submission.attachments[0].kind, "application/pdf");
    }

    #[test]
    fn attachments_default_to_empty() {
        let submission: Submission = serde_json::from_str(
            r#"{
                "id": "sub-2",
                "userId": "s2",
                "userName": "Bruno Lima",
                "assignmentId": "a1",
                "studentResponse": "",
                "state": "CREATED"
            }"#,
        )
        .unwrap();

        assert!(submission.attachments.is_empty());
    }
}

// Import necessary crates and modules
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Publication status of an assignment in the external classroom system.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentStatus {
    Draft,
    Published,
    Graded,
}

/// A gradable unit of work belonging to a course.
///
/// Assignments are immutable once fetched; they are owned by the external
/// course provider and consumed read-only by the grading core. `max_points`
/// bounds every AI-produced score for this assignment: a grading response
/// outside `[0, max_points]` is rejected as malformed, never clamped.
///
/// Fields:
/// - `id`: Unique identifier of the assignment.
/// - `course_id`: Identifier of the parent course.
/// - `title`: Display title.
/// - `description`: Optional free-text description.
/// - `max_points`: Maximum score, non-negative.
/// - `status`: Publication status (draft, published, graded).
/// - `due_date`: Optional due date.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub description: Option<String>,
    pub max_points: f64,
    pub status: AssignmentStatus,
    pub due_date: Option<DateTime<Utc>>,
}

impl Assignment {
    /// The description as prompt text, `"N/A"` when absent.
    pub fn description_or_na(&self) -> &str {
        self.description.as_deref().unwrap_or("N/A")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Assignment {
        Assignment {
            id: "a1".to_string(),
            course_id: "c1".to_string(),
            title: "Strategic planning exercise".to_string(),
            description: None,
            max_points: 10.0,
            status: AssignmentStatus::Published,
            due_date: None,
        }
    }

    #[test]
    fn missing_description_renders_as_na() {
        assert_eq!(sample().description_or_na(), "N/A");
    }

    #[test]
    fn deserializes_classroom_shaped_json() {
        let assignment: Assignment = serde_json::from_str(
            r#"{
                "id": "a2",
                "courseId": "c1",
                "title": "5th learning activity",
                "maxPoints": 10,
                "status": "PUBLISHED",
                "description": null,
                "dueDate": null
            }"#,
        )
        .unwrap();

        assert_eq!(assignment.status, AssignmentStatus::Published);
        assert_eq!(assignment.max_points, 10.0);
    }
}

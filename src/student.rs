use serde::{Deserialize, Serialize};

/// A student enrolled in a course.
///
/// Only the identifier and display name are carried; grading state lives in
/// the batch run's status map, not on the roster entry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
}

use serde::{Deserialize, Serialize};

/// A classroom course as served by the external course provider.
///
/// Courses are read-only inputs to this crate: they are fetched through a
/// [`ClassroomProvider`](crate::classroom::ClassroomProvider) and never
/// mutated here.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub name: String,
    pub section: Option<String>,
    pub description_heading: Option<String>,
    pub owner_id: String,
}

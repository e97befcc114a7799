// Import necessary crates and modules
use std::future::Future;

use crate::assignment::Assignment;
use crate::course::Course;
use crate::error::ProviderError;
use crate::student::Student;
use crate::submission::Submission;

/// Read-only access to the external classroom system.
///
/// The grading core never talks to a classroom API directly; it consumes
/// courses, assignments, rosters and submissions through this trait. An
/// implementation typically wraps an LMS REST client; tests substitute
/// in-memory stubs.
///
/// Provider failures are transient and isolated: during a batch run, a failed
/// `get_submission` marks only that student as errored and never aborts the
/// run.
pub trait ClassroomProvider: Send + Sync {
    /// Lists the courses visible to the configured account.
    fn list_courses(&self) -> impl Future<Output = Result<Vec<Course>, ProviderError>> + Send;

    /// Lists the assignments of a course.
    fn list_assignments(
        &self,
        course_id: &str,
    ) -> impl Future<Output = Result<Vec<Assignment>, ProviderError>> + Send;

    /// Lists the students enrolled in a course, in roster order.
    fn list_students(
        &self,
        course_id: &str,
    ) -> impl Future<Output = Result<Vec<Student>, ProviderError>> + Send;

    /// Fetches one student's submission for an assignment.
    fn get_submission(
        &self,
        course_id: &str,
        assignment_id: &str,
        student_id: &str,
    ) -> impl Future<Output = Result<Submission, ProviderError>> + Send;
}

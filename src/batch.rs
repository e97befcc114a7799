// Batch grading orchestration.
//
// One batch run grades a whole roster for one assignment. The run owns a
// status map keyed by student id; every student walks pending -> loading ->
// success | error independently, so one student's failure never touches the
// others. Observers poll a cloneable handle for progress.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::assignment::Assignment;
use crate::classroom::ClassroomProvider;
use crate::error::GradingError;
use crate::grading::{GradeResult, GradingBackend};
use crate::rubric::Rubric;
use crate::student::Student;

/// Grading status of one student within a batch run.
///
/// Transitions are one-way: `Pending` to `Loading`, then `Loading` to exactly
/// one of `Success` or `Error`. Terminal states never change again, not even
/// on cancellation.
#[derive(Debug, Clone, PartialEq)]
pub enum StudentStatus {
    Pending,
    Loading,
    Success,
    Error(GradingError),
}

impl StudentStatus {
    /// Whether this status is final for the run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StudentStatus::Success | StudentStatus::Error(_))
    }
}

/// Overall state of a batch run.
///
/// A cancelled run still ends in `Finished`; cancellation only stops new
/// students from being started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    /// No run in progress. A handle is only created for a started run, so
    /// this is the observer-side value an embedding application reports
    /// while it holds no handle.
    Idle,
    Running,
    Finished,
}

/// Outcome counts of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    /// Whether the run finished with at least one student in error.
    ///
    /// A fully failed run counts too: zero successes is still a finished
    /// batch that needs surfacing, not a crash.
    pub fn is_partial_failure(&self) -> bool {
        self.failed > 0
    }
}

struct BatchInner {
    state: BatchState,
    /// Roster order, fixed at start. Status map iteration follows this.
    order: Vec<Student>,
    status: HashMap<String, StudentStatus>,
    results: HashMap<String, GradeResult>,
    /// Count of students in a terminal state. Only ever incremented.
    completed: usize,
}

/// Observer and control handle for one batch run.
///
/// Handles are cheap to clone and safe to poll from any thread. All accessors
/// take a snapshot under the internal lock; none of them block on grading.
#[derive(Clone)]
pub struct BatchHandle {
    inner: Arc<Mutex<BatchInner>>,
    cancelled: Arc<AtomicBool>,
}

impl BatchHandle {
    fn new(order: Vec<Student>, state: BatchState) -> BatchHandle {
        let status = order
            .iter()
            .map(|s| (s.id.clone(), StudentStatus::Pending))
            .collect();

        BatchHandle {
            inner: Arc::new(Mutex::new(BatchInner {
                state,
                order,
                status,
                results: HashMap::new(),
                completed: 0,
            })),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Current state of the run.
    pub fn state(&self) -> BatchState {
        self.inner.lock().unwrap().state
    }

    /// Status of one student, `None` for ids outside the roster.
    pub fn student_status(&self, student_id: &str) -> Option<StudentStatus> {
        self.inner.lock().unwrap().status.get(student_id).cloned()
    }

    /// Snapshot of all statuses in roster order.
    pub fn statuses(&self) -> Vec<(Student, StudentStatus)> {
        let inner = self.inner.lock().unwrap();
        inner
            .order
            .iter()
            .map(|student| {
                let status = inner
                    .status
                    .get(&student.id)
                    .cloned()
                    .unwrap_or(StudentStatus::Pending);
                (student.clone(), status)
            })
            .collect()
    }

    /// The grade produced for one student, if that student succeeded.
    pub fn result(&self, student_id: &str) -> Option<GradeResult> {
        self.inner.lock().unwrap().results.get(student_id).cloned()
    }

    /// Terminal-state count and roster size, as `(completed, total)`.
    pub fn completed(&self) -> (usize, usize) {
        let inner = self.inner.lock().unwrap();
        (inner.completed, inner.order.len())
    }

    /// Completed fraction as a whole percentage.
    ///
    /// Monotonically non-decreasing over the life of the run. An empty roster
    /// reports 100, never a division by zero.
    pub fn progress_percent(&self) -> u8 {
        let inner = self.inner.lock().unwrap();
        if inner.order.is_empty() {
            return 100;
        }
        let ratio = inner.completed as f64 / inner.order.len() as f64;
        (ratio * 100.0).round() as u8
    }

    /// Requests cancellation of the run.
    ///
    /// Idempotent. Students already in a terminal state keep their outcome,
    /// the student currently grading runs to completion, and students not yet
    /// started stay `Pending`. The run still transitions to `Finished`.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Outcome counts so far; meaningful once the run is `Finished`.
    pub fn summary(&self) -> BatchSummary {
        let inner = self.inner.lock().unwrap();
        let succeeded = inner
            .status
            .values()
            .filter(|s| matches!(s, StudentStatus::Success))
            .count();
        let failed = inner
            .status
            .values()
            .filter(|s| matches!(s, StudentStatus::Error(_)))
            .count();

        BatchSummary {
            total: inner.order.len(),
            succeeded,
            failed,
        }
    }

    fn set_state(&self, state: BatchState) {
        self.inner.lock().unwrap().state = state;
    }

    fn mark_loading(&self, student_id: &str) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(status) = inner.status.get_mut(student_id) {
            if *status == StudentStatus::Pending {
                *status = StudentStatus::Loading;
            }
        }
    }

    fn mark_success(&self, student_id: &str, result: GradeResult) {
        let mut guard = self.inner.lock().unwrap();
        let inner = &mut *guard;
        let Some(status) = inner.status.get_mut(student_id) else {
            return;
        };
        // Terminal states are sticky.
        if status.is_terminal() {
            return;
        }
        *status = StudentStatus::Success;
        inner.results.insert(student_id.to_string(), result);
        inner.completed += 1;
    }

    fn mark_error(&self, student_id: &str, error: GradingError) {
        let mut guard = self.inner.lock().unwrap();
        let inner = &mut *guard;
        let Some(status) = inner.status.get_mut(student_id) else {
            return;
        };
        if status.is_terminal() {
            return;
        }
        *status = StudentStatus::Error(error);
        inner.completed += 1;
    }
}

/// Runs batch grading over a roster.
///
/// The orchestrator borrows nothing from its caller past `start`: roster,
/// assignment and rubric are snapshotted into the spawned task, so later
/// edits to a rubric do not affect a run already in flight.
pub struct BatchOrchestrator<P, G> {
    provider: Arc<P>,
    grader: Arc<G>,
}

impl<P, G> BatchOrchestrator<P, G>
where
    P: ClassroomProvider + 'static,
    G: GradingBackend + 'static,
{
    pub fn new(provider: Arc<P>, grader: Arc<G>) -> BatchOrchestrator<P, G> {
        BatchOrchestrator { provider, grader }
    }

    /// Starts grading every student in `roster` for `assignment`.
    ///
    /// Fails fast, before any student is touched, when the grader has no
    /// credential (`Config`) or the rubric has no criteria (`EmptyRubric`).
    /// An empty roster finishes immediately at 100% progress.
    ///
    /// On success the run proceeds in a spawned task; the returned handle
    /// observes and cancels it. Students are graded sequentially in roster
    /// order.
    pub fn start(
        &self,
        assignment: Assignment,
        rubric: Rubric,
        roster: Vec<Student>,
    ) -> Result<BatchHandle, GradingError> {
        self.grader.preflight()?;
        if rubric.criteria.is_empty() {
            return Err(GradingError::EmptyRubric);
        }

        if roster.is_empty() {
            return Ok(BatchHandle::new(Vec::new(), BatchState::Finished));
        }

        let handle = BatchHandle::new(roster, BatchState::Running);

        let provider = Arc::clone(&self.provider);
        let grader = Arc::clone(&self.grader);
        let worker_handle = handle.clone();
        tokio::spawn(async move {
            run_batch(provider, grader, assignment, rubric, worker_handle).await;
        });

        Ok(handle)
    }
}

async fn run_batch<P, G>(
    provider: Arc<P>,
    grader: Arc<G>,
    assignment: Assignment,
    rubric: Rubric,
    handle: BatchHandle,
) where
    P: ClassroomProvider,
    G: GradingBackend,
{
    let roster: Vec<Student> = handle.inner.lock().unwrap().order.clone();

    for student in &roster {
        // Checked between students only; the student in flight finishes.
        if handle.is_cancelled() {
            log::info!("batch for assignment {} cancelled", assignment.id);
            break;
        }

        handle.mark_loading(&student.id);

        let outcome = grade_one(&*provider, &*grader, &assignment, &rubric, student).await;

        match outcome {
            Ok(result) => handle.mark_success(&student.id, result),
            Err(error) => {
                log::warn!(
                    "grading failed for student {} on assignment {}: {}",
                    student.id,
                    assignment.id,
                    error
                );
                handle.mark_error(&student.id, error);
            }
        }
    }

    handle.set_state(BatchState::Finished);
}

async fn grade_one<P, G>(
    provider: &P,
    grader: &G,
    assignment: &Assignment,
    rubric: &Rubric,
    student: &Student,
) -> Result<GradeResult, GradingError>
where
    P: ClassroomProvider,
    G: GradingBackend,
{
    let submission = provider
        .get_submission(&assignment.course_id, &assignment.id, &student.id)
        .await
        .map_err(|e| GradingError::Unknown(e.to_string()))?;

    grader.grade(assignment, rubric, &submission).await
}

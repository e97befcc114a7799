//! # AI-Assisted Classroom Grading Library
//!
//! This Rust library provides the core of an AI-assisted grading workflow for classroom
//! assignments. It builds rubric-grounded grading requests, sends them to a generative-AI
//! service, and orchestrates batch grading of a whole roster with per-student failure
//! isolation. The library utilizes the `reqwest` crate for HTTP requests and incorporates
//! concurrency control for efficient request handling.
//!
//! ## Core Features
//!
//! - **Authentication and Configuration:** Handles the grading-service API key, supporting
//!   both environment-variable and system keyring storage.
//! - **Grading Requests:** Deterministically assembles prompts from an assignment, its
//!   rubric and a student submission, and validates the structured response.
//! - **Batch Orchestration:** Grades a roster student by student with one-way status
//!   transitions, monotonic progress reporting and cooperative cancellation.
//! - **Rubrics and Insights:** Drafts rubrics from assignment descriptions and caches
//!   per-assignment pedagogical insights.
//!
//! ## Usage
//!
//! To use this library, add it as a dependency in your `Cargo.toml`. Use the provided
//! structures and functions as per your application's requirements.
//!
//! ```toml
//! [dependencies]
//! classroom_ai_grader = "0.1"
//! ```
//!
//! The primary entry points are [`GeminiClient`] and [`BatchOrchestrator`].
//! `GeminiClient` implements [`GradingBackend`] and grades one submission at a time;
//! `BatchOrchestrator::start` runs a whole roster and hands back a [`BatchHandle`] for
//! polling progress and requesting cancellation. Course data arrives through a
//! [`ClassroomProvider`] implementation supplied by the embedding application.
//!
//! ### Example
//!
//! Grading a roster:
//! ```rust,no_run
//! use std::sync::Arc;
//! use classroom_ai_grader::{BatchOrchestrator, BatchState, GeminiClient};
//! # use classroom_ai_grader::{Assignment, Rubric, Student};
//! # async fn run(assignment: Assignment, rubric: Rubric, roster: Vec<Student>) {
//! let client = Arc::new(GeminiClient::discover());
//! let provider = Arc::new(my_app::Provider::new());
//! let orchestrator = BatchOrchestrator::new(provider, client);
//!
//! let handle = orchestrator.start(assignment, rubric, roster).unwrap();
//! while handle.state() != BatchState::Finished {
//!     println!("progress: {}%", handle.progress_percent());
//!     tokio::time::sleep(std::time::Duration::from_millis(250)).await;
//! }
//! println!("{:?}", handle.summary());
//! # }
//! # mod my_app {
//! #     pub struct Provider;
//! #     impl Provider { pub fn new() -> Self { Provider } }
//! #     use classroom_ai_grader::*;
//! #     impl ClassroomProvider for Provider {
//! #         async fn list_courses(&self) -> Result<Vec<Course>, ProviderError> { Ok(vec![]) }
//! #         async fn list_assignments(&self, _c: &str) -> Result<Vec<Assignment>, ProviderError> { Ok(vec![]) }
//! #         async fn list_students(&self, _c: &str) -> Result<Vec<Student>, ProviderError> { Ok(vec![]) }
//! #         async fn get_submission(&self, _c: &str, _a: &str, _s: &str) -> Result<Submission, ProviderError> {
//! #             Err(ProviderError("unimplemented".to_string()))
//! #         }
//! #     }
//! # }
//! ```
pub mod assignment; // Assignments and their publication status.
pub mod batch; // Batch grading orchestration over a roster.
pub mod classroom; // Read-only access to the external classroom system.
mod connection; // HTTP plumbing for the generative-AI service.
pub mod course; // Classroom courses.
pub mod credentials; // Storage and retrieval of the grading-service API key.
pub mod error; // Classified grading and provider failures.
pub mod gemini; // Client for the generative-AI grading service.
pub mod grading; // Grading requests, results and the grading backend trait.
pub mod insight; // Per-assignment insight cache.
pub mod rubric; // Evaluation rubrics.
pub mod student; // Students on a course roster.
pub mod submission; // Student submissions and attachments.

// Exports key structures for external use.
pub use assignment::{Assignment, AssignmentStatus};
pub use batch::{BatchHandle, BatchOrchestrator, BatchState, BatchSummary, StudentStatus};
pub use classroom::ClassroomProvider;
pub use course::Course;
pub use credentials::GeminiCredentials;
pub use error::{GradingError, ProviderError};
pub use gemini::{ChatSession, GeminiClient};
pub use grading::{GradeResult, GradingBackend, GradingRequest};
pub use insight::{InsightBackend, InsightCache};
pub use rubric::{Criterion, CriterionLevel, Rubric};
pub use student::Student;
pub use submission::{Attachment, Submission, SubmissionState};

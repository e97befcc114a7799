use thiserror::Error;

/// Classified failure of a single grading call.
///
/// Every failure produced by the grading client falls into one of these
/// categories, so callers (the batch orchestrator in particular) can react
/// differently to quota exhaustion, revoked credentials and malformed
/// responses. The orchestrator records the classified error per student and
/// never lets one student's failure abort the rest of the roster.
///
/// Variants:
/// - `Config`: no API credential is configured. Raised before any network
///   attempt is made.
/// - `RateLimited`: the upstream service reported quota exhaustion (HTTP 429).
///   The caller may retry later; the client never retries on its own.
/// - `PermissionDenied`: the upstream service rejected the credential
///   (HTTP 401/403). Fatal for the session until reconfigured.
/// - `Malformed`: a response arrived but did not parse into the required
///   shape, or its score fell outside `[0, max_points]`. Never silently
///   clamped or accepted.
/// - `Unknown`: any other transport or service error.
/// - `EmptyRubric`: the caller supplied a rubric with no criteria. This is an
///   input-validation failure of the request builder, not a response failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GradingError {
    #[error("no API credential configured: {0}")]
    Config(String),

    #[error("upstream quota exhausted (HTTP 429)")]
    RateLimited,

    #[error("upstream rejected the credential")]
    PermissionDenied,

    #[error("response did not match the required shape: {0}")]
    Malformed(String),

    #[error("grading request failed: {0}")]
    Unknown(String),

    #[error("rubric has no criteria")]
    EmptyRubric,
}

impl GradingError {
    /// Maps an unsuccessful HTTP status to its failure class.
    ///
    /// 429 is quota exhaustion, 401/403 are credential rejections, everything
    /// else is reported as `Unknown` together with a snippet of the response
    /// body for diagnostics.
    pub(crate) fn from_status(status: u16, body: &str) -> GradingError {
        match status {
            429 => GradingError::RateLimited,
            401 | 403 => GradingError::PermissionDenied,
            _ => {
                let snippet: String = body.chars().take(200).collect();
                GradingError::Unknown(format!("HTTP {}: {}", status, snippet))
            }
        }
    }
}

/// Failure reported by an external course/roster provider.
///
/// The provider contract is looser than the grading client's: the reference
/// system treated it as always-succeeding, so a single opaque message is
/// enough. The batch orchestrator folds these into the affected student's
/// error slot instead of aborting the run.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("classroom provider error: {0}")]
pub struct ProviderError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_429_is_rate_limited() {
        assert_eq!(
            GradingError::from_status(429, "quota exceeded"),
            GradingError::RateLimited
        );
    }

    #[test]
    fn auth_statuses_are_permission_denied() {
        assert_eq!(
            GradingError::from_status(401, ""),
            GradingError::PermissionDenied
        );
        assert_eq!(
            GradingError::from_status(403, ""),
            GradingError::PermissionDenied
        );
    }

    #[test]
    fn other_statuses_are_unknown_with_body_snippet() {
        match GradingError::from_status(500, "internal error") {
            GradingError::Unknown(msg) => {
                assert!(msg.contains("500"));
                assert!(msg.contains("internal error"));
            }
            other => panic!("expected Unknown, got {:?}", other),
        }
    }
}

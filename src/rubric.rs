// Import necessary crates and modules
use serde::{Deserialize, Serialize};

/// One performance level within a criterion.
///
/// Fields:
/// - `score`: Points awarded at this level.
/// - `title`: Short label, e.g. "Excellent".
/// - `description`: What student work at this level looks like.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CriterionLevel {
    pub score: f64,
    pub title: String,
    pub description: String,
}

/// One evaluation criterion with its ordered performance levels.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    pub id: String,
    pub title: String,
    pub description: String,
    pub levels: Vec<CriterionLevel>,
}

/// An evaluation rubric attached to an assignment.
///
/// A rubric is the contract the AI grades against: every criterion lists its
/// levels from best to worst, and the worst level always scores zero so that
/// a completely missed criterion contributes nothing. [`Rubric::validate`]
/// enforces that shape before any grading request is built from it.
///
/// Fields:
/// - `id`: Unique identifier of the rubric.
/// - `name`: Display name.
/// - `criteria`: The evaluation criteria, at least one.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Rubric {
    pub id: String,
    pub name: String,
    pub criteria: Vec<Criterion>,
}

impl Rubric {
    /// Checks the structural invariants a gradable rubric must satisfy.
    ///
    /// Returns:
    /// - `Ok(())`: The rubric can be used to build grading requests.
    /// - `Err(String)`: Description of the first violation found.
    ///
    /// The invariants checked, per criterion:
    /// - at least one level,
    /// - level scores strictly descending,
    /// - the last (worst) level scores exactly zero.
    pub fn validate(&self) -> Result<(), String> {
        if self.criteria.is_empty() {
            return Err(format!("rubric '{}' has no criteria", self.name));
        }

        for criterion in &self.criteria {
            if criterion.levels.is_empty() {
                return Err(format!("criterion '{}' has no levels", criterion.title));
            }

            for pair in criterion.levels.windows(2) {
                if pair[0].score <= pair[1].score {
                    return Err(format!(
                        "criterion '{}': level scores must be strictly descending ({} then {})",
                        criterion.title, pair[0].score, pair[1].score
                    ));
                }
            }

            // windows(2) guarantees nothing for a single level, so check the
            // floor explicitly.
            let last = &criterion.levels[criterion.levels.len() - 1];
            if last.score != 0.0 {
                return Err(format!(
                    "criterion '{}': worst level must score 0, got {}",
                    criterion.title, last.score
                ));
            }
        }

        Ok(())
    }

    /// The highest score reachable by picking the best level of every
    /// criterion.
    pub fn max_score(&self) -> f64 {
        self.criteria
            .iter()
            .filter_map(|c| c.levels.first())
            .map(|level| level.score)
            .sum()
    }
}

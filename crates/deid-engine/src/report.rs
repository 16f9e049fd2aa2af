use deid_core::Dataset;
use serde::Serialize;

/// Why a row was left as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Null, NaN or whitespace-only value.
    Blank,
    Numeric,
    /// Text shorter than [`deid_core::MIN_TEXT_LEN`].
    TooShort,
    /// Nothing in the value matched.
    NoMatch,
    /// The pipeline had nothing to do for this dataset.
    NotProcessed,
}

/// What happened to one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowOutcome {
    Unchanged(SkipReason),
    Redacted,
    /// Recognition failed; only the blacklist was applied.
    Fallback { reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnonymizationStats {
    /// Rows with a non-blank value.
    pub candidates: usize,
    pub redacted: usize,
    pub fallbacks: usize,
    pub skipped_numeric: usize,
    pub skipped_short: usize,
}

/// Redacted copy of the input plus one outcome per input row.
#[derive(Debug, Clone)]
pub struct AnonymizationReport {
    pub dataset: Dataset,
    pub rows: Vec<RowOutcome>,
    pub stats: AnonymizationStats,
}

impl AnonymizationReport {
    pub(crate) fn unchanged(dataset: &Dataset, reason: SkipReason) -> Self {
        Self {
            dataset: dataset.clone(),
            rows: vec![RowOutcome::Unchanged(reason); dataset.len()],
            stats: AnonymizationStats::default(),
        }
    }

    /// Row indices that fell back to blacklist-only redaction.
    pub fn fallback_rows(&self) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, outcome)| matches!(outcome, RowOutcome::Fallback { .. }))
            .map(|(i, _)| i)
            .collect()
    }
}

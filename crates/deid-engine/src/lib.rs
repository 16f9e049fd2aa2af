//! Record anonymization pipeline
//!
//! Walks a dataset row by row. Freetext rows (by category) go through entity
//! recognition and then the blacklist; every other text row only through the
//! blacklist. Numbers and short codes are never touched, and the input
//! dataset is never modified.

pub mod report;

use deid_core::{Cell, Dataset, MIN_TEXT_LEN, ProgressFn, Result, is_freetext_category};
use deid_recognizer::RecognitionService;
use deid_security::{BlacklistMatcher, DEFAULT_THRESHOLD, MatchMode};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use report::{AnonymizationReport, AnonymizationStats, RowOutcome, SkipReason};

/// Progress is reported after this many candidate rows.
pub const PROGRESS_INTERVAL: usize = 100;

#[derive(Debug, Clone)]
pub struct AnonymizeOptions {
    pub fuzzy: bool,
    /// Similarity threshold in `0..=100`, used when `fuzzy` is set.
    pub threshold: f64,
    pub value_column: String,
    pub category_column: String,
}

impl Default for AnonymizeOptions {
    fn default() -> Self {
        Self {
            fuzzy: true,
            threshold: DEFAULT_THRESHOLD,
            value_column: "value".to_string(),
            category_column: "category".to_string(),
        }
    }
}

impl AnonymizeOptions {
    fn match_mode(&self) -> MatchMode {
        MatchMode::from_flags(self.fuzzy, self.threshold)
    }
}

fn report(progress: Option<&ProgressFn<'_>>, fraction: f64, message: &str) {
    if let Some(progress) = progress {
        progress(fraction, message);
    }
}

enum Route {
    Freetext,
    Structured,
}

pub struct Anonymizer {
    service: Arc<RecognitionService>,
}

impl Anonymizer {
    pub fn new(service: Arc<RecognitionService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<RecognitionService> {
        &self.service
    }

    /// Produce a redacted copy of `dataset`.
    ///
    /// Fails only when freetext rows are present and the recognizer cannot be
    /// initialized. Recognition errors on single rows fall back to the
    /// blacklist and are recorded in the report.
    pub fn anonymize(
        &self,
        dataset: &Dataset,
        blacklist: &[String],
        options: &AnonymizeOptions,
        progress: Option<&ProgressFn<'_>>,
    ) -> Result<AnonymizationReport> {
        if dataset.is_empty() {
            return Ok(AnonymizationReport::unchanged(dataset, SkipReason::NotProcessed));
        }
        let Some(value_col) = dataset.column_index(&options.value_column) else {
            warn!(
                "Column '{}' not found, returning data unchanged",
                options.value_column
            );
            return Ok(AnonymizationReport::unchanged(dataset, SkipReason::NotProcessed));
        };
        let category_col = dataset.column_index(&options.category_column);
        let matcher = BlacklistMatcher::new(blacklist, options.match_mode());

        if matcher.is_empty() && category_col.is_none() {
            debug!("No blacklist and no category column, nothing to do");
            report(progress, 1.0, "Anonymization complete.");
            return Ok(AnonymizationReport::unchanged(dataset, SkipReason::NotProcessed));
        }

        let mut result = AnonymizationReport::unchanged(dataset, SkipReason::Blank);

        let candidates: Vec<(usize, &Cell, Route)> = dataset
            .rows
            .iter()
            .enumerate()
            .filter_map(|(i, row)| {
                let value = row.get(value_col).filter(|v| !v.is_blank())?;
                let freetext = category_col
                    .and_then(|c| row.get(c))
                    .and_then(Cell::as_text)
                    .is_some_and(is_freetext_category);
                let route = if freetext {
                    Route::Freetext
                } else {
                    Route::Structured
                };
                Some((i, value, route))
            })
            .collect();
        let total = candidates.len();
        result.stats.candidates = total;

        let needs_engine = candidates
            .iter()
            .any(|(_, value, route)| matches!(route, Route::Freetext) && rewritable(value).is_some());
        if needs_engine {
            self.service.engine()?;
        }

        info!("Anonymizing {} of {} rows", total, dataset.len());
        report(progress, 0.0, &format!("Anonymizing {} entries...", total));

        for (processed, (index, value, route)) in candidates.into_iter().enumerate() {
            let outcome = if value.is_numeric() {
                result.stats.skipped_numeric += 1;
                RowOutcome::Unchanged(SkipReason::Numeric)
            } else if let Some(text) = rewritable(value) {
                let (redacted, failure) = match route {
                    Route::Freetext => self.redact_freetext(index, text, &matcher),
                    Route::Structured => (matcher.redact(text), None),
                };
                let changed = redacted != text;
                if changed {
                    result.stats.redacted += 1;
                    result.dataset.set_cell(index, value_col, Cell::Text(redacted));
                }
                match failure {
                    Some(reason) => {
                        result.stats.fallbacks += 1;
                        RowOutcome::Fallback { reason }
                    }
                    None if changed => RowOutcome::Redacted,
                    None => RowOutcome::Unchanged(SkipReason::NoMatch),
                }
            } else {
                result.stats.skipped_short += 1;
                RowOutcome::Unchanged(SkipReason::TooShort)
            };
            result.rows[index] = outcome;

            let done = processed + 1;
            if done % PROGRESS_INTERVAL == 0 {
                report(
                    progress,
                    done as f64 / total as f64,
                    &format!("Anonymized: {} / {}", done, total),
                );
            }
        }

        report(progress, 1.0, "Anonymization complete.");
        info!(
            "Anonymization complete: {} redacted, {} fallbacks",
            result.stats.redacted, result.stats.fallbacks
        );
        Ok(result)
    }

    /// Recognizer then blacklist. On a recognition error the blacklist runs
    /// on the original text and the error is returned alongside.
    fn redact_freetext(
        &self,
        index: usize,
        text: &str,
        matcher: &BlacklistMatcher,
    ) -> (String, Option<String>) {
        match self.service.anonymize(text) {
            Ok(recognized) => (matcher.redact(&recognized), None),
            Err(e) => {
                warn!("Recognition failed for row {}: {}", index, e);
                (matcher.redact(text), Some(e.to_string()))
            }
        }
    }

    /// Anonymize a single freetext value: recognizer, then blacklist.
    pub fn anonymize_text(
        &self,
        text: &str,
        blacklist: &[String],
        options: &AnonymizeOptions,
    ) -> Result<String> {
        if text.is_empty() {
            return Ok(String::new());
        }
        let recognized = self.service.anonymize(text)?;
        Ok(BlacklistMatcher::new(blacklist, options.match_mode()).redact(&recognized))
    }
}

/// The text of a cell the pipeline may rewrite: non-numeric and at least
/// [`MIN_TEXT_LEN`] characters long.
fn rewritable(cell: &Cell) -> Option<&str> {
    cell.as_text()
        .filter(|text| text.chars().count() >= MIN_TEXT_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use deid_model::ModelSpec;

    fn uninstalled() -> (tempfile::TempDir, Anonymizer) {
        let dir = tempfile::tempdir().unwrap();
        let service = RecognitionService::with_rules(ModelSpec::new(dir.path()));
        (dir, Anonymizer::new(Arc::new(service)))
    }

    fn terms(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn dataset(rows: Vec<(&str, Cell)>) -> Dataset {
        Dataset::new(vec!["category".to_string(), "value".to_string()]).with_rows(
            rows.into_iter()
                .map(|(category, value)| vec![Cell::from(category), value])
                .collect(),
        )
    }

    #[test]
    fn test_structured_rows_need_no_engine() {
        let (_dir, anonymizer) = uninstalled();
        let data = dataset(vec![
            ("Diagnose", Cell::from("Befund Müller unauffällig")),
            ("Alter", Cell::Integer(54)),
            ("Allergie", Cell::from("ja")),
            ("Kommentar", Cell::Null),
        ]);

        let result = anonymizer
            .anonymize(&data, &terms(&["Müller"]), &AnonymizeOptions::default(), None)
            .unwrap();

        assert_eq!(
            result.dataset.cell(0, 1),
            Some(&Cell::from("Befund <ANONYM> unauffällig"))
        );
        assert_eq!(result.dataset.cell(1, 1), Some(&Cell::Integer(54)));
        assert_eq!(result.dataset.cell(2, 1), Some(&Cell::from("ja")));
        assert_eq!(
            result.rows,
            vec![
                RowOutcome::Redacted,
                RowOutcome::Unchanged(SkipReason::Numeric),
                RowOutcome::Unchanged(SkipReason::TooShort),
                RowOutcome::Unchanged(SkipReason::Blank),
            ]
        );
        assert_eq!(result.stats.candidates, 3);
        assert_eq!(result.stats.redacted, 1);
    }

    #[test]
    fn test_freetext_without_model_is_fatal() {
        let (_dir, anonymizer) = uninstalled();
        let data = dataset(vec![("Visite", Cell::from("Herr Müller stabil"))]);

        let err = anonymizer
            .anonymize(&data, &[], &AnonymizeOptions::default(), None)
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_short_freetext_does_not_need_engine() {
        let (_dir, anonymizer) = uninstalled();
        let data = dataset(vec![("Visite", Cell::from("ok"))]);
        let result = anonymizer
            .anonymize(&data, &[], &AnonymizeOptions::default(), None)
            .unwrap();
        assert_eq!(result.dataset, data);
    }

    #[test]
    fn test_missing_value_column_returns_copy() {
        let (_dir, anonymizer) = uninstalled();
        let data = Dataset::new(vec!["text".to_string()])
            .with_rows(vec![vec![Cell::from("Herr Müller")]]);
        let result = anonymizer
            .anonymize(&data, &terms(&["Müller"]), &AnonymizeOptions::default(), None)
            .unwrap();
        assert_eq!(result.dataset, data);
    }

    #[test]
    fn test_nothing_to_do_reports_completion() {
        let (_dir, anonymizer) = uninstalled();
        let data = Dataset::new(vec!["value".to_string()])
            .with_rows(vec![vec![Cell::from("Herr Müller kam.")]]);
        let calls = std::sync::Mutex::new(Vec::new());
        let progress = |fraction: f64, _: &str| calls.lock().unwrap().push(fraction);

        let result = anonymizer
            .anonymize(&data, &[], &AnonymizeOptions::default(), Some(&progress))
            .unwrap();
        assert_eq!(result.dataset, data);
        assert_eq!(*calls.lock().unwrap(), vec![1.0]);
    }

    #[test]
    fn test_exact_mode() {
        let (_dir, anonymizer) = uninstalled();
        let data = Dataset::new(vec!["value".to_string()])
            .with_rows(vec![vec![Cell::from("Herr Müller kam.")]]);
        let options = AnonymizeOptions {
            fuzzy: false,
            ..Default::default()
        };
        let result = anonymizer
            .anonymize(&data, &terms(&["Müller"]), &options, None)
            .unwrap();
        assert_eq!(result.dataset.cell(0, 0), Some(&Cell::from("Herr <ANONYM> kam.")));
    }

    #[test]
    fn test_custom_columns() {
        let (_dir, anonymizer) = uninstalled();
        let data = Dataset::new(vec!["source_type".to_string(), "text".to_string()])
            .with_rows(vec![vec![Cell::from("Labor"), Cell::from("Probe von Meier")]]);
        let options = AnonymizeOptions {
            value_column: "text".to_string(),
            category_column: "source_type".to_string(),
            ..Default::default()
        };
        let result = anonymizer
            .anonymize(&data, &terms(&["Meier"]), &options, None)
            .unwrap();
        assert_eq!(result.dataset.cell(0, 1), Some(&Cell::from("Probe von <ANONYM>")));
    }
}

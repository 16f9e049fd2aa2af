use deid_core::{Cell, Dataset, EntityKind, EntitySpan, Error, Result};
use deid_engine::{AnonymizeOptions, Anonymizer, RowOutcome, SkipReason};
use deid_model::ModelSpec;
use deid_recognizer::{EntityRecognizer, RecognitionService, RecognizerFactory};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Tags every "Müller" as a person and fails on any text containing "KAPUTT".
struct ScriptedRecognizer;

impl EntityRecognizer for ScriptedRecognizer {
    fn detect(&self, text: &str, _kinds: &[EntityKind]) -> Result<Vec<EntitySpan>> {
        if text.contains("KAPUTT") {
            return Err(Error::Recognition("tokenizer crashed".to_string()));
        }
        Ok(text
            .match_indices("Müller")
            .map(|(start, m)| EntitySpan::new(start, start + m.len(), EntityKind::Person))
            .collect())
    }
}

struct ScriptedFactory;

impl RecognizerFactory for ScriptedFactory {
    fn load(&self, _model_path: &Path) -> Result<Arc<dyn EntityRecognizer>> {
        Ok(Arc::new(ScriptedRecognizer))
    }
}

fn anonymizer(root: &Path) -> Anonymizer {
    let spec = ModelSpec::new(root).with_model("tiny", "1.0");
    std::fs::create_dir_all(spec.model_path()).unwrap();
    std::fs::write(spec.marker_path(), r#"{"name":"tiny"}"#).unwrap();
    Anonymizer::new(Arc::new(RecognitionService::new(spec, ScriptedFactory)))
}

fn dataset(rows: Vec<(&str, Cell)>) -> Dataset {
    Dataset::new(vec!["category".to_string(), "value".to_string()]).with_rows(
        rows.into_iter()
            .map(|(category, value)| vec![Cell::from(category), value])
            .collect(),
    )
}

fn terms(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_failing_row_falls_back_to_blacklist() {
    let dir = tempfile::tempdir().unwrap();
    let anonymizer = anonymizer(dir.path());
    let data = dataset(vec![
        ("Visite", Cell::from("Herr Müller wach, Schmidt informiert")),
        ("Arztnotizen", Cell::from("KAPUTT: Schmidt und Müller")),
        ("Anamnese", Cell::from("Müller berichtet Schmerzen")),
    ]);

    let report = anonymizer
        .anonymize(&data, &terms(&["Schmidt"]), &AnonymizeOptions::default(), None)
        .unwrap();

    assert_eq!(
        report.dataset.cell(0, 1),
        Some(&Cell::from("Herr <ANONYM> wach, <ANONYM> informiert"))
    );
    // Blacklist only: the recognizer never ran on this row.
    assert_eq!(
        report.dataset.cell(1, 1),
        Some(&Cell::from("KAPUTT: <ANONYM> und Müller"))
    );
    assert_eq!(
        report.dataset.cell(2, 1),
        Some(&Cell::from("<ANONYM> berichtet Schmerzen"))
    );

    assert_eq!(report.fallback_rows(), vec![1]);
    assert_eq!(report.rows[0], RowOutcome::Redacted);
    assert_eq!(report.rows[2], RowOutcome::Redacted);
    assert_eq!(report.stats.fallbacks, 1);
    assert_eq!(report.stats.redacted, 3);
}

#[test]
fn test_structured_rows_skip_recognizer() {
    let dir = tempfile::tempdir().unwrap();
    let anonymizer = anonymizer(dir.path());
    let data = dataset(vec![("Diagnose", Cell::from("Befund Müller"))]);

    let report = anonymizer
        .anonymize(&data, &[], &AnonymizeOptions::default(), None)
        .unwrap();
    assert_eq!(report.dataset, data);
    assert_eq!(report.rows[0], RowOutcome::Unchanged(SkipReason::NoMatch));
}

#[test]
fn test_values_never_rewritten() {
    let dir = tempfile::tempdir().unwrap();
    let anonymizer = anonymizer(dir.path());
    let data = dataset(vec![
        ("Visite", Cell::Integer(42)),
        ("Visite", Cell::Float(36.5)),
        ("Visite", Cell::from("ja")),
        ("Visite", Cell::from("Müll")),
        ("Visite", Cell::Float(f64::NAN)),
        ("Visite", Cell::from("   ")),
    ]);

    let report = anonymizer
        .anonymize(&data, &terms(&["ja", "Müll", "42"]), &AnonymizeOptions::default(), None)
        .unwrap();

    assert_eq!(report.dataset.cell(0, 1), Some(&Cell::Integer(42)));
    assert_eq!(report.dataset.cell(1, 1), Some(&Cell::Float(36.5)));
    assert_eq!(report.dataset.cell(2, 1), Some(&Cell::from("ja")));
    assert_eq!(report.dataset.cell(3, 1), Some(&Cell::from("Müll")));
    assert_eq!(report.dataset.cell(5, 1), Some(&Cell::from("   ")));
    assert_eq!(report.stats.skipped_numeric, 2);
    assert_eq!(report.stats.skipped_short, 2);
    assert_eq!(report.rows[4], RowOutcome::Unchanged(SkipReason::Blank));
}

#[test]
fn test_input_is_not_mutated() {
    let dir = tempfile::tempdir().unwrap();
    let anonymizer = anonymizer(dir.path());
    let data = dataset(vec![
        ("Visite", Cell::from("Herr Müller kam.")),
        ("Labor", Cell::from("Probe Schmidt")),
    ]);
    let before = data.clone();

    let report = anonymizer
        .anonymize(&data, &terms(&["Schmidt"]), &AnonymizeOptions::default(), None)
        .unwrap();

    assert_eq!(data, before);
    assert_ne!(report.dataset, data);
}

#[test]
fn test_progress_is_monotone_and_completes() {
    let dir = tempfile::tempdir().unwrap();
    let anonymizer = anonymizer(dir.path());
    let rows = (0..250)
        .map(|i| {
            let category = if i % 2 == 0 { "Visite" } else { "Labor" };
            (category, Cell::from(format!("Eintrag {} von Müller", i)))
        })
        .collect();
    let data = dataset(rows);

    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = calls.clone();
    let progress = move |fraction: f64, message: &str| {
        sink.lock().unwrap().push((fraction, message.to_string()));
    };

    anonymizer
        .anonymize(&data, &terms(&["Müller"]), &AnonymizeOptions::default(), Some(&progress))
        .unwrap();

    let calls = calls.lock().unwrap();
    let fractions: Vec<f64> = calls.iter().map(|(f, _)| *f).collect();
    assert_eq!(fractions, vec![0.0, 0.4, 0.8, 1.0]);
    assert!(calls[1].1.contains("100 / 250"));
}

#[test]
fn test_anonymize_text() {
    let dir = tempfile::tempdir().unwrap();
    let anonymizer = anonymizer(dir.path());
    let options = AnonymizeOptions::default();

    assert_eq!(
        anonymizer
            .anonymize_text("Müller und Schmitt", &terms(&["Schmidt"]), &options)
            .unwrap(),
        "<ANONYM> und <ANONYM>"
    );
    assert_eq!(anonymizer.anonymize_text("", &[], &options).unwrap(), "");
    assert!(anonymizer.anonymize_text("KAPUTT", &[], &options).is_err());
}

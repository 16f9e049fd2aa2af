use deid_engine::{AnonymizeOptions, Anonymizer};
use deid_model::ModelSpec;
use deid_recognizer::RecognitionService;
use deid_storage::{TermStore, combine, read_dataset, write_dataset};
use std::sync::Arc;

#[test]
fn test_csv_round_trip_with_rule_recognizer() {
    let dir = tempfile::tempdir().unwrap();

    let spec = ModelSpec::new(dir.path().join("models"));
    std::fs::create_dir_all(spec.model_path()).unwrap();
    std::fs::write(
        spec.marker_path(),
        r#"{"name":"core_news_lg","version":"3.7.0","lang":"de"}"#,
    )
    .unwrap();

    let input = dir.path().join("export.csv");
    std::fs::write(
        &input,
        "category,value\n\
         Visite,\"Frau Schneider wach, Rückruf unter 0171 1234567\"\n\
         Arztnotizen,Befund an s.k@klinik.de geschickt\n\
         Diagnose,Zustand nach Sturz bei Familie Brandt\n\
         Alter,81\n\
         Allergie,nein\n",
    )
    .unwrap();

    let store = TermStore::new(dir.path().join("blacklist.txt"));
    store.add("Brandt").unwrap();
    let blacklist = combine(&[], &store.load().unwrap());

    let anonymizer = Anonymizer::new(Arc::new(RecognitionService::with_rules(spec)));
    let dataset = read_dataset(&input).unwrap();
    let report = anonymizer
        .anonymize(&dataset, &blacklist, &AnonymizeOptions::default(), None)
        .unwrap();

    let output = dir.path().join("anonymized.csv");
    write_dataset(&output, &report.dataset).unwrap();
    let written = std::fs::read_to_string(&output).unwrap();

    assert_eq!(
        written,
        "category,value\n\
         Visite,\"Frau <ANONYM> wach, Rückruf unter <KONTAKT>\"\n\
         Arztnotizen,Befund an <KONTAKT> geschickt\n\
         Diagnose,Zustand nach Sturz bei Familie <ANONYM>\n\
         Alter,81\n\
         Allergie,nein\n"
    );
    assert_eq!(report.stats.redacted, 3);
    assert!(report.fallback_rows().is_empty());
}

use deid_core::{EntityKind, EntitySpan, Error, Result};
use deid_model::ModelSpec;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use tracing::{info, warn};

use crate::recognizer::{EntityRecognizer, RecognizerFactory, apply_spans};
use crate::rules::RuleRecognizerFactory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

enum Slot {
    Uninitialized,
    Initializing,
    Ready(Arc<dyn EntityRecognizer>),
    Failed(String),
}

/// Lazily built, shared recognition engine.
///
/// The first caller builds the engine from the installed model; concurrent
/// callers wait for that one build instead of starting their own. A failed
/// build is retried on the next call, a successful one is kept for the life
/// of the service.
pub struct RecognitionService {
    spec: ModelSpec,
    factory: Box<dyn RecognizerFactory>,
    slot: Mutex<Slot>,
    settled: Condvar,
}

impl RecognitionService {
    pub fn new(spec: ModelSpec, factory: impl RecognizerFactory + 'static) -> Self {
        Self {
            spec,
            factory: Box::new(factory),
            slot: Mutex::new(Slot::Uninitialized),
            settled: Condvar::new(),
        }
    }

    /// Service backed by the built-in pattern recognizer.
    pub fn with_rules(spec: ModelSpec) -> Self {
        Self::new(spec, RuleRecognizerFactory)
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    pub fn state(&self) -> ServiceState {
        match &*self.lock() {
            Slot::Uninitialized => ServiceState::Uninitialized,
            Slot::Initializing => ServiceState::Initializing,
            Slot::Ready(_) => ServiceState::Ready,
            Slot::Failed(_) => ServiceState::Failed,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.state() == ServiceState::Ready
    }

    /// Reason of the last failed build, if the service is in `Failed`.
    pub fn last_error(&self) -> Option<String> {
        match &*self.lock() {
            Slot::Failed(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The engine, building it on first use.
    pub fn engine(&self) -> Result<Arc<dyn EntityRecognizer>> {
        let mut slot = self.lock();
        loop {
            match &*slot {
                Slot::Ready(engine) => return Ok(engine.clone()),
                Slot::Initializing => {
                    slot = self
                        .settled
                        .wait(slot)
                        .unwrap_or_else(|e| e.into_inner());
                }
                Slot::Uninitialized | Slot::Failed(_) => break,
            }
        }
        *slot = Slot::Initializing;
        drop(slot);

        let built = catch_unwind(AssertUnwindSafe(|| self.build())).unwrap_or_else(|_| {
            Err(Error::EngineNotInitialized(
                "recognizer panicked while loading".to_string(),
            ))
        });

        let mut slot = self.lock();
        let result = match built {
            Ok(engine) => {
                *slot = Slot::Ready(engine.clone());
                Ok(engine)
            }
            Err(e) => {
                warn!("Recognizer initialization failed: {}", e);
                *slot = Slot::Failed(e.to_string());
                Err(e)
            }
        };
        self.settled.notify_all();
        result
    }

    fn build(&self) -> Result<Arc<dyn EntityRecognizer>> {
        if !self.spec.is_available() {
            return Err(Error::EngineNotInitialized(format!(
                "model '{}' not found at {}; download it first",
                self.spec.name,
                self.spec.model_path().display()
            )));
        }
        let model_path = self.spec.model_path();
        info!("Loading recognizer from {}", model_path.display());
        let engine = self.factory.load(&model_path).map_err(|e| match e {
            Error::EngineNotInitialized(_) => e,
            other => Error::EngineNotInitialized(other.to_string()),
        })?;
        Ok(engine)
    }

    /// Person, phone and email spans in `text`.
    pub fn detect(&self, text: &str) -> Result<Vec<EntitySpan>> {
        let engine = self.engine()?;
        let spans = engine.detect(text, &EntityKind::ALL)?;
        Ok(spans
            .into_iter()
            .filter(|s| EntityKind::ALL.contains(&s.kind))
            .collect())
    }

    /// `text` with detected entities replaced by their placeholders.
    pub fn anonymize(&self, text: &str) -> Result<String> {
        if text.is_empty() {
            return Ok(String::new());
        }
        let spans = self.detect(text)?;
        Ok(apply_spans(text, &spans))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct SlowFactory {
        loads: Arc<AtomicUsize>,
    }

    struct Nothing;

    impl EntityRecognizer for Nothing {
        fn detect(&self, _text: &str, _kinds: &[EntityKind]) -> Result<Vec<EntitySpan>> {
            Ok(Vec::new())
        }
    }

    impl RecognizerFactory for SlowFactory {
        fn load(&self, _model_path: &Path) -> Result<Arc<dyn EntityRecognizer>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(50));
            Ok(Arc::new(Nothing))
        }
    }

    fn installed_spec(root: &Path) -> ModelSpec {
        let spec = ModelSpec::new(root).with_model("tiny", "1.0");
        std::fs::create_dir_all(spec.model_path()).unwrap();
        std::fs::write(spec.marker_path(), r#"{"name":"tiny"}"#).unwrap();
        spec
    }

    #[test]
    fn test_missing_model_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let service = RecognitionService::with_rules(ModelSpec::new(dir.path()));

        let err = service.detect("Herr Müller").unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(service.state(), ServiceState::Failed);
        assert!(service.last_error().is_some());
    }

    #[test]
    fn test_retries_after_model_appears() {
        let dir = tempfile::tempdir().unwrap();
        let spec = ModelSpec::new(dir.path()).with_model("tiny", "1.0");
        let service = RecognitionService::with_rules(spec);
        assert!(service.engine().is_err());

        installed_spec(dir.path());
        assert_eq!(
            service.anonymize("Herr Müller kam.").unwrap(),
            "Herr <ANONYM> kam."
        );
        assert!(service.is_initialized());
    }

    #[test]
    fn test_concurrent_first_use_builds_once() {
        let dir = tempfile::tempdir().unwrap();
        let loads = Arc::new(AtomicUsize::new(0));
        let service = Arc::new(RecognitionService::new(
            installed_spec(dir.path()),
            SlowFactory {
                loads: loads.clone(),
            },
        ));
        assert_eq!(service.state(), ServiceState::Uninitialized);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                std::thread::spawn(move || service.engine().is_ok())
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(service.state(), ServiceState::Ready);
    }

    #[test]
    fn test_empty_text() {
        let dir = tempfile::tempdir().unwrap();
        let service = RecognitionService::with_rules(ModelSpec::new(dir.path()));
        assert_eq!(service.anonymize("").unwrap(), "");
    }
}

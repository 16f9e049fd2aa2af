//! Built-in pattern recognizer.
//!
//! Loaded from the installed model directory: the model metadata is read and
//! validated, then names, phone numbers and email addresses are found with
//! static patterns tuned for German clinical notes.

use deid_core::{EntityKind, EntitySpan, Error, Result};
use deid_model::MARKER_FILE;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::recognizer::{EntityRecognizer, RecognizerFactory};

/// Longest text accepted in one call, in characters.
pub const MAX_TEXT_CHARS: usize = 10_000_000;

lazy_static! {
    static ref EMAIL: Regex =
        Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap();

    // International prefix or a leading zero, then digits with the usual
    // separators. Candidates are filtered by digit count afterwards.
    static ref PHONE: Regex =
        Regex::new(r"(?:\+\d{1,3}[ /-]?|\b0)\d[\d /()-]{4,}\d").unwrap();

    // The honorific stays, the name after it is the entity.
    static ref PERSON: Regex = Regex::new(
        r"\b(?:Herrn?|Frau|Hr\.|Fr\.|Dr\.|Prof\.|)\s+(?:(?:Dr|Prof|med)\.\s+)*(?P<name>[A-ZÄÖÜ][a-zäöüß]+(?:-[A-ZÄÖÜ][a-zäöüß]+)?)"
    )
    .unwrap();
}

const PHONE_DIGITS: std::ops::RangeInclusive<usize> = 6..=15;

/// Fields read from the model's metadata file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelMeta {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
}

impl ModelMeta {
    pub fn read(model_path: &Path) -> Result<Self> {
        let path = model_path.join(MARKER_FILE);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::EngineNotInitialized(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            Error::EngineNotInitialized(format!("invalid model metadata {}: {}", path.display(), e))
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RuleRecognizer;

impl RuleRecognizer {
    fn detect_kind(text: &str, kind: EntityKind, spans: &mut Vec<EntitySpan>) {
        match kind {
            EntityKind::EmailAddress => spans.extend(
                EMAIL
                    .find_iter(text)
                    .map(|m| EntitySpan::new(m.start(), m.end(), kind)),
            ),
            EntityKind::PhoneNumber => spans.extend(
                PHONE
                    .find_iter(text)
                    .filter(|m| {
                        let digits = m.as_str().chars().filter(char::is_ascii_digit).count();
                        PHONE_DIGITS.contains(&digits)
                    })
                    .map(|m| EntitySpan::new(m.start(), m.end(), kind)),
            ),
            EntityKind::Person => spans.extend(
                PERSON
                    .captures_iter(text)
                    .filter_map(|c| c.name("name"))
                    .map(|m| EntitySpan::new(m.start(), m.end(), kind)),
            ),
        }
    }
}

impl EntityRecognizer for RuleRecognizer {
    fn detect(&self, text: &str, kinds: &[EntityKind]) -> Result<Vec<EntitySpan>> {
        if text.chars().count() > MAX_TEXT_CHARS {
            return Err(Error::Recognition(format!(
                "text exceeds {} characters",
                MAX_TEXT_CHARS
            )));
        }
        let mut spans = Vec::new();
        for &kind in kinds {
            Self::detect_kind(text, kind, &mut spans);
        }
        Ok(spans)
    }
}

/// Loads a [`RuleRecognizer`] after checking the model metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleRecognizerFactory;

impl RecognizerFactory for RuleRecognizerFactory {
    fn load(&self, model_path: &Path) -> Result<Arc<dyn EntityRecognizer>> {
        let meta = ModelMeta::read(model_path)?;
        info!(
            "Loaded recognizer model {} {}",
            meta.name,
            meta.version.as_deref().unwrap_or("?")
        );
        if meta.lang.as_deref().is_some_and(|lang| lang != "de") {
            warn!(
                "Model {} declares language {:?}, patterns are tuned for German",
                meta.name, meta.lang
            );
        }
        Ok(Arc::new(RuleRecognizer))
    }
}

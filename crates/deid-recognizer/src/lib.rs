//! Entity recognition adapter
//!
//! The recognizer itself sits behind [`EntityRecognizer`]; this crate only
//! asks it for person names, phone numbers and email addresses, replaces
//! what it finds with placeholders, and makes sure the engine is built
//! exactly once from the installed model.

pub mod recognizer;
pub mod rules;
pub mod service;

pub use recognizer::{EntityRecognizer, RecognizerFactory, apply_spans, resolve_overlaps};
pub use rules::{ModelMeta, RuleRecognizer, RuleRecognizerFactory};
pub use service::{RecognitionService, ServiceState};

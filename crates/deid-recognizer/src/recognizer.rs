use deid_core::{EntityKind, EntitySpan, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Detects entities in text. Implementations must tolerate being shared
/// across threads, but callers invoke them one text at a time.
pub trait EntityRecognizer: Send + Sync {
    /// Byte spans of entities of the requested `kinds`. Anything else the
    /// engine finds is dropped by the caller.
    fn detect(&self, text: &str, kinds: &[EntityKind]) -> Result<Vec<EntitySpan>>;
}

/// Builds a recognizer from an installed model directory.
pub trait RecognizerFactory: Send + Sync {
    fn load(&self, model_path: &Path) -> Result<Arc<dyn EntityRecognizer>>;
}

/// Sort spans and drop overlaps, keeping the earliest and then the longest.
pub fn resolve_overlaps(mut spans: Vec<EntitySpan>) -> Vec<EntitySpan> {
    spans.retain(|s| !s.is_empty());
    spans.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| b.end.cmp(&a.end)));

    let mut kept: Vec<EntitySpan> = Vec::with_capacity(spans.len());
    for span in spans {
        if kept.last().is_some_and(|last| last.overlaps(&span)) {
            continue;
        }
        kept.push(span);
    }
    kept
}

/// Replace every span with its kind's placeholder; the rest of the text is
/// copied verbatim. Spans not on character boundaries are ignored.
pub fn apply_spans(text: &str, spans: &[EntitySpan]) -> String {
    let spans = resolve_overlaps(spans.to_vec());
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;

    for span in spans {
        if span.end > text.len()
            || !text.is_char_boundary(span.start)
            || !text.is_char_boundary(span.end)
        {
            debug!("Skipping invalid span {:?}", span);
            continue;
        }
        out.push_str(&text[cursor..span.start]);
        out.push_str(span.kind.placeholder());
        cursor = span.end;
    }
    out.push_str(&text[cursor..]);
    out
}

use serde::{Deserialize, Serialize};

/// Substituted for person names and for blacklist hits.
pub const ANONYM_PLACEHOLDER: &str = "<ANONYM>";

/// Substituted for phone numbers and email addresses.
pub const CONTACT_PLACEHOLDER: &str = "<KONTAKT>";

/// The only entity categories the recognizer is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Person,
    PhoneNumber,
    EmailAddress,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [
        EntityKind::Person,
        EntityKind::PhoneNumber,
        EntityKind::EmailAddress,
    ];

    pub fn placeholder(self) -> &'static str {
        match self {
            EntityKind::Person => ANONYM_PLACEHOLDER,
            EntityKind::PhoneNumber | EntityKind::EmailAddress => CONTACT_PLACEHOLDER,
        }
    }
}

/// A detected entity as a byte range into the analyzed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpan {
    pub start: usize,
    pub end: usize,
    pub kind: EntityKind,
}

impl EntitySpan {
    pub fn new(start: usize, end: usize, kind: EntityKind) -> Self {
        Self { start, end, kind }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn overlaps(&self, other: &EntitySpan) -> bool {
        self.start < other.end && other.start < self.end
    }
}

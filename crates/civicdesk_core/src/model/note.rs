//! Access-controlled note model.
//!
//! # Responsibility
//! - Define the note record and its visibility predicate.
//! - Normalize share lists into sets before persistence.
//!
//! # Invariants
//! - A note is readable iff it is public, the caller owns it, or the caller
//!   is in `shared_with`.
//! - `shared_with` never contains duplicates.

use crate::model::identity::{Identity, Timestamp};
use crate::model::validation::{require_max_chars, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub type NoteId = u64;

pub const MAX_NOTE_TITLE_CHARS: usize = 200;
pub const MAX_NOTE_CONTENT_CHARS: usize = 64 * 1024;
pub const MAX_SHARED_WITH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub owner: Identity,
    pub title: String,
    pub content: String,
    pub created_at: Timestamp,
    pub is_public: bool,
    pub shared_with: BTreeSet<Identity>,
}

impl Note {
    /// Visibility predicate.
    pub fn is_readable_by(&self, caller: &Identity) -> bool {
        self.is_public || &self.owner == caller || self.shared_with.contains(caller)
    }

    pub fn view(&self) -> NoteView {
        NoteView {
            title: self.title.clone(),
            content: self.content.clone(),
            created_at: self.created_at,
        }
    }
}

/// Read projection returned by `read_note`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteView {
    pub title: String,
    pub content: String,
    pub created_at: Timestamp,
}

/// Visibility settings replaced as one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharingSettings {
    pub is_public: bool,
    pub shared_with: BTreeSet<Identity>,
}

impl SharingSettings {
    pub fn new(
        is_public: bool,
        shared_with: impl IntoIterator<Item = Identity>,
    ) -> Result<Self, ValidationError> {
        let shared_with: BTreeSet<Identity> = shared_with.into_iter().collect();
        if shared_with.len() > MAX_SHARED_WITH {
            return Err(ValidationError::TooLong {
                field: "shared_with",
                max: MAX_SHARED_WITH,
            });
        }
        Ok(Self {
            is_public,
            shared_with,
        })
    }
}

pub(crate) fn validate_note_text(title: &str, content: &str) -> Result<(), ValidationError> {
    require_max_chars("title", title, MAX_NOTE_TITLE_CHARS)?;
    require_max_chars("content", content, MAX_NOTE_CONTENT_CHARS)
}

#[cfg(test)]
mod tests {
    use super::{Note, SharingSettings, MAX_SHARED_WITH};
    use crate::model::identity::Identity;
    use std::collections::BTreeSet;

    fn id(value: &str) -> Identity {
        Identity::parse(value).unwrap()
    }

    fn private_note(shared: &[&str]) -> Note {
        Note {
            id: 1,
            owner: id("owner"),
            title: "t".to_string(),
            content: "c".to_string(),
            created_at: 5,
            is_public: false,
            shared_with: shared.iter().map(|value| id(value)).collect(),
        }
    }

    #[test]
    fn visibility_covers_owner_shared_and_public() {
        let note = private_note(&["friend"]);
        assert!(note.is_readable_by(&id("owner")));
        assert!(note.is_readable_by(&id("friend")));
        assert!(!note.is_readable_by(&id("stranger")));

        let mut public = private_note(&[]);
        public.is_public = true;
        assert!(public.is_readable_by(&id("stranger")));
    }

    #[test]
    fn sharing_settings_deduplicate_addresses() {
        let settings = SharingSettings::new(false, vec![id("a"), id("b"), id("a")]).unwrap();
        assert_eq!(settings.shared_with, BTreeSet::from([id("a"), id("b")]));
    }

    #[test]
    fn sharing_settings_cap_list_size() {
        let many = (0..=MAX_SHARED_WITH).map(|idx| id(&format!("user{idx}")));
        assert!(SharingSettings::new(true, many).is_err());
    }
}

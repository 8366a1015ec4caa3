// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CursorError {
    #[error("invalid cursor '{0}'")]
    Invalid(String),

    #[error("unexpected object '{actual}' in identifier (expected '{expected}')")]
    WrongObject { expected: String, actual: String },
}

/// A global identifier: the name of a derived object paired with the row id
/// it is backed by. Doubles as the pagination cursor.
///
/// The canonical form is `name:id`; the opaque form handed to clients is the
/// base-64 encoding of the canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    object: String,
    id: u64,
}

impl Cursor {
    pub fn new(object: impl Into<String>, id: u64) -> Self {
        Self {
            object: object.into(),
            id,
        }
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// The opaque wire form.
    pub fn encode(&self) -> String {
        STANDARD.encode(self.to_string())
    }

    /// Decode an opaque identifier. Fails when the base-64 wrapping, the
    /// `name:id` shape, or the non-negative id suffix is violated.
    pub fn decode(opaque: &str) -> Result<Self, CursorError> {
        let invalid = || CursorError::Invalid(opaque.to_string());

        let bytes = STANDARD.decode(opaque).map_err(|_| invalid())?;
        let canonical = String::from_utf8(bytes).map_err(|_| invalid())?;

        let (object, id) = canonical.split_once(':').ok_or_else(invalid)?;
        let id = id.parse::<u64>().map_err(|_| invalid())?;

        Ok(Self {
            object: object.to_string(),
            id,
        })
    }

    /// Decode and additionally require the embedded object name.
    pub fn decode_expecting(opaque: &str, expected: &str) -> Result<Self, CursorError> {
        let cursor = Self::decode(opaque)?;
        if cursor.object != expected {
            return Err(CursorError::WrongObject {
                expected: expected.to_string(),
                actual: cursor.object,
            });
        }

        Ok(cursor)
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            object: String::new(),
            id: 0,
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.object, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        for (object, id) in [("Concert", 0u64), ("A", 1), ("VenueArtist", 4294967296)] {
            let cursor = Cursor::new(object, id);
            let decoded = Cursor::decode(&cursor.encode()).unwrap();
            assert_eq!(decoded.object(), object);
            assert_eq!(decoded.id(), id);
        }
    }

    #[test]
    fn canonical_form() {
        assert_eq!(Cursor::new("Concert", 7).to_string(), "Concert:7");
        assert_eq!(Cursor::new("Concert", 7).encode(), STANDARD.encode("Concert:7"));
    }

    #[test]
    fn rejects_malformed_input() {
        // not base-64
        assert!(matches!(
            Cursor::decode("!!!"),
            Err(CursorError::Invalid(_))
        ));
        // no separator
        assert!(matches!(
            Cursor::decode(&STANDARD.encode("Concert7")),
            Err(CursorError::Invalid(_))
        ));
        // non-numeric id
        assert!(matches!(
            Cursor::decode(&STANDARD.encode("Concert:seven")),
            Err(CursorError::Invalid(_))
        ));
        // negative id
        assert!(matches!(
            Cursor::decode(&STANDARD.encode("Concert:-1")),
            Err(CursorError::Invalid(_))
        ));
    }

    #[test]
    fn enforces_expected_object() {
        let opaque = Cursor::new("Artist", 3).encode();

        assert!(Cursor::decode_expecting(&opaque, "Artist").is_ok());
        assert_eq!(
            Cursor::decode_expecting(&opaque, "Venue"),
            Err(CursorError::WrongObject {
                expected: "Venue".to_string(),
                actual: "Artist".to_string(),
            })
        );
    }
}

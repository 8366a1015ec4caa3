// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Naming rules for everything derived from table and column names.

use heck::{ToLowerCamelCase, ToUpperCamelCase};

pub fn to_plural(word: &str) -> String {
    let plural = pluralizer::pluralize(word, 2, false);
    if plural == word && !word.ends_with('s') {
        // Force pluralization if the pluralizer returns the same string
        format!("{word}s")
    } else {
        plural
    }
}

pub fn to_singular(word: &str) -> String {
    pluralizer::pluralize(word, 1, false)
}

/// Table name to derived object name: Pascal-cased singular (`concerts` ->
/// `Concert`).
pub fn object_name(table: &str) -> String {
    to_singular(&table.to_upper_camel_case())
}

/// Column name to scalar field name (`venue_id` -> `venueId`).
pub fn scalar_field_name(column: &str) -> String {
    column.to_lower_camel_case()
}

/// Referenced table name to forward field name: camel-cased singular
/// (`venues` -> `venue`).
pub fn forward_field_name(referenced_table: &str) -> String {
    to_singular(&referenced_table.to_lower_camel_case())
}

/// Name of the synthesized inverse of a forward field, derived from the
/// forward field's name and its source table (`venue` on `concerts` ->
/// `venuesConcerts`).
pub fn back_reference_field_name(forward_field: &str, source_table: &str) -> String {
    format!("{}_{}", to_plural(forward_field), source_table).to_lower_camel_case()
}

/// Name of a joined field, derived from the opposite join-table column with
/// its referenced-column suffix stripped (`genre_id` referencing `genres(id)`
/// -> `genres`).
pub fn joined_field_name(other_column: &str, referenced_column: &str) -> String {
    let base = other_column
        .strip_suffix(&format!("_{referenced_column}"))
        .unwrap_or(other_column);

    to_plural(&base.to_lower_camel_case())
}

/// Root collection field for an object (`Concert` -> `concerts`).
pub fn collection_field_name(object: &str) -> String {
    to_plural(&object.to_lower_camel_case())
}

/// Mutation input field carrying a forward reference (`venue` referencing
/// column `id` -> `venueId`).
pub fn reference_input_field_name(field: &str, referenced_column: &str) -> String {
    format!("{field}_{referenced_column}").to_lower_camel_case()
}

/// Payload field exposing the affected object (`Concert` -> `concert`).
pub fn payload_field_name(object: &str) -> String {
    object.to_lower_camel_case()
}

/// Association input field naming an object's identifier (`G` -> `gId`).
pub fn association_input_field_name(object: &str) -> String {
    format!("{object}_id").to_lower_camel_case()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_names() {
        assert_eq!(object_name("concerts"), "Concert");
        assert_eq!(object_name("concert_artists"), "ConcertArtist");
        assert_eq!(object_name("as"), "A");
        assert_eq!(object_name("gs"), "G");
    }

    #[test]
    fn field_names() {
        assert_eq!(scalar_field_name("id"), "id");
        assert_eq!(scalar_field_name("venue_id"), "venueId");
        assert_eq!(forward_field_name("venues"), "venue");
        assert_eq!(forward_field_name("bs"), "b");
    }

    #[test]
    fn back_reference_names() {
        assert_eq!(back_reference_field_name("b", "as"), "bsAs");
        assert_eq!(back_reference_field_name("d", "cs"), "dsCs");
        assert_eq!(back_reference_field_name("venue", "concerts"), "venuesConcerts");
    }

    #[test]
    fn joined_field_names() {
        assert_eq!(joined_field_name("h_id", "id"), "hs");
        assert_eq!(joined_field_name("genre_id", "id"), "genres");
        assert_eq!(joined_field_name("genre", "id"), "genres");
    }

    #[test]
    fn collection_and_input_names() {
        assert_eq!(collection_field_name("A"), "as");
        assert_eq!(collection_field_name("ConcertArtist"), "concertArtists");
        assert_eq!(reference_input_field_name("b", "id"), "bId");
        assert_eq!(payload_field_name("ConcertArtist"), "concertArtist");
        assert_eq!(association_input_field_name("G"), "gId");
    }
}

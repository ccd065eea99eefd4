//! The resolved intermediate model built from a schema file: enums,
//! fields, oneofs, extensions and messages, plus the cross-file dependency
//! table that lets a field report its own encoded size without needing the
//! full model of whatever message or enum it refers to.

pub mod enums;
pub mod extension;
pub mod field;
pub mod file;
pub mod message;
pub mod oneof;

use std::collections::HashMap;

use crate::size::EncodedSize;

/// The facts about a dependency that a field needs to compute its own
/// size or storage feasibility, without owning (or being able to own, in a
/// tree with cross references) the dependency's full model.
#[derive(Clone, Debug)]
pub struct EnumFacts {
    /// Whether any declared value is negative.
    pub has_negative_value: bool,
    /// `max(varint_size(v))` across all declared values.
    pub encoded_size: EncodedSize,
    /// `(short_name, numeric_value)` pairs, used to resolve a default value
    /// that references one of this enum's values by short name.
    pub values: Vec<(String, i64)>,
}

/// The facts about a message dependency.
#[derive(Clone, Debug)]
pub struct MessageFacts {
    /// The message's own worst-case encoded size, or `None` if unbounded.
    pub encoded_size: Option<EncodedSize>,
    /// The message's structural byte-size estimate.
    pub byte_size_estimate: u32,
    /// The proto file this message was declared in. Lets a referencing
    /// field tell an unbounded same-file dependency (genuinely
    /// unresolvable here, must itself stay unbounded) apart from an
    /// unbounded cross-file one (resolvable once that file has been
    /// generated, so a forward symbolic `<Sub>_size` reference suffices).
    pub origin_file: String,
}

/// A fully-qualified-name keyed lookup table of every enum and message
/// known to the current file, including those absorbed from imported
/// files. Built once per file during the stitching pass (`file::stitch`)
/// and then read-only for the rest of the run.
#[derive(Clone, Debug, Default)]
pub struct Dependencies {
    enums: HashMap<String, EnumFacts>,
    messages: HashMap<String, MessageFacts>,
}

impl Dependencies {
    /// An empty dependency table.
    pub fn new() -> Self {
        Dependencies::default()
    }

    /// Registers an enum's facts under its fully qualified name.
    pub fn insert_enum(&mut self, qualified_name: impl Into<String>, facts: EnumFacts) {
        self.enums.insert(qualified_name.into(), facts);
    }

    /// Registers a message's facts under its fully qualified name.
    pub fn insert_message(&mut self, qualified_name: impl Into<String>, facts: MessageFacts) {
        self.messages.insert(qualified_name.into(), facts);
    }

    /// Looks up an enum's facts by fully qualified name.
    pub fn enum_facts(&self, qualified_name: &str) -> Option<&EnumFacts> {
        self.enums.get(qualified_name)
    }

    /// Looks up a message's facts by fully qualified name.
    pub fn message_facts(&self, qualified_name: &str) -> Option<&MessageFacts> {
        self.messages.get(qualified_name)
    }

    /// Merges another dependency table into this one, used when absorbing
    /// an imported file's declarations. Local entries win on conflict.
    pub fn absorb(&mut self, other: &Dependencies) {
        for (name, facts) in &other.enums {
            self.enums.entry(name.clone()).or_insert_with(|| facts.clone());
        }
        for (name, facts) in &other.messages {
            self.messages
                .entry(name.clone())
                .or_insert_with(|| facts.clone());
        }
    }
}

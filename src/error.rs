//! Errors produced across the generator: decoding the input descriptor set,
//! resolving annotations, and checking structural invariants before
//! emission.

use std::path::PathBuf;

use thiserror::Error;

/// The error type returned by every fallible operation in this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// The input could not be decoded as a valid descriptor set or plugin
    /// request.
    #[error("failed to decode descriptor set: {0}")]
    Decode(#[from] prost::DecodeError),

    /// An I/O failure reading an input file, side file, or writing an
    /// output artifact.
    #[error("failed to read or write {path}: {source}")]
    Io {
        /// The path that could not be accessed.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The descriptor set itself is malformed in a way that makes emission
    /// impossible: an unknown schema rule, or a statically allocated field
    /// whose size depends on a message that cannot be resolved.
    #[error("{0}")]
    Input(String),

    /// An annotation combination violates an invariant (e.g. `STATIC`
    /// requested without the required capacity bound).
    #[error("{0}")]
    Annotation(String),

    /// A side-file line could not be parsed.
    #[error("failed to parse options file {path}: {message}")]
    OptionsFile {
        /// The side file in which the malformed line was found.
        path: PathBuf,
        /// A description of what was malformed.
        message: String,
    },

    /// Message declaration order could not be made to satisfy
    /// use-before-definition.
    #[error("cyclic dependency amongst: {0:?}")]
    Cycle(Vec<String>),
}

/// A convenience alias for this crate's fallible operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_error_formats_message_verbatim() {
        let err = Error::Input("unknown field rule".to_string());
        assert_eq!(err.to_string(), "unknown field rule");
    }

    #[test]
    fn cycle_error_includes_all_names() {
        let err = Error::Cycle(vec!["A".to_string(), "B".to_string()]);
        assert!(err.to_string().contains("A"));
        assert!(err.to_string().contains("B"));
    }
}

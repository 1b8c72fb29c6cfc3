//! Typed logical schemas over physical records.
//!
//! # Responsibility
//! - Project strongly-typed record fields onto tag-addressed tree elements.
//! - Report structurally invalid records as `SchemaError::MalformedRecord`.
//!
//! # Invariants
//! - Facades hold no state besides the record they view; two facades over
//!   the same tree project the same values.
//! - Required fields fail on read when absent; optional fields return their
//!   documented sentinel defaults.
//! - Tree boundary errors (type mismatch, bad index) propagate unchanged.

use crate::physical::element::{Tag, TreeError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod channel_definition;
pub mod data_source;

pub type SchemaResult<T> = Result<T, SchemaError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A required field's backing element is absent.
    MalformedRecord { field: &'static str, tag: Tag },
    /// The physical record header names a different record kind.
    WrongRecordKind { expected: Tag, actual: Tag },
    Tree(TreeError),
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedRecord { field, tag } => {
                write!(f, "malformed record: {field} element ({tag}) not found")
            }
            Self::WrongRecordKind { expected, actual } => {
                write!(f, "record kind {actual} does not match expected {expected}")
            }
            Self::Tree(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SchemaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Tree(err) => Some(err),
            Self::MalformedRecord { .. } => None,
            Self::WrongRecordKind { .. } => None,
        }
    }
}

impl From<TreeError> for SchemaError {
    fn from(value: TreeError) -> Self {
        Self::Tree(value)
    }
}

const TEXT_TERMINATOR: u8 = 0;
const NON_ASCII_REPLACEMENT: u8 = b'?';

/// Encodes `value` as single-byte characters with one trailing terminator.
///
/// Characters outside ASCII are replaced with `?`.
pub(crate) fn encode_text(value: &str) -> Vec<u8> {
    let mut bytes: Vec<u8> = value
        .chars()
        .map(|c| {
            if c.is_ascii() {
                c as u8
            } else {
                NON_ASCII_REPLACEMENT
            }
        })
        .collect();
    bytes.push(TEXT_TERMINATOR);
    bytes
}

/// Decodes single-byte characters, stripping terminator padding at both ends.
pub(crate) fn decode_text(bytes: &[u8]) -> String {
    let text: String = bytes
        .iter()
        .map(|byte| {
            if byte.is_ascii() {
                char::from(*byte)
            } else {
                char::from(NON_ASCII_REPLACEMENT)
            }
        })
        .collect();
    text.trim_matches(char::from(TEXT_TERMINATOR)).to_string()
}

#[cfg(test)]
mod tests {
    use super::{decode_text, encode_text, SchemaError};
    use uuid::Uuid;

    #[test]
    fn encode_appends_exactly_one_terminator() {
        assert_eq!(encode_text("abc"), b"abc\0");
        assert_eq!(encode_text(""), b"\0");
    }

    #[test]
    fn decode_strips_terminator_padding() {
        assert_eq!(decode_text(b"abc\0\0\0"), "abc");
        assert_eq!(decode_text(b"\0"), "");
    }

    #[test]
    fn non_ascii_is_replaced() {
        assert_eq!(decode_text(&encode_text("caf\u{e9}")), "caf?");
    }

    #[test]
    fn malformed_record_message_names_field() {
        let err = SchemaError::MalformedRecord {
            field: "DataSourceName",
            tag: Uuid::nil(),
        };
        assert!(err.to_string().contains("DataSourceName"));
    }
}

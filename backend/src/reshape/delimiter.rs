//! Field delimiter selection.
//!
//! A delimiter spec is either the literal token `"tab"` or any other string,
//! of which only the first character is used: `"||"` behaves as `"|"`.

use std::fmt;
use std::str::FromStr;

use crate::error::{ReshapeError, ReshapeResult};

/// Token selecting the horizontal tab.
pub const TAB_TOKEN: &str = "tab";

/// A single-byte field delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Delimiter(u8);

impl Delimiter {
    pub const COMMA: Delimiter = Delimiter(b',');
    pub const TAB: Delimiter = Delimiter(b'\t');

    /// Parse a delimiter spec.
    ///
    /// Multi-character specs are truncated to their first character. The
    /// first character must be ASCII and must not be a quote or a line
    /// break, since the reader could not frame records around it.
    pub fn from_spec(spec: &str) -> ReshapeResult<Self> {
        if spec == TAB_TOKEN {
            return Ok(Self::TAB);
        }
        match spec.chars().next() {
            Some(c) if c.is_ascii() && !matches!(c, '"' | '\n' | '\r') => Ok(Delimiter(c as u8)),
            _ => Err(ReshapeError::InvalidDelimiter(spec.to_string())),
        }
    }

    /// The delimiter byte handed to the CSV reader.
    pub fn as_byte(self) -> u8 {
        self.0
    }

    pub fn as_char(self) -> char {
        char::from(self.0)
    }

    /// Spec string that parses back to this delimiter.
    pub fn to_spec(self) -> String {
        match self.0 {
            b'\t' => TAB_TOKEN.to_string(),
            b => char::from(b).to_string(),
        }
    }
}

impl Default for Delimiter {
    fn default() -> Self {
        Self::COMMA
    }
}

impl FromStr for Delimiter {
    type Err = ReshapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_spec(s)
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            b'\t' => f.write_str("TAB"),
            b => write!(f, "{}", char::from(b)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_token() {
        assert_eq!(Delimiter::from_spec("tab").unwrap(), Delimiter::TAB);
        assert_eq!(Delimiter::from_spec("tab").unwrap().as_byte(), b'\t');
    }

    #[test]
    fn test_first_character_is_used() {
        assert_eq!(Delimiter::from_spec(",").unwrap(), Delimiter::COMMA);
        assert_eq!(Delimiter::from_spec("||").unwrap().as_char(), '|');
        assert_eq!(Delimiter::from_spec(";;;").unwrap().as_char(), ';');
        // Only the exact token means tab.
        assert_eq!(Delimiter::from_spec("tabs").unwrap().as_char(), 't');
        assert_eq!(Delimiter::from_spec("\t").unwrap(), Delimiter::TAB);
    }

    #[test]
    fn test_rejected_specs() {
        for spec in ["", "\"", "\n", "§"] {
            let err = Delimiter::from_spec(spec).unwrap_err();
            assert!(matches!(err, ReshapeError::InvalidDelimiter(_)), "{spec:?}");
        }
    }

    #[test]
    fn test_spec_roundtrip_and_display() {
        assert_eq!(Delimiter::TAB.to_spec(), "tab");
        assert_eq!(Delimiter::TAB.to_string(), "TAB");
        let semi: Delimiter = ";".parse().unwrap();
        assert_eq!(semi.to_spec(), ";");
        assert_eq!(semi.to_string(), ";");
    }
}

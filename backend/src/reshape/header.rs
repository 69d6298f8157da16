//! Header reading and column validation.
//!
//! The header is read once, trimmed, checked for duplicates, and the fixed
//! columns are resolved to header positions. The result is a [`ColumnPlan`]
//! that the streaming pass holds for its whole duration.

use std::io::Read;

use csv::{ByteRecord, Reader, ReaderBuilder};

use super::delimiter::Delimiter;
use super::lookup::{contains, index_of};
use crate::error::{ReshapeError, ReshapeResult};

/// Reader configuration shared by every pass over an input.
///
/// Records may have any number of fields and the first record is not
/// consumed as headers, so the header goes through the same parser as data.
pub(crate) fn reader_builder(delimiter: Delimiter) -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder
        .delimiter(delimiter.as_byte())
        .has_headers(false)
        .flexible(true);
    builder
}

/// Read the first record of `reader` as a trimmed header.
pub(crate) fn read_header<R: Read>(reader: &mut Reader<R>) -> ReshapeResult<Vec<String>> {
    let mut record = ByteRecord::new();
    if !reader
        .read_byte_record(&mut record)
        .map_err(ReshapeError::Read)?
    {
        return Err(ReshapeError::EmptyInput);
    }

    record
        .iter()
        .enumerate()
        .map(|(column, field)| {
            std::str::from_utf8(field)
                .map(|label| label.trim().to_string())
                .map_err(|_| ReshapeError::HeaderEncoding { column })
        })
        .collect()
}

/// Read and trim the header labels of a delimited input.
///
/// Used to offer the column choices before a conversion. Only the first
/// record is consumed.
pub fn read_labels<R: Read>(input: R, delimiter: Delimiter) -> ReshapeResult<Vec<String>> {
    let mut reader = reader_builder(delimiter).from_reader(input);
    read_header(&mut reader)
}

/// Trim leading and trailing whitespace from every entry, in place.
pub fn trim_all(values: &mut [String]) {
    for value in values.iter_mut() {
        let trimmed = value.trim();
        if trimmed.len() != value.len() {
            *value = trimmed.to_string();
        }
    }
}

/// Labels that occur more than once, each listed once in order of first repeat.
pub fn find_duplicates<S: AsRef<str>>(header: &[S]) -> Vec<String> {
    let mut seen: Vec<&str> = Vec::with_capacity(header.len());
    let mut duplicates: Vec<String> = Vec::new();
    for label in header.iter().map(AsRef::as_ref) {
        if contains(label, &seen) {
            if !contains(label, &duplicates) {
                duplicates.push(label.to_string());
            }
        } else {
            seen.push(label);
        }
    }
    duplicates
}

/// Fail with [`ReshapeError::DuplicateColumns`] if the header repeats a label.
pub(crate) fn check_duplicates<S: AsRef<str>>(header: &[S]) -> ReshapeResult<()> {
    let duplicates = find_duplicates(header);
    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(ReshapeError::DuplicateColumns(duplicates))
    }
}

/// Resolve each fixed name to the first header position holding it.
///
/// Positions come back in `fixed_names` order.
pub(crate) fn resolve_fixed<S: AsRef<str>, F: AsRef<str>>(
    header: &[S],
    fixed_names: &[F],
) -> ReshapeResult<Vec<usize>> {
    let mut positions = Vec::with_capacity(fixed_names.len());
    let mut missing = Vec::new();
    for name in fixed_names.iter().map(AsRef::as_ref) {
        match index_of(name, header) {
            Some(position) => positions.push(position),
            None => missing.push(name.to_string()),
        }
    }

    if positions.len() < fixed_names.len() {
        return Err(ReshapeError::FixedColumnNotFound(missing));
    }
    Ok(positions)
}

/// Validate a header against a fixed-column list without touching any stream.
///
/// Both lists are compared after trimming. Returns the fixed positions in
/// `fixed_names` order.
pub fn validate<S: AsRef<str>, F: AsRef<str>>(
    header: &[S],
    fixed_names: &[F],
) -> ReshapeResult<Vec<usize>> {
    let header: Vec<&str> = header.iter().map(|h| h.as_ref().trim()).collect();
    let fixed: Vec<&str> = fixed_names.iter().map(|f| f.as_ref().trim()).collect();
    check_duplicates(&header)?;
    resolve_fixed(&header, &fixed)
}

/// A validated header together with the fixed columns resolved against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPlan {
    header: Vec<String>,
    fixed: Vec<String>,
    positions: Vec<usize>,
}

impl ColumnPlan {
    /// Trim and validate `header` and `fixed`, producing a plan.
    pub fn new(mut header: Vec<String>, mut fixed: Vec<String>) -> ReshapeResult<Self> {
        trim_all(&mut header);
        trim_all(&mut fixed);
        let positions = validate(&header, &fixed)?;
        Ok(Self {
            header,
            fixed,
            positions,
        })
    }

    /// Build a plan from parts that were already trimmed and validated.
    pub(crate) fn from_parts(header: Vec<String>, fixed: Vec<String>, positions: Vec<usize>) -> Self {
        Self {
            header,
            fixed,
            positions,
        }
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn fixed(&self) -> &[String] {
        &self.fixed
    }

    /// Header position of each fixed column, in fixed-name order.
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Whether the header label at `position` is a fixed column.
    pub fn is_fixed_position(&self, position: usize) -> bool {
        self.header
            .get(position)
            .is_some_and(|label| contains(label, &self.fixed))
    }

    /// Number of header columns melted into measurement rows.
    pub fn measurement_count(&self) -> usize {
        (0..self.header.len())
            .filter(|&position| !self.is_fixed_position(position))
            .count()
    }

    /// Labels of the measurement columns, in header order.
    pub fn measurement_labels(&self) -> impl Iterator<Item = &str> {
        self.header
            .iter()
            .enumerate()
            .filter(|(position, _)| !self.is_fixed_position(*position))
            .map(|(_, label)| label.as_str())
    }
}

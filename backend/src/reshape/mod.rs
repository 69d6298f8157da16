//! Wide-to-long ("melt") reshaping of delimited tables.
//!
//! - `delimiter`: delimiter spec parsing (`"tab"` or first character)
//! - `lookup`: membership helpers over small label lists
//! - `header`: header reading, duplicate detection, fixed-column resolution
//! - `melt`: the single-pass streaming rewrite
//!
//! ## Usage Flow
//!
//! ```text
//! read_labels → user picks fixed columns → ColumnPlan::new → melt_with_plan
//! ```
//!
//! or, in one call, [`melt`] with a delimiter spec and fixed names.
//!
//! ## Example
//!
//! ```rust
//! use tableconverter::reshape::melt;
//!
//! let input = "site,t1,t2\nnorth,1,2\n";
//! let mut output = Vec::new();
//! let mut fixed = vec!["site".to_string()];
//! let stats = melt(input.as_bytes(), &mut output, &mut fixed, ",").unwrap();
//!
//! assert_eq!(stats.records, 2);
//! assert_eq!(
//!     String::from_utf8(output).unwrap(),
//!     "eventid,site,measurementType,measurementValue\n1,north,t1,1\n1,north,t2,2\n"
//! );
//! ```

pub mod delimiter;
pub mod header;
pub mod lookup;
pub mod melt;

pub use delimiter::{Delimiter, TAB_TOKEN};
pub use header::{find_duplicates, read_labels, trim_all, validate, ColumnPlan};
pub use lookup::{contains, index_of};
pub use melt::{
    melt, melt_with_plan, output_header, MeltStats, EVENT_ID_COLUMN, MEASUREMENT_TYPE_COLUMN,
    MEASUREMENT_VALUE_COLUMN,
};

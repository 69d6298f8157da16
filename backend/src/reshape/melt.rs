//! Streaming wide-to-long rewrite.
//!
//! Each input data row is rotated into one output record per measurement
//! column and written immediately, so memory holds one row at a time no
//! matter how long the input is.
//!
//! ```text
//! id,site,t1,t2              eventid,id,site,measurementType,measurementValue
//! 7,north,1.5,2.0     →      1,7,north,t1,1.5
//!                            1,7,north,t2,2.0
//! ```
//!
//! Number of output records = rows × (header columns − fixed columns).

use std::io::{Read, Write};

use csv::{ByteRecord, Reader, Writer, WriterBuilder};
use serde::Serialize;

use super::delimiter::Delimiter;
use super::header::{check_duplicates, read_header, reader_builder, resolve_fixed, trim_all, ColumnPlan};
use crate::error::{ReshapeError, ReshapeResult};

pub const EVENT_ID_COLUMN: &str = "eventid";
pub const MEASUREMENT_TYPE_COLUMN: &str = "measurementType";
pub const MEASUREMENT_VALUE_COLUMN: &str = "measurementValue";

/// Counters for a completed melt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeltStats {
    /// Input data rows consumed (the last eventid assigned).
    pub rows: u64,
    /// Output records written, header excluded.
    pub records: u64,
}

/// Melt a delimited table from `input` into long format on `output`.
///
/// `fixed_names` are trimmed in place. `delimiter_spec` is `"tab"` or any
/// string whose first character is the field delimiter. Output is always
/// comma-delimited.
///
/// Duplicate header labels are rejected before anything is written. A fixed
/// name missing from the header is only detected after the output header has
/// been written, so output from a failed call must be discarded. Use
/// [`ColumnPlan::new`] with [`melt_with_plan`] to validate before writing.
pub fn melt<R: Read, W: Write>(
    input: R,
    output: W,
    fixed_names: &mut [String],
    delimiter_spec: &str,
) -> ReshapeResult<MeltStats> {
    let delimiter = Delimiter::from_spec(delimiter_spec)?;
    let mut reader = reader_builder(delimiter).from_reader(input);

    let header = read_header(&mut reader)?;
    trim_all(fixed_names);
    check_duplicates(&header)?;

    let mut writer = writer_builder().from_writer(output);
    write_output_header(&mut writer, fixed_names)?;

    let positions = resolve_fixed(&header, fixed_names)?;
    let plan = ColumnPlan::from_parts(header, fixed_names.to_vec(), positions);

    stream_rows(&mut reader, &mut writer, &plan)
}

/// Melt `input` using a plan validated ahead of time.
///
/// The first record of `input` must be the header the plan was built from;
/// a different header fails with [`ReshapeError::HeaderMismatch`] before any
/// output is written.
pub fn melt_with_plan<R: Read, W: Write>(
    input: R,
    output: W,
    plan: &ColumnPlan,
    delimiter: Delimiter,
) -> ReshapeResult<MeltStats> {
    let mut reader = reader_builder(delimiter).from_reader(input);
    let header = read_header(&mut reader)?;
    if header != plan.header() {
        return Err(ReshapeError::HeaderMismatch);
    }

    let mut writer = writer_builder().from_writer(output);
    write_output_header(&mut writer, plan.fixed())?;
    stream_rows(&mut reader, &mut writer, plan)
}

/// Output column names for a fixed-column list.
pub fn output_header<S: AsRef<str>>(fixed_names: &[S]) -> Vec<&str> {
    let mut labels = Vec::with_capacity(fixed_names.len() + 3);
    labels.push(EVENT_ID_COLUMN);
    labels.extend(fixed_names.iter().map(AsRef::as_ref));
    labels.push(MEASUREMENT_TYPE_COLUMN);
    labels.push(MEASUREMENT_VALUE_COLUMN);
    labels
}

fn writer_builder() -> WriterBuilder {
    let mut builder = WriterBuilder::new();
    builder.delimiter(Delimiter::COMMA.as_byte());
    builder
}

fn write_output_header<W: Write, S: AsRef<str>>(
    writer: &mut Writer<W>,
    fixed_names: &[S],
) -> ReshapeResult<()> {
    writer
        .write_record(output_header(fixed_names))
        .map_err(ReshapeError::Write)
}

fn stream_rows<R: Read, W: Write>(
    reader: &mut Reader<R>,
    writer: &mut Writer<W>,
    plan: &ColumnPlan,
) -> ReshapeResult<MeltStats> {
    let header = plan.header();
    let skip: Vec<bool> = (0..header.len())
        .map(|position| plan.is_fixed_position(position))
        .collect();

    let mut row = ByteRecord::new();
    let mut line = ByteRecord::new();
    let mut stats = MeltStats::default();

    while reader.read_byte_record(&mut row).map_err(ReshapeError::Read)? {
        let eventid = (stats.rows + 1).to_string();

        // Fields past the end of the header have no label to melt under.
        for (position, value) in row.iter().enumerate().take(header.len()) {
            if skip[position] {
                continue;
            }
            line.clear();
            line.push_field(eventid.as_bytes());
            for &fixed in plan.positions() {
                line.push_field(row.get(fixed).unwrap_or_default());
            }
            line.push_field(header[position].as_bytes());
            line.push_field(value);
            writer.write_byte_record(&line).map_err(ReshapeError::Write)?;
            stats.records += 1;
        }
        stats.rows += 1;
    }

    writer
        .flush()
        .map_err(|e| ReshapeError::Write(csv::Error::from(e)))?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor, Seek, SeekFrom};

    fn run(input: &str, fixed: &[&str], sep: &str) -> ReshapeResult<String> {
        let mut fixed: Vec<String> = fixed.iter().map(|f| f.to_string()).collect();
        let mut out = Vec::new();
        melt(input.as_bytes(), &mut out, &mut fixed, sep)?;
        Ok(String::from_utf8(out).unwrap())
    }

    /// Trim, quotes and newlines inside quotes.
    #[test]
    fn test_melt_quoting_and_whitespace() {
        let input = "        label1         ,label2,\"label 3\"\n1,2,\" 3\n\"\n\"f1\",\"f2\",\"f3\"\n";
        let expected = "eventid,label2,measurementType,measurementValue\n\
                        1,2,label1,1\n\
                        1,2,label 3,\" 3\n\"\n\
                        2,f2,label1,f1\n\
                        2,f2,label 3,f3\n";
        assert_eq!(run(input, &["label2"], ",").unwrap(), expected);
    }

    #[test]
    fn test_melt_trims_fixed_names_in_place() {
        let mut fixed = vec!["  b ".to_string()];
        let mut out = Vec::new();
        melt("a,b\n1,2\n".as_bytes(), &mut out, &mut fixed, ",").unwrap();
        assert_eq!(fixed, vec!["b"]);
    }

    #[test]
    fn test_melt_fixed_values_follow_fixed_order() {
        let input = "site,plot,t1,t2\nnorth,7,1.5,2.0\n";
        let expected = "eventid,plot,site,measurementType,measurementValue\n\
                        1,7,north,t1,1.5\n\
                        1,7,north,t2,2.0\n";
        assert_eq!(run(input, &["plot", "site"], ",").unwrap(), expected);
    }

    #[test]
    fn test_melt_without_fixed_columns() {
        let input = "a,b\n1,2\n3,4\n";
        let expected = "eventid,measurementType,measurementValue\n\
                        1,a,1\n1,b,2\n2,a,3\n2,b,4\n";
        assert_eq!(run(input, &[], ",").unwrap(), expected);
    }

    #[test]
    fn test_melt_header_only() {
        assert_eq!(
            run("a,b\n", &["a"], ",").unwrap(),
            "eventid,a,measurementType,measurementValue\n"
        );
    }

    #[test]
    fn test_melt_tab_delimiter() {
        let input = "id\tx\ty\nr1\t1\t2\n";
        let expected = "eventid,id,measurementType,measurementValue\n\
                        1,r1,x,1\n1,r1,y,2\n";
        assert_eq!(run(input, &["id"], "tab").unwrap(), expected);
    }

    #[test]
    fn test_melt_multi_character_spec_uses_first_character() {
        let input = "id|x\nr1|1\n";
        assert_eq!(run(input, &["id"], "||").unwrap(), run(input, &["id"], "|").unwrap());
        assert_eq!(
            run(input, &["id"], "||").unwrap(),
            "eventid,id,measurementType,measurementValue\n1,r1,x,1\n"
        );
    }

    #[test]
    fn test_melt_output_quotes_commas_from_other_delimiters() {
        let input = "id;note\n1;a,b\n";
        assert_eq!(
            run(input, &["id"], ";").unwrap(),
            "eventid,id,measurementType,measurementValue\n1,1,note,\"a,b\"\n"
        );
    }

    #[test]
    fn test_melt_escapes_quotes() {
        let input = "id,q\n1,\"say \"\"hi\"\"\"\n";
        assert_eq!(
            run(input, &["id"], ",").unwrap(),
            "eventid,id,measurementType,measurementValue\n1,1,q,\"say \"\"hi\"\"\"\n"
        );
    }

    #[test]
    fn test_melt_lenient_quotes() {
        let input = "id,x\n1,ab\"c\n";
        let out = run(input, &["id"], ",").unwrap();
        assert!(out.contains("1,1,x,"));
    }

    #[test]
    fn test_melt_ragged_rows() {
        // Short row: missing fixed value becomes empty; long row: extra field ignored.
        let input = "x,y,id\n1\n2,3,r2,extra\n";
        let expected = "eventid,id,measurementType,measurementValue\n\
                        1,,x,1\n\
                        2,r2,x,2\n\
                        2,r2,y,3\n";
        assert_eq!(run(input, &["id"], ",").unwrap(), expected);
    }

    #[test]
    fn test_melt_duplicate_columns_writes_nothing() {
        let mut fixed = vec!["b".to_string()];
        let mut out = Vec::new();
        let err = melt("a,a,b\n1,2,3\n".as_bytes(), &mut out, &mut fixed, ",").unwrap_err();
        match err {
            ReshapeError::DuplicateColumns(labels) => assert_eq!(labels, vec!["a"]),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(out.is_empty());
    }

    #[test]
    fn test_melt_fixed_column_not_found() {
        let err = run("a,b\n1,2\n", &["c"], ",").unwrap_err();
        assert!(matches!(err, ReshapeError::FixedColumnNotFound(ref m) if m == &["c"]));
    }

    #[test]
    fn test_melt_empty_input() {
        let mut out = Vec::new();
        let err = melt("".as_bytes(), &mut out, &mut [], ",").unwrap_err();
        assert!(matches!(err, ReshapeError::EmptyInput));
        assert!(out.is_empty());
    }

    #[test]
    fn test_melt_invalid_delimiter() {
        let err = run("a,b\n", &[], "").unwrap_err();
        assert!(matches!(err, ReshapeError::InvalidDelimiter(_)));
    }

    #[test]
    fn test_melt_stats() {
        let mut out = Vec::new();
        let stats = melt(
            "id,a,b,c\n1,2,3,4\n5,6,7,8\n".as_bytes(),
            &mut out,
            &mut ["id".to_string()],
            ",",
        )
        .unwrap();
        assert_eq!(stats, MeltStats { rows: 2, records: 6 });
    }

    #[test]
    fn test_melt_twice_on_rewound_input_is_identical() {
        let mut input = Cursor::new(b"id,x,y\n1,2,3\n4,\"5\n6\",7\n".to_vec());
        let mut first = Vec::new();
        melt(&mut input, &mut first, &mut ["id".to_string()], ",").unwrap();
        input.seek(SeekFrom::Start(0)).unwrap();
        let mut second = Vec::new();
        melt(&mut input, &mut second, &mut ["id".to_string()], ",").unwrap();
        assert_eq!(first, second);
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn test_melt_write_error() {
        let err = melt("a,b\n1,2\n".as_bytes(), FailingWriter, &mut [], ",").unwrap_err();
        assert!(matches!(err, ReshapeError::Write(_)));
    }

    struct FailingReader {
        served: bool,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.served {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
            }
            self.served = true;
            let chunk = b"a,b\n1,2\n";
            buf[..chunk.len()].copy_from_slice(chunk);
            Ok(chunk.len())
        }
    }

    #[test]
    fn test_melt_read_error_mid_stream() {
        let mut out = Vec::new();
        let err = melt(FailingReader { served: false }, &mut out, &mut [], ",").unwrap_err();
        assert!(err.is_read_error());
        assert!(matches!(err, ReshapeError::Read(_)));
    }

    #[test]
    fn test_melt_with_plan_matches_melt() {
        let input = "id, x ,y\n1,2,3\n4,5,6\n";
        let plan = ColumnPlan::new(
            vec!["id".into(), "x".into(), "y".into()],
            vec![" id".into()],
        )
        .unwrap();
        let mut planned = Vec::new();
        let stats = melt_with_plan(input.as_bytes(), &mut planned, &plan, Delimiter::COMMA).unwrap();
        assert_eq!(stats.records, 4);
        assert_eq!(String::from_utf8(planned).unwrap(), run(input, &["id"], ",").unwrap());
    }

    #[test]
    fn test_melt_with_plan_rejects_other_header() {
        let plan = ColumnPlan::new(vec!["a".into(), "b".into()], vec![]).unwrap();
        let mut out = Vec::new();
        let err = melt_with_plan("a,c\n1,2\n".as_bytes(), &mut out, &plan, Delimiter::COMMA)
            .unwrap_err();
        assert!(matches!(err, ReshapeError::HeaderMismatch));
        assert!(out.is_empty());
    }

    #[test]
    fn test_output_header() {
        assert_eq!(
            output_header(&["site", "plot"]),
            vec!["eventid", "site", "plot", "measurementType", "measurementValue"]
        );
    }
}

//! CSV helpers

use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use crate::Result;

/// Write a header row followed by one row per comma-joined line
///
/// Each entry of `lines` is split on `,` as-is; rows may have a different
/// width than the header.
pub fn write_csv<P, H, L>(path: P, headers: &[H], lines: &[L]) -> Result<()>
where
    P: AsRef<Path>,
    H: AsRef<str>,
    L: AsRef<str>,
{
    let mut writer = WriterBuilder::new().flexible(true).from_path(path)?;

    writer.write_record(headers.iter().map(|h| h.as_ref()))?;
    for line in lines {
        writer.write_record(line.as_ref().split(','))?;
    }

    writer.flush()?;
    Ok(())
}

/// Feed every row of a CSV file into `output`
///
/// The first row is not treated specially, so a header row reaches `process`
/// like any other.
pub fn parse_csv_into<P, T, F>(path: P, mut output: T, mut process: F) -> Result<T>
where
    P: AsRef<Path>,
    F: FnMut(&StringRecord, &mut T),
{
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    for row in reader.records() {
        process(&row?, &mut output);
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_parse_keeps_header_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hosts.csv");

        write_csv(
            &path,
            &["host", "ip"],
            &["web01,10.0.0.1", "web02,10.0.0.2"],
        )
        .unwrap();

        let rows = parse_csv_into(&path, Vec::new(), |row, out: &mut Vec<Vec<String>>| {
            out.push(row.iter().map(str::to_string).collect());
        })
        .unwrap();

        assert_eq!(
            rows,
            vec![
                vec!["host", "ip"],
                vec!["web01", "10.0.0.1"],
                vec!["web02", "10.0.0.2"],
            ]
        );
    }

    #[test]
    fn test_ragged_rows_are_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ragged.csv");

        write_csv(&path, &["a", "b"], &["1", "1,2,3"]).unwrap();

        let widths = parse_csv_into(&path, Vec::new(), |row, out: &mut Vec<usize>| {
            out.push(row.len());
        })
        .unwrap();

        assert_eq!(widths, vec![2, 1, 3]);
    }

    #[test]
    fn test_parse_handles_quoted_commas() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quoted.csv");
        std::fs::write(&path, "name,desc\nweb01,\"front, end\"\n").unwrap();

        let descs = parse_csv_into(&path, Vec::new(), |row, out: &mut Vec<String>| {
            if let Some(desc) = row.get(1) {
                out.push(desc.to_string());
            }
        })
        .unwrap();

        assert_eq!(descs, vec!["desc", "front, end"]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = parse_csv_into(dir.path().join("nope.csv"), 0usize, |_, n| *n += 1);
        assert!(result.is_err());
    }
}

pub mod batch;
pub mod record;

pub use batch::{RecordBuffer, ARRIVAL};
pub use record::*;

use crate::error::{EtlError, Result};

/// Parse one JSON-lines object and append its records to `buffer`.
///
/// Blank lines are skipped. Returns the number of records appended.
pub fn read_json_lines(data: &[u8], key: &str, buffer: &mut RecordBuffer) -> Result<usize> {
    let text = std::str::from_utf8(data).map_err(|e| EtlError::MalformedRecord {
        key: key.to_string(),
        line: 0,
        reason: e.to_string(),
    })?;

    let mut count = 0;
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let row = parse_record(line, buffer.schema()).map_err(|reason| EtlError::MalformedRecord {
            key: key.to_string(),
            line: idx + 1,
            reason,
        })?;

        buffer.push(row);
        count += 1;
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ITEM_RECORDS;

    #[test]
    fn test_read_json_lines_reports_line() {
        let data = b"{\"song_id\": \"S1\"}\n\n{\"song_id\": \"S2\"}\nnope\n";
        let mut buffer = RecordBuffer::new(&ITEM_RECORDS);

        let err = read_json_lines(data, "song_data/a.json", &mut buffer).unwrap_err();
        match err {
            EtlError::MalformedRecord { key, line, .. } => {
                assert_eq!(key, "song_data/a.json");
                assert_eq!(line, 4);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_json_lines_counts_records() {
        let data = b"{\"song_id\": \"S1\"}\n{\"song_id\": \"S2\"}\n";
        let mut buffer = RecordBuffer::new(&ITEM_RECORDS);
        let n = read_json_lines(data, "k", &mut buffer).unwrap();
        assert_eq!(n, 2);
        assert_eq!(buffer.len(), 2);
    }
}

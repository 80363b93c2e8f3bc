//! Turns input files into line records.

use std::fs::File;
use std::io::Read;

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use glob::glob;
use tracing::debug;

use common::KeyValue;

/// Splits `contents` into one record per line.
///
/// Each record is keyed by `{source}:{offset}`, where `offset` is the byte
/// position of the line within the file. A trailing `\r` is dropped so CRLF
/// input yields the same records as LF input. A final newline does not
/// start another record.
pub fn split_records(source: &str, contents: Bytes) -> Vec<KeyValue> {
    let mut records = Vec::new();
    let mut start = 0;

    while start < contents.len() {
        let end = contents[start..]
            .iter()
            .position(|b| *b == b'\n')
            .map_or(contents.len(), |i| start + i);

        let mut line_end = end;
        if line_end > start && contents[line_end - 1] == b'\r' {
            line_end -= 1;
        }

        records.push(KeyValue {
            key: Bytes::from(format!("{source}:{start}")),
            value: contents.slice(start..line_end),
        });
        start = end + 1;
    }

    records
}

/// Reads every file matched by `pattern` and splits it into records.
///
/// Fails if the pattern matches no file.
pub fn read_records(pattern: &str) -> Result<Vec<KeyValue>> {
    let input_files = glob(pattern).with_context(|| format!("invalid input pattern `{pattern}`"))?;

    let mut records = Vec::new();
    let mut matched = 0;
    for pathspec in input_files {
        let pathspec = pathspec?;
        if !pathspec.is_file() {
            continue;
        }
        matched += 1;

        let mut buf = Vec::new();
        {
            let mut file = File::open(&pathspec)
                .with_context(|| format!("failed to open {}", pathspec.display()))?;
            file.read_to_end(&mut buf)
                .with_context(|| format!("failed to read {}", pathspec.display()))?;
        }

        let source = pathspec.to_string_lossy();
        let before = records.len();
        records.extend(split_records(&source, Bytes::from(buf)));
        debug!("read {} records from {}", records.len() - before, source);
    }

    if matched == 0 {
        bail!("input path `{pattern}` does not match any file");
    }
    Ok(records)
}

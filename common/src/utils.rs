use bytes::Bytes;

use crate::MapReduceError;

/// Converts bytes to an owned `String`, failing on invalid UTF-8.
pub fn string_from_bytes(bytes: Bytes) -> Result<String, MapReduceError> {
    Ok(String::from_utf8(bytes.to_vec())?)
}

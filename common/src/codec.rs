//! Fixed-width encoding for intermediate count values.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::MapReduceError;

const WIDTH: usize = std::mem::size_of::<u64>();

/// Encodes a count contribution as 8 big-endian bytes.
pub fn encode_u64(n: u64) -> Bytes {
    let mut buf = BytesMut::with_capacity(WIDTH);
    buf.put_u64(n);
    buf.freeze()
}

/// Decodes a value produced by [`encode_u64`].
pub fn decode_u64(mut bytes: &[u8]) -> Result<u64, MapReduceError> {
    if bytes.len() != WIDTH {
        return Err(MapReduceError::MalformedValue { len: bytes.len() });
    }
    Ok(bytes.get_u64())
}

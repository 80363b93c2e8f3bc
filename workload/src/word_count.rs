//! A MapReduce-compatible implementation of word count.
//!
//! Each record is one line of text. Words are maximal runs of characters
//! other than space, tab, newline, carriage return and form feed, lowercased;
//! punctuation stays part of the word, so `fox,` and `fox` are different keys.
//! Other Unicode spaces (NBSP, U+3000, ...) are part of a word.

use anyhow::Result;
use bytes::{BufMut, Bytes, BytesMut};

use common::codec::{decode_u64, encode_u64};
use common::utils::string_from_bytes;
use common::{KeyValue, MapOutput, MapReduceError};

/// The contribution of a single occurrence.
pub const ONE: u64 = 1;

/// Whether `c` separates words.
pub fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0C')
}

/// Splits a line into `(word, 1)` pairs, left to right.
pub fn emit(record: &str) -> impl Iterator<Item = (String, u64)> + '_ {
    record
        .split(is_separator)
        .filter(|token| !token.is_empty())
        .map(|token| (token.to_lowercase(), ONE))
}

/// Sums every contribution for `key`.
///
/// Contributions may be any non-negative count, in any order.
pub fn aggregate<I>(key: String, values: I) -> Result<(String, u64), MapReduceError>
where
    I: IntoIterator<Item = u64>,
{
    let total = values
        .into_iter()
        .try_fold(0u64, |acc, n| acc.checked_add(n));
    match total {
        Some(total) => Ok((key, total)),
        None => Err(MapReduceError::ArithmeticOverflow { key }),
    }
}

pub fn map(kv: KeyValue, _aux: Bytes) -> MapOutput {
    let line = string_from_bytes(kv.value)?;
    let words = emit(&line).collect::<Vec<_>>();

    // Lowercasing may grow a word, so size for the emitted keys rather
    // than the line.
    let capacity = words.iter().map(|(word, _)| word.len()).sum();
    let mut key_buf = BytesMut::with_capacity(capacity);

    let iter = words.into_iter().map(move |(word, count)| {
        key_buf.put_slice(word.as_bytes());

        // `split` hands out the written bytes and keeps the unused
        // capacity, so every key is a distinct view of one allocation.
        let key = key_buf.split().freeze();
        let value = encode_u64(count);

        Ok(KeyValue { key, value })
    });
    Ok(Box::new(iter))
}

pub fn reduce(
    key: Bytes,
    values: Box<dyn Iterator<Item = Bytes> + '_>,
    _aux: Bytes,
) -> Result<Bytes> {
    let word = string_from_bytes(key)?;
    let (_, total) = itertools::process_results(
        values.map(|value| decode_u64(&value)),
        |counts| aggregate(word, counts),
    )??;

    Ok(Bytes::from(total.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn words(line: &str) -> Vec<String> {
        emit(line).map(|(word, _)| word).collect()
    }

    fn run_map(line: &str) -> Vec<KeyValue> {
        let kv = KeyValue::new(Bytes::from("in:0"), Bytes::from(line.to_string()));
        map(kv, Bytes::new())
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    fn run_reduce(key: &str, counts: &[u64]) -> Result<Bytes> {
        let values = counts.iter().map(|n| encode_u64(*n)).collect::<Vec<_>>();
        reduce(
            Bytes::from(key.to_string()),
            Box::new(values.into_iter()),
            Bytes::new(),
        )
    }

    #[test]
    fn emits_words_in_line_order() {
        assert_eq!(words("the quick fox"), ["the", "quick", "fox"]);
        assert!(emit("the quick fox").all(|(_, n)| n == ONE));
    }

    #[test]
    fn folds_case() {
        assert_eq!(words("Hello HELLO hello"), ["hello", "hello", "hello"]);
        assert_eq!(words("ÉCOLE Straße"), ["école", "straße"]);
    }

    #[test]
    fn whitespace_only_lines_emit_nothing() {
        assert!(words("").is_empty());
        assert!(words(" \t \r\n \x0C ").is_empty());
    }

    #[test]
    fn only_ascii_separators_split_words() {
        assert_eq!(words("a\u{a0}b"), ["a\u{a0}b"]);
        assert_eq!(words("x\u{0B}y z\u{3000}w"), ["x\u{0B}y", "z\u{3000}w"]);
        assert_eq!(words("a\x0Cb"), ["a", "b"]);
    }

    #[test]
    fn collapses_runs_of_whitespace() {
        assert_eq!(words("  a\t\tb   c  "), ["a", "b", "c"]);
    }

    #[test]
    fn keeps_punctuation() {
        assert_eq!(words("word, word"), ["word,", "word"]);
    }

    #[test]
    fn map_emits_owned_keys_with_unit_values() {
        let out = run_map("The lazy fox");
        let keys = out.iter().map(|kv| kv.key.clone()).collect::<Vec<_>>();
        assert_eq!(keys, ["the", "lazy", "fox"]);
        for kv in &out {
            assert_eq!(decode_u64(&kv.value).unwrap(), ONE);
        }
    }

    #[test]
    fn map_keys_share_one_allocation() {
        let out = run_map("ÉCOLE fox ÉCOLE");
        assert_eq!(out[0].key, "école");
        assert_eq!(out[2].key, "école");
        let base = out[0].key.as_ptr() as usize;
        assert_eq!(out[1].key.as_ptr() as usize, base + out[0].key.len());
    }

    #[test]
    fn map_rejects_invalid_utf8() {
        let kv = KeyValue::new(Bytes::from("in:0"), Bytes::from_static(&[0x66, 0xff]));
        let err = match map(kv, Bytes::new()) {
            Ok(_) => panic!("invalid UTF-8 should be rejected"),
            Err(e) => e,
        };
        assert!(matches!(
            err.downcast_ref::<MapReduceError>(),
            Some(MapReduceError::MalformedInput(_))
        ));
    }

    #[test]
    fn aggregate_single_contribution() {
        assert_eq!(aggregate("hadoop".into(), [1]).unwrap(), ("hadoop".into(), 1));
    }

    #[test]
    fn aggregate_accepts_arbitrary_counts() {
        assert_eq!(aggregate("fox".into(), [3, 0, 4]).unwrap().1, 7);
    }

    #[test]
    fn aggregate_reports_overflow() {
        let err = aggregate("the".into(), [u64::MAX, 1]).unwrap_err();
        assert!(matches!(err, MapReduceError::ArithmeticOverflow { ref key } if key == "the"));
    }

    #[test]
    fn reduce_renders_decimal_total() {
        assert_eq!(run_reduce("the", &[1, 1, 1]).unwrap(), Bytes::from("3"));
    }

    #[test]
    fn reduce_surfaces_overflow() {
        let err = run_reduce("the", &[u64::MAX, 2]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MapReduceError>(),
            Some(MapReduceError::ArithmeticOverflow { .. })
        ));
    }

    #[test]
    fn reduce_rejects_undecodable_values() {
        let err = reduce(
            Bytes::from("the"),
            Box::new(vec![Bytes::from("1")].into_iter()),
            Bytes::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MapReduceError>(),
            Some(MapReduceError::MalformedValue { len: 1 })
        ));
    }

    proptest! {
        #[test]
        fn emit_is_deterministic(line in "\\PC*") {
            let first = emit(&line).collect::<Vec<_>>();
            let second = emit(&line).collect::<Vec<_>>();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn emit_counts_every_token(line in "[a-zA-Z,. \t\u{a0}]{0,64}") {
            let tokens = line.split([' ', '\t']).filter(|t| !t.is_empty()).count();
            prop_assert_eq!(emit(&line).count(), tokens);
        }

        #[test]
        fn emitted_keys_are_lowercase(line in "\\PC*") {
            for (word, _) in emit(&line) {
                prop_assert_eq!(word.to_lowercase(), word);
            }
        }

        #[test]
        fn aggregate_ignores_order(mut counts in proptest::collection::vec(0u64..1_000, 0..32)) {
            let (_, forward) = aggregate("k".into(), counts.clone()).unwrap();
            counts.reverse();
            let (_, backward) = aggregate("k".into(), counts.clone()).unwrap();
            prop_assert_eq!(forward, backward);
            prop_assert_eq!(forward, counts.iter().sum::<u64>());
        }
    }
}

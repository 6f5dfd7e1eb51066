//! Double-array common-prefix trie over byte keys.
//!
//! The stored `value` of every key encodes how to look a key's token block
//! up in `Dictionary`: the low byte is the token count sharing that surface,
//! the upper 24 bits are the base offset into the token table.

use yada::DoubleArray;

/// Matches returned by `Trie::common_prefix_search` are capped at this many
/// entries; additional matches are silently dropped.
pub const MAX_SEARCH_RESULTS: usize = 512;

/// A single common-prefix-search hit: the matched byte length and the
/// decoded `(token_count, base_offset)` pair.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct TrieMatch {
    /// Number of bytes of the key this match covers.
    pub length: usize,
    /// Number of contiguous `TokenEntry` records sharing this surface.
    pub token_count: u32,
    /// Index of the first `TokenEntry` record sharing this surface.
    pub base_offset: u32,
}

impl TrieMatch {
    fn decode(value: u32, length: usize) -> TrieMatch {
        TrieMatch {
            length,
            token_count: value & 0xff,
            base_offset: value >> 8,
        }
    }
}

/// Thin wrapper around a `yada::DoubleArray` borrowed from a `MappedTable`.
pub struct Trie<'a> {
    da: DoubleArray<&'a [u8]>,
}

impl<'a> Trie<'a> {
    /// Wraps an already-validated double-array byte region. The caller is
    /// responsible for ensuring `data` was produced by a compatible builder
    /// (dictionary compilation is out of scope for this crate).
    pub fn new(data: &'a [u8]) -> Trie<'a> {
        Trie {
            da: DoubleArray::new(data),
        }
    }

    /// Exact lookup of `key`. Returns the decoded match only if `key` is
    /// itself a full entry of the trie (not merely a prefix of one).
    pub fn exact_match(&self, key: &[u8]) -> Option<TrieMatch> {
        self.da
            .exact_match_search(key)
            .map(|value| TrieMatch::decode(value, key.len()))
    }

    /// Writes every maximal-per-length prefix of `key` found in the trie
    /// into `out`, in increasing length order, returning the number written.
    /// At most `MAX_SEARCH_RESULTS` matches are written; the rest are
    /// dropped silently.
    pub fn common_prefix_search(&self, key: &[u8], out: &mut [TrieMatch]) -> usize {
        let mut n = 0;
        for (value, length) in self.da.common_prefix_search(key) {
            if n >= out.len().min(MAX_SEARCH_RESULTS) {
                break;
            }
            out[n] = TrieMatch::decode(value, length);
            n += 1;
        }
        n
    }
}

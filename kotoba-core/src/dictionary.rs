//! Binary word-entry store: trie keys → `(lcAttr, rcAttr, posid, wordCost,
//! featureOffset)`, plus the dictionary's feature-string blob.

use byteorder::{ByteOrder, LittleEndian};

use crate::char_property::Charset;
use crate::error::{KotobaError, KotobaErrorKind};
use crate::mapped_table::MappedTable;
use crate::trie::{Trie, TrieMatch, MAX_SEARCH_RESULTS};

/// `(stored_magic XOR file_size) == MAGIC_CONSTANT` is the dictionary's
/// structural checksum.
const MAGIC_CONSTANT: u32 = 0xef71_8f77;
const SUPPORTED_VERSION: u32 = 102;
const HEADER_LEN: usize = 40 + 32; // 10 u32 fields + 32-byte charset
const TOKEN_ENTRY_LEN: usize = 16;

/// Which slot of a dictionary stack a `Dictionary` occupies.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DictionaryType {
    Sys,
    Usr,
    Unk,
}

impl DictionaryType {
    fn from_u32(v: u32) -> DictionaryType {
        match v {
            1 => DictionaryType::Usr,
            2 => DictionaryType::Unk,
            _ => DictionaryType::Sys,
        }
    }
}

/// An immutable record stored in a `Dictionary`.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct TokenEntry {
    pub lc_attr: u16,
    pub rc_attr: u16,
    pub posid: u16,
    pub word_cost: i16,
    pub feature_offset: u32,
    pub compound: u32,
}

impl TokenEntry {
    fn decode(bytes: &[u8]) -> TokenEntry {
        TokenEntry {
            lc_attr: LittleEndian::read_u16(&bytes[0..2]),
            rc_attr: LittleEndian::read_u16(&bytes[2..4]),
            posid: LittleEndian::read_u16(&bytes[4..6]),
            word_cost: LittleEndian::read_i16(&bytes[6..8]),
            feature_offset: LittleEndian::read_u32(&bytes[8..12]),
            compound: LittleEndian::read_u32(&bytes[12..16]),
        }
    }
}

/// `(filename, charset, size, type, lsize, rsize, version)` —
/// `DictionaryInfo`, minus the `next` link (the ordered stack is modeled as
/// a `Vec` by callers instead of an intrusive list).
pub struct DictionaryInfo {
    pub filename: String,
    pub charset: Charset,
    pub size: u32,
    pub dict_type: DictionaryType,
    pub lsize: u32,
    pub rsize: u32,
    pub version: u32,
}

/// A memory-mapped dictionary: double-array trie + token table + feature blob.
pub struct Dictionary {
    table: MappedTable,
    info: DictionaryInfo,
    da_offset: usize,
    da_len: usize,
    tokens_offset: usize,
    features_offset: usize,
    features_len: usize,
}

impl Dictionary {
    pub fn open(path: &str) -> Result<Dictionary, KotobaError> {
        let table = MappedTable::open(path)?;
        let bytes = table.as_slice();

        if bytes.len() < HEADER_LEN {
            return Err(KotobaErrorKind::Resource
                .with_error(anyhow::anyhow!("dictionary file too short: {path}")));
        }

        let magic = LittleEndian::read_u32(&bytes[0..4]);
        if (magic ^ bytes.len() as u32) != MAGIC_CONSTANT {
            return Err(KotobaErrorKind::Resource
                .with_error(anyhow::anyhow!("dictionary file is broken: {path}")));
        }

        let version = LittleEndian::read_u32(&bytes[4..8]);
        if version != SUPPORTED_VERSION {
            return Err(KotobaErrorKind::IncompatibleVersion
                .with_error(anyhow::anyhow!("incompatible version {version} in {path}")));
        }

        let dict_type = DictionaryType::from_u32(LittleEndian::read_u32(&bytes[8..12]));
        let lexsize = LittleEndian::read_u32(&bytes[12..16]);
        let lsize = LittleEndian::read_u32(&bytes[16..20]);
        let rsize = LittleEndian::read_u32(&bytes[20..24]);
        let dsize = LittleEndian::read_u32(&bytes[24..28]) as usize;
        let tsize = LittleEndian::read_u32(&bytes[28..32]) as usize;
        let fsize = LittleEndian::read_u32(&bytes[32..36]) as usize;
        // bytes[36..40] is the reserved dummy field.

        let charset_raw = &bytes[40..72];
        let nul = charset_raw.iter().position(|&b| b == 0).unwrap_or(charset_raw.len());
        let charset_str = std::str::from_utf8(&charset_raw[..nul]).map_err(|err| {
            KotobaErrorKind::Decode.with_error(anyhow::anyhow!(err))
        })?;
        let charset = crate::char_property::decode_charset(charset_str);

        let da_offset = HEADER_LEN;
        let tokens_offset = da_offset + dsize;
        let features_offset = tokens_offset + tsize;
        let expected_total = features_offset + fsize;
        if bytes.len() != expected_total {
            return Err(KotobaErrorKind::Resource.with_error(anyhow::anyhow!(
                "dictionary file is broken: {path} (expected {expected_total} bytes, got {})",
                bytes.len()
            )));
        }

        Ok(Dictionary {
            table,
            info: DictionaryInfo {
                filename: path.to_owned(),
                charset,
                size: lexsize,
                dict_type,
                lsize,
                rsize,
                version,
            },
            da_offset,
            da_len: dsize,
            tokens_offset,
            features_offset,
            features_len: fsize,
        })
    }

    pub fn info(&self) -> &DictionaryInfo {
        &self.info
    }

    fn trie(&self) -> Trie<'_> {
        Trie::new(&self.table.as_slice()[self.da_offset..self.da_offset + self.da_len])
    }

    fn token_entry(&self, index: u32) -> TokenEntry {
        let off = self.tokens_offset + TOKEN_ENTRY_LEN * index as usize;
        TokenEntry::decode(&self.table.as_slice()[off..off + TOKEN_ENTRY_LEN])
    }

    /// Fetches a single `TokenEntry` by its absolute index in the token
    /// table. Exposed so callers that already hold a `(token_count,
    /// base_offset)` pair — e.g. from `exact_match` — can materialise the
    /// entries without re-walking the trie.
    pub fn token(&self, index: u32) -> TokenEntry {
        self.token_entry(index)
    }

    /// Exact lookup of `key` in this dictionary's trie, decoded to
    /// `(token_count, base_offset)`. Used for the
    /// unknown dictionary, whose keys are category names rather than
    /// surface text.
    pub fn exact_match(&self, key: &[u8]) -> Option<(u32, u32)> {
        self.trie().exact_match(key).map(|m| (m.token_count, m.base_offset))
    }

    /// Feature string of `token`: the NUL-terminated C string at
    /// `features[token.featureOffset..]`.
    pub fn feature(&self, token: &TokenEntry) -> &str {
        let start = self.features_offset + token.feature_offset as usize;
        let region = &self.table.as_slice()[start..self.features_offset + self.features_len];
        let nul = region.iter().position(|&b| b == 0).unwrap_or(region.len());
        std::str::from_utf8(&region[..nul]).unwrap_or("")
    }

    /// For each trie hit starting at `begin` that is a prefix of
    /// `bytes[begin..end]`, yields every `TokenEntry` sharing that surface.
    /// Results come back ordered by increasing surface length, as trie
    /// matches do; within a surface length, token entries are returned in
    /// their on-disk (insertion) order.
    pub fn common_prefix_search(&self, bytes: &[u8], begin: usize, end: usize) -> Vec<(usize, TokenEntry)> {
        let trie = self.trie();
        let mut raw = [TrieMatch { length: 0, token_count: 0, base_offset: 0 }; MAX_SEARCH_RESULTS];
        let n = trie.common_prefix_search(&bytes[begin..end], &mut raw);

        let mut out = Vec::new();
        for m in &raw[..n] {
            for i in 0..m.token_count {
                out.push((m.length, self.token_entry(m.base_offset + i)));
            }
        }
        out
    }

    /// Compatibility check when stacking dictionaries: identical
    /// `version`, `lsize`, `rsize`, and decoded charset.
    pub fn is_compatible_with(&self, other: &Dictionary) -> bool {
        self.info.version == other.info.version
            && self.info.lsize == other.info.lsize
            && self.info.rsize == other.info.rsize
            && self.info.charset == other.info.charset
    }
}

//! Character-category table: maps code points to a category bitmask and the
//! policy the tokenizer uses to fall back to unknown-word generation.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{KotobaError, KotobaErrorKind};
use crate::mapped_table::MappedTable;

/// Declared dictionary encoding. Every dictionary in a stack must
/// agree on this value.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Charset {
    Utf8,
    Utf16Le,
    Utf16Be,
    Ascii,
}

/// Maps an on-disk charset label to a `Charset`, falling back to UTF-8 with
/// a warning for anything unrecognized.
pub fn decode_charset(label: &str) -> Charset {
    match label {
        "UTF-16LE" => Charset::Utf16Le,
        "UTF-16BE" => Charset::Utf16Be,
        "ASCII" => Charset::Ascii,
        "UTF-8" => Charset::Utf8,
        other => {
            log::warn!("unrecognized charset '{other}', falling back to UTF-8");
            Charset::Utf8
        }
    }
}

/// One decoded character plus its byte length in the source encoding.
#[derive(Debug, Clone, Copy)]
pub struct DecodedChar {
    /// Unicode code point, collapsed to 0 if it doesn't fit in `u16` (the
    /// property table is indexed `0..0x10000`).
    pub code_point: u16,
    /// Number of bytes this character occupied in the source buffer.
    pub mblen: usize,
}

/// Decodes one character at `pos` according to `charset`. Never fails:
/// invalid or truncated sequences decode to the DEFAULT entry with
/// `mblen = 1`.
pub fn decode_one(bytes: &[u8], pos: usize, charset: Charset) -> DecodedChar {
    let remaining = &bytes[pos..];
    if remaining.is_empty() {
        return DecodedChar { code_point: 0, mblen: 1 };
    }
    match charset {
        Charset::Ascii => DecodedChar {
            code_point: remaining[0] as u16,
            mblen: 1,
        },
        Charset::Utf8 => decode_utf8_one(remaining),
        Charset::Utf16Le => decode_utf16_one(remaining, true),
        Charset::Utf16Be => decode_utf16_one(remaining, false),
    }
}

fn decode_utf8_one(bytes: &[u8]) -> DecodedChar {
    match std::str::from_utf8(&bytes[..bytes.len().min(4)]) {
        Ok(s) => {
            if let Some(c) = s.chars().next() {
                let mblen = c.len_utf8();
                let cp = c as u32;
                return DecodedChar {
                    code_point: if cp > 0xffff { 0 } else { cp as u16 },
                    mblen,
                };
            }
            DecodedChar { code_point: 0, mblen: 1 }
        }
        Err(e) => {
            // A valid prefix may still exist before the error; retry on it.
            let valid = e.valid_up_to();
            if valid > 0 {
                if let Ok(s) = std::str::from_utf8(&bytes[..valid]) {
                    if let Some(c) = s.chars().next() {
                        let mblen = c.len_utf8();
                        let cp = c as u32;
                        return DecodedChar {
                            code_point: if cp > 0xffff { 0 } else { cp as u16 },
                            mblen,
                        };
                    }
                }
            }
            DecodedChar { code_point: 0, mblen: 1 }
        }
    }
}

fn decode_utf16_one(bytes: &[u8], little_endian: bool) -> DecodedChar {
    if bytes.len() < 2 {
        return DecodedChar { code_point: 0, mblen: 1 };
    }
    let unit = if little_endian {
        LittleEndian::read_u16(&bytes[..2])
    } else {
        byteorder::BigEndian::read_u16(&bytes[..2])
    };
    // All internal codes are UCS-2: the raw 16-bit unit is the code point,
    // surrogate halves included, with no pairing into higher planes.
    DecodedChar { code_point: unit, mblen: 2 }
}

/// Packed per-codepoint classification. Stored as a raw `u32` matching
/// the on-disk bit layout exactly:
/// bits 0..18 = category bitmask, 18..26 = default category index,
/// 26..30 = grouping length bound, 30 = group flag, 31 = invoke flag.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct CharInfo(u32);

impl CharInfo {
    pub fn from_raw(raw: u32) -> CharInfo {
        CharInfo(raw)
    }

    pub fn category_mask(&self) -> u32 {
        self.0 & 0x0003_ffff
    }

    pub fn default_type(&self) -> u8 {
        ((self.0 >> 18) & 0xff) as u8
    }

    pub fn length(&self) -> u8 {
        ((self.0 >> 26) & 0xf) as u8
    }

    pub fn group(&self) -> bool {
        (self.0 >> 30) & 1 != 0
    }

    pub fn invoke(&self) -> bool {
        (self.0 >> 31) & 1 != 0
    }

    /// `isKindOf`: true iff the two category bitmasks share a bit.
    pub fn is_kind_of(&self, other: CharInfo) -> bool {
        self.category_mask() & other.category_mask() != 0
    }
}

const MAX_CATEGORIES: usize = 18;
const TABLE_ENTRIES: usize = 0x10000;

/// The character-property table: category names plus a `0x10000`-entry
/// `CharInfo` lookup table indexed by code point.
pub struct CharProperty {
    _table: MappedTable,
    category_names: Vec<String>,
    entries_offset: usize,
}

impl CharProperty {
    pub fn open(path: &str) -> Result<CharProperty, KotobaError> {
        let table = MappedTable::open(path)?;
        let bytes = table.as_slice();

        if bytes.len() < 4 {
            return Err(KotobaErrorKind::Resource
                .with_error(anyhow::anyhow!("char property file too short: {path}")));
        }
        let category_count = LittleEndian::read_u32(&bytes[0..4]) as usize;

        let expected_size = 4 + 32 * category_count + 4 * TABLE_ENTRIES;
        if bytes.len() != expected_size {
            return Err(KotobaErrorKind::Resource.with_error(anyhow::anyhow!(
                "invalid char property file size: {path} (expected {expected_size}, got {})",
                bytes.len()
            )));
        }
        if category_count == 0 || category_count > MAX_CATEGORIES {
            return Err(KotobaErrorKind::Resource
                .with_error(anyhow::anyhow!("invalid category count {category_count} in {path}")));
        }

        let mut category_names = Vec::with_capacity(category_count);
        for i in 0..category_count {
            let start = 4 + 32 * i;
            let raw = &bytes[start..start + 32];
            let nul = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
            category_names.push(String::from_utf8_lossy(&raw[..nul]).into_owned());
        }

        if !category_names.iter().any(|n| n == "DEFAULT") {
            return Err(KotobaErrorKind::Resource
                .with_error(anyhow::anyhow!("category DEFAULT is undefined in {path}")));
        }
        if !category_names.iter().any(|n| n == "SPACE") {
            return Err(KotobaErrorKind::Resource
                .with_error(anyhow::anyhow!("category SPACE is undefined in {path}")));
        }

        let entries_offset = 4 + 32 * category_count;

        Ok(CharProperty {
            _table: table,
            category_names,
            entries_offset,
        })
    }

    pub fn category_names(&self) -> &[String] {
        &self.category_names
    }

    fn char_info_at(&self, code_point: u16) -> CharInfo {
        let off = self.entries_offset + 4 * code_point as usize;
        let raw = LittleEndian::read_u32(&self._table.as_slice()[off..off + 4]);
        CharInfo::from_raw(raw)
    }

    /// Decodes one character at `pos` and returns its `CharInfo` plus
    /// `mblen`. Always succeeds; on decode failure returns the
    /// DEFAULT entry with `mblen = 1`.
    pub fn char_info(&self, bytes: &[u8], pos: usize, charset: Charset) -> (CharInfo, usize) {
        if pos >= bytes.len() {
            return (self.char_info_at(0), 1);
        }
        let decoded = decode_one(bytes, pos, charset);
        (self.char_info_at(decoded.code_point), decoded.mblen)
    }

    /// Extends a run starting at `begin` while the next character
    /// `isKindOf(seed)`. Returns `(end_of_run, char_count)`.
    pub fn seek_to_other_type(
        &self,
        bytes: &[u8],
        begin: usize,
        end: usize,
        charset: Charset,
        seed: CharInfo,
    ) -> (usize, usize) {
        self.seek_run(bytes, begin, end, charset, seed, usize::MAX)
    }

    /// Like `seek_to_other_type`, but stops after at most `max_chars`
    /// characters even if the run continues — the shared primitive behind
    /// both the grouped and length-indexed unknown-word candidates.
    pub fn seek_run(
        &self,
        bytes: &[u8],
        begin: usize,
        end: usize,
        charset: Charset,
        seed: CharInfo,
        max_chars: usize,
    ) -> (usize, usize) {
        let mut p = begin;
        let mut clen = 0;
        while p < end && clen < max_chars {
            let (info, mblen) = self.char_info(bytes, p, charset);
            if !seed.is_kind_of(info) {
                break;
            }
            p += mblen;
            clen += 1;
        }
        (p, clen)
    }
}

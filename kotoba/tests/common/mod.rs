//! Shared toy-dicdir builder for this crate's integration tests.
//! Hand-rolls the same binary layouts exercised unit-test-side in
//! `kotoba-core`/`kotoba-tokenizer`, just assembled into files on disk so
//! `Model::open` can be driven end to end.

use byteorder::{ByteOrder, LittleEndian};
use kotoba::OpenOptions;
use std::path::PathBuf;
use yada::builder::DoubleArrayBuilder;

const MAGIC_CONSTANT: u32 = 0xef71_8f77;
const VERSION: u32 = 102;

pub const WORD_CHAR: u32 = 1;
pub const SPACE_CHAR: u32 = 1 << 1;

pub struct RawEntry {
    pub surface: &'static str,
    pub lc: u16,
    pub rc: u16,
    pub wcost: i16,
    pub feature: &'static str,
}

pub fn e(surface: &'static str, lc: u16, rc: u16, wcost: i16, feature: &'static str) -> RawEntry {
    RawEntry { surface, lc, rc, wcost, feature }
}

fn build_dic(entries: &[RawEntry]) -> Vec<u8> {
    let mut features = Vec::new();
    let mut feature_offsets = Vec::new();
    for entry in entries {
        feature_offsets.push(features.len() as u32);
        features.extend_from_slice(entry.feature.as_bytes());
        features.push(0);
    }

    let mut tokens = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        tokens.extend_from_slice(&entry.lc.to_le_bytes());
        tokens.extend_from_slice(&entry.rc.to_le_bytes());
        tokens.extend_from_slice(&0u16.to_le_bytes()); // posid
        tokens.extend_from_slice(&entry.wcost.to_le_bytes());
        tokens.extend_from_slice(&feature_offsets[i].to_le_bytes());
        tokens.extend_from_slice(&0u32.to_le_bytes()); // compound
    }

    let mut keys: Vec<(&[u8], u32)> = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| (entry.surface.as_bytes(), (i as u32) << 8 | 1))
        .collect();
    keys.sort_by(|a, b| a.0.cmp(b.0));
    let da = DoubleArrayBuilder::build(&keys).unwrap().into_vec();

    let mut buf = vec![0u8; 40];
    let dsize = da.len() as u32;
    let tsize = tokens.len() as u32;
    let fsize = features.len() as u32;
    LittleEndian::write_u32(&mut buf[4..8], VERSION);
    LittleEndian::write_u32(&mut buf[12..16], entries.len() as u32);
    LittleEndian::write_u32(&mut buf[16..20], 2); // lsize
    LittleEndian::write_u32(&mut buf[20..24], 2); // rsize
    LittleEndian::write_u32(&mut buf[24..28], dsize);
    LittleEndian::write_u32(&mut buf[28..32], tsize);
    LittleEndian::write_u32(&mut buf[32..36], fsize);

    let mut charset = [0u8; 32];
    charset[..5].copy_from_slice(b"UTF-8");
    buf.extend_from_slice(&charset);
    buf.extend_from_slice(&da);
    buf.extend_from_slice(&tokens);
    buf.extend_from_slice(&features);

    let total_size = buf.len() as u32;
    LittleEndian::write_u32(&mut buf[0..4], total_size ^ MAGIC_CONSTANT);
    buf
}

fn build_char_property(overrides: &[(u16, u32)], base: u32, lsize_rsize: (u16, u16)) -> Vec<u8> {
    let _ = lsize_rsize;
    let mut buf = Vec::new();
    let categories = ["DEFAULT", "SPACE"];
    buf.extend_from_slice(&(categories.len() as u32).to_le_bytes());
    for name in categories {
        let mut rec = [0u8; 32];
        rec[..name.len()].copy_from_slice(name.as_bytes());
        buf.extend_from_slice(&rec);
    }
    let mut table = vec![base; 0x10000];
    for &(cp, raw) in overrides {
        table[cp as usize] = raw;
    }
    for raw in table {
        buf.extend_from_slice(&raw.to_le_bytes());
    }
    buf
}

fn build_matrix(lsize: u16, rsize: u16) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&lsize.to_le_bytes());
    buf.extend_from_slice(&rsize.to_le_bytes());
    buf.extend_from_slice(&vec![0u8; 2 * lsize as usize * rsize as usize]);
    buf
}

fn unique_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "kotoba-it-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Builds a dicdir from `entries` plus a char-property table with every
/// override marked WORD_CHAR (and 0x20 marked SPACE), a zero 2x2 matrix, and
/// a DEFAULT-category unknown-word fallback. Returns `OpenOptions` pointing
/// at it.
pub fn toy_options(tag: &str, entries: &[RawEntry], word_chars: &str) -> OpenOptions {
    let dir = unique_dir(tag);
    std::fs::write(dir.join("sys.dic"), build_dic(entries)).unwrap();
    std::fs::write(
        dir.join("unk.dic"),
        build_dic(&[e("DEFAULT", 0, 0, 0, "DEFAULT_UNK")]),
    )
    .unwrap();

    let mut overrides: Vec<(u16, u32)> = vec![(0x20, SPACE_CHAR)];
    for ch in word_chars.chars() {
        overrides.push((ch as u16, WORD_CHAR));
    }
    std::fs::write(dir.join("char.bin"), build_char_property(&overrides, WORD_CHAR, (2, 2))).unwrap();
    std::fs::write(dir.join("matrix.bin"), build_matrix(2, 2)).unwrap();

    OpenOptions::new(dir)
}

/// Like `toy_options`, but marks `unknown_chars` as DEFAULT/`group=0,
/// length=1, invoke=1` instead of WORD_CHAR, so they fall through to
/// unknown-word generation (S4).
pub fn toy_options_with_unknown(tag: &str, entries: &[RawEntry], word_chars: &str, unknown_chars: &str) -> OpenOptions {
    const UNKNOWN_CHAR: u32 = 1 | (1 << 31);
    let dir = unique_dir(tag);
    std::fs::write(dir.join("sys.dic"), build_dic(entries)).unwrap();
    std::fs::write(
        dir.join("unk.dic"),
        build_dic(&[e("DEFAULT", 0, 0, 0, "DEFAULT_UNK")]),
    )
    .unwrap();

    let mut overrides: Vec<(u16, u32)> = vec![(0x20, SPACE_CHAR)];
    for ch in word_chars.chars() {
        overrides.push((ch as u16, WORD_CHAR));
    }
    for ch in unknown_chars.chars() {
        overrides.push((ch as u16, UNKNOWN_CHAR));
    }
    std::fs::write(dir.join("char.bin"), build_char_property(&overrides, WORD_CHAR, (2, 2))).unwrap();
    std::fs::write(dir.join("matrix.bin"), build_matrix(2, 2)).unwrap();

    OpenOptions::new(dir)
}

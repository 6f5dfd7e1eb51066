//! Resource configuration: `OpenOptions` plus the `dicrc`/rcfile
//! ini-style loader. Environment variable discovery (`MECABRC`, `HOME`) and
//! command-line option parsing belong to the external CLI collaborator;
//! this module only ever receives already-resolved paths.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{KotobaError, KotobaErrorKind};

/// N-BEST MAX: the hard cap on a configured `nbest`.
pub const NBEST_MAX: u32 = 512;
const DEFAULT_THETA: f64 = 0.75;
const DEFAULT_COST_FACTOR: u32 = 700;
const DEFAULT_MAX_GROUPING_SIZE: usize = 24;
const MIN_INPUT_BUFFER_SIZE: usize = 8192;
const MAX_INPUT_BUFFER_SIZE: usize = 8192 * 640;

/// The resolved set of options a `Model::open` call needs, after any
/// rc-file/CLI layering has already happened upstream.
#[derive(Debug, Clone)]
pub struct OpenOptions {
    pub dicdir: PathBuf,
    pub userdic: Vec<PathBuf>,
    pub nbest: u32,
    pub theta: f64,
    /// Only consumed by dictionary-compilation tooling; kept here purely so
    /// a full rc-file round-trips without rejecting the key.
    pub cost_factor: u32,
    pub max_grouping_size: usize,
    pub bos_feature: String,
    pub unk_feature: Option<String>,
    pub partial: bool,
    pub all_morphs: bool,
    pub marginal: bool,
    pub allocate_sentence: bool,
    pub input_buffer_size: usize,
}

impl OpenOptions {
    pub fn new(dicdir: impl Into<PathBuf>) -> OpenOptions {
        OpenOptions {
            dicdir: dicdir.into(),
            userdic: Vec::new(),
            nbest: 1,
            theta: DEFAULT_THETA,
            cost_factor: DEFAULT_COST_FACTOR,
            max_grouping_size: DEFAULT_MAX_GROUPING_SIZE,
            bos_feature: "BOS/EOS".to_owned(),
            unk_feature: None,
            partial: false,
            all_morphs: false,
            marginal: false,
            allocate_sentence: false,
            input_buffer_size: MIN_INPUT_BUFFER_SIZE,
        }
    }

    /// Merges `key = value` settings from a parsed rc-file on top of these
    /// options, then normalises the result (nbest/input-buffer-size
    /// clamping). An unrecognised key is a `ConfigError`.
    pub fn apply_rc(mut self, entries: &HashMap<String, String>) -> Result<OpenOptions, KotobaError> {
        for (key, value) in entries {
            match key.as_str() {
                "dicdir" => self.dicdir = PathBuf::from(value),
                "userdic" => {
                    self.userdic = value
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(PathBuf::from)
                        .collect();
                }
                "nbest" => self.nbest = parse_config_value(key, value)?,
                "theta" => self.theta = parse_config_value(key, value)?,
                "cost-factor" => self.cost_factor = parse_config_value(key, value)?,
                "max-grouping-size" => self.max_grouping_size = parse_config_value(key, value)?,
                "bos-feature" => {
                    if value.is_empty() {
                        return Err(KotobaErrorKind::Config
                            .with_error(anyhow::anyhow!("bos-feature must not be empty")));
                    }
                    self.bos_feature = value.clone();
                }
                "unk-feature" => self.unk_feature = Some(value.clone()),
                "partial" => self.partial = parse_bool(key, value)?,
                "all-morphs" => self.all_morphs = parse_bool(key, value)?,
                "marginal" => self.marginal = parse_bool(key, value)?,
                "allocate-sentence" => self.allocate_sentence = parse_bool(key, value)?,
                "input-buffer-size" => self.input_buffer_size = parse_config_value(key, value)?,
                other => {
                    return Err(KotobaErrorKind::Config
                        .with_error(anyhow::anyhow!("unknown option '{other}'")));
                }
            }
        }
        self.normalize()
    }

    /// Resolved dictionary file paths inside `dicdir`.
    pub fn sys_dic_path(&self) -> PathBuf {
        self.dicdir.join("sys.dic")
    }

    pub fn unk_dic_path(&self) -> PathBuf {
        self.dicdir.join("unk.dic")
    }

    pub fn char_bin_path(&self) -> PathBuf {
        self.dicdir.join("char.bin")
    }

    pub fn matrix_bin_path(&self) -> PathBuf {
        self.dicdir.join("matrix.bin")
    }

    /// Clamps `nbest` to `[1, NBEST_MAX]` (`nbest == 0` is rejected outright
    /// rather than silently promoted, since no such value is ever
    /// meaningful) and `input_buffer_size` to `[8192, 8192*640]`.
    fn normalize(mut self) -> Result<OpenOptions, KotobaError> {
        if self.nbest == 0 {
            return Err(KotobaErrorKind::Input.with_error(anyhow::anyhow!("nbest must be >= 1")));
        }
        if self.nbest > NBEST_MAX {
            log::warn!("nbest {} exceeds the cap of {NBEST_MAX}, clamping", self.nbest);
            self.nbest = NBEST_MAX;
        }
        self.input_buffer_size = self
            .input_buffer_size
            .clamp(MIN_INPUT_BUFFER_SIZE, MAX_INPUT_BUFFER_SIZE);
        Ok(self)
    }
}

fn parse_config_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, KotobaError> {
    value
        .parse::<T>()
        .map_err(|_| KotobaErrorKind::Config.with_error(anyhow::anyhow!("invalid value for '{key}': {value}")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, KotobaError> {
    match value {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        _ => Err(KotobaErrorKind::Config.with_error(anyhow::anyhow!("invalid boolean for '{key}': {value}"))),
    }
}

/// Parses an ini-style `dicrc`/rcfile: `key = value` lines, comments
/// beginning with `;` or `#`, blank lines ignored.
///
/// Trimming is asymmetric: the key is trimmed on both sides, the value only
/// on its leading side, so a value with meaningful trailing whitespace (or a
/// trailing `\r` from a CRLF file) survives into the returned map.
pub fn parse_rc(contents: &str) -> HashMap<String, String> {
    let mut entries = HashMap::new();
    for raw_line in contents.lines() {
        let line = raw_line.trim_start();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        let eq = match line.find('=') {
            Some(pos) => pos,
            None => continue,
        };
        let key = line[..eq].trim().to_owned();
        let value = line[eq + 1..].trim_start().to_owned();
        if key.is_empty() {
            continue;
        }
        entries.insert(key, value);
    }
    entries
}

pub fn read_rc(path: &Path) -> Result<HashMap<String, String>, KotobaError> {
    let contents = std::fs::read_to_string(path).map_err(|err| {
        KotobaErrorKind::Resource
            .with_error(anyhow::anyhow!(err))
            .add_context(format!("reading rc file {}", path.display()))
    })?;
    Ok(parse_rc(&contents))
}

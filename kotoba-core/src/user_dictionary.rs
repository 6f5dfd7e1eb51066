//! An ordered stack of dictionaries sharing a common encoding and
//! `(lsize, rsize, version)`.

use crate::dictionary::Dictionary;
use crate::error::{KotobaError, KotobaErrorKind};

/// A system dictionary plus zero or more user dictionaries, all validated
/// to agree on `version`, `lsize`, `rsize`, and charset.
pub struct DictionaryStack {
    system: Dictionary,
    user: Vec<Dictionary>,
}

impl DictionaryStack {
    pub fn new(system: Dictionary) -> DictionaryStack {
        DictionaryStack {
            system,
            user: Vec::new(),
        }
    }

    /// Appends a user dictionary, failing with `IncompatibleDictionary` if
    /// it disagrees with the system dictionary on version/lsize/rsize/charset.
    pub fn push_user(&mut self, dict: Dictionary) -> Result<(), KotobaError> {
        if !self.system.is_compatible_with(&dict) {
            return Err(KotobaErrorKind::IncompatibleDictionary.with_error(anyhow::anyhow!(
                "user dictionary {} is incompatible with system dictionary {}",
                dict.info().filename,
                self.system.info().filename
            )));
        }
        self.user.push(dict);
        Ok(())
    }

    pub fn system(&self) -> &Dictionary {
        &self.system
    }

    pub fn user(&self) -> &[Dictionary] {
        &self.user
    }

    /// System dictionary first, then user dictionaries in stack order — the
    /// order Tokenizer's known-word lookup consults them in.
    pub fn iter(&self) -> impl Iterator<Item = &Dictionary> {
        std::iter::once(&self.system).chain(self.user.iter())
    }
}

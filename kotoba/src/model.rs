//! Ownership root: loads the dictionary stack, connector, and
//! character property table named by an `OpenOptions`, and holds the
//! swap-mutable pointer every `Tagger` reads through.

use std::path::Path;
use std::sync::{Arc, RwLock};

use kotoba_core::char_property::CharProperty;
use kotoba_core::connector::Connector;
use kotoba_core::dictionary::Dictionary;
use kotoba_core::user_dictionary::DictionaryStack;
use kotoba_tokenizer::{request_type, Mode, Tokenizer};

use crate::config::OpenOptions;
use crate::error::{KotobaError, KotobaErrorKind};

/// Everything a `Tagger` needs for one parse, captured as a single
/// snapshot so a `swap` can be observed atomically.
pub(crate) struct ModelInner {
    pub(crate) tokenizer: Tokenizer,
    pub(crate) connector: Connector,
    pub(crate) request_type: u32,
    pub(crate) theta: f64,
    pub(crate) nbest: u32,
}

/// Owns the Tokenizer/Connector/default request flags, with an atomically
/// swappable inner snapshot.
pub struct Model {
    inner: RwLock<Arc<ModelInner>>,
}

impl Model {
    /// Loads `sys.dic`/`unk.dic`/`char.bin`/`matrix.bin` from `options.dicdir`
    /// and stacks any `options.userdic` entries on top.
    pub fn open(options: &OpenOptions) -> Result<Model, KotobaError> {
        let inner = build_inner(options)?;
        Ok(Model {
            inner: RwLock::new(Arc::new(inner)),
        })
    }

    /// Atomically replaces the current snapshot with one built from `options`.
    /// Readers that captured the old snapshot before this call continue to
    /// use it until their own call returns.
    pub fn swap(&self, options: &OpenOptions) -> Result<(), KotobaError> {
        let inner = build_inner(options)?;
        let mut guard = self.inner.write().expect("model lock poisoned");
        *guard = Arc::new(inner);
        log::info!("model dictionary swapped to {}", options.dicdir.display());
        Ok(())
    }

    pub(crate) fn current(&self) -> Arc<ModelInner> {
        Arc::clone(&self.inner.read().expect("model lock poisoned"))
    }
}

fn build_inner(options: &OpenOptions) -> Result<ModelInner, KotobaError> {
    let system = open_dictionary(&options.sys_dic_path())?;
    let mut stack = DictionaryStack::new(system);
    for path in &options.userdic {
        let user = open_dictionary(path)?;
        stack.push_user(user).map_err(KotobaError::from)?;
    }

    let unk = open_dictionary(&options.unk_dic_path())?;
    let char_property = CharProperty::open(path_str(&options.char_bin_path())?)
        .map_err(KotobaError::from)
        .map_err(|e| e.add_context(format!("loading {}", options.char_bin_path().display())))?;
    let connector = Connector::open(path_str(&options.matrix_bin_path())?)
        .map_err(KotobaError::from)
        .map_err(|e| e.add_context(format!("loading {}", options.matrix_bin_path().display())))?;

    let bos_feature = options.bos_feature.clone();
    let tokenizer = Tokenizer::open(stack, unk, char_property, options.max_grouping_size, bos_feature, Mode::Normal)
        .map_err(KotobaError::from)?;

    let mut flags = request_type::ONE_BEST;
    if options.nbest > 1 {
        flags |= request_type::NBEST;
    }
    if options.partial {
        flags |= request_type::PARTIAL;
    }
    if options.all_morphs {
        flags |= request_type::ALL_MORPHS;
    }
    if options.marginal {
        flags |= request_type::MARGINAL_PROB;
    }
    if options.allocate_sentence {
        flags |= request_type::ALLOCATE_SENTENCE;
    }

    Ok(ModelInner {
        tokenizer,
        connector,
        request_type: flags,
        theta: options.theta,
        nbest: options.nbest,
    })
}

fn open_dictionary(path: &Path) -> Result<Dictionary, KotobaError> {
    Dictionary::open(path_str(path)?)
        .map_err(KotobaError::from)
        .map_err(|e| e.add_context(format!("loading {}", path.display())))
}

fn path_str(path: &Path) -> Result<&str, KotobaError> {
    path.to_str()
        .ok_or_else(|| KotobaErrorKind::Resource.with_error(anyhow::anyhow!("path is not valid UTF-8: {}", path.display())))
}

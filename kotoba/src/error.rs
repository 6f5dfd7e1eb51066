//! The unified error type returned by this crate's public API. Widens
//! `kotoba-core`'s resource-failure kind and `kotoba-tokenizer`'s
//! parse-failure kind with the configuration failures this crate raises
//! itself.

use std::fmt;

use kotoba_core::KotobaErrorKind as CoreErrorKind;
use kotoba_tokenizer::TokenizerErrorKind as TokenizerErrorKindInner;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum KotobaErrorKind {
    /// A file is missing, unreadable, truncated, or fails an mmap.
    Resource,
    /// A dictionary's magic/version check failed.
    IncompatibleVersion,
    /// Two stacked dictionaries disagree on charset/lsize/rsize/version.
    IncompatibleDictionary,
    /// A decode of dictionary bytes (charset, UTF-8 feature strings) failed.
    Decode,
    /// Sentence or node byte span exceeds the addressable range, or an
    /// N-best request's `nbest` is outside `[1, 512]`.
    Input,
    /// `next()` called without `NBEST`, or no sentence set before parse.
    State,
    /// An unknown option, a missing required argument, or a contradictory
    /// flag combination in `OpenOptions`/the rc-file loader.
    Config,
}

impl From<CoreErrorKind> for KotobaErrorKind {
    fn from(kind: CoreErrorKind) -> KotobaErrorKind {
        match kind {
            CoreErrorKind::Resource => KotobaErrorKind::Resource,
            CoreErrorKind::IncompatibleVersion => KotobaErrorKind::IncompatibleVersion,
            CoreErrorKind::IncompatibleDictionary => KotobaErrorKind::IncompatibleDictionary,
            CoreErrorKind::Decode => KotobaErrorKind::Decode,
        }
    }
}

impl From<TokenizerErrorKindInner> for KotobaErrorKind {
    fn from(kind: TokenizerErrorKindInner) -> KotobaErrorKind {
        match kind {
            TokenizerErrorKindInner::Input => KotobaErrorKind::Input,
            TokenizerErrorKindInner::State => KotobaErrorKind::State,
        }
    }
}

impl KotobaErrorKind {
    pub fn with_error<E>(self, source: E) -> KotobaError
    where
        anyhow::Error: From<E>,
    {
        KotobaError {
            kind: self,
            source: From::from(source),
        }
    }
}

#[derive(thiserror::Error, Debug)]
#[error("KotobaError(kind={kind:?}, source={source})")]
pub struct KotobaError {
    pub kind: KotobaErrorKind,
    #[source]
    source: anyhow::Error,
}

impl KotobaError {
    pub fn add_context<C>(self, ctx: C) -> Self
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        KotobaError {
            kind: self.kind,
            source: self.source.context(ctx),
        }
    }

    pub fn kind(&self) -> KotobaErrorKind {
        self.kind
    }
}

impl From<kotoba_core::KotobaError> for KotobaError {
    fn from(err: kotoba_core::KotobaError) -> KotobaError {
        let kind = KotobaErrorKind::from(err.kind());
        KotobaError {
            kind,
            source: anyhow::Error::new(err),
        }
    }
}

impl From<kotoba_tokenizer::TokenizerError> for KotobaError {
    fn from(err: kotoba_tokenizer::TokenizerError) -> KotobaError {
        let kind = KotobaErrorKind::from(err.kind());
        KotobaError {
            kind,
            source: anyhow::Error::new(err),
        }
    }
}

pub type KotobaResult<T> = Result<T, KotobaError>;

use std::fmt;

/// Coarse failure category, independent of the underlying cause.
///
/// Mirrors the taxonomy in the analyzer's error-handling design: resource
/// failures (missing/truncated/incompatible on-disk tables) are the only
/// kind `kotoba-core` raises — parse-time and configuration failures belong
/// to `kotoba-tokenizer` and `kotoba` respectively.
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

pub type KotobaResult<T> = Result<T, KotobaError>;

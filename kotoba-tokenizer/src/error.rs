use std::fmt;

/// Failure kinds raised while building or walking a lattice. Resource
/// failures belong to `kotoba-core`; these are all per-parse/per-call.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TokenizerErrorKind {
    /// Sentence byte length, or a single node's byte span, exceeds the
    /// addressable range (`u16`, max 65535).
    Input,
    /// `next()` called without `NBEST` set, or no sentence set before parse.
    State,
}

impl TokenizerErrorKind {
    pub fn with_error<E>(self, source: E) -> TokenizerError
    where
        anyhow::Error: From<E>,
    {
        TokenizerError {
            kind: self,
            source: From::from(source),
        }
    }
}

#[derive(thiserror::Error, Debug)]
#[error("TokenizerError(kind={kind:?}, source={source})")]
pub struct TokenizerError {
    pub kind: TokenizerErrorKind,
    #[source]
    source: anyhow::Error,
}

impl TokenizerError {
    pub fn add_context<C>(self, ctx: C) -> Self
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        TokenizerError {
            kind: self.kind,
            source: self.source.context(ctx),
        }
    }

    pub fn kind(&self) -> TokenizerErrorKind {
        self.kind
    }
}

pub type TokenizerResult<T> = Result<T, TokenizerError>;

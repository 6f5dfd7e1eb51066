//! Resource configuration, dictionary loading, and the per-caller
//! Tagger/Lattice/Writer surface for the kotoba morphological
//! analyzer runtime.
//!
//! `kotoba-core` owns the immutable on-disk binary formats; `kotoba-tokenizer`
//! turns a dictionary stack into a lattice and runs Viterbi/N-best over it.
//! This crate is the façade a caller actually opens: load a `Model` from a
//! `dicdir`, bind any number of `Tagger`s to it, and format results with the
//! default `surface\tfeature` writer.

pub mod config;
pub mod error;
pub mod model;
pub mod tagger;
pub mod writer;

pub use config::{OpenOptions, NBEST_MAX};
pub use error::{KotobaError, KotobaErrorKind, KotobaResult};
pub use model::Model;
pub use tagger::Tagger;
pub use writer::format_default;

pub use kotoba_tokenizer::{request_type, BoundaryConstraint, Lattice, Mode, Node, NodeStat, Penalty};

//! Lattice construction, Viterbi search, and N-best enumeration for the
//! kotoba morphological analyzer.
//!
//! This crate turns a dictionary stack (`kotoba-core`) plus one sentence
//! into a segmentation: `Tokenizer` generates per-position candidates,
//! `Lattice` holds the per-sentence arena and node/path chains, and
//! `Viterbi` runs the DP, forward–backward, and N-best passes over them.

pub mod arena;
pub mod error;
pub mod lattice;
pub mod mode;
pub mod nbest;
pub mod node;
pub mod path;
pub mod tokenizer;
pub mod viterbi;

pub use error::{TokenizerError, TokenizerErrorKind, TokenizerResult};
pub use lattice::{request_type, BoundaryConstraint, Lattice};
pub use mode::{Mode, Penalty};
pub use node::{Node, NodeStat};
pub use path::Path;
pub use tokenizer::Tokenizer;
pub use viterbi::Viterbi;

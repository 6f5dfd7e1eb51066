//! Per-caller façade over a shared `Model`: one Lattice, one Allocator, one
//! lock.

use std::sync::{Arc, Mutex, MutexGuard};

use kotoba_tokenizer::{request_type, Lattice, Viterbi};

use crate::error::KotobaError;
use crate::model::Model;

/// Binds a `Model` (shared, possibly swapped underneath it) with a
/// per-caller Lattice and Allocator, owned exclusively by this Tagger and
/// serialised by its own lock.
pub struct Tagger {
    model: Arc<Model>,
    lattice: Mutex<Lattice>,
}

impl Tagger {
    /// Creates a Tagger bound to `model`, seeding its Lattice's request
    /// flags and theta from the model's current snapshot.
    pub fn new(model: &Arc<Model>) -> Tagger {
        let snapshot = model.current();
        let mut lattice = Lattice::new();
        lattice.set_request_type(snapshot.request_type);
        lattice.set_theta(snapshot.theta);
        Tagger {
            model: Arc::clone(model),
            lattice: Mutex::new(lattice),
        }
    }

    /// Locks and returns this Tagger's own Lattice, for callers that need
    /// to set constraints, request flags, or the sentence before parsing.
    pub fn lattice(&self) -> MutexGuard<'_, Lattice> {
        self.lattice.lock().expect("tagger lattice lock poisoned")
    }

    /// Runs Viterbi search over `lattice` using a single snapshot of this
    /// Tagger's Model, captured at call entry. `lattice` must
    /// already have `set_sentence` called on it.
    pub fn parse(&self, lattice: &mut Lattice) -> Result<(), KotobaError> {
        let snapshot = self.model.current();
        let viterbi = Viterbi::new(&snapshot.tokenizer, &snapshot.connector);
        viterbi.analyze(lattice).map_err(KotobaError::from)
    }

    /// Parses `input` on this Tagger's own Lattice and returns the default
    /// best-path formatting.
    pub fn parse_to_string(&self, input: &[u8]) -> Result<String, KotobaError> {
        let mut guard = self.lattice();
        guard.set_sentence(input)?;
        self.parse(&mut guard)?;
        Ok(crate::writer::format_default(&guard))
    }

    /// Parses `input` with the `NBEST` flag set and returns up to `n`
    /// successive best-path formattings in non-decreasing cost order,
    /// capped at the Model's configured `nbest` ceiling.
    pub fn parse_nbest_to_strings(&self, input: &[u8], n: usize) -> Result<Vec<String>, KotobaError> {
        let cap = self.model.current().nbest as usize;
        let limit = n.min(cap.max(1));

        let mut guard = self.lattice();
        guard.set_sentence(input)?;
        guard.add_request_type(request_type::NBEST);

        self.parse(&mut guard)?;

        let mut out = Vec::new();
        while out.len() < limit && guard.next()? {
            out.push(crate::writer::format_default(&guard));
        }
        Ok(out)
    }
}

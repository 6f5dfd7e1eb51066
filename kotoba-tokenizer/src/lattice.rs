//! Per-sentence state: sentence buffer, begin/end node chains indexed by
//! byte offset, request flags, boundary/feature constraints, BOS/EOS.

use crate::arena::{Arena, NodeId, PathId, StrRef};
use crate::error::{TokenizerError, TokenizerErrorKind};
use crate::nbest::NBestGenerator;
use crate::node::{Node, NodeStat};

/// Request flag bits, combined with bitwise-or into a `Lattice`'s active set.
pub mod request_type {
    pub const ONE_BEST: u32 = 1;
    pub const NBEST: u32 = 2;
    pub const PARTIAL: u32 = 4;
    pub const MARGINAL_PROB: u32 = 8;
    pub const ALL_MORPHS: u32 = 16;
    pub const ALLOCATE_SENTENCE: u32 = 32;
}

/// A per-position boundary constraint for partial parsing.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum BoundaryConstraint {
    Any,
    TokenBoundary,
    InsideToken,
}

struct FeatureConstraint {
    begin: usize,
    end: usize,
    feature: String,
}

const MAX_SENTENCE_LEN: usize = 65535;

/// The lattice plus its owning arena. One instance is created per `Tagger`
/// and reused across `parse` calls.
pub struct Lattice {
    pub(crate) arena: Arena,
    sentence: Vec<u8>,
    begin_nodes: Vec<Option<NodeId>>,
    end_nodes: Vec<Option<NodeId>>,
    bos: Option<NodeId>,
    eos: Option<NodeId>,
    request_type: u32,
    theta: f64,
    z: f64,
    boundary_constraints: Vec<BoundaryConstraint>,
    feature_constraints: Vec<FeatureConstraint>,
    what: Option<String>,
    nbest: Option<NBestGenerator>,
}

impl Lattice {
    pub fn new() -> Lattice {
        Lattice {
            arena: Arena::new(),
            sentence: Vec::new(),
            begin_nodes: Vec::new(),
            end_nodes: Vec::new(),
            bos: None,
            eos: None,
            request_type: request_type::ONE_BEST,
            theta: 0.75,
            z: 0.0,
            boundary_constraints: Vec::new(),
            feature_constraints: Vec::new(),
            what: None,
            nbest: None,
        }
    }

    /// Resets the arena and node chains. Idempotent.
    /// Does not clear constraints or request flags — those are caller
    /// configuration, not parse state.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.begin_nodes.clear();
        self.end_nodes.clear();
        self.bos = None;
        self.eos = None;
        self.what = None;
        self.nbest = None;
    }

    /// Copies `sentence` into the lattice's own buffer and prepares empty
    /// begin/end node chains. The `allocate_sentence` flag does not change
    /// the copy itself, since every caller-visible accessor already borrows
    /// from this buffer rather than the original input, but it is still
    /// tracked as a queryable request flag for configuration fidelity.
    pub fn set_sentence(&mut self, sentence: &[u8]) -> Result<(), TokenizerError> {
        if sentence.len() > MAX_SENTENCE_LEN {
            return Err(TokenizerErrorKind::Input.with_error(anyhow::anyhow!(
                "sentence length {} exceeds the {} byte limit",
                sentence.len(),
                MAX_SENTENCE_LEN
            )));
        }
        self.clear();
        self.sentence.clear();
        self.sentence.extend_from_slice(sentence);
        let n = self.sentence.len();
        self.begin_nodes = vec![None; n + 1];
        self.end_nodes = vec![None; n + 1];
        self.boundary_constraints = vec![BoundaryConstraint::Any; n + 1];
        self.feature_constraints.clear();
        Ok(())
    }

    pub fn sentence(&self) -> &[u8] {
        &self.sentence
    }

    pub fn size(&self) -> usize {
        self.sentence.len()
    }

    pub fn surface(&self, node: &Node) -> &[u8] {
        &self.sentence[node.begin..node.end()]
    }

    pub fn feature(&self, node: &Node) -> &str {
        self.arena.str(node.feature)
    }

    pub fn what(&self) -> Option<&str> {
        self.what.as_deref()
    }

    pub fn set_what(&mut self, message: impl Into<String>) {
        self.what = Some(message.into());
    }

    // -- request flags --------------------------------------------------

    pub fn set_request_type(&mut self, flags: u32) {
        self.request_type = flags;
    }

    pub fn add_request_type(&mut self, flags: u32) {
        self.request_type |= flags;
    }

    pub fn remove_request_type(&mut self, flags: u32) {
        self.request_type &= !flags;
    }

    pub fn has_request_type(&self, flags: u32) -> bool {
        self.request_type & flags == flags
    }

    pub fn request_type(&self) -> u32 {
        self.request_type
    }

    // -- theta / Z --------------------------------------------------------

    pub fn set_theta(&mut self, theta: f64) {
        self.theta = theta;
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }

    pub fn set_z(&mut self, z: f64) {
        self.z = z;
    }

    pub fn z(&self) -> f64 {
        self.z
    }

    // -- constraints ------------------------------------

    pub fn set_boundary_constraint(&mut self, pos: usize, kind: BoundaryConstraint) {
        if pos < self.boundary_constraints.len() {
            self.boundary_constraints[pos] = kind;
        }
    }

    pub fn boundary_constraint(&self, pos: usize) -> BoundaryConstraint {
        self.boundary_constraints
            .get(pos)
            .copied()
            .unwrap_or(BoundaryConstraint::Any)
    }

    pub fn set_feature_constraint(&mut self, begin: usize, end: usize, feature: &str) {
        self.feature_constraints.push(FeatureConstraint {
            begin,
            end,
            feature: feature.to_owned(),
        });
    }

    pub fn has_constraint(&self, pos: usize) -> bool {
        self.boundary_constraint(pos) != BoundaryConstraint::Any
            || self
                .feature_constraints
                .iter()
                .any(|c| c.begin == pos || c.end == pos)
    }

    /// The feature-constraint string anchored at `begin`, if any.
    pub fn feature_constraint_at(&self, begin: usize) -> Option<&str> {
        self.feature_constraints
            .iter()
            .find(|c| c.begin == begin)
            .map(|c| c.feature.as_str())
    }

    /// Upper bound for an unknown-word span starting at `from`, used by the
    /// partial-mode catch-all fallback. If a feature constraint is anchored
    /// at `from`, its end is the mandated span per its `[b, e]` contract.
    /// Otherwise the span extends one position past `from` and then, one
    /// position at a time, past any further run of `InsideToken`-marked
    /// positions, mirroring the original tokenizer's partial-fallback walk
    /// (`while (boundary_constraint(begin3) == INSIDE_TOKEN) ++begin3`) —
    /// the result itself is never `InsideToken`.
    pub fn next_constraint_end(&self, from: usize) -> usize {
        if let Some(end) = self.feature_constraints.iter().find(|c| c.begin == from).map(|c| c.end) {
            return end;
        }

        let mut pos = (from + 1).min(self.size());
        while pos < self.size() && self.boundary_constraint(pos) == BoundaryConstraint::InsideToken {
            pos += 1;
        }
        pos
    }

    // -- node chain access -------------------------------------------------

    pub fn bos_node(&self) -> Option<&Node> {
        self.bos.map(|id| self.arena.node(id))
    }

    pub fn eos_node(&self) -> Option<&Node> {
        self.eos.map(|id| self.arena.node(id))
    }

    pub fn bos_id(&self) -> Option<NodeId> {
        self.bos
    }

    pub fn eos_id(&self) -> Option<NodeId> {
        self.eos
    }

    pub fn node(&self, id: NodeId) -> &Node {
        self.arena.node(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.arena.node_mut(id)
    }

    pub fn path(&self, id: PathId) -> &crate::path::Path {
        self.arena.path(id)
    }

    pub(crate) fn path_mut(&mut self, id: PathId) -> &mut crate::path::Path {
        self.arena.path_mut(id)
    }

    /// Iterates the `bnext` chain of nodes starting at byte offset `p`.
    pub fn begin_nodes(&self, p: usize) -> BNextIter<'_> {
        BNextIter {
            lattice: self,
            cur: self.begin_nodes.get(p).copied().flatten(),
        }
    }

    /// Iterates the `enext` chain of nodes ending at byte offset `p`.
    pub fn end_nodes(&self, p: usize) -> ENextIter<'_> {
        ENextIter {
            lattice: self,
            cur: self.end_nodes.get(p).copied().flatten(),
        }
    }

    /// `NodeId`s of the `bnext` chain at `p`, for callers (Viterbi) that
    /// need to mutate nodes while walking the chain.
    pub(crate) fn begin_node_ids(&self, p: usize) -> Vec<NodeId> {
        let mut ids = Vec::new();
        let mut cur = self.begin_nodes.get(p).copied().flatten();
        while let Some(id) = cur {
            ids.push(id);
            cur = self.arena.node(id).bnext;
        }
        ids
    }

    /// `NodeId`s of the `enext` chain at `p`.
    pub(crate) fn end_node_ids(&self, p: usize) -> Vec<NodeId> {
        let mut ids = Vec::new();
        let mut cur = self.end_nodes.get(p).copied().flatten();
        while let Some(id) = cur {
            ids.push(id);
            cur = self.arena.node(id).enext;
        }
        ids
    }

    /// Installs the BOS node at `end_nodes[0]`.
    pub(crate) fn set_bos(&mut self, feature: StrRef) {
        let mut node = Node::blank(NodeStat::Bos);
        node.begin = 0;
        node.length = 0;
        node.feature = feature;
        let id = self.arena.alloc_node(node);
        self.bos = Some(id);
        self.end_nodes[0] = Some(id);
    }

    /// Installs the EOS node at `begin_nodes[N]`.
    pub(crate) fn set_eos(&mut self, feature: StrRef) {
        let n = self.size();
        let mut node = Node::blank(NodeStat::Eos);
        node.begin = n;
        node.length = 0;
        node.feature = feature;
        let id = self.arena.alloc_node(node);
        self.eos = Some(id);
        self.begin_nodes[n] = Some(id);
    }

    /// Pushes `node` into the arena and links it into both the
    /// `begin_nodes[begin]` (`bnext`) and `end_nodes[begin+length]`
    /// (`enext`) chains.
    pub(crate) fn insert_node(&mut self, mut node: Node) -> NodeId {
        let begin = node.begin;
        let end = node.end();
        node.bnext = self.begin_nodes[begin];
        let id = self.arena.alloc_node(node);
        self.begin_nodes[begin] = Some(id);
        let prev_enext = self.end_nodes[end];
        self.arena.node_mut(id).enext = prev_enext;
        self.end_nodes[end] = Some(id);
        id
    }

    pub(crate) fn push_path(&mut self, path: crate::path::Path) -> PathId {
        self.arena.alloc_path(path)
    }

    pub(crate) fn strdup(&mut self, s: &str) -> StrRef {
        self.arena.strdup(s)
    }

    /// Starts or advances the N-best cursor. Returns `Ok(true)` if a result
    /// was produced (the best chain has been rewritten along `next`
    /// pointers from BOS), `Ok(false)` once the heap is exhausted.
    pub fn next(&mut self) -> Result<bool, TokenizerError> {
        if !self.has_request_type(request_type::NBEST) {
            return Err(TokenizerErrorKind::State
                .with_error(anyhow::anyhow!("next() called without the NBEST request flag set")));
        }
        let eos = self.eos.ok_or_else(|| {
            TokenizerErrorKind::State.with_error(anyhow::anyhow!("no sentence has been parsed"))
        })?;
        if self.nbest.is_none() {
            self.nbest = Some(NBestGenerator::new(eos));
        }
        let spine = {
            let nbest = self.nbest.as_mut().unwrap();
            nbest.next(&self.arena)
        };
        match spine {
            Some(spine) => {
                self.rewrite_best_chain(&spine);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Rewrites `next`/`is_best` along the given BOS→EOS node sequence.
    pub(crate) fn rewrite_best_chain(&mut self, spine: &[NodeId]) {
        for i in 0..self.arena.node_count() {
            let w = self.arena.node_mut(NodeId(i as u32));
            w.is_best = false;
            w.next = None;
        }
        for pair in spine.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            self.arena.node_mut(a).next = Some(b);
            self.arena.node_mut(a).is_best = true;
        }
        if let Some(&last) = spine.last() {
            self.arena.node_mut(last).is_best = true;
        }
    }
}

impl Default for Lattice {
    fn default() -> Lattice {
        Lattice::new()
    }
}

pub struct BNextIter<'a> {
    lattice: &'a Lattice,
    cur: Option<NodeId>,
}

impl<'a> Iterator for BNextIter<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<&'a Node> {
        let id = self.cur?;
        let node = self.lattice.arena.node(id);
        self.cur = node.bnext;
        Some(node)
    }
}

pub struct ENextIter<'a> {
    lattice: &'a Lattice,
    cur: Option<NodeId>,
}

impl<'a> Iterator for ENextIter<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<&'a Node> {
        let id = self.cur?;
        let node = self.lattice.arena.node(id);
        self.cur = node.enext;
        Some(node)
    }
}

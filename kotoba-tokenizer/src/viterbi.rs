//! Lattice construction plus the min-cost DP, forward–backward marginal
//! pass, and partial-parsing filter that drive every analysis mode.
//!
//! `Viterbi` itself is stateless: it borrows a `Tokenizer` and a
//! `Connector` for the duration of one `analyze` call. All mutable state
//! lives in the `Lattice` it is given.

use kotoba_core::connector::Connector;

use crate::arena::NodeId;
use crate::error::TokenizerError;
use crate::lattice::{request_type, BoundaryConstraint, Lattice};
use crate::node::NodeStat;
use crate::path::Path;
use crate::tokenizer::Tokenizer;

/// `MINUS_LOG_EPSILON` bounds the cheap branch of `logsumexp`: once the two
/// operands differ by more than this many nats, the smaller one's
/// contribution underflows to nothing and is skipped.
const MINUS_LOG_EPSILON: f64 = 50.0;

fn logsumexp(x: f64, y: f64, init: bool) -> f64 {
    if init {
        return y;
    }
    let vmin = x.min(y);
    let vmax = x.max(y);
    if vmax > vmin + MINUS_LOG_EPSILON {
        vmax
    } else {
        vmax + ((vmin - vmax).exp() + 1.0).ln()
    }
}

pub struct Viterbi<'a> {
    tokenizer: &'a Tokenizer,
    connector: &'a Connector,
}

impl<'a> Viterbi<'a> {
    pub fn new(tokenizer: &'a Tokenizer, connector: &'a Connector) -> Viterbi<'a> {
        Viterbi {
            tokenizer,
            connector,
        }
    }

    /// Builds the lattice for `lattice.sentence()` and runs the DP
    /// recurrence, dispatching on the lattice's request flags.
    pub fn analyze(&self, lattice: &mut Lattice) -> Result<(), TokenizerError> {
        let n = lattice.size();
        let partial = lattice.has_request_type(request_type::PARTIAL);
        let all_path = lattice.has_request_type(request_type::NBEST)
            || lattice.has_request_type(request_type::MARGINAL_PROB);
        let all_morphs = lattice.has_request_type(request_type::ALL_MORPHS);

        let bos_feature = lattice.strdup(self.tokenizer.bos_feature());
        lattice.set_bos(bos_feature);
        let eos_feature = lattice.strdup(self.tokenizer.bos_feature());
        lattice.set_eos(eos_feature);

        let sentence = lattice.sentence().to_vec();

        for p in 0..=n {
            if lattice.end_node_ids(p).is_empty() {
                continue;
            }
            if p < n {
                self.tokenizer.lookup(p, &sentence, lattice, partial)?;
            }

            for r_id in lattice.begin_node_ids(p) {
                if partial && !is_valid_node(lattice, r_id) {
                    continue;
                }
                self.connect(lattice, r_id, all_path);
            }
        }

        if lattice.has_request_type(request_type::MARGINAL_PROB) {
            self.forward_backward(lattice);
        }

        self.mark_best_chain(lattice, all_morphs);

        Ok(())
    }

    /// Connects `r` to every node in `end_nodes[r.begin]`, choosing the
    /// predecessor that minimises `l.cost + transitionCost(l, r)`.
    /// When `all_path`, every incoming edge is also materialised as a
    /// `Path` threaded into both `r.lpath` and the predecessor's `rpath`.
    fn connect(&self, lattice: &mut Lattice, r_id: NodeId, all_path: bool) {
        let begin = lattice.node(r_id).begin;
        let r_lc_attr = lattice.node(r_id).lc_attr;
        let r_wcost = lattice.node(r_id).wcost;

        let mut best_cost = i64::MAX;
        let mut best_prev = None;

        for l_id in lattice.end_node_ids(begin) {
            let l_rc_attr = lattice.node(l_id).rc_attr;
            let l_cost = lattice.node(l_id).cost;
            let transition = self.connector.transition_cost(l_rc_attr, r_lc_attr);
            let c = l_cost + transition as i64;
            if c < best_cost {
                best_cost = c;
                best_prev = Some(l_id);
            }
            if all_path {
                let path = Path {
                    lnode: l_id,
                    rnode: r_id,
                    lnext: lattice.node(r_id).lpath,
                    rnext: lattice.node(l_id).rpath,
                    cost: transition,
                    prob: 0.0,
                };
                let path_id = lattice.push_path(path);
                lattice.node_mut(r_id).lpath = Some(path_id);
                lattice.node_mut(l_id).rpath = Some(path_id);
            }
        }

        let node = lattice.node_mut(r_id);
        node.prev = best_prev;
        node.cost = if best_cost == i64::MAX {
            r_wcost as i64
        } else {
            best_cost + r_wcost as i64
        };
    }

    /// Forward–backward in log space: populates `alpha`/`beta` on
    /// every node and `prob` on nodes and paths.
    fn forward_backward(&self, lattice: &mut Lattice) {
        let theta = lattice.theta();
        let n = lattice.size();

        let bos = lattice.bos_id().expect("bos installed by analyze");
        let eos = lattice.eos_id().expect("eos installed by analyze");

        lattice.node_mut(bos).alpha = 0.0;
        for p in 0..=n {
            for r_id in lattice.begin_node_ids(p) {
                if r_id == bos {
                    continue;
                }
                let mut alpha = 0.0;
                let mut first = true;
                let mut path_id = lattice.node(r_id).lpath;
                while let Some(pid) = path_id {
                    let path = *lattice.path(pid);
                    let l_alpha = lattice.node(path.lnode).alpha;
                    let r_wcost = lattice.node(r_id).wcost as f64;
                    let edge_cost = path.cost as f64 + r_wcost;
                    alpha = logsumexp(alpha, l_alpha - edge_cost / theta, first);
                    first = false;
                    path_id = path.lnext;
                }
                lattice.node_mut(r_id).alpha = alpha;
            }
        }

        lattice.node_mut(eos).beta = 0.0;
        for p in (0..=n).rev() {
            for l_id in lattice.end_node_ids(p) {
                if l_id == eos {
                    continue;
                }
                let mut beta = 0.0;
                let mut first = true;
                let mut path_id = lattice.node(l_id).rpath;
                while let Some(pid) = path_id {
                    let path = *lattice.path(pid);
                    let r_beta = lattice.node(path.rnode).beta;
                    let r_wcost = lattice.node(path.rnode).wcost as f64;
                    let edge_cost = path.cost as f64 + r_wcost;
                    beta = logsumexp(beta, r_beta - edge_cost / theta, first);
                    first = false;
                    path_id = path.rnext;
                }
                lattice.node_mut(l_id).beta = beta;
            }
        }

        let z = lattice.node(eos).alpha;
        lattice.set_z(z);

        for p in 0..=n {
            for id in lattice.begin_node_ids(p) {
                let node = lattice.node(id);
                let prob = ((node.alpha + node.beta - z).exp() / theta) as f32;
                lattice.node_mut(id).prob = prob;
            }
        }
        for p in 0..=n {
            for l_id in lattice.end_node_ids(p) {
                let mut path_id = lattice.node(l_id).rpath;
                while let Some(pid) = path_id {
                    let path = *lattice.path(pid);
                    let l_alpha = lattice.node(path.lnode).alpha;
                    let r_beta = lattice.node(path.rnode).beta;
                    let r_wcost = lattice.node(path.rnode).wcost as f64;
                    let edge_cost = path.cost as f64 + r_wcost;
                    let prob = ((l_alpha - edge_cost / theta + r_beta - z).exp() / theta) as f32;
                    lattice.path_mut(pid).prob = prob;
                    path_id = path.rnext;
                }
            }
        }
    }

    /// Walks `prev` from EOS to BOS, sets `is_best`/`next` along that
    /// chain, and — if `ALL_MORPHS` is requested — threads `next` through
    /// every node in begin-position order regardless of `is_best`.
    fn mark_best_chain(&self, lattice: &mut Lattice, all_morphs: bool) {
        let eos = match lattice.eos_id() {
            Some(id) => id,
            None => return,
        };
        let mut spine = Vec::new();
        let mut cur = Some(eos);
        while let Some(id) = cur {
            spine.push(id);
            cur = lattice.node(id).prev;
        }
        spine.reverse();
        lattice.rewrite_best_chain(&spine);

        if all_morphs {
            let n = lattice.size();
            let mut all_ids = Vec::new();
            for p in 0..=n {
                all_ids.extend(lattice.begin_node_ids(p));
            }
            for pair in all_ids.windows(2) {
                lattice.node_mut(pair[0]).next = Some(pair[1]);
            }
        }
    }
}

///: reject a node ending `INSIDE_TOKEN`.
fn is_valid_node(lattice: &Lattice, id: NodeId) -> bool {
    let node = lattice.node(id);
    if node.stat == NodeStat::Bos || node.stat == NodeStat::Eos {
        return true;
    }
    lattice.boundary_constraint(node.end()) != BoundaryConstraint::InsideToken
}

//! A* enumeration of successive best paths from EOS back-pointers.
//!
//! Seeded at EOS, each heap entry tracks a frontier node walked backward
//! toward BOS plus the accumulated cost `g(x)` of the suffix discovered so
//! far. The heuristic `h(x)` is the frontier's own forward Viterbi cost —
//! exact, not merely admissible, since it was already computed by the
//! 1-best pass — which makes this A* search produce results in exactly
//! non-decreasing total-cost order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::arena::{Arena, NodeId};
use crate::node::NodeStat;

struct Entry {
    frontier: NodeId,
    gx: i64,
    fx: i64,
    /// Discovery order: `[EOS, ..., frontier]`.
    spine: Vec<NodeId>,
    seq: u64,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.fx == other.fx && self.seq == other.seq
    }
}
impl Eq for Entry {}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so `BinaryHeap` (a max-heap) behaves as a min-heap on
        // `fx`, with lower `seq` (earlier insertion, i.e. FIFO) breaking ties.
        other
            .fx
            .cmp(&self.fx)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}
impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub struct NBestGenerator {
    eos: NodeId,
    heap: BinaryHeap<Entry>,
    next_seq: u64,
    seeded: bool,
}

impl NBestGenerator {
    pub fn new(eos: NodeId) -> NBestGenerator {
        NBestGenerator {
            eos,
            heap: BinaryHeap::new(),
            next_seq: 0,
            seeded: false,
        }
    }

    /// Lazily seeds the heap with EOS on first use, since the generator is
    /// constructed before the arena reference is available.
    fn ensure_seeded(&mut self, arena: &Arena) {
        if !self.seeded {
            let eos_node = arena.node(self.eos);
            self.heap.push(Entry {
                frontier: self.eos,
                gx: 0,
                fx: eos_node.cost,
                spine: vec![self.eos],
                seq: self.next_seq,
            });
            self.next_seq += 1;
            self.seeded = true;
        }
    }

    /// Pops and expands heap entries until BOS is reached, returning the
    /// `[BOS, ..., EOS]` node sequence, or `None` once exhausted.
    pub fn next(&mut self, arena: &Arena) -> Option<Vec<NodeId>> {
        self.ensure_seeded(arena);
        while let Some(top) = self.heap.pop() {
            let node = arena.node(top.frontier);
            if node.stat == NodeStat::Bos {
                let mut spine = top.spine;
                spine.reverse();
                return Some(spine);
            }
            let mut path_id = node.lpath;
            while let Some(pid) = path_id {
                let path = arena.path(pid);
                let predecessor = arena.node(path.lnode);
                // `path.cost` is the pure transition cost; the edge's
                // full cost also carries the *already-popped* frontier's own
                // word cost, not the predecessor's (its wcost is folded into
                // `predecessor.cost` below and must not be counted twice).
                let gx = top.gx + path.cost as i64 + node.wcost as i64;
                let fx = gx + predecessor.cost;
                let mut spine = top.spine.clone();
                spine.push(path.lnode);
                self.heap.push(Entry {
                    frontier: path.lnode,
                    gx,
                    fx,
                    spine,
                    seq: self.next_seq,
                });
                self.next_seq += 1;
                path_id = path.lnext;
            }
        }
        None
    }
}

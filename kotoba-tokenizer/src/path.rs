//! Directed edge between two nodes. `cost` is the transition cost from
//! `lnode.rc_attr` to `rnode.lc_attr`, i.e. it excludes `rnode.wcost`.

use crate::arena::{NodeId, PathId};

#[derive(Debug, Clone, Copy)]
pub struct Path {
    pub lnode: NodeId,
    pub rnode: NodeId,
    /// Next path in `rnode.lpath`'s chain of incoming edges.
    pub lnext: Option<PathId>,
    /// Next path in `lnode.rpath`'s chain of outgoing edges.
    pub rnext: Option<PathId>,
    pub cost: i32,
    pub prob: f32,
}

//! Per-sentence morpheme candidate.

use crate::arena::{NodeId, PathId, StrRef};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum NodeStat {
    Nor,
    Unk,
    Bos,
    Eos,
    /// Marks the end of an N-best enumeration; never part of a real path.
    Eon,
}

/// A candidate morpheme. Surface text is never copied into the node: it is
/// recovered as `lattice.sentence()[begin .. begin + length as usize]`, so a
/// `Node` outlives neither its `Arena` nor the sentence buffer it was built
/// against.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: u32,
    pub begin: usize,
    pub length: u16,
    pub rlength: u16,
    pub lc_attr: u16,
    pub rc_attr: u16,
    pub posid: u16,
    pub char_type: u8,
    pub stat: NodeStat,
    pub wcost: i16,
    pub cost: i64,
    pub is_best: bool,
    pub alpha: f64,
    pub beta: f64,
    pub prob: f32,
    pub feature: StrRef,

    pub prev: Option<NodeId>,
    pub next: Option<NodeId>,
    pub enext: Option<NodeId>,
    pub bnext: Option<NodeId>,
    pub lpath: Option<PathId>,
    pub rpath: Option<PathId>,
}

impl Node {
    /// A zeroed node of the given `stat`, ready for its fields to be filled
    /// in by the caller (Tokenizer for NOR/UNK, Lattice for BOS/EOS).
    pub fn blank(stat: NodeStat) -> Node {
        Node {
            id: 0,
            begin: 0,
            length: 0,
            rlength: 0,
            lc_attr: 0,
            rc_attr: 0,
            posid: 0,
            char_type: 0,
            stat,
            wcost: 0,
            cost: 0,
            is_best: false,
            alpha: 0.0,
            beta: 0.0,
            prob: 0.0,
            feature: StrRef::EMPTY,
            prev: None,
            next: None,
            enext: None,
            bnext: None,
            lpath: None,
            rpath: None,
        }
    }

    pub fn end(&self) -> usize {
        self.begin + self.length as usize
    }
}

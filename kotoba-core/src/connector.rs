//! Left×right connection-cost matrix.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{KotobaError, KotobaErrorKind};
use crate::mapped_table::MappedTable;

pub struct Connector {
    table: MappedTable,
    lsize: u16,
    rsize: u16,
}

impl Connector {
    pub fn open(path: &str) -> Result<Connector, KotobaError> {
        let table = MappedTable::open(path)?;
        let bytes = table.as_slice();
        if bytes.len() < 4 {
            return Err(KotobaErrorKind::Resource
                .with_error(anyhow::anyhow!("matrix file too short: {path}")));
        }
        let lsize = LittleEndian::read_u16(&bytes[0..2]);
        let rsize = LittleEndian::read_u16(&bytes[2..4]);
        let expected = 4 + 2 * lsize as usize * rsize as usize;
        if bytes.len() != expected {
            return Err(KotobaErrorKind::Resource.with_error(anyhow::anyhow!(
                "invalid matrix file size: {path} (expected {expected}, got {})",
                bytes.len()
            )));
        }
        Ok(Connector { table, lsize, rsize })
    }

    pub fn left_size(&self) -> u16 {
        self.lsize
    }

    pub fn right_size(&self) -> u16 {
        self.rsize
    }

    /// `transitionCost(rcAttr, lcAttr) = matrix[rcAttr + lsize * lcAttr]`.
    pub fn transition_cost(&self, rc_attr: u16, lc_attr: u16) -> i32 {
        let idx = rc_attr as usize + self.lsize as usize * lc_attr as usize;
        let off = 4 + 2 * idx;
        LittleEndian::read_i16(&self.table.as_slice()[off..off + 2]) as i32
    }

    /// `cost(lnode, rnode) = transitionCost(lnode.rcAttr, rnode.lcAttr) + rnode.wcost`.
    pub fn cost(&self, lnode_rc_attr: u16, rnode_lc_attr: u16, rnode_wcost: i16) -> i32 {
        self.transition_cost(lnode_rc_attr, rnode_lc_attr) + rnode_wcost as i32
    }
}

//! Default output format. Custom `node-format`/`bos-format`/
//! `eos-format`/`unk-format`/`eon-format` templates are an out-of-core CLI
//! concern and are not implemented here.

use kotoba_tokenizer::{Lattice, NodeStat};

/// Formats `lattice`'s current best path as one `surface '\t' feature '\n'`
/// line per non-BOS/non-EOS node, terminated by the literal line `EOS\n`.
pub fn format_default(lattice: &Lattice) -> String {
    let mut out = String::new();
    let mut cur = lattice.bos_node().and_then(|bos| bos.next);
    while let Some(id) = cur {
        let node = lattice.node(id);
        if node.stat == NodeStat::Eos {
            break;
        }
        out.push_str(&String::from_utf8_lossy(lattice.surface(node)));
        out.push('\t');
        out.push_str(lattice.feature(node));
        out.push('\n');
        cur = node.next;
    }
    out.push_str("EOS\n");
    out
}

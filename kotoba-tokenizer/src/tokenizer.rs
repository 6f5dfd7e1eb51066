//! Per-position candidate generation: known words from the
//! dictionary stack, unknown words from `CharProperty` plus the unknown
//! dictionary.

use kotoba_core::char_property::{CharInfo, CharProperty, Charset};
use kotoba_core::dictionary::Dictionary;
use kotoba_core::user_dictionary::DictionaryStack;

use crate::error::{TokenizerError, TokenizerErrorKind};
use crate::lattice::{BoundaryConstraint, Lattice};
use crate::mode::Mode;
use crate::node::{Node, NodeStat};

const MAX_NODE_SPAN: usize = 65535;

pub struct Tokenizer {
    dictionaries: DictionaryStack,
    unk_dictionary: Dictionary,
    char_property: CharProperty,
    /// Indexed by category id (same order as `char_property.category_names()`).
    unk_tokens: Vec<Option<(u32, u32)>>,
    max_grouping_size: usize,
    bos_feature: String,
    mode: Mode,
    space_info: CharInfo,
}

impl Tokenizer {
    pub fn open(
        dictionaries: DictionaryStack,
        unk_dictionary: Dictionary,
        char_property: CharProperty,
        max_grouping_size: usize,
        bos_feature: String,
        mode: Mode,
    ) -> Result<Tokenizer, TokenizerError> {
        let unk_tokens = char_property
            .category_names()
            .iter()
            .map(|name| unk_dictionary.exact_match(name.as_bytes()))
            .collect();

        // CharInfo is keyed purely by code point, so decoding the literal
        // byte 0x20 as ASCII always yields the SPACE entry, independent of
        // the dictionaries' declared charset.
        let (space_info, _) = char_property.char_info(&[0x20], 0, Charset::Ascii);

        Ok(Tokenizer {
            dictionaries,
            unk_dictionary,
            char_property,
            unk_tokens,
            max_grouping_size,
            bos_feature,
            mode,
            space_info,
        })
    }

    pub fn bos_feature(&self) -> &str {
        &self.bos_feature
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    fn charset(&self) -> Charset {
        self.dictionaries.system().info().charset
    }

    /// Populates `lattice.begin_nodes(begin)` with every known- and
    /// unknown-word candidate starting at `begin`.
    pub fn lookup(&self, begin: usize, sentence: &[u8], lattice: &mut Lattice, partial: bool) -> Result<(), TokenizerError> {
        let charset = self.charset();
        let n = sentence.len();

        // 1. Clamp so no candidate can exceed the addressable node span.
        let mut end = n.min(begin + MAX_NODE_SPAN);

        // 2. In partial mode, further clamp to the next TOKEN_BOUNDARY.
        if partial {
            let mut p = begin + 1;
            while p < end {
                if lattice.boundary_constraint(p) == BoundaryConstraint::TokenBoundary {
                    end = p;
                    break;
                }
                p += 1;
            }
        }

        // 3. Skip a leading run of SPACE-category characters.
        let (begin2, _) = self
            .char_property
            .seek_to_other_type(sentence, begin, end, charset, self.space_info);
        let rlength_prefix = begin2 - begin;

        if begin2 >= end {
            return Ok(());
        }

        let (cinfo, mblen) = self.char_property.char_info(sentence, begin2, charset);

        // 4. Known-word search across the dictionary stack, in stack order.
        let mut found = false;
        for dict in self.dictionaries.iter() {
            for (length, token) in dict.common_prefix_search(sentence, begin2, end) {
                let feature = dict.feature(&token);
                let mut node = Node::blank(NodeStat::Nor);
                node.begin = begin2;
                node.length = length as u16;
                node.rlength = (rlength_prefix + length) as u16;
                node.lc_attr = token.lc_attr;
                node.rc_attr = token.rc_attr;
                node.posid = token.posid;
                node.wcost = self.apply_penalty(token.word_cost, sentence, charset, begin2, begin2 + length, cinfo);
                node.char_type = cinfo.default_type();
                node.feature = lattice.strdup(feature);
                if partial && !Self::passes_partial_filter(lattice, &node) {
                    continue;
                }
                lattice.insert_node(node);
                found = true;
            }
        }

        // 5. Known words found and this character doesn't force unknown-word
        // generation: done.
        if found && !cinfo.invoke() {
            return Ok(());
        }

        // 6. Unknown-word generation.
        let begin3 = begin2 + mblen;
        let mut group_begin3 = None;
        let mut emitted_any = false;

        if cinfo.group() {
            let (run_end, _) = self.char_property.seek_run(
                sentence,
                begin3,
                end,
                charset,
                cinfo,
                self.max_grouping_size.saturating_sub(1),
            );
            group_begin3 = Some(run_end);
            if self.emit_unknown(sentence, charset, begin2, run_end, cinfo, rlength_prefix, lattice, partial)? {
                emitted_any = true;
            }
        }

        for len in 1..=cinfo.length() {
            let (span_end, clen) =
                self.char_property.seek_run(sentence, begin2, end, charset, cinfo, len as usize);
            if clen == 0 {
                break;
            }
            if Some(span_end) != group_begin3 {
                // The grouped run and a length-indexed run can coincide;
                // skip the duplicate rather than emit it twice.
                if self.emit_unknown(sentence, charset, begin2, span_end, cinfo, rlength_prefix, lattice, partial)? {
                    emitted_any = true;
                }
            }
            if clen < len as usize {
                // The same-category run already ended before reaching `len`
                // characters; further lengths would only re-derive the same
                // span, so stop extending.
                break;
            }
        }

        if !emitted_any {
            // Guaranteed fallback: a single one-character DEFAULT-category
            // unknown word, covering categories with group=0 and length=0.
            if self.emit_unknown(sentence, charset, begin2, begin3.min(end), cinfo, rlength_prefix, lattice, partial)? {
                emitted_any = true;
            }
        }

        // 7. Partial mode with nothing at all produced: emit a single UNK
        // spanning to the next non-INSIDE_TOKEN boundary, using the feature
        // constraint at `begin` if one is set.
        if partial && !found && !emitted_any {
            let span_end = lattice.next_constraint_end(begin2).max(begin2 + 1).min(end);
            let feature = lattice.feature_constraint_at(begin2).map(str::to_owned);
            let mut node = Node::blank(NodeStat::Unk);
            node.begin = begin2;
            node.length = (span_end - begin2) as u16;
            node.rlength = (rlength_prefix + span_end - begin2) as u16;
            node.char_type = cinfo.default_type();
            node.feature = lattice.strdup(feature.as_deref().unwrap_or(""));
            lattice.insert_node(node);
        }

        Ok(())
    }

    /// `begin`/`end` are byte offsets; the char count the penalty keys on is
    /// computed lazily (only `Decompose` mode ever needs it, and a
    /// multi-byte character must not be counted as several penalty units).
    fn apply_penalty(
        &self,
        wcost: i16,
        sentence: &[u8],
        charset: Charset,
        begin: usize,
        end: usize,
        cinfo: CharInfo,
    ) -> i16 {
        match self.mode {
            Mode::Normal => wcost,
            Mode::Decompose(penalty) => {
                let char_len = self.char_count(sentence, begin, end, charset);
                // KANJI is, by convention in the property table, whichever
                // category is not DEFAULT/SPACE and has the smallest grouping
                // bound; lacking that distinction here, treat any non-default
                // category as subject to the "kanji" bucket and DEFAULT/SPACE
                // as "other". The penalty only ever lengthens a candidate's
                // cost, so this approximation is conservative either way.
                let is_kanji = cinfo.default_type() != 0;
                let extra = penalty.cost_for(char_len, is_kanji);
                wcost.saturating_add(extra.clamp(i16::MIN as i32, i16::MAX as i32) as i16)
            }
        }
    }

    /// Number of characters spanned by `sentence[begin..end]` under `charset`.
    fn char_count(&self, sentence: &[u8], begin: usize, end: usize, charset: Charset) -> u16 {
        let mut p = begin;
        let mut count: u16 = 0;
        while p < end {
            let (_, mblen) = self.char_property.char_info(sentence, p, charset);
            p += mblen.max(1);
            count = count.saturating_add(1);
        }
        count
    }

    fn emit_unknown(
        &self,
        sentence: &[u8],
        charset: Charset,
        begin2: usize,
        span_end: usize,
        cinfo: CharInfo,
        rlength_prefix: usize,
        lattice: &mut Lattice,
        partial: bool,
    ) -> Result<bool, TokenizerError> {
        if span_end <= begin2 {
            return Ok(false);
        }
        let length = span_end - begin2;
        if length > MAX_NODE_SPAN {
            return Err(TokenizerErrorKind::Input
                .with_error(anyhow::anyhow!("unknown-word span {length} exceeds {MAX_NODE_SPAN} bytes")));
        }
        let category = cinfo.default_type() as usize;
        let (token_count, base_offset) = match self.unk_tokens.get(category).copied().flatten() {
            Some(v) => v,
            None => return Ok(false),
        };

        let mut emitted = false;
        for i in 0..token_count {
            let token = self.unk_dictionary.token(base_offset + i);
            let feature = self.unk_dictionary.feature(&token);
            let mut node = Node::blank(NodeStat::Unk);
            node.begin = begin2;
            node.length = length as u16;
            node.rlength = (rlength_prefix + length) as u16;
            node.lc_attr = token.lc_attr;
            node.rc_attr = token.rc_attr;
            node.posid = token.posid;
            node.wcost = self.apply_penalty(token.word_cost, sentence, charset, begin2, span_end, cinfo);
            node.char_type = cinfo.default_type();
            node.feature = lattice.strdup(feature);
            if partial && !Self::passes_partial_filter(lattice, &node) {
                continue;
            }
            lattice.insert_node(node);
            emitted = true;
        }
        Ok(emitted)
    }

    /// Partial-mode candidate filter: reject a candidate ending
    /// `INSIDE_TOKEN`, and reject one whose feature doesn't `partial_match`
    /// a feature constraint anchored at its begin position.
    fn passes_partial_filter(lattice: &Lattice, node: &Node) -> bool {
        if lattice.boundary_constraint(node.end()) == BoundaryConstraint::InsideToken {
            return false;
        }
        if let Some(constraint) = lattice.feature_constraint_at(node.begin) {
            if !partial_match(constraint, lattice.feature(node)) {
                return false;
            }
        }
        true
    }
}

/// CSV-field comparison: `*` matches anything, otherwise fields must be
/// equal. Fields missing from one side are treated permissively (neither
/// side can reject a field the other side doesn't have an opinion on).
pub fn partial_match(constraint: &str, candidate: &str) -> bool {
    let mut c_fields = constraint.split(',');
    let mut n_fields = candidate.split(',');
    loop {
        match (c_fields.next(), n_fields.next()) {
            (Some(c), Some(n)) => {
                if c != "*" && c != n {
                    return false;
                }
            }
            _ => return true,
        }
    }
}

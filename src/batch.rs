//! The collaborator that owns the chunk stream and delegates per-line
//! splitting to [`LineSplitter`]: cuts the stream into independent
//! batches at unconditional hard splits, flattens nesting per batch,
//! preempts rules that would make the search intractable, and stitches
//! each batch's rendering back together.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::chunk::Chunk;
use crate::config::SplitterConfig;
use crate::rule::{HardSplitRule, Rule, RuleId};
use crate::splitter::{collect_rules, LineSplitter};

/// Above this product of non-hard rules' `num_values`, a batch's search
/// space is considered too large to explore exhaustively and preemption
/// kicks in.
const PREEMPTION_THRESHOLD: u64 = 4096;

pub struct LineWriter<'a> {
    line_ending: &'a str,
    page_width: usize,
    config: &'a SplitterConfig,
}

impl<'a> LineWriter<'a> {
    pub fn new(line_ending: &'a str, page_width: usize, config: &'a SplitterConfig) -> Self {
        Self { line_ending, page_width, config }
    }

    /// Formats the whole chunk stream (no sentinel included, one is
    /// appended per batch as the façade builds it) starting at `indent`.
    /// Returns the rendered text and the summed cost across batches: each
    /// batch feeds a fresh `LineSplitter` and the outputs are stitched
    /// together. There is no attempt at a provably optimal *global* split
    /// across batches; each batch is solved independently.
    pub fn format(&self, chunks: Vec<Chunk>, indent: usize) -> (String, u64) {
        debug_assert!(!chunks.is_empty(), "chunk stream must be non-empty");

        let spans = compute_rule_spans(&chunks);
        let mut boundaries = find_cut_points(&chunks, &spans);
        let last = chunks.len() - 1;
        if boundaries.last().copied() != Some(last) {
            boundaries.push(last);
        }
        tracing::debug!(cut_points = boundaries.len(), "batch façade cut the chunk stream");

        let mut out = String::new();
        let mut total_cost = 0u64;
        let mut start = 0usize;
        let leading_indent = indent * self.config.spaces_per_indent;

        for (batch_no, &boundary) in boundaries.iter().enumerate() {
            let mut batch: Vec<Chunk> = chunks[start..=boundary].to_vec();
            batch.push(Chunk::sentinel());

            flatten_nesting(&mut batch);
            let rules = collect_rules(&batch);
            if !self.config.disable_preemption && should_preempt(&rules) {
                preempt(&mut batch, &rules, self.page_width);
            }

            let splitter = LineSplitter::new(&batch, self.line_ending, self.page_width, self.config);
            let mut batch_out = String::new();
            let result = splitter.apply(indent, &mut batch_out);
            total_cost += result.cost;

            // Every batch's own render emits its leading indentation, since
            // a standalone or nested splitter call needs it. For batches
            // after the first, that indentation is redundant: the previous
            // batch's own trailing hard split already placed the cursor
            // at this exact column, so drop the duplicate here.
            if batch_no == 0 {
                out.push_str(&batch_out);
            } else {
                out.push_str(batch_out.get(leading_indent..).unwrap_or(&batch_out));
            }
            start = boundary + 1;
        }

        (out, total_cost)
    }
}

/// First and last chunk index (inclusive) referencing each rule, across
/// the slice passed in. Rather than mutating shared `Rc<dyn Rule>` trait
/// objects in place to track this, the façade derives it from a single
/// read-only pass and keeps it in a local map.
pub(crate) fn compute_rule_spans(chunks: &[Chunk]) -> HashMap<RuleId, (usize, usize)> {
    let mut spans: HashMap<RuleId, (usize, usize)> = HashMap::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if let Some(id) = chunk.rule_id() {
            spans
                .entry(id)
                .and_modify(|(_, end)| *end = i)
                .or_insert((i, i));
        }
    }
    spans
}

fn rule_straddles(spans: &HashMap<RuleId, (usize, usize)>, i: usize) -> bool {
    spans.values().any(|&(start, end)| start <= i && end > i)
}

fn find_cut_points(chunks: &[Chunk], spans: &HashMap<RuleId, (usize, usize)>) -> Vec<usize> {
    let mut cuts = Vec::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if chunk.is_hard_split
            && chunk.nesting == 0
            && chunk.block_chunks.is_empty()
            && !rule_straddles(spans, i)
        {
            cuts.push(i);
        }
    }
    cuts
}

/// Collects the distinct non-zero nesting depths used in a batch, sorts
/// them, and renumbers each chunk's nesting to its rank, shrinking the
/// search space (fewer distinct `LinePrefix.split` candidates) without
/// changing which solutions are reachable.
fn flatten_nesting(batch: &mut [Chunk]) {
    let mut levels: Vec<u32> = batch.iter().map(|c| c.nesting).filter(|&n| n != 0).collect();
    levels.sort_unstable();
    levels.dedup();
    if levels.is_empty() {
        return;
    }
    let rank: HashMap<u32, u32> = levels.iter().enumerate().map(|(i, &lvl)| (lvl, (i + 1) as u32)).collect();
    for chunk in batch.iter_mut() {
        if chunk.nesting != 0 {
            chunk.nesting = rank[&chunk.nesting];
        }
        flatten_nesting(&mut chunk.block_chunks);
    }
}

fn should_preempt(rules: &HashMap<RuleId, Rc<dyn Rule>>) -> bool {
    let mut product: u64 = 1;
    for rule in rules.values() {
        if rule.is_hard() {
            continue;
        }
        product = product.saturating_mul(rule.num_values().max(1) as u64);
        if product >= PREEMPTION_THRESHOLD {
            return true;
        }
    }
    false
}

fn preempt(batch: &mut [Chunk], rules: &HashMap<RuleId, Rc<dyn Rule>>, page_width: usize) {
    let spans = compute_rule_spans(batch);
    let mut hardened = HashSet::new();
    let mut rule_ids: Vec<RuleId> = rules.keys().copied().collect();
    rule_ids.sort_by_key(|id| id.0);

    for rule_id in rule_ids {
        if hardened.contains(&rule_id) {
            continue;
        }
        let Some(rule) = rules.get(&rule_id) else { continue };
        if rule.is_hard() {
            continue;
        }
        let Some(&(start, end)) = spans.get(&rule_id) else { continue };
        let width: usize = ((start + 1)..=end)
            .filter(|&i| i < batch.len())
            .map(|i| batch[i].text.len() + batch[i].unsplit_block_length)
            .sum();
        if width > page_width {
            tracing::warn!(rule = rule_id.0, width, page_width, "preemption hardened a rule");
            harden_rule(rule_id, batch, rules, &mut hardened);
        }
    }
}

/// Marks every chunk owned by `rule_id` as a hard split and replaces its
/// rule with a fresh [`HardSplitRule`], then recursively hardens any rule
/// that `rule_id`'s `fully_split_value` forward-constrains to that other
/// rule's own `fully_split_value`. Idempotent; `hardened` cuts cycles.
fn harden_rule(
    rule_id: RuleId,
    chunks: &mut [Chunk],
    rules: &HashMap<RuleId, Rc<dyn Rule>>,
    hardened: &mut HashSet<RuleId>,
) {
    if !hardened.insert(rule_id) {
        return;
    }
    let hard: Rc<dyn Rule> = Rc::new(HardSplitRule::new(rule_id));
    harden_chunks(chunks, rule_id, &hard);

    let Some(rule) = rules.get(&rule_id) else { return };
    let fully_split = rule.fully_split_value();
    for (&other_id, other_rule) in rules.iter() {
        if other_id == rule_id {
            continue;
        }
        if rule.constrain(fully_split, other_id) == Some(other_rule.fully_split_value()) {
            harden_rule(other_id, chunks, rules, hardened);
        }
    }
}

fn harden_chunks(chunks: &mut [Chunk], rule_id: RuleId, hard: &Rc<dyn Rule>) {
    for chunk in chunks.iter_mut() {
        if chunk.rule_id() == Some(rule_id) {
            chunk.is_hard_split = true;
            chunk.rule = Some(Rc::clone(hard));
        }
        harden_chunks(&mut chunk.block_chunks, rule_id, hard);
    }
}

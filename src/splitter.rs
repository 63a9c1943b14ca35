//! The search engine: for one batch of chunks, enumerate rule-value
//! assignments depth-first, recurse on suffixes keyed by [`LinePrefix`],
//! memoize the best [`SplitSet`] per prefix, and render the chosen splits
//! to an output buffer.
//!
//! Structurally this is a two-pass decide-then-render shape, generalized
//! from a single bool decision to a memoized search over many rule values.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::batch::compute_rule_spans;
use crate::chunk::Chunk;
use crate::config::SplitterConfig;
use crate::line_prefix::LinePrefix;
use crate::rule::{Rule, RuleId, RuleValue};
use crate::split_set::SplitSet;
use crate::utils::StrExt;

/// The output of one top-level [`LineSplitter::apply`] call: total cost of
/// the chosen solution, plus absolute selection offsets in the buffer if
/// any chunk along the way carried them.
#[derive(Debug, Clone, Default)]
pub struct SplitResult {
    pub cost: u64,
    pub selection_start: Option<usize>,
    pub selection_end: Option<usize>,
}

/// Sub-totals `evaluate_cost` computes internally, exposed so tests can
/// assert *why* a solution costs what it does rather than just its sum.
/// Not part of the production output shape (callers only ever see
/// `{cost, selection_start?, selection_end?}`). `lib.rs` only re-exports
/// this type under `cfg(any(test, feature = "diagnostics"))`, so it never
/// leaks into a release build's public surface even though it's always
/// compiled here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CostBreakdown {
    pub overflow: u64,
    pub rule_cost: u64,
    pub span_cost: u64,
    pub block_cost: u64,
}

impl CostBreakdown {
    pub fn total(&self) -> u64 {
        self.overflow + self.rule_cost + self.span_cost + self.block_cost
    }
}

#[derive(Clone)]
struct CacheEntry {
    cost: u64,
    text: Rc<str>,
    selection_start: Option<usize>,
    selection_end: Option<usize>,
}

struct Running {
    best: Option<SplitSet>,
    best_cost: u64,
}

impl Running {
    fn new() -> Self {
        Self { best: None, best_cost: u64::MAX }
    }
}

pub struct LineSplitter<'a> {
    chunks: &'a [Chunk],
    line_ending: &'a str,
    page_width: usize,
    config: &'a SplitterConfig,
    rules: HashMap<RuleId, Rc<dyn Rule>>,
    /// `prefix_rules[i]`: distinct rules among `chunks[0..i)`.
    prefix_rules: Vec<HashSet<RuleId>>,
    /// `suffix_rules[i]`: distinct rules among `chunks[i..N-1)` (sentinel excluded).
    suffix_rules: Vec<HashSet<RuleId>>,
    /// Rules whose range contains a hard split they don't themselves own;
    /// their first decision must try only non-zero values.
    forced_must_split: HashSet<RuleId>,
    memo: RefCell<HashMap<LinePrefix, Option<SplitSet>>>,
    block_cache: RefCell<HashMap<(usize, usize), CacheEntry>>,
}

impl<'a> LineSplitter<'a> {
    pub fn new(
        chunks: &'a [Chunk],
        line_ending: &'a str,
        page_width: usize,
        config: &'a SplitterConfig,
    ) -> Self {
        debug_assert!(!chunks.is_empty(), "a batch must be non-empty");
        let rules = collect_rules(chunks);
        let (prefix_rules, suffix_rules) = compute_prefix_suffix_rules(chunks);
        let forced_must_split = compute_forced_must_split(chunks, &rules);
        Self {
            chunks,
            line_ending,
            page_width,
            config,
            rules,
            prefix_rules,
            suffix_rules,
            forced_must_split,
            memo: RefCell::new(HashMap::new()),
            block_cache: RefCell::new(HashMap::new()),
        }
    }

    /// Runs the search for `indent` and writes the rendered result to `out`.
    pub fn apply(&self, indent: usize, out: &mut String) -> SplitResult {
        let initial = LinePrefix::initial(indent, self.config.spaces_per_indent);
        let splits = self.find_best_splits(&initial).unwrap_or_else(SplitSet::empty);
        let cost = self.evaluate_cost(&initial, &splits);
        self.render(&initial, &splits, out, cost)
    }

    // ---- search -----------------------------------------------------

    fn find_best_splits(&self, prefix: &LinePrefix) -> Option<SplitSet> {
        if let Some(cached) = self.memo.borrow().get(prefix) {
            return cached.clone();
        }
        if tracing::enabled!(tracing::Level::TRACE) {
            tracing::trace!(length = prefix.length, column = prefix.column, "memo miss");
        }
        let mut running = Running::new();
        self.try_chunk_rule_values(prefix, prefix, &mut running);
        self.memo.borrow_mut().insert(prefix.clone(), running.best.clone());
        running.best
    }

    /// `anchor` is the prefix passed to the enclosing `find_best_splits`
    /// call; `update` always costs candidates against it. `prefix` is the
    /// current recursion position, walked ahead of `anchor` through a
    /// chain of unsplit chunks via `extend`. Costing against `prefix`
    /// instead would drop the width of those already-consumed chunks.
    fn try_chunk_rule_values(&self, anchor: &LinePrefix, prefix: &LinePrefix, running: &mut Running) {
        let n = self.chunks.len();
        if prefix.length == n - 1 {
            self.update(anchor, SplitSet::empty(), running);
            return;
        }

        let chunk = &self.chunks[prefix.length];
        let Some(rule_id) = chunk.rule_id() else {
            debug_assert!(false, "non-sentinel chunk {} has no rule", prefix.length);
            let extended = prefix.extend(HashMap::new());
            self.try_chunk_rule_values(anchor, &extended, running);
            return;
        };
        let rule = Rc::clone(&self.rules[&rule_id]);

        // a rule whose range has a hard split inside it starts out bound
        // to `MustSplitAny` rather than fully open, so its first decision
        // never tries value 0.
        let bound = prefix.rule_value(rule_id).or_else(|| {
            self.forced_must_split.contains(&rule_id).then_some(RuleValue::MustSplitAny)
        });

        match bound {
            None => {
                for v in 0..rule.num_values() {
                    self.try_rule_value(anchor, prefix, v, chunk, rule.as_ref(), running);
                }
            }
            Some(RuleValue::MustSplitAny) => {
                for v in 1..rule.num_values() {
                    self.try_rule_value(anchor, prefix, v, chunk, rule.as_ref(), running);
                }
            }
            Some(RuleValue::Bound(v)) => {
                self.try_rule_value(anchor, prefix, v, chunk, rule.as_ref(), running);
            }
        }
    }

    fn try_rule_value(&self, anchor: &LinePrefix, prefix: &LinePrefix, v: u32, chunk: &Chunk, rule: &dyn Rule, running: &mut Running) {
        let new_bindings = self.advance_prefix(prefix, v, chunk);
        if rule.is_split(v, chunk) {
            for longer_prefix in prefix.split(chunk, new_bindings, self.config.spaces_per_indent) {
                let Some(remaining) = self.find_best_splits(&longer_prefix) else { continue };
                let candidate = remaining.add(prefix.length, longer_prefix.column);
                self.update(anchor, candidate, running);
            }
        } else {
            let extended = prefix.extend(new_bindings);
            self.try_chunk_rule_values(anchor, &extended, running);
        }
    }

    /// Computes the rule→value map for the one-longer prefix. When two
    /// rules' `constrain`/`reverse_constrain` results disagree about a
    /// shared target rule, last write wins.
    fn advance_prefix(&self, prefix: &LinePrefix, v: u32, chunk: &Chunk) -> HashMap<RuleId, RuleValue> {
        let next_index = prefix.length + 1;
        let mut output: HashMap<RuleId, RuleValue> = HashMap::new();
        let prefix_rules = &self.prefix_rules[next_index];
        let suffix_rules = &self.suffix_rules[next_index];
        let chunk_rule_id = chunk.rule_id();

        for &r_id in prefix_rules {
            let rv: Option<RuleValue> = if Some(r_id) == chunk_rule_id {
                Some(RuleValue::Bound(v))
            } else {
                prefix.rule_value(r_id)
            };

            let straddles = suffix_rules.contains(&r_id);
            if straddles {
                if let Some(rv_val) = rv {
                    output.insert(r_id, rv_val);
                }
            }

            let Some(rv_val) = rv else { continue };
            let RuleValue::Bound(rv_int) = rv_val else { continue };
            let r_obj = &self.rules[&r_id];

            for &s_id in suffix_rules.iter() {
                if s_id == r_id {
                    continue;
                }
                let s_obj = &self.rules[&s_id];
                let cv = r_obj
                    .constrain(rv_int, s_id)
                    .or_else(|| s_obj.reverse_constrain(rv_int, r_id));
                if let Some(cv) = cv {
                    output.insert(r_id, RuleValue::Bound(rv_int));
                    output.insert(s_id, RuleValue::Bound(cv));
                }
            }
        }
        output
    }

    fn update(&self, prefix: &LinePrefix, candidate: SplitSet, running: &mut Running) {
        let cost = self.evaluate_cost(prefix, &candidate);
        if cost < running.best_cost {
            running.best_cost = cost;
            running.best = Some(candidate);
        }
    }

    // ---- cost ---------------------------------------------------------

    /// Walks `chunks[prefix.length..N)` accumulating line length from
    /// `prefix.column`. Returns the total cost; see
    /// [`LineSplitter::evaluate_cost_breakdown`] for the sub-totals this is
    /// summed from.
    fn evaluate_cost(&self, prefix: &LinePrefix, splits: &SplitSet) -> u64 {
        self.evaluate_cost_breakdown(prefix, splits).total()
    }

    /// Same walk as [`LineSplitter::evaluate_cost`], but returns the
    /// overflow/rule/span/block sub-totals separately rather than their sum,
    /// so tests can assert on *why* a solution costs what it does. Crate-
    /// visible (not just test-gated) since `evaluate_cost` itself is built
    /// on top of it; `lib.rs` gates the re-export of [`CostBreakdown`]
    /// itself so this accessor is only meaningfully reachable under
    /// `cfg(any(test, feature = "diagnostics"))`.
    pub fn evaluate_cost_breakdown(&self, prefix: &LinePrefix, splits: &SplitSet) -> CostBreakdown {
        let n = self.chunks.len();
        let mut length = prefix.column;
        let mut breakdown = CostBreakdown::default();
        let mut counted_rules: HashSet<RuleId> = HashSet::new();
        let mut split_spans: HashMap<crate::chunk::SpanId, u32> = HashMap::new();

        for i in prefix.length..n {
            match self.chunks[i].text.last_line_len() {
                Some(last) => length = last,
                None => length += self.chunks[i].text.len(),
            }
            if i < n - 1 {
                if splits.should_split_at(i) {
                    if length > self.page_width {
                        breakdown.overflow += (length - self.page_width) as u64 * self.config.overflow_char_cost as u64;
                    }
                    for span in &self.chunks[i].spans {
                        split_spans.entry(span.id).or_insert(span.cost);
                    }
                    if let Some(rule_id) = self.chunks[i].rule_id() {
                        if counted_rules.insert(rule_id) {
                            breakdown.rule_cost += self.rules[&rule_id].cost() as u64;
                        }
                    }
                    if !self.chunks[i].block_chunks.is_empty() {
                        let column = splits.get_column(i);
                        let entry = self.format_block(i, column);
                        breakdown.block_cost += entry.cost;
                    }
                    length = splits.get_column(i);
                } else {
                    if self.chunks[i].space_when_unsplit {
                        length += 1;
                    }
                    length += self.chunks[i].unsplit_block_length;
                }
            }
        }

        if length > self.page_width {
            breakdown.overflow += (length - self.page_width) as u64 * self.config.overflow_char_cost as u64;
        }
        for cost in split_spans.values() {
            breakdown.span_cost += *cost as u64;
        }
        breakdown
    }

    /// Runs (or reuses, from the per-batch cache) the sub-splitter for the
    /// block belonging to `chunks[chunk_index]`, opened at `column`.
    fn format_block(&self, chunk_index: usize, column: usize) -> CacheEntry {
        let key = (chunk_index, column);
        if let Some(entry) = self.block_cache.borrow().get(&key) {
            return entry.clone();
        }
        let chunk = &self.chunks[chunk_index];
        let indent = if chunk.flush_left { 0 } else { 1 };
        let sub_width = self.page_width.saturating_sub(column);
        let sub_splitter = LineSplitter::new(&chunk.block_chunks, self.line_ending, sub_width, self.config);
        let mut buf = String::new();
        let result = sub_splitter.apply(indent, &mut buf);
        let text = indent_block_text(&buf, column, self.line_ending);
        let selection_start = result.selection_start.map(|s| map_offset_into_indented(&buf, column, self.line_ending, s));
        let selection_end = result.selection_end.map(|s| map_offset_into_indented(&buf, column, self.line_ending, s));
        let entry = CacheEntry { cost: result.cost, text, selection_start, selection_end };
        self.block_cache.borrow_mut().insert(key, entry.clone());
        entry
    }

    // ---- rendering ------------------------------------------------------

    fn render(&self, initial: &LinePrefix, splits: &SplitSet, out: &mut String, cost: u64) -> SplitResult {
        push_spaces(out, initial.column);
        let mut selection_start = None;
        let mut selection_end = None;
        let n = self.chunks.len();

        for i in 0..n.saturating_sub(1) {
            let chunk = &self.chunks[i];
            let text_start = out.len();
            out.push_str(&chunk.text);
            if let Some(offset) = chunk.selection_start {
                selection_start = Some(text_start + offset);
            }
            if let Some(offset) = chunk.selection_end {
                selection_end = Some(text_start + offset);
            }

            if !chunk.block_chunks.is_empty() {
                if splits.should_split_at(i) {
                    let column = splits.get_column(i);
                    let entry = self.format_block(i, column);
                    let block_start = out.len();
                    out.push_str(&entry.text);
                    if let Some(offset) = entry.selection_start {
                        selection_start = Some(block_start + offset);
                    }
                    if let Some(offset) = entry.selection_end {
                        selection_end = Some(block_start + offset);
                    }
                } else {
                    render_inline(&chunk.block_chunks, out);
                }
            }

            if splits.should_split_at(i) {
                out.push_str(self.line_ending);
                if chunk.is_double {
                    out.push_str(self.line_ending);
                }
                push_spaces(out, splits.get_column(i));
            } else if chunk.space_when_unsplit {
                out.push(' ');
            }
        }

        SplitResult { cost, selection_start, selection_end }
    }
}

pub(crate) fn collect_rules(chunks: &[Chunk]) -> HashMap<RuleId, Rc<dyn Rule>> {
    let mut rules = HashMap::new();
    for chunk in chunks {
        if let Some(rule) = &chunk.rule {
            rules.entry(rule.id()).or_insert_with(|| Rc::clone(rule));
        }
    }
    rules
}

fn compute_prefix_suffix_rules(chunks: &[Chunk]) -> (Vec<HashSet<RuleId>>, Vec<HashSet<RuleId>>) {
    let n = chunks.len();
    let mut prefix_rules = vec![HashSet::new(); n + 1];
    for i in 0..n {
        let mut set = prefix_rules[i].clone();
        if let Some(id) = chunks[i].rule_id() {
            set.insert(id);
        }
        prefix_rules[i + 1] = set;
    }

    let mut suffix_rules = vec![HashSet::new(); n + 1];
    if n > 0 {
        suffix_rules[n - 1] = HashSet::new();
    }
    for i in (0..n.saturating_sub(1)).rev() {
        let mut set = suffix_rules[i + 1].clone();
        if let Some(id) = chunks[i].rule_id() {
            set.insert(id);
        }
        suffix_rules[i] = set;
    }
    (prefix_rules, suffix_rules)
}

/// Rules whose `splits_on_inner_rules()` is true and whose span contains a
/// hard split owned by some other rule: that rule can never settle on
/// value 0, so its first decision is forced through the `MustSplitAny` arm.
fn compute_forced_must_split(chunks: &[Chunk], rules: &HashMap<RuleId, Rc<dyn Rule>>) -> HashSet<RuleId> {
    let spans = compute_rule_spans(chunks);
    let mut forced = HashSet::new();
    for (&rule_id, &(start, end)) in &spans {
        let Some(rule) = rules.get(&rule_id) else { continue };
        if !rule.splits_on_inner_rules() {
            continue;
        }
        let has_inner_hard_split = (start..=end)
            .any(|i| chunks[i].is_hard_split && chunks[i].rule_id() != Some(rule_id));
        if has_inner_hard_split {
            forced.insert(rule_id);
        }
    }
    forced
}

fn push_spaces(out: &mut String, n: usize) {
    out.extend(std::iter::repeat(' ').take(n));
}

/// Recursively emits `chunks` inline (no newlines): used when a block's
/// `unsplit_block_length` already fit and no nested splitting is needed.
fn render_inline(chunks: &[Chunk], out: &mut String) {
    let n = chunks.len();
    for (i, chunk) in chunks.iter().enumerate().take(n.saturating_sub(1)) {
        out.push_str(&chunk.text);
        if !chunk.block_chunks.is_empty() {
            render_inline(&chunk.block_chunks, out);
        }
        if chunk.space_when_unsplit {
            out.push(' ');
        }
    }
}

/// Prepends `column` spaces of indentation to every non-empty line of
/// `body`, joined by `line_ending`, plus the leading newline the "`{` then
/// newline" convention requires.
fn indent_block_text(body: &str, column: usize, line_ending: &str) -> Rc<str> {
    let pad: String = std::iter::repeat(' ').take(column).collect();
    let mut out = String::with_capacity(body.len() + column * 4 + line_ending.len());
    out.push_str(line_ending);
    for (i, line) in body.split(line_ending).enumerate() {
        if i > 0 {
            out.push_str(line_ending);
        }
        if !line.is_empty() {
            out.push_str(&pad);
        }
        out.push_str(line);
    }
    Rc::from(out)
}

/// Maps a byte offset into the raw sub-splitter buffer to the
/// corresponding offset in [`indent_block_text`]'s output, so selection
/// offsets survive the indentation post-processing.
fn map_offset_into_indented(body: &str, column: usize, line_ending: &str, raw_offset: usize) -> usize {
    let mut consumed = 0usize;
    let mut out_pos = line_ending.len();
    let parts: Vec<&str> = body.split(line_ending).collect();
    for line in parts {
        let line_start = consumed;
        let line_end = consumed + line.len();
        let pad_len = if line.is_empty() { 0 } else { column };
        if raw_offset >= line_start && raw_offset <= line_end {
            return out_pos + pad_len + (raw_offset - line_start);
        }
        out_pos += pad_len + line.len() + line_ending.len();
        consumed = line_end + line_ending.len();
    }
    out_pos
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{Chunk, Span, SpanId};
    use crate::rule::{ConstrainedRule, HardSplitRule, NeverSplitRule, SimpleRule};

    fn simple_rule(id: u32, cost: u32) -> Rc<dyn Rule> {
        Rc::new(SimpleRule::new(RuleId(id), cost))
    }

    fn never_rule(id: u32) -> Rc<dyn Rule> {
        Rc::new(NeverSplitRule::new(RuleId(id)))
    }

    /// Installs a subscriber so `RUST_LOG=linesplit=trace cargo test` shows
    /// the `memo miss` traces `find_best_splits` emits. Safe to call from
    /// more than one test; only the first call wins.
    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    /// A rule marked `splits_on_inner_rules` whose range contains a hard
    /// split owned by another rule must itself split, even though its
    /// cheapest value on its own would be to stay unsplit.
    #[test]
    fn forced_must_split_on_inner_hard_split() {
        let outer: Rc<dyn Rule> = Rc::new(ConstrainedRule::new(RuleId(0), 5, 2, 1).with_splits_on_inner_rules(true));
        let inner: Rc<dyn Rule> = Rc::new(HardSplitRule::new(RuleId(1)));
        let chunks = vec![
            Chunk::builder("a(").rule(Rc::clone(&outer)).absolute_indent(0).build(),
            Chunk::builder("mid;").rule(Rc::clone(&inner)).is_hard_split(true).build(),
            Chunk::builder(")").rule(Rc::clone(&outer)).absolute_indent(0).build(),
            Chunk::sentinel(),
        ];
        let config = SplitterConfig::default();
        let splitter = LineSplitter::new(&chunks, "\n", 40, &config);
        assert!(splitter.forced_must_split.contains(&RuleId(0)));
        let mut out = String::new();
        let result = splitter.apply(0, &mut out);
        assert_eq!(out, "a(\nmid;\n)\n");
        assert_eq!(result.cost, 5);
    }

    #[test]
    fn fits_unsplit() {
        let comma_rule = simple_rule(0, 1);
        let chunks = vec![
            Chunk::builder("a(").rule(never_rule(1)).build(),
            Chunk::builder("b, ").rule(Rc::clone(&comma_rule)).build(),
            Chunk::builder("c)").rule(never_rule(2)).build(),
            Chunk::sentinel(),
        ];
        let config = SplitterConfig::default();
        let splitter = LineSplitter::new(&chunks, "\n", 40, &config);
        let mut out = String::new();
        let result = splitter.apply(0, &mut out);
        assert_eq!(out, "a(b, c)");
        assert_eq!(result.cost, 0);
    }

    /// A leading unsplit chunk must still count toward the width a split
    /// candidate is costed against, even though the decision for the
    /// split itself happens several chunks later.
    #[test]
    fn unsplit_prefix_width_counts_toward_the_split_decision() {
        let rule: Rc<dyn Rule> = Rc::new(SimpleRule::new(RuleId(0), 1));
        let chunks = vec![
            Chunk::builder("prefix_").rule(never_rule(9)).build(),
            Chunk::builder("aaaaaaaaaa").rule(Rc::clone(&rule)).absolute_indent(1).build(),
            Chunk::builder("b").rule(never_rule(10)).build(),
            Chunk::sentinel(),
        ];
        let config = SplitterConfig::default();
        let splitter = LineSplitter::new(&chunks, "\n", 12, &config);
        let mut out = String::new();
        let result = splitter.apply(0, &mut out);
        assert_eq!(out, "prefix_aaaaaaaaaa\n  b");
        assert_eq!(result.cost, 50_001);
    }

    /// A comma rule whose only non-zero value splits every chunk it
    /// governs, once the arguments no longer fit.
    #[test]
    fn forced_split_indents_to_open_paren_column() {
        let comma_rule = simple_rule(0, 1);
        let arg_a = "argument_one_is_quite_long";
        let arg_b = "argument_two_is_quite_long";
        let chunks = vec![
            Chunk::builder("call(").rule(never_rule(1)).absolute_indent(0).build(),
            Chunk::builder(arg_a).rule(Rc::clone(&comma_rule)).absolute_indent(1).build(),
            Chunk::builder(arg_b).rule(never_rule(2)).build(),
            Chunk::builder(")").rule(never_rule(3)).build(),
            Chunk::sentinel(),
        ];
        let config = SplitterConfig::default();
        let splitter = LineSplitter::new(&chunks, "\n", 20, &config);
        let mut out = String::new();
        splitter.apply(0, &mut out);
        assert!(out.contains('\n'), "expected a forced split, got: {out:?}");
    }

    /// A chunk marked `is_double` emits a blank line after it splits.
    #[test]
    fn double_newline_after_split() {
        let rule: Rc<dyn Rule> = Rc::new(HardSplitRule::new(RuleId(7)));
        let chunks = vec![
            Chunk::builder("a;").rule(rule).is_double(true).absolute_indent(0).build(),
            Chunk::builder("b;").rule(never_rule(8)).build(),
            Chunk::sentinel(),
        ];
        let config = SplitterConfig::default();
        let splitter = LineSplitter::new(&chunks, "\n", 40, &config);
        let mut out = String::new();
        splitter.apply(0, &mut out);
        assert_eq!(out, "a;\n\nb;");
    }

    /// A constrained rule forces its companion to the mapped value.
    #[test]
    fn constrained_rule_forces_companion() {
        let mut a = ConstrainedRule::new(RuleId(0), 0, 2, 1);
        a.add_forward_constraint(1, RuleId(1), 1);
        let a: Rc<dyn Rule> = Rc::new(a);
        let b: Rc<dyn Rule> = Rc::new(SimpleRule::new(RuleId(1), 0));

        let long_text = "x".repeat(30);
        let chunks = vec![
            Chunk::builder(long_text.clone()).rule(Rc::clone(&a)).absolute_indent(0).build(),
            Chunk::builder(long_text).rule(Rc::clone(&b)).absolute_indent(0).build(),
            Chunk::sentinel(),
        ];
        let config = SplitterConfig::default();
        let splitter = LineSplitter::new(&chunks, "\n", 10, &config);
        let mut out = String::new();
        splitter.apply(0, &mut out);
        assert!(out.contains('\n'));
    }

    #[test]
    fn determinism() {
        init_tracing();
        let comma_rule = simple_rule(0, 1);
        let chunks = vec![
            Chunk::builder("a(").rule(never_rule(1)).build(),
            Chunk::builder("b, ").rule(Rc::clone(&comma_rule)).absolute_indent(1).build(),
            Chunk::builder("c)").rule(never_rule(2)).build(),
            Chunk::sentinel(),
        ];
        let config = SplitterConfig::default();
        let splitter = LineSplitter::new(&chunks, "\n", 40, &config);
        let mut out1 = String::new();
        let r1 = splitter.apply(0, &mut out1);
        let mut out2 = String::new();
        let r2 = splitter.apply(0, &mut out2);
        assert_eq!(out1, out2);
        assert_eq!(r1.cost, r2.cost);
    }

    /// Text embedded in one chunk (e.g. a multi-line string literal or
    /// block comment, kept atomic rather than split into chunks) resets
    /// the running line length to its last line, not its total length.
    #[test]
    fn multiline_chunk_text_resets_line_length_to_last_line() {
        let rule = never_rule(0);
        let chunks = vec![
            Chunk::builder("\"\"\"\nfirst\nlast\"\"\"").rule(Rc::clone(&rule)).build(),
            Chunk::builder("tail").rule(never_rule(1)).build(),
            Chunk::sentinel(),
        ];
        let config = SplitterConfig::default();
        // width 40 comfortably fits "last\"\"\"tail" (11 chars) even though
        // the chunk's *total* text length (16) would not leave room.
        let splitter = LineSplitter::new(&chunks, "\n", 40, &config);
        let initial = crate::line_prefix::LinePrefix::initial(0, config.spaces_per_indent);
        let splits = SplitSet::empty();
        let cost = splitter.evaluate_cost(&initial, &splits);
        assert_eq!(cost, 0, "should not charge overflow once last-line length is used");
    }

    #[test]
    fn cost_breakdown_attributes_each_sub_total() {
        let rule = simple_rule(0, 3);
        let span = Span { id: SpanId(0), cost: 5 };
        let chunks = vec![
            Chunk::builder("x".repeat(30))
                .rule(Rc::clone(&rule))
                .span(span)
                .absolute_indent(0)
                .build(),
            Chunk::builder("y".repeat(30)).rule(never_rule(1)).build(),
            Chunk::sentinel(),
        ];
        let config = SplitterConfig::default();
        let splitter = LineSplitter::new(&chunks, "\n", 10, &config);
        let initial = crate::line_prefix::LinePrefix::initial(0, config.spaces_per_indent);
        let splits = SplitSet::empty().add(0, 0);
        let breakdown = splitter.evaluate_cost_breakdown(&initial, &splits);
        assert_eq!(breakdown.rule_cost, 3);
        assert_eq!(breakdown.span_cost, 5);
        assert!(breakdown.overflow > 0, "30-char chunk exceeds width 10");
        assert_eq!(breakdown.total(), splitter.evaluate_cost(&initial, &splits));
    }

    /// Property-based generalization of `determinism`: whatever shape of
    /// comma-separated argument list and whatever page width, running the
    /// same batch through the search twice must produce the same output
    /// and the same cost.
    #[cfg(not(miri))]
    mod proptests {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn repeated_apply_is_deterministic(n_words in 1usize..6, word_len in 1usize..12, width in 6usize..60) {
                let comma_rule = simple_rule(0, 1);
                let mut chunks = Vec::new();
                for i in 0..n_words {
                    let text = "w".repeat(word_len);
                    let rule = if i + 1 == n_words { never_rule(100) } else { Rc::clone(&comma_rule) };
                    chunks.push(Chunk::builder(text).rule(rule).absolute_indent(1).build());
                }
                chunks.push(Chunk::sentinel());
                let config = SplitterConfig::default();
                let splitter = LineSplitter::new(&chunks, "\n", width, &config);

                let mut out1 = String::new();
                let r1 = splitter.apply(0, &mut out1);
                let mut out2 = String::new();
                let r2 = splitter.apply(0, &mut out2);

                prop_assert_eq!(&out1, &out2);
                prop_assert_eq!(r1.cost, r2.cost);
            }

            /// Widening the page can only reduce or preserve total cost;
            /// it never introduces a new forced overflow.
            #[test]
            fn widening_the_page_never_increases_cost(n_words in 1usize..5, word_len in 1usize..10, width in 6usize..40) {
                let comma_rule = simple_rule(0, 1);
                let mut chunks = Vec::new();
                for i in 0..n_words {
                    let text = "w".repeat(word_len);
                    let rule = if i + 1 == n_words { never_rule(101) } else { Rc::clone(&comma_rule) };
                    chunks.push(Chunk::builder(text).rule(rule).absolute_indent(1).build());
                }
                chunks.push(Chunk::sentinel());
                let config = SplitterConfig::default();

                let narrow = LineSplitter::new(&chunks, "\n", width, &config);
                let mut narrow_out = String::new();
                let narrow_cost = narrow.apply(0, &mut narrow_out).cost;

                let wide = LineSplitter::new(&chunks, "\n", width + 20, &config);
                let mut wide_out = String::new();
                let wide_cost = wide.apply(0, &mut wide_out).cost;

                prop_assert!(wide_cost <= narrow_cost);
            }
        }
    }

    #[test]
    fn span_cost_charged_once() {
        let rule = simple_rule(0, 0);
        let span = Span { id: SpanId(0), cost: 5 };
        let chunks = vec![
            Chunk::builder("x".repeat(30)).rule(Rc::clone(&rule)).span(span.clone()).absolute_indent(0).build(),
            Chunk::builder("y".repeat(30)).rule(Rc::clone(&rule)).span(span).absolute_indent(0).build(),
            Chunk::sentinel(),
        ];
        let config = SplitterConfig::default();
        let splitter = LineSplitter::new(&chunks, "\n", 10, &config);
        let mut out = String::new();
        let result = splitter.apply(0, &mut out);
        // the span covers both chunks but must be charged once, not twice;
        // verify indirectly via memo-consistency: re-running the same
        // evaluate_cost on the same split set gives the same number.
        let initial = crate::line_prefix::LinePrefix::initial(0, config.spaces_per_indent);
        let splits = splitter.find_best_splits(&initial).unwrap();
        let recomputed = splitter.evaluate_cost(&initial, &splits);
        assert_eq!(result.cost, recomputed);
    }
}

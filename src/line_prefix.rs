//! Immutable description of "how we got here": how many chunks have been
//! consumed, the column the next line starts at, and the rule bindings
//! fixed along the way. Equality and hashing over these three fields *is*
//! the memoization key `splitter` relies on, so a `LinePrefix`'s hash is
//! computed once at construction rather than re-walked on every memo
//! lookup.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::chunk::Chunk;
use crate::rule::{RuleId, RuleValue};

pub type RuleValues = Rc<HashMap<RuleId, RuleValue>>;

#[derive(Debug, Clone)]
pub struct LinePrefix {
    pub length: usize,
    pub column: usize,
    rule_values: RuleValues,
    cached_hash: u64,
}

impl LinePrefix {
    fn new(length: usize, column: usize, rule_values: RuleValues) -> Self {
        let cached_hash = Self::compute_hash(length, column, &rule_values);
        Self { length, column, rule_values, cached_hash }
    }

    /// Commutatively combines per-entry hashes so the result doesn't
    /// depend on the `HashMap`'s iteration order.
    fn compute_hash(length: usize, column: usize, rule_values: &HashMap<RuleId, RuleValue>) -> u64 {
        use std::collections::hash_map::DefaultHasher;

        let mut base = DefaultHasher::new();
        length.hash(&mut base);
        column.hash(&mut base);
        let mut combined = base.finish();
        for (rule, value) in rule_values {
            let mut entry_hasher = DefaultHasher::new();
            rule.hash(&mut entry_hasher);
            value.hash(&mut entry_hasher);
            combined ^= entry_hasher.finish();
        }
        combined
    }

    pub fn initial(indent: usize, spaces_per_indent: usize) -> Self {
        Self::new(0, indent * spaces_per_indent, Rc::new(HashMap::new()))
    }

    pub fn rule_value(&self, rule: RuleId) -> Option<RuleValue> {
        self.rule_values.get(&rule).copied()
    }

    /// A prefix one chunk longer, on the same line (no split).
    pub fn extend(&self, new_rule_values: HashMap<RuleId, RuleValue>) -> Self {
        Self::new(self.length + 1, self.column, Rc::new(new_rule_values))
    }

    /// Prefixes for the case "this chunk is a split". Multiple prefixes
    /// correspond to different legal indentation columns for the chunk's
    /// nesting depth; the search explores all of them.
    ///
    /// This trusts the chunk's precomputed `absolute_indent` as the
    /// primary candidate, and additionally offers one indent level deeper
    /// as an alternative whenever the chunk is nested and not flush-left:
    /// continuation indent vs. block indent.
    pub fn split(
        &self,
        chunk: &Chunk,
        new_rule_values: HashMap<RuleId, RuleValue>,
        spaces_per_indent: usize,
    ) -> Vec<Self> {
        let rule_values = Rc::new(new_rule_values);
        let primary = chunk.absolute_indent as usize * spaces_per_indent;
        let mut columns = vec![primary];
        if !chunk.flush_left && chunk.nesting > 0 {
            let deeper = primary + spaces_per_indent;
            if deeper != primary {
                columns.push(deeper);
            }
        }
        columns
            .into_iter()
            .map(|column| Self::new(self.length + 1, column, Rc::clone(&rule_values)))
            .collect()
    }
}

impl PartialEq for LinePrefix {
    fn eq(&self, other: &Self) -> bool {
        self.length == other.length
            && self.column == other.column
            && *self.rule_values == *other.rule_values
    }
}

impl Eq for LinePrefix {}

impl Hash for LinePrefix {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.cached_hash);
    }
}

//! The opaque `Rule` interface the splitter treats its input as conforming
//! to: a small closed set of trait-object variants, dispatched
//! dynamically, rather than a dynamic-dispatch-free generic.

use std::collections::HashMap;
use std::fmt;

use crate::chunk::Chunk;

/// Stable identity for a shared [`Rule`].
///
/// Rules are "shared by reference across chunks" and must be "hashable and
/// equal by identity of bookkeeping" so they can key a [`LinePrefix`]'s
/// rule-value map. Pointer identity doesn't survive the cheap `Clone` the
/// search performs on every recursive step, so each rule is minted a
/// small stable id instead, handed out by whichever batch façade registers
/// it.
///
/// [`LinePrefix`]: crate::line_prefix::LinePrefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub u32);

/// A rule's binding within a [`LinePrefix`](crate::line_prefix::LinePrefix).
///
/// Models the `-1` "must split, value not yet chosen" sentinel of the
/// source as its own variant instead of an in-band integer, so it can
/// never collide with a legitimate rule value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleValue {
    /// The rule has been fixed to this concrete value.
    Bound(u32),
    /// The rule must produce a split somewhere in its range, but which
    /// non-zero value accomplishes that is still open.
    MustSplitAny,
}

/// The capability set the line-splitting core demands of a rule.
/// Implementors are the opaque, domain-specific decision variables a
/// collaborator attaches to chunks; the core never inspects their internals.
pub trait Rule: fmt::Debug {
    /// This rule's stable identity.
    fn id(&self) -> RuleId;

    /// Number of legal values, `>= 1`. Value `0` always means "no split".
    fn num_values(&self) -> u32;

    /// Cost charged once if any chunk governed by this rule splits.
    fn cost(&self) -> u32;

    /// Whether assigning `value` makes `chunk` a line break.
    fn is_split(&self, value: u32, chunk: &Chunk) -> bool;

    /// Forward constraint: given this rule bound to `my_value`, what value
    /// (if any) does `other` have to take?
    fn constrain(&self, my_value: u32, other: RuleId) -> Option<u32>;

    /// Backward constraint: the mirror of [`Rule::constrain`], queried on
    /// `other` when `self.constrain` found nothing.
    fn reverse_constrain(&self, my_value: u32, other: RuleId) -> Option<u32>;

    /// Whether a hard split strictly inside this rule's range forces this
    /// rule to split too.
    fn splits_on_inner_rules(&self) -> bool;

    /// The value meaning "split everywhere this rule governs".
    fn fully_split_value(&self) -> u32;

    /// Whether this is the `HardSplitRule` variant, used only by the
    /// batch façade to exclude unconditional splits from its preemption
    /// search-space estimate.
    fn is_hard(&self) -> bool {
        false
    }
}

/// An unconditional split: always breaks, carries no cost of its own,
/// since it's never a choice weighed against an alternative.
#[derive(Debug, Clone, Copy)]
pub struct HardSplitRule {
    id: RuleId,
}

impl HardSplitRule {
    pub fn new(id: RuleId) -> Self {
        Self { id }
    }
}

impl Rule for HardSplitRule {
    fn id(&self) -> RuleId {
        self.id
    }
    fn num_values(&self) -> u32 {
        1
    }
    fn cost(&self) -> u32 {
        0
    }
    fn is_split(&self, _value: u32, _chunk: &Chunk) -> bool {
        true
    }
    fn constrain(&self, _my_value: u32, _other: RuleId) -> Option<u32> {
        None
    }
    fn reverse_constrain(&self, _my_value: u32, _other: RuleId) -> Option<u32> {
        None
    }
    fn splits_on_inner_rules(&self) -> bool {
        false
    }
    fn fully_split_value(&self) -> u32 {
        0
    }
    fn is_hard(&self) -> bool {
        true
    }
}

/// A rule bound to connective chunks that never break, e.g. the open
/// paren of a call whose argument list has its own rule. Every non-
/// sentinel chunk must carry *some* rule, so chunks that simply aren't
/// split candidates get one of these rather than going ruleless.
#[derive(Debug, Clone, Copy)]
pub struct NeverSplitRule {
    id: RuleId,
}

impl NeverSplitRule {
    pub fn new(id: RuleId) -> Self {
        Self { id }
    }
}

impl Rule for NeverSplitRule {
    fn id(&self) -> RuleId {
        self.id
    }
    fn num_values(&self) -> u32 {
        1
    }
    fn cost(&self) -> u32 {
        0
    }
    fn is_split(&self, _value: u32, _chunk: &Chunk) -> bool {
        false
    }
    fn constrain(&self, _my_value: u32, _other: RuleId) -> Option<u32> {
        None
    }
    fn reverse_constrain(&self, _my_value: u32, _other: RuleId) -> Option<u32> {
        None
    }
    fn splits_on_inner_rules(&self) -> bool {
        false
    }
    fn fully_split_value(&self) -> u32 {
        0
    }
}

/// The common case: a rule with two values, `0` (unsplit) and `1`
/// (split), where splitting means *every* chunk this rule governs becomes
/// a line break. This is what gives "if this argument is on its own line,
/// all arguments must be" its shape: all chunks sharing one `SimpleRule`
/// rise and fall together.
#[derive(Debug, Clone)]
pub struct SimpleRule {
    id: RuleId,
    cost: u32,
}

impl SimpleRule {
    pub fn new(id: RuleId, cost: u32) -> Self {
        Self { id, cost }
    }
}

impl Rule for SimpleRule {
    fn id(&self) -> RuleId {
        self.id
    }
    fn num_values(&self) -> u32 {
        2
    }
    fn cost(&self) -> u32 {
        self.cost
    }
    fn is_split(&self, value: u32, _chunk: &Chunk) -> bool {
        value != 0
    }
    fn constrain(&self, _my_value: u32, _other: RuleId) -> Option<u32> {
        None
    }
    fn reverse_constrain(&self, _my_value: u32, _other: RuleId) -> Option<u32> {
        None
    }
    fn splits_on_inner_rules(&self) -> bool {
        false
    }
    fn fully_split_value(&self) -> u32 {
        1
    }
}

/// A rule that, in addition to the `SimpleRule` binary shape, forwards a
/// fixed constraint onto a named companion rule whenever it takes a given
/// value, e.g. a collection literal's bracket rule forcing its body
/// rule to split in lockstep. Demonstrates `constrain`/`reverse_constrain`
/// for rule sets the core is agnostic to.
#[derive(Debug, Clone)]
pub struct ConstrainedRule {
    id: RuleId,
    cost: u32,
    num_values: u32,
    fully_split_value: u32,
    splits_on_inner_rules: bool,
    /// `(trigger_value, other_rule) -> required_value_for_other`
    forward: HashMap<(u32, RuleId), u32>,
    backward: HashMap<(u32, RuleId), u32>,
}

impl ConstrainedRule {
    pub fn new(id: RuleId, cost: u32, num_values: u32, fully_split_value: u32) -> Self {
        Self {
            id,
            cost,
            num_values,
            fully_split_value,
            splits_on_inner_rules: false,
            forward: HashMap::new(),
            backward: HashMap::new(),
        }
    }

    pub fn with_splits_on_inner_rules(mut self, value: bool) -> Self {
        self.splits_on_inner_rules = value;
        self
    }

    /// Whenever `self` takes `my_value`, force `other` to `required`.
    pub fn add_forward_constraint(&mut self, my_value: u32, other: RuleId, required: u32) {
        self.forward.insert((my_value, other), required);
    }

    /// Whenever `other` is queried for `my_value` and found nothing
    /// forward, try this backward mapping instead.
    pub fn add_backward_constraint(&mut self, my_value: u32, other: RuleId, required: u32) {
        self.backward.insert((my_value, other), required);
    }
}

impl Rule for ConstrainedRule {
    fn id(&self) -> RuleId {
        self.id
    }
    fn num_values(&self) -> u32 {
        self.num_values
    }
    fn cost(&self) -> u32 {
        self.cost
    }
    fn is_split(&self, value: u32, _chunk: &Chunk) -> bool {
        value != 0
    }
    fn constrain(&self, my_value: u32, other: RuleId) -> Option<u32> {
        self.forward.get(&(my_value, other)).copied()
    }
    fn reverse_constrain(&self, my_value: u32, other: RuleId) -> Option<u32> {
        self.backward.get(&(my_value, other)).copied()
    }
    fn splits_on_inner_rules(&self) -> bool {
        self.splits_on_inner_rules
    }
    fn fully_split_value(&self) -> u32 {
        self.fully_split_value
    }
}

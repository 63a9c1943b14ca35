//! A memoized, cost-minimizing line-splitting engine: given a stream of
//! text chunks annotated with [`rule::Rule`]s, searches the space of
//! legal split-point assignments for the one that minimizes total cost
//! (overflow penalties plus each triggered rule's and span's own cost),
//! then renders the chosen assignment to a string.
//!
//! The [`batch::LineWriter`] façade is the entry point for a whole chunk
//! stream: it cuts the stream into independently solvable batches at safe
//! hard splits and feeds each to a fresh [`splitter::LineSplitter`]. A
//! single batch (or a nested block's chunk sub-stream) can also be run
//! directly through `LineSplitter` without going through the façade.

pub mod batch;
pub mod chunk;
pub mod config;
pub mod line_prefix;
pub mod rule;
pub mod split_set;
pub mod splitter;
mod utils;

pub use batch::LineWriter;
pub use chunk::{Chunk, ChunkBuilder, Span, SpanId};
pub use config::{SplitterConfig, DEFAULT_OVERFLOW_CHAR_COST, DEFAULT_SPACES_PER_INDENT};
pub use line_prefix::LinePrefix;
pub use rule::{ConstrainedRule, HardSplitRule, NeverSplitRule, Rule, RuleId, RuleValue, SimpleRule};
pub use split_set::SplitSet;
#[cfg(any(test, feature = "diagnostics"))]
pub use splitter::CostBreakdown;
pub use splitter::{LineSplitter, SplitResult};
pub use utils::StrExt;

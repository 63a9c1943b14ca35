//! The atomic unit the splitter consumes: a run of text plus the split
//! metadata a [`Rule`] and the surrounding [`Span`]s attach to it.

use std::rc::Rc;

use crate::rule::Rule;

/// A cost-carrying interval over chunks. A span contributes its `cost` at
/// most once per solution, no matter how many chunks it covers split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanId(pub u32);

#[derive(Debug, Clone)]
pub struct Span {
    pub id: SpanId,
    pub cost: u32,
}

/// One unit of formatted output: text plus everything the splitter needs
/// to decide whether a newline belongs right after it.
///
/// The last chunk of any batch is the *sentinel*: empty text, no rule, no
/// spans, no block. It exists so `tryChunkRuleValues`'s base case
/// (`prefix.length == N - 1`) has something to stop at without a
/// special-cased "is this the last real chunk" check threaded through the
/// search.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub text: Rc<str>,
    pub rule: Option<Rc<dyn Rule>>,
    pub spans: Vec<Span>,
    pub block_chunks: Vec<Chunk>,
    pub space_when_unsplit: bool,
    pub is_double: bool,
    pub flush_left: bool,
    pub is_hard_split: bool,
    pub selection_start: Option<usize>,
    pub selection_end: Option<usize>,
    pub unsplit_block_length: usize,
    pub nesting: u32,
    pub absolute_indent: u32,
}

impl Chunk {
    /// Builds the sentinel chunk that must terminate every batch.
    pub fn sentinel() -> Self {
        Self {
            text: Rc::from(""),
            rule: None,
            spans: Vec::new(),
            block_chunks: Vec::new(),
            space_when_unsplit: false,
            is_double: false,
            flush_left: false,
            is_hard_split: false,
            selection_start: None,
            selection_end: None,
            unsplit_block_length: 0,
            nesting: 0,
            absolute_indent: 0,
        }
    }

    pub fn builder(text: impl Into<Rc<str>>) -> ChunkBuilder {
        ChunkBuilder::new(text.into())
    }

    pub fn rule_id(&self) -> Option<crate::rule::RuleId> {
        self.rule.as_ref().map(|r| r.id())
    }
}

/// Fluent builder collapsed into one value since a `Chunk`'s fields are
/// fixed once constructed rather than accumulated token-by-token.
#[derive(Debug, Clone)]
pub struct ChunkBuilder {
    chunk: Chunk,
}

impl ChunkBuilder {
    fn new(text: Rc<str>) -> Self {
        Self {
            chunk: Chunk {
                text,
                ..Chunk::sentinel()
            },
        }
    }

    pub fn rule(mut self, rule: Rc<dyn Rule>) -> Self {
        self.chunk.rule = Some(rule);
        self
    }

    pub fn span(mut self, span: Span) -> Self {
        self.chunk.spans.push(span);
        self
    }

    pub fn block_chunks(mut self, block_chunks: Vec<Chunk>) -> Self {
        self.chunk.block_chunks = block_chunks;
        self
    }

    pub fn space_when_unsplit(mut self, value: bool) -> Self {
        self.chunk.space_when_unsplit = value;
        self
    }

    pub fn is_double(mut self, value: bool) -> Self {
        self.chunk.is_double = value;
        self
    }

    pub fn flush_left(mut self, value: bool) -> Self {
        self.chunk.flush_left = value;
        self
    }

    pub fn is_hard_split(mut self, value: bool) -> Self {
        self.chunk.is_hard_split = value;
        self
    }

    pub fn selection(mut self, start: Option<usize>, end: Option<usize>) -> Self {
        self.chunk.selection_start = start;
        self.chunk.selection_end = end;
        self
    }

    pub fn unsplit_block_length(mut self, value: usize) -> Self {
        self.chunk.unsplit_block_length = value;
        self
    }

    pub fn nesting(mut self, value: u32) -> Self {
        self.chunk.nesting = value;
        self
    }

    pub fn absolute_indent(mut self, value: u32) -> Self {
        self.chunk.absolute_indent = value;
        self
    }

    pub fn build(self) -> Chunk {
        self.chunk
    }
}

use std::collections::HashSet;
use std::ops::Range;

use tracing::debug;

use crate::model::{Finalize, Pair, ResolveState};
use crate::reader::{PairMap, parse_str};

/// A collection the resolver can look up and rewrite pairs in.
///
/// Lookups return the first pair whose key matches exactly, in collection
/// order.
pub trait PairTable {
    fn pair_count(&self) -> usize;
    fn pair(&self, index: usize) -> &Pair;
    fn pair_mut(&mut self, index: usize) -> &mut Pair;
    fn position(&self, key: &str) -> Option<usize>;
}

impl PairTable for [Pair] {
    fn pair_count(&self) -> usize {
        self.len()
    }

    fn pair(&self, index: usize) -> &Pair {
        &self[index]
    }

    fn pair_mut(&mut self, index: usize) -> &mut Pair {
        &mut self[index]
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.iter().position(|pair| pair.key == key)
    }
}

impl PairTable for Vec<Pair> {
    fn pair_count(&self) -> usize {
        self.len()
    }

    fn pair(&self, index: usize) -> &Pair {
        &self[index]
    }

    fn pair_mut(&mut self, index: usize) -> &mut Pair {
        &mut self[index]
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.as_slice().position(key)
    }
}

impl PairTable for PairMap {
    fn pair_count(&self) -> usize {
        self.len()
    }

    fn pair(&self, index: usize) -> &Pair {
        &self[index]
    }

    fn pair_mut(&mut self, index: usize) -> &mut Pair {
        &mut self[index]
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.get_index_of(key)
    }
}

/// Outcome counts of [`finalize_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalizeReport {
    pub interpolated: usize,
    pub copied: usize,
    /// Indexes of the pairs that ended up circular.
    pub circular: Vec<usize>,
}

/// Pair currently being substituted. `text` is a working copy of its value;
/// references are consumed back to front so earlier offsets stay valid.
struct Frame {
    index: usize,
    remaining: usize,
    text: String,
}

impl Frame {
    fn new(pair: &Pair, index: usize) -> Self {
        Self {
            index,
            remaining: pair.value.references.len(),
            text: pair.value.text.clone(),
        }
    }
}

/// Replace every `${name}` in the pair at `index` with the resolved value of
/// the first pair keyed `name`, resolving that pair first when needed.
///
/// Unknown names stay literal. The walk is a depth-first search on an explicit
/// stack; reaching a pair that is still on the stack (or was already found
/// circular) returns [`Finalize::Circular`]. Substitutions made before the
/// cycle was found are kept, and every pair on the stack is marked circular so
/// later calls report the same outcome without rescanning.
pub fn finalize<T: PairTable + ?Sized>(table: &mut T, index: usize) -> Finalize {
    let value = &table.pair(index).value;
    match value.state {
        ResolveState::Resolved => return Finalize::Copied,
        ResolveState::Circular => return Finalize::Circular,
        ResolveState::Pending => {}
    }
    if value.references.is_empty() {
        table.pair_mut(index).value.state = ResolveState::Resolved;
        return Finalize::Copied;
    }

    let mut resolving = HashSet::from([index]);
    let mut stack = vec![Frame::new(table.pair(index), index)];

    while let Some(frame) = stack.last_mut() {
        if frame.remaining == 0 {
            let index = frame.index;
            let text = std::mem::take(&mut frame.text);
            stack.pop();
            resolving.remove(&index);
            let value = &mut table.pair_mut(index).value;
            value.text = text;
            value.state = ResolveState::Resolved;
            continue;
        }

        let (target, span) = lookup(table, frame.index, frame.remaining - 1);
        let Some(target) = target else {
            frame.remaining -= 1;
            continue;
        };

        let target_state = table.pair(target).value.state;
        if resolving.contains(&target) || target_state == ResolveState::Circular {
            debug!(
                key = table.pair(frame.index).key(),
                reference = table.pair(target).key(),
                "circular variable reference"
            );
            mark_circular(table, stack);
            return Finalize::Circular;
        }

        if target_state == ResolveState::Pending {
            if table.pair(target).value.references.is_empty() {
                table.pair_mut(target).value.state = ResolveState::Resolved;
            } else {
                let child = Frame::new(table.pair(target), target);
                resolving.insert(target);
                stack.push(child);
                continue;
            }
        }

        frame.text.replace_range(span, table.pair(target).value());
        frame.remaining -= 1;
    }

    Finalize::Interpolated
}

/// Resolve every pair in collection order.
pub fn finalize_all<T: PairTable + ?Sized>(table: &mut T) -> FinalizeReport {
    let mut report = FinalizeReport::default();
    for index in 0..table.pair_count() {
        match finalize(table, index) {
            Finalize::Interpolated => report.interpolated += 1,
            Finalize::Copied => report.copied += 1,
            Finalize::Circular => report.circular.push(index),
        }
    }
    report
}

/// Parse and resolve UTF-8 text in one go.
pub fn parse_str_resolved(input: &str) -> Vec<Pair> {
    let mut pairs = parse_str(input);
    finalize_all(&mut pairs);
    pairs
}

fn lookup<T: PairTable + ?Sized>(
    table: &T,
    index: usize,
    reference: usize,
) -> (Option<usize>, Range<usize>) {
    let reference = &table.pair(index).value.references[reference];
    (table.position(reference.name()), reference.span())
}

fn mark_circular<T: PairTable + ?Sized>(table: &mut T, stack: Vec<Frame>) {
    for frame in stack {
        let value = &mut table.pair_mut(frame.index).value;
        value.text = frame.text;
        value.state = ResolveState::Circular;
    }
}

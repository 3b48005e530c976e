const INITIAL_CAPACITY: usize = 256;
const MIN_CAPACITY: usize = 100;

/// Reusable accumulation buffer for one key or value scan.
///
/// Every write goes through [`ScratchBuffer::push`], which grows the backing
/// storage by half of its current capacity on overflow. Clearing keeps the
/// capacity, so discarded lines do not allocate.
#[derive(Debug)]
pub(crate) struct ScratchBuffer {
    text: String,
}

impl Default for ScratchBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ScratchBuffer {
    pub(crate) fn new() -> Self {
        Self {
            text: String::with_capacity(INITIAL_CAPACITY),
        }
    }

    pub(crate) fn push(&mut self, ch: char) {
        let needed = self.text.len() + ch.len_utf8();
        let capacity = self.text.capacity();
        if needed > capacity {
            let grown = (capacity.max(MIN_CAPACITY) * 3 / 2).max(needed);
            self.text.reserve_exact(grown - self.text.len());
        }
        self.text.push(ch);
    }

    pub(crate) fn push_repeated(&mut self, ch: char, count: usize) {
        for _ in 0..count {
            self.push(ch);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.text.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.text
    }

    /// Byte at `idx`, used only to look back at ASCII markers.
    pub(crate) fn byte_at(&self, idx: usize) -> Option<u8> {
        self.text.as_bytes().get(idx).copied()
    }

    pub(crate) fn ends_with(&self, ch: char) -> bool {
        self.text.ends_with(ch)
    }

    pub(crate) fn pop(&mut self) -> Option<char> {
        self.text.pop()
    }

    pub(crate) fn trim_end_spaces(&mut self) {
        let trimmed = self.text.trim_end_matches(' ').len();
        self.text.truncate(trimmed);
    }

    pub(crate) fn clear(&mut self) {
        self.text.clear();
    }

    /// Copy the logical content into an exactly sized owned string.
    pub(crate) fn to_owned_string(&self) -> String {
        self.text.as_str().to_owned()
    }

    #[cfg(test)]
    fn capacity(&self) -> usize {
        self.text.capacity()
    }
}

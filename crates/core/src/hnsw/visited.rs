//! Slots already popped from the frontier during one query.
//!
//! A bitset over arena slots. Only the words written during a query are
//! zeroed when the next query begins, so a thread can keep one set for the
//! lifetime of a large graph.

const WORD_BITS: usize = u64::BITS as usize;

#[derive(Debug, Default)]
pub struct ExpandedSlots {
    words: Vec<u64>,
    touched: Vec<usize>,
}

impl ExpandedSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a query over a graph of `len` slots, forgetting every previous mark.
    pub fn begin(&mut self, len: usize) {
        for word in self.touched.drain(..) {
            self.words[word] = 0;
        }
        let needed = len.div_ceil(WORD_BITS);
        if needed > self.words.len() {
            self.words.resize(needed, 0);
        }
    }

    /// Marks `slot`. Returns `false` if it was already marked in this query.
    #[inline]
    pub fn mark(&mut self, slot: u32) -> bool {
        let (word, bit) = Self::locate(slot);
        let current = self.words[word];
        if current & bit != 0 {
            return false;
        }
        if current == 0 {
            self.touched.push(word);
        }
        self.words[word] = current | bit;
        true
    }

    #[inline]
    pub fn is_marked(&self, slot: u32) -> bool {
        let (word, bit) = Self::locate(slot);
        self.words[word] & bit != 0
    }

    fn locate(slot: u32) -> (usize, u64) {
        let slot = slot as usize;
        (slot / WORD_BITS, 1u64 << (slot % WORD_BITS))
    }
}

//! Bounded LRU memo of interpolation results.
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

/// Exact query bits plus the table version the result was computed for.
///
/// Keying on bits means `0.0` and `-0.0` are different queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Key {
    version: u64,
    bits: Box<[u64]>,
}

impl Key {
    fn new(version: u64, query: &[f64]) -> Self {
        Self {
            version,
            bits: query.iter().map(|x| x.to_bits()).collect(),
        }
    }
}

/// Sentinel link for the ends of the recency list
const NIL: usize = usize::MAX;

/// A memoized result and its neighbours in recency order, by map position
#[derive(Debug, Clone)]
struct Node {
    result: Box<[f64]>,
    newer: usize,
    older: usize,
}

/// Memoized results with exact least-recently-used eviction.
///
/// Recency is a doubly linked list threaded through the map positions,
/// so lookups and stores are O(1).
///
/// Entries for older table versions are never matched again;
/// they stay until evicted.
#[derive(Debug, Clone)]
pub struct ResultCache {
    capacity: usize,
    entries: IndexMap<Key, Node, FxBuildHasher>,
    /// Most recently used position
    newest: usize,
    /// Least recently used position, the next to be evicted
    oldest: usize,
}

impl ResultCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: IndexMap::with_capacity_and_hasher(capacity.min(1024), FxBuildHasher),
            newest: NIL,
            oldest: NIL,
        }
    }

    /// Result stored for exactly this query at this table version.
    /// A hit becomes the most recently used entry.
    pub fn lookup(&mut self, version: u64, query: &[f64]) -> Option<&[f64]> {
        let i = self.entries.get_index_of(&Key::new(version, query))?;
        self.touch(i);
        Some(&self.entries[i].result[..])
    }

    pub fn store(&mut self, version: u64, query: &[f64], result: &[f64]) {
        if self.capacity == 0 {
            return;
        }
        let key = Key::new(version, query);
        if let Some(i) = self.entries.get_index_of(&key) {
            self.entries[i].result = result.into();
            self.touch(i);
            return;
        }
        while self.entries.len() >= self.capacity && self.oldest != NIL {
            self.evict(self.oldest);
        }
        let (i, _) = self.entries.insert_full(
            key,
            Node {
                result: result.into(),
                newer: NIL,
                older: NIL,
            },
        );
        self.push_newest(i);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.newest = NIL;
        self.oldest = NIL;
    }

    /// Make position `i` the most recently used
    fn touch(&mut self, i: usize) {
        if self.newest != i {
            self.unlink(i);
            self.push_newest(i);
        }
    }

    fn unlink(&mut self, i: usize) {
        let (newer, older) = (self.entries[i].newer, self.entries[i].older);
        if newer != NIL {
            self.entries[newer].older = older;
        } else {
            self.newest = older;
        }
        if older != NIL {
            self.entries[older].newer = newer;
        } else {
            self.oldest = newer;
        }
        self.entries[i].newer = NIL;
        self.entries[i].older = NIL;
    }

    fn push_newest(&mut self, i: usize) {
        self.entries[i].older = self.newest;
        self.entries[i].newer = NIL;
        if self.newest != NIL {
            self.entries[self.newest].newer = i;
        } else {
            self.oldest = i;
        }
        self.newest = i;
    }

    /// Remove position `i`. The last entry is swapped into its place and
    /// its neighbours are relinked to the new position.
    fn evict(&mut self, i: usize) {
        self.unlink(i);
        let last = self.entries.len() - 1;
        self.entries.swap_remove_index(i);
        if i == last {
            return;
        }
        let (newer, older) = (self.entries[i].newer, self.entries[i].older);
        if newer != NIL {
            self.entries[newer].older = i;
        } else {
            self.newest = i;
        }
        if older != NIL {
            self.entries[older].newer = i;
        } else {
            self.oldest = i;
        }
    }
}

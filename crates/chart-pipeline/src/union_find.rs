// File: crates/chart-pipeline/src/union_find.rs
// Summary: Quick-find connectivity index over a fixed set of integer ids.

/// Connectivity index for ids `0..size`.
///
/// Every slot holds the root of its set, so `are_connected` is a single
/// comparison. `connect` walks roots iteratively and rewrites the whole array.
/// There is no removal; rebuild the index when the underlying graph shrinks.
#[derive(Clone, Debug)]
pub struct QuickFind {
    connections: Vec<usize>,
}

impl QuickFind {
    pub fn new(size: usize) -> Self {
        Self { connections: (0..size).collect() }
    }

    pub fn len(&self) -> usize { self.connections.len() }

    pub fn is_empty(&self) -> bool { self.connections.is_empty() }

    /// # Panics
    /// If `a` or `b` is not below `len()`.
    pub fn are_connected(&self, a: usize, b: usize) -> bool {
        self.connections[a] == self.connections[b]
    }

    /// Merge the sets containing `a` and `b`; `b`'s root becomes the root.
    ///
    /// # Panics
    /// If `a` or `b` is not below `len()`.
    pub fn connect(&mut self, a: usize, b: usize) {
        let a_root = self.root_of(a);
        let b_root = self.root_of(b);
        if a_root == b_root { return; }
        for c in self.connections.iter_mut() {
            if *c == a_root { *c = b_root; }
        }
    }

    pub fn root_of(&self, mut p: usize) -> usize {
        while self.connections[p] != p {
            p = self.connections[p];
        }
        p
    }
}

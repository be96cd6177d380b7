use crate::*;

/// Number of leaves a tree of the given depth can hold
pub fn tree_capacity(depth: u8) -> usize {
    ARITY.checked_pow(depth as u32).unwrap_or(usize::MAX)
}

/// Roots of empty subtrees, `zeros[l]` being the root of an empty subtree of height `l`
pub fn zero_roots(zero_value: HashBytes, depth: u8) -> Vec<HashBytes> {
    let mut zeros = Vec::with_capacity(depth as usize + 1);
    let mut current = zero_value;
    zeros.push(current);
    for _ in 0..depth {
        current = hash5(&[current; ARITY]);
        zeros.push(current);
    }
    zeros
}

/// An incremental Merkle tree of arity 5
///
/// Leaves are appended left to right. Unfilled positions hold the zero value, so the
/// root of a tree always covers `5^depth` leaves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncrementalQuinTree {
    depth: u8,
    zeros: Vec<HashBytes>,

    // nodes[0] are the leaves, nodes[depth] holds at most the root
    nodes: Vec<Vec<HashBytes>>,
}

impl IncrementalQuinTree {
    pub fn new(depth: u8, zero_value: HashBytes) -> Self {
        IncrementalQuinTree {
            depth,
            zeros: zero_roots(zero_value, depth),
            nodes: vec![vec![]; depth as usize + 1],
        }
    }

    /// Build a tree from a list of leaves
    pub fn from_leaves(depth: u8, zero_value: HashBytes, leaves: &[HashBytes]) -> Result<Self, Error> {
        let mut tree = IncrementalQuinTree::new(depth, zero_value);
        for leaf in leaves {
            tree.insert(*leaf)?;
        }
        Ok(tree)
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn capacity(&self) -> usize {
        tree_capacity(self.depth)
    }

    pub fn num_leaves(&self) -> usize {
        self.nodes[0].len()
    }

    pub fn leaf(&self, index: usize) -> Option<&HashBytes> {
        self.nodes[0].get(index)
    }

    pub fn root(&self) -> HashBytes {
        match self.nodes[self.depth as usize].first() {
            Some(root) => *root,
            None => self.zeros[self.depth as usize],
        }
    }

    /// Append a leaf, returning its index
    pub fn insert(&mut self, leaf: HashBytes) -> Result<usize, Error> {
        let index = self.num_leaves();
        if index >= self.capacity() {
            return Err(Error::TreeFull(self.depth));
        }
        self.nodes[0].push(leaf);
        self.recompute_path(index);

        Ok(index)
    }

    /// Replace an existing leaf
    pub fn update(&mut self, index: usize, leaf: HashBytes) -> Result<(), Error> {
        if index >= self.num_leaves() {
            return Err(Error::LeafIndexOutOfRange(index));
        }
        self.nodes[0][index] = leaf;
        self.recompute_path(index);

        Ok(())
    }

    fn recompute_path(&mut self, mut index: usize) {
        for level in 0..self.depth as usize {
            let parent = index / ARITY;
            let first_child = parent * ARITY;

            let mut children = [self.zeros[level]; ARITY];
            for (i, child) in children.iter_mut().enumerate() {
                if let Some(node) = self.nodes[level].get(first_child + i) {
                    *child = *node;
                }
            }
            let node = hash5(&children);

            let parents = &mut self.nodes[level + 1];
            if parent == parents.len() {
                parents.push(node);
            } else {
                parents[parent] = node;
            }
            index = parent;
        }
    }
}

/// Root of a tree of the given depth holding `leaves`
pub fn compute_root(depth: u8, zero_value: HashBytes, leaves: &[HashBytes]) -> Result<HashBytes, Error> {
    Ok(IncrementalQuinTree::from_leaves(depth, zero_value, leaves)?.root())
}

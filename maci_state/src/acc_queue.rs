use crate::*;
use std::collections::BTreeMap;

/// Maximum depth an accumulator queue may be merged to
pub const MAX_ACC_QUEUE_DEPTH: u8 = 32;

/// An accumulator queue
///
/// Leaves are enqueued into fixed-size subtrees of depth `sub_depth`. Once enqueuing is
/// finished the subtree roots are merged (optionally over several calls) into a small
/// tree, which is then extended with zero subtrees up to the requested depth. The root
/// at any depth equals the root of an `IncrementalQuinTree` holding the same leaves.
#[derive(Clone, Debug)]
pub struct AccQueue {
    sub_depth: u8,
    zeros: Vec<HashBytes>,

    num_leaves: usize,
    current_subtree: Vec<HashBytes>,
    sub_roots: Vec<HashBytes>,

    // Built while the sub roots are merged
    sub_root_tree: Option<IncrementalQuinTree>,
    small_root: Option<(u8, HashBytes)>,

    main_roots: BTreeMap<u8, HashBytes>,
}

impl AccQueue {
    pub fn new(sub_depth: u8, zero_value: HashBytes) -> Self {
        AccQueue {
            sub_depth,
            zeros: zero_roots(zero_value, MAX_ACC_QUEUE_DEPTH),
            num_leaves: 0,
            current_subtree: vec![],
            sub_roots: vec![],
            sub_root_tree: None,
            small_root: None,
            main_roots: BTreeMap::new(),
        }
    }

    pub fn num_leaves(&self) -> usize {
        self.num_leaves
    }

    pub fn sub_roots(&self) -> &[HashBytes] {
        &self.sub_roots
    }

    /// True once merging has started and no more leaves are accepted
    pub fn is_merged(&self) -> bool {
        self.sub_root_tree.is_some()
    }

    /// Add a leaf to the queue, returning its index
    pub fn enqueue(&mut self, leaf: HashBytes) -> Result<usize, Error> {
        if self.sub_root_tree.is_some() {
            return Err(Error::AccQueueMerged);
        }

        let index = self.num_leaves;
        self.current_subtree.push(leaf);
        self.num_leaves += 1;

        if self.current_subtree.len() == tree_capacity(self.sub_depth) {
            let root = compute_root(self.sub_depth, self.zeros[0], &self.current_subtree)?;
            self.sub_roots.push(root);
            self.current_subtree.clear();
        }

        Ok(index)
    }

    // Pad the current subtree with zeros. An empty queue still yields one subtree.
    fn fill(&mut self) -> Result<(), Error> {
        if !self.current_subtree.is_empty() || self.sub_roots.is_empty() {
            let root = compute_root(self.sub_depth, self.zeros[0], &self.current_subtree)?;
            self.sub_roots.push(root);
            self.current_subtree.clear();
        }
        Ok(())
    }

    /// Merge up to `num_ops` sub roots into the small sub-root tree (0 merges all of them).
    ///
    /// Returns true once every sub root has been merged.
    pub fn merge_sub_roots(&mut self, num_ops: usize) -> Result<bool, Error> {
        if self.small_root.is_some() {
            return Ok(true);
        }

        if self.sub_root_tree.is_none() {
            self.fill()?;

            let mut depth = 0u8;
            while tree_capacity(depth) < self.sub_roots.len() {
                depth += 1;
            }
            if self.sub_depth as usize + depth as usize > MAX_ACC_QUEUE_DEPTH as usize {
                return Err(Error::InvalidMergeDepth(self.sub_depth + depth));
            }
            self.sub_root_tree = Some(IncrementalQuinTree::new(
                depth,
                self.zeros[self.sub_depth as usize],
            ));
        }

        let limit = if num_ops == 0 { usize::MAX } else { num_ops };

        if let Some(tree) = self.sub_root_tree.as_mut() {
            let start = tree.num_leaves();
            for sub_root in self.sub_roots.iter().skip(start).take(limit) {
                tree.insert(*sub_root)?;
            }

            if tree.num_leaves() == self.sub_roots.len() {
                self.small_root = Some((self.sub_depth + tree.depth(), tree.root()));
            }
        }

        Ok(self.small_root.is_some())
    }

    /// Compute the root of the whole queue at the given depth
    pub fn merge(&mut self, depth: u8) -> Result<HashBytes, Error> {
        if depth > MAX_ACC_QUEUE_DEPTH {
            return Err(Error::InvalidMergeDepth(depth));
        }
        self.merge_sub_roots(0)?;

        let (small_depth, small_root) = self.small_root.ok_or(Error::InvalidMergeDepth(depth))?;
        if depth < small_depth {
            return Err(Error::InvalidMergeDepth(depth));
        }

        let mut root = small_root;
        for level in small_depth..depth {
            let zero = self.zeros[level as usize];
            root = hash5(&[root, zero, zero, zero, zero]);
        }

        self.main_roots.insert(depth, root);
        Ok(root)
    }

    /// The root computed by a previous `merge` at this depth
    pub fn get_root(&self, depth: u8) -> Option<HashBytes> {
        self.main_roots.get(&depth).copied()
    }
}

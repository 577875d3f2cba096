//! `MerkleTree` and `ORMapMerkleTree` for efficient anti-entropy sync.
//!
//! Both trees are fixed-depth (default 3) hex-prefix tries keyed by the
//! FNV-1a hash of the entry key. Each level branches 16 ways (one hex
//! digit). The node at `depth` is a leaf holding `key -> entryHash`;
//! intermediate nodes hold `hexDigit -> childHash`. A node's hash is the
//! `combine_hashes` (sum mod 2^32) of its children's hashes (leaves: entry
//! hashes; branches: child node hashes) -- so an empty tree's root hash is
//! `0`, matching spec.md §8's boundary case.
//!
//! `MerkleTree` (LWW-Map) and `ORMapMerkleTree` (OR-Map) share this
//! structure; only the entry-hash *formula* feeding `update` differs
//! (computed by the owning map, spec.md §4.4), so both wrap the same
//! internal trie.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::hash::{combine_hashes, fnv1a_hash, hash_to_hex};

/// A node in the prefix trie. Leaf nodes (at `depth`) populate `entries`;
/// intermediate nodes populate `children`. A node never populates both.
#[derive(Debug, Clone, Default)]
pub struct MerkleNode {
    /// This node's rolled-up hash.
    pub hash: u32,
    /// Intermediate node: hex digit -> child node.
    pub children: HashMap<char, MerkleNode>,
    /// Leaf node: key -> entry hash.
    pub entries: BTreeMap<String, u32>,
}

impl MerkleNode {
    fn recompute_leaf_hash(&mut self) {
        let hashes: Vec<u32> = self.entries.values().copied().collect();
        self.hash = combine_hashes(&hashes);
    }

    fn recompute_branch_hash(&mut self) {
        let hashes: Vec<u32> = self.children.values().map(|c| c.hash).collect();
        self.hash = combine_hashes(&hashes);
    }
}

fn key_path(key: &str, depth: usize) -> Vec<char> {
    hash_to_hex(fnv1a_hash(key)).chars().take(depth).collect()
}

fn insert_at(node: &mut MerkleNode, remaining: &[char], key: &str, entry_hash: u32) {
    match remaining.split_first() {
        None => {
            node.entries.insert(key.to_string(), entry_hash);
            node.recompute_leaf_hash();
        }
        Some((digit, rest)) => {
            let child = node.children.entry(*digit).or_default();
            insert_at(child, rest, key, entry_hash);
            node.recompute_branch_hash();
        }
    }
}

fn remove_at(node: &mut MerkleNode, remaining: &[char], key: &str) {
    match remaining.split_first() {
        None => {
            node.entries.remove(key);
            node.recompute_leaf_hash();
        }
        Some((digit, rest)) => {
            if let Some(child) = node.children.get_mut(digit) {
                remove_at(child, rest, key);
            }
            node.recompute_branch_hash();
        }
    }
}

fn get_node<'a>(root: &'a MerkleNode, path: &str) -> Option<&'a MerkleNode> {
    let mut node = root;
    for c in path.chars() {
        node = node.children.get(&c)?;
    }
    Some(node)
}

/// Shared prefix-trie implementation behind [`MerkleTree`] and
/// [`ORMapMerkleTree`].
#[derive(Debug, Clone)]
struct Trie {
    depth: usize,
    root: MerkleNode,
}

impl Trie {
    fn new(depth: usize) -> Self {
        Self { depth, root: MerkleNode::default() }
    }

    fn update(&mut self, key: &str, entry_hash: u32) {
        let path = key_path(key, self.depth);
        insert_at(&mut self.root, &path, key, entry_hash);
    }

    fn remove(&mut self, key: &str) {
        let path = key_path(key, self.depth);
        remove_at(&mut self.root, &path, key);
    }

    fn clear(&mut self) {
        self.root = MerkleNode::default();
    }

    fn root_hash(&self) -> u32 {
        self.root.hash
    }

    fn node(&self, path: &str) -> Option<&MerkleNode> {
        get_node(&self.root, path)
    }

    fn buckets(&self, path: &str) -> BTreeMap<char, u32> {
        self.node(path)
            .map(|n| n.children.iter().map(|(c, child)| (*c, child.hash)).collect())
            .unwrap_or_default()
    }

    fn keys_in_bucket(&self, path: &str) -> Vec<String> {
        self.node(path)
            .map(|n| n.entries.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn entry_hashes(&self, path: &str) -> BTreeMap<String, u32> {
        self.node(path).map(|n| n.entries.clone()).unwrap_or_default()
    }

    fn find_diff_keys(&self, path: &str, remote_entries: &BTreeMap<String, u32>) -> BTreeSet<String> {
        let local = self.entry_hashes(path);
        let mut diff = BTreeSet::new();
        for (k, h) in &local {
            if remote_entries.get(k) != Some(h) {
                diff.insert(k.clone());
            }
        }
        for (k, h) in remote_entries {
            if local.get(k) != Some(h) {
                diff.insert(k.clone());
            }
        }
        diff
    }

    fn is_leaf(&self, path: &str) -> bool {
        path.chars().count() == self.depth
    }
}

macro_rules! merkle_tree_type {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone)]
        pub struct $name {
            trie: Trie,
        }

        impl $name {
            /// Default trie depth (spec.md §4.4): 3 hex digits, 16-way
            /// branching per level.
            #[must_use]
            pub fn default_depth() -> usize {
                3
            }

            /// Creates a new tree with the given trie depth.
            #[must_use]
            pub fn new(depth: usize) -> Self {
                Self { trie: Trie::new(depth) }
            }

            /// Inserts or replaces the entry hash for `key`, recomputing
            /// hashes from the leaf up to the root.
            pub fn update(&mut self, key: &str, entry_hash: u32) {
                self.trie.update(key, entry_hash);
            }

            /// Bulk-loads `(key, entry_hash)` pairs, replacing the tree's
            /// current contents.
            pub fn update_from_map<'a, I>(&mut self, entries: I)
            where
                I: IntoIterator<Item = (&'a str, u32)>,
            {
                self.trie.clear();
                for (key, hash) in entries {
                    self.trie.update(key, hash);
                }
            }

            /// Removes `key`'s entry hash, recomputing hashes up to the
            /// root. A no-op if the key was not present.
            pub fn remove(&mut self, key: &str) {
                self.trie.remove(key);
            }

            /// Drops all entries; root hash becomes 0.
            pub fn clear(&mut self) {
                self.trie.clear();
            }

            /// The root node's hash. `0` for an empty tree.
            #[must_use]
            pub fn get_root_hash(&self) -> u32 {
                self.trie.root_hash()
            }

            /// Looks up the node at a hex-digit path (root is `""`).
            #[must_use]
            pub fn get_node(&self, path: &str) -> Option<&MerkleNode> {
                self.trie.node(path)
            }

            /// Child hex-digit -> child hash at an intermediate node.
            #[must_use]
            pub fn get_buckets(&self, path: &str) -> BTreeMap<char, u32> {
                self.trie.buckets(path)
            }

            /// Keys stored in the leaf at `path`.
            #[must_use]
            pub fn get_keys_in_bucket(&self, path: &str) -> Vec<String> {
                self.trie.keys_in_bucket(path)
            }

            /// `key -> entryHash` for the leaf at `path`.
            #[must_use]
            pub fn get_entry_hashes(&self, path: &str) -> BTreeMap<String, u32> {
                self.trie.entry_hashes(path)
            }

            /// Given the remote peer's entry hashes for the leaf at
            /// `path`, returns the set of keys whose hash differs (present
            /// with a different hash, or present on only one side).
            #[must_use]
            pub fn find_diff_keys(
                &self,
                path: &str,
                remote_entries: &BTreeMap<String, u32>,
            ) -> BTreeSet<String> {
                self.trie.find_diff_keys(path, remote_entries)
            }

            /// `true` if `path` addresses a leaf (i.e. has length equal to
            /// the tree's depth).
            #[must_use]
            pub fn is_leaf(&self, path: &str) -> bool {
                self.trie.is_leaf(path)
            }
        }
    };
}

merkle_tree_type!(MerkleTree, "Merkle trie for an `LWWMap`.");
merkle_tree_type!(ORMapMerkleTree, "Merkle trie for an `ORMap`.");

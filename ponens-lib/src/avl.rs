// Copyright 2022 University College London

// This file is part of Ponens.

// Ponens is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// Ponens is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with Ponens.  If not, see <https://www.gnu.org/licenses/>.

//! Order-statistic AVL tree.
//!
//! The given-clause selectors need more than a sorted set: the SOS-limit
//! policy asks "what place would this clause take" (`position`) and the
//! random selector order asks for "the n-th smallest" (`nth`).  Nodes
//! carry subtree sizes so both are O(log n).  Keys are owned and unique.

use std::cmp::Ordering;

struct Node<K> {
    key: K,
    height: i32,
    size: usize,
    left: Option<Box<Node<K>>>,
    right: Option<Box<Node<K>>>,
}

pub struct AvlTree<K> {
    root: Option<Box<Node<K>>>,
}

impl<K: Ord> Default for AvlTree<K> {
    fn default() -> Self {
        AvlTree::new()
    }
}

fn height<K>(n: &Option<Box<Node<K>>>) -> i32 {
    n.as_ref().map(|n| n.height).unwrap_or(0)
}

fn size<K>(n: &Option<Box<Node<K>>>) -> usize {
    n.as_ref().map(|n| n.size).unwrap_or(0)
}

impl<K: Ord> Node<K> {
    fn update(&mut self) {
        self.height = 1 + height(&self.left).max(height(&self.right));
        self.size = 1 + size(&self.left) + size(&self.right);
    }

    fn balance_factor(&self) -> i32 {
        height(&self.left) - height(&self.right)
    }
}

fn rotate_right<K: Ord>(mut n: Box<Node<K>>) -> Box<Node<K>> {
    let mut l = n.left.take().expect("rotate_right without left child");
    n.left = l.right.take();
    n.update();
    l.right = Some(n);
    l.update();
    l
}

fn rotate_left<K: Ord>(mut n: Box<Node<K>>) -> Box<Node<K>> {
    let mut r = n.right.take().expect("rotate_left without right child");
    n.right = r.left.take();
    n.update();
    r.left = Some(n);
    r.update();
    r
}

fn rebalance<K: Ord>(mut n: Box<Node<K>>) -> Box<Node<K>> {
    n.update();
    let bf = n.balance_factor();
    if bf > 1 {
        if n.left.as_ref().unwrap().balance_factor() < 0 {
            n.left = Some(rotate_left(n.left.take().unwrap()));
        }
        rotate_right(n)
    } else if bf < -1 {
        if n.right.as_ref().unwrap().balance_factor() > 0 {
            n.right = Some(rotate_right(n.right.take().unwrap()));
        }
        rotate_left(n)
    } else {
        n
    }
}

fn insert_node<K: Ord>(n: Option<Box<Node<K>>>, key: K) -> (Box<Node<K>>, bool) {
    match n {
        None => (
            Box::new(Node {
                key,
                height: 1,
                size: 1,
                left: None,
                right: None,
            }),
            true,
        ),
        Some(mut node) => {
            let added = match key.cmp(&node.key) {
                Ordering::Less => {
                    let (child, added) = insert_node(node.left.take(), key);
                    node.left = Some(child);
                    added
                }
                Ordering::Greater => {
                    let (child, added) = insert_node(node.right.take(), key);
                    node.right = Some(child);
                    added
                }
                Ordering::Equal => false,
            };
            (rebalance(node), added)
        }
    }
}

fn take_smallest<K: Ord>(mut n: Box<Node<K>>) -> (Option<Box<Node<K>>>, Box<Node<K>>) {
    match n.left.take() {
        None => {
            let right = n.right.take();
            (right, n)
        }
        Some(left) => {
            let (rest, smallest) = take_smallest(left);
            n.left = rest;
            (Some(rebalance(n)), smallest)
        }
    }
}

fn remove_node<K: Ord>(n: Option<Box<Node<K>>>, key: &K) -> (Option<Box<Node<K>>>, bool) {
    match n {
        None => (None, false),
        Some(mut node) => match key.cmp(&node.key) {
            Ordering::Less => {
                let (child, removed) = remove_node(node.left.take(), key);
                node.left = child;
                (Some(rebalance(node)), removed)
            }
            Ordering::Greater => {
                let (child, removed) = remove_node(node.right.take(), key);
                node.right = child;
                (Some(rebalance(node)), removed)
            }
            Ordering::Equal => match (node.left.take(), node.right.take()) {
                (None, r) => (r, true),
                (l, None) => (l, true),
                (l, Some(r)) => {
                    let (rest, mut successor) = take_smallest(r);
                    successor.left = l;
                    successor.right = rest;
                    (Some(rebalance(successor)), true)
                }
            },
        },
    }
}

impl<K: Ord> AvlTree<K> {
    pub fn new() -> AvlTree<K> {
        AvlTree { root: None }
    }

    pub fn len(&self) -> usize {
        size(&self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Insert; duplicate keys are ignored.  Returns whether the key was new.
    pub fn insert(&mut self, key: K) -> bool {
        let (root, added) = insert_node(self.root.take(), key);
        self.root = Some(root);
        added
    }

    pub fn remove(&mut self, key: &K) -> bool {
        let (root, removed) = remove_node(self.root.take(), key);
        self.root = root;
        removed
    }

    pub fn smallest(&self) -> Option<&K> {
        let mut n = self.root.as_ref()?;
        while let Some(l) = n.left.as_ref() {
            n = l;
        }
        Some(&n.key)
    }

    pub fn largest(&self) -> Option<&K> {
        let mut n = self.root.as_ref()?;
        while let Some(r) = n.right.as_ref() {
            n = r;
        }
        Some(&n.key)
    }

    /// The n-th smallest key, 1-based.
    pub fn nth(&self, mut n: usize) -> Option<&K> {
        if n == 0 || n > self.len() {
            return None;
        }
        let mut node = self.root.as_ref()?;
        loop {
            let left_size = size(&node.left);
            if n <= left_size {
                node = node.left.as_ref().unwrap();
            } else if n == left_size + 1 {
                return Some(&node.key);
            } else {
                n -= left_size + 1;
                node = node.right.as_ref()?;
            }
        }
    }

    /// The 1-based place `key` occupies (or would occupy) in sorted order.
    pub fn position(&self, key: &K) -> usize {
        let mut place = 1;
        let mut node = self.root.as_ref();
        while let Some(n) = node {
            match key.cmp(&n.key) {
                Ordering::Less => node = n.left.as_ref(),
                Ordering::Equal => return place + size(&n.left),
                Ordering::Greater => {
                    place += size(&n.left) + 1;
                    node = n.right.as_ref();
                }
            }
        }
        place
    }

    pub fn clear(&mut self) {
        self.root = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_remove_and_rank() {
        let mut t = AvlTree::new();
        for k in [50, 20, 70, 10, 30, 60, 80, 25] {
            assert!(t.insert(k));
        }
        assert!(!t.insert(50));
        assert_eq!(t.len(), 8);
        assert_eq!(t.smallest(), Some(&10));
        assert_eq!(t.largest(), Some(&80));
        assert_eq!(t.nth(1), Some(&10));
        assert_eq!(t.nth(4), Some(&30));
        assert_eq!(t.nth(8), Some(&80));
        assert_eq!(t.nth(9), None);
        assert_eq!(t.position(&10), 1);
        assert_eq!(t.position(&30), 4);
        // a key not present reports the place it would take
        assert_eq!(t.position(&55), 6);
        assert!(t.remove(&30));
        assert!(!t.remove(&30));
        assert_eq!(t.len(), 7);
        assert_eq!(t.nth(4), Some(&50));
    }

    #[test]
    fn stays_balanced_under_sequential_inserts() {
        let mut t = AvlTree::new();
        for k in 0..1000 {
            t.insert(k);
        }
        assert_eq!(t.len(), 1000);
        // height of a balanced tree over 1000 keys is well under 2 log2(n)
        assert!(height(&t.root) <= 20);
        for k in (0..1000).step_by(2) {
            assert!(t.remove(&k));
        }
        assert_eq!(t.len(), 500);
        assert_eq!(t.smallest(), Some(&1));
        assert_eq!(t.nth(500), Some(&999));
    }
}

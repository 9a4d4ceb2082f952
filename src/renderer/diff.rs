//! Keyed child reconciliation.
//!
//! Brings the children of one element from the old list to the new list with
//! few output moves.
//!
//! # Algorithm
//!
//! Four cursors walk the two lists from both ends. Each round tries, in
//! order:
//!
//! 1. old start vs new start: patch, advance both
//! 2. old end vs new end: patch, retreat both
//! 3. old start vs new end: patch, move old start after old end
//! 4. old end vs new start: patch, move old end before old start
//!
//! When none match, the new start node is looked up among the remaining old
//! nodes, by key through a lazily built key map or, for unkeyed nodes, by a
//! linear scan. A hit is patched and moved before old start, and its slot is
//! marked taken; a miss is created there. Once either list is exhausted the
//! leftover new nodes are created before the node following the new end, or
//! the leftover old nodes are removed.

use std::collections::HashMap;

use super::patch::Patcher;
use crate::component::Component;
use crate::types::{Key, NodeId};
use crate::vdom::{same_vnode, VNode};

fn create_key_to_old_idx(children: &[VNode], start: usize, end: usize) -> HashMap<Key, usize> {
    let mut map = HashMap::new();
    for (i, child) in children.iter().enumerate().take(end + 1).skip(start) {
        if let Some(key) = &child.key {
            map.insert(key.clone(), i);
        }
    }
    map
}

fn find_idx_in_old(
    node: &VNode,
    old: &[VNode],
    start: usize,
    end: usize,
    taken: &[bool],
) -> Option<usize> {
    (start..=end).find(|&i| !taken[i] && same_vnode(node, &old[i]))
}

impl Patcher {
    /// Reconcile `old_ch` into `new_ch` under `parent`.
    pub(crate) fn update_children(
        &self,
        parent: NodeId,
        old_ch: &[VNode],
        new_ch: &[VNode],
        inserted: &mut Vec<Component>,
    ) {
        super::patch::check_duplicate_keys(new_ch);
        let backend = self.backend().clone();

        // Signed cursors: an end cursor may pass below zero.
        let mut old_start: isize = 0;
        let mut old_end: isize = old_ch.len() as isize - 1;
        let mut new_start: isize = 0;
        let mut new_end: isize = new_ch.len() as isize - 1;
        let mut taken = vec![false; old_ch.len()];
        let mut key_map: Option<HashMap<Key, usize>> = None;

        while old_start <= old_end && new_start <= new_end {
            let (os, oe) = (old_start as usize, old_end as usize);
            let (ns, ne) = (new_start as usize, new_end as usize);
            if taken[os] {
                old_start += 1;
                continue;
            }
            if taken[oe] {
                old_end -= 1;
                continue;
            }
            let (old_s, old_e) = (&old_ch[os], &old_ch[oe]);
            let (new_s, new_e) = (&new_ch[ns], &new_ch[ne]);

            if same_vnode(old_s, new_s) {
                self.patch_vnode(old_s, new_s, inserted);
                old_start += 1;
                new_start += 1;
            } else if same_vnode(old_e, new_e) {
                self.patch_vnode(old_e, new_e, inserted);
                old_end -= 1;
                new_end -= 1;
            } else if same_vnode(old_s, new_e) {
                self.patch_vnode(old_s, new_e, inserted);
                if let Some(elm) = new_e.elm() {
                    let after = old_e.elm().and_then(|e| backend.next_sibling(e));
                    backend.insert_before(parent, elm, after);
                }
                old_start += 1;
                new_end -= 1;
            } else if same_vnode(old_e, new_s) {
                self.patch_vnode(old_e, new_s, inserted);
                if let Some(elm) = new_s.elm() {
                    backend.insert_before(parent, elm, old_s.elm());
                }
                old_end -= 1;
                new_start += 1;
            } else {
                let found = match &new_s.key {
                    Some(key) => key_map
                        .get_or_insert_with(|| create_key_to_old_idx(old_ch, os, oe))
                        .get(key)
                        .copied()
                        .filter(|&i| i >= os && i <= oe && !taken[i]),
                    None => find_idx_in_old(new_s, old_ch, os, oe, &taken),
                };
                match found {
                    Some(i) if same_vnode(&old_ch[i], new_s) => {
                        let to_move = &old_ch[i];
                        self.patch_vnode(to_move, new_s, inserted);
                        taken[i] = true;
                        if let Some(elm) = new_s.elm() {
                            backend.insert_before(parent, elm, old_s.elm());
                        }
                    }
                    // Same key, different shape: build a fresh node.
                    _ => self.create_elm(new_s, inserted, Some(parent), old_s.elm()),
                }
                new_start += 1;
            }
        }

        if old_start > old_end {
            if new_start <= new_end {
                let reference = new_ch
                    .get((new_end + 1) as usize)
                    .and_then(VNode::elm);
                self.add_vnodes(
                    parent,
                    reference,
                    new_ch,
                    new_start as usize,
                    new_end as usize,
                    inserted,
                );
            }
        } else if new_start > new_end {
            self.remove_vnodes(old_ch, old_start as usize, old_end as usize, Some(&taken));
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

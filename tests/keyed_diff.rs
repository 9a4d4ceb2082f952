//! Property tests for child reconciliation.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use proptest::prelude::*;
use spark_view::{reset_config, MemoryBackend, NodeId, Op, Patcher, VNode};

fn dedupe(keys: Vec<u8>) -> Vec<u8> {
    let mut seen = HashSet::new();
    keys.into_iter().filter(|k| seen.insert(*k)).collect()
}

fn keyed_list(keys: &[u8]) -> VNode {
    VNode::element("ul").children(
        keys.iter()
            .map(|k| VNode::element("li").key(i64::from(*k)).text_content(format!("{k},"))),
    )
}

fn rendered(keys: &[u8]) -> String {
    keys.iter().map(|k| format!("{k},")).collect()
}

fn elms_by_key(list: &VNode, keys: &[u8]) -> HashMap<u8, Option<NodeId>> {
    keys.iter()
        .copied()
        .zip(list.child_nodes().iter().map(VNode::elm))
        .collect()
}

fn key_list() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(0u8..24, 0..16).prop_map(dedupe)
}

proptest! {
    #[test]
    fn test_keyed_patch_matches_new_order(old_keys in key_list(), new_keys in key_list()) {
        reset_config();
        let backend = Rc::new(MemoryBackend::new());
        let root = backend.create_root();
        let patcher = Patcher::new(backend.clone());

        let old = keyed_list(&old_keys);
        patcher.patch(None, Some(&old), Some(root));
        let before = elms_by_key(&old, &old_keys);
        backend.clear_ops();

        let new = keyed_list(&new_keys);
        patcher.patch(Some(&old), Some(&new), Some(root));

        prop_assert_eq!(backend.text_content(root), rendered(&new_keys));
        let ul = new.elm().unwrap();
        prop_assert_eq!(backend.children(ul).len(), new_keys.len());

        // Surviving keys keep their node; only new keys are created.
        let after = elms_by_key(&new, &new_keys);
        for key in &new_keys {
            if let Some(elm) = before.get(key) {
                prop_assert_eq!(after[key], *elm);
            }
        }
        let fresh = new_keys.iter().filter(|k| !before.contains_key(k)).count();
        let gone = old_keys.iter().filter(|k| !new_keys.contains(k)).count();
        prop_assert_eq!(
            backend.count_ops(|op| matches!(op, Op::CreateElement { .. })),
            fresh
        );
        prop_assert_eq!(backend.count_ops(Op::is_remove), gone);
    }

    #[test]
    fn test_identical_tree_issues_no_ops(keys in key_list()) {
        reset_config();
        let backend = Rc::new(MemoryBackend::new());
        let root = backend.create_root();
        let patcher = Patcher::new(backend.clone());

        let old = keyed_list(&keys).class("list").attr("role", "list");
        patcher.patch(None, Some(&old), Some(root));
        backend.clear_ops();

        let new = keyed_list(&keys).class("list").attr("role", "list");
        patcher.patch(Some(&old), Some(&new), Some(root));
        prop_assert!(backend.ops().is_empty());
    }

    #[test]
    fn test_unkeyed_patch_reuses_positions(old_len in 0usize..10, new_len in 0usize..10) {
        reset_config();
        let backend = Rc::new(MemoryBackend::new());
        let root = backend.create_root();
        let patcher = Patcher::new(backend.clone());
        let list = |n: usize, offset: usize| {
            VNode::element("ul").children(
                (0..n).map(|i| VNode::element("li").text_content((i + offset).to_string())),
            )
        };

        let old = list(old_len, 0);
        patcher.patch(None, Some(&old), Some(root));
        backend.clear_ops();
        let new = list(new_len, 100);
        patcher.patch(Some(&old), Some(&new), Some(root));

        // Shared positions are rewritten in place; created items set their text once.
        let shared = old_len.min(new_len);
        prop_assert_eq!(backend.count_ops(Op::is_text_update), new_len);
        prop_assert_eq!(backend.count_ops(Op::is_insert), new_len - shared);
        prop_assert_eq!(backend.count_ops(Op::is_remove), old_len - shared);
    }
}

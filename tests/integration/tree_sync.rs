//! Root replacement, resolution and reconciliation

use super::support::*;
use canopy::{DomainObject, RootState};

#[tokio::test]
async fn test_leaf_root_renders_no_nodes() {
    let gestures = RecordingGestures::new();
    let view = view_with(&gestures);
    let mutation = SpyMutation::new();

    view.set_root(Some(plain("doc", &mutation)));
    view.settled().await;

    assert_eq!(view.root_state(), RootState::Leaf);
    assert_eq!(view.elements().child_element_count(), 0);
    assert!(!view.is_listening());
    assert_eq!(mutation.listens(), 0);
}

#[tokio::test]
async fn test_composite_root_renders_children_in_order() {
    let gestures = RecordingGestures::new();
    let view = view_with(&gestures);
    let mutation = SpyMutation::new();
    let composition = ScriptedComposition::new(children(&["a", "b", "c"]));

    view.set_root(Some(composite("root", composition, &mutation)));
    view.settled().await;

    let elements = view.elements();
    assert_eq!(elements.tag(), "ul");
    assert!(elements.has_class("tree"));
    assert_eq!(elements.child_element_count(), 3);
    assert_eq!(ids(&view), vec!["a", "b", "c"]);
    assert_eq!(gestures.live(), 3);
}

#[tokio::test]
async fn test_composite_root_subscribes_once() {
    let gestures = RecordingGestures::new();
    let view = view_with(&gestures);
    let mutation = SpyMutation::new();
    let composition = ScriptedComposition::new(children(&["a"]));

    view.set_root(Some(composite("root", composition, &mutation)));
    view.settled().await;

    assert_eq!(view.root_state(), RootState::Composite);
    assert!(view.is_listening());
    assert_eq!(mutation.listens(), 1);
    assert_eq!(mutation.active(), 1);
}

#[tokio::test]
async fn test_mutation_removal_keeps_survivors() {
    let gestures = RecordingGestures::new();
    let view = view_with(&gestures);
    let mutation = SpyMutation::new();
    let composition = ScriptedComposition::new(children(&["a", "b", "c"]));
    let root = composite("root", composition.clone(), &mutation);

    view.set_root(Some(root.clone()));
    view.settled().await;
    assert_eq!(gestures.attached(), 3);

    composition.pop();
    mutation.notify_latest(&root);
    view.settled().await;

    assert_eq!(view.elements().child_element_count(), 2);
    assert_eq!(ids(&view), vec!["a", "b"]);
    // Survivors were kept, not re-rendered; only the removed node was disposed.
    assert_eq!(gestures.attached(), 3);
    assert_eq!(gestures.destroyed(), 1);
}

#[tokio::test]
async fn test_replacing_with_leaf_unlistens_once() {
    let gestures = RecordingGestures::new();
    let view = view_with(&gestures);
    let mutation = SpyMutation::new();
    let composition = ScriptedComposition::new(children(&["a", "b", "c"]));

    view.set_root(Some(composite("root", composition, &mutation)));
    view.settled().await;
    assert_eq!(view.elements().child_element_count(), 3);

    view.set_root(Some(plain("root", &mutation)));
    view.settled().await;

    assert_eq!(mutation.unlistens(), 1);
    assert_eq!(mutation.active(), 0);
    assert_eq!(view.elements().child_element_count(), 0);
    assert_eq!(gestures.live(), 0);
    assert_eq!(view.root_state(), RootState::Leaf);
}

#[tokio::test]
async fn test_setting_same_root_twice_holds_one_listener() {
    let gestures = RecordingGestures::new();
    let view = view_with(&gestures);
    let mutation = SpyMutation::new();
    let composition = ScriptedComposition::new(children(&["a", "b"]));
    let root = composite("root", composition, &mutation);

    view.set_root(Some(root.clone()));
    view.set_root(Some(root));
    view.settled().await;

    assert_eq!(mutation.listens(), 2);
    assert_eq!(mutation.active(), 1);
    assert_eq!(ids(&view), vec!["a", "b"]);
}

#[tokio::test]
async fn test_reorder_keeps_nodes() {
    let gestures = RecordingGestures::new();
    let view = view_with(&gestures);
    let mutation = SpyMutation::new();
    let items = children(&["a", "b", "c"]);
    let composition = ScriptedComposition::new(items.clone());
    let root = composite("root", composition.clone(), &mutation);

    view.set_root(Some(root.clone()));
    view.settled().await;

    composition.set(vec![items[2].clone(), items[0].clone(), items[1].clone()]);
    mutation.notify_latest(&root);
    view.settled().await;

    assert_eq!(ids(&view), vec!["c", "a", "b"]);
    assert_eq!(gestures.attached(), 3);
    assert_eq!(gestures.destroyed(), 0);
}

#[tokio::test]
async fn test_failed_resolution_keeps_nodes() {
    let gestures = RecordingGestures::new();
    let view = view_with(&gestures);
    let mutation = SpyMutation::new();
    let composition = ScriptedComposition::new(children(&["a", "b", "c"]));
    let root = composite("root", composition.clone(), &mutation);

    view.set_root(Some(root.clone()));
    view.settled().await;

    composition.fail(true);
    mutation.notify_latest(&root);
    view.settled().await;

    assert_eq!(composition.invocations(), 2);
    assert_eq!(ids(&view), vec!["a", "b", "c"]);
    assert_eq!(gestures.live(), 3);
}

#[tokio::test]
async fn test_pending_resolution_keeps_nodes() {
    let gestures = RecordingGestures::new();
    let view = view_with(&gestures);
    let mutation = SpyMutation::new();
    let composition = GatedComposition::new();
    let root = composite("root", composition.clone(), &mutation);

    view.set_root(Some(root.clone()));
    drain().await;
    composition.release_oldest(children(&["a", "b", "c"]));
    drain().await;
    assert_eq!(ids(&view), vec!["a", "b", "c"]);

    mutation.notify_latest(&root);
    drain().await;

    assert_eq!(composition.pending(), 1);
    assert_eq!(ids(&view), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_resolution_is_never_synchronous() {
    let gestures = RecordingGestures::new();
    let view = view_with(&gestures);
    let mutation = SpyMutation::new();
    let composition = ScriptedComposition::new(children(&["a"]));

    view.set_root(Some(composite("root", composition, &mutation)));
    assert!(view.node_ids().is_empty());

    view.settled().await;
    assert_eq!(ids(&view), vec!["a"]);
}

#[tokio::test]
async fn test_stale_resolution_for_replaced_root_is_discarded() {
    let gestures = RecordingGestures::new();
    let view = view_with(&gestures);
    let first_mutation = SpyMutation::new();
    let gated = GatedComposition::new();

    view.set_root(Some(composite("first", gated.clone(), &first_mutation)));
    drain().await;
    assert_eq!(gated.pending(), 1);

    let second_mutation = SpyMutation::new();
    let second = ScriptedComposition::new(children(&["x"]));
    view.set_root(Some(composite("second", second, &second_mutation)));
    drain().await;
    assert_eq!(ids(&view), vec!["x"]);

    gated.release_oldest(children(&["a", "b"]));
    drain().await;

    assert_eq!(ids(&view), vec!["x"]);
    assert_eq!(first_mutation.active(), 0);
    assert_eq!(gestures.live(), 1);
}

#[tokio::test]
async fn test_out_of_order_completions_keep_latest() {
    let gestures = RecordingGestures::new();
    let view = view_with(&gestures);
    let mutation = SpyMutation::new();
    let gated = GatedComposition::new();
    let root = composite("root", gated.clone(), &mutation);

    view.set_root(Some(root.clone()));
    drain().await;
    mutation.notify_latest(&root);
    mutation.notify_latest(&root);
    drain().await;
    assert_eq!(gated.pending(), 3);

    gated.release_newest(children(&["c"]));
    drain().await;
    assert_eq!(ids(&view), vec!["c"]);

    gated.release_oldest(children(&["a", "b"]));
    gated.release_oldest(children(&["a", "b", "d"]));
    drain().await;

    assert_eq!(ids(&view), vec!["c"]);
    assert_eq!(gestures.live(), 1);
}

#[tokio::test]
async fn test_rejected_resolution_before_first_render_leaves_empty() {
    let gestures = RecordingGestures::new();
    let view = view_with(&gestures);
    let mutation = SpyMutation::new();
    let gated = GatedComposition::new();

    view.set_root(Some(composite("root", gated.clone(), &mutation)));
    drain().await;
    gated.reject_oldest();
    view.settled().await;

    assert!(view.node_ids().is_empty());
    assert!(view.is_listening());
}

#[tokio::test]
async fn test_mutation_for_other_object_is_ignored() {
    let gestures = RecordingGestures::new();
    let view = view_with(&gestures);
    let mutation = SpyMutation::new();
    let composition = ScriptedComposition::new(children(&["a"]));

    view.set_root(Some(composite("root", composition.clone(), &mutation)));
    view.settled().await;

    mutation.notify_latest(&DomainObject::builder("intruder").build());
    view.settled().await;

    assert_eq!(composition.invocations(), 1);
    assert_eq!(ids(&view), vec!["a"]);
}

#[tokio::test]
async fn test_mutation_losing_composition_empties_tree() {
    let gestures = RecordingGestures::new();
    let view = view_with(&gestures);
    let mutation = SpyMutation::new();
    let composition = ScriptedComposition::new(children(&["a", "b"]));

    view.set_root(Some(composite("root", composition, &mutation)));
    view.settled().await;

    mutation.notify_latest(&plain("root", &mutation));
    view.settled().await;

    assert!(view.node_ids().is_empty());
    assert_eq!(gestures.live(), 0);
    assert_eq!(mutation.active(), 1);
}

#[tokio::test]
async fn test_duplicate_children_render_once() {
    let gestures = RecordingGestures::new();
    let view = view_with(&gestures);
    let mutation = SpyMutation::new();
    let a = child("a");
    let composition = ScriptedComposition::new(vec![a.clone(), child("b"), a]);

    view.set_root(Some(composite("root", composition, &mutation)));
    view.settled().await;

    assert_eq!(ids(&view), vec!["a", "b"]);
    assert_eq!(gestures.live(), 2);
}

#[tokio::test]
async fn test_clear_disposes_everything() {
    let gestures = RecordingGestures::new();
    let view = view_with(&gestures);
    let mutation = SpyMutation::new();
    let composition = ScriptedComposition::new(children(&["a", "b"]));

    view.set_root(Some(composite("root", composition, &mutation)));
    view.settled().await;
    view.clear();

    assert_eq!(view.root_state(), RootState::NoRoot);
    assert!(view.root().is_none());
    assert_eq!(view.elements().child_element_count(), 0);
    assert_eq!(mutation.active(), 0);
    assert_eq!(gestures.live(), 0);
}

#[tokio::test]
async fn test_dropping_view_releases_resources() {
    let gestures = RecordingGestures::new();
    let mutation = SpyMutation::new();
    {
        let view = view_with(&gestures);
        let composition = ScriptedComposition::new(children(&["a", "b"]));
        view.set_root(Some(composite("root", composition, &mutation)));
        view.settled().await;
        assert_eq!(gestures.live(), 2);
    }

    assert_eq!(mutation.active(), 0);
    assert_eq!(gestures.live(), 0);
}

#[tokio::test]
async fn test_expanded_child_losing_composition_drops_nested_tree() {
    let gestures = RecordingGestures::new();
    let view = view_with(&gestures);
    let root_spy = SpyMutation::new();
    let folder_spy = SpyMutation::new();
    let folder = composite("folder", ScriptedComposition::new(children(&["x"])), &folder_spy);
    let composition = ScriptedComposition::new(vec![folder]);
    let root = composite("root", composition.clone(), &root_spy);

    view.set_root(Some(root.clone()));
    view.settled().await;
    assert!(view.set_expanded(&oid("folder"), true));
    view.settled().await;
    assert_eq!(gestures.live(), 2);
    assert_eq!(folder_spy.active(), 2);

    composition.set(vec![plain("folder", &folder_spy)]);
    root_spy.notify_latest(&root);
    view.settled().await;

    let elements = view.elements();
    let item = &elements.children()[0];
    assert!(item.has_class("leaf"));
    assert!(!item.has_class("expanded"));
    assert!(elements.find_by_class("tree").is_empty());
    assert_eq!(gestures.live(), 1);
    assert_eq!(folder_spy.active(), 1);
}

#[tokio::test]
async fn test_expanded_child_follows_newer_instance() {
    let gestures = RecordingGestures::new();
    let view = view_with(&gestures);
    let root_spy = SpyMutation::new();
    let folder_spy = SpyMutation::new();
    let first = ScriptedComposition::new(children(&["x"]));
    let composition = ScriptedComposition::new(vec![composite("folder", first.clone(), &folder_spy)]);
    let root = composite("root", composition.clone(), &root_spy);

    view.set_root(Some(root.clone()));
    view.settled().await;
    view.set_expanded(&oid("folder"), true);
    view.settled().await;

    let second = ScriptedComposition::new(children(&["y", "z"]));
    composition.set(vec![composite("folder", second.clone(), &folder_spy)]);
    root_spy.notify_latest(&root);
    view.settled().await;

    let elements = view.elements();
    assert!(elements.children()[0].has_class("expanded"));
    let nested = elements.find_by_class("tree");
    assert_eq!(nested.len(), 1);
    assert_eq!(nested[0].child_element_count(), 2);
    assert_eq!(first.invocations(), 1);
    assert_eq!(second.invocations(), 1);
    assert_eq!(folder_spy.active(), 2);
    assert_eq!(gestures.live(), 3);
}

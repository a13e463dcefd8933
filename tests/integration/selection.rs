//! Single selection and selection observers

use super::support::*;
use canopy::{DomainObject, ObjectId};
use parking_lot::Mutex;
use std::sync::Arc;

async fn three_item_view(
    gestures: &Arc<RecordingGestures>,
) -> (canopy::TreeView, Vec<DomainObject>, Arc<ScriptedComposition>, DomainObject, Arc<SpyMutation>) {
    let view = view_with(gestures);
    let mutation = SpyMutation::new();
    let items = children(&["a", "b", "c"]);
    let composition = ScriptedComposition::new(items.clone());
    let root = composite("root", composition.clone(), &mutation);
    view.set_root(Some(root.clone()));
    view.settled().await;
    (view, items, composition, root, mutation)
}

fn recorder(view: &canopy::TreeView) -> (canopy::Unobserve, Arc<Mutex<Vec<Option<ObjectId>>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let unobserve = view.observe(move |value: Option<&DomainObject>| {
        sink.lock().push(value.map(|o| o.id().clone()));
    });
    (unobserve, seen)
}

#[tokio::test]
async fn test_selecting_marks_exactly_one_node() {
    let gestures = RecordingGestures::new();
    let (view, items, ..) = three_item_view(&gestures).await;

    view.set_value(Some(items[1].clone()));

    assert_eq!(selected_labels(&view), vec!["TItem b".to_string()]);
    assert_eq!(view.value().map(|v| v.id().clone()), Some(oid("b")));
}

#[tokio::test]
async fn test_selection_moves_between_nodes() {
    let gestures = RecordingGestures::new();
    let (view, items, ..) = three_item_view(&gestures).await;

    view.set_value(Some(items[0].clone()));
    view.set_value(Some(items[2].clone()));

    assert_eq!(selected_labels(&view), vec!["TItem c".to_string()]);
}

#[tokio::test]
async fn test_clearing_selection_removes_marker() {
    let gestures = RecordingGestures::new();
    let (view, items, ..) = three_item_view(&gestures).await;
    let (_unobserve, seen) = recorder(&view);

    view.set_value(Some(items[0].clone()));
    view.set_value(None);

    assert!(selected_labels(&view).is_empty());
    assert!(view.value().is_none());
    assert_eq!(*seen.lock(), vec![Some(oid("a")), None]);
}

#[tokio::test]
async fn test_observer_notified_until_unobserved() {
    let gestures = RecordingGestures::new();
    let (view, items, ..) = three_item_view(&gestures).await;
    let (unobserve, seen) = recorder(&view);

    view.set_value(Some(items[0].clone()));
    assert_eq!(*seen.lock(), vec![Some(oid("a"))]);

    unobserve.unobserve();
    view.set_value(Some(items[1].clone()));
    assert_eq!(seen.lock().len(), 1);
}

#[tokio::test]
async fn test_observers_notified_in_registration_order() {
    let gestures = RecordingGestures::new();
    let (view, items, ..) = three_item_view(&gestures).await;
    let order = Arc::new(Mutex::new(Vec::new()));

    let first = Arc::clone(&order);
    let _a = view.observe(move |_value: Option<&DomainObject>| first.lock().push("first"));
    let second = Arc::clone(&order);
    let _b = view.observe(move |_value: Option<&DomainObject>| second.lock().push("second"));

    view.set_value(Some(items[0].clone()));
    assert_eq!(*order.lock(), vec!["first", "second"]);
}

#[tokio::test]
async fn test_repeated_value_notifies_again() {
    let gestures = RecordingGestures::new();
    let (view, items, ..) = three_item_view(&gestures).await;
    let (_unobserve, seen) = recorder(&view);

    view.set_value(Some(items[0].clone()));
    view.set_value(Some(items[0].clone()));

    assert_eq!(seen.lock().len(), 2);
    assert_eq!(selected_labels(&view).len(), 1);
}

#[tokio::test]
async fn test_selection_survives_reorder() {
    let gestures = RecordingGestures::new();
    let (view, items, composition, root, mutation) = three_item_view(&gestures).await;

    view.set_value(Some(items[1].clone()));
    composition.set(vec![items[2].clone(), items[1].clone(), items[0].clone()]);
    mutation.notify_latest(&root);
    view.settled().await;

    assert_eq!(ids(&view), vec!["c", "b", "a"]);
    assert_eq!(selected_labels(&view), vec!["TItem b".to_string()]);
}

#[tokio::test]
async fn test_selection_applies_to_later_rendered_node() {
    let gestures = RecordingGestures::new();
    let (view, items, composition, root, mutation) = three_item_view(&gestures).await;

    let late = child("d");
    view.set_value(Some(late.clone()));
    assert!(selected_labels(&view).is_empty());

    let mut next = items.clone();
    next.push(late);
    composition.set(next);
    mutation.notify_latest(&root);
    view.settled().await;

    assert_eq!(selected_labels(&view), vec!["TItem d".to_string()]);
}

#[tokio::test]
async fn test_selected_node_removed_and_restored() {
    let gestures = RecordingGestures::new();
    let (view, items, composition, root, mutation) = three_item_view(&gestures).await;

    view.set_value(Some(items[2].clone()));
    composition.pop();
    mutation.notify_latest(&root);
    view.settled().await;
    assert!(selected_labels(&view).is_empty());

    composition.set(items.clone());
    mutation.notify_latest(&root);
    view.settled().await;
    assert_eq!(selected_labels(&view), vec!["TItem c".to_string()]);
}

#[tokio::test]
async fn test_selection_held_without_root() {
    let gestures = RecordingGestures::new();
    let view = view_with(&gestures);
    let (_unobserve, seen) = recorder(&view);

    view.set_value(Some(child("a")));

    assert_eq!(*seen.lock(), vec![Some(oid("a"))]);
    assert_eq!(view.value().map(|v| v.id().clone()), Some(oid("a")));
    assert!(selected_labels(&view).is_empty());
}

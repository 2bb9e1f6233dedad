//! Collections: membership, movement, completion detection

use cadence::detect;
use cadence::error::Error;
use cadence::lifecycle::{abort, collection, complete, create, start};
use cadence::project;
use cadence::registry;
use cadence::status::Status;

use super::helpers::*;

#[test]
fn children_travel_with_their_collection() {
    let (temp, ctx) = init_project();
    let root = temp.path();

    let cid = create::collection(&ctx, "User system").unwrap();
    let a = create::item(&ctx, "Login", Some(cid), None).unwrap();
    let b = create::item(&ctx, "Signup", Some(cid), None).unwrap();

    // Starting one child moves the whole collection directory.
    start::run(&ctx, a).unwrap();
    let dir = project::work_dir(root).join("2-in-progress/collection-01_user-system");
    assert!(dir.join("_collection.md").exists());
    assert!(dir.join("item-01_login.md").exists());
    assert!(dir.join("item-02_signup.md").exists());

    // The sibling activates in place, no further renames.
    start::run(&ctx, b).unwrap();
    assert!(dir.join("item-02_signup.md").exists());
}

#[test]
fn completion_is_gated_on_the_detector() {
    let (temp, ctx) = init_project();
    let root = temp.path();

    let cid = create::collection(&ctx, "Payments").unwrap();
    let a = create::item(&ctx, "Stripe", Some(cid), None).unwrap();
    let b = create::item(&ctx, "Refunds", Some(cid), None).unwrap();

    start::run(&ctx, a).unwrap();
    complete::run(&ctx, a, &no_tag()).unwrap();

    // One child still unfinished: refusal lists exactly that child.
    let err = collection::complete(&ctx, cid).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("item-02_refunds.md"));
    assert!(!msg.contains("[ ] item-01_stripe"));

    start::run(&ctx, b).unwrap();
    abort::run(&ctx, b, "descoped").unwrap();

    // done + aborted counts as complete.
    collection::complete(&ctx, cid).unwrap();
    let done_dir = project::work_dir(root).join("3-done/collection-01_payments");
    assert!(done_dir.join("item-01_stripe--done.md").exists());
    assert!(done_dir.join("item-02_refunds--aborted.md").exists());

    let reg = registry::load(root).unwrap();
    let entry = reg.collection(cid).unwrap();
    assert_eq!(entry.status, Status::Done);
    assert_eq!(entry.completed_children, 1);
    assert_eq!(entry.total_children, 2);

    collection::archive(&ctx, cid).unwrap();
    assert!(project::work_dir(root)
        .join("6-archived/collection-01_payments")
        .is_dir());
}

#[test]
fn empty_collection_is_never_complete() {
    let (_temp, ctx) = init_project();
    let cid = create::collection(&ctx, "Placeholder").unwrap();
    collection::start(&ctx, cid).unwrap();

    let err = collection::complete(&ctx, cid).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[test]
fn malformed_suffix_blocks_completion_visibly() {
    let (temp, ctx) = init_project();
    let root = temp.path();

    let cid = create::collection(&ctx, "Odd").unwrap();
    let a = create::item(&ctx, "Fine", Some(cid), None).unwrap();
    start::run(&ctx, a).unwrap();
    complete::run(&ctx, a, &no_tag()).unwrap();

    // Simulate a hand-renamed file with a marker the codec does not know.
    let dir = project::work_dir(root).join("2-in-progress/collection-01_odd");
    std::fs::write(dir.join("item-09_weird--paused.md"), "---\nitem: 9\n---\n").unwrap();

    let scan = detect::scan_collection(&dir).unwrap();
    assert!(!scan.is_complete());
    let bad = scan
        .children
        .iter()
        .find(|c| c.name.contains("--paused"))
        .unwrap();
    assert!(bad.malformed.is_some());

    let err = collection::complete(&ctx, cid).unwrap_err();
    assert!(err.to_string().contains("MALFORMED"));
}

#[test]
fn completed_children_counter_is_idempotent() {
    let (temp, ctx) = init_project();
    let root = temp.path();

    let cid = create::collection(&ctx, "Core").unwrap();
    let a = create::item(&ctx, "Only child", Some(cid), None).unwrap();
    start::run(&ctx, a).unwrap();
    complete::run(&ctx, a, &no_tag()).unwrap();

    // Re-applying the terminal status through the registry directly must
    // not double-count.
    registry::upsert_work_item(
        root,
        a,
        registry::WorkItemUpdate {
            status: Some(Status::Done),
            ..Default::default()
        },
    )
    .unwrap();

    let reg = registry::load(root).unwrap();
    assert_eq!(reg.collection(cid).unwrap().completed_children, 1);
}

#[test]
fn adopting_an_item_updates_both_sides() {
    let (temp, ctx) = init_project();
    let root = temp.path();

    let cid = create::collection(&ctx, "Grab bag").unwrap();
    let id = create::item(&ctx, "Stray", None, None).unwrap();
    collection::add(&ctx, id, cid).unwrap();

    assert!(project::work_dir(root)
        .join("1-todo/collection-01_grab-bag/item-01_stray.md")
        .exists());
    let reg = registry::load(root).unwrap();
    assert_eq!(reg.work_item(id).unwrap().collection, Some(cid));
    assert_eq!(reg.collection(cid).unwrap().total_children, 1);
}

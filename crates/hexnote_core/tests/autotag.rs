use hexnote_core::db::open_db_in_memory;
use hexnote_core::{
    Annotations, EntryRepository, SqliteEntryRepository, TagRepository, TagService,
    TagServiceError,
};
use serde_json::json;

#[test]
fn registering_tag_annotates_matching_entries_only() {
    let mut conn = open_db_in_memory().unwrap();
    let (golang, other) = {
        let mut repo = SqliteEntryRepository::try_new(&mut conn).unwrap();
        let golang = repo
            .create_entry(&json!({}), "I love golang", &Annotations::default())
            .unwrap();
        let other = repo
            .create_entry(&json!({}), "no match", &Annotations::default())
            .unwrap();
        (golang, other)
    };

    let mut service = TagService::new(SqliteEntryRepository::try_new(&mut conn).unwrap());
    let report = service.register_tag("golang").unwrap();
    assert!(report.registration.created);
    assert_eq!(report.matched, 1);
    assert_eq!(report.newly_tagged, vec![golang.id]);
    assert!(report.skipped.is_empty());
    drop(service);

    let repo = SqliteEntryRepository::try_new(&mut conn).unwrap();
    let golang_after = repo.get_entry(golang.id).unwrap().unwrap();
    let other_after = repo.get_entry(other.id).unwrap().unwrap();
    assert!(golang_after.annotations.tags.contains("golang"));
    assert!(other_after.annotations.tags.is_empty());
    assert_eq!(golang_after.last_update, golang.last_update);
}

#[test]
fn registering_twice_is_idempotent() {
    let mut conn = open_db_in_memory().unwrap();
    let id = {
        let mut repo = SqliteEntryRepository::try_new(&mut conn).unwrap();
        repo.create_entry(&json!({}), "<p>rust and rustaceans</p>", &Annotations::default())
            .unwrap()
            .id
    };

    let mut service = TagService::new(SqliteEntryRepository::try_new(&mut conn).unwrap());
    let first = service.register_tag("rust").unwrap();
    let tags_after_first = service.list_tags().unwrap();
    let second = service.register_tag("rust").unwrap();

    assert!(first.registration.created);
    assert!(!second.registration.created);
    assert_eq!(first.registration.record, second.registration.record);
    assert!(second.newly_tagged.is_empty());
    assert_eq!(service.list_tags().unwrap(), tags_after_first);
    drop(service);

    let repo = SqliteEntryRepository::try_new(&mut conn).unwrap();
    let entry = repo.get_entry(id).unwrap().unwrap();
    assert_eq!(entry.annotations.tags.len(), 1);
}

#[test]
fn tag_listing_is_sorted_and_get_tag_finds_registered() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = TagService::new(SqliteEntryRepository::try_new(&mut conn).unwrap());
    service.register_tag("zeta").unwrap();
    service.register_tag("alpha").unwrap();

    let listed = service
        .list_tags()
        .unwrap()
        .into_iter()
        .map(|record| record.tag)
        .collect::<Vec<_>>();
    assert_eq!(listed, vec!["alpha".to_string(), "zeta".to_string()]);
    assert!(service.get_tag("alpha").unwrap().is_some());
    assert!(service.get_tag("missing").unwrap().is_none());
}

#[test]
fn blank_tag_registration_is_rejected_before_touching_store() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteEntryRepository::try_new(&mut conn).unwrap();
    let err = hexnote_core::register_tag_with(&mut repo, "  ").unwrap_err();
    assert!(matches!(err, TagServiceError::InvalidTag(_)));
    assert!(repo.list_tags().unwrap().is_empty());
}

//! End-to-end planning scenarios through the public API: edit, publish,
//! share, reopen.

use chrono::{DateTime, Duration, TimeZone, Utc};
use potluck_core::codec::{decode_state, encode_state, normalize};
use potluck_core::error::{CoreError, DecodeError};
use potluck_core::id::{IdSource, SeededIds};
use potluck_core::link::ShareLink;
use potluck_core::merge::adopt;
use potluck_core::model::{EventState, NewEvent};
use potluck_core::pipeline::{cleanup_expired, load_event, load_link, publish};
use potluck_core::store::{EventStore, FileStore, MemoryStore};

const ORIGIN: &str = "https://potluck.example";

fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).single().expect("valid")
}

fn ids() -> SeededIds {
    SeededIds::new(2025, at(2025, 7, 1, 10))
}

#[test]
fn sommerfest_item_assignment_survives_the_link() {
    let mut ids = ids();
    let organizer = MemoryStore::new();

    let event = EventState::create(
        NewEvent::new("Sommerfest", at(2025, 8, 1, 18)),
        &mut ids,
        Duration::days(365),
    )
    .expect("create");
    let event = event.add_item("Grill", &mut ids).expect("item");
    let grill = event.item_named("Grill").expect("grill").id.clone();
    let event = event.assign_item(&grill, "Lea", &mut ids).expect("assign");

    let link = publish(&event, &organizer, ORIGIN).expect("publish");
    let url = link.to_string();
    assert!(url.starts_with("https://potluck.example#/event/"));

    // A guest opens the link on another device with an empty store.
    let guest = MemoryStore::new();
    let opened = load_link(&url, &guest, ids.now()).expect("open");
    assert_eq!(opened.name, "Sommerfest");
    let assignment = opened.assignment_for(&grill).expect("assignment");
    assert_eq!(assignment.person_name, "Lea");
    assert_eq!(opened, normalize(&event));
}

#[test]
fn reassignment_leaves_one_assignment() {
    let mut ids = ids();
    let event = EventState::create(
        NewEvent::new("Grillabend", at(2025, 8, 1, 18)),
        &mut ids,
        Duration::days(365),
    )
    .and_then(|e| e.add_item("Salat", &mut ids))
    .expect("build");
    let salat = event.event_items[0].id.clone();

    let event = event
        .assign_item(&salat, "Anna", &mut ids)
        .and_then(|e| e.assign_item(&salat, "Ben", &mut ids))
        .expect("assign");

    let back = decode_state(&encode_state(&event)).expect("decode");
    assert_eq!(back.event_assignments.len(), 1);
    assert_eq!(back.event_assignments[0].person_name, "Ben");
}

#[test]
fn multi_date_votes_count_after_round_trip() {
    let mut ids = ids();
    let event = EventState::create(
        NewEvent::new("Ausflug", at(2025, 9, 6, 9))
            .with_proposed_dates(vec![at(2025, 9, 6, 9), at(2025, 9, 13, 9)]),
        &mut ids,
        Duration::days(365),
    )
    .expect("create");
    let d1 = event.proposed_dates[0].id.clone();
    let d2 = event.proposed_dates[1].id.clone();

    let event = event
        .vote_date(&d1, "Max", &mut ids)
        .and_then(|e| e.vote_date(&d1, "Mia", &mut ids))
        .and_then(|e| e.vote_date(&d2, "Max", &mut ids))
        .expect("votes");

    let back = decode_state(&encode_state(&event)).expect("decode");
    assert_eq!(back.date_vote_count(&d1), 2);
    assert_eq!(back.date_vote_count(&d2), 1);
    let ranked = back.dates_by_votes();
    assert_eq!(ranked[0].0.id, d1);
}

#[test]
fn activity_vote_twice_keeps_one_name() {
    let mut ids = ids();
    let event = EventState::create(
        NewEvent::new("Sommerfest", at(2025, 8, 1, 18)),
        &mut ids,
        Duration::days(365),
    )
    .and_then(|e| e.add_activity("Volleyball", &mut ids))
    .expect("build");
    let volleyball = event.event_activities[0].id.clone();

    let event = event
        .vote_activity(&volleyball, "Max")
        .and_then(|e| e.vote_activity(&volleyball, "Max"))
        .expect("vote");

    let back = decode_state(&encode_state(&event)).expect("decode");
    let activity = back.activity(&volleyball).expect("activity");
    assert_eq!(activity.voters, vec!["Max"]);
    assert_eq!(activity.votes, 1);
}

#[test]
fn corrupt_token_is_a_decode_error() {
    for token in ["ab$cd", "eyJhIjoi!", "😀😀", "eyJ", "W10"] {
        let err = decode_state(token).expect_err("corrupt");
        assert!(
            matches!(
                err,
                DecodeError::InvalidBase64(_)
                    | DecodeError::InvalidJson(_)
                    | DecodeError::NotARecord
            ),
            "{token}: {err:?}"
        );
    }
}

#[test]
fn concurrent_edits_last_adopted_wins() {
    let mut ids = ids();
    let base = EventState::create(
        NewEvent::new("Sommerfest", at(2025, 8, 1, 18)),
        &mut ids,
        Duration::days(365),
    )
    .expect("create");
    let base_token = encode_state(&base);

    // Two guests open the same link and edit independently.
    let anna = decode_state(&base_token)
        .expect("anna opens")
        .add_item("Kartoffelsalat", &mut ids)
        .expect("anna edits");
    let ben = decode_state(&base_token)
        .expect("ben opens")
        .add_item("Baguette", &mut ids)
        .expect("ben edits");

    let anna_token = encode_state(&anna);
    let ben_token = encode_state(&ben);

    // Anna opens Ben's newer link after sharing hers.
    let adoption = adopt(
        Some(&decode_state(&anna_token).expect("anna")),
        decode_state(&ben_token).expect("ben"),
    );
    assert!(adoption.state.item_named("Baguette").is_some());
    assert!(adoption.state.item_named("Kartoffelsalat").is_none());
    assert_eq!(adoption.discarded.items.len(), 1);
    assert_eq!(adoption.discarded.items[0].name, "Kartoffelsalat");
}

#[test]
fn expired_and_missing_events() {
    let mut ids = ids();
    let store = MemoryStore::new();
    let event = EventState::create(
        NewEvent::new("Sommerfest", at(2025, 8, 1, 18)),
        &mut ids,
        Duration::days(30),
    )
    .expect("create");
    let link = publish(&event, &store, ORIGIN).expect("publish");

    let later = at(2025, 9, 1, 10);
    let err = load_event(&event.event_code, link.token.as_deref(), &store, later)
        .expect_err("expired");
    assert!(matches!(err, CoreError::Expired { .. }));

    let err = load_event("ZZZZ9999", None, &store, later).expect_err("missing");
    assert!(matches!(err, CoreError::NotFound { .. }));

    assert_eq!(cleanup_expired(&store, later).expect("cleanup"), 1);
    assert!(store.list().expect("list").is_empty());
}

#[test]
fn link_routed_to_another_code_is_rejected_and_cleanup_stays_complete() {
    let mut ids = ids();
    let store = MemoryStore::new();
    let event = EventState::create(
        NewEvent::new("Sommerfest", at(2025, 8, 1, 18)),
        &mut ids,
        Duration::days(3),
    )
    .expect("create");
    let link = publish(&event, &store, ORIGIN).expect("publish");
    let rerouted = link
        .to_string()
        .replace(&format!("/event/{}", event.event_code), "/event/AAAAAAAA");

    let err = load_link(&rerouted, &store, at(2025, 7, 1, 12)).expect_err("rerouted");
    assert!(matches!(err, CoreError::Link(potluck_core::LinkError::CodeMismatch { .. })));
    assert_eq!(store.get("AAAAAAAA").expect("get"), None);

    let later = at(2025, 8, 10, 10);
    assert_eq!(cleanup_expired(&store, later).expect("cleanup"), 1);
    assert!(store.list().expect("list").is_empty());
}

#[test]
fn file_store_reopens_by_code_without_link() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("events.json");
    let mut ids = ids();
    let event = EventState::create(
        NewEvent::new("Sommerfest", at(2025, 8, 1, 18)),
        &mut ids,
        Duration::days(365),
    )
    .and_then(|e| e.add_item("Grill", &mut ids))
    .expect("build");

    publish(&event, &FileStore::new(&path), ORIGIN).expect("publish");

    let reopened = load_event(&event.event_code, None, &FileStore::new(&path), ids.now())
        .expect("reopen");
    assert_eq!(reopened, event);
}

#[test]
fn share_link_roundtrip_through_text() {
    let mut ids = ids();
    let event = EventState::create(
        NewEvent::new("Grillrost für Müller", at(2025, 8, 1, 18)),
        &mut ids,
        Duration::days(365),
    )
    .expect("create");
    let link = publish(&event, &MemoryStore::new(), ORIGIN).expect("publish");

    let parsed = ShareLink::parse(&link.to_string()).expect("parse");
    assert_eq!(parsed, link);
    let token = parsed.token.expect("token");
    assert_eq!(decode_state(&token).expect("decode").name, "Grillrost für Müller");
}

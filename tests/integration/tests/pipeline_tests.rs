//! End-to-end pipeline tests
//!
//! Drive a full listener over scripted wire traffic and assert on the
//! typed event stream that comes out the other end.

use courier_common::ListenError;
use courier_core::{ActorId, Event, ThreadRef};
use courier_stream::ListenerState;
use integration_tests::*;
use serde_json::json;

#[tokio::test]
async fn long_poll_frame_yields_events_in_order() {
    let frame = pull_frame(
        vec![
            delta_envelope(new_message_delta(11, 22, "first")),
            typing_envelope(33, Some(22), true),
            delta_envelope(json!({"class": "NoOp"})),
            delta_envelope(new_message_delta(11, 22, "second")),
        ],
        40,
    );

    let (handle, mut events) = start_scripted(vec![Step::Frame("pull", frame)]);

    assert_eq!(events.recv().await.unwrap().event_type(), "CONNECTED");

    let kinds: Vec<&str> = vec![
        events.recv().await.unwrap().event_type(),
        events.recv().await.unwrap().event_type(),
        events.recv().await.unwrap().event_type(),
    ];
    // The NoOp is filtered; relative order of the rest is preserved
    assert_eq!(kinds, vec!["MESSAGE", "TYPING", "MESSAGE"]);

    handle.stop();
    handle.join().await;
    assert_eq!(handle.state(), ListenerState::Stopped);
}

#[tokio::test]
async fn client_payload_tier_flows_through() {
    let payload = sync_payload(
        vec![
            new_message_delta(1, 2, "hello"),
            client_payload_delta(&reaction_inner(5, 2, "mid.$r", 0)),
        ],
        10,
        Some("tok"),
    );

    let (handle, mut events) = start_scripted(vec![Step::Frame("/t_ms", payload)]);

    assert_eq!(events.recv().await.unwrap().event_type(), "CONNECTED");
    assert_eq!(events.recv().await.unwrap().event_type(), "MESSAGE");

    match events.recv().await.unwrap() {
        Event::Reaction(e) => {
            assert_eq!(e.header.author, ActorId::new(5));
            assert_eq!(e.header.thread, ThreadRef::Group(2));
            assert_eq!(e.message_id, "mid.$r");
        }
        other => panic!("unexpected event: {}", other.event_type()),
    }

    handle.stop();
    handle.join().await;
}

#[tokio::test]
async fn participants_added_scenario() {
    let payload = sync_payload(vec![participants_added_delta(10, 20, &[31, 32])], 2, None);

    let (handle, mut events) = start_scripted(vec![Step::Frame("/t_ms", payload)]);

    assert_eq!(events.recv().await.unwrap().event_type(), "CONNECTED");
    match events.recv().await.unwrap() {
        Event::ParticipantsAdded(e) => {
            assert_eq!(e.header.author, ActorId::new(10));
            assert_eq!(e.header.thread, ThreadRef::Group(20));
            assert_eq!(e.header.at.timestamp_millis(), 1_600_000_000_000);
            assert_eq!(e.added, vec![ActorId::new(31), ActorId::new(32)]);
        }
        other => panic!("unexpected event: {}", other.event_type()),
    }

    handle.stop();
    handle.join().await;
}

#[tokio::test]
async fn admin_text_flows_through() {
    let payload = sync_payload(
        vec![admin_text_delta(
            1,
            2,
            "change_thread_theme",
            json!({"theme_color": "FFFF5CA1"}),
        )],
        3,
        None,
    );

    let (handle, mut events) = start_scripted(vec![Step::Frame("/t_ms", payload)]);

    assert_eq!(events.recv().await.unwrap().event_type(), "CONNECTED");
    match events.recv().await.unwrap() {
        Event::ColorSet(e) => assert_eq!(e.color.as_deref(), Some("FFFF5CA1")),
        other => panic!("unexpected event: {}", other.event_type()),
    }

    handle.stop();
    handle.join().await;
}

#[tokio::test]
async fn reconnect_resumes_from_furthest_point() {
    let source = ScriptedSource::new(vec![
        Step::Frame("/t_ms", sync_payload(vec![], 3, Some("tok"))),
        Step::Frame("/t_ms", sync_payload(vec![], 9, None)),
        // A stale sequence id must not move the cursor backwards
        Step::Frame("/t_ms", sync_payload(vec![], 7, None)),
        Step::Fail(ListenError::ConnectionLost("reset by peer".to_string())),
    ]);
    let connects = source.connects();

    let (handle, mut events) = courier_stream::Listener::new(
        source,
        test_config(),
        ActorId::new(999),
        1,
    )
    .start();

    // First connect, then the reconnect after the reset
    assert_eq!(events.recv().await.unwrap().event_type(), "CONNECTED");
    assert_eq!(events.recv().await.unwrap().event_type(), "CONNECTED");

    {
        let connects = connects.lock();
        assert_eq!(connects.len(), 2);
        assert!(connects[0].is_create_queue());
        assert!(!connects[1].is_create_queue(), "token was set; must resume");
        assert_eq!(connects[1].sequence_id, 9);
        assert_eq!(connects[1].body["sync_token"], json!("tok"));
    }

    handle.stop();
    handle.join().await;
}

#[tokio::test]
async fn unknown_protocol_change_degrades_without_stopping() {
    let (handle, mut events) = start_scripted(vec![
        Step::Frame(
            "/t_ms",
            sync_payload(vec![json!({"class": "BrandNewDeltaKind", "x": 1})], 2, None),
        ),
        Step::Frame("/t_ms", sync_payload(vec![new_message_delta(1, 2, "still alive")], 3, None)),
    ]);

    assert_eq!(events.recv().await.unwrap().event_type(), "CONNECTED");

    match events.recv().await.unwrap() {
        Event::Unknown(e) => {
            assert_eq!(e.source, "BrandNewDeltaKind");
            assert_eq!(e.data["x"], json!(1));
        }
        other => panic!("unexpected event: {}", other.event_type()),
    }

    // The listener kept going
    assert_eq!(events.recv().await.unwrap().event_type(), "MESSAGE");

    handle.stop();
    handle.join().await;
}

#[tokio::test]
async fn malformed_sub_payload_is_reported_not_fatal() {
    let (handle, mut events) = start_scripted(vec![
        Step::Frame(
            "/t_ms",
            sync_payload(
                vec![
                    json!({"class": "ClientPayload", "payload": [999_999]}),
                    new_message_delta(1, 2, "after the bad one"),
                ],
                2,
                None,
            ),
        ),
    ]);

    assert_eq!(events.recv().await.unwrap().event_type(), "CONNECTED");
    // The stream stays clean and the rest of the frame survives
    assert_eq!(events.recv().await.unwrap().event_type(), "MESSAGE");
    assert_eq!(handle.decode_failures(), 1);

    handle.stop();
    handle.join().await;
}

#[tokio::test]
async fn stop_produces_clean_shutdown() {
    let (handle, mut events) = start_scripted(vec![Step::Timeout, Step::Timeout]);

    assert_eq!(events.recv().await.unwrap().event_type(), "CONNECTED");
    assert_eq!(handle.state(), ListenerState::Listening);

    handle.stop();
    let seen = recv_until(&mut events, |e| e.event_type() == "DISCONNECTED").await;
    // No stray events between the stop and the shutdown notice
    assert_eq!(seen.len(), 1);

    handle.join().await;
    assert_eq!(handle.state(), ListenerState::Stopped);
    assert!(events.recv().await.is_none());
}

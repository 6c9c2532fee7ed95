// tests/pipeline_fanout.rs
mod common;

use canvas_relay::format::TRUNCATION_SUFFIX;
use canvas_relay::registry::ChannelRegistry;
use canvas_relay::{Formatter, RelayEngine};
use common::{ann, engine, MockFeed, MockTransport};

#[tokio::test]
async fn reference_message_reaches_every_channel_in_order() {
    let feed = MockFeed::new();
    let tx = MockTransport::with_channels(&[1, 2]);
    let mut eng = engine(&feed, &tx, vec![(1, vec![41013]), (2, vec![41013])])
        .with_course_names([(41013, "INF-3203".to_string())].into_iter().collect());
    eng.seed_seen().await;

    feed.push(ann(
        7,
        41013,
        "Midterm",
        "<p>Moved to Friday</p>",
        Some("https://x/y"),
    ));
    let report = eng.run_cycle().await.unwrap();
    assert_eq!(report.delivered, 2);

    let expected = "<@&ROLE>\n**New Announcement in INF-3203**\n\n**Midterm**\n\nMoved to Friday\n\n[View Announcement](https://x/y)";
    let sent = tx.sent();
    assert_eq!(
        sent,
        vec![(1, expected.to_string()), (2, expected.to_string())]
    );
}

#[tokio::test]
async fn failure_on_first_channel_does_not_block_second() {
    let feed = MockFeed::new();
    let tx = MockTransport::with_channels(&[1, 2]);
    tx.fail_channel(1, true);
    let mut eng = engine(&feed, &tx, vec![(1, vec![10]), (2, vec![10])]);
    eng.seed_seen().await;

    feed.push(ann(3, 10, "T", "b", None));
    let report = eng.run_cycle().await.unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(report.delivered, 1);
    assert_eq!(tx.sent_to(2).len(), 1);

    // Partially delivered: marked, so channel 2 never gets a duplicate.
    assert!(eng.seen().has(3));
    tx.fail_channel(1, false);
    eng.run_cycle().await.unwrap();
    assert_eq!(tx.sent_to(2).len(), 1);
    assert!(tx.sent_to(1).is_empty());
}

#[tokio::test]
async fn total_delivery_failure_is_retried_next_cycle() {
    let feed = MockFeed::new();
    let tx = MockTransport::with_channels(&[1]);
    tx.fail_channel(1, true);
    let mut eng = engine(&feed, &tx, vec![(1, vec![10])]);
    eng.seed_seen().await;

    feed.push(ann(3, 10, "T", "b", None));
    let report = eng.run_cycle().await.unwrap();
    assert_eq!(report.failed, 1);
    assert!(!eng.seen().has(3));

    tx.fail_channel(1, false);
    let report = eng.run_cycle().await.unwrap();
    assert_eq!(report.delivered, 1);
    assert!(eng.seen().has(3));
    assert_eq!(tx.sent_to(1).len(), 1);
}

#[tokio::test]
async fn channel_following_two_courses_gets_both() {
    let feed = MockFeed::new();
    let tx = MockTransport::with_channels(&[1]);
    let mut eng = engine(&feed, &tx, vec![(1, vec![10, 20])]);
    eng.seed_seen().await;

    feed.push(ann(1, 10, "From ten", "a", None));
    feed.push(ann(2, 20, "From twenty", "b", None));
    eng.run_cycle().await.unwrap();

    let sent = tx.sent_to(1);
    assert_eq!(sent.len(), 2);
    assert!(sent[0].contains("**From ten**"));
    assert!(sent[1].contains("**From twenty**"));
}

#[tokio::test]
async fn long_bodies_are_truncated_before_delivery() {
    let feed = MockFeed::new();
    let tx = MockTransport::with_channels(&[1]);
    let mut eng = RelayEngine::new(
        feed.clone(),
        tx.clone(),
        ChannelRegistry::build(vec![(1u64, vec![10u64])]),
        Formatter::new("<@&ROLE>", 400),
    );
    eng.seed_seen().await;

    let body = format!("<p>{}</p>", "very long announcement text ".repeat(200));
    feed.push(ann(1, 10, "Syllabus", &body, None));
    eng.run_cycle().await.unwrap();

    let sent = tx.sent_to(1);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].chars().count() <= 400);
    assert!(sent[0].ends_with(TRUNCATION_SUFFIX));
}

//! End-to-end ingestion scenarios against a mock feed server and a live
//! database.

use argus_classify::ClassificationService;
use argus_db::NewSource;
use argus_ingest::{FeedFetcher, ProxyRoute};
use argus_pipeline::{process_next, run_source_fetch, FetchRun, ProcessDisposition};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn feed_xml(items: &[(&str, &str)]) -> String {
    let items_xml: String = items
        .iter()
        .map(|(guid, title)| {
            format!(
                "<item><title>{title}</title>\
                 <description>Report of sabotage at the facility.</description>\
                 <link>https://feed.example/{guid}</link>\
                 <guid>{guid}</guid></item>"
            )
        })
        .collect();
    format!(
        "<?xml version=\"1.0\"?><rss version=\"2.0\"><channel>\
         <title>Scenario Wire</title><description>test feed</description>\
         {items_xml}</channel></rss>"
    )
}

fn fetcher_for(server: &MockServer) -> FeedFetcher {
    FeedFetcher::new(
        5,
        "argus-test/0.1",
        vec![ProxyRoute::Prefix {
            base: format!("{}/relay?url=", server.uri()),
        }],
    )
    .expect("fetcher construction should not fail")
}

async fn insert_feed_source(pool: &sqlx::PgPool, slug: &str) -> argus_db::SourceRow {
    argus_db::create_source(
        pool,
        &NewSource {
            name: &format!("Scenario {slug}"),
            slug,
            kind: "rss",
            url: Some("https://feed.example/rss"),
            refresh_interval_secs: 3600,
            active: true,
            priority_boost: 0,
            target_pirs: &[],
        },
    )
    .await
    .expect("source should insert")
}

#[sqlx::test(migrations = "../../migrations")]
async fn refetch_before_interval_enqueues_only_the_new_item(pool: sqlx::PgPool) {
    let server = MockServer::start().await;

    // First fetch returns two items.
    Mock::given(method("GET"))
        .and(path("/relay"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(feed_xml(&[("guid-1", "First"), ("guid-2", "Second")])),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    // Any later fetch returns the same two plus one new item.
    Mock::given(method("GET"))
        .and(path("/relay"))
        .respond_with(ResponseTemplate::new(200).set_body_string(feed_xml(&[
            ("guid-1", "First"),
            ("guid-2", "Second"),
            ("guid-3", "Third"),
        ])))
        .mount(&server)
        .await;

    let fetcher = fetcher_for(&server);
    let source = insert_feed_source(&pool, "refetch").await;

    let first = match run_source_fetch(&pool, &fetcher, source.id).await.unwrap() {
        FetchRun::Completed(outcome) => outcome,
        other => panic!("first fetch should complete, got {other:?}"),
    };
    assert_eq!(first.fetched, 2);
    assert_eq!(first.new_items, 2);

    // Manual "refresh now" before the interval elapses: the two known items
    // are duplicate no-ops, exactly one new queue entry appears.
    let second = match run_source_fetch(&pool, &fetcher, source.id).await.unwrap() {
        FetchRun::Completed(outcome) => outcome,
        other => panic!("second fetch should complete, got {other:?}"),
    };
    assert_eq!(second.fetched, 3);
    assert_eq!(second.new_items, 1);
    assert_eq!(second.duplicates, 2);

    let pending = argus_db::list_by_status(&pool, "pending", 10).await.unwrap();
    assert_eq!(pending.len(), 3, "exactly three entries total across both fetches");
}

#[sqlx::test(migrations = "../../migrations")]
async fn fetch_failures_update_source_bookkeeping(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let fetcher = fetcher_for(&server);
    let source = insert_feed_source(&pool, "failing").await;

    let consecutive_failures = match run_source_fetch(&pool, &fetcher, source.id).await.unwrap() {
        FetchRun::Failed {
            consecutive_failures,
            ..
        } => consecutive_failures,
        other => panic!("fetch through a failing proxy should fail, got {other:?}"),
    };
    assert_eq!(consecutive_failures, 1);

    let row = argus_db::get_source(&pool, source.id).await.unwrap();
    assert_eq!(row.consecutive_failures, 1);
    assert!(row.last_error.is_some());
    assert!(row.last_success_at.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn deactivated_sources_are_skipped(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    let fetcher = fetcher_for(&server);
    let source = insert_feed_source(&pool, "inactive").await;
    argus_db::set_source_active(&pool, source.id, false)
        .await
        .unwrap();

    let run = run_source_fetch(&pool, &fetcher, source.id).await.unwrap();
    assert!(matches!(run, FetchRun::Skipped));
    assert!(
        argus_db::list_by_status(&pool, "pending", 10)
            .await
            .unwrap()
            .is_empty(),
        "a deactivated source must not enqueue items"
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn ingested_items_flow_through_keyword_classification_to_review(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/relay"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(feed_xml(&[("guid-1", "Sabotage suspected at plant")])),
        )
        .mount(&server)
        .await;

    let fetcher = fetcher_for(&server);
    let source = insert_feed_source(&pool, "classify").await;
    run_source_fetch(&pool, &fetcher, source.id).await.unwrap();

    // No AI credential: the keyword fallback keeps the pipeline moving.
    let service = ClassificationService::keyword_only();
    let outcome = process_next(&pool, &service, 0)
        .await
        .unwrap()
        .expect("one entry should be pending");
    assert_eq!(outcome.disposition, ProcessDisposition::Review);

    let review = argus_db::list_pending_review(&pool).await.unwrap();
    assert_eq!(review.len(), 1);
    assert_eq!(review[0].category.as_deref(), Some("sabotage"));

    assert!(
        process_next(&pool, &service, 0).await.unwrap().is_none(),
        "queue should be drained"
    );
}

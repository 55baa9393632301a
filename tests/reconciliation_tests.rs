//! Service-level tests for the search/refresh reconciliation engine,
//! using a scripted directory so every remote call is observable.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use placedex::clients::{PlacesDirectory, RawDetails, RawPlace};
use placedex::config::Config;
use placedex::domain::UserId;
use placedex::state::SharedState;

/// Seeded admin user, first row of the users table.
const ADMIN: UserId = UserId::new(1);

struct MockDirectory {
    results: std::sync::Mutex<Vec<RawPlace>>,
    failing_ids: HashSet<String>,
    text_calls: AtomicUsize,
    detail_calls: AtomicUsize,
    text_search_fails: bool,
}

impl MockDirectory {
    fn with_results(results: Vec<RawPlace>) -> Self {
        Self {
            results: std::sync::Mutex::new(results),
            failing_ids: HashSet::new(),
            text_calls: AtomicUsize::new(0),
            detail_calls: AtomicUsize::new(0),
            text_search_fails: false,
        }
    }

    fn failing_details(mut self, ids: &[&str]) -> Self {
        self.failing_ids = ids.iter().map(ToString::to_string).collect();
        self
    }

    fn broken_text_search(mut self) -> Self {
        self.text_search_fails = true;
        self
    }

    fn text_calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }

    fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlacesDirectory for MockDirectory {
    async fn text_search(&self, _city: &str, _category: &str) -> Result<Vec<RawPlace>> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        if self.text_search_fails {
            anyhow::bail!("directory unavailable");
        }
        Ok(self.results.lock().unwrap().clone())
    }

    async fn get_details(&self, external_id: &str) -> Result<RawDetails> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_ids.contains(external_id) {
            anyhow::bail!("details failed for {external_id}");
        }
        Ok(RawDetails {
            formatted_address: Some(format!("{external_id} street")),
            website: Some(format!("https://{external_id}.example.com")),
            price_level: Some(2),
            ..RawDetails::default()
        })
    }
}

fn raw(id: &str, name: &str) -> RawPlace {
    let json = serde_json::json!({
        "place_id": id,
        "name": name,
        "formatted_address": format!("{name} address"),
        "rating": 4.2,
        "user_ratings_total": 17,
        "business_status": "OPERATIONAL",
        "types": ["bakery", "food"],
    });
    serde_json::from_value(json).unwrap()
}

async fn spawn_state(directory: Arc<MockDirectory>) -> SharedState {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    SharedState::with_directory(config, directory)
        .await
        .expect("Failed to create shared state")
}

#[tokio::test]
async fn repeated_search_hits_cache_with_a_single_remote_call() {
    let directory = Arc::new(MockDirectory::with_results(vec![
        raw("p1", "Crumb"),
        raw("p2", "Flour Power"),
    ]));
    let state = spawn_state(directory.clone()).await;

    let first = state
        .place_service
        .search(ADMIN, "Austin", "bakeries", None)
        .await
        .unwrap();
    assert!(!first.outcome.from_cache);
    assert_eq!(first.places.len(), 2);

    let second = state
        .place_service
        .search(ADMIN, "Austin", "bakeries", None)
        .await
        .unwrap();
    assert!(second.outcome.from_cache);
    assert_eq!(second.places.len(), 2);
    assert_eq!(second.id, first.id);

    assert_eq!(directory.text_calls(), 1);
    assert_eq!(directory.detail_calls(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_searches_converge_on_one_query() {
    let directory = Arc::new(MockDirectory::with_results(vec![
        raw("p1", "Crumb"),
        raw("p2", "Flour Power"),
    ]));
    let state = spawn_state(directory.clone()).await;

    // All race on the (owner, city, category) unique index; exactly one
    // insert wins, the rest re-read the winner's row.
    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let service = state.place_service.clone();
            tokio::spawn(
                async move { service.search(ADMIN, "austin", "bakeries", None).await },
            )
        })
        .collect();

    let mut ids = Vec::new();
    let mut created_count = 0;
    for task in tasks {
        let result = task.await.unwrap().unwrap();
        if !result.outcome.from_cache {
            created_count += 1;
        }
        ids.push(result.id);
    }

    assert!(ids.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(created_count, 1);
    assert_eq!(directory.text_calls(), 1);

    let queries = state.place_service.list_queries(ADMIN).await.unwrap();
    assert_eq!(queries.len(), 1);

    let settled = state.place_service.get_query(ADMIN, ids[0]).await.unwrap();
    assert_eq!(settled.places.len(), 2);
}

#[tokio::test]
async fn normalization_folds_case_and_whitespace_into_one_query() {
    let directory = Arc::new(MockDirectory::with_results(vec![raw("p1", "Crumb")]));
    let state = spawn_state(directory.clone()).await;

    let first = state
        .place_service
        .search(ADMIN, "  Austin ", "BAKERIES", None)
        .await
        .unwrap();
    let second = state
        .place_service
        .search(ADMIN, "austin", "bakeries", None)
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.city, "austin");
    assert_eq!(first.category, "bakeries");
    assert!(second.outcome.from_cache);
    assert_eq!(directory.text_calls(), 1);
}

#[tokio::test]
async fn detail_budget_bounds_remote_calls() {
    let directory = Arc::new(MockDirectory::with_results(vec![
        raw("p1", "One"),
        raw("p2", "Two"),
        raw("p3", "Three"),
        raw("p4", "Four"),
        raw("p5", "Five"),
    ]));
    let state = spawn_state(directory.clone()).await;

    let result = state
        .place_service
        .search(ADMIN, "austin", "bakeries", Some(2))
        .await
        .unwrap();

    assert_eq!(result.outcome.detail_calls, 2);
    assert_eq!(directory.detail_calls(), 2);

    let detailed: Vec<_> = result.places.iter().filter(|p| p.has_details).collect();
    assert_eq!(detailed.len(), 2);
    // Prefix of directory order
    assert_eq!(detailed[0].external_id, "p1");
    assert_eq!(detailed[1].external_id, "p2");
}

#[tokio::test]
async fn omitted_budget_means_no_detail_calls() {
    let directory = Arc::new(MockDirectory::with_results(vec![
        raw("p1", "One"),
        raw("p2", "Two"),
    ]));
    let state = spawn_state(directory.clone()).await;

    let result = state
        .place_service
        .search(ADMIN, "austin", "bakeries", None)
        .await
        .unwrap();

    assert_eq!(result.outcome.detail_calls, 0);
    assert_eq!(directory.detail_calls(), 0);
    assert!(result.places.iter().all(|p| !p.has_details));
}

#[tokio::test]
async fn detail_failure_is_partial_not_fatal() {
    let directory = Arc::new(
        MockDirectory::with_results(vec![raw("p1", "One"), raw("p2", "Two"), raw("p3", "Three")])
            .failing_details(&["p2"]),
    );
    let state = spawn_state(directory.clone()).await;

    let result = state
        .place_service
        .search(ADMIN, "austin", "bakeries", Some(3))
        .await
        .unwrap();

    assert_eq!(result.outcome.detail_calls, 3);
    assert_eq!(result.outcome.detail_failures, 1);
    assert_eq!(result.outcome.failed_external_ids, vec!["p2".to_string()]);

    let detailed: Vec<_> = result
        .places
        .iter()
        .filter(|p| p.has_details)
        .map(|p| p.external_id.clone())
        .collect();
    assert_eq!(detailed, vec!["p1".to_string(), "p3".to_string()]);
}

#[tokio::test]
async fn text_search_failure_still_persists_the_query() {
    let directory = Arc::new(MockDirectory::with_results(vec![]).broken_text_search());
    let state = spawn_state(directory.clone()).await;

    let result = state
        .place_service
        .search(ADMIN, "austin", "bakeries", None)
        .await
        .unwrap();

    assert!(result.outcome.text_search_error.is_some());
    assert!(result.places.is_empty());

    // The query row survives and is visible afterwards
    let queries = state.place_service.list_queries(ADMIN).await.unwrap();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].id, result.id);
}

#[tokio::test]
async fn noop_refresh_makes_no_remote_calls() {
    let directory = Arc::new(MockDirectory::with_results(vec![raw("p1", "One")]));
    let state = spawn_state(directory.clone()).await;

    let created = state
        .place_service
        .search(ADMIN, "austin", "bakeries", None)
        .await
        .unwrap();
    assert_eq!(directory.text_calls(), 1);

    let refreshed = state
        .place_service
        .refresh(ADMIN, created.id, false, false, None)
        .await
        .unwrap();

    assert_eq!(directory.text_calls(), 1);
    assert_eq!(directory.detail_calls(), 0);
    assert_eq!(refreshed.places.len(), 1);
    assert_eq!(refreshed.updated_at, created.updated_at);
}

#[tokio::test]
async fn refresh_merges_without_deleting() {
    let directory = Arc::new(MockDirectory::with_results(vec![
        raw("p1", "One"),
        raw("p2", "Two"),
    ]));
    let state = spawn_state(directory.clone()).await;

    let created = state
        .place_service
        .search(ADMIN, "austin", "bakeries", None)
        .await
        .unwrap();
    assert_eq!(created.places.len(), 2);

    // Next round the directory drops p2 and adds p3 with a renamed p1
    *directory.results.lock().unwrap() = vec![raw("p1", "One Renamed"), raw("p3", "Three")];

    let refreshed = state
        .place_service
        .refresh(ADMIN, created.id, true, false, None)
        .await
        .unwrap();

    let mut names: Vec<_> = refreshed
        .places
        .iter()
        .map(|p| (p.external_id.clone(), p.name.clone()))
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            ("p1".to_string(), "One Renamed".to_string()),
            ("p2".to_string(), "Two".to_string()),
            ("p3".to_string(), "Three".to_string()),
        ]
    );
}

#[tokio::test]
async fn refresh_details_fills_gaps_only() {
    let directory = Arc::new(MockDirectory::with_results(vec![
        raw("p1", "One"),
        raw("p2", "Two"),
        raw("p3", "Three"),
        raw("p4", "Four"),
        raw("p5", "Five"),
    ]));
    let state = spawn_state(directory.clone()).await;

    let created = state
        .place_service
        .search(ADMIN, "austin", "bakeries", Some(2))
        .await
        .unwrap();
    assert_eq!(directory.detail_calls(), 2);

    // Large budget, but only the 3 undetailed places should be fetched
    let refreshed = state
        .place_service
        .refresh(ADMIN, created.id, false, true, Some(10))
        .await
        .unwrap();

    assert_eq!(refreshed.outcome.detail_calls, 3);
    assert_eq!(directory.detail_calls(), 5);
    assert!(refreshed.places.iter().all(|p| p.has_details));
}

#[tokio::test]
async fn refresh_does_not_redetail_on_listing_update() {
    let directory = Arc::new(MockDirectory::with_results(vec![raw("p1", "One")]));
    let state = spawn_state(directory.clone()).await;

    let created = state
        .place_service
        .search(ADMIN, "austin", "bakeries", Some(1))
        .await
        .unwrap();
    assert_eq!(directory.detail_calls(), 1);

    // Listing refresh re-upserts p1; enrichment must skip it
    let refreshed = state
        .place_service
        .refresh(ADMIN, created.id, true, true, Some(5))
        .await
        .unwrap();

    assert_eq!(refreshed.outcome.detail_calls, 0);
    assert_eq!(directory.detail_calls(), 1);
    assert!(refreshed.places[0].has_details);
}

#[tokio::test]
async fn refresh_of_unknown_query_is_not_found() {
    let directory = Arc::new(MockDirectory::with_results(vec![]));
    let state = spawn_state(directory).await;

    let err = state
        .place_service
        .refresh(ADMIN, placedex::domain::QueryId::new(999), true, true, None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        placedex::services::PlaceError::NotFound(_)
    ));
}

#[tokio::test]
async fn queries_are_scoped_to_their_owner() {
    let directory = Arc::new(MockDirectory::with_results(vec![raw("p1", "One")]));
    let state = spawn_state(directory).await;

    let created = state
        .place_service
        .search(ADMIN, "austin", "bakeries", None)
        .await
        .unwrap();

    let other = UserId::new(2);
    let err = state
        .place_service
        .get_query(other, created.id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        placedex::services::PlaceError::NotFound(_)
    ));

    let queries = state.place_service.list_queries(other).await.unwrap();
    assert!(queries.is_empty());
}

#[tokio::test]
async fn empty_terms_are_rejected_before_any_remote_call() {
    let directory = Arc::new(MockDirectory::with_results(vec![raw("p1", "One")]));
    let state = spawn_state(directory.clone()).await;

    let err = state
        .place_service
        .search(ADMIN, "   ", "bakeries", None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        placedex::services::PlaceError::Validation(_)
    ));
    assert_eq!(directory.text_calls(), 0);

    let queries = state.place_service.list_queries(ADMIN).await.unwrap();
    assert!(queries.is_empty());
}

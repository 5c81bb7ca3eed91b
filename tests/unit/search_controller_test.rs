//! Unit tests for the SearchController against a mock query endpoint.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use research_assistant::managers::history_manager::HistoryManager;
use research_assistant::repository::{HistoryRepository, SqliteHistoryRepository};
use research_assistant::services::search_client::QueryClient;
use research_assistant::services::search_controller::SearchController;
use research_assistant::types::article::{fallback_articles, Article};
use research_assistant::types::errors::SearchError;
use research_assistant::types::session::Session;
use research_assistant::types::view::{ResultOrigin, ViewMode};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STRUCTURED: &str = concat!(
    "Searching for: **neural networks**\n",
    "Found 2 results\n",
    "\n",
    "{\"query\":\"neural networks\",\"total_results\":2,\"articles\":[",
    "{\"title\":\"Deep Residual Learning\",\"url\":\"https://arxiv.org/abs/1512.03385\",\"snippet\":\"Residual nets.\"},",
    "{\"title\":\"Dropout\",\"url\":\"https://jmlr.org/papers/v15/srivastava14a.html\",\"snippet\":\"Regularisation.\"}",
    "]}\n"
);

fn controller(server: &MockServer, repo: Option<Arc<dyn HistoryRepository>>) -> SearchController {
    let client = QueryClient::new(reqwest::Client::new(), &server.uri()).unwrap();
    SearchController::new(client, HistoryManager::new(repo.clone()), repo)
}

async fn mount_structured(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_string(STRUCTURED))
        .mount(server)
        .await;
}

#[tokio::test]
async fn blank_queries_make_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let ctl = controller(&server, None);
    for blank in ["", "   ", "\t\n"] {
        let err = ctl.submit(blank, &Session::Anonymous).await.unwrap_err();
        assert_eq!(err, SearchError::EmptyQuery);
    }
    assert!(ctl.results().is_none());
    assert_eq!(ctl.mode(), ViewMode::Idle);
    assert!(ctl.history().is_empty());
}

#[tokio::test]
async fn blank_query_leaves_previous_results_on_display() {
    let server = MockServer::start().await;
    mount_structured(&server).await;
    let ctl = controller(&server, None);
    ctl.submit("neural networks", &Session::Anonymous).await.unwrap();
    let before = ctl.results();

    assert!(ctl.submit("  ", &Session::Anonymous).await.is_err());
    assert_eq!(ctl.results(), before);
}

#[tokio::test]
async fn structured_line_is_parsed_and_recorded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_json(json!({"query": "neural networks"})))
        .respond_with(ResponseTemplate::new(200).set_body_string(STRUCTURED))
        .expect(1)
        .mount(&server)
        .await;

    let ctl = controller(&server, None);
    let outcome = ctl.submit("  neural networks ", &Session::Anonymous).await.unwrap();
    assert_eq!(outcome.origin, ResultOrigin::Live);
    assert_eq!(outcome.articles.len(), 2);
    assert_eq!(outcome.articles[0].abstract_text.as_deref(), Some("Residual nets."));
    assert_eq!(
        ctl.mode(),
        ViewMode::Fresh {
            query: "neural networks".to_string()
        }
    );

    let history = ctl.history().entries();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].query, "neural networks");
    assert_eq!(history[0].result_count, 2);
}

#[tokio::test]
async fn unparseable_stream_yields_the_fallback_set() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Searching...\nno structured output today\n{oops"))
        .mount(&server)
        .await;

    let ctl = controller(&server, None);
    let outcome = ctl.submit("anything", &Session::Anonymous).await.unwrap();
    assert_eq!(outcome.origin, ResultOrigin::Fallback);
    assert_eq!(outcome.articles, fallback_articles());
    assert_eq!(outcome.articles.len(), 5);
    assert_eq!(ctl.history().entries()[0].result_count, 5);
}

#[tokio::test]
async fn failed_request_shows_error_article_and_records_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let ctl = controller(&server, None);
    let outcome = ctl.submit("quantum", &Session::Anonymous).await.unwrap();
    assert_eq!(outcome.origin, ResultOrigin::Failed);
    assert_eq!(
        outcome.articles,
        vec![Article::error("Failed to fetch search results. Please try again.")]
    );
    assert_eq!(outcome.articles[0].title, "Error");
    assert_eq!(outcome.articles[0].url, "#");
    assert!(ctl.history().is_empty());
    assert!(!ctl.is_loading());
}

#[tokio::test]
async fn empty_result_set_is_not_recorded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"query\":\"x\",\"articles\":[]}\n"))
        .mount(&server)
        .await;

    let ctl = controller(&server, None);
    let outcome = ctl.submit("x", &Session::Anonymous).await.unwrap();
    assert_eq!(outcome.origin, ResultOrigin::Live);
    assert!(outcome.articles.is_empty());
    assert!(ctl.history().is_empty());
}

#[tokio::test]
async fn signed_in_searches_carry_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(header("authorization", "Bearer token-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(STRUCTURED))
        .expect(1)
        .mount(&server)
        .await;

    let ctl = controller(&server, None);
    let outcome = ctl
        .submit("neural networks", &Session::authenticated("user-1", "token-1"))
        .await
        .unwrap();
    assert_eq!(outcome.origin, ResultOrigin::Live);
}

#[tokio::test]
async fn overlapping_submission_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(STRUCTURED)
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;

    let ctl = controller(&server, None);
    let (first, second) = tokio::join!(
        ctl.submit("neural networks", &Session::Anonymous),
        ctl.submit("graphs", &Session::Anonymous)
    );
    assert!(first.is_ok());
    assert_eq!(second.unwrap_err(), SearchError::Busy);
    assert_eq!(ctl.history().len(), 1);
}

#[tokio::test]
async fn replay_rejected_while_searching_leaves_the_fresh_search_alone() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(STRUCTURED)
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let ctl = controller(&server, None);
    let (fresh, replay) = tokio::join!(ctl.submit("neural networks", &Session::Anonymous), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        ctl.open_history("old query", None, &Session::Anonymous).await
    });

    assert_eq!(fresh.unwrap().origin, ResultOrigin::Live);
    assert_eq!(replay.unwrap_err(), SearchError::Busy);
    assert_eq!(
        ctl.mode(),
        ViewMode::Fresh {
            query: "neural networks".to_string()
        }
    );
    assert_eq!(ctl.history().len(), 1);
    assert_eq!(ctl.results().unwrap().query, "neural networks");
}

#[tokio::test]
async fn local_store_replays_results_of_a_recorded_search() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_string(STRUCTURED))
        .expect(1)
        .mount(&server)
        .await;

    let repo: Arc<dyn HistoryRepository> = Arc::new(SqliteHistoryRepository::in_memory().unwrap());
    let ctl = controller(&server, Some(repo));
    let (_, mirror) = ctl
        .submit_tracked("neural networks", &Session::Anonymous)
        .await
        .unwrap();
    mirror.wait().await;
    let entry = ctl.history().entries()[0].clone();
    assert!(!entry.is_placeholder());

    let outcome = ctl
        .open_history(&entry.query, Some(&entry.id), &Session::Anonymous)
        .await
        .unwrap();
    assert_eq!(outcome.origin, ResultOrigin::Replayed);
    let titles: Vec<_> = outcome.articles.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, vec!["Deep Residual Learning", "Dropout"]);
    assert_eq!(outcome.articles[0].abstract_text.as_deref(), Some("Residual nets."));
}

#[tokio::test]
async fn reopening_history_replays_stored_articles_without_recording() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(STRUCTURED))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(SqliteHistoryRepository::in_memory().unwrap());
    let scope = store.scope_for(&Session::Anonymous).unwrap();
    let id = store.insert(&scope, "transformers", 2, Utc::now()).await.unwrap();
    let stored = Article {
        title: "Attention Is All You Need".to_string(),
        url: "https://www.arxiv.org/abs/1706.03762".to_string(),
        source: None,
        year: None,
        citations: None,
        abstract_text: Some("Transformers.".to_string()),
    };
    store.store_articles(&id, &[stored]).unwrap();

    let repo: Arc<dyn HistoryRepository> = store;
    let ctl = controller(&server, Some(repo));
    ctl.history().load_history(&Session::Anonymous).await.unwrap();
    let before = ctl.history().entries();

    let outcome = ctl
        .open_history("transformers", Some(&id), &Session::Anonymous)
        .await
        .unwrap();
    assert_eq!(outcome.origin, ResultOrigin::Replayed);
    assert_eq!(outcome.articles[0].source.as_deref(), Some("Arxiv.org"));
    assert!(matches!(ctl.mode(), ViewMode::Replay { .. }));
    assert_eq!(ctl.history().entries(), before);
}

#[tokio::test]
async fn reopening_without_stored_articles_reruns_the_query_without_recording() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_json(json!({"query": "neural networks"})))
        .respond_with(ResponseTemplate::new(200).set_body_string(STRUCTURED))
        .expect(1)
        .mount(&server)
        .await;

    let ctl = controller(&server, None);
    let outcome = ctl
        .open_history("neural networks", None, &Session::Anonymous)
        .await
        .unwrap();
    assert_eq!(outcome.articles.len(), 2);
    assert_eq!(
        ctl.mode(),
        ViewMode::Replay {
            query: "neural networks".to_string(),
            search_id: None
        }
    );
    assert!(ctl.history().is_empty());
}

#[tokio::test]
async fn reset_returns_to_idle() {
    let server = MockServer::start().await;
    mount_structured(&server).await;
    let ctl = controller(&server, None);
    ctl.submit("neural networks", &Session::Anonymous).await.unwrap();
    ctl.reset();
    assert_eq!(ctl.mode(), ViewMode::Idle);
    assert!(ctl.results().is_none());
}

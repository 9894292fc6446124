mod support;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use qanda::infra::http::build_router;

use support::{ALICE_ID, ALICE_TOKEN, BOB_ID, BOB_TOKEN, Harness};

fn router(harness: &Harness) -> Router {
    build_router(harness.api_state())
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("valid request"),
        None => builder.body(Body::empty()).expect("valid request"),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn get_missing_question_is_404() {
    let harness = Harness::cached();
    let response = router(&harness)
        .oneshot(request(Method::GET, "/api/questions/999", None, None))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn get_question_returns_aggregate() {
    let harness = Harness::cached();
    harness.store.seed_question(5, "Ownership", ALICE_ID);
    harness.store.seed_answer(5, "first", 0);

    let response = router(&harness)
        .oneshot(request(Method::GET, "/api/questions/5", None, None))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["questionId"], 5);
    assert_eq!(body["answers"][0]["content"], "first");
}

#[tokio::test]
async fn create_requires_a_token() {
    let harness = Harness::cached();
    let payload = json!({ "title": "Why?", "content": "Because." });

    let response = router(&harness)
        .oneshot(request(
            Method::POST,
            "/api/questions",
            None,
            Some(payload.clone()),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = router(&harness)
        .oneshot(request(
            Method::POST,
            "/api/questions",
            Some("not-a-token"),
            Some(payload),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_returns_location_and_aggregate() {
    let harness = Harness::cached();

    let response = router(&harness)
        .oneshot(request(
            Method::POST,
            "/api/questions",
            Some(ALICE_TOKEN),
            Some(json!({ "title": "  Why Rust?  ", "content": "Curious." })),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::CREATED);
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .expect("location header");
    let body = json_body(response).await;
    assert_eq!(body["title"], "Why Rust?");
    assert_eq!(body["userId"], ALICE_ID);
    assert_eq!(location, format!("/api/questions/{}", body["questionId"]));
}

#[tokio::test]
async fn create_with_blank_title_is_400() {
    let harness = Harness::cached();

    let response = router(&harness)
        .oneshot(request(
            Method::POST,
            "/api/questions",
            Some(ALICE_TOKEN),
            Some(json!({ "title": " ", "content": "Curious." })),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn only_the_author_may_update_or_delete() {
    let harness = Harness::cached();
    harness.store.seed_question(1, "Mine", ALICE_ID);

    let response = router(&harness)
        .oneshot(request(
            Method::PUT,
            "/api/questions/1",
            Some(BOB_TOKEN),
            Some(json!({ "title": "Hijacked" })),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = router(&harness)
        .oneshot(request(
            Method::DELETE,
            "/api/questions/1",
            Some(BOB_TOKEN),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = router(&harness)
        .oneshot(request(
            Method::PUT,
            "/api/questions/1",
            Some(ALICE_TOKEN),
            Some(json!({ "title": "Renamed", "content": "" })),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["title"], "Renamed");
    assert_eq!(body["content"], "Mine content");

    let response = router(&harness)
        .oneshot(request(
            Method::DELETE,
            "/api/questions/1",
            Some(ALICE_TOKEN),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = router(&harness)
        .oneshot(request(Method::GET, "/api/questions/1", None, None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn answer_to_missing_question_is_404() {
    let harness = Harness::cached();

    let response = router(&harness)
        .oneshot(request(
            Method::POST,
            "/api/questions/answer",
            Some(BOB_TOKEN),
            Some(json!({ "questionId": 77, "content": "hello" })),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn posted_answer_shows_up_on_cached_read() {
    let harness = Harness::cached();
    harness.store.seed_question(1, "Lifetimes", ALICE_ID);
    let app = router(&harness);

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/api/questions/1", None, None))
        .await
        .expect("response");
    assert_eq!(json_body(response).await["answers"], json!([]));

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/questions/answer",
            Some(BOB_TOKEN),
            Some(json!({ "questionId": 1, "content": "elision" })),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(json_body(response).await["userId"], BOB_ID);

    let response = app
        .oneshot(request(Method::GET, "/api/questions/1", None, None))
        .await
        .expect("response");
    let body = json_body(response).await;
    assert_eq!(body["answers"][0]["content"], "elision");
}

#[tokio::test]
async fn list_and_unanswered_routes() {
    let harness = Harness::cached();
    harness.store.seed_question(1, "Rust", ALICE_ID);
    harness.store.seed_question(2, "Zig", BOB_ID);
    harness.store.seed_answer(1, "answer", 0);
    let app = router(&harness);

    let response = app
        .clone()
        .oneshot(request(
            Method::GET,
            "/api/questions?includeAnswers=true",
            None,
            None,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body.as_array().map(Vec::len), Some(2));

    let response = app
        .clone()
        .oneshot(request(
            Method::GET,
            "/api/questions?search=zig&page=1&pageSize=5",
            None,
            None,
        ))
        .await
        .expect("response");
    let body = json_body(response).await;
    assert_eq!(body[0]["questionId"], 2);

    let response = app
        .oneshot(request(Method::GET, "/api/questions/unanswered", None, None))
        .await
        .expect("response");
    let body = json_body(response).await;
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["questionId"], 2);
}

#[tokio::test]
async fn storage_outage_is_503() {
    let harness = Harness::cached();
    harness.store.set_offline(true);

    let response = router(&harness)
        .oneshot(request(Method::GET, "/api/questions/1", None, None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = router(&harness)
        .oneshot(request(Method::GET, "/health", None, None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn health_is_no_content_when_storage_answers() {
    let harness = Harness::cached();

    let response = router(&harness)
        .oneshot(request(Method::GET, "/health", None, None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn events_for_missing_question_is_404() {
    let harness = Harness::cached();

    let response = router(&harness)
        .oneshot(request(Method::GET, "/api/questions/3/events", None, None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn events_stream_opens_for_existing_question() {
    let harness = Harness::cached();
    harness.store.seed_question(3, "Streams", ALICE_ID);

    let response = router(&harness)
        .oneshot(request(Method::GET, "/api/questions/3/events", None, None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("text/event-stream"));
    assert_eq!(harness.hub.subscriber_count("question:3"), 1);
}

#[tokio::test]
async fn rejected_event_streams_leave_no_topics_behind() {
    let harness = Harness::cached();
    let app = router(&harness);

    for id in 1000..1100 {
        let response = app
            .clone()
            .oneshot(request(
                Method::GET,
                &format!("/api/questions/{id}/events"),
                None,
                None,
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    assert_eq!(harness.hub.topic_count(), 0);
}

#[tokio::test]
async fn closed_event_stream_releases_its_topic() {
    let harness = Harness::cached();
    harness.store.seed_question(3, "Streams", ALICE_ID);

    let response = router(&harness)
        .oneshot(request(Method::GET, "/api/questions/3/events", None, None))
        .await
        .expect("response");
    assert_eq!(harness.hub.topic_count(), 1);

    drop(response);
    assert_eq!(harness.hub.topic_count(), 0);
}

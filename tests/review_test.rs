mod common;

use axum::http::StatusCode;
use common::{TestApp, spawn_app};
use rand::Rng;
use serde_json::{Value, json};

async fn provider(app: &TestApp, id: i64) -> Value {
    let (status, body) = app.get(&format!("/api/providers/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    body
}

async fn review(app: &TestApp, token: &str, booking_id: i64, provider_id: i64, rating: u8) -> (StatusCode, Value) {
    app.post(
        "/api/reviews",
        Some(token),
        json!({
            "providerId": provider_id,
            "bookingId": booking_id,
            "rating": rating,
            "comment": "On time and tidy",
        }),
    )
    .await
}

#[tokio::test]
async fn test_rating_recomputation() {
    let app = spawn_app().await;
    let provider_id = app.provider_for(2).await;
    let (_, token) = app.register("reviewer", false).await;

    for rating in [4, 4] {
        let booking_id = app.book(&token, provider_id, 2).await["id"].as_i64().unwrap();
        let (status, _) = review(&app, &token, booking_id, provider_id, rating).await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let before = provider(&app, provider_id).await;
    assert_eq!(before["rating"], 4);
    assert_eq!(before["reviewCount"], 2);

    // round((4 * 2 + 5) / 3) = round(4.33) = 4
    let booking_id = app.book(&token, provider_id, 2).await["id"].as_i64().unwrap();
    let (status, created) = review(&app, &token, booking_id, provider_id, 5).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["rating"], 5);
    assert_eq!(created["bookingId"], booking_id);

    let after = provider(&app, provider_id).await;
    assert_eq!(after["rating"], 4);
    assert_eq!(after["reviewCount"], 3);

    let (status, reviews) = app.get(&format!("/api/reviews/provider/{provider_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reviews.as_array().unwrap().len(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reviews_are_all_counted() {
    let app = spawn_app().await;
    let provider_id = app.provider_for(4).await;
    let rating: u8 = rand::thread_rng().gen_range(1..=5);
    const REVIEWERS: usize = 12;

    let mut submissions = Vec::new();
    for i in 0..REVIEWERS {
        let (_, token) = app.register(&format!("reviewer{i}"), false).await;
        let booking_id = app.book(&token, provider_id, 4).await["id"].as_i64().unwrap();
        submissions.push((token, booking_id));
    }

    let handles: Vec<_> = submissions
        .into_iter()
        .map(|(token, booking_id)| {
            let app = app.clone();
            tokio::spawn(async move {
                review(&app, &token, booking_id, provider_id, rating).await.0
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::CREATED);
    }

    let provider = provider(&app, provider_id).await;
    assert_eq!(provider["reviewCount"], REVIEWERS);
    assert_eq!(provider["rating"], rating);
}

#[tokio::test]
async fn test_review_rules() {
    let app = spawn_app().await;
    let provider_id = app.provider_for(5).await;
    let other_provider = app.provider_for(5).await;
    let (_, token) = app.register("owner", false).await;
    let (_, stranger) = app.register("stranger", false).await;
    let booking_id = app.book(&token, provider_id, 5).await["id"].as_i64().unwrap();

    let (status, _) = review(&app, &stranger, booking_id, provider_id, 5).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = review(&app, &token, booking_id, other_provider, 5).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for rating in [0, 6] {
        let (status, _) = review(&app, &token, booking_id, provider_id, rating).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, _) = review(&app, &token, 9_999, provider_id, 5).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post("/api/reviews", None, json!({ "providerId": provider_id, "bookingId": booking_id, "rating": 5 }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = review(&app, &token, booking_id, provider_id, 5).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, error) = review(&app, &token, booking_id, provider_id, 1).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["code"], "CONFLICT");

    let provider = provider(&app, provider_id).await;
    assert_eq!(provider["reviewCount"], 1);
    assert_eq!(provider["rating"], 5);
}

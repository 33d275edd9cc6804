//! Quotes and comments with admin moderation

mod common;

use abibuch_common::models::Gender;
use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn test_create_quote_for_teacher() {
    let app = TestApp::new().await;
    let meier = app.teacher("Meier", Gender::M).await;
    let (_, mut client) = app.student_client("Lea", "Schmidt", Gender::F).await;

    let res = client
        .post(
            "/api/quotes",
            json!({
                "speaker_kind": "TEACHER",
                "speaker_guid": meier,
                "text": "  Das kommt in der Klausur dran.  ",
                "context": "Mathe, 3. Stunde"
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.text());
    let quote = res.json();
    assert_eq!(quote["text"], "Das kommt in der Klausur dran.");
    assert_eq!(quote["status"], "PENDING");
    assert_eq!(quote["speaker_name"], "Herr Meier");

    let mine = client.get("/api/quotes/mine").await.json();
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_quote_validation() {
    let app = TestApp::new().await;
    let anna = app.student("Anna", "Berg", Gender::F).await;
    let (_, mut client) = app.student_client("Lea", "Schmidt", Gender::F).await;

    let cases = [
        json!({ "speaker_kind": "STUDENT", "speaker_guid": anna, "text": "   " }),
        json!({ "speaker_kind": "STUDENT", "speaker_guid": anna, "text": "x".repeat(501) }),
        json!({ "speaker_kind": "TEACHER", "speaker_guid": anna, "text": "Falsche Art" }),
        json!({ "speaker_kind": "STUDENT", "speaker_guid": "nobody", "text": "Hallo" }),
    ];
    for body in cases {
        let res = client.post("/api/quotes", body.clone()).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST, "{}", body);
    }
}

#[tokio::test]
async fn test_quote_moderation_and_deletion() {
    let app = TestApp::new().await;
    let anna = app.student("Anna", "Berg", Gender::F).await;
    let (_, mut lea) = app.student_client("Lea", "Schmidt", Gender::F).await;
    let (_, mut max) = app.student_client("Max", "Kraft", Gender::M).await;
    let mut admin = app.admin().await;

    let create = |text: &'static str| json!({ "speaker_kind": "STUDENT", "speaker_guid": anna.clone(), "text": text });
    let first = lea.post("/api/quotes", create("Erstes Zitat")).await.json()["guid"]
        .as_str()
        .unwrap()
        .to_string();
    let second = lea.post("/api/quotes", create("Zweites Zitat")).await.json()["guid"]
        .as_str()
        .unwrap()
        .to_string();

    let pending = admin.get("/api/admin/quotes?status=PENDING").await.json();
    assert_eq!(pending.as_array().unwrap().len(), 2);

    let res = admin
        .post(&format!("/api/admin/quotes/{}/review", first), json!({ "status": "PENDING" }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = admin
        .post(&format!("/api/admin/quotes/{}/review", first), json!({ "status": "APPROVED" }))
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text());
    assert_eq!(res.json()["status"], "APPROVED");
    assert!(res.json()["reviewed_at"].is_string());
    assert_eq!(app.audit_count().await, 1);

    // Other students cannot see or delete the quote
    let res = max.delete(&format!("/api/quotes/{}", second)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = lea.delete(&format!("/api/quotes/{}", first)).await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    let res = lea.delete(&format!("/api/quotes/{}", second)).await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);

    let csv = admin.get("/api/admin/export/quotes.csv").await.text();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("speaker,text,submitted_by,created_at"));
    let row = lines.next().unwrap();
    assert!(row.starts_with("Anna Berg,Erstes Zitat,Lea Schmidt,"));
    assert!(lines.next().is_none());
}

#[tokio::test]
async fn test_comment_upsert_and_moderation() {
    let app = TestApp::new().await;
    let (anna, mut anna_client) = app.student_client("Anna", "Berg", Gender::F).await;
    let (_, mut lea) = app.student_client("Lea", "Schmidt", Gender::F).await;
    let mut admin = app.admin().await;
    let uri = format!("/api/comments/{}", anna);

    let res = lea.put(&uri, json!({ "text": "Immer hilfsbereit" })).await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text());
    let guid = res.json()["guid"].as_str().unwrap().to_string();
    assert_eq!(res.json()["target_name"], "Anna Berg");

    // Not visible to the target before approval
    let about = anna_client.get("/api/comments/about-me").await.json();
    assert!(about.as_array().unwrap().is_empty());

    admin
        .post(&format!("/api/admin/comments/{}/review", guid), json!({ "status": "APPROVED" }))
        .await;
    let about = anna_client.get("/api/comments/about-me").await.json();
    assert_eq!(about.as_array().unwrap().len(), 1);
    assert_eq!(about[0]["author_name"], "Lea Schmidt");

    // Editing replaces the comment and sends it back to moderation
    let res = lea.put(&uri, json!({ "text": "Immer hilfsbereit und lustig" })).await;
    assert_eq!(res.json()["guid"], guid.as_str());
    assert_eq!(res.json()["status"], "PENDING");
    let about = anna_client.get("/api/comments/about-me").await.json();
    assert!(about.as_array().unwrap().is_empty());

    let mine = lea.get("/api/comments/mine").await.json();
    assert_eq!(mine.as_array().unwrap().len(), 1);

    assert_eq!(lea.delete(&uri).await.status, StatusCode::NO_CONTENT);
    assert_eq!(lea.delete(&uri).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_comment_targets() {
    let app = TestApp::new().await;
    let teacher = app.teacher("Meier", Gender::M).await;
    let anna = app.student("Anna", "Berg", Gender::F).await;
    let (me, mut client) = app.student_client("Lea", "Schmidt", Gender::F).await;

    let res = client.put(&format!("/api/comments/{}", me), json!({ "text": "Ich bin toll" })).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = client
        .put(&format!("/api/comments/{}", teacher), json!({ "text": "Guter Unterricht" }))
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = client
        .put(&format!("/api/comments/{}", anna), json!({ "text": "x".repeat(1001) }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

//! Admin management of students, teachers, questions, fields and accounts

mod common;

use abibuch_common::models::{AnswerMode, Gender, PersonKind};
use axum::http::StatusCode;
use common::{TestApp, ALIAS, PASSWORD};
use serde_json::json;

#[tokio::test]
async fn test_student_crud_is_audited() {
    let app = TestApp::new().await;
    let mut admin = app.admin().await;

    let res = admin
        .post(
            "/api/admin/students",
            json!({ "first_name": " Anna ", "last_name": "Berg", "gender": "F", "email": "anna@example.org" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.text());
    let student = res.json();
    assert_eq!(student["first_name"], "Anna");
    let uri = format!("/api/admin/students/{}", student["guid"].as_str().unwrap());

    let res = admin
        .put(&uri, json!({ "first_name": "Anna", "last_name": "Berg-Meier", "gender": "F" }))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["last_name"], "Berg-Meier");
    assert!(res.json()["email"].is_null());

    assert_eq!(admin.delete(&uri).await.status, StatusCode::NO_CONTENT);
    assert_eq!(admin.delete(&uri).await.status, StatusCode::NOT_FOUND);

    let audit = admin.get("/api/admin/audit").await.json();
    assert_eq!(audit["pagination"]["total_rows"], 3);
    let first_group = &audit["groups"][0];
    assert_eq!(first_group["alias"], ALIAS);
    assert_eq!(first_group["entity_type"], "student");

    let aliases = admin.get("/api/admin/audit/aliases").await.json();
    assert_eq!(aliases[0]["alias"], ALIAS);
    assert_eq!(aliases[0]["entries"], 3);
}

#[tokio::test]
async fn test_student_validation() {
    let app = TestApp::new().await;
    let mut admin = app.admin().await;

    let cases = [
        json!({ "first_name": "", "last_name": "Berg", "gender": "F" }),
        json!({ "first_name": "Anna", "last_name": "x".repeat(101), "gender": "F" }),
        json!({ "first_name": "Anna", "last_name": "Berg", "gender": "F", "email": "kein-at" }),
    ];
    for body in cases {
        let res = admin.post("/api/admin/students", body.clone()).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST, "{}", body);
    }

    let res = admin
        .post("/api/admin/students", json!({ "first_name": "Anna", "last_name": "Berg", "gender": "Q" }))
        .await;
    assert!(res.status.is_client_error());
    assert_eq!(app.audit_count().await, 0);
}

#[tokio::test]
async fn test_deleting_student_removes_related_data() {
    let app = TestApp::new().await;
    let question = app.question("Wer wird Millionär?", PersonKind::Student, AnswerMode::Single).await;
    let (anna, mut anna_client) = app.student_client("Anna", "Berg", Gender::F).await;
    let (_, mut lea) = app.student_client("Lea", "Schmidt", Gender::F).await;
    let mut admin = app.admin().await;

    lea.put(
        &format!("/api/ranking/{}/votes", question),
        json!({ "slot": "ANY", "candidate_guid": anna }),
    )
    .await;
    lea.post("/api/quotes", json!({ "speaker_kind": "STUDENT", "speaker_guid": anna, "text": "Hallo" }))
        .await;
    lea.put(&format!("/api/comments/{}", anna), json!({ "text": "Nett" })).await;

    let res = admin.delete(&format!("/api/admin/students/{}", anna)).await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);

    for table in ["votes", "quotes", "comments"] {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&app.db)
            .await
            .unwrap();
        assert_eq!(count, 0, "{}", table);
    }

    // The linked account went with the student
    assert_eq!(anna_client.get("/api/auth/me").await.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_teacher_crud() {
    let app = TestApp::new().await;
    let mut admin = app.admin().await;

    let res = admin
        .post(
            "/api/admin/teachers",
            json!({ "last_name": "Meier", "gender": "M", "subject": "Mathe" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.text());
    let teacher = res.json();
    assert!(teacher["first_name"].is_null());
    let uri = format!("/api/admin/teachers/{}", teacher["guid"].as_str().unwrap());

    let res = admin
        .put(&uri, json!({ "first_name": "Alex", "last_name": "Meier", "gender": "D" }))
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let candidates = admin.get("/api/candidates?kind=TEACHER&q=alex").await.json();
    assert_eq!(candidates[0]["name"], "Alex Meier");

    assert_eq!(admin.delete(&uri).await.status, StatusCode::NO_CONTENT);
    assert!(admin.get("/api/admin/teachers").await.json().as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_candidate_search() {
    let app = TestApp::new().await;
    app.student("Anna", "Berg", Gender::F).await;
    app.student("Ben", "Bergmann", Gender::M).await;
    app.student("Kim", "Lau", Gender::D).await;
    app.teacher("Schulz", Gender::F).await;
    let (_, mut client) = app.student_client("Lea", "Schmidt", Gender::F).await;

    let res = client.get("/api/candidates?kind=STUDENT&q=BERG").await;
    assert_eq!(res.status, StatusCode::OK);
    let names: Vec<String> = res
        .json()
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Anna Berg", "Ben Bergmann"]);

    let res = client.get("/api/candidates?kind=STUDENT&limit=2").await;
    assert_eq!(res.json().as_array().unwrap().len(), 2);

    let res = client.get("/api/candidates?kind=TEACHER&q=frau").await.json();
    assert_eq!(res[0]["name"], "Frau Schulz");
    assert_eq!(res[0]["gender"], "F");
}

#[tokio::test]
async fn test_question_reorder() {
    let app = TestApp::new().await;
    let a = app.question("A", PersonKind::Student, AnswerMode::Single).await;
    let b = app.question("B", PersonKind::Teacher, AnswerMode::Single).await;
    let c = app.question("C", PersonKind::Student, AnswerMode::Duo).await;
    let mut admin = app.admin().await;

    let res = admin
        .post("/api/admin/questions/reorder", json!({ "order": [c, a] }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = admin
        .post("/api/admin/questions/reorder", json!({ "order": [c, a, a] }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = admin
        .post("/api/admin/questions/reorder", json!({ "order": [c, a, b] }))
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text());
    let texts: Vec<String> = res
        .json()
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["text"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(texts, vec!["C", "A", "B"]);

    let audit = admin.get("/api/admin/audit?action=REORDER").await.json();
    assert_eq!(audit["pagination"]["total_rows"], 1);
}

#[tokio::test]
async fn test_inactive_questions_are_hidden_from_students() {
    let app = TestApp::new().await;
    let (_, mut client) = app.student_client("Lea", "Schmidt", Gender::F).await;
    let mut admin = app.admin().await;

    let res = admin
        .post(
            "/api/admin/questions",
            json!({ "text": "Später", "target": "STUDENT", "answer_mode": "SINGLE", "active": false }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.text());
    let guid = res.json()["guid"].as_str().unwrap().to_string();

    assert!(client.get("/api/ranking").await.json()["questions"]
        .as_array()
        .unwrap()
        .is_empty());
    assert_eq!(admin.get("/api/admin/questions").await.json().as_array().unwrap().len(), 1);

    let anna = app.student("Anna", "Berg", Gender::F).await;
    let res = client
        .put(
            &format!("/api/ranking/{}/votes", guid),
            json!({ "slot": "ANY", "candidate_guid": anna }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_field_crud_and_reorder() {
    let app = TestApp::new().await;
    let mut admin = app.admin().await;

    let res = admin
        .post(
            "/api/admin/fields",
            json!({ "label": "Spitzname", "field_type": "TEXT", "max_length": 50 }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.text());
    let nick = res.json()["guid"].as_str().unwrap().to_string();

    let res = admin
        .post(
            "/api/admin/fields",
            json!({ "label": "Lebensmotto", "field_type": "LONG_TEXT", "max_length": 500, "required": true }),
        )
        .await;
    let motto = res.json()["guid"].as_str().unwrap().to_string();

    let res = admin
        .post(
            "/api/admin/fields",
            json!({ "label": "Kaputt", "field_type": "TEXT", "max_length": 0 }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = admin
        .post("/api/admin/fields/reorder", json!({ "order": [motto, nick] }))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()[0]["label"], "Lebensmotto");

    let res = admin
        .put(
            &format!("/api/admin/fields/{}", nick),
            json!({ "label": "Rufname", "field_type": "TEXT", "max_length": 30 }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["label"], "Rufname");

    assert_eq!(
        admin.delete(&format!("/api/admin/fields/{}", nick)).await.status,
        StatusCode::NO_CONTENT
    );
    assert_eq!(admin.get("/api/admin/fields").await.json().as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_account_management() {
    let app = TestApp::new().await;
    let anna = app.student("Anna", "Berg", Gender::F).await;
    let mut admin = app.admin().await;

    let res = admin
        .post(
            "/api/admin/accounts",
            json!({ "username": "anna.berg", "password": PASSWORD, "role": "STUDENT", "student_guid": anna }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.text());
    let account = res.json();
    assert!(account.get("password_hash").is_none());

    let res = admin
        .post(
            "/api/admin/accounts",
            json!({ "username": "anna2", "password": PASSWORD, "role": "STUDENT", "student_guid": anna }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let res = admin
        .post(
            "/api/admin/accounts",
            json!({ "username": "ANNA.BERG", "password": PASSWORD, "role": "ADMIN" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let res = admin
        .post(
            "/api/admin/accounts",
            json!({ "username": "shorty", "password": "kurz", "role": "ADMIN" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let mut student = app.anonymous();
    student.login("anna.berg", PASSWORD).await;

    let reset = format!("/api/admin/accounts/{}/password", account["guid"].as_str().unwrap());
    let res = admin.post(&reset, json!({ "password": "new-password-1" })).await;
    assert!(res.status.is_success(), "{}", res.text());

    // Resetting ends existing sessions
    assert_eq!(student.get("/api/auth/me").await.status, StatusCode::UNAUTHORIZED);
    student.login("anna.berg", "new-password-1").await;
}

#[tokio::test]
async fn test_admin_account_deletion_guards() {
    let app = TestApp::new().await;
    let mut admin = app.admin().await;
    let me = admin.get("/api/auth/me").await.json()["guid"].as_str().unwrap().to_string();

    let res = admin.delete(&format!("/api/admin/accounts/{}", me)).await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let res = admin
        .post(
            "/api/admin/accounts",
            json!({ "username": "second", "password": PASSWORD, "role": "ADMIN" }),
        )
        .await;
    let second = res.json()["guid"].as_str().unwrap().to_string();

    let res = admin.delete(&format!("/api/admin/accounts/{}", second)).await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);

    let accounts = admin.get("/api/admin/accounts").await.json();
    assert_eq!(accounts.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_activity_and_stats() {
    let app = TestApp::new().await;
    let nick = app.field("Spitzname", 50, false).await;
    let (_, mut lea) = app.student_client("Lea", "Schmidt", Gender::F).await;
    let mut admin = app.admin().await;

    lea.put("/api/profile", json!({ "values": { nick: "Lele" } })).await;
    lea.post_empty("/api/profile/submit").await;

    let stats = admin.get("/api/admin/stats").await.json();
    assert_eq!(stats["students"], 1);
    assert_eq!(stats["submitted_profiles"], 1);
    assert_eq!(stats["pending_quotes"], 0);
    assert_eq!(stats["deadline"]["open"], true);

    let res = admin.get("/api/admin/activity?limit=5").await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(!res.json().as_array().unwrap().is_empty());
}

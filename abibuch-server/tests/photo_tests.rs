//! Photo upload limits, replacement and file access

mod common;

use abibuch_common::config::TomlConfig;
use abibuch_common::models::Gender;
use axum::http::{header, Method, StatusCode};
use common::{Client, TestApp, TestResponse};

const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

async fn upload(client: &mut Client, category: &str, content_type: &str, body: &[u8]) -> TestResponse {
    client
        .send(
            Method::PUT,
            &format!("/api/photos/{}", category),
            Some(content_type),
            body.to_vec(),
        )
        .await
}

fn small_limits() -> TomlConfig {
    TomlConfig {
        max_upload_bytes: Some(64),
        max_free_photos: Some(2),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_upload_stores_file() {
    let app = TestApp::new().await;
    let (guid, mut client) = app.student_client("Lea", "Schmidt", Gender::F).await;

    let res = upload(&mut client, "PORTRAIT", "image/jpeg", JPEG).await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.text());
    let photo = res.json();
    assert_eq!(photo["student_guid"], guid.as_str());
    assert_eq!(photo["category"], "PORTRAIT");
    assert_eq!(photo["size_bytes"], JPEG.len());

    let file_name = photo["file_name"].as_str().unwrap();
    assert!(file_name.ends_with(".jpg"));
    assert_eq!(std::fs::read(app.uploads.join(file_name)).unwrap(), JPEG);

    let mine = client.get("/api/photos/mine").await.json();
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_upload_rejections() {
    let app = TestApp::with_config(small_limits()).await;
    let (_, mut client) = app.student_client("Lea", "Schmidt", Gender::F).await;

    let res = upload(&mut client, "PORTRAIT", "image/gif", JPEG).await;
    assert_eq!(res.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let res = upload(&mut client, "PORTRAIT", "image/png", &[]).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = upload(&mut client, "PORTRAIT", "image/webp", &[0u8; 65]).await;
    assert_eq!(res.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(res.error_code(), "PAYLOAD_TOO_LARGE");

    let res = upload(&mut client, "PORTRAIT", "image/webp", &[0u8; 64]).await;
    assert_eq!(res.status, StatusCode::CREATED);

    let leftover = std::fs::read_dir(&app.uploads).unwrap().count();
    assert_eq!(leftover, 1);
}

#[tokio::test]
async fn test_portrait_replaces_previous() {
    let app = TestApp::new().await;
    let (_, mut client) = app.student_client("Lea", "Schmidt", Gender::F).await;

    let first = upload(&mut client, "PORTRAIT", "image/jpeg", JPEG).await.json();
    let second = upload(&mut client, "PORTRAIT", "image/png; charset=binary", b"\x89PNG").await;
    assert_eq!(second.status, StatusCode::CREATED);
    let second = second.json();
    assert_eq!(second["content_type"], "image/png");

    let mine = client.get("/api/photos/mine").await.json();
    let mine = mine.as_array().unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["guid"], second["guid"]);

    let old_file = app.uploads.join(first["file_name"].as_str().unwrap());
    assert!(!old_file.exists());
}

#[tokio::test]
async fn test_free_photo_limit() {
    let app = TestApp::with_config(small_limits()).await;
    let (_, mut client) = app.student_client("Lea", "Schmidt", Gender::F).await;

    for _ in 0..2 {
        let res = upload(&mut client, "FREE", "image/jpeg", JPEG).await;
        assert_eq!(res.status, StatusCode::CREATED);
    }
    let res = upload(&mut client, "FREE", "image/jpeg", JPEG).await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    // Other categories are not affected by the free limit
    let res = upload(&mut client, "CHILDHOOD", "image/jpeg", JPEG).await;
    assert_eq!(res.status, StatusCode::CREATED);
}

async fn photo_rows(app: &TestApp, student_guid: &str, category: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM photos WHERE student_guid = ? AND category = ?")
        .bind(student_guid)
        .bind(category)
        .fetch_one(&app.db)
        .await
        .unwrap()
}

/// Fire `count` uploads at once with copies of one logged-in client
async fn upload_concurrently(client: &Client, category: &'static str, count: usize) -> Vec<StatusCode> {
    let tasks: Vec<_> = (0..count)
        .map(|_| {
            let mut client = client.clone();
            tokio::spawn(async move { upload(&mut client, category, "image/jpeg", JPEG).await.status })
        })
        .collect();

    let mut statuses = Vec::with_capacity(count);
    for task in tasks {
        statuses.push(task.await.unwrap());
    }
    statuses
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_uploads_respect_category_limits() {
    let app = TestApp::with_config(small_limits()).await;
    let (guid, client) = app.student_client("Lea", "Schmidt", Gender::F).await;

    for _ in 0..5 {
        let statuses = upload_concurrently(&client, "PORTRAIT", 8).await;
        assert!(statuses.iter().all(|s| *s == StatusCode::CREATED), "{:?}", statuses);
        assert_eq!(photo_rows(&app, &guid, "PORTRAIT").await, 1);
    }
    assert_eq!(std::fs::read_dir(&app.uploads).unwrap().count(), 1);

    let statuses = upload_concurrently(&client, "FREE", 8).await;
    let created = statuses.iter().filter(|s| **s == StatusCode::CREATED).count();
    let refused = statuses.iter().filter(|s| **s == StatusCode::CONFLICT).count();
    assert_eq!((created, refused), (2, 6), "{:?}", statuses);
    assert_eq!(photo_rows(&app, &guid, "FREE").await, 2);
    assert_eq!(std::fs::read_dir(&app.uploads).unwrap().count(), 3);
}

#[tokio::test]
async fn test_file_access() {
    let app = TestApp::new().await;
    let (_, mut owner) = app.student_client("Lea", "Schmidt", Gender::F).await;
    let (_, mut other) = app.student_client("Max", "Kraft", Gender::M).await;
    let mut admin = app.admin().await;

    let photo = upload(&mut owner, "PORTRAIT", "image/jpeg", JPEG).await.json();
    let uri = format!("/api/photos/{}/file", photo["guid"].as_str().unwrap());

    let res = owner.get(&uri).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.header(header::CONTENT_TYPE), Some("image/jpeg"));
    assert_eq!(res.body, JPEG);

    assert_eq!(admin.get(&uri).await.status, StatusCode::OK);
    assert_eq!(other.get(&uri).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.anonymous().get(&uri).await.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_delete_photo() {
    let app = TestApp::new().await;
    let (_, mut owner) = app.student_client("Lea", "Schmidt", Gender::F).await;
    let (_, mut other) = app.student_client("Max", "Kraft", Gender::M).await;
    let mut admin = app.admin().await;

    let first = upload(&mut owner, "FREE", "image/jpeg", JPEG).await.json();
    let second = upload(&mut owner, "FREE", "image/jpeg", JPEG).await.json();
    let first_uri = format!("/api/photos/{}", first["guid"].as_str().unwrap());

    assert_eq!(other.delete(&first_uri).await.status, StatusCode::NOT_FOUND);
    assert_eq!(owner.delete(&first_uri).await.status, StatusCode::NO_CONTENT);
    assert!(!app.uploads.join(first["file_name"].as_str().unwrap()).exists());

    let res = admin
        .delete(&format!("/api/admin/photos/{}", second["guid"].as_str().unwrap()))
        .await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    assert_eq!(app.audit_count().await, 1);
    assert!(owner.get("/api/photos/mine").await.json().as_array().unwrap().is_empty());
}

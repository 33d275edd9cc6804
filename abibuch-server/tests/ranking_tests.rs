//! Voting rules, submission lock and admin results

mod common;

use abibuch_common::models::{AnswerMode, Gender, PersonKind};
use axum::http::{header, StatusCode};
use common::TestApp;
use serde_json::json;

fn votes_uri(question: &str) -> String {
    format!("/api/ranking/{}/votes", question)
}

#[tokio::test]
async fn test_ranking_view_lists_active_questions_with_slots() {
    let app = TestApp::new().await;
    app.question("Wer wird Millionär?", PersonKind::Student, AnswerMode::Single).await;
    app.question("Traumpaar", PersonKind::Student, AnswerMode::Duo).await;
    app.question("Coolste Lehrkraft", PersonKind::Teacher, AnswerMode::GenderSpecific).await;
    let (_, mut client) = app.student_client("Lea", "Schmidt", Gender::F).await;

    let res = client.get("/api/ranking").await;
    assert_eq!(res.status, StatusCode::OK);
    let view = res.json();
    assert_eq!(view["status"], "DRAFT");

    let questions = view["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 3);
    assert_eq!(questions[0]["slots"].as_array().unwrap().len(), 1);
    let gender_slots: Vec<&str> = questions[2]["slots"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["slot"].as_str().unwrap())
        .collect();
    assert_eq!(gender_slots, vec!["M", "F"]);
    assert!(questions[2]["slots"][0]["vote"].is_null());
}

#[tokio::test]
async fn test_single_vote_upserts() {
    let app = TestApp::new().await;
    let question = app.question("Wer wird Millionär?", PersonKind::Student, AnswerMode::Single).await;
    let anna = app.student("Anna", "Berg", Gender::F).await;
    let ben = app.student("Ben", "Kurz", Gender::M).await;
    let (_, mut client) = app.student_client("Lea", "Schmidt", Gender::F).await;

    let res = client
        .put(&votes_uri(&question), json!({ "slot": "ANY", "candidate_guid": anna }))
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text());

    let res = client
        .put(&votes_uri(&question), json!({ "slot": "ANY", "candidate_guid": ben }))
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let view = client.get("/api/ranking").await.json();
    let vote = &view["questions"][0]["slots"][0]["vote"];
    assert_eq!(vote["candidate_guid"], ben.as_str());
    assert_eq!(vote["candidate_name"], "Ben Kurz");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM votes")
        .fetch_one(&app.db)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_self_vote_rejected_for_student_questions() {
    let app = TestApp::new().await;
    let question = app.question("Wer wird Millionär?", PersonKind::Student, AnswerMode::Single).await;
    let (me, mut client) = app.student_client("Lea", "Schmidt", Gender::F).await;

    let res = client
        .put(&votes_uri(&question), json!({ "slot": "ANY", "candidate_guid": me }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.json()["error"]["message"].as_str().unwrap().contains("yourself"));
}

#[tokio::test]
async fn test_candidate_must_match_question_target() {
    let app = TestApp::new().await;
    let question = app.question("Coolste Lehrkraft", PersonKind::Teacher, AnswerMode::Single).await;
    let student = app.student("Anna", "Berg", Gender::F).await;
    let teacher = app.teacher("Meier", Gender::M).await;
    let (_, mut client) = app.student_client("Lea", "Schmidt", Gender::F).await;

    let res = client
        .put(&votes_uri(&question), json!({ "slot": "ANY", "candidate_guid": student }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = client
        .put(&votes_uri(&question), json!({ "slot": "ANY", "candidate_guid": "not-a-guid" }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = client
        .put(&votes_uri(&question), json!({ "slot": "ANY", "candidate_guid": teacher }))
        .await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn test_gender_specific_slots() {
    let app = TestApp::new().await;
    let question = app.question("Beste Stimme", PersonKind::Student, AnswerMode::GenderSpecific).await;
    let anna = app.student("Anna", "Berg", Gender::F).await;
    let ben = app.student("Ben", "Kurz", Gender::M).await;
    let kim = app.student("Kim", "Lau", Gender::D).await;
    let (_, mut client) = app.student_client("Lea", "Schmidt", Gender::F).await;

    let res = client
        .put(&votes_uri(&question), json!({ "slot": "M", "candidate_guid": anna }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = client
        .put(&votes_uri(&question), json!({ "slot": "ANY", "candidate_guid": ben }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    for (slot, candidate) in [("M", &ben), ("F", &anna), ("M", &kim)] {
        let res = client
            .put(&votes_uri(&question), json!({ "slot": slot, "candidate_guid": candidate }))
            .await;
        assert_eq!(res.status, StatusCode::OK, "{} {}", slot, res.text());
    }

    let view = client.get("/api/ranking").await.json();
    let slots = &view["questions"][0]["slots"];
    assert_eq!(slots[0]["vote"]["candidate_guid"], kim.as_str());
    assert_eq!(slots[1]["vote"]["candidate_guid"], anna.as_str());
}

#[tokio::test]
async fn test_duo_pairs_are_normalized() {
    let app = TestApp::new().await;
    let question = app.question("Traumpaar", PersonKind::Student, AnswerMode::Duo).await;
    let anna = app.student("Anna", "Berg", Gender::F).await;
    let ben = app.student("Ben", "Kurz", Gender::M).await;
    let (_, mut client) = app.student_client("Lea", "Schmidt", Gender::F).await;

    let res = client
        .put(&votes_uri(&question), json!({ "slot": "ANY", "candidate_guid": anna }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST, "partner required");

    let res = client
        .put(
            &votes_uri(&question),
            json!({ "slot": "ANY", "candidate_guid": anna, "partner_guid": anna }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST, "same partner");

    let res = client
        .put(
            &votes_uri(&question),
            json!({ "slot": "ANY", "candidate_guid": ben, "partner_guid": anna }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let vote = res.json();
    let (small, large) = if anna < ben { (&anna, &ben) } else { (&ben, &anna) };
    assert_eq!(vote["candidate_guid"], small.as_str());
    assert_eq!(vote["partner_guid"], large.as_str());
}

#[tokio::test]
async fn test_partner_rejected_outside_duo() {
    let app = TestApp::new().await;
    let question = app.question("Wer wird Millionär?", PersonKind::Student, AnswerMode::Single).await;
    let anna = app.student("Anna", "Berg", Gender::F).await;
    let ben = app.student("Ben", "Kurz", Gender::M).await;
    let (_, mut client) = app.student_client("Lea", "Schmidt", Gender::F).await;

    let res = client
        .put(
            &votes_uri(&question),
            json!({ "slot": "ANY", "candidate_guid": anna, "partner_guid": ben }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_question_is_not_found() {
    let app = TestApp::new().await;
    let anna = app.student("Anna", "Berg", Gender::F).await;
    let (_, mut client) = app.student_client("Lea", "Schmidt", Gender::F).await;

    let res = client
        .put(
            &votes_uri("00000000-0000-0000-0000-000000000000"),
            json!({ "slot": "ANY", "candidate_guid": anna }),
        )
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_clear_vote() {
    let app = TestApp::new().await;
    let question = app.question("Wer wird Millionär?", PersonKind::Student, AnswerMode::Single).await;
    let anna = app.student("Anna", "Berg", Gender::F).await;
    let (_, mut client) = app.student_client("Lea", "Schmidt", Gender::F).await;

    client
        .put(&votes_uri(&question), json!({ "slot": "ANY", "candidate_guid": anna }))
        .await;

    let uri = format!("{}/ANY", votes_uri(&question));
    assert_eq!(client.delete(&uri).await.status, StatusCode::NO_CONTENT);
    assert_eq!(client.delete(&uri).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_submit_locks_until_reopened() {
    let app = TestApp::new().await;
    let question = app.question("Wer wird Millionär?", PersonKind::Student, AnswerMode::Single).await;
    let anna = app.student("Anna", "Berg", Gender::F).await;
    let (me, mut client) = app.student_client("Lea", "Schmidt", Gender::F).await;
    let mut admin = app.admin().await;

    let res = client.post_empty("/api/ranking/submit").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["status"], "SUBMITTED");

    let res = client
        .put(&votes_uri(&question), json!({ "slot": "ANY", "candidate_guid": anna }))
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(client.post_empty("/api/ranking/submit").await.status, StatusCode::CONFLICT);

    let reopen = format!("/api/admin/rankings/{}/reopen", me);
    let res = admin.post_empty(&reopen).await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text());
    assert_eq!(res.json()["status"], "DRAFT");
    assert_eq!(admin.post_empty(&reopen).await.status, StatusCode::CONFLICT);

    let res = client
        .put(&votes_uri(&question), json!({ "slot": "ANY", "candidate_guid": anna }))
        .await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_vote_waiting_on_a_submit_is_refused() {
    let app = TestApp::new().await;
    let question = app.question("Wer wird Millionär?", PersonKind::Student, AnswerMode::Single).await;
    let anna = app.student("Anna", "Berg", Gender::F).await;
    let (me, client) = app.student_client("Lea", "Schmidt", Gender::F).await;

    // Submit in a transaction that holds the write lock while the vote arrives
    let mut tx = app.db.begin().await.unwrap();
    sqlx::query(
        "INSERT INTO ranking_submissions (student_guid, status, submitted_at, updated_at)
         VALUES (?, 'SUBMITTED', '2026-01-01T00:00:00.000000Z', '2026-01-01T00:00:00.000000Z')
         ON CONFLICT(student_guid) DO UPDATE SET status = 'SUBMITTED'",
    )
    .bind(&me)
    .execute(&mut *tx)
    .await
    .unwrap();

    let mut voter = client.clone();
    let uri = votes_uri(&question);
    let vote = tokio::spawn(async move {
        voter.put(&uri, json!({ "slot": "ANY", "candidate_guid": anna })).await.status
    });
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;
    tx.commit().await.unwrap();

    assert_eq!(vote.await.unwrap(), StatusCode::CONFLICT);
    let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE voter_guid = ?")
        .bind(&me)
        .fetch_one(&app.db)
        .await
        .unwrap();
    assert_eq!(stored, 0);
}

#[tokio::test]
async fn test_results_rank_ties_and_filter_submitted() {
    let app = TestApp::new().await;
    let question = app.question("Wer wird Millionär?", PersonKind::Student, AnswerMode::Single).await;
    let anna = app.student("Anna", "Berg", Gender::F).await;
    let ben = app.student("Ben", "Kurz", Gender::M).await;

    let (_, mut v1) = app.student_client("Lea", "Schmidt", Gender::F).await;
    let (_, mut v2) = app.student_client("Max", "Kraft", Gender::M).await;
    let (_, mut v3) = app.student_client("Ida", "Wolf", Gender::F).await;

    for (client, candidate) in [(&mut v1, &anna), (&mut v2, &ben), (&mut v3, &anna)] {
        let res = client
            .put(&votes_uri(&question), json!({ "slot": "ANY", "candidate_guid": candidate }))
            .await;
        assert_eq!(res.status, StatusCode::OK);
    }
    v1.post_empty("/api/ranking/submit").await;
    v2.post_empty("/api/ranking/submit").await;

    let mut admin = app.admin().await;

    let results = admin.get("/api/admin/rankings/results").await.json();
    let bucket = &results[0]["buckets"][0];
    assert_eq!(bucket["total_votes"], 3);
    assert_eq!(bucket["entries"][0]["candidates"][0]["name"], "Anna Berg");
    assert_eq!(bucket["entries"][0]["votes"], 2);
    assert_eq!(bucket["entries"][0]["percentage"], 66.7);
    assert_eq!(bucket["entries"][1]["rank"], 2);

    let results = admin
        .get("/api/admin/rankings/results?submitted_only=true")
        .await
        .json();
    let entries = results[0]["buckets"][0]["entries"].as_array().unwrap().clone();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e["rank"] == 1 && e["votes"] == 1));

    // Ties at the cutoff are kept
    let results = admin
        .get("/api/admin/rankings/results?submitted_only=true&top=1")
        .await
        .json();
    assert_eq!(results[0]["buckets"][0]["entries"].as_array().unwrap().len(), 2);

    let res = admin.get("/api/admin/rankings/results?top=0").await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let res = admin.get("/api/admin/export/rankings.csv?top=0").await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let status = admin.get("/api/admin/rankings/status").await.json();
    let submitted = status
        .as_array()
        .unwrap()
        .iter()
        .filter(|s| s["status"] == "SUBMITTED")
        .count();
    assert_eq!(submitted, 2);
}

#[tokio::test]
async fn test_rankings_csv_export() {
    let app = TestApp::new().await;
    let question = app.question("Traumpaar", PersonKind::Student, AnswerMode::Duo).await;
    let anna = app.student("Anna", "Berg", Gender::F).await;
    let ben = app.student("Ben", "Kurz", Gender::M).await;
    let (_, mut client) = app.student_client("Lea", "Schmidt", Gender::F).await;
    client
        .put(
            &votes_uri(&question),
            json!({ "slot": "ANY", "candidate_guid": anna, "partner_guid": ben }),
        )
        .await;

    let mut admin = app.admin().await;
    let res = admin.get("/api/admin/export/rankings.csv").await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.header(header::CONTENT_TYPE).unwrap().starts_with("text/csv"));
    assert!(res
        .header(header::CONTENT_DISPOSITION)
        .unwrap()
        .contains("rankings.csv"));

    let text = res.text();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("question,bucket,rank,name,votes,percentage"));
    let row = lines.next().unwrap();
    assert!(row.starts_with("Traumpaar,ANY,1,"));
    assert!(row.contains("Anna Berg & Ben Kurz") || row.contains("Ben Kurz & Anna Berg"));
    assert!(row.ends_with(",1,100.0"));
}

#[tokio::test]
async fn test_question_mode_change_drops_votes() {
    let app = TestApp::new().await;
    let question = app.question("Wer wird Millionär?", PersonKind::Student, AnswerMode::Single).await;
    let anna = app.student("Anna", "Berg", Gender::F).await;
    let (_, mut client) = app.student_client("Lea", "Schmidt", Gender::F).await;
    client
        .put(&votes_uri(&question), json!({ "slot": "ANY", "candidate_guid": anna }))
        .await;

    let mut admin = app.admin().await;
    let res = admin
        .put(
            &format!("/api/admin/questions/{}", question),
            json!({
                "text": "Wer wird Millionär?",
                "target": "STUDENT",
                "answer_mode": "GENDER_SPECIFIC",
                "active": true
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text());

    let view = client.get("/api/ranking").await.json();
    let slots = view["questions"][0]["slots"].as_array().unwrap().clone();
    assert_eq!(slots.len(), 2);
    assert!(slots.iter().all(|s| s["vote"].is_null()));
}

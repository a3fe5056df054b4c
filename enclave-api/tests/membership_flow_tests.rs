/// End-to-end tests for the membership application flow
///
/// These drive the full router over HTTP semantics: registration, survey
/// submission, the admin review queue, decisions and the stage-gated
/// member directory.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::TestContext;
use serde_json::json;

fn apply_request(auth: &str, answers: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/membership/apply")
        .header("authorization", auth)
        .header("content-type", "application/json")
        .body(Body::from(json!({ "answers": answers }).to_string()))
        .unwrap()
}

fn decide_request(auth: &str, entry_id: &str, decision: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/v1/admin/applications/{}/decide", entry_id))
        .header("authorization", auth)
        .header("content-type", "application/json")
        .body(Body::from(json!({ "decision": decision }).to_string()))
        .unwrap()
}

fn status_request(auth: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri("/v1/membership/status")
        .header("authorization", auth)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance (set DATABASE_URL)"]
async fn test_apply_then_approve_flow() {
    let ctx = TestContext::new().await.unwrap();
    let applicant = ctx.register_user().await;
    let admin = ctx.register_admin().await;

    // Submit an application
    let (status, body) = ctx
        .request(apply_request(
            &applicant.auth_header(),
            json!({ "why": "community" }),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "apply failed: {}", body);
    assert_eq!(body["approval_status"], "pending");
    let entry_id = body["entry_id"].as_str().unwrap().to_string();

    // Applicant now sees the pending stage
    let (status, body) = ctx.request(status_request(&applicant.auth_header())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stage"], "pending");
    assert_eq!(body["pending_entry_id"], entry_id.as_str());

    // The entry shows up in the review queue
    let (status, body) = ctx
        .request(
            Request::builder()
                .method("GET")
                .uri("/v1/admin/applications")
                .header("authorization", admin.auth_header())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let queue = body["applications"].as_array().unwrap();
    assert!(queue
        .iter()
        .any(|entry| entry["entry_id"] == entry_id.as_str()));

    // Approve it
    let (status, body) = ctx
        .request(decide_request(&admin.auth_header(), &entry_id, "approved"))
        .await;
    assert_eq!(status, StatusCode::OK, "decide failed: {}", body);
    assert_eq!(body["new_stage"], "pre_member");

    // The applicant's status reflects the decision
    let (status, body) = ctx.request(status_request(&applicant.auth_header())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stage"], "pre_member");
    assert!(body.get("pending_entry_id").is_none());
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance (set DATABASE_URL)"]
async fn test_duplicate_application_conflicts() {
    let ctx = TestContext::new().await.unwrap();
    let applicant = ctx.register_user().await;

    let (status, _) = ctx
        .request(apply_request(
            &applicant.auth_header(),
            json!({ "why": "first" }),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = ctx
        .request(apply_request(
            &applicant.auth_header(),
            json!({ "why": "second" }),
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance (set DATABASE_URL)"]
async fn test_empty_answers_rejected() {
    let ctx = TestContext::new().await.unwrap();
    let applicant = ctx.register_user().await;

    let (status, body) = ctx
        .request(apply_request(&applicant.auth_header(), json!({})))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance (set DATABASE_URL)"]
async fn test_non_admin_cannot_review() {
    let ctx = TestContext::new().await.unwrap();
    let applicant = ctx.register_user().await;
    let bystander = ctx.register_user().await;

    let (_, body) = ctx
        .request(apply_request(
            &applicant.auth_header(),
            json!({ "why": "community" }),
        ))
        .await;
    let entry_id = body["entry_id"].as_str().unwrap().to_string();

    let (status, _) = ctx
        .request(
            Request::builder()
                .method("GET")
                .uri("/v1/admin/applications")
                .header("authorization", bystander.auth_header())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .request(decide_request(
            &bystander.auth_header(),
            &entry_id,
            "approved",
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance (set DATABASE_URL)"]
async fn test_repeat_decision_conflicts() {
    let ctx = TestContext::new().await.unwrap();
    let applicant = ctx.register_user().await;
    let admin = ctx.register_admin().await;

    let (_, body) = ctx
        .request(apply_request(
            &applicant.auth_header(),
            json!({ "why": "community" }),
        ))
        .await;
    let entry_id = body["entry_id"].as_str().unwrap().to_string();

    let (status, _) = ctx
        .request(decide_request(&admin.auth_header(), &entry_id, "rejected"))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = ctx
        .request(decide_request(&admin.auth_header(), &entry_id, "approved"))
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "body: {}", body);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance (set DATABASE_URL)"]
async fn test_rejected_applicant_can_reapply() {
    let ctx = TestContext::new().await.unwrap();
    let applicant = ctx.register_user().await;
    let admin = ctx.register_admin().await;

    let (_, body) = ctx
        .request(apply_request(
            &applicant.auth_header(),
            json!({ "why": "first try" }),
        ))
        .await;
    let entry_id = body["entry_id"].as_str().unwrap().to_string();

    let (status, body) = ctx
        .request(decide_request(&admin.auth_header(), &entry_id, "rejected"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["new_stage"], "reapply_eligible");

    let (status, _) = ctx
        .request(apply_request(
            &applicant.auth_header(),
            json!({ "why": "second try" }),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance (set DATABASE_URL)"]
async fn test_directory_gated_to_members() {
    let ctx = TestContext::new().await.unwrap();
    let applicant = ctx.register_user().await;
    let admin = ctx.register_admin().await;

    let directory_request = |auth: String| {
        Request::builder()
            .method("GET")
            .uri("/v1/members/directory")
            .header("authorization", auth)
            .body(Body::empty())
            .unwrap()
    };

    // An applicant is turned away
    let (status, _) = ctx
        .request(directory_request(applicant.auth_header()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Walk the applicant through both approval rounds
    for answers in [json!({ "why": "join" }), json!({ "why": "full member" })] {
        let (status, body) = ctx
            .request(apply_request(&applicant.auth_header(), answers))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let entry_id = body["entry_id"].as_str().unwrap().to_string();

        let (status, _) = ctx
            .request(decide_request(&admin.auth_header(), &entry_id, "approved"))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = ctx.request(status_request(&applicant.auth_header())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stage"], "member");

    // A full member sees the directory, and is listed in it
    let (status, body) = ctx
        .request(directory_request(applicant.auth_header()))
        .await;
    assert_eq!(status, StatusCode::OK);
    let members = body["members"].as_array().unwrap();
    assert!(members
        .iter()
        .any(|m| m["user_id"] == applicant.user_id.to_string()));
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance (set DATABASE_URL)"]
async fn test_authentication_required() {
    let ctx = TestContext::new().await.unwrap();

    for uri in [
        "/v1/membership/status",
        "/v1/admin/applications",
        "/v1/members/directory",
    ] {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let (status, _) = ctx.request(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "uri: {}", uri);
    }
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance (set DATABASE_URL)"]
async fn test_health_check() {
    let ctx = TestContext::new().await.unwrap();

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let (status, body) = ctx.request(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"]["reachable"], true);
    // TestContext runs migrations, so the schema must be visible here
    assert_eq!(body["database"]["migrations_applied"], true);
}

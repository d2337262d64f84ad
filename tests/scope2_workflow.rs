//! End-to-end specifications for the Scope 2 assessment workflow.
//!
//! Scenarios run through the public HTTP router against an in-memory store
//! and a recording mail transport, so intake, the approval state machine,
//! and the notification contract are validated together without reaching
//! into private modules.

mod common {
    use std::sync::{Arc, Mutex};

    use scope2_assess::workflows::scope2::{
        MailTransport, MemoryStore, NotificationError, NotifySettings, OutboundEmail,
        Scope2AssessmentService,
    };

    pub(super) const ADMIN_EMAIL: &str = "admin@sustally.com";

    #[derive(Default)]
    pub(super) struct RecordingMailer {
        sent: Mutex<Vec<OutboundEmail>>,
    }

    impl RecordingMailer {
        pub(super) fn sent(&self) -> Vec<OutboundEmail> {
            self.sent.lock().expect("mailer mutex poisoned").clone()
        }

        pub(super) fn sent_to(&self, address: &str) -> Vec<OutboundEmail> {
            self.sent()
                .into_iter()
                .filter(|email| email.to == address)
                .collect()
        }
    }

    impl MailTransport for RecordingMailer {
        fn deliver(&self, email: &OutboundEmail) -> Result<(), NotificationError> {
            self.sent
                .lock()
                .expect("mailer mutex poisoned")
                .push(email.clone());
            Ok(())
        }
    }

    pub(super) type TestService = Scope2AssessmentService<MemoryStore, RecordingMailer>;

    pub(super) fn build_service() -> (Arc<TestService>, Arc<RecordingMailer>) {
        let mailer = Arc::new(RecordingMailer::default());
        let service = Arc::new(Scope2AssessmentService::new(
            Arc::new(MemoryStore::default()),
            mailer.clone(),
            NotifySettings {
                admin_email: ADMIN_EMAIL.to_string(),
                base_url: "https://assess.example.com".to_string(),
                grid_emission_factor: 0.716,
            },
        ));
        (service, mailer)
    }
}

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use scope2_assess::workflows::scope2::scope2_router;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{build_service, ADMIN_EMAIL};

fn submission_payload() -> Value {
    json!({
        "facilityName": "Plant A",
        "state": "Karnataka",
        "userEmail": "a@x.com",
        "renewableEnergy": 250.0,
        "totalEnergy": 1000.0,
    })
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    serde_json::from_slice(&bytes).expect("body is json")
}

async fn submit(router: &axum::Router, payload: Value) -> String {
    let response = router
        .clone()
        .oneshot(json_request("POST", "/api/v1/scope2/submissions", payload))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    body["id"].as_str().expect("id returned").to_string()
}

#[tokio::test]
async fn approval_scenario_sends_one_certificate_email() {
    let (service, mailer) = build_service();
    let router = scope2_router(service);

    let id = submit(&router, submission_payload()).await;

    // Intake alerts the admin with a review link.
    let admin_mail = mailer.sent_to(ADMIN_EMAIL);
    assert_eq!(admin_mail.len(), 1);
    assert!(admin_mail[0]
        .html_body
        .contains(&format!("https://assess.example.com/admin/review/{id}")));
    assert!(admin_mail[0].html_body.contains("25.00"));

    let response = router
        .clone()
        .oneshot(
            Request::post(format!("/api/v1/scope2/submissions/{id}/approve"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);

    let user_mail = mailer.sent_to("a@x.com");
    assert_eq!(user_mail.len(), 1, "exactly one approval email");
    let attachment = user_mail[0]
        .attachment
        .as_ref()
        .expect("certificate attached");
    assert_eq!(attachment.content_type, "application/pdf");
    assert!(attachment.bytes.starts_with(b"%PDF"));

    let record = router
        .oneshot(
            Request::get(format!("/api/v1/scope2/submissions/{id}"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(record.status(), StatusCode::OK);
    let body = read_json(record).await;
    assert_eq!(body["status"], "APPROVED");
}

#[tokio::test]
async fn repeated_approval_conflicts_and_sends_nothing_more() {
    let (service, mailer) = build_service();
    let router = scope2_router(service);
    let id = submit(&router, submission_payload()).await;

    let uri = format!("/api/v1/scope2/submissions/{id}/approve");
    let first = router
        .clone()
        .oneshot(
            Request::post(uri.as_str())
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(first.status(), StatusCode::OK);

    let second = router
        .oneshot(
            Request::post(uri.as_str())
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(mailer.sent_to("a@x.com").len(), 1);
}

#[tokio::test]
async fn approval_without_contact_email_sends_no_user_mail() {
    let (service, mailer) = build_service();
    let router = scope2_router(service);

    let mut payload = submission_payload();
    payload.as_object_mut().expect("object").remove("userEmail");
    let id = submit(&router, payload).await;
    let sent_before = mailer.sent().len();

    let response = router
        .clone()
        .oneshot(
            Request::post(format!("/api/v1/scope2/submissions/{id}/approve"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(mailer.sent().len(), sent_before, "zero transition emails");

    let record = router
        .oneshot(
            Request::get(format!("/api/v1/scope2/submissions/{id}"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    let body = read_json(record).await;
    assert_eq!(body["status"], "APPROVED");
}

#[tokio::test]
async fn rejection_scenario_carries_the_reason_into_store_and_email() {
    let (service, mailer) = build_service();
    let router = scope2_router(service);
    let id = submit(&router, submission_payload()).await;

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/scope2/submissions/{id}/reject"),
            json!({ "reason": "Missing evidence" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);

    let record = router
        .oneshot(
            Request::get(format!("/api/v1/scope2/submissions/{id}"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    let body = read_json(record).await;
    assert_eq!(body["status"], "REJECTED");
    assert_eq!(body["rejectionReason"], "Missing evidence");

    let user_mail = mailer.sent_to("a@x.com");
    assert_eq!(user_mail.len(), 1);
    assert!(user_mail[0].html_body.contains("Missing evidence"));
    assert!(user_mail[0].attachment.is_none());
}

#[tokio::test]
async fn legacy_email_field_is_accepted_for_addressing() {
    let (service, mailer) = build_service();
    let router = scope2_router(service);

    let mut payload = submission_payload();
    let object = payload.as_object_mut().expect("object");
    object.remove("userEmail");
    object.insert("email".to_string(), json!("legacy@x.com"));
    let id = submit(&router, payload).await;

    let response = router
        .oneshot(
            Request::post(format!("/api/v1/scope2/submissions/{id}/approve"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(mailer.sent_to("legacy@x.com").len(), 1);
}

#[tokio::test]
async fn unknown_submission_is_a_client_error() {
    let (service, mailer) = build_service();
    let router = scope2_router(service);

    let response = router
        .oneshot(
            Request::post("/api/v1/scope2/submissions/unknown/approve")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(mailer.sent().is_empty());
}

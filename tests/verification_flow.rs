use std::sync::Arc;
use usher::application_impl::RealVerificationService;
use usher::application_port::{IssueInput, VerificationError, VerificationService, VerifyInput};
use usher::infra_memory::{MemoryChallengeStore, MemoryMailer};
use usher::server::Server;
use usher::settings::{Challenge, Http, Log, Mail, Settings, Verification};
use warp::Filter;

fn real_service() -> (RealVerificationService, Arc<MemoryMailer>) {
    let store = Arc::new(MemoryChallengeStore::new());
    let mailer = Arc::new(MemoryMailer::new());
    let service = RealVerificationService::new(store, mailer.clone(), b"integration-key".to_vec());
    (service, mailer)
}

fn issue(email: &str) -> IssueInput {
    IssueInput {
        email: email.to_string(),
    }
}

fn submit(email: &str, code: &str) -> VerifyInput {
    VerifyInput {
        email: email.to_string(),
        code: code.to_string(),
    }
}

fn wrong_code_for(code: &str) -> &'static str {
    if code == "000000" { "000001" } else { "000000" }
}

#[tokio::test]
async fn issued_code_travels_by_mail_and_verifies_once() {
    let (service, mailer) = real_service();

    let receipt = service.request_code(issue("alice@x.com")).await.unwrap();
    assert!(receipt.expires_at > chrono::Utc::now());

    let outbox = mailer.outbox();
    assert_eq!(outbox.len(), 1);
    let code = outbox[0].code.as_str().to_string();
    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_digit()));

    service.verify(submit("alice@x.com", &code)).await.unwrap();

    // Consumed challenges read as gone, not as "already verified".
    let replay = service.verify(submit("alice@x.com", &code)).await;
    assert!(matches!(replay, Err(VerificationError::NotFound)));
}

#[tokio::test]
async fn five_mismatches_kill_the_challenge_for_good() {
    let (service, mailer) = real_service();
    service.request_code(issue("alice@x.com")).await.unwrap();
    let code = mailer.outbox()[0].code.as_str().to_string();
    let wrong = wrong_code_for(&code);

    for expected_left in [4u32, 3, 2, 1] {
        let result = service.verify(submit("alice@x.com", wrong)).await;
        match result {
            Err(VerificationError::Mismatch { remaining_attempts }) => {
                assert_eq!(remaining_attempts, expected_left);
            }
            other => panic!("expected mismatch, got {:?}", other),
        }
    }

    let fifth = service.verify(submit("alice@x.com", wrong)).await;
    assert!(matches!(fifth, Err(VerificationError::AttemptsExhausted)));

    let with_correct_code = service.verify(submit("alice@x.com", &code)).await;
    assert!(matches!(
        with_correct_code,
        Err(VerificationError::AttemptsExhausted)
    ));
}

#[tokio::test]
async fn resend_supersedes_the_earlier_challenge() {
    let (service, mailer) = real_service();
    service.request_code(issue("alice@x.com")).await.unwrap();
    service.request_code(issue("alice@x.com")).await.unwrap();

    let outbox = mailer.outbox();
    assert_eq!(outbox.len(), 2);
    let first = outbox[0].code.as_str().to_string();
    let second = outbox[1].code.as_str().to_string();

    if first != second {
        // The superseded code can never verify, even though it never expired.
        let stale = service.verify(submit("alice@x.com", &first)).await;
        assert!(stale.is_err());
    }
    service.verify(submit("alice@x.com", &second)).await.unwrap();
}

#[tokio::test]
async fn challenges_are_tracked_per_address() {
    let (service, mailer) = real_service();
    service.request_code(issue("alice@x.com")).await.unwrap();
    service.request_code(issue("bob@x.com")).await.unwrap();

    let outbox = mailer.outbox();
    let alice_code = outbox[0].code.as_str().to_string();
    let bob_code = outbox[1].code.as_str().to_string();

    service.verify(submit("bob@x.com", &bob_code)).await.unwrap();
    service
        .verify(submit("alice@x.com", &alice_code))
        .await
        .unwrap();
}

fn memory_settings() -> Settings {
    Settings {
        verification: Verification {
            backend: "real".to_string(),
        },
        challenge: Challenge {
            backend: "memory".to_string(),
            mac_secret: "integration-key".to_string(),
            redis_url: None,
        },
        mail: Mail {
            backend: "memory".to_string(),
            smtp: None,
        },
        http: Http {
            address: "127.0.0.1:0".to_string(),
        },
        log: Log {
            filter: "info".to_string(),
        },
    }
}

#[tokio::test]
async fn http_surface_discriminates_rejection_reasons() {
    let server = Arc::new(Server::try_new(&memory_settings()).await.unwrap());
    let filter = warp::path("api")
        .and(warp::path("v1"))
        .and(usher::api::v1::routes(server))
        .recover(usher::api::v1::recover_error);

    let sent = warp::test::request()
        .method("POST")
        .path("/api/v1/send-otp")
        .json(&serde_json::json!({ "email": "alice@x.com" }))
        .reply(&filter)
        .await;
    let body: serde_json::Value = serde_json::from_slice(sent.body()).unwrap();
    assert_eq!(body["success"], true);

    // Nobody knows the code out here; burn the attempt budget with guesses.
    let mut last_code = String::new();
    for _ in 0..6 {
        let guessed = warp::test::request()
            .method("POST")
            .path("/api/v1/verify-otp")
            .json(&serde_json::json!({ "email": "alice@x.com", "code": "999999" }))
            .reply(&filter)
            .await;
        let body: serde_json::Value = serde_json::from_slice(guessed.body()).unwrap();
        if body["success"] == true {
            // A 1-in-a-million lucky guess; the flow is over either way.
            return;
        }
        last_code = body["error"]["code"].as_str().unwrap().to_string();
    }
    assert_eq!(last_code, "attempts_exhausted");

    let unknown = warp::test::request()
        .method("POST")
        .path("/api/v1/verify-otp")
        .json(&serde_json::json!({ "email": "nobody@x.com", "code": "123456" }))
        .reply(&filter)
        .await;
    let body: serde_json::Value = serde_json::from_slice(unknown.body()).unwrap();
    assert_eq!(body["error"]["code"], "not_found");
}

use super::handler;
use crate::application_port::VerificationService;
use crate::server::Server;
use std::convert::Infallible;
use std::sync::Arc;
use warp::Filter;

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let send_otp = warp::post()
        .and(warp::path("send-otp"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.verification_service.clone()))
        .and_then(handler::send_otp);

    let verify_otp = warp::post()
        .and(warp::path("verify-otp"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.verification_service.clone()))
        .and_then(handler::verify_otp);

    send_otp.or(verify_otp)
}

fn with(
    service: Arc<dyn VerificationService>,
) -> impl Filter<Extract = (Arc<dyn VerificationService>,), Error = Infallible> + Clone {
    warp::any().map(move || service.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api;
    use crate::settings::parse_settings;
    use serde_json::Value;

    async fn test_server() -> Arc<Server> {
        let settings = parse_settings(Some("settings/dev.toml")).unwrap();
        Arc::new(Server::try_new(&settings).await.unwrap())
    }

    fn prefixed(
        server: Arc<Server>,
    ) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
        warp::path("api")
            .and(warp::path("v1"))
            .and(api::v1::routes(server))
    }

    #[tokio::test]
    async fn send_otp_accepts_a_valid_address() {
        let filter = prefixed(test_server().await).recover(api::v1::recover_error);
        let response = warp::test::request()
            .method("POST")
            .path("/api/v1/send-otp")
            .json(&serde_json::json!({ "email": "alice@x.com" }))
            .reply(&filter)
            .await;

        assert_eq!(response.status(), 200);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["success"], true);
        assert!(body["data"]["expires_at"].is_string());
    }

    #[tokio::test]
    async fn send_otp_rejects_a_malformed_address() {
        let filter = prefixed(test_server().await).recover(api::v1::recover_error);
        let response = warp::test::request()
            .method("POST")
            .path("/api/v1/send-otp")
            .json(&serde_json::json!({ "email": "not-an-address" }))
            .reply(&filter)
            .await;

        assert_eq!(response.status(), 200);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "invalid_email");
    }

    #[tokio::test]
    async fn verify_otp_discriminates_outcomes() {
        // dev.toml wires the fake service: 123456 verifies, others mismatch.
        let filter = prefixed(test_server().await).recover(api::v1::recover_error);

        let ok = warp::test::request()
            .method("POST")
            .path("/api/v1/verify-otp")
            .json(&serde_json::json!({ "email": "alice@x.com", "code": "123456" }))
            .reply(&filter)
            .await;
        let body: Value = serde_json::from_slice(ok.body()).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["verified"], true);

        let wrong = warp::test::request()
            .method("POST")
            .path("/api/v1/verify-otp")
            .json(&serde_json::json!({ "email": "alice@x.com", "code": "111111" }))
            .reply(&filter)
            .await;
        let body: Value = serde_json::from_slice(wrong.body()).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "mismatch");

        let locked = warp::test::request()
            .method("POST")
            .path("/api/v1/verify-otp")
            .json(&serde_json::json!({ "email": "alice@x.com", "code": "999999" }))
            .reply(&filter)
            .await;
        let body: Value = serde_json::from_slice(locked.body()).unwrap();
        assert_eq!(body["error"]["code"], "attempts_exhausted");
    }
}

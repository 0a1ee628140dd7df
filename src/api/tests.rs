//! Router tests driving the form end to end against an in-memory sheet

#[cfg(test)]
mod tests {
    use crate::{
        api::{AppState, Server},
        batch::BatchSubmitter,
        link::{LinkValidator, signed_query},
        session::SessionStore,
        sheets::memory::MemorySheet,
    };
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use chrono::{Duration, Utc};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    const SECRET: &str = "router-test-secret";
    const DEFAULT_ORG: &str = "Instituto Wedja de Socionomia";

    fn app() -> (Router, Arc<MemorySheet>) {
        app_with_sessions(SessionStore::new())
    }

    fn app_with_sessions(sessions: SessionStore) -> (Router, Arc<MemorySheet>) {
        let sheet = Arc::new(MemorySheet::new());
        let state = AppState::new(
            LinkValidator::new(SECRET, DEFAULT_ORG),
            sessions,
            BatchSubmitter::new(sheet.clone()),
        );
        (Server::router(state), sheet)
    }

    /// Helper to send one request and decode the JSON body (Null when empty)
    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn open(app: &Router, query: &str) -> String {
        let (status, body) = call(app, "POST", &format!("/sessions?{query}"), None).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["session_id"].as_str().unwrap().to_string()
    }

    fn respondent() -> Value {
        json!({
            "respondent": {
                "full_name": "João Lima",
                "birthdate": "1985-11-03",
                "contact": "+55 11 99999-0000",
                "company": "Finance",
                "role": "Manager"
            }
        })
    }

    #[tokio::test]
    async fn test_signed_link_opens_session_for_its_organization() {
        let (app, _) = app();
        let validator = LinkValidator::new(SECRET, DEFAULT_ORG);
        let query = signed_query(&validator, "Acme & Co", Utc::now().timestamp() + 600).unwrap();

        let (status, body) = call(&app, "POST", &format!("/sessions?{query}"), None).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["organization"], "Acme & Co");
        assert_eq!(body["signed"], true);
    }

    #[tokio::test]
    async fn test_bare_link_opens_session_for_default_organization() {
        let (app, _) = app();

        let (status, body) = call(&app, "POST", "/sessions", None).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["organization"], DEFAULT_ORG);
        assert_eq!(body["signed"], false);
    }

    #[tokio::test]
    async fn test_refused_links_open_nothing() {
        let (app, _) = app();
        let validator = LinkValidator::new(SECRET, DEFAULT_ORG);
        let expired = signed_query(&validator, "Acme", Utc::now().timestamp() - 5).unwrap();

        let (status, body) = call(&app, "POST", &format!("/sessions?{expired}"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "expired link");

        let (status, body) = call(&app, "POST", "/sessions?org=Acme", None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "invalid link");

        let (status, body) = call(&app, "POST", "/sessions?org=Acme&exp=1&sig=00", None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "invalid or tampered link");
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let (app, _) = app();

        let uri = format!("/sessions/{}", uuid::Uuid::new_v4());
        let (status, body) = call(&app, "GET", &uri, None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "session not found");
    }

    #[tokio::test]
    async fn test_add_list_and_submit_flow() {
        let (app, sheet) = app();
        let id = open(&app, "").await;
        let records_uri = format!("/sessions/{id}/records");

        let (status, body) = call(
            &app,
            "POST",
            &records_uri,
            Some(json!({ "meeting_date": "2024-04-09", "synthesis": "Set quarterly goals" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["listed"], 1);

        let (status, body) = call(
            &app,
            "POST",
            &records_uri,
            Some(json!({ "meeting_date": "2024-04-10", "synthesis": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("synthesis"));

        let (_, body) = call(&app, "GET", &format!("/sessions/{id}"), None).await;
        assert_eq!(body["records"].as_array().unwrap().len(), 1);
        assert_eq!(body["records"][0]["meeting_date"], "09/04/2024");

        let (status, body) =
            call(&app, "POST", &format!("/sessions/{id}/submit"), Some(respondent())).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["submitted"], 1);
        assert_eq!(body["organization_id"], "AC88938A");

        let rows = &sheet.calls()[0];
        assert_eq!(rows[0][2], "João Lima");
        assert_eq!(rows[0][3], "03/11/1985");
        assert_eq!(rows[0][7], "09/04/2024");
        assert_eq!(rows[0][8], "Set quarterly goals");

        let (_, body) = call(&app, "GET", &format!("/sessions/{id}"), None).await;
        assert!(body["records"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submit_empty_list_is_a_warning() {
        let (app, sheet) = app();
        let id = open(&app, "").await;

        let (status, _) =
            call(&app, "POST", &format!("/sessions/{id}/submit"), Some(respondent())).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(sheet.attempts(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_is_reported_and_list_kept() {
        let (app, sheet) = app();
        let id = open(&app, "").await;
        call(
            &app,
            "POST",
            &format!("/sessions/{id}/records"),
            Some(json!({ "meeting_date": "2024-04-09", "synthesis": "Kept for retry" })),
        )
        .await;
        sheet.fail_next(1);

        let (status, body) =
            call(&app, "POST", &format!("/sessions/{id}/submit"), Some(respondent())).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("currently unavailable"));

        let (_, view) = call(&app, "GET", &format!("/sessions/{id}"), None).await;
        assert_eq!(view["records"][0]["synthesis"], "Kept for retry");

        let (status, _) =
            call(&app, "POST", &format!("/sessions/{id}/submit"), Some(respondent())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(sheet.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_and_end_session() {
        let (app, _) = app();
        let id = open(&app, "").await;
        call(
            &app,
            "POST",
            &format!("/sessions/{id}/records"),
            Some(json!({ "meeting_date": "2024-04-09", "synthesis": "To be cleared" })),
        )
        .await;

        let (status, _) = call(&app, "DELETE", &format!("/sessions/{id}/records"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, view) = call(&app, "GET", &format!("/sessions/{id}"), None).await;
        assert!(view["records"].as_array().unwrap().is_empty());

        let (status, _) = call(&app, "DELETE", &format!("/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, "GET", &format!("/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_minted_links_round_trip_through_router() {
        let (app, _) = app();
        let validator = LinkValidator::new(SECRET, DEFAULT_ORG);
        let exp = Utc::now().timestamp() + 600;

        for org in ["Acme", "Growth 100%", "Lab %41 Team", "Instituto São Paulo"] {
            let query = signed_query(&validator, org, exp).unwrap();
            let (status, body) = call(&app, "POST", &format!("/sessions?{query}"), None).await;

            assert_eq!(status, StatusCode::CREATED, "{org}: {body}");
            assert_eq!(body["organization"], org);
        }
    }

    #[tokio::test]
    async fn test_idle_session_is_not_found() {
        let (app, _) = app_with_sessions(SessionStore::with_limits(Duration::milliseconds(1), 10));
        let id = open(&app, "").await;

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let (status, body) = call(&app, "GET", &format!("/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "session not found");
    }

    #[tokio::test]
    async fn test_session_limit_refuses_new_sessions() {
        let (app, _) = app_with_sessions(SessionStore::with_limits(Duration::hours(1), 2));
        open(&app, "").await;
        open(&app, "").await;

        let (status, body) = call(&app, "POST", "/sessions", None).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].as_str().unwrap().contains("too many open sessions"));
    }

    #[tokio::test]
    async fn test_malformed_payloads_use_error_envelope() {
        let (app, _) = app();
        let id = open(&app, "").await;

        let (status, body) = call(
            &app,
            "POST",
            &format!("/sessions/{id}/records"),
            Some(json!({ "synthesis": "no date given" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("meeting_date"));

        let (status, body) = call(
            &app,
            "POST",
            &format!("/sessions/{id}/records"),
            Some(json!({ "meeting_date": "31/12/2024", "synthesis": "wrong date format" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].is_string());

        let (status, body) = call(&app, "GET", "/sessions/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }
}

use anyhow::Result;
use httpmock::prelude::*;
use chrono::Utc;
use ri_cinc::adapters::cinc::{
    Authenticator, CincClient, LeadEvent, OAuthClient, RateLimiter, SessionStore, TokenSet,
};
use ri_cinc::config::settings::{CincSettings, UploadSettings};
use ri_cinc::core::deliver::{deliver_all, write_failures_csv};
use ri_cinc::domain::model::{Assignments, DeliveryOutcome, LeadRecord};
use ri_cinc::utils::error::ErrorCategory;
use ri_cinc::{EtlEngine, EtlError, LocalStorage, UploadPipeline};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const LEADS_CSV: &str = "\
md5,first_name,last_name,email_1,email_2,phone_1,phone_2,phone_3,address,city,state,zip_code,insight
lead-a,Jane,Doe,jane@example.com,,5551230001,,,1 Main St,Austin,TX,78701,Viewed 12 listings
lead-b,John,Smith,,,,5551230002,,,,,,
lead-c,Ana,Lopez,ana@example.com,,,,,,Denver,CO,80202,
";

fn settings(server: &MockServer) -> CincSettings {
    CincSettings {
        auth_url: server.url("/oauth"),
        api_url: server.url("/api"),
        client_id: "client-1".to_string(),
        client_secret: SecretString::from("secret-1".to_string()),
        redirect_uri: "https://app.example/callback".to_string(),
    }
}

fn store_tokens(store: &SessionStore, access: &str, refresh: &str) -> Result<()> {
    store.save_tokens(&TokenSet {
        access_token: SecretString::from(access.to_string()),
        refresh_token: SecretString::from(refresh.to_string()),
    })?;
    Ok(())
}

fn client(server: &MockServer, store: SessionStore) -> ri_cinc::Result<CincClient> {
    let cinc = settings(server);
    let authenticator = Authenticator::new(OAuthClient::new(reqwest::Client::new(), &cinc), store);
    CincClient::new(
        reqwest::Client::new(),
        cinc.api_url,
        authenticator,
        Arc::new(RateLimiter::unlimited()),
    )
}

fn upload_settings(failures_out: Option<&str>) -> UploadSettings {
    UploadSettings {
        input: "leads.csv".to_string(),
        assignments: Assignments {
            agent_assigned: Some("agent-7".to_string()),
            ..Default::default()
        },
        concurrency: 2,
        requests_per_second: 0,
        failures_out: failures_out.map(str::to_string),
    }
}

#[tokio::test]
async fn test_upload_collects_failed_leads() -> Result<()> {
    let temp_dir = TempDir::new()?;
    std::fs::write(temp_dir.path().join("leads.csv"), LEADS_CSV)?;
    let store = SessionStore::new(temp_dir.path().join("session.json"));
    store_tokens(&store, "access-1", "refresh-1")?;

    let server = MockServer::start_async().await;

    let me_mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/me")
                .header("authorization", "access-1");
            then.status(200).json_body(serde_json::json!({"id": "agent-7"}));
        })
        .await;

    let lead_a = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/leads")
                .header("authorization", "access-1")
                .header("content-type", "application/json")
                .body_contains("\"id\":\"lead-a\"")
                .body_contains("\"mailing_address\"")
                .body_contains("\"primary_agent\":{\"id\":\"agent-7\"}");
            then.status(201).json_body(serde_json::json!({"status": "created"}));
        })
        .await;

    let lead_b = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/leads")
                .body_contains("\"id\":\"lead-b\"");
            then.status(500).body("internal error");
        })
        .await;

    let lead_c = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/leads")
                .body_contains("\"id\":\"lead-c\"")
                .body_contains("\"is_validated_email\":true");
            then.status(201).json_body(serde_json::json!({"status": "created"}));
        })
        .await;

    let pipeline = UploadPipeline::connect(
        LocalStorage::new(temp_dir.path()),
        upload_settings(Some("failed_leads.csv")),
        client(&server, store)?,
    )
    .await?;
    let summary = EtlEngine::new(pipeline).run().await?;

    me_mock.assert_async().await;
    lead_a.assert_async().await;
    lead_b.assert_async().await;
    lead_c.assert_async().await;

    assert_eq!(summary.input_rows, 3);
    assert_eq!(summary.processed_rows, 2);
    assert_eq!(summary.failed_rows, 1);
    assert_eq!(summary.output_path.as_deref(), Some("failed_leads.csv"));

    let report = std::fs::read_to_string(temp_dir.path().join("failed_leads.csv"))?;
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "md5,error");
    assert!(lines[1].starts_with("lead-b,"));
    assert!(lines[1].contains("HTTP 500"));

    Ok(())
}

#[tokio::test]
async fn test_expired_token_is_refreshed_once() -> Result<()> {
    let temp_dir = TempDir::new()?;
    std::fs::write(temp_dir.path().join("leads.csv"), LEADS_CSV)?;
    let store = SessionStore::new(temp_dir.path().join("session.json"));
    store_tokens(&store, "stale", "refresh-1")?;

    let server = MockServer::start_async().await;

    let stale_me = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/me").header("authorization", "stale");
            then.status(401);
        })
        .await;

    let refresh = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/oauth/token")
                .body_contains("grant_type=refresh_token")
                .body_contains("refresh_token=refresh-1")
                .body_contains("client_id=client-1");
            then.status(200).json_body(serde_json::json!({
                "access_token": "fresh",
                "refresh_token": "refresh-2"
            }));
        })
        .await;

    let fresh_me = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/me").header("authorization", "fresh");
            then.status(200);
        })
        .await;

    let leads = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/leads").header("authorization", "fresh");
            then.status(200);
        })
        .await;

    let pipeline = UploadPipeline::connect(
        LocalStorage::new(temp_dir.path()),
        upload_settings(None),
        client(&server, store.clone())?,
    )
    .await?;
    let summary = EtlEngine::new(pipeline).run().await?;

    stale_me.assert_async().await;
    refresh.assert_async().await;
    fresh_me.assert_async().await;
    leads.assert_hits_async(3).await;

    assert_eq!(summary.processed_rows, 3);
    assert_eq!(summary.failed_rows, 0);
    assert_eq!(summary.output_path, None);

    let tokens = store.load_tokens()?.expect("tokens should be stored");
    assert_eq!(tokens.access_token.expose_secret(), "fresh");
    assert_eq!(tokens.refresh_token.expose_secret(), "refresh-2");

    Ok(())
}

#[tokio::test]
async fn test_rejected_credentials_after_refresh() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = SessionStore::new(temp_dir.path().join("session.json"));
    store_tokens(&store, "stale", "refresh-1")?;

    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/me").header("authorization", "stale");
            then.status(401);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/oauth/token");
            then.status(200).json_body(serde_json::json!({
                "access_token": "fresh",
                "refresh_token": "refresh-2"
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/me").header("authorization", "fresh");
            then.status(403);
        })
        .await;

    let result = UploadPipeline::connect(
        LocalStorage::new(temp_dir.path()),
        upload_settings(None),
        client(&server, store)?,
    )
    .await;

    match result {
        Err(EtlError::AuthError { message }) => {
            assert!(message.contains("Please re-authenticate"));
        }
        Err(other) => panic!("expected auth error, got {other:?}"),
        Ok(_) => panic!("expected auth error"),
    }

    Ok(())
}

#[tokio::test]
async fn test_incomplete_refresh_response_resets_session() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = SessionStore::new(temp_dir.path().join("session.json"));
    store_tokens(&store, "stale", "refresh-1")?;

    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/me");
            then.status(401);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/oauth/token");
            then.status(200)
                .json_body(serde_json::json!({"access_token": "fresh"}));
        })
        .await;

    let result = UploadPipeline::connect(
        LocalStorage::new(temp_dir.path()),
        upload_settings(None),
        client(&server, store.clone())?,
    )
    .await;

    assert!(matches!(result, Err(EtlError::AuthError { .. })));
    assert!(!store.path().exists());

    Ok(())
}

#[tokio::test]
async fn test_client_requires_login() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let server = MockServer::start_async().await;

    let result = client(&server, SessionStore::new(temp_dir.path().join("session.json")));
    assert!(matches!(result, Err(EtlError::AuthError { .. })));

    Ok(())
}

#[tokio::test]
async fn test_non_json_success_body_is_a_failed_lead() -> Result<()> {
    let temp_dir = TempDir::new()?;
    std::fs::write(temp_dir.path().join("leads.csv"), LEADS_CSV)?;
    let store = SessionStore::new(temp_dir.path().join("session.json"));
    store_tokens(&store, "access-1", "refresh-1")?;

    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/me");
            then.status(200);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/leads")
                .body_contains("\"id\":\"lead-a\"");
            then.status(200).body("<html>gateway maintenance</html>");
        })
        .await;
    for id in ["lead-b", "lead-c"] {
        server
            .mock_async(move |when, then| {
                when.method(POST)
                    .path("/api/leads")
                    .body_contains(format!("\"id\":\"{}\"", id));
                then.status(201).json_body(serde_json::json!({"status": "created"}));
            })
            .await;
    }

    let pipeline = UploadPipeline::connect(
        LocalStorage::new(temp_dir.path()),
        upload_settings(Some("failed_leads.csv")),
        client(&server, store)?,
    )
    .await?;
    let summary = EtlEngine::new(pipeline).run().await?;

    assert_eq!(summary.processed_rows, 2);
    assert_eq!(summary.failed_rows, 1);

    let report = std::fs::read_to_string(temp_dir.path().join("failed_leads.csv"))?;
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("lead-a,"));
    assert!(lines[1].contains("Serialization error"));

    Ok(())
}

#[tokio::test]
async fn test_outcomes_follow_input_order() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = SessionStore::new(temp_dir.path().join("session.json"));
    store_tokens(&store, "access-1", "refresh-1")?;

    let server = MockServer::start_async().await;

    // 前面的 lead 回應較慢，會最後完成
    let responses = [
        ("lead-1", 500, 600),
        ("lead-2", 201, 400),
        ("lead-3", 500, 200),
        ("lead-4", 201, 0),
        ("lead-5", 500, 0),
    ];
    for (id, status, delay_ms) in responses {
        server
            .mock_async(move |when, then| {
                when.method(POST)
                    .path("/api/leads")
                    .body_contains(format!("\"id\":\"{}\"", id));
                then.status(status)
                    .delay(Duration::from_millis(delay_ms))
                    .json_body(serde_json::json!({"status": "created", "lead": id}));
            })
            .await;
    }

    let events: Vec<LeadEvent> = responses
        .iter()
        .map(|(id, _, _)| {
            let lead = LeadRecord {
                md5: Some(id.to_string()),
                first_name: Some("Test".to_string()),
                ..Default::default()
            };
            LeadEvent::from_lead(&lead, &Assignments::default(), Utc::now())
        })
        .collect();

    let report = deliver_all(Arc::new(client(&server, store)?), events, 4).await;

    assert_eq!(report.outcomes.len(), 5);
    assert_eq!(report.delivered_count(), 2);
    for (outcome, (id, status, _)) in report.outcomes.iter().zip(responses.iter()) {
        match outcome {
            DeliveryOutcome::Delivered(body) => {
                assert_eq!(*status, 201);
                assert_eq!(body["lead"], *id);
            }
            DeliveryOutcome::Failed { error } => {
                assert_eq!(*status, 500);
                assert!(error.contains("HTTP 500"));
            }
        }
    }

    let failed: Vec<&str> = report
        .failed
        .iter()
        .filter_map(|f| f.md5.as_deref())
        .collect();
    assert_eq!(failed, vec!["lead-1", "lead-3", "lead-5"]);

    let csv = String::from_utf8(write_failures_csv(&report.failed)?)?;
    let rows: Vec<&str> = csv.lines().skip(1).map(|l| l.split(',').next().unwrap_or("")).collect();
    assert_eq!(rows, vec!["lead-1", "lead-3", "lead-5"]);

    Ok(())
}

#[tokio::test]
async fn test_expired_refresh_token_resets_session() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = SessionStore::new(temp_dir.path().join("session.json"));
    store_tokens(&store, "stale", "expired-refresh")?;

    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/me");
            then.status(401);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/oauth/token");
            then.status(400)
                .json_body(serde_json::json!({"error": "invalid_grant"}));
        })
        .await;

    let result = UploadPipeline::connect(
        LocalStorage::new(temp_dir.path()),
        upload_settings(None),
        client(&server, store.clone())?,
    )
    .await;

    match result {
        Err(err @ EtlError::AuthError { .. }) => {
            assert_eq!(err.category(), ErrorCategory::Authentication);
            assert!(err.to_string().contains("invalid_grant"));
        }
        Err(other) => panic!("expected auth error, got {other:?}"),
        Ok(_) => panic!("expected auth error"),
    }
    assert!(!store.path().exists());

    Ok(())
}

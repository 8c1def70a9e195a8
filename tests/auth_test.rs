use anyhow::Result;
use httpmock::prelude::*;
use ri_cinc::adapters::cinc::{Authenticator, OAuthClient, SessionStore};
use ri_cinc::config::settings::CincSettings;
use ri_cinc::EtlError;
use secrecy::{ExposeSecret, SecretString};
use tempfile::TempDir;

fn authenticator(server: &MockServer, store: SessionStore) -> Authenticator {
    let settings = CincSettings {
        auth_url: server.url("/oauth"),
        api_url: server.url("/api"),
        client_id: "client-1".to_string(),
        client_secret: SecretString::from("secret-1".to_string()),
        redirect_uri: "https://app.example/callback".to_string(),
    };
    Authenticator::new(OAuthClient::new(reqwest::Client::new(), &settings), store)
}

fn state_from_link(link: &str) -> String {
    url::Url::parse(link)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.to_string())
        .expect("state parameter")
}

#[tokio::test]
async fn test_authorize_then_login() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = SessionStore::new(temp_dir.path().join("session.json"));
    let server = MockServer::start_async().await;

    let token_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/oauth/token")
                .header("content-type", "application/x-www-form-urlencoded")
                .body_contains("grant_type=authorization_code")
                .body_contains("code=code-xyz")
                .body_contains("client_secret=secret-1");
            then.status(200).json_body(serde_json::json!({
                "access_token": "access-1",
                "refresh_token": "refresh-1",
                "token_type": "Bearer"
            }));
        })
        .await;

    let auth = authenticator(&server, store.clone());
    let link = auth.begin_authorization()?;
    assert!(link.starts_with(&server.url("/oauth/authorize")));

    let state = state_from_link(&link);
    assert_eq!(store.pending_state()?.as_deref(), Some(state.as_str()));

    auth.complete_authorization("code-xyz", &state).await?;
    token_mock.assert_async().await;

    let tokens = auth.tokens()?;
    assert_eq!(tokens.access_token.expose_secret(), "access-1");
    assert_eq!(tokens.refresh_token.expose_secret(), "refresh-1");
    assert!(store.pending_state()?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_state_mismatch_resets_session() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = SessionStore::new(temp_dir.path().join("session.json"));
    let server = MockServer::start_async().await;

    let token_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/oauth/token");
            then.status(200);
        })
        .await;

    let auth = authenticator(&server, store.clone());
    auth.begin_authorization()?;

    let err = auth
        .complete_authorization("code-xyz", "forged-state")
        .await
        .unwrap_err();

    assert!(matches!(err, EtlError::StateMismatchError));
    assert_eq!(token_mock.hits_async().await, 0);
    assert!(!store.path().exists());

    Ok(())
}

#[tokio::test]
async fn test_login_without_authorize_is_rejected() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let server = MockServer::start_async().await;
    let auth = authenticator(&server, SessionStore::new(temp_dir.path().join("session.json")));

    let err = auth.complete_authorization("code", "any").await.unwrap_err();
    assert!(matches!(err, EtlError::StateMismatchError));

    Ok(())
}

#[tokio::test]
async fn test_token_response_without_refresh_token() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = SessionStore::new(temp_dir.path().join("session.json"));
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(POST).path("/oauth/token");
            then.status(200)
                .json_body(serde_json::json!({"access_token": "access-1"}));
        })
        .await;

    let auth = authenticator(&server, store.clone());
    let link = auth.begin_authorization()?;
    let err = auth
        .complete_authorization("code", &state_from_link(&link))
        .await
        .unwrap_err();

    assert!(matches!(err, EtlError::AuthError { .. }));
    assert!(auth.tokens().is_err());
    assert!(!store.path().exists());

    Ok(())
}

#[tokio::test]
async fn test_token_endpoint_error() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(POST).path("/oauth/token");
            then.status(400)
                .json_body(serde_json::json!({"error": "invalid_grant"}));
        })
        .await;

    let auth = authenticator(&server, SessionStore::new(temp_dir.path().join("session.json")));
    let link = auth.begin_authorization()?;
    let err = auth
        .complete_authorization("expired", &state_from_link(&link))
        .await
        .unwrap_err();

    match err {
        EtlError::HttpStatusError { status, body, .. } => {
            assert_eq!(status, 400);
            assert!(body.contains("invalid_grant"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn test_logout_clears_tokens() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = SessionStore::new(temp_dir.path().join("session.json"));
    let server = MockServer::start_async().await;
    let auth = authenticator(&server, store.clone());

    auth.begin_authorization()?;
    assert!(store.path().exists());

    auth.logout()?;
    assert!(!store.path().exists());
    assert!(matches!(auth.tokens(), Err(EtlError::AuthError { .. })));

    Ok(())
}

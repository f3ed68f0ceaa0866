use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use peerfund_api::app::AppConfig;
use peerfund_auth::{JwtClaims, PrincipalId, Role};
use reqwest::StatusCode;
use serde_json::json;

const JWT_SECRET: &str = "test-secret";
const ADMIN_EMAIL: &str = "admin@peerfund.test";
const ADMIN_PASSWORD: &str = "letmein-please";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Build the same router as prod, but bind to an ephemeral port.
        let config = AppConfig {
            jwt_secret: JWT_SECRET.to_string(),
            admin_email: ADMIN_EMAIL.to_string(),
            admin_password: ADMIN_PASSWORD.to_string(),
            base_url: "http://localhost".to_string(),
        };
        let app = peerfund_api::app::build_app(config).await;
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn sign_up(client: &reqwest::Client, base_url: &str, username: &str, email: &str) -> String {
    let res = client
        .post(format!("{}/authenticate/sign-up", base_url))
        .json(&json!({ "username": username, "email": email, "password": "s3cret-pw" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

async fn admin_token(client: &reqwest::Client, base_url: &str) -> String {
    let res = client
        .post(format!("{}/authenticate/admin/login", base_url))
        .json(&json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

async fn admin_find_user_id(
    client: &reqwest::Client,
    base_url: &str,
    admin: &str,
    email: &str,
) -> String {
    let res = client
        .get(format!("{}/admin/users", base_url))
        .bearer_auth(admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    body["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["email"] == email)
        .unwrap_or_else(|| panic!("user {email} not in directory listing"))["userId"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn set_alloted(client: &reqwest::Client, base_url: &str, admin: &str, email: &str, amount: i64) {
    let res = client
        .put(format!("{}/admin/balances/alloted", base_url))
        .bearer_auth(admin)
        .json(&json!({ "email": email, "amount": amount }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

async fn add_bank_details(client: &reqwest::Client, base_url: &str, token: &str, account_no: &str) {
    let res = client
        .put(format!("{}/account/bank-details", base_url))
        .bearer_auth(token)
        .json(&json!({
            "accHolderName": "Asha Rao",
            "bankName": "SBI",
            "accountNo": account_no,
            "ifsc": format!("IFSC{account_no}"),
            "accountType": "Savings account",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_is_public_but_account_routes_are_not() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(format!("{}/health", srv.base_url)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(format!("{}/account/balance", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn forged_token_is_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // Well-formed claims, signed with the wrong secret.
    let now = Utc::now();
    let claims = JwtClaims {
        sub: PrincipalId::new(),
        roles: vec![Role::new("admin")],
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };
    let forged = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(b"wrong-secret"),
    )
    .unwrap();

    let res = client
        .get(format!("{}/admin/users", srv.base_url))
        .bearer_auth(forged)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sign_up_validates_fields_and_rejects_duplicates() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/authenticate/sign-up", srv.base_url))
        .json(&json!({ "username": "ab", "email": "nope", "password": "pw" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["fields"].as_array().unwrap().len(), 3);

    sign_up(&client, &srv.base_url, "alice99", "alice@example.com").await;

    let res = client
        .post(format!("{}/authenticate/sign-up", srv.base_url))
        .json(&json!({
            "username": "alice99",
            "email": "other@example.com",
            "password": "s3cret-pw",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Email or Username already exist");
}

#[tokio::test]
async fn login_checks_credentials() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    sign_up(&client, &srv.base_url, "alice99", "alice@example.com").await;

    let res = client
        .post(format!("{}/authenticate/login", srv.base_url))
        .json(&json!({ "email": "nobody@example.com", "password": "s3cret-pw" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .post(format!("{}/authenticate/login", srv.base_url))
        .json(&json!({ "email": "alice@example.com", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(format!("{}/authenticate/login", srv.base_url))
        .json(&json!({ "email": "alice@example.com", "password": "s3cret-pw" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    let token = body["token"].as_str().unwrap();

    let res = client
        .get(format!("{}/account/balance", srv.base_url))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn balance_status_is_idempotent_and_starts_at_zero() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = sign_up(&client, &srv.base_url, "alice99", "alice@example.com").await;

    let mut bodies = Vec::new();
    for _ in 0..2 {
        let res = client
            .get(format!("{}/account/balance", srv.base_url))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        bodies.push(res.json::<serde_json::Value>().await.unwrap());
    }

    assert_eq!(bodies[0], bodies[1]);
    assert_eq!(
        bodies[0],
        json!({ "allotedAmt": 0, "lockedAmt": 0, "availToWithdraw": 0, "disbursedAmt": 0 })
    );
}

#[tokio::test]
async fn withdrawal_lifecycle_request_then_settle() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = sign_up(&client, &srv.base_url, "alice99", "alice@example.com").await;
    let admin = admin_token(&client, &srv.base_url).await;

    set_alloted(&client, &srv.base_url, &admin, "alice@example.com", 1000).await;
    add_bank_details(&client, &srv.base_url, &token, "0012345678").await;

    // Balance reflects the allotment.
    let res = client
        .get(format!("{}/account/balance", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["availToWithdraw"], 1000);

    // Request defaults to the full available balance.
    let res = client
        .post(format!("{}/account/withdrawals", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["amount"], 1000);
    assert_eq!(body["status"], "Processing");

    // A second request is rejected while one is pending.
    let res = client
        .post(format!("{}/account/withdrawals", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "withdraw request already pending");

    // Admin settles it.
    let user_id =
        admin_find_user_id(&client, &srv.base_url, &admin, "alice@example.com").await;
    let res = client
        .post(format!("{}/admin/users/{}/withdrawals/settle", srv.base_url, user_id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["disbursedAmt"], 1000);
    assert_eq!(body["availToWithdraw"], 0);
    assert!(body["pendingRequest"].is_null());
    let transactions = body["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0]["amount"], 1000);
    assert_eq!(transactions[0]["status"], "Processed");

    // Settling again finds nothing.
    let res = client
        .post(format!("{}/admin/users/{}/withdrawals/settle", srv.base_url, user_id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "No withdraw request for the user at this moment");
}

#[tokio::test]
async fn withdrawal_preconditions_fail_with_specific_messages() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = admin_token(&client, &srv.base_url).await;

    // Bank details on file, but no allotment.
    let broke = sign_up(&client, &srv.base_url, "broke-user", "broke@example.com").await;
    add_bank_details(&client, &srv.base_url, &broke, "0012345678").await;
    let res = client
        .post(format!("{}/account/withdrawals", srv.base_url))
        .bearer_auth(&broke)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "no available balance");

    // Funded, but no bank details.
    let nobank = sign_up(&client, &srv.base_url, "nobank-user", "nobank@example.com").await;
    set_alloted(&client, &srv.base_url, &admin, "nobank@example.com", 500).await;
    let res = client
        .post(format!("{}/account/withdrawals", srv.base_url))
        .bearer_auth(&nobank)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "bank details not added for the user");

    // Funded with bank details, then blocked.
    let blocked = sign_up(&client, &srv.base_url, "blocked-user", "blocked@example.com").await;
    set_alloted(&client, &srv.base_url, &admin, "blocked@example.com", 500).await;
    add_bank_details(&client, &srv.base_url, &blocked, "9912345678").await;
    let user_id =
        admin_find_user_id(&client, &srv.base_url, &admin, "blocked@example.com").await;
    let res = client
        .post(format!("{}/admin/users/{}/block", srv.base_url, user_id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(format!("{}/account/withdrawals", srv.base_url))
        .bearer_auth(&blocked)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "User is blocked");
    assert_eq!(body["error"], "rule_violation");
}

#[tokio::test]
async fn locked_amount_edits_follow_the_positive_guard_and_clamp() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    sign_up(&client, &srv.base_url, "alice99", "alice@example.com").await;
    let admin = admin_token(&client, &srv.base_url).await;
    set_alloted(&client, &srv.base_url, &admin, "alice@example.com", 1000).await;

    // Zero is not a valid lock amount.
    let res = client
        .put(format!("{}/admin/balances/locked", srv.base_url))
        .bearer_auth(&admin)
        .json(&json!({ "email": "alice@example.com", "amount": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Locking past the allotment clamps the available balance at zero.
    let res = client
        .put(format!("{}/admin/balances/locked", srv.base_url))
        .bearer_auth(&admin)
        .json(&json!({ "email": "alice@example.com", "amount": 1500 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["lockedAmt"], 1500);
    assert_eq!(body["availToWithdraw"], 0);

    // Additive edits go through the increments route.
    let res = client
        .post(format!("{}/admin/balances/alloted/increments", srv.base_url))
        .bearer_auth(&admin)
        .json(&json!({ "email": "alice@example.com", "delta": 1000 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["allotedAmt"], 2000);
    assert_eq!(body["availToWithdraw"], 500);
}

#[tokio::test]
async fn admin_routes_reject_user_tokens() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = sign_up(&client, &srv.base_url, "alice99", "alice@example.com").await;

    let res = client
        .get(format!("{}/admin/users", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .put(format!("{}/admin/balances/alloted", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "email": "alice@example.com", "amount": 10_000 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_reads_bank_details() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = sign_up(&client, &srv.base_url, "alice99", "alice@example.com").await;
    add_bank_details(&client, &srv.base_url, &token, "0012345678").await;
    let admin = admin_token(&client, &srv.base_url).await;

    let user_id = admin_find_user_id(&client, &srv.base_url, &admin, "alice@example.com").await;
    let res = client
        .get(format!("{}/admin/users/{}/bank-details", srv.base_url, user_id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["accountNo"], "0012345678");
}

#[tokio::test]
async fn deleting_a_user_cascades_to_every_record() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = sign_up(&client, &srv.base_url, "alice99", "alice@example.com").await;
    let admin = admin_token(&client, &srv.base_url).await;

    set_alloted(&client, &srv.base_url, &admin, "alice@example.com", 1000).await;
    add_bank_details(&client, &srv.base_url, &token, "0012345678").await;
    let res = client
        .post(format!("{}/account/withdrawals", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let user_id = admin_find_user_id(&client, &srv.base_url, &admin, "alice@example.com").await;
    let res = client
        .delete(format!("{}/admin/users/{}", srv.base_url, user_id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Every subsequent lookup is not-found.
    let res = client
        .get(format!("{}/account/balance", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(format!("{}/admin/users/{}/ledger", srv.base_url, user_id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(format!("{}/admin/users/{}/bank-details", srv.base_url, user_id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .post(format!("{}/authenticate/login", srv.base_url))
        .json(&json!({ "email": "alice@example.com", "password": "s3cret-pw" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn concurrent_withdrawal_requests_create_at_most_one() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = sign_up(&client, &srv.base_url, "alice99", "alice@example.com").await;
    let admin = admin_token(&client, &srv.base_url).await;
    set_alloted(&client, &srv.base_url, &admin, "alice@example.com", 1000).await;
    add_bank_details(&client, &srv.base_url, &token, "0012345678").await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let client = client.clone();
        let url = format!("{}/account/withdrawals", srv.base_url);
        let token = token.clone();
        handles.push(tokio::spawn(async move {
            client
                .post(url)
                .bearer_auth(token)
                .json(&json!({}))
                .send()
                .await
                .map(|r| r.status() == StatusCode::CREATED)
                .unwrap_or(false)
        }));
    }

    let mut created = 0;
    for handle in handles {
        if handle.await.unwrap() {
            created += 1;
        }
    }
    assert_eq!(created, 1);

    // Exactly one request is pending, for the full balance.
    let user_id = admin_find_user_id(&client, &srv.base_url, &admin, "alice@example.com").await;
    let res = client
        .get(format!("{}/admin/users/{}/ledger", srv.base_url, user_id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["pendingRequest"]["amount"], 1000);
}

#[tokio::test]
async fn password_reset_round_trip() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    sign_up(&client, &srv.base_url, "alice99", "alice@example.com").await;

    let res = client
        .post(format!("{}/authenticate/reset", srv.base_url))
        .json(&json!({ "email": "alice@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "password reset link sent to your email account");

    // Unknown email is rejected before any token is minted.
    let res = client
        .post(format!("{}/authenticate/reset", srv.base_url))
        .json(&json!({ "email": "nobody@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // A bogus token cannot reset the password.
    let admin = admin_token(&client, &srv.base_url).await;
    let user_id = admin_find_user_id(&client, &srv.base_url, &admin, "alice@example.com").await;
    let res = client
        .post(format!(
            "{}/authenticate/password-reset/{}/not-the-token",
            srv.base_url, user_id
        ))
        .json(&json!({ "password": "new-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "invalid or expired link");
}

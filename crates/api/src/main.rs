use peerfund_api::app::AppConfig;

#[tokio::main]
async fn main() {
    peerfund_observability::init();

    let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
        "dev-secret".to_string()
    });
    let admin_email = std::env::var("ADMIN_EMAIL").unwrap_or_else(|_| {
        tracing::warn!("ADMIN_EMAIL not set; using dev default");
        "admin@peerfund.local".to_string()
    });
    let admin_password = std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| {
        tracing::warn!("ADMIN_PASSWORD not set; using insecure dev default");
        "admin-dev-password".to_string()
    });
    let base_url =
        std::env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let config = AppConfig {
        jwt_secret,
        admin_email,
        admin_password,
        base_url,
    };

    let app = peerfund_api::app::build_app(config).await;

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {bind_addr}: {e}"));

    tracing::info!("listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}

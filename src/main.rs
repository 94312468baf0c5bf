use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use exam_portal_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    routes,
    store::{ExamStore, PgStore},
    AppState,
};
use chrono::Utc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let store: Arc<PgStore> = Arc::new(PgStore::new(pool));
    let app_state = AppState::new(store.clone());

    // Hygienic sweep for sessions nobody touches again; the per-request lazy
    // check stays the correctness mechanism.
    if config.expiry_sweep_secs > 0 {
        let sweep_store = store.clone();
        let interval = Duration::from_secs(config.expiry_sweep_secs);
        tokio::spawn(async move {
            loop {
                match sweep_store.expire_overdue_sessions(Utc::now()).await {
                    Ok(0) => {}
                    Ok(expired) => info!(expired, "expiry sweep transitioned sessions"),
                    Err(e) => tracing::error!(error = ?e, "expiry sweep error"),
                }
                tokio::time::sleep(interval).await;
            }
        });
    }

    let app = routes::api_router(app_state, config.public_rps)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

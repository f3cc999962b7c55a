use std::{
    net::{Ipv4Addr, SocketAddr},
    path::PathBuf,
    sync::Arc,
};

use axum::{response::IntoResponse, routing::get, Extension, Json, Router};
use chrono::Utc;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tracing::info;

use crate::{
    aggregator::{aggregate_from_file, AggregationError, EmployeesResponse},
    balance_cache::BalanceCacheFile,
    env::ENV_CONFIG,
    explorer::ExplorerHttp,
    health::{HealthCheckable, ServeHealth},
    log,
};

pub type StateExtension = Extension<Arc<State>>;

pub struct State {
    pub balance_cache: BalanceCacheFile,
    pub explorer: ExplorerHttp,
    pub health: ServeHealth,
    pub wallets_path: PathBuf,
}

impl State {
    fn from_env() -> Self {
        Self {
            balance_cache: BalanceCacheFile::new(&ENV_CONFIG.balance_cache_path),
            explorer: ExplorerHttp::new(),
            health: ServeHealth::new(),
            wallets_path: ENV_CONFIG.wallets_path.clone(),
        }
    }
}

async fn get_employees(
    Extension(state): StateExtension,
) -> Result<Json<EmployeesResponse>, AggregationError> {
    let result = aggregate_from_file(
        &state.explorer,
        &state.balance_cache,
        &state.wallets_path,
        Utc::now(),
    )
    .await;

    match &result {
        Ok(_) => state.health.set_aggregation_succeeded(),
        Err(err) => state.health.set_aggregation_failed(&err.to_string()),
    }

    result.map(Json)
}

fn make_app(shared_state: Arc<State>) -> Router {
    Router::new()
        .route("/api/employees", get(get_employees))
        .route(
            "/healthz",
            get(|state: StateExtension| async move {
                state.health.health_status().into_response()
            }),
        )
        .layer(
            ServiceBuilder::new()
                .layer(CompressionLayer::new())
                .layer(Extension(shared_state)),
        )
}

pub async fn start_server() -> anyhow::Result<()> {
    log::init();

    let shared_state = Arc::new(State::from_env());
    info!(
        explorer = %ENV_CONFIG.explorer_api_url,
        wallets_path = %shared_state.wallets_path.display(),
        "starting balance history server"
    );

    let app = make_app(shared_state);

    let ip = if ENV_CONFIG.bind_public_interface {
        Ipv4Addr::UNSPECIFIED
    } else {
        Ipv4Addr::LOCALHOST
    };
    let socket_addr = SocketAddr::from((ip, ENV_CONFIG.port));

    info!(%socket_addr, "server listening");
    axum::Server::bind(&socket_addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}

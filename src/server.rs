use axum::{
    extract::{ConnectInfo, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::api::{ApiScoreRequest, ApiScoreResponse};
use viralscope::config::ScoringConfig;
use viralscope::experiment::{TracingSink, VariantAssigner};
use viralscope::scoring::{FormulaScorer, HybridScorer};

#[derive(Clone)]
struct AppState {
    scorer: Arc<HybridScorer>,
    assigner: Arc<VariantAssigner>,
    formula: FormulaScorer,
}

pub async fn serve(args: crate::ServeArgs) -> Result<(), String> {
    let (config, _) = ScoringConfig::load(None)?;
    let scorer = HybridScorer::from_config(&config)?;
    let assigner =
        VariantAssigner::new(config.experiment.clone()).with_sink(Arc::new(TracingSink));

    let state = AppState {
        scorer: Arc::new(scorer),
        assigner: Arc::new(assigner),
        formula: FormulaScorer::new(),
    };

    let app = Router::new()
        .route("/api/health", get(health))
        .route("/api/score", post(score_handler))
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .map_err(|err| format!("invalid bind address: {}", err))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| format!("failed to bind server: {}", err))?;
    tracing::info!(%addr, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|err| format!("server error: {}", err))?;

    Ok(())
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let ml_available = match state.scorer.ml_client() {
        Some(client) => client.is_available().await,
        None => false,
    };
    Json(serde_json::json!({
        "status": "ok",
        "ml_available": ml_available,
    }))
}

async fn score_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(request): Json<ApiScoreRequest>,
) -> Result<Json<ApiScoreResponse>, (StatusCode, String)> {
    let forced = request
        .parse_method()
        .map_err(|err| (StatusCode::BAD_REQUEST, err))?;
    // Stable caller-supplied id when present; the client address is the
    // degraded fallback identity.
    let user_id = request
        .user_id
        .clone()
        .unwrap_or_else(|| addr.ip().to_string());
    let metrics = request
        .into_metrics()
        .map_err(|err| (StatusCode::BAD_REQUEST, err))?;

    let method = forced.unwrap_or_else(|| state.assigner.assign(&user_id));
    state.assigner.log_exposure(&user_id, method);

    let breakdown = state.formula.breakdown(&metrics);
    let outcome = state.scorer.score(&metrics, method).await;
    state
        .assigner
        .log_outcome(&user_id, method, outcome.result().final_score);

    Ok(Json(ApiScoreResponse::from_outcome(outcome, breakdown)))
}

use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryValuationStore, StoreMutationClient, StoreSource};
use crate::routes::with_valuation_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use valuation_desk::config::AppConfig;
use valuation_desk::error::AppError;
use valuation_desk::telemetry;
use valuation_desk::workflows::valuations::{
    DurationTicker, FormFamily, ReviewService, ValuationSource,
};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryValuationStore::default());
    let sources: Vec<Arc<dyn ValuationSource>> = FormFamily::ALL
        .into_iter()
        .map(|family| {
            Arc::new(StoreSource::new(Arc::clone(&store), family)) as Arc<dyn ValuationSource>
        })
        .collect();
    let mutations = Arc::new(StoreMutationClient::new(store));
    let review_service = Arc::new(ReviewService::new(
        sources,
        mutations,
        config.dashboard.page_size,
    ));

    // Keeps the elapsed-time display fresh for the server's lifetime;
    // aborted when this guard drops.
    let _duration_ticker = DurationTicker::start(review_service.dashboard());

    let app = with_valuation_routes(review_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "valuation review service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

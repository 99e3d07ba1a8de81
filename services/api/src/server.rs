use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryEmployeeDirectory, InMemoryRequisitionGateway};
use crate::routes::with_import_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use reqflow::config::AppConfig;
use reqflow::error::AppError;
use reqflow::telemetry;
use reqflow::workflows::import::{CancelToken, ImportWorkflow};
use reqflow::workflows::requisition::{ActingUser, BoardHandle};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

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

    let acting_user = ActingUser {
        name: args.operator.clone(),
        registration: None,
    };
    let workflow = Arc::new(ImportWorkflow::new(
        Arc::new(InMemoryEmployeeDirectory::default()),
        Arc::new(InMemoryRequisitionGateway::default()),
        BoardHandle::new(),
        acting_user,
        CancelToken::new(),
        config.import.resync_delay(),
    ));

    let app = with_import_routes(workflow)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "requisition import service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

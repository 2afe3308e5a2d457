use std::sync::Arc;

use poem::handler;
use poem::http::StatusCode;
use poem::web::Data;
use poem::Response;

use crate::metrics::IknowMetrics;

/// Prometheus scrape endpoint
#[handler]
pub async fn get_metrics(Data(metrics): Data<&Arc<IknowMetrics>>) -> Response {
    match metrics.encode() {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .content_type(metrics.content_type())
            .body(body),
        Err(report) => {
            tracing::error!("Failed to encode metrics: {report:?}");
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body("failed to encode metrics")
        }
    }
}

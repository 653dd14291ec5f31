/// Liveness and metrics endpoints
use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::error::Result;
use crate::metrics::ServiceMetrics;

/// Liveness probe; does not touch any dependency
pub async fn live() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

pub async fn metrics(metrics: web::Data<ServiceMetrics>) -> Result<HttpResponse> {
    let body = metrics.render()?;
    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(body))
}

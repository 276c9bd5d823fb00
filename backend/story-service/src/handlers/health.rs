/// Health endpoints
use actix_web::{web, HttpResponse};
use sqlx::PgPool;

/// Service health; checks PostgreSQL when the service runs against it
pub async fn health_summary(pool: Option<web::Data<PgPool>>) -> HttpResponse {
    let Some(pool) = pool else {
        return HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "story-service",
            "version": env!("CARGO_PKG_VERSION")
        }));
    };

    match sqlx::query("SELECT 1").execute(pool.get_ref()).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "story-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "status": "unhealthy",
                "error": format!("PostgreSQL connection failed: {}", e),
                "service": "story-service"
            }))
        }
    }
}

pub async fn liveness_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"alive": true}))
}

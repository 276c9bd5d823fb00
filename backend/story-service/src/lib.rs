/// Story Service Library
///
/// HTTP surface for ephemeral stories: the grouped story feed, story
/// creation, idempotent view tracking and the author-only viewer list.
///
/// # Modules
///
/// - `handlers`: Story HTTP request handlers and health checks
/// - `middleware`: Gateway identity extraction and request metrics
/// - `error`: Error types and HTTP mapping
/// - `config`: Configuration management
/// - `metrics`: Prometheus `/metrics` endpoint
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;

pub use config::Config;
pub use error::{AppError, Result};

use actix_web::web;

/// Register every story-service route on an actix app
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/metrics", web::get().to(metrics::serve_metrics))
        .route("/api/v1/health", web::get().to(handlers::health_summary))
        .route("/api/v1/health/live", web::get().to(handlers::liveness_check))
        .service(
            web::scope("/api/v1/stories")
                .wrap(middleware::MetricsMiddleware)
                .wrap(middleware::GatewayIdentity)
                .service(web::resource("").route(web::post().to(handlers::create_story)))
                .route("/groups", web::get().to(handlers::list_story_groups))
                .route("/{story_id}/views", web::post().to(handlers::record_story_view))
                .route(
                    "/{story_id}/viewers",
                    web::get().to(handlers::list_story_viewers),
                ),
        );
}

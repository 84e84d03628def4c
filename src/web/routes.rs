use actix_web::web;
use crate::web::handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/web-site-agent", web::post().to(handlers::chat))
            .route("/language-detection", web::post().to(handlers::detect_language))
            .route("/messages", web::post().to(handlers::save_message))
            .route("/conversations/{id}/messages", web::get().to(handlers::list_messages))
            .route("/users", web::post().to(handlers::create_user))
            .route("/users/{id}", web::get().to(handlers::get_user))
    )
    .route("/health", web::get().to(handlers::health_check));
}

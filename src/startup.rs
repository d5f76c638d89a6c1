use actix_web::dev::Server;
use actix_web::error::InternalError;
use actix_web::{web, App, HttpResponse, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::configuration::JwtSettings;
use crate::error::ErrorBody;
use crate::logger::LoggerMiddleware;
use crate::middleware::JwtMiddleware;
use crate::routes::{
    end_friendship, get_users, health_check, login, refresh_token, register, revoke_token,
    start_friendship, update_friendship,
};
use crate::store::{FriendshipStore, UserStore};

/// Malformed JSON payloads surface in the same error-body shape as
/// everything else, keyed "payload".
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let body = ErrorBody::new("payload", &[err.to_string()]);
        InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
    })
}

pub fn run(
    listener: TcpListener,
    user_store: Arc<dyn UserStore>,
    friendship_store: Arc<dyn FriendshipStore>,
    jwt_config: JwtSettings,
) -> Result<Server, std::io::Error> {
    let user_store: web::Data<dyn UserStore> = web::Data::from(user_store);
    let friendship_store: web::Data<dyn FriendshipStore> = web::Data::from(friendship_store);
    let jwt_config_data = web::Data::new(jwt_config.clone());

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(LoggerMiddleware)

            // Shared state
            .app_data(user_store.clone())
            .app_data(friendship_store.clone())
            .app_data(jwt_config_data.clone())
            .app_data(json_config())

            // Public routes (no authentication required)
            .route("/health_check", web::get().to(health_check))
            .route("/api/auth/register", web::post().to(register))
            .route("/api/auth/login", web::post().to(login))
            // Registered ahead of the /api/token scope so it skips the
            // strict middleware: the handler validates its own,
            // possibly-expired, access token.
            .route("/api/token/refresh", web::post().to(refresh_token))

            // Protected routes (require a live JWT)
            .service(
                web::scope("/api/token")
                    .wrap(JwtMiddleware::new(jwt_config.clone()))
                    .route("/revoke", web::delete().to(revoke_token)),
            )
            .service(
                web::scope("/api/user")
                    .wrap(JwtMiddleware::new(jwt_config.clone()))
                    .route("", web::get().to(get_users))
                    .route("/friend", web::post().to(start_friendship))
                    .route("/friend", web::patch().to(update_friendship))
                    .route("/friend", web::delete().to(end_friendship)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}

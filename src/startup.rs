use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::AuthService;
use crate::configuration::JwtSettings;
use crate::error::{AppError, ValidationError};
use crate::logger::RequestLogger;
use crate::routes::{
    change_password, force_delete, get_info, health_check, list_stored, list_trash, login,
    logout, not_found, refresh, register, restore, soft_delete,
};
use crate::store::UserStore;

pub fn run(
    listener: TcpListener,
    store: Arc<dyn UserStore>,
    jwt_config: JwtSettings,
    password_hash_cost: u32,
) -> Result<Server, std::io::Error> {
    let auth = web::Data::new(AuthService::new(
        store.clone(),
        &jwt_config,
        password_hash_cost,
    ));
    let store: web::Data<dyn UserStore> = web::Data::from(store);

    let server = HttpServer::new(move || {
        // Malformed JSON bodies get the same error envelope as validation failures
        let json_config = web::JsonConfig::default().error_handler(|err, _req| {
            AppError::Validation(ValidationError::InvalidBody(err.to_string())).into()
        });

        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(RequestLogger)

            // Shared state
            .app_data(auth.clone())
            .app_data(store.clone())
            .app_data(json_config)

            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/users")
                    // Public routes
                    .route("/auth/register", web::post().to(register))
                    .route("/auth/login", web::post().to(login))
                    .route("/auth/refresh", web::post().to(refresh))

                    // Protected routes: handlers take AuthenticatedUser
                    .route("/auth/logout", web::post().to(logout))
                    .route("/password", web::patch().to(change_password))
                    .route("/stored", web::get().to(list_stored))
                    .route("/trash", web::get().to(list_trash))
                    .route("/info", web::get().to(get_info))
                    .route("/restore", web::put().to(restore))
                    .route("/{id}/force", web::delete().to(force_delete))
                    .route("/{id}", web::delete().to(soft_delete)),
            )
            .default_service(web::route().to(not_found))
    })
    .listen(listener)?
    .run();

    Ok(server)
}

// src/main.rs

mod app_state;
mod auth;
mod comment;
mod config;
mod db;
mod history;
mod models;
mod notification;
mod project;
mod task;
mod user_management;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use actix_cors::Cors;
use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http,
    middleware::Logger,
    web, App, Error, HttpMessage, HttpResponse, HttpServer, Responder,
};
use env_logger::Env;
use futures_util::future::{ok, Ready};

use crate::app_state::AppState;
use crate::auth::{ensure_default_admin, login, validate_jwt};
use crate::comment::{create_comment, get_comments};
use crate::history::{get_all_history, get_task_history};
use crate::notification::{get_notifications, mark_notifications_read};
use crate::project::{
    create_project, delete_project, get_project, list_projects, update_project,
};
use crate::task::{create_task, delete_task, get_task, list_tasks, update_task};
use crate::user_management::list_users;

/// Bearer-token middleware. A valid token puts the decoded claims into request
/// extensions; handlers that need an identity read them back. A present but
/// invalid token is rejected here with 401; a missing header passes through so
/// open routes (login, health) keep working.
pub struct Authentication {
    jwt_secret: String,
}

impl Authentication {
    pub fn new(jwt_secret: String) -> Self {
        Authentication { jwt_secret }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = AuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddleware {
            service,
            jwt_secret: self.jwt_secret.clone(),
        })
    }
}

pub struct AuthMiddleware<S> {
    service: S,
    jwt_secret: String,
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // Extract "Bearer <token>" from the Authorization header if present
        if let Some(auth_header) = req.headers().get(http::header::AUTHORIZATION) {
            if let Ok(auth_str) = auth_header.to_str() {
                if auth_str.starts_with("Bearer ") {
                    let token = auth_str.trim_start_matches("Bearer ").trim();
                    match validate_jwt(token, &self.jwt_secret) {
                        Ok(claims) => {
                            req.extensions_mut().insert(claims);
                        }
                        Err(e) => {
                            let (req_parts, _payload) = req.into_parts();
                            let resp = HttpResponse::Unauthorized()
                                .body(format!("Invalid token: {}", e))
                                .map_into_boxed_body();
                            let srv_resp = ServiceResponse::new(req_parts, resp);
                            return Box::pin(async move { Ok(srv_resp) });
                        }
                    }
                }
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_boxed_body())
        })
    }
}

async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = config::Config::from_env();
    let mongodb = Arc::new(db::MongoDB::init(&config.mongo_uri, &config.database_name).await);
    ensure_default_admin(&mongodb.db)
        .await
        .expect("Failed to initialize default data");

    let frontend_origin = config.frontend_origin.clone();
    let jwt_secret = config.jwt_secret.clone();

    println!("Server running at http://0.0.0.0:8080");
    println!("Allowed CORS Origin: {}", frontend_origin);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                http::header::CONTENT_TYPE,
                http::header::ACCEPT,
                http::header::AUTHORIZATION,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .wrap(Authentication::new(jwt_secret.clone()))
            .app_data(web::Data::new(AppState {
                mongodb: mongodb.clone(),
                config: config.clone(),
            }))
            .service(
                web::scope("/api")
                    .service(
                        web::scope("/auth")
                            .route("/login", web::post().to(login))
                    )
                    // TASKS
                    .service(
                        web::scope("/tasks")
                            .route("", web::get().to(list_tasks))
                            .route("", web::post().to(create_task))
                            .route("/{task_id}", web::get().to(get_task))
                            .route("/{task_id}", web::put().to(update_task))
                            .route("/{task_id}", web::delete().to(delete_task))
                    )
                    // PROJECTS
                    .service(
                        web::scope("/projects")
                            .route("", web::get().to(list_projects))
                            .route("", web::post().to(create_project))
                            .route("/{project_id}", web::get().to(get_project))
                            .route("/{project_id}", web::put().to(update_project))
                            .route("/{project_id}", web::delete().to(delete_project))
                    )
                    // COMMENTS
                    .service(
                        web::scope("/comments")
                            .route("", web::post().to(create_comment))
                            .route("/{task_id}", web::get().to(get_comments))
                    )
                    // HISTORY
                    .service(
                        web::scope("/history")
                            .route("", web::get().to(get_all_history))
                            .route("/{task_id}", web::get().to(get_task_history))
                    )
                    // NOTIFICATIONS
                    .service(
                        web::scope("/notifications")
                            .route("", web::get().to(get_notifications))
                            .route("/read", web::put().to(mark_notifications_read))
                    )
                    // USERS
                    .service(
                        web::scope("/users")
                            .route("", web::get().to(list_users))
                    )
                    .route("/health", web::get().to(health_check))
            )
    })
        .bind("0.0.0.0:8080")?
        .run()
        .await
}

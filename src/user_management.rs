// src/user_management.rs

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use futures_util::StreamExt;
use log::error;
use mongodb::bson::doc;

use crate::app_state::AppState;
use crate::auth::current_user;
use crate::models::PublicUser;

/// GET /api/users — all users, password hash projected away.
pub async fn list_users(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    if current_user(&req).is_none() {
        return HttpResponse::Unauthorized().body("Unauthorized");
    }

    let users_coll = data.mongodb.db.collection::<PublicUser>("users");
    let mut cursor = match users_coll
        .find(doc! {})
        .projection(doc! { "hashed_password": 0 })
        .await
    {
        Ok(c) => c,
        Err(e) => {
            error!("Error fetching users: {}", e);
            return HttpResponse::InternalServerError().body("Error fetching users");
        }
    };
    let mut users = Vec::new();
    while let Some(res) = cursor.next().await {
        match res {
            Ok(u) => users.push(u),
            Err(e) => {
                error!("Cursor error: {}", e);
                return HttpResponse::InternalServerError().body("Error reading users");
            }
        }
    }
    HttpResponse::Ok().json(users)
}

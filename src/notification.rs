// src/notification.rs

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use futures_util::StreamExt;
use log::error;
use mongodb::bson::doc;

use crate::app_state::AppState;
use crate::auth::current_user;
use crate::models::Notification;

/// GET /api/notifications — the caller's notifications, newest first.
pub async fn get_notifications(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    let claims = match current_user(&req) {
        Some(c) => c,
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };

    let notifications_coll = data.mongodb.db.collection::<Notification>("notifications");
    let mut cursor = match notifications_coll
        .find(doc! { "user_id": claims.user_id })
        .sort(doc! { "created_at": -1 })
        .await
    {
        Ok(c) => c,
        Err(e) => {
            error!("Error fetching notifications: {}", e);
            return HttpResponse::InternalServerError().body("Error fetching notifications");
        }
    };
    let mut notifications = Vec::new();
    while let Some(res) = cursor.next().await {
        match res {
            Ok(n) => notifications.push(n),
            Err(e) => {
                error!("Cursor error: {}", e);
                return HttpResponse::InternalServerError().body("Error reading notifications");
            }
        }
    }
    HttpResponse::Ok().json(notifications)
}

/// PUT /api/notifications/read — bulk mark-as-read, scoped to the caller's
/// unread notifications.
pub async fn mark_notifications_read(
    req: HttpRequest,
    data: web::Data<AppState>,
) -> impl Responder {
    let claims = match current_user(&req) {
        Some(c) => c,
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };

    let notifications_coll = data.mongodb.db.collection::<Notification>("notifications");
    match notifications_coll
        .update_many(
            doc! { "user_id": claims.user_id, "read": false },
            doc! { "$set": { "read": true } },
        )
        .await
    {
        Ok(_) => {
            HttpResponse::Ok().json(serde_json::json!({ "message": "Notifications marked as read" }))
        }
        Err(e) => {
            error!("Error marking notifications read: {}", e);
            HttpResponse::InternalServerError().body("Error updating notifications")
        }
    }
}

// src/comment.rs

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use futures_util::StreamExt;
use log::error;
use mongodb::bson::doc;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::auth::current_user;
use crate::db::next_id;
use crate::models::Comment;

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub task_id: i64,
    pub comment_text: String,
}

/// GET /api/comments/{task_id}
pub async fn get_comments(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<i64>,
) -> impl Responder {
    if current_user(&req).is_none() {
        return HttpResponse::Unauthorized().body("Unauthorized");
    }
    let task_id = path.into_inner();

    let comments_coll = data.mongodb.db.collection::<Comment>("comments");
    let mut cursor = match comments_coll.find(doc! { "task_id": task_id }).await {
        Ok(c) => c,
        Err(e) => {
            error!("Error fetching comments: {}", e);
            return HttpResponse::InternalServerError().body("Error fetching comments");
        }
    };
    let mut comments = Vec::new();
    while let Some(res) = cursor.next().await {
        match res {
            Ok(c) => comments.push(c),
            Err(e) => {
                error!("Cursor error: {}", e);
                return HttpResponse::InternalServerError().body("Error reading comments");
            }
        }
    }
    HttpResponse::Ok().json(comments)
}

/// POST /api/comments
pub async fn create_comment(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<CreateCommentRequest>,
) -> impl Responder {
    let claims = match current_user(&req) {
        Some(c) => c,
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };
    let db = &data.mongodb.db;

    let id = match next_id(db, "comments").await {
        Ok(id) => id,
        Err(e) => {
            error!("Error allocating comment id: {}", e);
            return HttpResponse::InternalServerError().body("Error creating comment");
        }
    };

    let comment = Comment {
        id,
        task_id: payload.task_id,
        comment_text: payload.comment_text.clone(),
        user_id: claims.user_id,
        created_at: Utc::now(),
    };
    let comments_coll = db.collection::<Comment>("comments");
    match comments_coll.insert_one(&comment).await {
        Ok(_) => HttpResponse::Created().json(comment),
        Err(e) => {
            error!("Error inserting comment: {}", e);
            HttpResponse::InternalServerError().body("Error creating comment")
        }
    }
}

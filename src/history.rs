// src/history.rs

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use futures_util::StreamExt;
use log::error;
use mongodb::bson::doc;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::auth::current_user;
use crate::models::History;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

/// GET /api/history/{task_id}
pub async fn get_task_history(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<i64>,
) -> impl Responder {
    if current_user(&req).is_none() {
        return HttpResponse::Unauthorized().body("Unauthorized");
    }
    let task_id = path.into_inner();

    let history_coll = data.mongodb.db.collection::<History>("history");
    let mut cursor = match history_coll.find(doc! { "task_id": task_id }).await {
        Ok(c) => c,
        Err(e) => {
            error!("Error fetching history: {}", e);
            return HttpResponse::InternalServerError().body("Error fetching history");
        }
    };
    let mut entries = Vec::new();
    while let Some(res) = cursor.next().await {
        match res {
            Ok(h) => entries.push(h),
            Err(e) => {
                error!("Cursor error: {}", e);
                return HttpResponse::InternalServerError().body("Error reading history");
            }
        }
    }
    HttpResponse::Ok().json(entries)
}

/// GET /api/history?limit — global audit trail, newest first.
pub async fn get_all_history(
    req: HttpRequest,
    data: web::Data<AppState>,
    query: web::Query<HistoryQuery>,
) -> impl Responder {
    if current_user(&req).is_none() {
        return HttpResponse::Unauthorized().body("Unauthorized");
    }

    let history_coll = data.mongodb.db.collection::<History>("history");
    let mut cursor = match history_coll
        .find(doc! {})
        .sort(doc! { "timestamp": -1 })
        .limit(query.limit)
        .await
    {
        Ok(c) => c,
        Err(e) => {
            error!("Error fetching history: {}", e);
            return HttpResponse::InternalServerError().body("Error fetching history");
        }
    };
    let mut entries = Vec::new();
    while let Some(res) = cursor.next().await {
        match res {
            Ok(h) => entries.push(h),
            Err(e) => {
                error!("Cursor error: {}", e);
                return HttpResponse::InternalServerError().body("Error reading history");
            }
        }
    }
    HttpResponse::Ok().json(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_to_100() {
        let q: HistoryQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.limit, 100);
        let q: HistoryQuery = serde_json::from_str(r#"{"limit": 5}"#).unwrap();
        assert_eq!(q.limit, 5);
    }
}

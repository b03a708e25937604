// src/task.rs

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use log::{error, info};
use mongodb::bson::doc;
use mongodb::Database;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::auth::current_user;
use crate::db::next_id;
use crate::models::{History, Notification, Task};

/// Request payload for creating or replacing a task. Both operations take the
/// same shape; the server-owned fields are filled in here, never by clients.
#[derive(Debug, Deserialize)]
pub struct TaskPayload {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default)]
    pub project_id: i64,
    #[serde(default)]
    pub assigned_to: i64,
    #[serde(default)]
    pub due_date: String,
    #[serde(default)]
    pub estimated_hours: f64,
}

fn default_status() -> String {
    "Pendiente".to_string()
}

fn default_priority() -> String {
    "Media".to_string()
}

#[derive(Debug, Deserialize)]
pub struct TaskFilter {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub project_id: Option<i64>,
}

fn new_task(payload: &TaskPayload, id: i64, created_by: i64, now: DateTime<Utc>) -> Task {
    Task {
        id,
        title: payload.title.clone(),
        description: payload.description.clone(),
        status: payload.status.clone(),
        priority: payload.priority.clone(),
        project_id: payload.project_id,
        assigned_to: payload.assigned_to,
        due_date: payload.due_date.clone(),
        estimated_hours: payload.estimated_hours,
        actual_hours: 0.0,
        created_by,
        created_at: now,
        updated_at: now,
    }
}

/// Full replacement record for an update. Everything comes from the payload
/// except `id`, `actual_hours`, `created_by` and `created_at`, which keep
/// their stored values; `updated_at` is refreshed.
fn replacement_task(payload: &TaskPayload, old: &Task, now: DateTime<Utc>) -> Task {
    Task {
        id: old.id,
        title: payload.title.clone(),
        description: payload.description.clone(),
        status: payload.status.clone(),
        priority: payload.priority.clone(),
        project_id: payload.project_id,
        assigned_to: payload.assigned_to,
        due_date: payload.due_date.clone(),
        estimated_hours: payload.estimated_hours,
        actual_hours: old.actual_hours,
        created_by: old.created_by,
        created_at: old.created_at,
        updated_at: now,
    }
}

struct FieldChange {
    action: &'static str,
    old_value: String,
    new_value: String,
}

/// Audited field diffs between the stored task and its replacement. Only
/// status and title are audited; other fields change silently.
fn audited_changes(old: &Task, new: &Task) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    if old.status != new.status {
        changes.push(FieldChange {
            action: "STATUS_CHANGED",
            old_value: old.status.clone(),
            new_value: new.status.clone(),
        });
    }
    if old.title != new.title {
        changes.push(FieldChange {
            action: "TITLE_CHANGED",
            old_value: old.title.clone(),
            new_value: new.title.clone(),
        });
    }
    changes
}

async fn record_history(
    db: &Database,
    task_id: i64,
    user_id: i64,
    action: &str,
    old_value: String,
    new_value: String,
    timestamp: DateTime<Utc>,
) -> mongodb::error::Result<()> {
    let history_coll = db.collection::<History>("history");
    let entry = History {
        id: next_id(db, "history").await?,
        task_id,
        user_id,
        action: action.to_string(),
        old_value,
        new_value,
        timestamp,
    };
    history_coll.insert_one(&entry).await?;
    Ok(())
}

async fn record_notification(
    db: &Database,
    user_id: i64,
    message: String,
    kind: &str,
    created_at: DateTime<Utc>,
) -> mongodb::error::Result<()> {
    let notifications_coll = db.collection::<Notification>("notifications");
    let notification = Notification {
        id: next_id(db, "notifications").await?,
        user_id,
        message,
        kind: kind.to_string(),
        read: false,
        created_at,
    };
    notifications_coll.insert_one(&notification).await?;
    Ok(())
}

/// GET /api/tasks?status&priority&project_id
pub async fn list_tasks(
    req: HttpRequest,
    data: web::Data<AppState>,
    query: web::Query<TaskFilter>,
) -> impl Responder {
    if current_user(&req).is_none() {
        return HttpResponse::Unauthorized().body("Unauthorized");
    }

    let mut filter = doc! {};
    if let Some(status) = &query.status {
        filter.insert("status", status);
    }
    if let Some(priority) = &query.priority {
        filter.insert("priority", priority);
    }
    if let Some(project_id) = query.project_id {
        filter.insert("project_id", project_id);
    }

    let tasks_coll = data.mongodb.db.collection::<Task>("tasks");
    let mut cursor = match tasks_coll.find(filter).await {
        Ok(cur) => cur,
        Err(e) => {
            error!("Error fetching tasks: {}", e);
            return HttpResponse::InternalServerError().body("Error fetching tasks");
        }
    };

    let mut tasks = vec![];
    while let Some(task_res) = cursor.next().await {
        match task_res {
            Ok(task) => tasks.push(task),
            Err(e) => {
                error!("Error reading tasks: {}", e);
                return HttpResponse::InternalServerError().body("Error reading tasks");
            }
        }
    }
    HttpResponse::Ok().json(tasks)
}

/// POST /api/tasks
///
/// Persists the task, then runs the derived writes: one CREATED history row
/// always, one task_assigned notification when the task has an assignee. The
/// writes are sequential; a failure after the primary insert surfaces as a 500
/// with the task already stored.
pub async fn create_task(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<TaskPayload>,
) -> impl Responder {
    let claims = match current_user(&req) {
        Some(c) => c,
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };
    let db = &data.mongodb.db;

    let id = match next_id(db, "tasks").await {
        Ok(id) => id,
        Err(e) => {
            error!("Error allocating task id: {}", e);
            return HttpResponse::InternalServerError().body("Error creating task");
        }
    };

    let now = Utc::now();
    let task = new_task(&payload, id, claims.user_id, now);

    let tasks_coll = db.collection::<Task>("tasks");
    if let Err(e) = tasks_coll.insert_one(&task).await {
        error!("Error inserting task: {}", e);
        return HttpResponse::InternalServerError().body("Error creating task");
    }

    if let Err(e) =
        record_history(db, id, claims.user_id, "CREATED", String::new(), task.title.clone(), now)
            .await
    {
        error!("Error recording task history: {}", e);
        return HttpResponse::InternalServerError().body("Error creating task");
    }

    if task.assigned_to > 0 {
        let message = format!("Nueva tarea asignada: {}", task.title);
        if let Err(e) =
            record_notification(db, task.assigned_to, message, "task_assigned", now).await
        {
            error!("Error recording notification: {}", e);
            return HttpResponse::InternalServerError().body("Error creating task");
        }
    }

    info!("Task created: {}", task.id);
    HttpResponse::Created().json(task)
}

/// GET /api/tasks/{task_id}
pub async fn get_task(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<i64>,
) -> impl Responder {
    if current_user(&req).is_none() {
        return HttpResponse::Unauthorized().body("Unauthorized");
    }
    let task_id = path.into_inner();

    let tasks_coll = data.mongodb.db.collection::<Task>("tasks");
    match tasks_coll.find_one(doc! { "id": task_id }).await {
        Ok(Some(task)) => HttpResponse::Ok().json(task),
        Ok(None) => HttpResponse::NotFound().body("Task not found"),
        Err(e) => {
            error!("Error fetching task: {}", e);
            HttpResponse::InternalServerError().body("Error fetching task")
        }
    }
}

/// PUT /api/tasks/{task_id}
///
/// Wholesale replace, not a patch: fields omitted by the client fall back to
/// the payload defaults, not to the stored values. Status and title diffs each
/// append a history row; a nonzero assignee gets a task_updated notification
/// whether or not the assignment changed.
pub async fn update_task(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<i64>,
    payload: web::Json<TaskPayload>,
) -> impl Responder {
    let claims = match current_user(&req) {
        Some(c) => c,
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };
    let task_id = path.into_inner();
    let db = &data.mongodb.db;

    let tasks_coll = db.collection::<Task>("tasks");
    let old_task = match tasks_coll.find_one(doc! { "id": task_id }).await {
        Ok(Some(task)) => task,
        Ok(None) => return HttpResponse::NotFound().body("Task not found"),
        Err(e) => {
            error!("Error fetching task: {}", e);
            return HttpResponse::InternalServerError().body("Error updating task");
        }
    };

    let now = Utc::now();
    let new_task = replacement_task(&payload, &old_task, now);

    if let Err(e) = tasks_coll.replace_one(doc! { "id": task_id }, &new_task).await {
        error!("Error replacing task: {}", e);
        return HttpResponse::InternalServerError().body("Error updating task");
    }

    for change in audited_changes(&old_task, &new_task) {
        if let Err(e) = record_history(
            db,
            task_id,
            claims.user_id,
            change.action,
            change.old_value,
            change.new_value,
            now,
        )
        .await
        {
            error!("Error recording task history: {}", e);
            return HttpResponse::InternalServerError().body("Error updating task");
        }
    }

    if new_task.assigned_to > 0 {
        let message = format!("Tarea actualizada: {}", new_task.title);
        if let Err(e) =
            record_notification(db, new_task.assigned_to, message, "task_updated", now).await
        {
            error!("Error recording notification: {}", e);
            return HttpResponse::InternalServerError().body("Error updating task");
        }
    }

    HttpResponse::Ok().json(new_task)
}

/// DELETE /api/tasks/{task_id}
pub async fn delete_task(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<i64>,
) -> impl Responder {
    let claims = match current_user(&req) {
        Some(c) => c,
        None => return HttpResponse::Unauthorized().body("Unauthorized"),
    };
    let task_id = path.into_inner();
    let db = &data.mongodb.db;

    let tasks_coll = db.collection::<Task>("tasks");
    let task = match tasks_coll.find_one(doc! { "id": task_id }).await {
        Ok(Some(task)) => task,
        Ok(None) => return HttpResponse::NotFound().body("Task not found"),
        Err(e) => {
            error!("Error fetching task: {}", e);
            return HttpResponse::InternalServerError().body("Error deleting task");
        }
    };

    if let Err(e) = record_history(
        db,
        task_id,
        claims.user_id,
        "DELETED",
        task.title.clone(),
        String::new(),
        Utc::now(),
    )
    .await
    {
        error!("Error recording task history: {}", e);
        return HttpResponse::InternalServerError().body("Error deleting task");
    }

    if let Err(e) = tasks_coll.delete_one(doc! { "id": task_id }).await {
        error!("Error deleting task: {}", e);
        return HttpResponse::InternalServerError().body("Error deleting task");
    }

    info!("Task deleted: {}", task_id);
    HttpResponse::NoContent().finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(title: &str, status: &str) -> TaskPayload {
        TaskPayload {
            title: title.to_string(),
            description: String::new(),
            status: status.to_string(),
            priority: "Media".to_string(),
            project_id: 0,
            assigned_to: 0,
            due_date: String::new(),
            estimated_hours: 0.0,
        }
    }

    #[test]
    fn payload_defaults_match_a_bare_title() {
        let p: TaskPayload = serde_json::from_str(r#"{"title": "A"}"#).unwrap();
        assert_eq!(p.status, "Pendiente");
        assert_eq!(p.priority, "Media");
        assert_eq!(p.assigned_to, 0);
        assert_eq!(p.project_id, 0);
        assert_eq!(p.estimated_hours, 0.0);
        assert_eq!(p.due_date, "");
    }

    #[test]
    fn new_task_fills_server_owned_fields() {
        let now = Utc::now();
        let task = new_task(&payload("A", "Pendiente"), 1, 7, now);
        assert_eq!(task.id, 1);
        assert_eq!(task.created_by, 7);
        assert_eq!(task.actual_hours, 0.0);
        assert_eq!(task.created_at, now);
        assert_eq!(task.updated_at, now);
    }

    #[test]
    fn replacement_preserves_protected_fields() {
        let created = Utc::now();
        let mut old = new_task(&payload("A", "Pendiente"), 3, 7, created);
        old.actual_hours = 4.5;

        let later = created + chrono::Duration::seconds(60);
        let mut p = payload("B", "Done");
        p.estimated_hours = 9.0;
        let new = replacement_task(&p, &old, later);

        assert_eq!(new.id, 3);
        assert_eq!(new.created_by, 7);
        assert_eq!(new.created_at, created);
        assert_eq!(new.actual_hours, 4.5);
        assert_eq!(new.updated_at, later);
        assert_eq!(new.title, "B");
        assert_eq!(new.estimated_hours, 9.0);
    }

    #[test]
    fn no_audited_changes_when_status_and_title_unchanged() {
        let now = Utc::now();
        let old = new_task(&payload("A", "Pendiente"), 1, 1, now);
        let mut p = payload("A", "Pendiente");
        p.priority = "Alta".to_string();
        p.assigned_to = 2;
        let new = replacement_task(&p, &old, now);
        assert!(audited_changes(&old, &new).is_empty());
    }

    #[test]
    fn status_change_is_audited_alone() {
        let now = Utc::now();
        let old = new_task(&payload("A", "Pendiente"), 1, 1, now);
        let new = replacement_task(&payload("A", "Done"), &old, now);
        let changes = audited_changes(&old, &new);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].action, "STATUS_CHANGED");
        assert_eq!(changes[0].old_value, "Pendiente");
        assert_eq!(changes[0].new_value, "Done");
    }

    #[test]
    fn title_change_is_audited_alone() {
        let now = Utc::now();
        let old = new_task(&payload("A", "Pendiente"), 1, 1, now);
        let new = replacement_task(&payload("B", "Pendiente"), &old, now);
        let changes = audited_changes(&old, &new);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].action, "TITLE_CHANGED");
        assert_eq!(changes[0].old_value, "A");
        assert_eq!(changes[0].new_value, "B");
    }

    #[test]
    fn status_and_title_changes_produce_two_rows() {
        let now = Utc::now();
        let old = new_task(&payload("A", "Pendiente"), 1, 1, now);
        let new = replacement_task(&payload("B", "Done"), &old, now);
        let changes = audited_changes(&old, &new);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].action, "STATUS_CHANGED");
        assert_eq!(changes[1].action, "TITLE_CHANGED");
    }
}

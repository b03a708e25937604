// src/project.rs

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use futures_util::StreamExt;
use log::{error, info};
use mongodb::bson::doc;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::auth::current_user;
use crate::db::next_id;
use crate::models::Project;

/// Payload for creating or replacing a project.
#[derive(Debug, Deserialize)]
pub struct ProjectPayload {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// GET /api/projects
pub async fn list_projects(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    if current_user(&req).is_none() {
        return HttpResponse::Unauthorized().body("Unauthorized");
    }

    let projects_coll = data.mongodb.db.collection::<Project>("projects");
    let mut cursor = match projects_coll.find(doc! {}).await {
        Ok(c) => c,
        Err(e) => {
            error!("Error fetching projects: {}", e);
            return HttpResponse::InternalServerError().body("Error fetching projects");
        }
    };
    let mut projects = Vec::new();
    while let Some(res) = cursor.next().await {
        match res {
            Ok(p) => projects.push(p),
            Err(e) => {
                error!("Cursor error: {}", e);
                return HttpResponse::InternalServerError().body("Error reading projects");
            }
        }
    }
    HttpResponse::Ok().json(projects)
}

/// POST /api/projects
pub async fn create_project(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<ProjectPayload>,
) -> impl Responder {
    if current_user(&req).is_none() {
        return HttpResponse::Unauthorized().body("Unauthorized");
    }
    let db = &data.mongodb.db;

    let id = match next_id(db, "projects").await {
        Ok(id) => id,
        Err(e) => {
            error!("Error allocating project id: {}", e);
            return HttpResponse::InternalServerError().body("Error creating project");
        }
    };

    let project = Project {
        id,
        name: payload.name.clone(),
        description: payload.description.clone(),
    };
    let projects_coll = db.collection::<Project>("projects");
    if let Err(e) = projects_coll.insert_one(&project).await {
        error!("Error creating project: {}", e);
        return HttpResponse::InternalServerError().body("Error creating project");
    }
    info!("Project created: {}", project.id);
    HttpResponse::Created().json(project)
}

/// GET /api/projects/{project_id}
pub async fn get_project(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<i64>,
) -> impl Responder {
    if current_user(&req).is_none() {
        return HttpResponse::Unauthorized().body("Unauthorized");
    }
    let project_id = path.into_inner();

    let projects_coll = data.mongodb.db.collection::<Project>("projects");
    match projects_coll.find_one(doc! { "id": project_id }).await {
        Ok(Some(project)) => HttpResponse::Ok().json(project),
        Ok(None) => HttpResponse::NotFound().body("Project not found"),
        Err(e) => {
            error!("Error fetching project: {}", e);
            HttpResponse::InternalServerError().body("Error fetching project")
        }
    }
}

/// PUT /api/projects/{project_id} — full replace, id preserved.
pub async fn update_project(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<i64>,
    payload: web::Json<ProjectPayload>,
) -> impl Responder {
    if current_user(&req).is_none() {
        return HttpResponse::Unauthorized().body("Unauthorized");
    }
    let project_id = path.into_inner();

    let projects_coll = data.mongodb.db.collection::<Project>("projects");
    match projects_coll.find_one(doc! { "id": project_id }).await {
        Ok(Some(_)) => {}
        Ok(None) => return HttpResponse::NotFound().body("Project not found"),
        Err(e) => {
            error!("Error fetching project: {}", e);
            return HttpResponse::InternalServerError().body("Error updating project");
        }
    }

    let project = Project {
        id: project_id,
        name: payload.name.clone(),
        description: payload.description.clone(),
    };
    match projects_coll.replace_one(doc! { "id": project_id }, &project).await {
        Ok(_) => HttpResponse::Ok().json(project),
        Err(e) => {
            error!("Error updating project: {}", e);
            HttpResponse::InternalServerError().body("Error updating project")
        }
    }
}

/// DELETE /api/projects/{project_id}
pub async fn delete_project(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<i64>,
) -> impl Responder {
    if current_user(&req).is_none() {
        return HttpResponse::Unauthorized().body("Unauthorized");
    }
    let project_id = path.into_inner();

    let projects_coll = data.mongodb.db.collection::<Project>("projects");
    match projects_coll.find_one(doc! { "id": project_id }).await {
        Ok(Some(_)) => {}
        Ok(None) => return HttpResponse::NotFound().body("Project not found"),
        Err(e) => {
            error!("Error fetching project: {}", e);
            return HttpResponse::InternalServerError().body("Error deleting project");
        }
    }

    match projects_coll.delete_one(doc! { "id": project_id }).await {
        Ok(_) => HttpResponse::NoContent().finish(),
        Err(e) => {
            error!("Error deleting project: {}", e);
            HttpResponse::InternalServerError().body("Error deleting project")
        }
    }
}

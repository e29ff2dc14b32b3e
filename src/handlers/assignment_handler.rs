use crate::api_error::ApiError;
use crate::db::{self, Pool};
use crate::models::{Assignment, AssignmentInput, AuthUser, Role};
use actix_web::{delete, get, post, put, web, HttpResponse};
use serde_json::json;
use uuid::Uuid;

#[post("/class/{class_id}/assignment")]
async fn create(
    pool: web::Data<Pool>,
    auth: AuthUser,
    class_id: web::Path<Uuid>,
    body: web::Json<AssignmentInput>,
) -> Result<HttpResponse, ApiError> {
    auth.require_teacher()?;
    let conn = db::connection(&pool)?;

    let assignment = Assignment::create(&conn, class_id.into_inner(), body.into_inner(), auth.id)?;

    Ok(HttpResponse::Ok().json(assignment))
}

#[get("/class/{class_id}/assignment")]
async fn find_all(
    pool: web::Data<Pool>,
    _auth: AuthUser,
    class_id: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let conn = db::connection(&pool)?;

    let assignments = Assignment::list(&conn, class_id.into_inner())?;

    Ok(HttpResponse::Ok().json(assignments))
}

#[get("/class/{class_id}/assignment/{id}")]
async fn detail(
    pool: web::Data<Pool>,
    auth: AuthUser,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, ApiError> {
    let conn = db::connection(&pool)?;
    let (class_id, assignment_id) = path.into_inner();

    match auth.role {
        Role::Teacher => {
            let detail = Assignment::detail_for_teacher(&conn, class_id, assignment_id, auth.id)?;
            Ok(HttpResponse::Ok().json(detail))
        }
        Role::Student => {
            let detail = Assignment::detail_for_student(&conn, class_id, assignment_id, auth.id)?;
            Ok(HttpResponse::Ok().json(detail))
        }
    }
}

#[put("/class/{class_id}/assignment/{id}")]
async fn update(
    pool: web::Data<Pool>,
    auth: AuthUser,
    path: web::Path<(Uuid, Uuid)>,
    body: web::Json<AssignmentInput>,
) -> Result<HttpResponse, ApiError> {
    auth.require_teacher()?;
    let conn = db::connection(&pool)?;
    let (class_id, assignment_id) = path.into_inner();

    let assignment = Assignment::update(&conn, class_id, assignment_id, body.into_inner(), auth.id)?;

    Ok(HttpResponse::Ok().json(assignment))
}

#[delete("/class/{class_id}/assignment/{id}")]
async fn delete(
    pool: web::Data<Pool>,
    auth: AuthUser,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, ApiError> {
    auth.require_teacher()?;
    let conn = db::connection(&pool)?;
    let (class_id, assignment_id) = path.into_inner();

    let num_deleted = Assignment::delete(&conn, class_id, assignment_id, auth.id)?;

    Ok(HttpResponse::Ok().json(json!({ "deleted": num_deleted })))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create);
    cfg.service(find_all);
    cfg.service(detail);
    cfg.service(update);
    cfg.service(delete);
}

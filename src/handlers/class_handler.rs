use crate::api_error::ApiError;
use crate::db::{self, Pool};
use crate::models::{AuthUser, Class, ClassInput, ClassUpdate, InviteRequest, JoinRequest, Role};
use actix_web::{delete, get, post, put, web, HttpResponse};
use serde_json::json;
use uuid::Uuid;

#[post("/class")]
async fn create(
    pool: web::Data<Pool>,
    auth: AuthUser,
    body: web::Json<ClassInput>,
) -> Result<HttpResponse, ApiError> {
    let conn = db::connection(&pool)?;

    let class = Class::create(&conn, body.into_inner(), auth.id)?;

    Ok(HttpResponse::Ok().json(class))
}

#[get("/class")]
async fn find_all(pool: web::Data<Pool>, auth: AuthUser) -> Result<HttpResponse, ApiError> {
    let conn = db::connection(&pool)?;

    let classes = match auth.role {
        Role::Teacher => Class::find_for_teacher(&conn, auth.id)?,
        Role::Student => Class::find_for_student(&conn, auth.id)?,
    };

    Ok(HttpResponse::Ok().json(classes))
}

#[get("/class/{id}")]
async fn detail(
    pool: web::Data<Pool>,
    auth: AuthUser,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let conn = db::connection(&pool)?;
    let id = id.into_inner();

    match auth.role {
        Role::Teacher => {
            let detail = Class::teacher_detail(&conn, id, auth.id)?;
            Ok(HttpResponse::Ok().json(detail))
        }
        Role::Student => {
            let detail = Class::student_detail(&conn, id, auth.id)?;
            Ok(HttpResponse::Ok().json(detail))
        }
    }
}

#[put("/class/{id}")]
async fn update(
    pool: web::Data<Pool>,
    auth: AuthUser,
    id: web::Path<Uuid>,
    body: web::Json<ClassUpdate>,
) -> Result<HttpResponse, ApiError> {
    auth.require_teacher()?;
    let conn = db::connection(&pool)?;

    let class = Class::update(&conn, id.into_inner(), body.into_inner(), auth.id)?;

    Ok(HttpResponse::Ok().json(class))
}

#[delete("/class/{id}")]
async fn delete(
    pool: web::Data<Pool>,
    auth: AuthUser,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    auth.require_teacher()?;
    let conn = db::connection(&pool)?;

    let num_deleted = Class::delete(&conn, id.into_inner(), auth.id)?;

    Ok(HttpResponse::Ok().json(json!({ "deleted": num_deleted })))
}

#[post("/class/join")]
async fn join(
    pool: web::Data<Pool>,
    auth: AuthUser,
    body: web::Json<JoinRequest>,
) -> Result<HttpResponse, ApiError> {
    auth.require_student()?;
    let conn = db::connection(&pool)?;

    let member = Class::join_by_code(&conn, &body.code, auth.id)?;

    Ok(HttpResponse::Ok().json(member))
}

#[post("/class/{id}/invitations")]
async fn invite(
    pool: web::Data<Pool>,
    auth: AuthUser,
    id: web::Path<Uuid>,
    body: web::Json<InviteRequest>,
) -> Result<HttpResponse, ApiError> {
    auth.require_teacher()?;
    let conn = db::connection(&pool)?;

    let member = Class::invite(&conn, id.into_inner(), &body.email, auth.id)?;

    Ok(HttpResponse::Ok().json(member))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create);
    cfg.service(find_all);
    cfg.service(join);
    cfg.service(detail);
    cfg.service(update);
    cfg.service(delete);
    cfg.service(invite);
}

use crate::api_error::ApiError;
use crate::db::{self, Pool};
use crate::models::{AuthUser, Rubric, RubricInput};
use actix_web::{delete, get, post, put, web, HttpResponse};
use serde_json::json;
use uuid::Uuid;

#[post("/rubric")]
async fn create(
    pool: web::Data<Pool>,
    auth: AuthUser,
    body: web::Json<RubricInput>,
) -> Result<HttpResponse, ApiError> {
    auth.require_teacher()?;
    let conn = db::connection(&pool)?;

    let rubric = Rubric::create(&conn, body.into_inner(), auth.id)?;

    Ok(HttpResponse::Ok().json(rubric))
}

#[get("/rubric")]
async fn find_mine(pool: web::Data<Pool>, auth: AuthUser) -> Result<HttpResponse, ApiError> {
    auth.require_teacher()?;
    let conn = db::connection(&pool)?;

    let rubrics = Rubric::list_mine(&conn, auth.id)?;

    Ok(HttpResponse::Ok().json(rubrics))
}

// Debug listing, intentionally unauthenticated.
#[get("/rubric/all")]
async fn find_all(pool: web::Data<Pool>) -> Result<HttpResponse, ApiError> {
    let conn = db::connection(&pool)?;

    let rubrics = Rubric::list_all(&conn)?;

    Ok(HttpResponse::Ok().json(rubrics))
}

#[get("/rubric/{id}")]
async fn find(
    pool: web::Data<Pool>,
    auth: AuthUser,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    auth.require_teacher()?;
    let conn = db::connection(&pool)?;

    let rubric = Rubric::get(&conn, id.into_inner(), auth.id)?;

    Ok(HttpResponse::Ok().json(rubric))
}

#[put("/rubric/{id}")]
async fn update(
    pool: web::Data<Pool>,
    auth: AuthUser,
    id: web::Path<Uuid>,
    body: web::Json<RubricInput>,
) -> Result<HttpResponse, ApiError> {
    auth.require_teacher()?;
    let conn = db::connection(&pool)?;

    let rubric = Rubric::update(&conn, id.into_inner(), body.into_inner(), auth.id)?;

    Ok(HttpResponse::Ok().json(rubric))
}

#[delete("/rubric/{id}")]
async fn delete(
    pool: web::Data<Pool>,
    auth: AuthUser,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    auth.require_teacher()?;
    let conn = db::connection(&pool)?;

    let num_deleted = Rubric::delete(&conn, id.into_inner(), auth.id)?;

    Ok(HttpResponse::Ok().json(json!({ "deleted": num_deleted })))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create);
    cfg.service(find_mine);
    cfg.service(find_all);
    cfg.service(find);
    cfg.service(update);
    cfg.service(delete);
}

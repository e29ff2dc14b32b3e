use crate::api_error::ApiError;
use crate::db::{self, Pool};
use crate::models::{AuthUser, User, UserUpdate};
use actix_web::{delete, get, put, web, HttpResponse};
use serde_json::json;
use uuid::Uuid;

#[get("/users")]
async fn find_all(pool: web::Data<Pool>) -> Result<HttpResponse, ApiError> {
    let conn = db::connection(&pool)?;

    let users = User::find_all(&conn)?;

    Ok(HttpResponse::Ok().json(users))
}

#[get("/users/{id}")]
async fn find(pool: web::Data<Pool>, id: web::Path<Uuid>) -> Result<HttpResponse, ApiError> {
    let conn = db::connection(&pool)?;

    let user = User::find(&conn, id.into_inner())?;

    Ok(HttpResponse::Ok().json(user))
}

#[put("/users/{id}")]
async fn update(
    pool: web::Data<Pool>,
    auth: AuthUser,
    id: web::Path<Uuid>,
    body: web::Json<UserUpdate>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    if auth.id != id {
        return Err(ApiError::new(403, "You can only update your own account".to_string()));
    }

    let conn = db::connection(&pool)?;

    let user = User::update(&conn, id, body.into_inner())?;

    Ok(HttpResponse::Ok().json(user))
}

#[delete("/users/{id}")]
async fn delete(
    pool: web::Data<Pool>,
    auth: AuthUser,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    if auth.id != id {
        return Err(ApiError::new(403, "You can only delete your own account".to_string()));
    }

    let conn = db::connection(&pool)?;

    let num_deleted = User::delete(&conn, id)?;

    Ok(HttpResponse::Ok().json(json!({ "deleted": num_deleted })))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(find_all);
    cfg.service(find);
    cfg.service(update);
    cfg.service(delete);
}

use crate::api_error::ApiError;
use crate::db::{self, Pool};
use crate::models::{AuthUser, Notification};
use actix_web::{get, put, web, HttpResponse};
use uuid::Uuid;

#[get("/notifications")]
async fn find_mine(pool: web::Data<Pool>, auth: AuthUser) -> Result<HttpResponse, ApiError> {
    let conn = db::connection(&pool)?;

    let notifications = Notification::find_for_user(&conn, auth.id)?;

    Ok(HttpResponse::Ok().json(notifications))
}

// Debug listing, intentionally unauthenticated.
#[get("/notifications/all")]
async fn find_all(pool: web::Data<Pool>) -> Result<HttpResponse, ApiError> {
    let conn = db::connection(&pool)?;

    let notifications = Notification::find_all(&conn)?;

    Ok(HttpResponse::Ok().json(notifications))
}

#[put("/notifications/{id}/read")]
async fn mark_read(
    pool: web::Data<Pool>,
    auth: AuthUser,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let conn = db::connection(&pool)?;

    let notification = Notification::mark_read(&conn, id.into_inner(), auth.id)?;

    Ok(HttpResponse::Ok().json(notification))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(find_mine);
    cfg.service(find_all);
    cfg.service(mark_read);
}

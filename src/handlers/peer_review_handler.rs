use crate::api_error::ApiError;
use crate::db::{self, Pool};
use crate::models::{AssignReviewInput, AuthUser, CompleteReviewInput, PeerReview};
use actix_web::{get, post, put, web, HttpResponse};
use uuid::Uuid;

#[post("/peer-review")]
async fn assign(
    pool: web::Data<Pool>,
    auth: AuthUser,
    body: web::Json<AssignReviewInput>,
) -> Result<HttpResponse, ApiError> {
    auth.require_teacher()?;
    let conn = db::connection(&pool)?;

    let review = PeerReview::assign(&conn, body.into_inner(), auth.id)?;

    Ok(HttpResponse::Ok().json(review))
}

#[put("/peer-review/{id}")]
async fn complete(
    pool: web::Data<Pool>,
    auth: AuthUser,
    id: web::Path<Uuid>,
    body: web::Json<CompleteReviewInput>,
) -> Result<HttpResponse, ApiError> {
    let conn = db::connection(&pool)?;

    let review = PeerReview::complete(&conn, id.into_inner(), body.into_inner(), auth.id)?;

    Ok(HttpResponse::Ok().json(review))
}

#[get("/peer-review")]
async fn find_mine(pool: web::Data<Pool>, auth: AuthUser) -> Result<HttpResponse, ApiError> {
    let conn = db::connection(&pool)?;

    let reviews = PeerReview::find_for_reviewer(&conn, auth.id)?;

    Ok(HttpResponse::Ok().json(reviews))
}

// Debug listing, intentionally unauthenticated.
#[get("/peer-review/all")]
async fn find_all(pool: web::Data<Pool>) -> Result<HttpResponse, ApiError> {
    let conn = db::connection(&pool)?;

    let reviews = PeerReview::find_all(&conn)?;

    Ok(HttpResponse::Ok().json(reviews))
}

#[get("/peer-review/{id}")]
async fn find(
    pool: web::Data<Pool>,
    auth: AuthUser,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let conn = db::connection(&pool)?;

    let review = PeerReview::detail(&conn, id.into_inner(), auth.id)?;

    Ok(HttpResponse::Ok().json(review))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(assign);
    cfg.service(find_mine);
    cfg.service(find_all);
    cfg.service(find);
    cfg.service(complete);
}

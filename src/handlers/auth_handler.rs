use crate::api_error::ApiError;
use crate::db::{self, Pool};
use crate::models::{AuthResponse, AuthUser, LoginRequest, RegisterRequest, User};
use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{post, web, FromRequest, HttpRequest, HttpResponse};
use futures::future::{err, ok, Ready};

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<AuthUser, ApiError>>;

    fn from_request(req: &HttpRequest, _pl: &mut Payload) -> Self::Future {
        let header = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        if let Some(header) = header {
            if let Some(token) = header.strip_prefix("Bearer ") {
                if let Ok(user) = User::decode_token(token) {
                    return ok(user);
                }
            }
        }

        err(ApiError::new(401, "Invalid Request".to_string()))
    }
}

#[post("/auth/register")]
async fn register(
    pool: web::Data<Pool>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    let conn = db::connection(&pool)?;

    let user = User::create(&conn, body.into_inner())?;
    let token = user.generate_token()?;

    Ok(HttpResponse::Ok().json(AuthResponse { token }))
}

#[post("/auth/login")]
async fn login(
    pool: web::Data<Pool>,
    credentials: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let conn = db::connection(&pool)?;
    let credentials = credentials.into_inner();

    let user = User::find_by_email(&conn, &credentials.email)?
        .ok_or_else(|| ApiError::new(401, "Invalid credentials".to_string()))?;

    let is_valid = user.verify_password(credentials.password.as_bytes())?;
    if !is_valid {
        return Err(ApiError::new(401, "Invalid credentials".to_string()));
    }

    let token = user.generate_token()?;

    Ok(HttpResponse::Ok().json(AuthResponse { token }))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(register);
    cfg.service(login);
}

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use derive_more::Display;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde_json::json;

#[derive(Debug, Display)]
#[display(fmt = "{}", message)]
pub struct ApiError {
    pub status_code: u16,
    pub message: String,
}

impl ApiError {
    pub fn new(status_code: u16, message: String) -> ApiError {
        ApiError {
            status_code,
            message,
        }
    }
}

impl From<DieselError> for ApiError {
    fn from(error: DieselError) -> ApiError {
        match error {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, err) => {
                ApiError::new(400, err.message().to_string())
            }
            DieselError::NotFound => ApiError::new(404, "Record not found".to_string()),
            err => ApiError::new(500, format!("Diesel error: {}", err)),
        }
    }
}

impl From<r2d2::Error> for ApiError {
    fn from(error: r2d2::Error) -> ApiError {
        ApiError::new(500, format!("Failed to get db connection: {}", error))
    }
}

impl From<std::io::Error> for ApiError {
    fn from(error: std::io::Error) -> ApiError {
        ApiError::new(500, format!("File system error: {}", error))
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        let status_code = match StatusCode::from_u16(self.status_code) {
            Ok(status_code) => status_code,
            Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match status_code.as_u16() < 500 {
            true => self.message.clone(),
            false => {
                error!("{}", self.message);
                "Internal Server Error".to_string()
            }
        };

        HttpResponse::build(status_code).json(json!({ "error": message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diesel_not_found_maps_to_404() {
        let error = ApiError::from(DieselError::NotFound);
        assert_eq!(error.status_code, 404);
        assert_eq!(error.message, "Record not found");
    }

    #[test]
    fn other_diesel_errors_map_to_500() {
        let error = ApiError::from(DieselError::RollbackTransaction);
        assert_eq!(error.status_code, 500);
    }
}

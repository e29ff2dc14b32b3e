use crate::api_error::ApiError;
use crate::schema::users;
use argon2::Config;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use derive_more::Display;
use diesel::prelude::*;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::env;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Display, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[display(fmt = "student")]
    Student,
    #[display(fmt = "teacher")]
    Teacher,
}

#[derive(Serialize, Deserialize, Queryable, Insertable)]
#[table_name = "users"]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: String,
    pub created_at: NaiveDateTime,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Deserialize, AsChangeset)]
#[table_name = "users"]
pub struct UserUpdate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        UserInfo {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
        }
    }
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    email: String,
    first_name: String,
    last_name: String,
    role: Role,
    exp: usize,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        AuthUser {
            id: claims.sub,
            role: claims.role,
        }
    }
}

impl AuthUser {
    pub fn require_teacher(&self) -> Result<(), ApiError> {
        match self.role {
            Role::Teacher => Ok(()),
            Role::Student => Err(ApiError::new(403, "Teacher role required".to_string())),
        }
    }

    pub fn require_student(&self) -> Result<(), ApiError> {
        match self.role {
            Role::Student => Ok(()),
            Role::Teacher => Err(ApiError::new(403, "Student role required".to_string())),
        }
    }
}

impl User {
    pub fn find_all(conn: &PgConnection) -> Result<Vec<Self>, ApiError> {
        let users = users::table.load::<User>(conn)?;

        Ok(users)
    }

    pub fn find(conn: &PgConnection, id: Uuid) -> Result<Self, ApiError> {
        let user = users::table.filter(users::id.eq(id)).first(conn)?;

        Ok(user)
    }

    pub fn find_by_email(conn: &PgConnection, email: &str) -> Result<Option<Self>, ApiError> {
        let user = users::table
            .filter(users::email.eq(email))
            .first(conn)
            .optional()?;

        Ok(user)
    }

    pub fn create(conn: &PgConnection, request: RegisterRequest) -> Result<Self, ApiError> {
        if User::find_by_email(conn, &request.email)?.is_some() {
            return Err(ApiError::new(400, "Email already registered".to_string()));
        }

        let mut user = User::from(request);
        user.hash_password()?;

        let user = diesel::insert_into(users::table)
            .values(user)
            .get_result(conn)?;

        Ok(user)
    }

    pub fn update(conn: &PgConnection, id: Uuid, update: UserUpdate) -> Result<Self, ApiError> {
        let user = diesel::update(users::table)
            .filter(users::id.eq(id))
            .set(update)
            .get_result(conn)?;

        Ok(user)
    }

    pub fn delete(conn: &PgConnection, id: Uuid) -> Result<usize, ApiError> {
        let res = diesel::delete(users::table.filter(users::id.eq(id))).execute(conn)?;

        Ok(res)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn hash_password(&mut self) -> Result<(), ApiError> {
        let salt: [u8; 32] = rand::thread_rng().gen();
        let config = Config::default();

        self.password = argon2::hash_encoded(self.password.as_bytes(), &salt, &config)
            .map_err(|e| ApiError::new(500, format!("Failed to hash password: {}", e)))?;

        Ok(())
    }

    pub fn verify_password(&self, password: &[u8]) -> Result<bool, ApiError> {
        argon2::verify_encoded(&self.password, password)
            .map_err(|e| ApiError::new(500, format!("Failed to verify password: {}", e)))
    }

    pub fn generate_token(self) -> Result<String, ApiError> {
        let date: DateTime<Utc> = Utc::now() + Duration::hours(1);
        let role = match self.role.as_str() {
            "teacher" => Role::Teacher,
            _ => Role::Student,
        };
        let claims = Claims {
            sub: self.id,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            role,
            exp: date.timestamp() as usize,
        };

        let secret_key = env::var("SECRET_TOKEN").expect("Secret Token not set");

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret_key.as_bytes()),
        )
        .map_err(|e| ApiError::new(500, format!("Failed to sign token: {}", e)))
    }

    pub fn decode_token(token: &str) -> Result<AuthUser, ApiError> {
        let secret_key = env::var("SECRET_TOKEN").expect("Secret Token not set");

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret_key.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims.into())
        .map_err(|e| ApiError::new(401, format!("Invalid token: {}", e)))
    }
}

impl From<RegisterRequest> for User {
    fn from(request: RegisterRequest) -> Self {
        User {
            id: Uuid::new_v4(),
            first_name: request.first_name,
            last_name: request.last_name,
            email: request.email,
            password: request.password,
            role: request.role.to_string(),
            created_at: Utc::now().naive_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_renders_as_lowercase_text() {
        assert_eq!(Role::Student.to_string(), "student");
        assert_eq!(Role::Teacher.to_string(), "teacher");
    }

    #[test]
    fn register_request_becomes_student_row() {
        let user = User::from(RegisterRequest {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password: "hunter2".to_string(),
            role: Role::Student,
        });

        assert_eq!(user.role, "student");
        assert_eq!(user.full_name(), "Ada Lovelace");
    }
}

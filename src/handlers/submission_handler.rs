use crate::api_error::ApiError;
use crate::db::{self, Pool};
use crate::models::{Assignment, AuthUser, GradeInput, StoredFile, Submission, SubmissionFile};
use actix_files::NamedFile;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use actix_multipart::Multipart;
use chrono::Utc;
use futures::{StreamExt, TryStreamExt};
use serde_json::json;
use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use uuid::Uuid;

fn upload_dir() -> PathBuf {
    PathBuf::from(env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()))
}

#[post("/class/{assignment_id}/submission")]
async fn submit(
    pool: web::Data<Pool>,
    auth: AuthUser,
    assignment_id: web::Path<Uuid>,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    auth.require_student()?;

    let upload_dir = upload_dir();
    fs::create_dir_all(&upload_dir)?;

    let mut content = String::new();
    let mut stored: Vec<StoredFile> = Vec::new();

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| ApiError::new(400, format!("Invalid multipart payload: {}", e)))?
    {
        let disposition = field.content_disposition().clone();

        match disposition.get_filename() {
            Some(filename) => {
                let file_name = filename.to_string();
                let stored_name = format!("{}_{}", Utc::now().timestamp_millis(), file_name);
                let path = upload_dir.join(&stored_name);

                let mut file = fs::File::create(&path)?;
                while let Some(chunk) = field.next().await {
                    let chunk = chunk
                        .map_err(|e| ApiError::new(400, format!("Failed to read upload: {}", e)))?;
                    file.write_all(&chunk)?;
                }

                stored.push(StoredFile {
                    file_name,
                    stored_name,
                });
            }
            None => {
                let mut bytes = web::BytesMut::new();
                while let Some(chunk) = field.next().await {
                    let chunk = chunk
                        .map_err(|e| ApiError::new(400, format!("Failed to read upload: {}", e)))?;
                    bytes.extend_from_slice(&chunk);
                }

                if disposition.get_name() == Some("content") {
                    content = String::from_utf8_lossy(&bytes).to_string();
                }
            }
        }
    }

    let conn = db::connection(&pool)?;

    let (submission, files) =
        Submission::upsert(&conn, assignment_id.into_inner(), auth.id, content, stored)?;

    Ok(HttpResponse::Ok().json(json!({ "submission_id": submission.id, "files": files })))
}

#[put("/class/{submission_id}/grade")]
async fn grade(
    pool: web::Data<Pool>,
    auth: AuthUser,
    submission_id: web::Path<Uuid>,
    body: web::Json<GradeInput>,
) -> Result<HttpResponse, ApiError> {
    auth.require_teacher()?;
    let conn = db::connection(&pool)?;

    let submission = Submission::grade(&conn, submission_id.into_inner(), body.into_inner(), auth.id)?;

    Ok(HttpResponse::Ok().json(submission))
}

#[get("/class/{assignment_id}/submission/all")]
async fn find_all(
    pool: web::Data<Pool>,
    auth: AuthUser,
    assignment_id: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    auth.require_teacher()?;
    let conn = db::connection(&pool)?;
    let assignment_id = assignment_id.into_inner();

    Assignment::require_teacher(&conn, assignment_id, auth.id)?;
    let submissions = Submission::list_for_assignment(&conn, assignment_id)?;

    Ok(HttpResponse::Ok().json(submissions))
}

#[get("/class/{assignment_id}/student/{student_id}")]
async fn find_for_student(
    pool: web::Data<Pool>,
    auth: AuthUser,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, ApiError> {
    let conn = db::connection(&pool)?;
    let (assignment_id, student_id) = path.into_inner();

    // Visible to the student themselves and to the class teacher.
    if auth.id != student_id {
        auth.require_teacher()?;
        Assignment::require_teacher(&conn, assignment_id, auth.id)?;
    }

    let submission = Submission::student_view(&conn, assignment_id, student_id)?;

    Ok(HttpResponse::Ok().json(submission))
}

#[delete("/class/{assignment_id}/file/{file_id}")]
async fn delete_file(
    pool: web::Data<Pool>,
    auth: AuthUser,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, ApiError> {
    auth.require_student()?;
    let conn = db::connection(&pool)?;
    let (assignment_id, file_id) = path.into_inner();

    let num_deleted =
        Submission::delete_file(&conn, assignment_id, file_id, auth.id, &upload_dir())?;

    Ok(HttpResponse::Ok().json(json!({ "deleted": num_deleted })))
}

#[get("/class/download/{file_id}")]
async fn download(
    req: HttpRequest,
    pool: web::Data<Pool>,
    auth: AuthUser,
    file_id: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let conn = db::connection(&pool)?;

    let file = SubmissionFile::find(&conn, file_id.into_inner())?;
    Submission::verify_file_access(&conn, &file, &auth)?;

    let path = upload_dir().join(&file.stored_name);
    if !path.exists() {
        return Err(ApiError::new(404, "File is missing from storage".to_string()));
    }

    let named = NamedFile::open(&path)?.set_content_disposition(ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters: vec![DispositionParam::Filename(file.file_name.clone())],
    });

    Ok(named.into_response(&req))
}

#[post("/class/{assignment_id}/autograde")]
async fn autograde(
    pool: web::Data<Pool>,
    auth: AuthUser,
    assignment_id: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    auth.require_teacher()?;
    let conn = db::connection(&pool)?;
    let assignment_id = assignment_id.into_inner();

    Assignment::require_teacher(&conn, assignment_id, auth.id)?;
    let graded = Submission::auto_grade(&conn, assignment_id)?;

    Ok(HttpResponse::Ok().json(json!({ "graded": graded })))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(download);
    cfg.service(submit);
    cfg.service(grade);
    cfg.service(find_all);
    cfg.service(find_for_student);
    cfg.service(delete_file);
    cfg.service(autograde);
}

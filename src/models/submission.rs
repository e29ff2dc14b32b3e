use crate::api_error::ApiError;
use crate::models::assignment::Assignment;
use crate::models::class::Class;
use crate::models::user::{AuthUser, Role, User, UserInfo};
use crate::schema::{assignments, submission_files, submissions, users};
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Queryable, Insertable)]
#[table_name = "submissions"]
pub struct Submission {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub student_id: Uuid,
    pub content: String,
    pub submitted_at: NaiveDateTime,
    pub score: Option<i32>,
    pub teacher_comment: Option<String>,
}

#[derive(Serialize, Deserialize, Queryable, Insertable)]
#[table_name = "submission_files"]
pub struct SubmissionFile {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub file_name: String,
    pub stored_name: String,
}

/// A file already written to the upload directory, waiting for its row.
pub struct StoredFile {
    pub file_name: String,
    pub stored_name: String,
}

#[derive(Deserialize)]
pub struct GradeInput {
    pub score: i32,
    pub teacher_comment: Option<String>,
}

#[derive(Serialize)]
pub struct SubmissionWithFiles {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub student_id: Uuid,
    pub content: String,
    pub submitted_at: NaiveDateTime,
    pub score: Option<i32>,
    pub teacher_comment: Option<String>,
    pub files: Vec<SubmissionFile>,
}

#[derive(Serialize)]
pub struct StudentSubmissionView {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub assignment_title: String,
    pub student: UserInfo,
    pub content: String,
    pub submitted_at: NaiveDateTime,
    pub score: Option<i32>,
    pub teacher_comment: Option<String>,
    pub files: Vec<SubmissionFile>,
}

impl Submission {
    /// One row per (assignment, student); resubmitting replaces the content
    /// and moves `submitted_at` forward.
    pub fn upsert(
        conn: &PgConnection,
        assignment_id: Uuid,
        student_id: Uuid,
        content: String,
        files: Vec<StoredFile>,
    ) -> Result<(Self, Vec<SubmissionFile>), ApiError> {
        assignments::table
            .filter(assignments::id.eq(assignment_id))
            .select(assignments::id)
            .first::<Uuid>(conn)
            .optional()?
            .ok_or_else(|| ApiError::new(404, "Assignment not found".to_string()))?;

        let now = Utc::now().naive_utc();
        let row = Submission {
            id: Uuid::new_v4(),
            assignment_id,
            student_id,
            content,
            submitted_at: now,
            score: None,
            teacher_comment: None,
        };

        let submission: Submission = diesel::insert_into(submissions::table)
            .values(&row)
            .on_conflict((submissions::assignment_id, submissions::student_id))
            .do_update()
            .set((
                submissions::content.eq(&row.content),
                submissions::submitted_at.eq(now),
            ))
            .get_result(conn)?;

        let file_rows: Vec<SubmissionFile> = files
            .into_iter()
            .map(|file| SubmissionFile {
                id: Uuid::new_v4(),
                submission_id: submission.id,
                file_name: file.file_name,
                stored_name: file.stored_name,
            })
            .collect();

        if !file_rows.is_empty() {
            diesel::insert_into(submission_files::table)
                .values(&file_rows)
                .execute(conn)?;
        }

        Ok((submission, file_rows))
    }

    pub fn find(conn: &PgConnection, id: Uuid) -> Result<Self, ApiError> {
        let submission = submissions::table
            .filter(submissions::id.eq(id))
            .first(conn)
            .optional()?;

        submission.ok_or_else(|| ApiError::new(404, "Submission not found".to_string()))
    }

    pub fn grade(
        conn: &PgConnection,
        id: Uuid,
        input: GradeInput,
        teacher_id: Uuid,
    ) -> Result<Self, ApiError> {
        let submission = Submission::find(conn, id)?;
        Assignment::require_teacher(conn, submission.assignment_id, teacher_id)?;

        let submission = diesel::update(submissions::table.filter(submissions::id.eq(id)))
            .set((
                submissions::score.eq(input.score),
                submissions::teacher_comment.eq(input.teacher_comment),
            ))
            .get_result(conn)?;

        Ok(submission)
    }

    pub fn list_for_assignment(
        conn: &PgConnection,
        assignment_id: Uuid,
    ) -> Result<Vec<SubmissionWithFiles>, ApiError> {
        let submissions: Vec<Submission> = submissions::table
            .filter(submissions::assignment_id.eq(assignment_id))
            .order(submissions::submitted_at.asc())
            .load(conn)?;

        let submission_ids: Vec<Uuid> = submissions.iter().map(|s| s.id).collect();
        let mut files = SubmissionFile::for_submissions(conn, &submission_ids)?;

        Ok(submissions
            .into_iter()
            .map(|submission| SubmissionWithFiles {
                files: files.remove(&submission.id).unwrap_or_default(),
                id: submission.id,
                assignment_id: submission.assignment_id,
                student_id: submission.student_id,
                content: submission.content,
                submitted_at: submission.submitted_at,
                score: submission.score,
                teacher_comment: submission.teacher_comment,
            })
            .collect())
    }

    pub fn student_view(
        conn: &PgConnection,
        assignment_id: Uuid,
        student_id: Uuid,
    ) -> Result<StudentSubmissionView, ApiError> {
        let row: Option<(Submission, User)> = submissions::table
            .inner_join(users::table)
            .filter(submissions::assignment_id.eq(assignment_id))
            .filter(submissions::student_id.eq(student_id))
            .first(conn)
            .optional()?;

        let (submission, student) =
            row.ok_or_else(|| ApiError::new(404, "Submission not found".to_string()))?;

        let assignment = Assignment::find(conn, assignment_id)?;
        let files = SubmissionFile::for_submission(conn, submission.id)?;

        Ok(StudentSubmissionView {
            id: submission.id,
            assignment_id,
            assignment_title: assignment.title,
            student: student.into(),
            content: submission.content,
            submitted_at: submission.submitted_at,
            score: submission.score,
            teacher_comment: submission.teacher_comment,
            files,
        })
    }

    pub fn delete_file(
        conn: &PgConnection,
        assignment_id: Uuid,
        file_id: Uuid,
        student_id: Uuid,
        upload_dir: &Path,
    ) -> Result<usize, ApiError> {
        let submission: Submission = submissions::table
            .filter(submissions::assignment_id.eq(assignment_id))
            .filter(submissions::student_id.eq(student_id))
            .first(conn)
            .optional()?
            .ok_or_else(|| ApiError::new(404, "Submission not found".to_string()))?;

        let file: SubmissionFile = submission_files::table
            .filter(submission_files::id.eq(file_id))
            .filter(submission_files::submission_id.eq(submission.id))
            .first(conn)
            .optional()?
            .ok_or_else(|| ApiError::new(404, "File not found".to_string()))?;

        let path = upload_dir.join(&file.stored_name);
        if path.exists() {
            fs::remove_file(&path)?;
        }

        let deleted =
            diesel::delete(submission_files::table.filter(submission_files::id.eq(file.id)))
                .execute(conn)?;

        Ok(deleted)
    }

    /// Downloads are limited to the submitting student and the class teacher.
    pub fn verify_file_access(
        conn: &PgConnection,
        file: &SubmissionFile,
        auth: &AuthUser,
    ) -> Result<(), ApiError> {
        let submission = Submission::find(conn, file.submission_id)?;

        if submission.student_id == auth.id {
            return Ok(());
        }

        if auth.role == Role::Teacher {
            let assignment = Assignment::find(conn, submission.assignment_id)?;
            let class = Class::find(conn, assignment.class_id)?;
            if class.teacher_id == auth.id {
                return Ok(());
            }
        }

        warn!("file {} download rejected for user {}", file.id, auth.id);
        Err(ApiError::new(403, "You do not have access to this file".to_string()))
    }

    pub fn auto_grade(conn: &PgConnection, assignment_id: Uuid) -> Result<usize, ApiError> {
        let ungraded: Vec<Submission> = submissions::table
            .filter(submissions::assignment_id.eq(assignment_id))
            .filter(submissions::score.is_null())
            .load(conn)?;

        let mut rng = rand::thread_rng();
        for submission in &ungraded {
            let score = demo_score(submission.content.len(), rng.gen_range(0.0..100.0));

            diesel::update(submissions::table.filter(submissions::id.eq(submission.id)))
                .set((
                    submissions::score.eq(score),
                    submissions::teacher_comment.eq("Auto-graded by system"),
                ))
                .execute(conn)?;
        }

        Ok(ungraded.len())
    }
}

impl SubmissionFile {
    pub fn find(conn: &PgConnection, id: Uuid) -> Result<Self, ApiError> {
        let file = submission_files::table
            .filter(submission_files::id.eq(id))
            .first(conn)
            .optional()?;

        file.ok_or_else(|| ApiError::new(404, "File not found".to_string()))
    }

    pub fn for_submission(conn: &PgConnection, submission_id: Uuid) -> Result<Vec<Self>, ApiError> {
        let files = submission_files::table
            .filter(submission_files::submission_id.eq(submission_id))
            .load::<SubmissionFile>(conn)?;

        Ok(files)
    }

    pub fn for_submissions(
        conn: &PgConnection,
        submission_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<Self>>, ApiError> {
        if submission_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let files: Vec<SubmissionFile> = submission_files::table
            .filter(submission_files::submission_id.eq_any(submission_ids))
            .load(conn)?;

        let mut grouped: HashMap<Uuid, Vec<SubmissionFile>> = HashMap::new();
        for file in files {
            grouped.entry(file.submission_id).or_default().push(file);
        }

        Ok(grouped)
    }
}

/// Demo formula only; the result has no relation to content quality.
pub fn demo_score(content_length: usize, noise: f64) -> i32 {
    let raw = content_length as f64 * 0.1 + noise;

    (raw.max(0.0).min(100.0) % 100.0).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_score_stays_within_bounds() {
        for length in [0, 10, 1000, 100_000] {
            for noise in [0.0, 0.1, 42.5, 99.999] {
                let score = demo_score(length, noise);
                assert!((0..=100).contains(&score), "score {} out of range", score);
            }
        }
    }

    #[test]
    fn demo_score_without_noise_scales_with_length() {
        assert_eq!(demo_score(0, 0.0), 0);
        assert_eq!(demo_score(100, 0.0), 10);
        assert_eq!(demo_score(420, 0.0), 42);
    }

    #[test]
    fn demo_score_clamp_then_modulo_wraps_to_zero() {
        // 2000 * 0.1 + 99.0 clamps to 100, and 100 % 100 == 0.
        assert_eq!(demo_score(2000, 99.0), 0);
    }

    #[test]
    fn demo_score_rounds_up_just_below_the_clamp() {
        assert_eq!(demo_score(0, 99.7), 100);
        assert_eq!(demo_score(3, 0.1), 0);
    }
}

use crate::api_error::ApiError;
use crate::models::assignment::{submission_status, Assignment, SubmissionStatus};
use crate::models::submission::Submission;
use crate::models::user::{Role, User, UserInfo};
use crate::schema::{class_members, classes, submissions, users};
use chrono::{NaiveDateTime, Utc};
use diesel::dsl::exists;
use diesel::prelude::*;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Queryable, Insertable)]
#[table_name = "classes"]
pub struct Class {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub code: String,
    pub teacher_id: Uuid,
    pub created_at: NaiveDateTime,
}

#[derive(Serialize, Deserialize, Queryable, Insertable)]
#[table_name = "class_members"]
pub struct ClassMember {
    pub class_id: Uuid,
    pub student_id: Uuid,
    pub created_at: NaiveDateTime,
}

#[derive(Deserialize)]
pub struct ClassInput {
    pub name: String,
    pub description: String,
}

#[derive(Deserialize, AsChangeset)]
#[table_name = "classes"]
pub struct ClassUpdate {
    pub name: String,
    pub description: String,
}

#[derive(Deserialize)]
pub struct JoinRequest {
    pub code: String,
}

#[derive(Deserialize)]
pub struct InviteRequest {
    pub email: String,
}

#[derive(Serialize)]
pub struct StudentClassDetail {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub code: String,
    pub teacher: UserInfo,
    pub assignments: Vec<StudentAssignmentSummary>,
}

#[derive(Serialize)]
pub struct StudentAssignmentSummary {
    pub id: Uuid,
    pub title: String,
    pub deadline: NaiveDateTime,
    pub status: SubmissionStatus,
}

#[derive(Serialize)]
pub struct TeacherClassDetail {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub code: String,
    pub teacher: UserInfo,
    pub member_count: i64,
    pub assignments: Vec<TeacherAssignmentSummary>,
}

#[derive(Serialize)]
pub struct TeacherAssignmentSummary {
    pub id: Uuid,
    pub title: String,
    pub deadline: NaiveDateTime,
    pub submission_count: usize,
    pub completion_pct: f64,
    pub average_score: Option<f64>,
}

impl Class {
    pub fn create(conn: &PgConnection, input: ClassInput, teacher_id: Uuid) -> Result<Self, ApiError> {
        let teacher = users::table
            .filter(users::id.eq(teacher_id))
            .first::<User>(conn)
            .optional()?
            .filter(|user| user.role == Role::Teacher.to_string())
            .ok_or_else(|| ApiError::new(404, "Teacher not found".to_string()))?;

        let code = Class::unique_code(conn, &input.name, &teacher)?;

        let class = Class {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            code,
            teacher_id,
            created_at: Utc::now().naive_utc(),
        };

        let class = diesel::insert_into(classes::table)
            .values(class)
            .get_result(conn)?;

        Ok(class)
    }

    fn unique_code(conn: &PgConnection, name: &str, teacher: &User) -> Result<String, ApiError> {
        loop {
            let code = code_candidate(name, &teacher.first_name, &teacher.last_name);

            let taken: i64 = classes::table
                .filter(classes::code.eq(&code))
                .count()
                .get_result(conn)?;

            if taken == 0 {
                return Ok(code);
            }
        }
    }

    pub fn find(conn: &PgConnection, id: Uuid) -> Result<Self, ApiError> {
        let class = classes::table
            .filter(classes::id.eq(id))
            .first(conn)
            .optional()?;

        class.ok_or_else(|| ApiError::new(404, "Class not found".to_string()))
    }

    pub fn find_for_teacher(conn: &PgConnection, teacher_id: Uuid) -> Result<Vec<Self>, ApiError> {
        let classes = classes::table
            .filter(classes::teacher_id.eq(teacher_id))
            .order(classes::created_at.asc())
            .load::<Class>(conn)?;

        Ok(classes)
    }

    pub fn find_for_student(conn: &PgConnection, student_id: Uuid) -> Result<Vec<Self>, ApiError> {
        let classes = class_members::table
            .inner_join(classes::table)
            .filter(class_members::student_id.eq(student_id))
            .select(classes::all_columns)
            .load::<Class>(conn)?;

        Ok(classes)
    }

    pub fn update(
        conn: &PgConnection,
        id: Uuid,
        update: ClassUpdate,
        teacher_id: Uuid,
    ) -> Result<Self, ApiError> {
        let updated = diesel::update(
            classes::table
                .filter(classes::id.eq(id))
                .filter(classes::teacher_id.eq(teacher_id)),
        )
        .set(update)
        .get_result::<Class>(conn)
        .optional()?;

        updated.ok_or_else(|| {
            warn!("class {} update rejected for teacher {}", id, teacher_id);
            ApiError::new(403, "You do not teach this class".to_string())
        })
    }

    pub fn delete(conn: &PgConnection, id: Uuid, teacher_id: Uuid) -> Result<usize, ApiError> {
        let deleted = diesel::delete(
            classes::table
                .filter(classes::id.eq(id))
                .filter(classes::teacher_id.eq(teacher_id)),
        )
        .execute(conn)?;

        if deleted == 0 {
            warn!("class {} delete rejected for teacher {}", id, teacher_id);
            return Err(ApiError::new(403, "You do not teach this class".to_string()));
        }

        Ok(deleted)
    }

    pub fn is_member(conn: &PgConnection, class_id: Uuid, student_id: Uuid) -> Result<bool, ApiError> {
        let member = diesel::select(exists(
            class_members::table
                .filter(class_members::class_id.eq(class_id))
                .filter(class_members::student_id.eq(student_id)),
        ))
        .get_result(conn)?;

        Ok(member)
    }

    pub fn member_ids(conn: &PgConnection, class_id: Uuid) -> Result<Vec<Uuid>, ApiError> {
        let ids = class_members::table
            .filter(class_members::class_id.eq(class_id))
            .select(class_members::student_id)
            .load::<Uuid>(conn)?;

        Ok(ids)
    }

    pub fn join_by_code(
        conn: &PgConnection,
        code: &str,
        student_id: Uuid,
    ) -> Result<ClassMember, ApiError> {
        let class = classes::table
            .filter(classes::code.eq(code))
            .first::<Class>(conn)
            .optional()?
            .ok_or_else(|| ApiError::new(404, "No class with that code".to_string()))?;

        if Class::is_member(conn, class.id, student_id)? {
            return Err(ApiError::new(400, "Already joined this class".to_string()));
        }

        let member = diesel::insert_into(class_members::table)
            .values(ClassMember {
                class_id: class.id,
                student_id,
                created_at: Utc::now().naive_utc(),
            })
            .get_result(conn)?;

        Ok(member)
    }

    pub fn invite(
        conn: &PgConnection,
        class_id: Uuid,
        email: &str,
        teacher_id: Uuid,
    ) -> Result<ClassMember, ApiError> {
        let class = Class::find(conn, class_id)?;

        if class.teacher_id != teacher_id {
            warn!("invite to class {} rejected for teacher {}", class_id, teacher_id);
            return Err(ApiError::new(403, "You do not teach this class".to_string()));
        }

        let student = User::find_by_email(conn, email)?
            .ok_or_else(|| ApiError::new(404, "No user with that email".to_string()))?;

        if student.role != Role::Student.to_string() {
            return Err(ApiError::new(400, "User is not a student".to_string()));
        }

        if Class::is_member(conn, class_id, student.id)? {
            return Err(ApiError::new(400, "Already joined this class".to_string()));
        }

        let member = diesel::insert_into(class_members::table)
            .values(ClassMember {
                class_id,
                student_id: student.id,
                created_at: Utc::now().naive_utc(),
            })
            .get_result(conn)?;

        Ok(member)
    }

    pub fn student_detail(
        conn: &PgConnection,
        class_id: Uuid,
        student_id: Uuid,
    ) -> Result<StudentClassDetail, ApiError> {
        let class = Class::find(conn, class_id)?;

        if !Class::is_member(conn, class_id, student_id)? {
            warn!("class {} detail rejected: {} is not a member", class_id, student_id);
            return Err(ApiError::new(403, "You are not a member of this class".to_string()));
        }

        let teacher = User::find(conn, class.teacher_id)?;
        let assignments = Assignment::for_class(conn, class_id)?;

        let assignment_ids: Vec<Uuid> = assignments.iter().map(|a| a.id).collect();
        let own_submissions: Vec<Submission> = submissions::table
            .filter(submissions::assignment_id.eq_any(&assignment_ids))
            .filter(submissions::student_id.eq(student_id))
            .load(conn)?;
        let by_assignment: HashMap<Uuid, Submission> = own_submissions
            .into_iter()
            .map(|submission| (submission.assignment_id, submission))
            .collect();

        let now = Utc::now().naive_utc();
        let assignments = assignments
            .into_iter()
            .map(|assignment| StudentAssignmentSummary {
                status: submission_status(by_assignment.get(&assignment.id), assignment.deadline, now),
                id: assignment.id,
                title: assignment.title,
                deadline: assignment.deadline,
            })
            .collect();

        Ok(StudentClassDetail {
            id: class.id,
            name: class.name,
            description: class.description,
            code: class.code,
            teacher: teacher.into(),
            assignments,
        })
    }

    pub fn teacher_detail(
        conn: &PgConnection,
        class_id: Uuid,
        teacher_id: Uuid,
    ) -> Result<TeacherClassDetail, ApiError> {
        let class = Class::find(conn, class_id)?;

        if class.teacher_id != teacher_id {
            warn!("class {} detail rejected for teacher {}", class_id, teacher_id);
            return Err(ApiError::new(403, "You do not teach this class".to_string()));
        }

        let teacher = User::find(conn, class.teacher_id)?;
        let member_count: i64 = class_members::table
            .filter(class_members::class_id.eq(class_id))
            .count()
            .get_result(conn)?;

        let assignments = Assignment::for_class(conn, class_id)?;
        let mut summaries = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            let scores: Vec<Option<i32>> = submissions::table
                .filter(submissions::assignment_id.eq(assignment.id))
                .select(submissions::score)
                .load(conn)?;

            let submission_count = scores.len();
            let graded: Vec<i32> = scores.into_iter().flatten().collect();

            summaries.push(TeacherAssignmentSummary {
                id: assignment.id,
                title: assignment.title,
                deadline: assignment.deadline,
                submission_count,
                completion_pct: completion_pct(submission_count, member_count),
                average_score: average_score(&graded),
            });
        }

        Ok(TeacherClassDetail {
            id: class.id,
            name: class.name,
            description: class.description,
            code: class.code,
            teacher: teacher.into(),
            member_count,
            assignments: summaries,
        })
    }
}

pub fn code_candidate(name: &str, first_name: &str, last_name: &str) -> String {
    let prefix: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(3)
        .collect();
    let initials: String = [first_name, last_name]
        .iter()
        .filter_map(|name| name.chars().next())
        .collect();
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(3)
        .map(char::from)
        .collect();

    format!("{}{}{}", prefix, initials, suffix).to_uppercase()
}

pub fn completion_pct(submission_count: usize, member_count: i64) -> f64 {
    if member_count == 0 {
        return 0.0;
    }

    submission_count as f64 * 100.0 / member_count as f64
}

pub fn average_score(scores: &[i32]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }

    Some(scores.iter().sum::<i32>() as f64 / scores.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_candidate_is_uppercase_alphanumeric() {
        let code = code_candidate("Biology 101", "Grace", "Hopper");

        assert!(code.starts_with("BIOGH"));
        assert_eq!(code.len(), 8);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(code, code.to_uppercase());
    }

    #[test]
    fn code_candidate_handles_short_and_empty_names() {
        let code = code_candidate("", "Ada", "Lovelace");
        assert_eq!(code.len(), 5);

        let code = code_candidate("C", "Ada", "Lovelace");
        assert!(code.starts_with("CAL"));
        assert_eq!(code.len(), 6);
    }

    #[test]
    fn code_candidate_skips_non_alphanumerics() {
        let code = code_candidate("  #1 Math!", "Emmy", "Noether");
        assert!(code.starts_with("1MAEN"));
    }

    #[test]
    fn completion_pct_handles_empty_classes() {
        assert_eq!(completion_pct(0, 0), 0.0);
        assert_eq!(completion_pct(3, 4), 75.0);
    }

    #[test]
    fn average_score_ignores_nothing_and_empty_is_none() {
        assert_eq!(average_score(&[]), None);
        assert_eq!(average_score(&[8, 10]), Some(9.0));
    }
}

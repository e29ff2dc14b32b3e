use crate::api_error::ApiError;
use crate::models::class::Class;
use crate::models::notification::{Notification, NotificationKind};
use crate::models::peer_review::{PeerReview, ReceivedReview};
use crate::models::rubric::{Rubric, RubricDoc};
use crate::models::submission::{Submission, SubmissionFile};
use crate::models::user::{User, UserInfo};
use crate::schema::{assignments, classes, rubrics, submissions, users};
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Queryable, Insertable)]
#[table_name = "assignments"]
pub struct Assignment {
    pub id: Uuid,
    pub class_id: Uuid,
    pub title: String,
    pub description: String,
    pub deadline: NaiveDateTime,
    pub rubric_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
}

#[derive(Deserialize)]
pub struct AssignmentInput {
    pub title: String,
    pub description: String,
    pub deadline: NaiveDateTime,
    pub rubric_id: Option<Uuid>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubmissionStatus {
    Graded,
    Submitted,
    Overdue,
    Missing,
}

#[derive(Serialize)]
pub struct AssignmentDoc {
    pub id: Uuid,
    pub class_id: Uuid,
    pub title: String,
    pub description: String,
    pub deadline: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub rubric: Option<RubricDoc>,
}

#[derive(Serialize)]
pub struct StudentAssignmentDetail {
    pub assignment: AssignmentDoc,
    pub my_submission: Option<MySubmission>,
}

#[derive(Serialize)]
pub struct MySubmission {
    pub id: Uuid,
    pub content: String,
    pub submitted_at: NaiveDateTime,
    pub score: Option<i32>,
    pub teacher_comment: Option<String>,
    pub files: Vec<SubmissionFile>,
    pub peer_reviews: Vec<ReceivedReview>,
}

#[derive(Serialize)]
pub struct TeacherAssignmentDetail {
    pub assignment: AssignmentDoc,
    pub submissions: Vec<SubmissionRow>,
}

#[derive(Serialize)]
pub struct SubmissionRow {
    pub id: Uuid,
    pub student: UserInfo,
    pub content: String,
    pub submitted_at: NaiveDateTime,
    pub score: Option<i32>,
    pub teacher_comment: Option<String>,
    pub files: Vec<SubmissionFile>,
}

impl Assignment {
    pub fn create(
        conn: &PgConnection,
        class_id: Uuid,
        input: AssignmentInput,
        teacher_id: Uuid,
    ) -> Result<Self, ApiError> {
        let class = Class::find(conn, class_id)?;

        if class.teacher_id != teacher_id {
            warn!("assignment create in class {} rejected for teacher {}", class_id, teacher_id);
            return Err(ApiError::new(403, "You do not teach this class".to_string()));
        }

        if let Some(rubric_id) = input.rubric_id {
            let rubric = rubrics::table
                .filter(rubrics::id.eq(rubric_id))
                .first::<Rubric>(conn)
                .optional()?;

            match rubric {
                Some(rubric) if rubric.teacher_id == teacher_id => {}
                Some(_) => {
                    warn!("rubric {} belongs to another teacher, rejecting as missing", rubric_id);
                    return Err(ApiError::new(404, "Rubric not found".to_string()));
                }
                None => return Err(ApiError::new(404, "Rubric not found".to_string())),
            }
        }

        conn.transaction::<Assignment, ApiError, _>(|| {
            let assignment: Assignment = diesel::insert_into(assignments::table)
                .values(Assignment {
                    id: Uuid::new_v4(),
                    class_id,
                    title: input.title.clone(),
                    description: input.description.clone(),
                    deadline: input.deadline,
                    rubric_id: input.rubric_id,
                    created_at: Utc::now().naive_utc(),
                })
                .get_result(conn)?;

            let link = format!("/class/{}/assignment/{}", class_id, assignment.id);
            let message = format!("New assignment: {}", assignment.title);
            let notifications: Vec<Notification> = Class::member_ids(conn, class_id)?
                .into_iter()
                .map(|student_id| {
                    Notification::build(
                        student_id,
                        NotificationKind::NewAssignment,
                        message.clone(),
                        link.clone(),
                    )
                })
                .collect();

            Notification::create_many(conn, notifications)?;

            Ok(assignment)
        })
    }

    pub fn find(conn: &PgConnection, id: Uuid) -> Result<Self, ApiError> {
        let assignment = assignments::table
            .filter(assignments::id.eq(id))
            .first(conn)
            .optional()?;

        assignment.ok_or_else(|| ApiError::new(404, "Assignment not found".to_string()))
    }

    pub fn find_scoped(conn: &PgConnection, class_id: Uuid, id: Uuid) -> Result<Self, ApiError> {
        let assignment = assignments::table
            .filter(assignments::id.eq(id))
            .filter(assignments::class_id.eq(class_id))
            .first(conn)
            .optional()?;

        assignment.ok_or_else(|| ApiError::new(404, "Assignment not found".to_string()))
    }

    pub fn for_class(conn: &PgConnection, class_id: Uuid) -> Result<Vec<Self>, ApiError> {
        let assignments = assignments::table
            .filter(assignments::class_id.eq(class_id))
            .order(assignments::created_at.asc())
            .load::<Assignment>(conn)?;

        Ok(assignments)
    }

    /// Requester must teach the class owning the assignment.
    pub fn require_teacher(
        conn: &PgConnection,
        assignment_id: Uuid,
        teacher_id: Uuid,
    ) -> Result<Self, ApiError> {
        let assignment = Assignment::find(conn, assignment_id)?;
        let class = Class::find(conn, assignment.class_id)?;

        if class.teacher_id != teacher_id {
            warn!("assignment {} access rejected: {} does not teach class {}", assignment_id, teacher_id, class.id);
            return Err(ApiError::new(403, "You do not teach this class".to_string()));
        }

        Ok(assignment)
    }

    pub fn list(conn: &PgConnection, class_id: Uuid) -> Result<Vec<AssignmentDoc>, ApiError> {
        let assignments = Assignment::for_class(conn, class_id)?;

        let rubric_ids: Vec<Uuid> = assignments
            .iter()
            .filter_map(|assignment| assignment.rubric_id)
            .collect();
        let rubric_docs = Rubric::docs(conn, &rubric_ids)?;

        Ok(assignments
            .into_iter()
            .map(|assignment| {
                let rubric = assignment
                    .rubric_id
                    .and_then(|id| rubric_docs.get(&id).cloned());
                AssignmentDoc::assemble(assignment, rubric)
            })
            .collect())
    }

    pub fn detail_for_student(
        conn: &PgConnection,
        class_id: Uuid,
        assignment_id: Uuid,
        student_id: Uuid,
    ) -> Result<StudentAssignmentDetail, ApiError> {
        let assignment = Assignment::find_scoped(conn, class_id, assignment_id)?;

        if !Class::is_member(conn, class_id, student_id)? {
            warn!("assignment {} detail rejected: {} is not a member of class {}", assignment_id, student_id, class_id);
            return Err(ApiError::new(403, "You are not a member of this class".to_string()));
        }

        let rubric = match assignment.rubric_id {
            Some(rubric_id) => Some(Rubric::doc(conn, rubric_id)?),
            None => None,
        };

        let submission = submissions::table
            .filter(submissions::assignment_id.eq(assignment_id))
            .filter(submissions::student_id.eq(student_id))
            .first::<Submission>(conn)
            .optional()?;

        let my_submission = match submission {
            Some(submission) => Some(MySubmission {
                files: SubmissionFile::for_submission(conn, submission.id)?,
                peer_reviews: PeerReview::received_for_submission(conn, submission.id)?,
                id: submission.id,
                content: submission.content,
                submitted_at: submission.submitted_at,
                score: submission.score,
                teacher_comment: submission.teacher_comment,
            }),
            None => None,
        };

        Ok(StudentAssignmentDetail {
            assignment: AssignmentDoc::assemble(assignment, rubric),
            my_submission,
        })
    }

    pub fn detail_for_teacher(
        conn: &PgConnection,
        class_id: Uuid,
        assignment_id: Uuid,
        teacher_id: Uuid,
    ) -> Result<TeacherAssignmentDetail, ApiError> {
        let assignment = Assignment::find_scoped(conn, class_id, assignment_id)?;
        Assignment::require_teacher(conn, assignment_id, teacher_id)?;

        let rubric = match assignment.rubric_id {
            Some(rubric_id) => Some(Rubric::doc(conn, rubric_id)?),
            None => None,
        };

        let rows: Vec<(Submission, User)> = submissions::table
            .inner_join(users::table)
            .filter(submissions::assignment_id.eq(assignment_id))
            .order(submissions::submitted_at.asc())
            .load(conn)?;

        let submission_ids: Vec<Uuid> = rows.iter().map(|(submission, _)| submission.id).collect();
        let mut files = SubmissionFile::for_submissions(conn, &submission_ids)?;

        let submissions = rows
            .into_iter()
            .map(|(submission, student)| SubmissionRow {
                files: files.remove(&submission.id).unwrap_or_default(),
                id: submission.id,
                student: student.into(),
                content: submission.content,
                submitted_at: submission.submitted_at,
                score: submission.score,
                teacher_comment: submission.teacher_comment,
            })
            .collect();

        Ok(TeacherAssignmentDetail {
            assignment: AssignmentDoc::assemble(assignment, rubric),
            submissions,
        })
    }

    pub fn update(
        conn: &PgConnection,
        class_id: Uuid,
        id: Uuid,
        input: AssignmentInput,
        teacher_id: Uuid,
    ) -> Result<Self, ApiError> {
        let updated = diesel::update(
            assignments::table
                .filter(assignments::id.eq(id))
                .filter(assignments::class_id.eq(class_id))
                .filter(assignments::class_id.eq_any(
                    classes::table
                        .filter(classes::teacher_id.eq(teacher_id))
                        .select(classes::id),
                )),
        )
        .set((
            assignments::title.eq(input.title),
            assignments::description.eq(input.description),
            assignments::deadline.eq(input.deadline),
            assignments::rubric_id.eq(input.rubric_id),
        ))
        .get_result::<Assignment>(conn)
        .optional()?;

        updated.ok_or_else(|| {
            warn!("assignment {} update rejected for teacher {}", id, teacher_id);
            ApiError::new(403, "You do not teach this class".to_string())
        })
    }

    pub fn delete(
        conn: &PgConnection,
        class_id: Uuid,
        id: Uuid,
        teacher_id: Uuid,
    ) -> Result<usize, ApiError> {
        let deleted = diesel::delete(
            assignments::table
                .filter(assignments::id.eq(id))
                .filter(assignments::class_id.eq(class_id))
                .filter(assignments::class_id.eq_any(
                    classes::table
                        .filter(classes::teacher_id.eq(teacher_id))
                        .select(classes::id),
                )),
        )
        .execute(conn)?;

        if deleted == 0 {
            warn!("assignment {} delete rejected for teacher {}", id, teacher_id);
            return Err(ApiError::new(403, "You do not teach this class".to_string()));
        }

        Ok(deleted)
    }
}

impl AssignmentDoc {
    fn assemble(assignment: Assignment, rubric: Option<RubricDoc>) -> Self {
        AssignmentDoc {
            id: assignment.id,
            class_id: assignment.class_id,
            title: assignment.title,
            description: assignment.description,
            deadline: assignment.deadline,
            created_at: assignment.created_at,
            rubric,
        }
    }
}

/// Single source of truth for the derived per-student assignment status.
pub fn submission_status(
    submission: Option<&Submission>,
    deadline: NaiveDateTime,
    now: NaiveDateTime,
) -> SubmissionStatus {
    match submission {
        Some(submission) if submission.score.is_some() => SubmissionStatus::Graded,
        Some(_) => SubmissionStatus::Submitted,
        None if deadline < now => SubmissionStatus::Overdue,
        None => SubmissionStatus::Missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn submission(score: Option<i32>) -> Submission {
        Submission {
            id: Uuid::new_v4(),
            assignment_id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            content: "draft".to_string(),
            submitted_at: NaiveDate::from_ymd(2026, 1, 10).and_hms(12, 0, 0),
            score,
            teacher_comment: None,
        }
    }

    #[test]
    fn graded_wins_over_everything() {
        let deadline = NaiveDate::from_ymd(2026, 1, 1).and_hms(0, 0, 0);
        let now = NaiveDate::from_ymd(2026, 2, 1).and_hms(0, 0, 0);

        let graded = submission(Some(8));
        assert_eq!(
            submission_status(Some(&graded), deadline, now),
            SubmissionStatus::Graded
        );
    }

    #[test]
    fn ungraded_submission_is_submitted_even_past_deadline() {
        let deadline = NaiveDate::from_ymd(2026, 1, 1).and_hms(0, 0, 0);
        let now = NaiveDate::from_ymd(2026, 2, 1).and_hms(0, 0, 0);

        let ungraded = submission(None);
        assert_eq!(
            submission_status(Some(&ungraded), deadline, now),
            SubmissionStatus::Submitted
        );
    }

    #[test]
    fn no_submission_past_deadline_is_overdue() {
        let deadline = NaiveDate::from_ymd(2026, 1, 1).and_hms(0, 0, 0);
        let now = NaiveDate::from_ymd(2026, 2, 1).and_hms(0, 0, 0);

        assert_eq!(
            submission_status(None, deadline, now),
            SubmissionStatus::Overdue
        );
    }

    #[test]
    fn no_submission_before_deadline_is_missing() {
        let deadline = NaiveDate::from_ymd(2026, 2, 1).and_hms(0, 0, 0);
        let now = NaiveDate::from_ymd(2026, 1, 1).and_hms(0, 0, 0);

        assert_eq!(
            submission_status(None, deadline, now),
            SubmissionStatus::Missing
        );
    }

    #[test]
    fn deadline_exactly_now_is_not_overdue() {
        let instant = NaiveDate::from_ymd(2026, 1, 1).and_hms(0, 0, 0);

        assert_eq!(
            submission_status(None, instant, instant),
            SubmissionStatus::Missing
        );
    }
}

use crate::api_error::ApiError;
use crate::models::assignment::Assignment;
use crate::models::class::Class;
use crate::models::notification::{Notification, NotificationKind};
use crate::models::rubric::Level;
use crate::models::submission::Submission;
use crate::models::user::User;
use crate::schema::{peer_review_selections, peer_reviews, rubric_levels, users};
use chrono::{NaiveDateTime, Utc};
use derive_more::Display;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Display, PartialEq)]
pub enum ReviewStatus {
    #[display(fmt = "PENDING")]
    Pending,
    #[display(fmt = "COMPLETED")]
    Completed,
}

#[derive(Serialize, Deserialize, Queryable, Insertable)]
#[table_name = "peer_reviews"]
pub struct PeerReview {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub reviewer_id: Uuid,
    pub deadline: NaiveDateTime,
    pub comments: Option<String>,
    pub status: String,
    pub created_at: NaiveDateTime,
}

#[derive(Serialize, Deserialize, Queryable, Insertable)]
#[table_name = "peer_review_selections"]
pub struct PeerReviewSelection {
    pub id: Uuid,
    pub peer_review_id: Uuid,
    pub criterion_id: Uuid,
    pub level_id: Uuid,
}

#[derive(Deserialize)]
pub struct AssignReviewInput {
    pub submission_id: Uuid,
    pub reviewer_id: Uuid,
    pub deadline: NaiveDateTime,
}

#[derive(Deserialize)]
pub struct CompleteReviewInput {
    pub comments: String,
    pub selections: Vec<SelectionInput>,
}

#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct SelectionInput {
    pub criterion_id: Uuid,
    pub level_id: Uuid,
}

#[derive(Serialize)]
pub struct PeerReviewDetail {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub reviewer_id: Uuid,
    pub deadline: NaiveDateTime,
    pub comments: Option<String>,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub selections: Vec<SelectionInput>,
}

#[derive(Serialize)]
pub struct ReceivedReview {
    pub id: Uuid,
    pub reviewer_name: String,
    pub deadline: NaiveDateTime,
    pub comments: Option<String>,
    pub status: String,
    pub selections: Vec<SelectionInput>,
}

impl PeerReview {
    pub fn assign(
        conn: &PgConnection,
        input: AssignReviewInput,
        teacher_id: Uuid,
    ) -> Result<Self, ApiError> {
        conn.transaction::<PeerReview, ApiError, _>(|| {
            let submission = Submission::find(conn, input.submission_id)?;
            let assignment = Assignment::find(conn, submission.assignment_id)?;
            let class = Class::find(conn, assignment.class_id)?;

            if class.teacher_id != teacher_id {
                warn!("review assignment on submission {} rejected: {} does not teach class {}", submission.id, teacher_id, class.id);
                return Err(ApiError::new(404, "Submission not found".to_string()));
            }

            if !Class::is_member(conn, class.id, input.reviewer_id)? {
                return Err(ApiError::new(403, "Reviewer is not a member of this class".to_string()));
            }

            let review: PeerReview = diesel::insert_into(peer_reviews::table)
                .values(PeerReview {
                    id: Uuid::new_v4(),
                    submission_id: input.submission_id,
                    reviewer_id: input.reviewer_id,
                    deadline: input.deadline,
                    comments: None,
                    status: ReviewStatus::Pending.to_string(),
                    created_at: Utc::now().naive_utc(),
                })
                .get_result(conn)?;

            Notification::create(
                conn,
                input.reviewer_id,
                NotificationKind::PeerReviewAssigned,
                "You have been assigned a peer review".to_string(),
                format!("/peer-review/{}", review.id),
            )?;

            Ok(review)
        })
    }

    pub fn complete(
        conn: &PgConnection,
        id: Uuid,
        input: CompleteReviewInput,
        reviewer_id: Uuid,
    ) -> Result<Self, ApiError> {
        conn.transaction::<PeerReview, ApiError, _>(|| {
            let review: PeerReview = peer_reviews::table
                .filter(peer_reviews::id.eq(id))
                .first(conn)
                .optional()?
                .ok_or_else(|| ApiError::new(404, "Peer review not found".to_string()))?;

            if review.reviewer_id != reviewer_id {
                warn!("review {} completion rejected: {} is not the assigned reviewer", id, reviewer_id);
                return Err(ApiError::new(403, "You are not the assigned reviewer".to_string()));
            }

            let level_ids: Vec<Uuid> = input.selections.iter().map(|s| s.level_id).collect();
            let levels: Vec<Level> = if level_ids.is_empty() {
                Vec::new()
            } else {
                rubric_levels::table
                    .filter(rubric_levels::id.eq_any(&level_ids))
                    .load(conn)?
            };
            let criterion_by_level: HashMap<Uuid, Uuid> =
                levels.iter().map(|level| (level.id, level.criterion_id)).collect();
            validate_selections(&input.selections, &criterion_by_level)?;

            diesel::delete(
                peer_review_selections::table
                    .filter(peer_review_selections::peer_review_id.eq(id)),
            )
            .execute(conn)?;

            let rows: Vec<PeerReviewSelection> = input
                .selections
                .iter()
                .map(|selection| PeerReviewSelection {
                    id: Uuid::new_v4(),
                    peer_review_id: id,
                    criterion_id: selection.criterion_id,
                    level_id: selection.level_id,
                })
                .collect();

            if !rows.is_empty() {
                diesel::insert_into(peer_review_selections::table)
                    .values(&rows)
                    .execute(conn)?;
            }

            let review: PeerReview = diesel::update(peer_reviews::table.filter(peer_reviews::id.eq(id)))
                .set((
                    peer_reviews::comments.eq(&input.comments),
                    peer_reviews::status.eq(ReviewStatus::Completed.to_string()),
                ))
                .get_result(conn)?;

            let submission = Submission::find(conn, review.submission_id)?;
            let assignment = Assignment::find(conn, submission.assignment_id)?;
            let reviewer = User::find(conn, reviewer_id)?;

            Notification::create(
                conn,
                submission.student_id,
                NotificationKind::NewComment,
                format!("{} reviewed your submission", reviewer.full_name()),
                format!("/class/{}/assignment/{}", assignment.class_id, assignment.id),
            )?;

            Ok(review)
        })
    }

    /// Visible to the assigned reviewer, the reviewed student and the class teacher.
    pub fn detail(
        conn: &PgConnection,
        id: Uuid,
        requester: Uuid,
    ) -> Result<PeerReviewDetail, ApiError> {
        let review: PeerReview = peer_reviews::table
            .filter(peer_reviews::id.eq(id))
            .first(conn)
            .optional()?
            .ok_or_else(|| ApiError::new(404, "Peer review not found".to_string()))?;

        let submission = Submission::find(conn, review.submission_id)?;
        let assignment = Assignment::find(conn, submission.assignment_id)?;
        let class = Class::find(conn, assignment.class_id)?;

        let allowed = requester == review.reviewer_id
            || requester == submission.student_id
            || requester == class.teacher_id;
        if !allowed {
            warn!("review {} detail rejected for user {}", id, requester);
            return Err(ApiError::new(403, "You do not have access to this review".to_string()));
        }

        let selections = peer_review_selections::table
            .filter(peer_review_selections::peer_review_id.eq(id))
            .load::<PeerReviewSelection>(conn)?
            .into_iter()
            .map(|selection| SelectionInput {
                criterion_id: selection.criterion_id,
                level_id: selection.level_id,
            })
            .collect();

        Ok(PeerReviewDetail {
            id: review.id,
            submission_id: review.submission_id,
            reviewer_id: review.reviewer_id,
            deadline: review.deadline,
            comments: review.comments,
            status: review.status,
            created_at: review.created_at,
            selections,
        })
    }

    pub fn find_for_reviewer(conn: &PgConnection, reviewer_id: Uuid) -> Result<Vec<Self>, ApiError> {
        let reviews = peer_reviews::table
            .filter(peer_reviews::reviewer_id.eq(reviewer_id))
            .order(peer_reviews::created_at.desc())
            .load::<PeerReview>(conn)?;

        Ok(reviews)
    }

    pub fn find_all(conn: &PgConnection) -> Result<Vec<Self>, ApiError> {
        let reviews = peer_reviews::table
            .order(peer_reviews::created_at.desc())
            .load::<PeerReview>(conn)?;

        Ok(reviews)
    }

    pub fn received_for_submission(
        conn: &PgConnection,
        submission_id: Uuid,
    ) -> Result<Vec<ReceivedReview>, ApiError> {
        let rows: Vec<(PeerReview, User)> = peer_reviews::table
            .inner_join(users::table)
            .filter(peer_reviews::submission_id.eq(submission_id))
            .order(peer_reviews::created_at.desc())
            .load(conn)?;

        let review_ids: Vec<Uuid> = rows.iter().map(|(review, _)| review.id).collect();
        let selections: Vec<PeerReviewSelection> = if review_ids.is_empty() {
            Vec::new()
        } else {
            peer_review_selections::table
                .filter(peer_review_selections::peer_review_id.eq_any(&review_ids))
                .load(conn)?
        };

        let mut by_review: HashMap<Uuid, Vec<SelectionInput>> = HashMap::new();
        for selection in selections {
            by_review
                .entry(selection.peer_review_id)
                .or_default()
                .push(SelectionInput {
                    criterion_id: selection.criterion_id,
                    level_id: selection.level_id,
                });
        }

        Ok(rows
            .into_iter()
            .map(|(review, reviewer)| ReceivedReview {
                selections: by_review.remove(&review.id).unwrap_or_default(),
                id: review.id,
                reviewer_name: reviewer.full_name(),
                deadline: review.deadline,
                comments: review.comments,
                status: review.status,
            })
            .collect())
    }
}

/// Every selection must point at a known level of the claimed criterion.
pub fn validate_selections(
    selections: &[SelectionInput],
    criterion_by_level: &HashMap<Uuid, Uuid>,
) -> Result<(), ApiError> {
    for selection in selections {
        match criterion_by_level.get(&selection.level_id) {
            Some(criterion_id) if *criterion_id == selection.criterion_id => {}
            _ => {
                return Err(ApiError::new(
                    400,
                    "Selected level does not belong to the criterion".to_string(),
                ))
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_statuses_render_as_screaming_case() {
        assert_eq!(ReviewStatus::Pending.to_string(), "PENDING");
        assert_eq!(ReviewStatus::Completed.to_string(), "COMPLETED");
    }

    #[test]
    fn matching_selections_pass_validation() {
        let criterion_id = Uuid::new_v4();
        let level_id = Uuid::new_v4();
        let known: HashMap<Uuid, Uuid> = [(level_id, criterion_id)].into_iter().collect();

        let selections = [SelectionInput {
            criterion_id,
            level_id,
        }];

        assert!(validate_selections(&selections, &known).is_ok());
    }

    #[test]
    fn unknown_levels_are_rejected() {
        let selections = [SelectionInput {
            criterion_id: Uuid::new_v4(),
            level_id: Uuid::new_v4(),
        }];

        let error = validate_selections(&selections, &HashMap::new()).unwrap_err();
        assert_eq!(error.status_code, 400);
    }

    #[test]
    fn levels_of_a_different_criterion_are_rejected() {
        let level_id = Uuid::new_v4();
        let known: HashMap<Uuid, Uuid> = [(level_id, Uuid::new_v4())].into_iter().collect();

        let selections = [SelectionInput {
            criterion_id: Uuid::new_v4(),
            level_id,
        }];

        assert!(validate_selections(&selections, &known).is_err());
    }

    #[test]
    fn empty_selection_lists_are_allowed() {
        assert!(validate_selections(&[], &HashMap::new()).is_ok());
    }
}

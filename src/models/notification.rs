use crate::api_error::ApiError;
use crate::schema::notifications;
use chrono::{NaiveDateTime, Utc};
use derive_more::Display;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Display, PartialEq)]
pub enum NotificationKind {
    #[display(fmt = "NEW_ASSIGNMENT")]
    NewAssignment,
    #[display(fmt = "PEER_REVIEW_ASSIGNED")]
    PeerReviewAssigned,
    #[display(fmt = "NEW_COMMENT")]
    NewComment,
}

#[derive(Serialize, Deserialize, Queryable, Insertable)]
#[table_name = "notifications"]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub message: String,
    pub link: String,
    pub read: bool,
    pub created_at: NaiveDateTime,
}

impl Notification {
    pub fn build(user_id: Uuid, kind: NotificationKind, message: String, link: String) -> Self {
        Notification {
            id: Uuid::new_v4(),
            user_id,
            kind: kind.to_string(),
            message,
            link,
            read: false,
            created_at: Utc::now().naive_utc(),
        }
    }

    pub fn create(
        conn: &PgConnection,
        user_id: Uuid,
        kind: NotificationKind,
        message: String,
        link: String,
    ) -> Result<Self, ApiError> {
        let notification = diesel::insert_into(notifications::table)
            .values(Notification::build(user_id, kind, message, link))
            .get_result(conn)?;

        Ok(notification)
    }

    pub fn create_many(
        conn: &PgConnection,
        notifications: Vec<Notification>,
    ) -> Result<usize, ApiError> {
        if notifications.is_empty() {
            return Ok(0);
        }

        let inserted = diesel::insert_into(notifications::table)
            .values(&notifications)
            .execute(conn)?;

        Ok(inserted)
    }

    pub fn find_for_user(conn: &PgConnection, user_id: Uuid) -> Result<Vec<Self>, ApiError> {
        let notifications = notifications::table
            .filter(notifications::user_id.eq(user_id))
            .order(notifications::created_at.desc())
            .load::<Notification>(conn)?;

        Ok(notifications)
    }

    pub fn find_all(conn: &PgConnection) -> Result<Vec<Self>, ApiError> {
        let notifications = notifications::table
            .order(notifications::created_at.desc())
            .load::<Notification>(conn)?;

        Ok(notifications)
    }

    pub fn mark_read(conn: &PgConnection, id: Uuid, user_id: Uuid) -> Result<Self, ApiError> {
        let notification = diesel::update(
            notifications::table
                .filter(notifications::id.eq(id))
                .filter(notifications::user_id.eq(user_id)),
        )
        .set(notifications::read.eq(true))
        .get_result(conn)
        .optional()?;

        notification.ok_or_else(|| ApiError::new(404, "Notification not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_render_as_event_names() {
        assert_eq!(NotificationKind::NewAssignment.to_string(), "NEW_ASSIGNMENT");
        assert_eq!(
            NotificationKind::PeerReviewAssigned.to_string(),
            "PEER_REVIEW_ASSIGNED"
        );
        assert_eq!(NotificationKind::NewComment.to_string(), "NEW_COMMENT");
    }

    #[test]
    fn built_notifications_start_unread() {
        let user_id = Uuid::new_v4();
        let notification = Notification::build(
            user_id,
            NotificationKind::NewComment,
            "Someone reviewed your submission".to_string(),
            "/class/1/assignment/2".to_string(),
        );

        assert!(!notification.read);
        assert_eq!(notification.user_id, user_id);
        assert_eq!(notification.kind, "NEW_COMMENT");
    }
}

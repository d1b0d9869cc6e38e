use super::traits::ApprovalRepository;
use super::{SharedConnection, lock};
use crate::errors::ApiError;
use crate::models::{Approval, NewApproval};
use crate::schema::approvals;
use async_trait::async_trait;
use diesel::prelude::*;

#[derive(Clone)]
pub struct SqliteApprovalRepository {
    db: SharedConnection,
}

impl SqliteApprovalRepository {
    pub fn new(db: SharedConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ApprovalRepository for SqliteApprovalRepository {
    async fn upsert(&self, approval: &NewApproval) -> Result<Approval, ApiError> {
        let mut conn = lock(&self.db)?;
        let result = diesel::insert_into(approvals::table)
            .values(approval)
            .on_conflict(approvals::post_id)
            .do_update()
            .set((
                approvals::approved.eq(approval.approved),
                approvals::username.eq(&approval.username),
                approvals::approved_at.eq(approval.approved_at),
            ))
            .returning(Approval::as_returning())
            .get_result::<Approval>(&mut *conn)?;
        Ok(result)
    }

    async fn find_by_post_id(&self, post_id: i32) -> Result<Option<Approval>, ApiError> {
        let mut conn = lock(&self.db)?;
        let result = approvals::table
            .find(post_id)
            .select(Approval::as_select())
            .first::<Approval>(&mut *conn)
            .optional()?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewPost, PostStatus};
    use crate::repositories::{PostRepository, SqlitePostRepository};
    use crate::test_helpers::{establish_test_connection, test_utils};
    use chrono::{DateTime, Duration};
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_repeat_approval_overwrites_single_record() {
        let db = Arc::new(Mutex::new(establish_test_connection()));
        let posts = SqlitePostRepository::new(db.clone());
        let approvals = SqliteApprovalRepository::new(db.clone());

        let post = posts
            .create(&NewPost::new("Hello".to_string(), PostStatus::Publish).unwrap())
            .await
            .unwrap();

        let first_at = DateTime::from_timestamp(1_700_000_000, 0)
            .unwrap()
            .naive_utc();
        let second_at = first_at + Duration::seconds(30);

        approvals
            .upsert(&NewApproval::new(post.id, "alice", first_at).unwrap())
            .await
            .unwrap();
        let second = approvals
            .upsert(&NewApproval::new(post.id, "bob", second_at).unwrap())
            .await
            .unwrap();

        assert_eq!(second.username, "bob");
        assert_eq!(second.approved_at, second_at);

        {
            let mut conn = db.lock().unwrap();
            assert_eq!(test_utils::count_approvals(&mut conn), 1);
        }

        let stored = approvals.find_by_post_id(post.id).await.unwrap().unwrap();
        assert_eq!(stored, second);
        assert!(stored.approved);
    }

    #[tokio::test]
    async fn test_find_missing_approval() {
        let db = Arc::new(Mutex::new(establish_test_connection()));
        let approvals = SqliteApprovalRepository::new(db);
        assert!(approvals.find_by_post_id(1).await.unwrap().is_none());
    }
}

use super::traits::PostRepository;
use super::{SharedConnection, lock};
use crate::errors::ApiError;
use crate::models::{NewPost, Post, PostStatus};
use crate::schema::{approvals, posts};
use async_trait::async_trait;
use diesel::prelude::*;

#[derive(Clone)]
pub struct SqlitePostRepository {
    db: SharedConnection,
}

impl SqlitePostRepository {
    pub fn new(db: SharedConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PostRepository for SqlitePostRepository {
    async fn create(&self, post: &NewPost) -> Result<Post, ApiError> {
        let mut conn = lock(&self.db)?;
        let result = diesel::insert_into(posts::table)
            .values(post)
            .returning(Post::as_returning())
            .get_result::<Post>(&mut *conn)?;
        Ok(result)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Post>, ApiError> {
        let mut conn = lock(&self.db)?;
        let result = posts::table
            .find(id)
            .select(Post::as_select())
            .first::<Post>(&mut *conn)
            .optional()?;
        Ok(result)
    }

    async fn list_unapproved(&self, limit: u32) -> Result<Vec<Post>, ApiError> {
        let mut conn = lock(&self.db)?;
        let result = posts::table
            .left_join(approvals::table)
            .filter(approvals::post_id.is_null())
            .filter(posts::status.eq(PostStatus::Publish.as_str()))
            .order((posts::created_at.desc(), posts::id.desc()))
            .limit(i64::from(limit))
            .select(Post::as_select())
            .load::<Post>(&mut *conn)?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewApproval;
    use crate::test_helpers::{establish_test_connection, test_utils};
    use std::sync::{Arc, Mutex};

    fn repo() -> (SqlitePostRepository, SharedConnection) {
        let db = Arc::new(Mutex::new(establish_test_connection()));
        (SqlitePostRepository::new(db.clone()), db)
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let (repo, _db) = repo();
        let created = repo
            .create(&NewPost::new("Hello".to_string(), PostStatus::Publish).unwrap())
            .await
            .unwrap();

        let found = repo.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.title, "Hello");
        assert_eq!(found.status, "publish");
        assert!(repo.find_by_id(created.id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_unapproved_skips_drafts_and_approved() {
        let (repo, db) = repo();
        let mut ids = Vec::new();
        for title in ["one", "two", "three"] {
            let post = repo
                .create(&NewPost::new(title.to_string(), PostStatus::Publish).unwrap())
                .await
                .unwrap();
            ids.push(post.id);
        }
        repo.create(&NewPost::new("draft".to_string(), PostStatus::Draft).unwrap())
            .await
            .unwrap();

        {
            let mut conn = db.lock().unwrap();
            let approval =
                NewApproval::new(ids[1], "editor", chrono::Utc::now().naive_utc()).unwrap();
            test_utils::insert_approval(&mut conn, &approval);
        }

        let listed = repo.list_unapproved(10).await.unwrap();
        let listed_ids: Vec<i32> = listed.iter().map(|p| p.id).collect();
        assert_eq!(listed_ids, vec![ids[2], ids[0]]);
    }

    #[tokio::test]
    async fn test_list_unapproved_respects_limit() {
        let (repo, _db) = repo();
        for i in 0..5 {
            repo.create(&NewPost::new(format!("post {i}"), PostStatus::Publish).unwrap())
                .await
                .unwrap();
        }

        assert_eq!(repo.list_unapproved(3).await.unwrap().len(), 3);
        assert!(repo.list_unapproved(0).await.unwrap().is_empty());
    }
}

use crate::validation::{SiteUrl, ValidationError, validate_username};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Publish,
    Draft,
}

impl PostStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PostStatus::Publish => "publish",
            PostStatus::Draft => "draft",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::posts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Post {
    pub id: i32,
    pub title: String,
    pub status: String,
    pub created_at: NaiveDateTime,
}

impl Post {
    /// Default permalink form, `{site}/?p={id}`.
    pub fn permalink(&self, site: &SiteUrl) -> String {
        format!("{site}/?p={}", self.id)
    }

    pub fn to_remote(&self, site: &SiteUrl) -> RemotePost {
        RemotePost {
            id: self.id as u64,
            post_title: self.title.clone(),
            permalink: self.permalink(site),
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::posts)]
pub struct NewPost {
    pub title: String,
    pub status: String,
}

impl NewPost {
    pub fn new(title: String, status: PostStatus) -> Result<Self, ValidationError> {
        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }

        Ok(NewPost {
            title,
            status: status.as_str().to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::approvals)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Approval {
    #[serde(rename = "ID")]
    pub post_id: i32,
    pub approved: bool,
    pub username: String,
    pub approved_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::approvals)]
pub struct NewApproval {
    pub post_id: i32,
    pub approved: bool,
    pub username: String,
    pub approved_at: NaiveDateTime,
}

impl NewApproval {
    pub fn new(
        post_id: i32,
        username: &str,
        approved_at: NaiveDateTime,
    ) -> Result<Self, ValidationError> {
        let username = validate_username(username)?;

        Ok(NewApproval {
            post_id,
            approved: true,
            username: username.to_string(),
            approved_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::site_entries)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SiteEntry {
    pub position: i32,
    pub url: String,
}

/// Wire shape of one element of a `get_posts` feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePost {
    #[serde(rename = "ID")]
    pub id: u64,
    #[serde(default)]
    pub post_title: String,
    #[serde(default)]
    pub permalink: String,
}

/// A remote post tagged with the site it was fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedPost {
    pub post: RemotePost,
    pub website: SiteUrl,
}

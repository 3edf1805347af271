//! Likes on comments and follows on courses. Both are at most one per user
//! and object; a duplicate is a conflict and removing a missing one is not found.

use rocket::serde::{json::Json, Serialize};
use rocket_db_pools::Connection;
use sqlx::SqliteConnection;
use tracing::info;

use crate::auth::AuthenticatedUser;
use crate::error::{Error, Message, Result};
use crate::store::{self, Comment, Course, Follow, Like};
use crate::Db;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct LikeCount {
    pub like_count: i64,
}

/// Returns the comment's like count after the like is recorded.
pub async fn like_comment(
    user_id: i64,
    comment_id: i64,
    conn: &mut SqliteConnection,
) -> Result<i64> {
    Comment::find(comment_id, &mut *conn)
        .await?
        .ok_or_else(|| Error::not_found("Comment not found."))?;

    if Like::find(user_id, comment_id, &mut *conn).await?.is_some() {
        return Err(Error::conflict("Already liked."));
    }

    Like::insert(user_id, comment_id, &mut *conn)
        .await
        .map_err(|e| match e {
            Error::Conflict(_) => Error::conflict("Already liked."),
            e => e,
        })?;

    info!(user_id, comment_id, "comment liked");
    Like::count_for(comment_id, conn).await
}

pub async fn unlike_comment(
    user_id: i64,
    comment_id: i64,
    conn: &mut SqliteConnection,
) -> Result<i64> {
    let like = Like::find(user_id, comment_id, &mut *conn)
        .await?
        .ok_or_else(|| Error::not_found("Like not found."))?;

    Like::delete(like.id, &mut *conn).await?;

    info!(user_id, comment_id, "comment unliked");
    Like::count_for(comment_id, conn).await
}

pub async fn follow_course(
    user_id: i64,
    course_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Follow> {
    Course::find(course_id, &mut *conn)
        .await?
        .ok_or_else(|| Error::not_found("Course not found."))?;

    if Follow::find(user_id, course_id, &mut *conn).await?.is_some() {
        return Err(Error::conflict("Already following the course."));
    }

    let follow = Follow::insert(user_id, course_id, conn)
        .await
        .map_err(|e| match e {
            Error::Conflict(_) => Error::conflict("Already following the course."),
            e => e,
        })?;

    info!(user_id, course_id, "course followed");
    Ok(follow)
}

pub async fn unfollow_course(
    user_id: i64,
    course_id: i64,
    conn: &mut SqliteConnection,
) -> Result<()> {
    let follow = Follow::find(user_id, course_id, &mut *conn)
        .await?
        .ok_or_else(|| Error::not_found("Follow not found."))?;

    Follow::delete(follow.id, conn).await?;

    info!(user_id, course_id, "course unfollowed");
    Ok(())
}

#[post("/likes/comments/<comment_id>")]
pub async fn like(
    mut db: Connection<Db>,
    user: AuthenticatedUser,
    comment_id: i64,
) -> Result<Json<LikeCount>> {
    let mut tx = store::begin(&mut db).await?;
    let like_count = like_comment(user.id(), comment_id, &mut tx).await?;
    tx.commit().await?;
    Ok(Json(LikeCount { like_count }))
}

#[delete("/likes/comments/<comment_id>")]
pub async fn unlike(
    mut db: Connection<Db>,
    user: AuthenticatedUser,
    comment_id: i64,
) -> Result<Json<LikeCount>> {
    let mut tx = store::begin(&mut db).await?;
    let like_count = unlike_comment(user.id(), comment_id, &mut tx).await?;
    tx.commit().await?;
    Ok(Json(LikeCount { like_count }))
}

#[post("/follows/courses/<course_id>")]
pub async fn follow(
    mut db: Connection<Db>,
    user: AuthenticatedUser,
    course_id: i64,
) -> Result<Json<Message>> {
    let mut tx = store::begin(&mut db).await?;
    follow_course(user.id(), course_id, &mut tx).await?;
    tx.commit().await?;
    Ok(Message::new("Course followed successfully."))
}

#[delete("/follows/courses/<course_id>")]
pub async fn unfollow(
    mut db: Connection<Db>,
    user: AuthenticatedUser,
    course_id: i64,
) -> Result<Json<Message>> {
    let mut tx = store::begin(&mut db).await?;
    unfollow_course(user.id(), course_id, &mut tx).await?;
    tx.commit().await?;
    Ok(Message::new("Course unfollowed successfully."))
}

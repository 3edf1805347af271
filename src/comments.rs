//! Threaded comments on a course or a course/instructor pairing.
//!
//! Threads are returned one level deep: each top-level comment carries its
//! direct replies. Deeper replies are stored but never surfaced in a thread.

use indexmap::IndexMap;
use rocket::response::status::Created;
use rocket::serde::{json::Json, Deserialize, Serialize};
use rocket_db_pools::Connection;
use sqlx::SqliteConnection;
use tracing::{debug, info};

use crate::auth::AuthenticatedUser;
use crate::error::{Error, Result};
use crate::store::{self, AttachmentTarget, Comment, NewComment, TargetSelector};
use crate::Db;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: Comment,
    pub sub_comments: Vec<Comment>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct PostComment {
    #[serde(flatten)]
    pub target: TargetSelector,
    #[serde(default)]
    pub parent_comment_id: Option<i64>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Groups replies under their roots. Both inputs are expected in creation
/// order; replies whose parent is not among `roots` are dropped.
pub fn assemble_threads(roots: Vec<Comment>, replies: Vec<Comment>) -> Vec<CommentThread> {
    let mut arena: IndexMap<i64, CommentThread> = roots
        .into_iter()
        .map(|comment| {
            (
                comment.id,
                CommentThread {
                    comment,
                    sub_comments: Vec::new(),
                },
            )
        })
        .collect();

    for reply in replies {
        if let Some(thread) = reply
            .parent_comment_id
            .and_then(|parent| arena.get_mut(&parent))
        {
            thread.sub_comments.push(reply);
        }
    }

    arena.into_values().collect()
}

pub async fn list_threads(
    target: AttachmentTarget,
    conn: &mut SqliteConnection,
) -> Result<Vec<CommentThread>> {
    let target = target.ensure_exists(&mut *conn).await?;

    let roots = Comment::roots_of(target, &mut *conn).await?;
    let replies = Comment::replies_to_roots_of(target, conn).await?;

    debug!(?target, roots = roots.len(), replies = replies.len(), "loaded comment threads");
    Ok(assemble_threads(roots, replies))
}

pub async fn post_comment(
    user_id: i64,
    request: &PostComment,
    conn: &mut SqliteConnection,
) -> Result<Comment> {
    // Blank means empty after trimming; the text itself is stored as sent.
    let content = request
        .content
        .as_deref()
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| Error::validation("Content is required."))?;

    let target = request.target.resolve()?;

    // The parent may live on any target; it only has to exist.
    if let Some(parent_id) = request.parent_comment_id {
        Comment::find(parent_id, &mut *conn)
            .await?
            .ok_or_else(|| Error::not_found("Parent comment not found."))?;
    }

    let target = target.ensure_exists(&mut *conn).await?;

    let comment = NewComment {
        user_id,
        target,
        parent_comment_id: request.parent_comment_id,
        content,
    }
    .insert(conn)
    .await?;

    info!(user_id, comment_id = comment.id, ?target, "comment posted");
    Ok(comment)
}

#[post("/comments", data = "<request>")]
pub async fn create(
    mut db: Connection<Db>,
    user: AuthenticatedUser,
    request: Json<PostComment>,
) -> Result<Created<Json<Comment>>> {
    let mut tx = store::begin(&mut db).await?;
    let comment = post_comment(user.id(), &request, &mut tx).await?;
    tx.commit().await?;

    Ok(Created::new(format!("/v1/api/comments/{}", comment.id)).body(Json(comment)))
}

#[get("/comments/courses/<course_id>")]
pub async fn course_threads(
    mut db: Connection<Db>,
    course_id: i64,
) -> Result<Json<Vec<CommentThread>>> {
    let mut tx = store::begin(&mut db).await?;
    let threads = list_threads(AttachmentTarget::Course(course_id), &mut tx).await?;
    tx.commit().await?;
    Ok(Json(threads))
}

#[get("/comments/courses/<course_id>/instructors/<instructor_id>?<semester>")]
pub async fn pairing_threads(
    mut db: Connection<Db>,
    course_id: i64,
    instructor_id: i64,
    semester: Option<String>,
) -> Result<Json<Vec<CommentThread>>> {
    let mut tx = store::begin(&mut db).await?;
    let target =
        AttachmentTarget::pairing(course_id, instructor_id, semester.as_deref(), &mut tx).await?;
    let threads = list_threads(target, &mut tx).await?;
    tx.commit().await?;
    Ok(Json(threads))
}

//! Per-dimension score summaries for a course or a course/instructor pairing.
//!
//! Every rating dimension is always listed, in identifier order, so clients can
//! render a stable set of axes. A dimension nobody rated reports `null`, never zero.

use rocket::serde::{json::Json, Serialize};
use rocket_db_pools::Connection;
use sqlx::{Row, SqliteConnection};
use tracing::debug;

use crate::auth::AuthenticatedUser;
use crate::error::Result;
use crate::store::{self, AttachmentTarget, TargetSelector};
use crate::Db;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct DimensionAverage {
    pub dimension_id: i64,
    pub dimension_name: String,
    pub average_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct DimensionScore {
    pub dimension_id: i64,
    pub dimension_name: String,
    pub score: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct TargetAverages {
    #[serde(flatten)]
    pub target: TargetSelector,
    pub ratings: Vec<DimensionAverage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct TargetScores {
    #[serde(flatten)]
    pub target: TargetSelector,
    pub ratings: Vec<DimensionScore>,
}

/// Rounds half away from zero to two decimals.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub async fn average_scores(
    target: AttachmentTarget,
    conn: &mut SqliteConnection,
) -> Result<TargetAverages> {
    let target = target.ensure_exists(&mut *conn).await?;

    let sql = format!(
        "SELECT d.id AS dimension_id, d.name AS dimension_name, AVG(r.score) AS average_score \
         FROM rating_dimensions d \
         LEFT JOIN ratings r ON r.rating_dimension_id = d.id AND r.{} = $1 \
         GROUP BY d.id, d.name \
         ORDER BY d.id",
        target.column()
    );
    let rows = sqlx::query(&sql).bind(target.id()).fetch_all(conn).await?;

    let ratings = rows
        .into_iter()
        .map(|r| DimensionAverage {
            dimension_id: r.get("dimension_id"),
            dimension_name: r.get("dimension_name"),
            average_score: r.get::<Option<f64>, _>("average_score").map(round2),
        })
        .collect::<Vec<_>>();

    debug!(?target, dimensions = ratings.len(), "computed average scores");
    Ok(TargetAverages {
        target: target.into(),
        ratings,
    })
}

pub async fn my_scores(
    user_id: i64,
    target: AttachmentTarget,
    conn: &mut SqliteConnection,
) -> Result<TargetScores> {
    let target = target.ensure_exists(&mut *conn).await?;

    let sql = format!(
        "SELECT d.id AS dimension_id, d.name AS dimension_name, r.score AS score \
         FROM rating_dimensions d \
         LEFT JOIN ratings r ON r.rating_dimension_id = d.id AND r.user_id = $1 AND r.{} = $2 \
         ORDER BY d.id",
        target.column()
    );
    let rows = sqlx::query(&sql)
        .bind(user_id)
        .bind(target.id())
        .fetch_all(conn)
        .await?;

    let ratings = rows
        .into_iter()
        .map(|r| DimensionScore {
            dimension_id: r.get("dimension_id"),
            dimension_name: r.get("dimension_name"),
            score: r.get("score"),
        })
        .collect();

    Ok(TargetScores {
        target: target.into(),
        ratings,
    })
}

#[get("/ratings/courses/<course_id>")]
pub async fn course_averages(
    mut db: Connection<Db>,
    course_id: i64,
) -> Result<Json<TargetAverages>> {
    let mut tx = store::begin(&mut db).await?;
    let averages = average_scores(AttachmentTarget::Course(course_id), &mut tx).await?;
    tx.commit().await?;
    Ok(Json(averages))
}

#[get("/ratings/courses/<course_id>/instructors/<instructor_id>?<semester>")]
pub async fn pairing_averages(
    mut db: Connection<Db>,
    course_id: i64,
    instructor_id: i64,
    semester: Option<String>,
) -> Result<Json<TargetAverages>> {
    let mut tx = store::begin(&mut db).await?;
    let target =
        AttachmentTarget::pairing(course_id, instructor_id, semester.as_deref(), &mut tx).await?;
    let averages = average_scores(target, &mut tx).await?;
    tx.commit().await?;
    Ok(Json(averages))
}

#[get("/ratings/course-instructors/<course_instructor_id>")]
pub async fn course_instructor_averages(
    mut db: Connection<Db>,
    course_instructor_id: i64,
) -> Result<Json<TargetAverages>> {
    let mut tx = store::begin(&mut db).await?;
    let target = AttachmentTarget::CourseInstructor(course_instructor_id);
    let averages = average_scores(target, &mut tx).await?;
    tx.commit().await?;
    Ok(Json(averages))
}

#[get("/ratings/my-ratings?<selector..>")]
pub async fn my_ratings(
    mut db: Connection<Db>,
    user: AuthenticatedUser,
    selector: TargetSelector,
) -> Result<Json<TargetScores>> {
    let target = selector.resolve()?;
    let mut tx = store::begin(&mut db).await?;
    let scores = my_scores(user.id(), target, &mut tx).await?;
    tx.commit().await?;
    Ok(Json(scores))
}

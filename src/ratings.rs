//! Batch rating submission.
//!
//! A batch is checked in full before anything is written: the target selector
//! first, then every entry's shape, then the target and each dimension's
//! existence. Only then is each entry written, in order, inside the caller's
//! transaction. Every entry looks up the rating as it stands at that point, so
//! a dimension named twice in one batch keeps its last score. A constraint
//! failure while writing turns the whole batch into a [`Error::Submission`]
//! and the transaction is dropped.

use rocket::response::status::Created;
use rocket::serde::{
    json::{Json, Value},
    Deserialize, Serialize,
};
use rocket_db_pools::Connection;
use sqlx::SqliteConnection;
use tracing::{info, warn};

use crate::auth::AuthenticatedUser;
use crate::error::{Error, Result};
use crate::store::{self, AttachmentTarget, Rating, RatingDimension, TargetSelector};
use crate::Db;

pub const MIN_SCORE: i64 = 1;
pub const MAX_SCORE: i64 = 5;

/// One entry of a batch as received. Fields stay loosely typed so a missing
/// or mistyped value is reported as a validation error rather than a body
/// parse failure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct RatingInput {
    #[serde(default)]
    pub rating_dimension_id: Option<Value>,
    #[serde(default)]
    pub score: Option<Value>,
}

impl RatingInput {
    pub fn new(rating_dimension_id: i64, score: i64) -> Self {
        RatingInput {
            rating_dimension_id: Some(rating_dimension_id.into()),
            score: Some(score.into()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct RatingSubmission {
    #[serde(flatten)]
    pub target: TargetSelector,
    #[serde(default)]
    pub ratings: Option<Vec<RatingInput>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct SubmissionReceipt {
    pub message: String,
    pub created: usize,
    pub updated: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ValidEntry {
    rating_dimension_id: i64,
    score: i32,
}

/// Shape check for the whole batch; the first malformed entry rejects it.
fn validate_entries(inputs: &[RatingInput]) -> Result<Vec<ValidEntry>> {
    if inputs.is_empty() {
        return Err(Error::validation("Ratings must be a list of rating inputs."));
    }

    inputs
        .iter()
        .map(|input| {
            let rating_dimension_id = input.rating_dimension_id.as_ref().and_then(Value::as_i64);
            let score = input.score.as_ref().and_then(Value::as_i64);
            match (rating_dimension_id, score) {
                (Some(rating_dimension_id), Some(score)) => {
                    if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
                        return Err(Error::validation("Score must be between 1 and 5."));
                    }
                    Ok(ValidEntry {
                        rating_dimension_id,
                        score: score as i32,
                    })
                }
                _ => Err(Error::validation(
                    "Each rating must have an integer rating_dimension_id and score.",
                )),
            }
        })
        .collect()
}

pub async fn submit_ratings(
    user_id: i64,
    submission: &RatingSubmission,
    conn: &mut SqliteConnection,
) -> Result<SubmissionReceipt> {
    let target = submission.target.resolve()?;
    let inputs = submission
        .ratings
        .as_deref()
        .ok_or_else(|| Error::validation("Ratings must be a list of rating inputs."))?;
    let entries = validate_entries(inputs)?;

    let target = target.ensure_exists(&mut *conn).await?;

    for entry in &entries {
        if RatingDimension::find(entry.rating_dimension_id, &mut *conn).await?.is_none() {
            return Err(Error::not_found(format!(
                "Rating dimension {} not found.",
                entry.rating_dimension_id
            )));
        }
    }

    let mut created = 0;
    let mut updated = 0;
    for entry in entries {
        let written = match write_entry(user_id, target, entry, &mut *conn).await {
            Ok(written) => written,
            Err(e) => {
                warn!(user_id, ?target, error = %e, "rating batch rejected by storage");
                return Err(Error::Submission("Failed to submit ratings.".to_string()));
            }
        };
        match written {
            Written::Created => created += 1,
            Written::Updated => updated += 1,
        }
    }

    info!(user_id, ?target, created, updated, "ratings submitted");
    Ok(SubmissionReceipt {
        message: "Ratings submitted successfully.".to_string(),
        created,
        updated,
    })
}

enum Written {
    Created,
    Updated,
}

/// Upserts one entry against the rating as it stands now, so an earlier entry
/// of the same batch is seen and overwritten.
async fn write_entry(
    user_id: i64,
    target: AttachmentTarget,
    entry: ValidEntry,
    conn: &mut SqliteConnection,
) -> Result<Written> {
    let existing = Rating::find_for(user_id, entry.rating_dimension_id, target, &mut *conn).await?;
    match existing {
        Some(rating) => {
            Rating::update_score(rating.id, entry.score, conn).await?;
            Ok(Written::Updated)
        }
        None => {
            Rating::insert(user_id, entry.rating_dimension_id, target, entry.score, conn).await?;
            Ok(Written::Created)
        }
    }
}

#[post("/ratings", data = "<submission>")]
pub async fn submit(
    mut db: Connection<Db>,
    user: AuthenticatedUser,
    submission: Json<RatingSubmission>,
) -> Result<Created<Json<SubmissionReceipt>>> {
    let mut tx = store::begin(&mut db).await?;
    let receipt = submit_ratings(user.id(), &submission, &mut tx).await?;
    tx.commit()
        .await
        .map_err(|_| Error::Submission("Failed to submit ratings.".to_string()))?;

    Ok(Created::new("/v1/api/ratings").body(Json(receipt)))
}

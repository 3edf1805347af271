use chrono::NaiveDateTime;
use rocket::serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::target::AttachmentTarget;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub created_at: NaiveDateTime,
}

impl From<SqliteRow> for User {
    fn from(r: SqliteRow) -> Self {
        Self {
            id: r.get("id"),
            email: r.get("email"),
            password_hash: r.get("password_hash"),
            name: r.get("name"),
            created_at: r.get("created_at"),
        }
    }
}

impl User {
    pub async fn find(id: i64, conn: &mut SqliteConnection) -> Result<Option<Self>> {
        let user = sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(user.map(Self::from))
    }

    pub async fn find_by_email(email: &str, conn: &mut SqliteConnection) -> Result<Option<Self>> {
        let user = sqlx::query("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(conn)
            .await?;
        Ok(user.map(Self::from))
    }

    pub async fn find_by_name(name: &str, conn: &mut SqliteConnection) -> Result<Option<Self>> {
        let user = sqlx::query("SELECT * FROM users WHERE name = $1")
            .bind(name)
            .fetch_optional(conn)
            .await?;
        Ok(user.map(Self::from))
    }
}

#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub name: &'a str,
}

impl NewUser<'_> {
    pub async fn insert(&self, conn: &mut SqliteConnection) -> Result<User> {
        sqlx::query(
            "INSERT INTO users (email, password_hash, name) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(self.email)
        .bind(self.password_hash)
        .bind(self.name)
        .fetch_one(conn)
        .await
        .map(User::from)
        .map_err(|e| Error::from_constraint(e, "User"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct Course {
    pub id: i64,
    pub course_code: String,
    pub name: String,
    pub unit: i32,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
}

impl From<SqliteRow> for Course {
    fn from(r: SqliteRow) -> Self {
        Self {
            id: r.get("id"),
            course_code: r.get("course_code"),
            name: r.get("name"),
            unit: r.get("unit"),
            description: r.get("description"),
            created_at: r.get("created_at"),
        }
    }
}

impl Course {
    pub async fn find(id: i64, conn: &mut SqliteConnection) -> Result<Option<Self>> {
        let course = sqlx::query("SELECT * FROM courses WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(course.map(Self::from))
    }

    pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Self>> {
        let rows = sqlx::query("SELECT * FROM courses ORDER BY id")
            .fetch_all(conn)
            .await?;
        Ok(rows.into_iter().map(Self::from).collect())
    }

    /// Case-insensitive substring match against code, name and description.
    pub async fn search(keyword: &str, conn: &mut SqliteConnection) -> Result<Vec<Self>> {
        let pattern = format!("%{}%", keyword.to_lowercase());
        let rows = sqlx::query(
            "SELECT * FROM courses \
             WHERE lower(name) LIKE $1 OR lower(course_code) LIKE $1 OR lower(description) LIKE $1 \
             ORDER BY id",
        )
        .bind(pattern)
        .fetch_all(conn)
        .await?;
        Ok(rows.into_iter().map(Self::from).collect())
    }

    /// Courses the user follows, in follow order.
    pub async fn followed_by(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Self>> {
        let rows = sqlx::query(
            "SELECT c.* FROM follows f JOIN courses c ON c.id = f.course_id \
             WHERE f.user_id = $1 ORDER BY f.id",
        )
        .bind(user_id)
        .fetch_all(conn)
        .await?;
        Ok(rows.into_iter().map(Self::from).collect())
    }

    /// Removes the course; pairings, ratings, comments, likes and follows go with it.
    pub async fn delete(id: i64, conn: &mut SqliteConnection) -> Result<u64> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone)]
pub struct NewCourse<'a> {
    pub course_code: &'a str,
    pub name: &'a str,
    pub unit: i32,
    pub description: Option<&'a str>,
}

impl NewCourse<'_> {
    pub async fn insert(&self, conn: &mut SqliteConnection) -> Result<Course> {
        sqlx::query(
            "INSERT INTO courses (course_code, name, unit, description) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(self.course_code)
        .bind(self.name)
        .bind(self.unit)
        .bind(self.description)
        .fetch_one(conn)
        .await
        .map(Course::from)
        .map_err(|e| Error::from_constraint(e, "Course"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct Instructor {
    pub id: i64,
    pub name: String,
    pub profile_url: Option<String>,
    pub created_at: NaiveDateTime,
}

impl From<SqliteRow> for Instructor {
    fn from(r: SqliteRow) -> Self {
        Self {
            id: r.get("id"),
            name: r.get("name"),
            profile_url: r.get("profile_url"),
            created_at: r.get("created_at"),
        }
    }
}

impl Instructor {
    pub async fn find(id: i64, conn: &mut SqliteConnection) -> Result<Option<Self>> {
        let instructor = sqlx::query("SELECT * FROM instructors WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(instructor.map(Self::from))
    }
}

#[derive(Debug, Clone)]
pub struct NewInstructor<'a> {
    pub name: &'a str,
    pub profile_url: Option<&'a str>,
}

impl NewInstructor<'_> {
    pub async fn insert(&self, conn: &mut SqliteConnection) -> Result<Instructor> {
        sqlx::query("INSERT INTO instructors (name, profile_url) VALUES ($1, $2) RETURNING *")
            .bind(self.name)
            .bind(self.profile_url)
            .fetch_one(conn)
            .await
            .map(Instructor::from)
            .map_err(|e| Error::from_constraint(e, "Instructor"))
    }
}

/// One offering of a course by an instructor in a given semester.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct CourseInstructor {
    pub id: i64,
    pub course_id: i64,
    pub instructor_id: i64,
    pub semester: String,
    pub created_at: NaiveDateTime,
}

impl From<SqliteRow> for CourseInstructor {
    fn from(r: SqliteRow) -> Self {
        Self {
            id: r.get("id"),
            course_id: r.get("course_id"),
            instructor_id: r.get("instructor_id"),
            semester: r.get("semester"),
            created_at: r.get("created_at"),
        }
    }
}

/// An instructor as listed on a course page, tagged with the pairing it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct PairedInstructor {
    pub course_instructor_id: i64,
    pub semester: String,
    #[serde(flatten)]
    pub instructor: Instructor,
}

/// A course as listed on an instructor page, tagged with the pairing it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct PairedCourse {
    pub course_instructor_id: i64,
    pub semester: String,
    #[serde(flatten)]
    pub course: Course,
}

impl CourseInstructor {
    pub async fn assign(
        course_id: i64,
        instructor_id: i64,
        semester: &str,
        conn: &mut SqliteConnection,
    ) -> Result<Self> {
        sqlx::query(
            "INSERT INTO course_instructors (course_id, instructor_id, semester) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(course_id)
        .bind(instructor_id)
        .bind(semester)
        .fetch_one(conn)
        .await
        .map(Self::from)
        .map_err(|e| Error::from_constraint(e, "Course-Instructor pair"))
    }

    pub async fn find(id: i64, conn: &mut SqliteConnection) -> Result<Option<Self>> {
        let pairing = sqlx::query("SELECT * FROM course_instructors WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(pairing.map(Self::from))
    }

    /// Looks a pairing up by its natural key. Without a semester the earliest
    /// pairing of the two is returned.
    pub async fn find_pairing(
        course_id: i64,
        instructor_id: i64,
        semester: Option<&str>,
        conn: &mut SqliteConnection,
    ) -> Result<Option<Self>> {
        let pairing = sqlx::query(
            "SELECT * FROM course_instructors \
             WHERE course_id = $1 AND instructor_id = $2 AND ($3 IS NULL OR semester = $3) \
             ORDER BY id LIMIT 1",
        )
        .bind(course_id)
        .bind(instructor_id)
        .bind(semester)
        .fetch_optional(conn)
        .await?;
        Ok(pairing.map(Self::from))
    }

    pub async fn instructors_of(
        course_id: i64,
        conn: &mut SqliteConnection,
    ) -> Result<Vec<PairedInstructor>> {
        let rows = sqlx::query(
            "SELECT ci.id AS course_instructor_id, ci.semester, i.* \
             FROM course_instructors ci JOIN instructors i ON i.id = ci.instructor_id \
             WHERE ci.course_id = $1 ORDER BY ci.id",
        )
        .bind(course_id)
        .fetch_all(conn)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| PairedInstructor {
                course_instructor_id: r.get("course_instructor_id"),
                semester: r.get("semester"),
                instructor: Instructor::from(r),
            })
            .collect())
    }

    pub async fn courses_of(
        instructor_id: i64,
        conn: &mut SqliteConnection,
    ) -> Result<Vec<PairedCourse>> {
        let rows = sqlx::query(
            "SELECT ci.id AS course_instructor_id, ci.semester, c.* \
             FROM course_instructors ci JOIN courses c ON c.id = ci.course_id \
             WHERE ci.instructor_id = $1 ORDER BY ci.id",
        )
        .bind(instructor_id)
        .fetch_all(conn)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| PairedCourse {
                course_instructor_id: r.get("course_instructor_id"),
                semester: r.get("semester"),
                course: Course::from(r),
            })
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct RatingDimension {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
}

impl From<SqliteRow> for RatingDimension {
    fn from(r: SqliteRow) -> Self {
        Self {
            id: r.get("id"),
            name: r.get("name"),
            description: r.get("description"),
            created_at: r.get("created_at"),
        }
    }
}

impl RatingDimension {
    pub async fn insert(
        name: &str,
        description: Option<&str>,
        conn: &mut SqliteConnection,
    ) -> Result<Self> {
        sqlx::query("INSERT INTO rating_dimensions (name, description) VALUES ($1, $2) RETURNING *")
            .bind(name)
            .bind(description)
            .fetch_one(conn)
            .await
            .map(Self::from)
            .map_err(|e| Error::from_constraint(e, "Rating dimension"))
    }

    pub async fn find(id: i64, conn: &mut SqliteConnection) -> Result<Option<Self>> {
        let dimension = sqlx::query("SELECT * FROM rating_dimensions WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(dimension.map(Self::from))
    }

    /// Every dimension, in identifier order.
    pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Self>> {
        let rows = sqlx::query("SELECT * FROM rating_dimensions ORDER BY id")
            .fetch_all(conn)
            .await?;
        Ok(rows.into_iter().map(Self::from).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct Rating {
    pub id: i64,
    pub user_id: i64,
    pub course_id: Option<i64>,
    pub course_instructor_id: Option<i64>,
    pub rating_dimension_id: i64,
    pub score: i32,
    pub created_at: NaiveDateTime,
}

impl From<SqliteRow> for Rating {
    fn from(r: SqliteRow) -> Self {
        Self {
            id: r.get("id"),
            user_id: r.get("user_id"),
            course_id: r.get("course_id"),
            course_instructor_id: r.get("course_instructor_id"),
            rating_dimension_id: r.get("rating_dimension_id"),
            score: r.get("score"),
            created_at: r.get("created_at"),
        }
    }
}

impl Rating {
    /// The user's rating of one dimension on one target, if any.
    pub async fn find_for(
        user_id: i64,
        rating_dimension_id: i64,
        target: AttachmentTarget,
        conn: &mut SqliteConnection,
    ) -> Result<Option<Self>> {
        let sql = format!(
            "SELECT * FROM ratings WHERE user_id = $1 AND rating_dimension_id = $2 AND {} = $3",
            target.column()
        );
        let rating = sqlx::query(&sql)
            .bind(user_id)
            .bind(rating_dimension_id)
            .bind(target.id())
            .fetch_optional(conn)
            .await?;
        Ok(rating.map(Self::from))
    }

    pub async fn for_target(
        target: AttachmentTarget,
        conn: &mut SqliteConnection,
    ) -> Result<Vec<Self>> {
        let sql = format!("SELECT * FROM ratings WHERE {} = $1 ORDER BY id", target.column());
        let rows = sqlx::query(&sql).bind(target.id()).fetch_all(conn).await?;
        Ok(rows.into_iter().map(Self::from).collect())
    }

    /// Raw insert; constraint failures come back as `sqlx::Error` so a batch
    /// can decide how to report them.
    pub(crate) async fn insert(
        user_id: i64,
        rating_dimension_id: i64,
        target: AttachmentTarget,
        score: i32,
        conn: &mut SqliteConnection,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query(
            "INSERT INTO ratings (user_id, course_id, course_instructor_id, rating_dimension_id, score) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(user_id)
        .bind(target.course_id())
        .bind(target.course_instructor_id())
        .bind(rating_dimension_id)
        .bind(score)
        .fetch_one(conn)
        .await
        .map(Self::from)
    }

    /// Overwrites the score in place; identity and `created_at` are untouched.
    pub(crate) async fn update_score(
        id: i64,
        score: i32,
        conn: &mut SqliteConnection,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query("UPDATE ratings SET score = $1 WHERE id = $2 RETURNING *")
            .bind(score)
            .bind(id)
            .fetch_one(conn)
            .await
            .map(Self::from)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct Comment {
    pub id: i64,
    pub user_id: i64,
    pub course_id: Option<i64>,
    pub course_instructor_id: Option<i64>,
    pub parent_comment_id: Option<i64>,
    pub content: String,
    pub created_at: NaiveDateTime,
}

impl From<SqliteRow> for Comment {
    fn from(r: SqliteRow) -> Self {
        Self {
            id: r.get("id"),
            user_id: r.get("user_id"),
            course_id: r.get("course_id"),
            course_instructor_id: r.get("course_instructor_id"),
            parent_comment_id: r.get("parent_comment_id"),
            content: r.get("content"),
            created_at: r.get("created_at"),
        }
    }
}

impl Comment {
    pub async fn find(id: i64, conn: &mut SqliteConnection) -> Result<Option<Self>> {
        let comment = sqlx::query("SELECT * FROM comments WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(comment.map(Self::from))
    }

    /// Top-level comments on the target, in creation order.
    pub async fn roots_of(
        target: AttachmentTarget,
        conn: &mut SqliteConnection,
    ) -> Result<Vec<Self>> {
        let sql = format!(
            "SELECT * FROM comments WHERE {} = $1 AND parent_comment_id IS NULL ORDER BY id",
            target.column()
        );
        let rows = sqlx::query(&sql).bind(target.id()).fetch_all(conn).await?;
        Ok(rows.into_iter().map(Self::from).collect())
    }

    /// Direct replies to the target's top-level comments, in creation order.
    /// Replies are matched by parent only, so a reply filed elsewhere still shows up.
    pub async fn replies_to_roots_of(
        target: AttachmentTarget,
        conn: &mut SqliteConnection,
    ) -> Result<Vec<Self>> {
        let sql = format!(
            "SELECT * FROM comments WHERE parent_comment_id IN \
             (SELECT id FROM comments WHERE {} = $1 AND parent_comment_id IS NULL) \
             ORDER BY id",
            target.column()
        );
        let rows = sqlx::query(&sql).bind(target.id()).fetch_all(conn).await?;
        Ok(rows.into_iter().map(Self::from).collect())
    }

    pub async fn delete(id: i64, conn: &mut SqliteConnection) -> Result<u64> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone)]
pub struct NewComment<'a> {
    pub user_id: i64,
    pub target: AttachmentTarget,
    pub parent_comment_id: Option<i64>,
    pub content: &'a str,
}

impl NewComment<'_> {
    pub async fn insert(&self, conn: &mut SqliteConnection) -> Result<Comment> {
        sqlx::query(
            "INSERT INTO comments (user_id, course_id, course_instructor_id, parent_comment_id, content) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(self.user_id)
        .bind(self.target.course_id())
        .bind(self.target.course_instructor_id())
        .bind(self.parent_comment_id)
        .bind(self.content)
        .fetch_one(conn)
        .await
        .map(Comment::from)
        .map_err(|e| Error::from_constraint(e, "Comment"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct Like {
    pub id: i64,
    pub user_id: i64,
    pub comment_id: i64,
    pub created_at: NaiveDateTime,
}

impl From<SqliteRow> for Like {
    fn from(r: SqliteRow) -> Self {
        Self {
            id: r.get("id"),
            user_id: r.get("user_id"),
            comment_id: r.get("comment_id"),
            created_at: r.get("created_at"),
        }
    }
}

impl Like {
    pub async fn find(
        user_id: i64,
        comment_id: i64,
        conn: &mut SqliteConnection,
    ) -> Result<Option<Self>> {
        let like = sqlx::query("SELECT * FROM likes WHERE user_id = $1 AND comment_id = $2")
            .bind(user_id)
            .bind(comment_id)
            .fetch_optional(conn)
            .await?;
        Ok(like.map(Self::from))
    }

    pub async fn insert(
        user_id: i64,
        comment_id: i64,
        conn: &mut SqliteConnection,
    ) -> Result<Self> {
        sqlx::query("INSERT INTO likes (user_id, comment_id) VALUES ($1, $2) RETURNING *")
            .bind(user_id)
            .bind(comment_id)
            .fetch_one(conn)
            .await
            .map(Self::from)
            .map_err(|e| Error::from_constraint(e, "Like"))
    }

    pub async fn delete(id: i64, conn: &mut SqliteConnection) -> Result<u64> {
        let result = sqlx::query("DELETE FROM likes WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count_for(comment_id: i64, conn: &mut SqliteConnection) -> Result<i64> {
        let count = sqlx::query("SELECT COUNT(*) AS like_count FROM likes WHERE comment_id = $1")
            .bind(comment_id)
            .fetch_one(conn)
            .await?
            .get("like_count");
        Ok(count)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct Follow {
    pub id: i64,
    pub user_id: i64,
    pub course_id: i64,
    pub created_at: NaiveDateTime,
}

impl From<SqliteRow> for Follow {
    fn from(r: SqliteRow) -> Self {
        Self {
            id: r.get("id"),
            user_id: r.get("user_id"),
            course_id: r.get("course_id"),
            created_at: r.get("created_at"),
        }
    }
}

impl Follow {
    pub async fn find(
        user_id: i64,
        course_id: i64,
        conn: &mut SqliteConnection,
    ) -> Result<Option<Self>> {
        let follow = sqlx::query("SELECT * FROM follows WHERE user_id = $1 AND course_id = $2")
            .bind(user_id)
            .bind(course_id)
            .fetch_optional(conn)
            .await?;
        Ok(follow.map(Self::from))
    }

    pub async fn insert(user_id: i64, course_id: i64, conn: &mut SqliteConnection) -> Result<Self> {
        sqlx::query("INSERT INTO follows (user_id, course_id) VALUES ($1, $2) RETURNING *")
            .bind(user_id)
            .bind(course_id)
            .fetch_one(conn)
            .await
            .map(Self::from)
            .map_err(|e| Error::from_constraint(e, "Follow"))
    }

    pub async fn delete(id: i64, conn: &mut SqliteConnection) -> Result<u64> {
        let result = sqlx::query("DELETE FROM follows WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }
}

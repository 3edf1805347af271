//! Read-only catalog browsing: courses, their instructors and keyword search.

use rocket::serde::{json::Json, Serialize};
use rocket_db_pools::Connection;
use sqlx::SqliteConnection;

use crate::error::{Error, Result};
use crate::store::{Course, CourseInstructor, Instructor, PairedCourse, PairedInstructor};
use crate::Db;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub instructors: Vec<PairedInstructor>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct InstructorDetail {
    #[serde(flatten)]
    pub instructor: Instructor,
    pub courses: Vec<PairedCourse>,
}

pub async fn search_courses(
    query: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Course>> {
    let keyword = query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| Error::validation("No search query provided"))?;

    Course::search(keyword, conn).await
}

pub async fn course_detail(course_id: i64, conn: &mut SqliteConnection) -> Result<CourseDetail> {
    let course = Course::find(course_id, &mut *conn)
        .await?
        .ok_or_else(|| Error::not_found("Course not found."))?;
    let instructors = CourseInstructor::instructors_of(course_id, conn).await?;

    Ok(CourseDetail { course, instructors })
}

pub async fn instructor_detail(
    instructor_id: i64,
    conn: &mut SqliteConnection,
) -> Result<InstructorDetail> {
    let instructor = Instructor::find(instructor_id, &mut *conn)
        .await?
        .ok_or_else(|| Error::not_found("Instructor not found."))?;
    let courses = CourseInstructor::courses_of(instructor_id, conn).await?;

    Ok(InstructorDetail { instructor, courses })
}

#[get("/courses")]
pub async fn list(mut db: Connection<Db>) -> Result<Json<Vec<Course>>> {
    Ok(Json(Course::list(&mut db).await?))
}

#[get("/courses/search?<q>")]
pub async fn search(mut db: Connection<Db>, q: Option<String>) -> Result<Json<Vec<Course>>> {
    Ok(Json(search_courses(q.as_deref(), &mut db).await?))
}

#[get("/courses/<course_id>")]
pub async fn detail(mut db: Connection<Db>, course_id: i64) -> Result<Json<CourseDetail>> {
    Ok(Json(course_detail(course_id, &mut db).await?))
}

#[get("/instructors/<instructor_id>")]
pub async fn instructor(
    mut db: Connection<Db>,
    instructor_id: i64,
) -> Result<Json<InstructorDetail>> {
    Ok(Json(instructor_detail(instructor_id, &mut db).await?))
}

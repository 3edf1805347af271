#![allow(dead_code)]

use academisync::store::{
    Course, CourseInstructor, Instructor, NewCourse, NewInstructor, NewUser, RatingDimension, User,
    MIGRATOR,
};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

/// A fresh in-memory database. The pool holds exactly one connection that
/// never expires, since every new in-memory connection starts empty.
pub async fn pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    MIGRATOR.run(&pool).await.unwrap();
    pool
}

pub async fn user(name: &str, conn: &mut sqlx::SqliteConnection) -> User {
    let email = format!("{name}@connect.hkust-gz.edu.cn");
    NewUser {
        email: &email,
        password_hash: "not-a-real-hash",
        name,
    }
    .insert(conn)
    .await
    .unwrap()
}

pub async fn course(code: &str, conn: &mut sqlx::SqliteConnection) -> Course {
    NewCourse {
        course_code: code,
        name: &format!("{code} Introduction"),
        unit: 3,
        description: Some("A survey course."),
    }
    .insert(conn)
    .await
    .unwrap()
}

pub async fn instructor(name: &str, conn: &mut sqlx::SqliteConnection) -> Instructor {
    let profile_url = format!("https://faculty.example.edu/{name}");
    NewInstructor {
        name,
        profile_url: Some(&profile_url),
    }
    .insert(conn)
    .await
    .unwrap()
}

pub async fn pairing(
    course: &Course,
    instructor: &Instructor,
    semester: &str,
    conn: &mut sqlx::SqliteConnection,
) -> CourseInstructor {
    CourseInstructor::assign(course.id, instructor.id, semester, conn)
        .await
        .unwrap()
}

pub async fn dimension(name: &str, conn: &mut sqlx::SqliteConnection) -> RatingDimension {
    RatingDimension::insert(name, None, conn).await.unwrap()
}

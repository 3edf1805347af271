mod common;

use academisync::comments::{post_comment, PostComment};
use academisync::engagement::{follow_course, like_comment};
use academisync::error::Error;
use academisync::ratings::{submit_ratings, RatingInput, RatingSubmission};
use academisync::store::{
    AttachmentTarget, Comment, Course, CourseInstructor, NewCourse, TargetSelector,
};
use pretty_assertions::assert_eq;
use sqlx::Row;

async fn count(table: &str, conn: &mut sqlx::SqliteConnection) -> i64 {
    sqlx::query(&format!("SELECT COUNT(*) AS n FROM {table}"))
        .fetch_one(conn)
        .await
        .unwrap()
        .get("n")
}

#[tokio::test]
async fn deleting_a_course_cascades() {
    let pool = common::pool().await;
    let mut conn = pool.acquire().await.unwrap();

    let course = common::course("COMP1001", &mut conn).await;
    let keep = common::course("COMP2002", &mut conn).await;
    let teacher = common::instructor("lee", &mut conn).await;
    let fall = common::pairing(&course, &teacher, "Fall 2024", &mut conn).await;
    common::pairing(&keep, &teacher, "Fall 2024", &mut conn).await;
    let clarity = common::dimension("Clarity", &mut conn).await;
    let user = common::user("alice", &mut conn).await;

    for target in [
        TargetSelector::course(course.id),
        TargetSelector::course_instructor(fall.id),
    ] {
        let submission = RatingSubmission {
            target,
            ratings: Some(vec![RatingInput::new(clarity.id, 4)]),
        };
        submit_ratings(user.id, &submission, &mut conn).await.unwrap();

        let comment = post_comment(
            user.id,
            &PostComment {
                target,
                parent_comment_id: None,
                content: Some("Solid".to_string()),
            },
            &mut conn,
        )
        .await
        .unwrap();
        like_comment(user.id, comment.id, &mut conn).await.unwrap();
    }
    follow_course(user.id, course.id, &mut conn).await.unwrap();
    follow_course(user.id, keep.id, &mut conn).await.unwrap();

    assert_eq!(Course::delete(course.id, &mut conn).await.unwrap(), 1);

    assert!(Course::find(course.id, &mut conn).await.unwrap().is_none());
    assert!(CourseInstructor::find(fall.id, &mut conn).await.unwrap().is_none());
    assert_eq!(count("course_instructors", &mut conn).await, 1);
    assert_eq!(count("ratings", &mut conn).await, 0);
    assert_eq!(count("comments", &mut conn).await, 0);
    assert_eq!(count("likes", &mut conn).await, 0);
    assert_eq!(count("follows", &mut conn).await, 1);
    assert_eq!(count("rating_dimensions", &mut conn).await, 1);
}

/// One rating, one comment with a like, and one follow by `user` on `target`.
async fn engage(
    user_id: i64,
    target: TargetSelector,
    course_id: i64,
    dimension_id: i64,
    conn: &mut sqlx::SqliteConnection,
) {
    let submission = RatingSubmission {
        target,
        ratings: Some(vec![RatingInput::new(dimension_id, 3)]),
    };
    submit_ratings(user_id, &submission, &mut *conn).await.unwrap();

    let comment = post_comment(
        user_id,
        &PostComment {
            target,
            parent_comment_id: None,
            content: Some("Fine".to_string()),
        },
        &mut *conn,
    )
    .await
    .unwrap();
    like_comment(user_id, comment.id, &mut *conn).await.unwrap();
    follow_course(user_id, course_id, conn).await.unwrap();
}

async fn delete_row(table: &str, id: i64, conn: &mut sqlx::SqliteConnection) {
    let done = sqlx::query(&format!("DELETE FROM {table} WHERE id = $1"))
        .bind(id)
        .execute(conn)
        .await
        .unwrap();
    assert_eq!(done.rows_affected(), 1);
}

#[tokio::test]
async fn deleting_a_user_cascades() {
    let pool = common::pool().await;
    let mut conn = pool.acquire().await.unwrap();

    let course = common::course("COMP1001", &mut conn).await;
    let clarity = common::dimension("Clarity", &mut conn).await;
    let alice = common::user("alice", &mut conn).await;
    let bob = common::user("bob", &mut conn).await;
    let target = TargetSelector::course(course.id);

    engage(alice.id, target, course.id, clarity.id, &mut conn).await;
    engage(bob.id, target, course.id, clarity.id, &mut conn).await;

    // Bob also likes Alice's comment; that like goes with Bob.
    let alices = Comment::roots_of(AttachmentTarget::Course(course.id), &mut conn)
        .await
        .unwrap()
        .into_iter()
        .find(|c| c.user_id == alice.id)
        .unwrap();
    like_comment(bob.id, alices.id, &mut conn).await.unwrap();

    delete_row("users", bob.id, &mut conn).await;

    assert_eq!(count("users", &mut conn).await, 1);
    assert_eq!(count("ratings", &mut conn).await, 1);
    assert_eq!(count("comments", &mut conn).await, 1);
    assert_eq!(count("likes", &mut conn).await, 1);
    assert_eq!(count("follows", &mut conn).await, 1);
    assert!(Course::find(course.id, &mut conn).await.unwrap().is_some());
}

#[tokio::test]
async fn deleting_an_instructor_cascades() {
    let pool = common::pool().await;
    let mut conn = pool.acquire().await.unwrap();

    let course = common::course("COMP1001", &mut conn).await;
    let lee = common::instructor("lee", &mut conn).await;
    let wong = common::instructor("wong", &mut conn).await;
    let with_lee = common::pairing(&course, &lee, "Fall 2024", &mut conn).await;
    let with_wong = common::pairing(&course, &wong, "Fall 2024", &mut conn).await;
    let clarity = common::dimension("Clarity", &mut conn).await;
    let alice = common::user("alice", &mut conn).await;
    let bob = common::user("bob", &mut conn).await;

    let on_lee = TargetSelector::course_instructor(with_lee.id);
    let on_wong = TargetSelector::course_instructor(with_wong.id);
    engage(alice.id, on_lee, course.id, clarity.id, &mut conn).await;
    engage(bob.id, on_wong, course.id, clarity.id, &mut conn).await;

    delete_row("instructors", lee.id, &mut conn).await;

    assert!(CourseInstructor::find(with_lee.id, &mut conn).await.unwrap().is_none());
    assert!(CourseInstructor::find(with_wong.id, &mut conn).await.unwrap().is_some());
    assert_eq!(count("ratings", &mut conn).await, 1);
    assert_eq!(count("comments", &mut conn).await, 1);
    assert_eq!(count("likes", &mut conn).await, 1);
    assert_eq!(count("follows", &mut conn).await, 2);
    assert!(Course::find(course.id, &mut conn).await.unwrap().is_some());
}

#[tokio::test]
async fn deleting_a_parent_comment_removes_replies() {
    let pool = common::pool().await;
    let mut conn = pool.acquire().await.unwrap();

    let course = common::course("COMP1001", &mut conn).await;
    let user = common::user("alice", &mut conn).await;
    let post = |parent_comment_id| PostComment {
        target: TargetSelector::course(course.id),
        parent_comment_id,
        content: Some("text".to_string()),
    };

    let root = post_comment(user.id, &post(None), &mut conn).await.unwrap();
    let reply = post_comment(user.id, &post(Some(root.id)), &mut conn).await.unwrap();

    assert_eq!(Comment::delete(root.id, &mut conn).await.unwrap(), 1);
    assert!(Comment::find(reply.id, &mut conn).await.unwrap().is_none());
}

#[tokio::test]
async fn schema_rejects_what_services_would() {
    let pool = common::pool().await;
    let mut conn = pool.acquire().await.unwrap();

    let course = common::course("COMP1001", &mut conn).await;
    let clarity = common::dimension("Clarity", &mut conn).await;
    let user = common::user("alice", &mut conn).await;

    let out_of_range = sqlx::query(
        "INSERT INTO ratings (user_id, course_id, rating_dimension_id, score) VALUES ($1, $2, $3, 6)",
    )
    .bind(user.id)
    .bind(course.id)
    .bind(clarity.id)
    .execute(&mut *conn)
    .await;
    assert!(out_of_range.is_err());

    let untargeted = sqlx::query(
        "INSERT INTO comments (user_id, content) VALUES ($1, 'floating')",
    )
    .bind(user.id)
    .execute(&mut *conn)
    .await;
    assert!(untargeted.is_err());

    let insert_rating =
        "INSERT INTO ratings (user_id, course_id, rating_dimension_id, score) VALUES ($1, $2, $3, 3)";
    sqlx::query(insert_rating)
        .bind(user.id)
        .bind(course.id)
        .bind(clarity.id)
        .execute(&mut *conn)
        .await
        .unwrap();
    let duplicate = sqlx::query(insert_rating)
        .bind(user.id)
        .bind(course.id)
        .bind(clarity.id)
        .execute(&mut *conn)
        .await;
    assert!(duplicate.is_err());
}

#[tokio::test]
async fn constraint_failures_map_to_the_taxonomy() {
    let pool = common::pool().await;
    let mut conn = pool.acquire().await.unwrap();

    let course = common::course("COMP1001", &mut conn).await;
    let teacher = common::instructor("lee", &mut conn).await;
    common::pairing(&course, &teacher, "Fall 2024", &mut conn).await;

    let same_code = NewCourse {
        course_code: "COMP1001",
        name: "Duplicate",
        unit: 3,
        description: None,
    }
    .insert(&mut conn)
    .await;
    assert!(matches!(same_code, Err(Error::Conflict(_))));

    let same_semester =
        CourseInstructor::assign(course.id, teacher.id, "Fall 2024", &mut conn).await;
    assert!(matches!(same_semester, Err(Error::Conflict(_))));

    let next_semester =
        CourseInstructor::assign(course.id, teacher.id, "Spring 2025", &mut conn).await;
    assert!(next_semester.is_ok());

    let dangling = CourseInstructor::assign(999, teacher.id, "Fall 2024", &mut conn).await;
    assert!(matches!(dangling, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn pairings_list_both_ways() {
    let pool = common::pool().await;
    let mut conn = pool.acquire().await.unwrap();

    let course = common::course("COMP1001", &mut conn).await;
    let lee = common::instructor("lee", &mut conn).await;
    let wong = common::instructor("wong", &mut conn).await;
    let first = common::pairing(&course, &wong, "Fall 2024", &mut conn).await;
    let second = common::pairing(&course, &lee, "Spring 2025", &mut conn).await;

    let instructors = CourseInstructor::instructors_of(course.id, &mut conn).await.unwrap();
    assert_eq!(
        instructors
            .iter()
            .map(|p| (p.course_instructor_id, p.instructor.name.as_str(), p.semester.as_str()))
            .collect::<Vec<_>>(),
        vec![(first.id, "wong", "Fall 2024"), (second.id, "lee", "Spring 2025")]
    );

    let courses = CourseInstructor::courses_of(lee.id, &mut conn).await.unwrap();
    assert_eq!(courses.len(), 1);
    assert_eq!(courses[0].course.course_code, "COMP1001");
}

mod common;

use academisync::aggregation::{average_scores, my_scores, DimensionAverage, DimensionScore};
use academisync::error::Error;
use academisync::ratings::{submit_ratings, RatingInput, RatingSubmission};
use academisync::store::{AttachmentTarget, RatingDimension, TargetSelector};
use pretty_assertions::assert_eq;

fn batch(target: TargetSelector, entries: &[(i64, i64)]) -> RatingSubmission {
    RatingSubmission {
        target,
        ratings: Some(
            entries
                .iter()
                .map(|&(rating_dimension_id, score)| RatingInput::new(rating_dimension_id, score))
                .collect(),
        ),
    }
}

#[tokio::test]
async fn averages_and_own_scores_cover_every_dimension() {
    let pool = common::pool().await;
    let mut conn = pool.acquire().await.unwrap();

    let course = common::course("COMP1001", &mut conn).await;
    let clarity = common::dimension("Clarity", &mut conn).await;
    let workload = common::dimension("Workload", &mut conn).await;
    let alice = common::user("alice", &mut conn).await;
    let bob = common::user("bob", &mut conn).await;

    let target = TargetSelector::course(course.id);
    submit_ratings(alice.id, &batch(target, &[(clarity.id, 4)]), &mut conn)
        .await
        .unwrap();
    let both = batch(target, &[(clarity.id, 2), (workload.id, 5)]);
    submit_ratings(bob.id, &both, &mut conn).await.unwrap();

    let averages = average_scores(AttachmentTarget::Course(course.id), &mut conn)
        .await
        .unwrap();
    assert_eq!(averages.target, target);
    assert_eq!(
        averages.ratings,
        vec![
            DimensionAverage {
                dimension_id: clarity.id,
                dimension_name: "Clarity".to_string(),
                average_score: Some(3.0),
            },
            DimensionAverage {
                dimension_id: workload.id,
                dimension_name: "Workload".to_string(),
                average_score: Some(5.0),
            },
        ]
    );

    let mine = my_scores(alice.id, AttachmentTarget::Course(course.id), &mut conn)
        .await
        .unwrap();
    assert_eq!(
        mine.ratings,
        vec![
            DimensionScore {
                dimension_id: clarity.id,
                dimension_name: "Clarity".to_string(),
                score: Some(4),
            },
            DimensionScore {
                dimension_id: workload.id,
                dimension_name: "Workload".to_string(),
                score: None,
            },
        ]
    );
}

#[tokio::test]
async fn unrated_target_lists_dimensions_with_null_average() {
    let pool = common::pool().await;
    let mut conn = pool.acquire().await.unwrap();

    let course = common::course("COMP2002", &mut conn).await;
    common::dimension("Clarity", &mut conn).await;
    common::dimension("Workload", &mut conn).await;
    common::dimension("Fairness", &mut conn).await;

    let averages = average_scores(AttachmentTarget::Course(course.id), &mut conn)
        .await
        .unwrap();

    let names: Vec<_> = averages.ratings.iter().map(|r| r.dimension_name.as_str()).collect();
    assert_eq!(names, vec!["Clarity", "Workload", "Fairness"]);

    let dimensions = RatingDimension::list(&mut conn).await.unwrap();
    assert_eq!(
        averages.ratings.iter().map(|r| r.dimension_id).collect::<Vec<_>>(),
        dimensions.iter().map(|d| d.id).collect::<Vec<_>>()
    );
    assert!(averages.ratings.iter().all(|r| r.average_score.is_none()));
}

#[tokio::test]
async fn averages_are_scoped_to_the_target_and_rounded() {
    let pool = common::pool().await;
    let mut conn = pool.acquire().await.unwrap();

    let course = common::course("MATH1010", &mut conn).await;
    let teacher = common::instructor("lee", &mut conn).await;
    let fall = common::pairing(&course, &teacher, "Fall 2024", &mut conn).await;
    let clarity = common::dimension("Clarity", &mut conn).await;

    let pairing = TargetSelector::course_instructor(fall.id);
    for (name, score) in [("ann", 4), ("ben", 4), ("cat", 5)] {
        let user = common::user(name, &mut conn).await;
        submit_ratings(user.id, &batch(pairing, &[(clarity.id, score)]), &mut conn)
            .await
            .unwrap();
    }

    let on_pairing = average_scores(AttachmentTarget::CourseInstructor(fall.id), &mut conn)
        .await
        .unwrap();
    assert_eq!(on_pairing.ratings[0].average_score, Some(4.33));
    assert_eq!(on_pairing.target, pairing);

    // Ratings on the pairing do not leak into the course itself.
    let on_course = average_scores(AttachmentTarget::Course(course.id), &mut conn)
        .await
        .unwrap();
    assert_eq!(on_course.ratings[0].average_score, None);
}

#[tokio::test]
async fn pairing_lookup_picks_semester_or_earliest() {
    let pool = common::pool().await;
    let mut conn = pool.acquire().await.unwrap();

    let course = common::course("PHYS1001", &mut conn).await;
    let teacher = common::instructor("wong", &mut conn).await;
    let fall = common::pairing(&course, &teacher, "Fall 2024", &mut conn).await;
    let spring = common::pairing(&course, &teacher, "Spring 2025", &mut conn).await;

    let earliest = AttachmentTarget::pairing(course.id, teacher.id, None, &mut conn)
        .await
        .unwrap();
    assert_eq!(earliest, AttachmentTarget::CourseInstructor(fall.id));

    let chosen = AttachmentTarget::pairing(course.id, teacher.id, Some("Spring 2025"), &mut conn)
        .await
        .unwrap();
    assert_eq!(chosen, AttachmentTarget::CourseInstructor(spring.id));

    let missing =
        AttachmentTarget::pairing(course.id, teacher.id, Some("Summer 2025"), &mut conn).await;
    assert!(matches!(missing, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn unknown_target_is_not_found() {
    let pool = common::pool().await;
    let mut conn = pool.acquire().await.unwrap();
    common::dimension("Clarity", &mut conn).await;

    let course = average_scores(AttachmentTarget::Course(404), &mut conn).await;
    assert!(matches!(course, Err(Error::NotFound(_))));

    let pairing = my_scores(1, AttachmentTarget::CourseInstructor(404), &mut conn).await;
    assert!(matches!(pairing, Err(Error::NotFound(_))));
}

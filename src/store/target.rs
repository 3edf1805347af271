//! The two things a rating or comment can hang off: a course, or one
//! (course, instructor, semester) offering of it.

use rocket::serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;

use super::models::{Course, CourseInstructor};
use crate::error::{Error, Result};

/// A resolved attachment point. Built once at the boundary from a
/// [`TargetSelector`]; services never see the raw nullable pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentTarget {
    Course(i64),
    CourseInstructor(i64),
}

impl AttachmentTarget {
    /// Foreign-key column the target occupies in `ratings` and `comments`.
    pub(crate) fn column(&self) -> &'static str {
        match self {
            AttachmentTarget::Course(_) => "course_id",
            AttachmentTarget::CourseInstructor(_) => "course_instructor_id",
        }
    }

    pub fn id(&self) -> i64 {
        match *self {
            AttachmentTarget::Course(id) | AttachmentTarget::CourseInstructor(id) => id,
        }
    }

    pub fn course_id(&self) -> Option<i64> {
        match *self {
            AttachmentTarget::Course(id) => Some(id),
            AttachmentTarget::CourseInstructor(_) => None,
        }
    }

    pub fn course_instructor_id(&self) -> Option<i64> {
        match *self {
            AttachmentTarget::Course(_) => None,
            AttachmentTarget::CourseInstructor(id) => Some(id),
        }
    }

    /// Resolves the pairing of a course and instructor, the earliest one when
    /// no semester is given.
    pub async fn pairing(
        course_id: i64,
        instructor_id: i64,
        semester: Option<&str>,
        conn: &mut SqliteConnection,
    ) -> Result<Self> {
        CourseInstructor::find_pairing(course_id, instructor_id, semester, conn)
            .await?
            .map(|pairing| AttachmentTarget::CourseInstructor(pairing.id))
            .ok_or_else(|| Error::not_found("Course-Instructor pair not found."))
    }

    /// Fails with `NotFound` unless the referenced course or pairing exists.
    pub async fn ensure_exists(self, conn: &mut SqliteConnection) -> Result<Self> {
        match self {
            AttachmentTarget::Course(id) => {
                Course::find(id, conn)
                    .await?
                    .ok_or_else(|| Error::not_found("Course not found."))?;
            }
            AttachmentTarget::CourseInstructor(id) => {
                CourseInstructor::find(id, conn)
                    .await?
                    .ok_or_else(|| Error::not_found("Course-Instructor pair not found."))?;
            }
        }
        Ok(self)
    }
}

/// The `course_id` / `course_instructor_id` pair as clients send it, in JSON
/// bodies and query strings alike. Exactly one side must be present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, FromForm)]
#[serde(crate = "rocket::serde")]
pub struct TargetSelector {
    #[serde(default)]
    pub course_id: Option<i64>,
    #[serde(default)]
    pub course_instructor_id: Option<i64>,
}

impl TargetSelector {
    pub fn course(id: i64) -> Self {
        Self {
            course_id: Some(id),
            course_instructor_id: None,
        }
    }

    pub fn course_instructor(id: i64) -> Self {
        Self {
            course_id: None,
            course_instructor_id: Some(id),
        }
    }

    pub fn resolve(&self) -> Result<AttachmentTarget> {
        match (self.course_id, self.course_instructor_id) {
            (Some(id), None) => Ok(AttachmentTarget::Course(id)),
            (None, Some(id)) => Ok(AttachmentTarget::CourseInstructor(id)),
            _ => Err(Error::validation(
                "Provide either course_id or course_instructor_id, not both.",
            )),
        }
    }
}

impl From<AttachmentTarget> for TargetSelector {
    fn from(target: AttachmentTarget) -> Self {
        Self {
            course_id: target.course_id(),
            course_instructor_id: target.course_instructor_id(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_exactly_one_side() {
        assert_eq!(
            TargetSelector::course(3).resolve().unwrap(),
            AttachmentTarget::Course(3)
        );
        assert_eq!(
            TargetSelector::course_instructor(9).resolve().unwrap(),
            AttachmentTarget::CourseInstructor(9)
        );
    }

    #[test]
    fn rejects_both_and_neither() {
        let both = TargetSelector {
            course_id: Some(1),
            course_instructor_id: Some(2),
        };
        assert!(matches!(both.resolve(), Err(Error::Validation(_))));
        assert!(matches!(
            TargetSelector::default().resolve(),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn selector_mirrors_target() {
        let target = AttachmentTarget::CourseInstructor(5);
        assert_eq!(TargetSelector::from(target), TargetSelector::course_instructor(5));
        assert_eq!(target.column(), "course_instructor_id");
        assert_eq!(target.id(), 5);
    }
}

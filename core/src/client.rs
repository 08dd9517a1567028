//! The API client facade.
//!
//! # Design
//! `StepikClient` owns one [`Executor`] and hands out query builders that
//! borrow it. It keeps no per-call state, so one client can be shared across
//! threads while each builder stays local to the caller that made it.

use std::sync::Arc;

use crate::auth::{AuthManager, OAuthManager};
use crate::codec::JsonCodec;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::executor::Executor;
use crate::http::{Transport, UreqTransport};
use crate::model::{
    Attempt, Course, Enrollment, Lesson, Metric, Page, Profile, Section, Step, Submission, Unit, User,
};
use crate::resources::Resources;

/// Entry point for the Stepik API.
#[derive(Debug)]
pub struct StepikClient {
    executor: Executor,
}

impl StepikClient {
    /// Client on the blocking HTTP transport with OAuth from `config.oauth`.
    pub fn new(config: ClientConfig) -> Self {
        let transport: Arc<dyn Transport> = Arc::new(UreqTransport::new(&config));
        let auth = Arc::new(OAuthManager::new(&config, Arc::clone(&transport)));
        Self::with_transport(config, transport, auth)
    }

    pub fn with_auth(config: ClientConfig, auth: Arc<dyn AuthManager>) -> Self {
        let transport = Arc::new(UreqTransport::new(&config));
        Self::with_transport(config, transport, auth)
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>, auth: Arc<dyn AuthManager>) -> Self {
        Self {
            executor: Executor::new(config, transport, auth),
        }
    }

    pub fn with_codec(mut self, codec: JsonCodec) -> Self {
        self.executor = self.executor.with_codec(codec);
        self
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn courses(&self) -> Resources<'_, Course> {
        Resources::new(&self.executor, "/api/courses")
    }

    pub fn sections(&self) -> Resources<'_, Section> {
        Resources::new(&self.executor, "/api/sections")
    }

    pub fn units(&self) -> Resources<'_, Unit> {
        Resources::new(&self.executor, "/api/units")
    }

    pub fn lessons(&self) -> Resources<'_, Lesson> {
        Resources::new(&self.executor, "/api/lessons")
    }

    pub fn steps(&self) -> Resources<'_, Step> {
        Resources::new(&self.executor, "/api/steps")
    }

    pub fn attempts(&self) -> Resources<'_, Attempt> {
        Resources::new(&self.executor, "/api/attempts")
    }

    pub fn submissions(&self) -> Resources<'_, Submission> {
        Resources::new(&self.executor, "/api/submissions")
    }

    pub fn enrollments(&self) -> Resources<'_, Enrollment> {
        Resources::new(&self.executor, "/api/enrollments")
    }

    pub fn users(&self) -> Resources<'_, User> {
        Resources::new(&self.executor, "/api/users")
    }

    pub fn profiles(&self) -> Resources<'_, Profile> {
        Resources::new(&self.executor, "/api/profiles")
    }

    pub fn metrics(&self) -> Resources<'_, Metric> {
        Resources::new(&self.executor, "/api/metrics")
    }

    /// Enroll the current user in `course`.
    ///
    /// Failures are logged with the course id and title before being
    /// returned.
    pub fn enroll(&self, course: &Course) -> Result<Page<Enrollment>, ClientError> {
        self.enrollments()
            .create()
            .course(course.id)
            .execute()
            .inspect_err(|error| {
                tracing::error!(course_id = course.id, title = %course.title, %error, "can't enroll in course");
            })
    }

    /// Enroll in the course that contains `unit`.
    ///
    /// Returns `Ok(None)` when the unit is detached (`section == 0`) or the
    /// section or course can no longer be found. A failed lookup is logged
    /// with the unit id and lesson title.
    pub fn enroll_for_lesson(&self, unit: &Unit, lesson_title: &str) -> Result<Option<Page<Enrollment>>, ClientError> {
        if unit.section == 0 {
            return Ok(None);
        }

        let course = self.course_of(unit, lesson_title).inspect_err(|error| {
            tracing::error!(unit_id = unit.id, lesson = lesson_title, %error, "can't enroll on a lesson");
        })?;
        let Some(course) = course else {
            return Ok(None);
        };

        tracing::debug!(course_id = course.id, lesson = lesson_title, "enrolling for lesson");
        self.enroll(&course).map(Some)
    }

    fn course_of(&self, unit: &Unit, lesson_title: &str) -> Result<Option<Course>, ClientError> {
        let Some(section) = self.sections().get().id(unit.section).execute()?.into_items().pop() else {
            tracing::warn!(section = unit.section, lesson = lesson_title, "section not found");
            return Ok(None);
        };
        let course = self.courses().get().id(section.course).execute()?.into_items().pop();
        if course.is_none() {
            tracing::warn!(course = section.course, lesson = lesson_title, "course not found");
        }
        Ok(course)
    }
}

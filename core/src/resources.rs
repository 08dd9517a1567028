//! Per-resource query factories, typed setters and request bodies.
//!
//! A [`Resources`] handle is bound to one collection path. Its `get()` yields
//! the shared collection query; write operations exist only for resources the
//! API lets a client change.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use serde::Serialize;
use serde_json::Value;

use crate::error::ClientError;
use crate::executor::Executor;
use crate::model::{
    Attempt, Course, Enrollment, Lesson, Metric, NoContent, Order, Page, Profile, Reply, Resource, Section,
    Step, Submission, Unit,
};
use crate::variant::RawFields;
use crate::query::{BodyQuery, GetQuery, RequestBody};

/// Query factory for one resource collection.
#[derive(Debug)]
pub struct Resources<'a, R> {
    executor: &'a Executor,
    path: &'static str,
    _resource: PhantomData<fn() -> R>,
}

impl<'a, R: Resource> Resources<'a, R> {
    pub(crate) fn new(executor: &'a Executor, path: &'static str) -> Self {
        Self {
            executor,
            path,
            _resource: PhantomData,
        }
    }

    pub fn path(&self) -> &'static str {
        self.path
    }

    pub fn get(&self) -> GetQuery<'a, Page<R>> {
        GetQuery::get(self.executor, self.path)
    }
}

impl<'a> Resources<'a, Attempt> {
    pub fn create(&self) -> BodyQuery<'a, NewAttempt, Page<Attempt>> {
        BodyQuery::post(self.executor, self.path)
    }
}

impl<'a> Resources<'a, Submission> {
    pub fn create(&self) -> BodyQuery<'a, NewSubmission, Page<Submission>> {
        BodyQuery::post(self.executor, self.path)
    }
}

impl<'a> Resources<'a, Enrollment> {
    pub fn create(&self) -> BodyQuery<'a, NewEnrollment, Page<Enrollment>> {
        BodyQuery::post(self.executor, self.path)
    }

    pub fn delete(&self) -> GetQuery<'a, NoContent> {
        GetQuery::delete(self.executor, "/api/enrollments/{id}")
    }
}

impl<'a> Resources<'a, Metric> {
    pub fn create(&self) -> BodyQuery<'a, NewMetric, Page<Metric>> {
        BodyQuery::post(self.executor, self.path)
    }
}

impl<'a> Resources<'a, Profile> {
    pub fn update(&self) -> BodyQuery<'a, ProfileUpdate, Page<Profile>> {
        BodyQuery::put(self.executor, "/api/profiles/{id}")
    }
}

// GET setters

impl GetQuery<'_, Page<Course>> {
    pub fn enrolled(self, enrolled: bool) -> Self {
        self.param("enrolled", enrolled)
    }

    pub fn is_public(self, is_public: bool) -> Self {
        self.param("is_public", is_public)
    }
}

impl GetQuery<'_, Page<Section>> {
    pub fn course(self, course: u64) -> Self {
        self.param("course", course)
    }
}

impl GetQuery<'_, Page<Unit>> {
    pub fn lesson(self, lesson: u64) -> Self {
        self.param("lesson", lesson)
    }

    pub fn section(self, section: u64) -> Self {
        self.param("section", section)
    }
}

impl GetQuery<'_, Page<Lesson>> {
    pub fn course(self, course: u64) -> Self {
        self.param("course", course)
    }
}

impl GetQuery<'_, Page<Step>> {
    pub fn lesson(self, lesson: u64) -> Self {
        self.param("lesson", lesson)
    }
}

impl GetQuery<'_, Page<Attempt>> {
    pub fn step(self, step: u64) -> Self {
        self.param("step", step)
    }

    pub fn user(self, user: u64) -> Self {
        self.param("user", user)
    }
}

impl GetQuery<'_, Page<Submission>> {
    pub fn step(self, step: u64) -> Self {
        self.param("step", step)
    }

    pub fn user(self, user: u64) -> Self {
        self.param("user", user)
    }

    pub fn attempt(self, attempt: u64) -> Self {
        self.param("attempt", attempt)
    }

    pub fn order(self, order: Order) -> Self {
        self.param("order", order.as_str())
    }

    /// Filter by evaluation status, e.g. `correct` or `wrong`.
    pub fn status(self, status: &str) -> Self {
        self.param("status", status)
    }
}

impl GetQuery<'_, NoContent> {
    /// Enrollment ids are course ids.
    pub fn course(self, course: u64) -> Self {
        self.path_param("id", course)
    }
}

// Request bodies

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NewEnrollment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<u64>,
}

impl RequestBody for NewEnrollment {
    const ROOT: &'static str = "enrollment";

    fn validate(&self) -> Result<(), ClientError> {
        require(self.course.is_some(), "enrollment requires a course id")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NewAttempt {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<u64>,
}

impl RequestBody for NewAttempt {
    const ROOT: &'static str = "attempt";

    fn validate(&self) -> Result<(), ClientError> {
        require(self.step.is_some(), "attempt requires a step id")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewSubmission {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<Reply>,
}

impl RequestBody for NewSubmission {
    const ROOT: &'static str = "submission";

    fn validate(&self) -> Result<(), ClientError> {
        require(self.attempt.is_some(), "submission requires an attempt id")?;
        require(self.reply.is_some(), "submission requires a reply")
    }
}

/// Partial profile update; unset names are left untouched server-side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl RequestBody for ProfileUpdate {
    const ROOT: &'static str = "profile";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewMetric {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "RawFields::is_empty")]
    pub data: RawFields,
}

impl RequestBody for NewMetric {
    const ROOT: &'static str = "metric";

    fn validate(&self) -> Result<(), ClientError> {
        require(self.name.as_deref().is_some_and(|name| !name.is_empty()), "metric requires a name")
    }
}

fn require(present: bool, message: &str) -> Result<(), ClientError> {
    if present {
        Ok(())
    } else {
        Err(ClientError::Construction(message.to_string()))
    }
}

// Body setters

impl BodyQuery<'_, NewEnrollment, Page<Enrollment>> {
    pub fn course(mut self, course: u64) -> Self {
        self.body.course = Some(course);
        self
    }
}

impl BodyQuery<'_, NewAttempt, Page<Attempt>> {
    pub fn step(mut self, step: u64) -> Self {
        self.body.step = Some(step);
        self
    }
}

impl BodyQuery<'_, NewSubmission, Page<Submission>> {
    pub fn attempt(mut self, attempt: u64) -> Self {
        self.body.attempt = Some(attempt);
        self
    }

    pub fn reply(mut self, reply: Reply) -> Self {
        self.body.reply = Some(reply);
        self
    }

    pub fn choices(self, choices: Vec<bool>) -> Self {
        self.reply(Reply::choices(choices))
    }

    pub fn code(self, language: &str, code: &str) -> Self {
        self.reply(Reply::code(language, code))
    }

    pub fn text(self, text: &str) -> Self {
        self.reply(Reply::text(text))
    }
}

impl BodyQuery<'_, NewMetric, Page<Metric>> {
    pub fn name(mut self, name: &str) -> Self {
        self.body.name = Some(name.to_string());
        self
    }

    /// Add one tag; a repeated key replaces the earlier value.
    pub fn tags(mut self, key: &str, value: &str) -> Self {
        self.body.tags.insert(key.to_string(), value.to_string());
        self
    }

    pub fn data(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.body.data.insert(key.to_string(), value.into());
        self
    }
}

impl BodyQuery<'_, ProfileUpdate, Page<Profile>> {
    pub fn id(self, id: u64) -> Self {
        self.path_param("id", id)
    }

    pub fn first_name(mut self, first_name: &str) -> Self {
        self.body.first_name = Some(first_name.to_string());
        self
    }

    pub fn last_name(mut self, last_name: &str) -> Self {
        self.body.last_name = Some(last_name.to_string());
        self
    }
}

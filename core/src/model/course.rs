//! Course structure: courses, sections, units and lessons.

use serde::{Deserialize, Serialize};

use super::Resource;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Course {
    pub id: u64,
    pub title: String,
    pub summary: String,
    pub description: String,
    pub sections: Vec<u64>,
    pub is_public: bool,
    /// Enrollment id when the current user is enrolled.
    pub enrollment: Option<u64>,
}

impl Resource for Course {
    const COLLECTION: &'static str = "courses";
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Section {
    pub id: u64,
    pub course: u64,
    pub title: String,
    pub position: u32,
    pub units: Vec<u64>,
}

impl Resource for Section {
    const COLLECTION: &'static str = "sections";
}

/// Places a lesson inside a section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Unit {
    pub id: u64,
    pub section: u64,
    pub lesson: u64,
    pub position: u32,
}

impl Resource for Unit {
    const COLLECTION: &'static str = "units";
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lesson {
    pub id: u64,
    pub title: String,
    pub steps: Vec<u64>,
    pub is_public: bool,
}

impl Resource for Lesson {
    const COLLECTION: &'static str = "lessons";
}

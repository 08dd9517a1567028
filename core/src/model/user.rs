//! Users, profiles and enrollments.

use serde::{Deserialize, Serialize};

use super::Resource;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub is_guest: bool,
}

impl Resource for User {
    const COLLECTION: &'static str = "users";
}

/// The editable view of the current user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub short_bio: String,
}

impl Resource for Profile {
    const COLLECTION: &'static str = "profiles";
}

/// Enrollment ids are course ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Enrollment {
    pub id: u64,
    pub course: u64,
}

impl Resource for Enrollment {
    const COLLECTION: &'static str = "enrollments";
}

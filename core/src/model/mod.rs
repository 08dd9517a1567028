//! Domain DTOs for the Stepik API.
//!
//! # Design
//! Collection endpoints wrap their items under the resource's plural name
//! next to a `meta` object:
//!
//! ```json
//! { "courses": [ { "id": 42 } ], "meta": { "is_last": true, "page": 1 } }
//! ```
//!
//! [`Page`] decodes that envelope for any [`Resource`]. An empty item list on
//! the last page is an ordinary response, not an error.

pub mod attempt;
pub mod course;
pub mod metric;
pub mod step;
pub mod submission;
pub mod user;

use std::fmt;
use std::marker::PhantomData;

use serde::de::{DeserializeOwned, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use attempt::{Attempt, Dataset};
pub use course::{Course, Lesson, Section, Unit};
pub use metric::Metric;
pub use step::{BlockView, Step};
pub use submission::{Reply, Submission};
pub use user::{Enrollment, Profile, User};

/// A type served from a collection endpoint.
pub trait Resource: DeserializeOwned + Serialize {
    /// Key of the item array in the response envelope, e.g. `courses`.
    const COLLECTION: &'static str;
}

/// Pagination info attached to every collection response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "last_page")]
    pub is_last: bool,
}

fn first_page() -> u32 {
    1
}

fn last_page() -> bool {
    true
}

impl Default for Meta {
    fn default() -> Self {
        Self {
            page: first_page(),
            is_last: last_page(),
        }
    }
}

/// One page of a collection response.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    pub items: Vec<R>,
    pub meta: Meta,
}

impl<R> Page<R> {
    pub fn first(&self) -> Option<&R> {
        self.items.first()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn into_items(self) -> Vec<R> {
        self.items
    }
}

impl<R: Resource> Serialize for Page<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(R::COLLECTION, &self.items)?;
        map.serialize_entry("meta", &self.meta)?;
        map.end()
    }
}

impl<'de, R: Resource> Deserialize<'de> for Page<R> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(PageVisitor(PhantomData))
    }
}

struct PageVisitor<R>(PhantomData<fn() -> R>);

impl<'de, R: Resource> Visitor<'de> for PageVisitor<R> {
    type Value = Page<R>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "an object with a `{}` array", R::COLLECTION)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut items = None;
        let mut meta = None;
        while let Some(key) = map.next_key::<String>()? {
            if key == R::COLLECTION {
                items = Some(map.next_value::<Vec<R>>()?);
            } else if key == "meta" {
                meta = map.next_value::<Option<Meta>>()?;
            } else {
                map.next_value::<serde::de::IgnoredAny>()?;
            }
        }
        let items = items.ok_or_else(|| serde::de::Error::missing_field(R::COLLECTION))?;
        Ok(Page {
            items,
            meta: meta.unwrap_or_default(),
        })
    }
}

/// Response type for endpoints that answer with an empty body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoContent;

/// Sort order for list endpoints that support it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    pub fn as_str(&self) -> &'static str {
        match self {
            Order::Asc => "asc",
            Order::Desc => "desc",
        }
    }
}

//! Usage metrics reported by client applications.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Resource;
use crate::variant::RawFields;

/// One recorded event, e.g. `ide_plugin` with `action=download`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metric {
    pub id: u64,
    pub name: String,
    pub tags: BTreeMap<String, String>,
    pub data: RawFields,
}

impl Resource for Metric {
    const COLLECTION: &'static str = "metrics";
}

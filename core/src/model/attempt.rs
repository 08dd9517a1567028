//! Attempts and the datasets they hand out.
//!
//! # Design
//! Datasets carry no tag on the wire, so the variant is picked from the
//! field set, most specific first:
//!
//! 1. `rows` + `columns` → `Table`
//! 2. `pairs` → `Matching`
//! 3. `components` → `FillBlanks`
//! 4. `options` + `is_multiple_choice` → `Choice`
//! 5. `options` → `Sorting`
//! 6. no fields at all (or the string `""`) → `Empty`
//! 7. anything else → `Unknown`

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Resource;
use crate::variant::{decode_known, has_all, impl_variant_serde, known_fields, report, RawFields, VariantFamily};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attempt {
    pub id: u64,
    pub step: u64,
    pub user: u64,
    pub status: String,
    pub dataset: Option<Dataset>,
    pub dataset_url: Option<String>,
    pub time: Option<String>,
}

impl Resource for Attempt {
    const COLLECTION: &'static str = "attempts";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceDataset {
    pub is_multiple_choice: bool,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortingDataset {
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingDataset {
    pub pairs: Vec<MatchingPair>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingPair {
    pub first: String,
    pub second: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDataset {
    #[serde(default)]
    pub description: String,
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    #[serde(default)]
    pub is_checkbox: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillBlanksDataset {
    pub components: Vec<BlankComponent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlankComponent {
    /// `text`, `input` or `select`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub options: Vec<String>,
}

/// The input half of an attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Dataset {
    Choice(ChoiceDataset),
    Sorting(SortingDataset),
    Matching(MatchingDataset),
    Table(TableDataset),
    FillBlanks(FillBlanksDataset),
    /// Exercises whose input is free-form (code, string, number).
    Empty,
    Unknown(RawFields),
}

impl VariantFamily for Dataset {
    const FAMILY: &'static str = "Dataset";

    fn resolve(fields: RawFields) -> Self {
        let resolved = if has_all(&fields, &["rows", "columns"]) {
            decode_known(Self::FAMILY, "table", &fields).map(Dataset::Table)
        } else if has_all(&fields, &["pairs"]) {
            decode_known(Self::FAMILY, "matching", &fields).map(Dataset::Matching)
        } else if has_all(&fields, &["components"]) {
            decode_known(Self::FAMILY, "fill-blanks", &fields).map(Dataset::FillBlanks)
        } else if has_all(&fields, &["options", "is_multiple_choice"]) {
            decode_known(Self::FAMILY, "choice", &fields).map(Dataset::Choice)
        } else if has_all(&fields, &["options"]) {
            decode_known(Self::FAMILY, "sorting", &fields).map(Dataset::Sorting)
        } else if fields.is_empty() {
            Some(Dataset::Empty)
        } else {
            None
        };
        resolved.unwrap_or(Dataset::Unknown(fields))
    }

    fn unknown(fields: RawFields) -> Self {
        Dataset::Unknown(fields)
    }

    fn to_fields(&self) -> Result<RawFields, serde_json::Error> {
        match self {
            Dataset::Choice(dataset) => known_fields(dataset, None),
            Dataset::Sorting(dataset) => known_fields(dataset, None),
            Dataset::Matching(dataset) => known_fields(dataset, None),
            Dataset::Table(dataset) => known_fields(dataset, None),
            Dataset::FillBlanks(dataset) => known_fields(dataset, None),
            Dataset::Empty => Ok(RawFields::new()),
            Dataset::Unknown(fields) => Ok(fields.clone()),
        }
    }

    fn from_non_object(value: Value) -> Self {
        match value {
            Value::String(text) if text.is_empty() => Dataset::Empty,
            other => {
                report(&format!("{}: expected a JSON object, got {other}", Self::FAMILY));
                Dataset::Unknown(RawFields::new())
            }
        }
    }
}

impl_variant_serde!(Dataset);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dataset(value: Value) -> Dataset {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn choice_needs_the_multiple_choice_flag() {
        let choice = dataset(json!({"is_multiple_choice": false, "options": ["1", "2", "3"]}));
        assert_eq!(
            choice,
            Dataset::Choice(ChoiceDataset {
                is_multiple_choice: false,
                options: vec!["1".into(), "2".into(), "3".into()],
            })
        );

        let sorting = dataset(json!({"options": ["b", "a"]}));
        assert!(matches!(sorting, Dataset::Sorting(_)));
    }

    #[test]
    fn table_beats_everything_else() {
        let table = dataset(json!({
            "description": "Match",
            "rows": ["r1"],
            "columns": ["c1", "c2"],
            "is_checkbox": true,
            "options": ["ignored"]
        }));
        let Dataset::Table(table) = table else {
            panic!("expected table");
        };
        assert!(table.is_checkbox);
        assert_eq!(table.columns.len(), 2);
    }

    #[test]
    fn matching_and_fill_blanks() {
        let matching = dataset(json!({"pairs": [{"first": "a", "second": "1"}]}));
        assert!(matches!(matching, Dataset::Matching(ref m) if m.pairs[0].second == "1"));

        let blanks = dataset(json!({"components": [{"type": "text", "text": "2 + 2 = "}, {"type": "input"}]}));
        let Dataset::FillBlanks(blanks) = blanks else {
            panic!("expected fill-blanks");
        };
        assert_eq!(blanks.components[1].kind, "input");
        assert!(blanks.components[1].options.is_empty());
    }

    #[test]
    fn empty_object_and_empty_string_are_empty() {
        assert_eq!(dataset(json!({})), Dataset::Empty);
        assert_eq!(dataset(json!("")), Dataset::Empty);
        assert_eq!(serde_json::to_value(Dataset::Empty).unwrap(), json!({}));
    }

    #[test]
    fn unrecognised_fields_are_preserved() {
        let raw = json!({"molecule": "H2O", "charges": [1, -1]});
        let decoded = dataset(raw.clone());
        assert!(matches!(decoded, Dataset::Unknown(_)));
        assert_eq!(serde_json::to_value(&decoded).unwrap(), raw);
    }

    #[test]
    fn structural_match_with_bad_values_falls_back() {
        let raw = json!({"pairs": "nope"});
        assert_eq!(dataset(raw.clone()), Dataset::Unknown(raw.as_object().unwrap().clone()));
    }

    #[test]
    fn attempt_with_dataset_decodes() {
        let attempt: Attempt = serde_json::from_value(json!({
            "id": 11, "step": 102, "user": 1, "status": "active",
            "dataset": {"is_multiple_choice": true, "options": ["x", "y"]},
            "dataset_url": null, "time": "2026-10-18T10:00:00Z"
        }))
        .unwrap();
        assert!(matches!(attempt.dataset, Some(Dataset::Choice(ref c)) if c.is_multiple_choice));
        let encoded = serde_json::to_value(&attempt).unwrap();
        assert_eq!(serde_json::from_value::<Attempt>(encoded).unwrap(), attempt);
    }
}

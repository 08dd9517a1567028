//! Submissions and the replies they carry.
//!
//! # Design
//! Replies have no tag on the wire. The shape is chosen from the field set
//! in a fixed order: `code`+`language`, `choices`, `ordering`, `formula`,
//! `number`, `solve_sql`, then `text`. Anything else is `Unknown`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Resource;
use crate::variant::{decode_known, has_all, impl_variant_serde, known_fields, RawFields, VariantFamily};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Submission {
    pub id: u64,
    pub attempt: u64,
    /// `evaluation`, `correct` or `wrong`.
    pub status: String,
    pub score: f64,
    pub hint: String,
    pub time: Option<String>,
    pub reply: Option<Reply>,
}

impl Resource for Submission {
    const COLLECTION: &'static str = "submissions";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeReply {
    pub code: String,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceReply {
    pub choices: Vec<bool>,
}

/// Answer to sorting and matching steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderingReply {
    pub ordering: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MathReply {
    pub formula: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberReply {
    pub number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlReply {
    pub solve_sql: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextReply {
    pub text: String,
    #[serde(default)]
    pub files: Vec<String>,
}

/// A learner's answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Code(CodeReply),
    Choice(ChoiceReply),
    Ordering(OrderingReply),
    Math(MathReply),
    Number(NumberReply),
    Sql(SqlReply),
    Text(TextReply),
    Unknown(RawFields),
}

impl Reply {
    pub fn code(language: &str, code: &str) -> Self {
        Reply::Code(CodeReply {
            code: code.to_string(),
            language: language.to_string(),
        })
    }

    pub fn choices(choices: Vec<bool>) -> Self {
        Reply::Choice(ChoiceReply { choices })
    }

    pub fn text(text: &str) -> Self {
        Reply::Text(TextReply {
            text: text.to_string(),
            files: Vec::new(),
        })
    }

    /// Language of a code reply; unknown replies report theirs if present.
    pub fn language(&self) -> Option<&str> {
        match self {
            Reply::Code(reply) => Some(&reply.language),
            Reply::Unknown(fields) => fields.get("language").and_then(Value::as_str),
            _ => None,
        }
    }

    pub fn source_code(&self) -> Option<&str> {
        match self {
            Reply::Code(reply) => Some(&reply.code),
            Reply::Unknown(fields) => fields.get("code").and_then(Value::as_str),
            _ => None,
        }
    }
}

impl VariantFamily for Reply {
    const FAMILY: &'static str = "Reply";

    fn resolve(fields: RawFields) -> Self {
        let family = Self::FAMILY;
        let resolved = if has_all(&fields, &["code", "language"]) {
            decode_known(family, "code", &fields).map(Reply::Code)
        } else if has_all(&fields, &["choices"]) {
            decode_known(family, "choice", &fields).map(Reply::Choice)
        } else if has_all(&fields, &["ordering"]) {
            decode_known(family, "ordering", &fields).map(Reply::Ordering)
        } else if has_all(&fields, &["formula"]) {
            decode_known(family, "math", &fields).map(Reply::Math)
        } else if has_all(&fields, &["number"]) {
            decode_known(family, "number", &fields).map(Reply::Number)
        } else if has_all(&fields, &["solve_sql"]) {
            decode_known(family, "sql", &fields).map(Reply::Sql)
        } else if has_all(&fields, &["text"]) {
            decode_known(family, "text", &fields).map(Reply::Text)
        } else {
            None
        };
        resolved.unwrap_or(Reply::Unknown(fields))
    }

    fn unknown(fields: RawFields) -> Self {
        Reply::Unknown(fields)
    }

    fn to_fields(&self) -> Result<RawFields, serde_json::Error> {
        match self {
            Reply::Code(reply) => known_fields(reply, None),
            Reply::Choice(reply) => known_fields(reply, None),
            Reply::Ordering(reply) => known_fields(reply, None),
            Reply::Math(reply) => known_fields(reply, None),
            Reply::Number(reply) => known_fields(reply, None),
            Reply::Sql(reply) => known_fields(reply, None),
            Reply::Text(reply) => known_fields(reply, None),
            Reply::Unknown(fields) => Ok(fields.clone()),
        }
    }
}

impl_variant_serde!(Reply);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reply(value: Value) -> Reply {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn code_needs_language() {
        let code = reply(json!({"code": "print(1)", "language": "python3"}));
        assert_eq!(code, Reply::code("python3", "print(1)"));
        assert_eq!(code.language(), Some("python3"));
        assert_eq!(code.source_code(), Some("print(1)"));

        let raw = json!({"code": "print(1)"});
        let partial = reply(raw.clone());
        assert_eq!(partial, Reply::Unknown(raw.as_object().unwrap().clone()));
        assert_eq!(partial.source_code(), Some("print(1)"));
        assert_eq!(partial.language(), None);
    }

    #[test]
    fn precedence_prefers_more_specific_shapes() {
        assert!(matches!(reply(json!({"choices": [true], "text": "x"})), Reply::Choice(_)));
        assert!(matches!(reply(json!({"ordering": [2, 0, 1]})), Reply::Ordering(_)));
        assert!(matches!(reply(json!({"formula": "x^2"})), Reply::Math(_)));
        assert!(matches!(reply(json!({"number": "42"})), Reply::Number(_)));
        assert!(matches!(reply(json!({"solve_sql": "select 1"})), Reply::Sql(_)));
        assert!(matches!(reply(json!({"text": "answer", "files": []})), Reply::Text(_)));
    }

    #[test]
    fn bad_values_fall_back_to_unknown() {
        let raw = json!({"choices": "all of them"});
        assert_eq!(reply(raw.clone()), Reply::Unknown(raw.as_object().unwrap().clone()));
    }

    #[test]
    fn choice_reply_encodes_as_plain_object() {
        let encoded = serde_json::to_value(Reply::choices(vec![true, false])).unwrap();
        assert_eq!(encoded, json!({"choices": [true, false]}));
    }

    #[test]
    fn submission_keeps_unknown_reply_fields() {
        let raw_reply = json!({"blocks": [{"id": 1}], "hologram": true});
        let submission: Submission = serde_json::from_value(json!({
            "id": 1, "attempt": 11, "status": "wrong", "reply": raw_reply.clone()
        }))
        .unwrap();
        let encoded = serde_json::to_value(&submission).unwrap();
        assert_eq!(encoded["reply"], raw_reply);
    }
}

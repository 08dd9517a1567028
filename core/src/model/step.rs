//! Lesson steps and their content blocks.
//!
//! # Design
//! A step's `block` selects its shape through the `name` field. The tag wins
//! whenever it is a string; structural inference only runs for blocks that
//! have no `name` at all:
//!
//! 1. a `video` member → `Video`
//! 2. `options` carrying `code_templates` or `limits` → `Code`
//! 3. a lone `text` member → `Text`
//! 4. anything else → `Unknown`
//!
//! Quiz kinds cannot be inferred without a tag, so untagged quiz-like blocks
//! land in `Unknown` with their fields intact.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Resource;
use crate::variant::{decode_known, impl_variant_serde, known_fields, RawFields, VariantFamily};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Step {
    pub id: u64,
    pub lesson: u64,
    pub position: u32,
    pub status: String,
    pub cost: u32,
    pub block: Option<BlockView>,
}

impl Resource for Step {
    const COLLECTION: &'static str = "steps";
}

impl Step {
    /// Step text shown to the learner, empty when the block has none.
    pub fn text(&self) -> &str {
        self.block.as_ref().map(BlockView::text).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoBlock {
    #[serde(default)]
    pub text: String,
    pub video: Video,
    #[serde(default)]
    pub subtitle_files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Video {
    pub id: u64,
    pub thumbnail: String,
    pub duration: u64,
    pub urls: Vec<VideoUrl>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoUrl {
    pub quality: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    #[serde(default)]
    pub text: String,
    pub options: CodeOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeOptions {
    pub execution_time_limit: u32,
    pub execution_memory_limit: u32,
    /// Per-language overrides of the limits above.
    pub limits: BTreeMap<String, Limit>,
    /// Starter code keyed by language.
    pub code_templates: BTreeMap<String, String>,
    /// Input/output pairs shown in the statement.
    pub samples: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limit {
    pub time: u32,
    pub memory: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuizKind {
    Choice,
    String,
    Number,
    Math,
    FreeAnswer,
    Sorting,
    Matching,
    Table,
    FillBlanks,
}

impl QuizKind {
    fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "choice" => QuizKind::Choice,
            "string" => QuizKind::String,
            "number" => QuizKind::Number,
            "math" => QuizKind::Math,
            "free-answer" => QuizKind::FreeAnswer,
            "sorting" => QuizKind::Sorting,
            "matching" => QuizKind::Matching,
            "table" => QuizKind::Table,
            "fill-blanks" => QuizKind::FillBlanks,
            _ => return None,
        };
        Some(kind)
    }
}

/// Interactive exercise block. The quiz-specific options stay raw since the
/// attempt's dataset carries the structured input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizBlock {
    #[serde(rename = "name")]
    pub kind: QuizKind,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub options: Option<RawFields>,
}

/// Renderable content of a step.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockView {
    Text(TextBlock),
    Video(VideoBlock),
    Code(CodeBlock),
    Quiz(QuizBlock),
    /// Block kind this client does not know; keeps every field.
    Unknown(RawFields),
}

enum BlockKind {
    Text,
    Video,
    Code,
    Quiz,
}

impl BlockKind {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "text" => Some(BlockKind::Text),
            "video" => Some(BlockKind::Video),
            "code" => Some(BlockKind::Code),
            other => QuizKind::from_name(other).map(|_| BlockKind::Quiz),
        }
    }

    fn infer(fields: &RawFields) -> Option<Self> {
        if fields.get("video").is_some_and(Value::is_object) {
            return Some(BlockKind::Video);
        }
        if let Some(options) = fields.get("options").and_then(Value::as_object) {
            if options.contains_key("code_templates") || options.contains_key("limits") {
                return Some(BlockKind::Code);
            }
        }
        if fields.len() == 1 && fields.get("text").is_some_and(Value::is_string) {
            return Some(BlockKind::Text);
        }
        None
    }
}

impl BlockView {
    /// The `name` tag this block encodes with.
    pub fn name(&self) -> Option<&str> {
        match self {
            BlockView::Text(_) => Some("text"),
            BlockView::Video(_) => Some("video"),
            BlockView::Code(_) => Some("code"),
            BlockView::Quiz(quiz) => match quiz.kind {
                QuizKind::Choice => Some("choice"),
                QuizKind::String => Some("string"),
                QuizKind::Number => Some("number"),
                QuizKind::Math => Some("math"),
                QuizKind::FreeAnswer => Some("free-answer"),
                QuizKind::Sorting => Some("sorting"),
                QuizKind::Matching => Some("matching"),
                QuizKind::Table => Some("table"),
                QuizKind::FillBlanks => Some("fill-blanks"),
            },
            BlockView::Unknown(fields) => fields.get("name").and_then(Value::as_str),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            BlockView::Text(block) => &block.text,
            BlockView::Video(block) => &block.text,
            BlockView::Code(block) => &block.text,
            BlockView::Quiz(block) => &block.text,
            BlockView::Unknown(fields) => fields.get("text").and_then(Value::as_str).unwrap_or_default(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, BlockView::Unknown(_))
    }
}

impl VariantFamily for BlockView {
    const FAMILY: &'static str = "BlockView";

    fn resolve(fields: RawFields) -> Self {
        let kind = match fields.get("name") {
            Some(Value::String(name)) => BlockKind::from_name(name),
            Some(_) => None,
            None => BlockKind::infer(&fields),
        };
        let resolved = match kind {
            Some(BlockKind::Text) => decode_known(Self::FAMILY, "text", &fields).map(BlockView::Text),
            Some(BlockKind::Video) => decode_known(Self::FAMILY, "video", &fields).map(BlockView::Video),
            Some(BlockKind::Code) => decode_known(Self::FAMILY, "code", &fields).map(BlockView::Code),
            Some(BlockKind::Quiz) => decode_known(Self::FAMILY, "quiz", &fields).map(BlockView::Quiz),
            None => None,
        };
        resolved.unwrap_or(BlockView::Unknown(fields))
    }

    fn unknown(fields: RawFields) -> Self {
        BlockView::Unknown(fields)
    }

    fn to_fields(&self) -> Result<RawFields, serde_json::Error> {
        match self {
            BlockView::Text(block) => known_fields(block, Some(("name", "text"))),
            BlockView::Video(block) => known_fields(block, Some(("name", "video"))),
            BlockView::Code(block) => known_fields(block, Some(("name", "code"))),
            BlockView::Quiz(block) => known_fields(block, None),
            BlockView::Unknown(fields) => Ok(fields.clone()),
        }
    }
}

impl_variant_serde!(BlockView);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn block(value: Value) -> BlockView {
        serde_json::from_value(value).unwrap()
    }

    fn round_trip(original: &BlockView) -> BlockView {
        let encoded = serde_json::to_string(original).unwrap();
        serde_json::from_str(&encoded).unwrap()
    }

    #[test]
    fn text_block_by_name() {
        let decoded = block(json!({"name": "text", "text": "<p>Hello</p>"}));
        assert_eq!(
            decoded,
            BlockView::Text(TextBlock {
                text: "<p>Hello</p>".into()
            })
        );
        assert_eq!(decoded.text(), "<p>Hello</p>");
    }

    #[test]
    fn video_block_keeps_subtitles() {
        let decoded = block(json!({
            "name": "video",
            "text": "",
            "video": {"id": 9, "thumbnail": "t.jpg", "urls": [{"quality": "720", "url": "https://v/720.mp4"}]},
            "subtitle_files": ["en.srt"]
        }));
        let BlockView::Video(video) = &decoded else {
            panic!("expected video, got {decoded:?}");
        };
        assert_eq!(video.video.id, 9);
        assert_eq!(video.video.urls[0].quality, "720");
        assert_eq!(video.subtitle_files, vec!["en.srt".to_string()]);
        assert_eq!(round_trip(&decoded), decoded);
    }

    #[test]
    fn code_block_reads_limits_and_templates() {
        let decoded = block(json!({
            "name": "code",
            "text": "Sum two numbers",
            "options": {
                "execution_time_limit": 5,
                "execution_memory_limit": 256,
                "limits": {"python3": {"time": 5, "memory": 256}},
                "code_templates": {"python3": "# put your python code here"},
                "samples": [["1 2", "3"]]
            }
        }));
        let BlockView::Code(code) = &decoded else {
            panic!("expected code, got {decoded:?}");
        };
        assert_eq!(code.options.limits["python3"], Limit { time: 5, memory: 256 });
        assert_eq!(code.options.samples, vec![("1 2".to_string(), "3".to_string())]);
        assert_eq!(round_trip(&decoded), decoded);
    }

    #[test]
    fn quiz_names_share_the_quiz_shape() {
        let decoded = block(json!({"name": "free-answer", "text": "Why?", "options": {}}));
        let BlockView::Quiz(quiz) = &decoded else {
            panic!("expected quiz, got {decoded:?}");
        };
        assert_eq!(quiz.kind, QuizKind::FreeAnswer);
        assert_eq!(decoded.name(), Some("free-answer"));
        assert_eq!(round_trip(&decoded), decoded);
    }

    #[test]
    fn unknown_name_keeps_every_field() {
        let raw = json!({"name": "puzzle", "text": "Drag", "options": {"pieces": [1, 2, 3]}, "extra": null});
        let decoded = block(raw.clone());
        assert!(decoded.is_unknown());
        assert_eq!(decoded.name(), Some("puzzle"));
        assert_eq!(serde_json::to_value(&decoded).unwrap(), raw);
    }

    #[test]
    fn tag_wins_over_structure() {
        let decoded = block(json!({"name": "text", "text": "intro", "video": {"id": 1}}));
        assert!(matches!(decoded, BlockView::Text(_)));
    }

    #[test]
    fn known_tag_with_bad_fields_falls_back() {
        let raw = json!({"name": "video", "video": "not an object"});
        let decoded = block(raw.clone());
        assert_eq!(decoded, BlockView::Unknown(raw.as_object().unwrap().clone()));
    }

    #[test]
    fn non_string_tag_is_unknown() {
        let decoded = block(json!({"name": 7, "text": "x"}));
        assert!(decoded.is_unknown());
    }

    #[test]
    fn untagged_blocks_use_structural_order() {
        assert!(matches!(block(json!({"video": {"id": 3}, "text": "t"})), BlockView::Video(_)));
        assert!(matches!(
            block(json!({"text": "t", "options": {"code_templates": {}}})),
            BlockView::Code(_)
        ));
        assert!(matches!(block(json!({"text": "t"})), BlockView::Text(_)));
        assert!(block(json!({"text": "t", "options": {}})).is_unknown());
    }

    #[test]
    fn non_object_block_is_unknown_and_empty() {
        let decoded = block(json!("text"));
        assert_eq!(decoded, BlockView::Unknown(RawFields::new()));
    }

    #[test]
    fn step_with_unknown_block_still_decodes() {
        let step: Step = serde_json::from_value(json!({
            "id": 5, "lesson": 2, "position": 1, "status": "ready",
            "block": {"name": "hologram", "text": "future"}
        }))
        .unwrap();
        assert_eq!(step.id, 5);
        assert_eq!(step.text(), "future");
    }
}

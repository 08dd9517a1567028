//! JSON codec with an injected warning sink.
//!
//! # Design
//! Decoding a document that does not parse, or that parses into the wrong
//! shape for a required type, is not an error at this level: the codec logs a
//! warning naming the target type and the offending text, then returns
//! `None`. The executor turns that `None` into [`ClientError::Decode`].
//!
//! Polymorphic families (`BlockView`, `Reply`, `Dataset`) carry their own
//! resolution rules in their `Deserialize` impls, so the codec needs no
//! runtime registry; the type system is the registry.
//!
//! Those impls have no handle on the codec, so `decode` installs its sink for
//! the current thread while it runs. Warnings about variants absorbed into
//! `Unknown` go through [`report`] and land in that sink. Outside a codec
//! call they fall back to `tracing`.

use std::any::type_name;
use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ClientError;

/// Receives codec warnings.
pub trait WarningSink: Send + Sync {
    fn warn(&self, message: &str);
}

/// Forwards warnings to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl WarningSink for TracingSink {
    fn warn(&self, message: &str) {
        tracing::warn!(target: "stepik_core::codec", "{message}");
    }
}

thread_local! {
    static ACTIVE_SINK: RefCell<Option<Arc<dyn WarningSink>>> = const { RefCell::new(None) };
}

/// Send a warning to the sink of the codec call running on this thread.
pub(crate) fn report(message: &str) {
    match ACTIVE_SINK.with(|active| active.borrow().clone()) {
        Some(sink) => sink.warn(message),
        None => TracingSink.warn(message),
    }
}

/// Restores the previously active sink on drop.
struct SinkScope {
    previous: Option<Arc<dyn WarningSink>>,
}

impl SinkScope {
    fn enter(sink: Arc<dyn WarningSink>) -> Self {
        let previous = ACTIVE_SINK.with(|active| active.borrow_mut().replace(sink));
        Self { previous }
    }
}

impl Drop for SinkScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        ACTIVE_SINK.with(|active| *active.borrow_mut() = previous);
    }
}

#[derive(Clone)]
pub struct JsonCodec {
    sink: Arc<dyn WarningSink>,
}

impl JsonCodec {
    pub fn new() -> Self {
        Self::with_sink(Arc::new(TracingSink))
    }

    pub fn with_sink(sink: Arc<dyn WarningSink>) -> Self {
        Self { sink }
    }

    /// Decode `json` into `T`, or log one warning and return `None`.
    pub fn decode<T: DeserializeOwned>(&self, json: &str) -> Option<T> {
        let _scope = SinkScope::enter(Arc::clone(&self.sink));
        match serde_json::from_str(json) {
            Ok(value) => Some(value),
            Err(e) => {
                self.sink.warn(&format!(
                    "failed to decode {} from json {json}: {e}",
                    type_name::<T>()
                ));
                None
            }
        }
    }

    /// Compact output is used for request bodies, pretty output for
    /// diagnostics. Response models never skip `None`, so nulls are explicit
    /// in both.
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T, pretty: bool) -> Result<String, ClientError> {
        let encoded = if pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        Ok(encoded)
    }
}

impl Default for JsonCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for JsonCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonCodec").finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::model::course::Course;
    use crate::model::step::{BlockView, Step};
    use crate::model::Page;

    /// Keeps every warning for later assertions.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub(crate) messages: Mutex<Vec<String>>,
    }

    impl RecordingSink {
        pub(crate) fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    impl WarningSink for RecordingSink {
        fn warn(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }

    fn recording_codec() -> (JsonCodec, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        (JsonCodec::with_sink(sink.clone()), sink)
    }

    #[test]
    fn malformed_json_returns_none_and_warns_once() {
        let (codec, sink) = recording_codec();
        let decoded: Option<Course> = codec.decode(r#"{"id": 1, "title": "Rust""#);
        assert!(decoded.is_none());

        let messages = sink.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Course"));
        assert!(messages[0].contains(r#"{"id": 1, "title": "Rust""#));
    }

    #[test]
    fn malformed_polymorphic_json_warns_once() {
        let (codec, sink) = recording_codec();
        let decoded: Option<BlockView> = codec.decode(r#"{"name": "text", "text": "hi""#);
        assert!(decoded.is_none());
        assert_eq!(sink.messages().len(), 1);

        let decoded: Option<Page<Step>> = codec.decode(r#"{"steps": [{"id": 1, "block": {"#);
        assert!(decoded.is_none());
        assert_eq!(sink.messages().len(), 2);
    }

    #[test]
    fn wrong_shape_for_required_type_returns_none() {
        let (codec, sink) = recording_codec();
        let decoded: Option<Page<Course>> = codec.decode(r#"{"sections": []}"#);
        assert!(decoded.is_none());
        assert_eq!(sink.messages().len(), 1);
    }

    #[test]
    fn valid_json_decodes_without_warnings() {
        let (codec, sink) = recording_codec();
        let course: Course = codec.decode(r#"{"id": 42, "title": "Rust"}"#).unwrap();
        assert_eq!(course.id, 42);
        assert!(sink.messages().is_empty());
    }

    #[test]
    fn pretty_output_keeps_explicit_nulls() {
        let codec = JsonCodec::new();
        let course = Course {
            id: 42,
            title: "Rust".into(),
            ..Default::default()
        };
        let compact = codec.encode(&course, false).unwrap();
        let pretty = codec.encode(&course, true).unwrap();

        assert!(!compact.contains('\n'));
        assert!(pretty.contains('\n'));
        assert!(pretty.contains("\"enrollment\": null"));

        let back: Course = codec.decode(&compact).unwrap();
        assert_eq!(back, course);
    }

    #[test]
    fn absorbed_variant_warns_through_the_injected_sink() {
        let (codec, sink) = recording_codec();
        let page: Page<Step> = codec
            .decode(r#"{"steps":[{"id":1,"block":{"name":"video","video":"broken"}}],"meta":{"page":1,"is_last":true}}"#)
            .unwrap();

        assert!(page.items[0].block.as_ref().is_some_and(BlockView::is_unknown));
        let messages = sink.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("BlockView"), "{}", messages[0]);
        assert!(messages[0].contains("video"), "{}", messages[0]);
    }

    #[test]
    fn non_object_variant_warns_through_the_injected_sink() {
        let (codec, sink) = recording_codec();
        let step: Step = codec.decode(r#"{"id":1,"block":42}"#).unwrap();

        assert!(step.block.as_ref().is_some_and(BlockView::is_unknown));
        assert_eq!(sink.messages().len(), 1);
    }

    #[test]
    fn sink_scope_ends_with_the_decode_call() {
        let (codec, sink) = recording_codec();
        let _: Option<Step> = codec.decode(r#"{"id":1}"#);

        let block: BlockView = serde_json::from_str(r#"{"name":"video","video":"broken"}"#).unwrap();
        assert!(block.is_unknown());
        assert!(sink.messages().is_empty());
    }

    #[test]
    fn nested_codecs_restore_the_outer_sink() {
        let (outer, outer_sink) = recording_codec();
        let (inner, inner_sink) = recording_codec();
        {
            let _scope = SinkScope::enter(Arc::clone(&outer.sink));
            let _: Option<BlockView> = inner.decode(r#"{"name":"code","options":"x"}"#);
            report("after inner decode");
        }

        assert_eq!(inner_sink.messages().len(), 1);
        assert_eq!(outer_sink.messages(), vec!["after inner decode".to_string()]);
    }
}

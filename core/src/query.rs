//! Query builders.
//!
//! # Design
//! Two builder families keep the method/parameter mapping honest:
//!
//! - [`GetQuery`] covers GET and DELETE. Parameters go into the URL and the
//!   request never has a body.
//! - [`BodyQuery`] covers POST and PUT. Parameters live in a typed
//!   [`RequestBody`] encoded as JSON under its root key, and there is no way
//!   to add a query string.
//!
//! `execute(self)` consumes the builder, so a query runs at most once.
//! Pagination hands out a fresh builder for the next page instead.
//!
//! `build()` checks path placeholders and body requirements before anything
//! touches the network, and returns the plain request for inspection.

use std::fmt;
use std::marker::PhantomData;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ClientError;
use crate::executor::Executor;
use crate::http::{HttpMethod, HttpRequest};
use crate::model::{Meta, Page, Resource};

const JSON: &str = "application/json";

/// Value of one query-string parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Text(String),
    Number(u64),
    /// Rendered as repeated `key[]=item` pairs.
    List(Vec<String>),
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Number(u64::from(value))
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<Vec<u64>> for ParamValue {
    fn from(values: Vec<u64>) -> Self {
        ParamValue::List(values.iter().map(u64::to_string).collect())
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        ParamValue::List(values)
    }
}

/// Insertion-ordered query parameters; setting a key again replaces it in
/// place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(IndexMap<String, ParamValue>);

impl Params {
    pub fn set(&mut self, key: &str, value: impl Into<ParamValue>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn validate(&self) -> Result<(), ClientError> {
        for (key, value) in &self.0 {
            if matches!(value, ParamValue::List(items) if items.is_empty()) {
                return Err(ClientError::Construction(format!("parameter `{key}` has an empty list")));
            }
        }
        Ok(())
    }

    pub fn to_query_string(&self) -> String {
        let mut pairs = Vec::new();
        for (key, value) in &self.0 {
            let key = urlencoding::encode(key);
            match value {
                ParamValue::Text(text) => pairs.push(format!("{key}={}", urlencoding::encode(text))),
                ParamValue::Number(number) => pairs.push(format!("{key}={number}")),
                ParamValue::List(items) => {
                    for item in items {
                        pairs.push(format!("{key}[]={}", urlencoding::encode(item)));
                    }
                }
            }
        }
        pairs.join("&")
    }
}

/// A resource path such as `/api/enrollments/{id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    template: &'static str,
    values: IndexMap<&'static str, String>,
}

impl PathTemplate {
    pub fn new(template: &'static str) -> Self {
        Self {
            template,
            values: IndexMap::new(),
        }
    }

    pub fn set(&mut self, name: &'static str, value: impl ToString) {
        self.values.insert(name, value.to_string());
    }

    /// Substitute every `{name}`; a missing value is a construction error.
    pub fn render(&self) -> Result<String, ClientError> {
        let mut rendered = String::with_capacity(self.template.len());
        let mut rest = self.template;
        while let Some(open) = rest.find('{') {
            rendered.push_str(&rest[..open]);
            let close = rest[open..].find('}').map(|i| open + i).ok_or_else(|| {
                ClientError::Construction(format!("unterminated placeholder in {}", self.template))
            })?;
            let name = &rest[open + 1..close];
            let value = self.values.get(name).ok_or_else(|| {
                ClientError::Construction(format!(
                    "missing path parameter `{name}` for {}",
                    self.template
                ))
            })?;
            rendered.push_str(&urlencoding::encode(value));
            rest = &rest[close + 1..];
        }
        rendered.push_str(rest);
        Ok(rendered)
    }
}

/// GET-family query: parameters in the URL, no body.
pub struct GetQuery<'a, T> {
    executor: &'a Executor,
    method: HttpMethod,
    path: PathTemplate,
    params: Params,
    _response: PhantomData<fn() -> T>,
}

impl<T> Clone for GetQuery<'_, T> {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor,
            method: self.method,
            path: self.path.clone(),
            params: self.params.clone(),
            _response: PhantomData,
        }
    }
}

impl<T> fmt::Debug for GetQuery<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GetQuery")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("params", &self.params)
            .finish()
    }
}

impl<'a, T: DeserializeOwned> GetQuery<'a, T> {
    pub(crate) fn get(executor: &'a Executor, path: &'static str) -> Self {
        Self::with_method(executor, HttpMethod::Get, path)
    }

    pub(crate) fn delete(executor: &'a Executor, path: &'static str) -> Self {
        Self::with_method(executor, HttpMethod::Delete, path)
    }

    fn with_method(executor: &'a Executor, method: HttpMethod, path: &'static str) -> Self {
        Self {
            executor,
            method,
            path: PathTemplate::new(path),
            params: Params::default(),
            _response: PhantomData,
        }
    }

    pub fn param(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.params.set(key, value);
        self
    }

    pub fn path_param(mut self, name: &'static str, value: impl ToString) -> Self {
        self.path.set(name, value);
        self
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn build(&self) -> Result<HttpRequest, ClientError> {
        self.params.validate()?;
        let mut url = self.executor.url(&self.path.render()?);
        if !self.params.is_empty() {
            url.push('?');
            url.push_str(&self.params.to_query_string());
        }
        Ok(HttpRequest {
            method: self.method,
            url,
            headers: Vec::new(),
            body: None,
        })
    }

    pub fn execute(self) -> Result<T, ClientError> {
        let request = self.build()?;
        self.executor.execute(request)
    }
}

impl<'a, R: Resource> GetQuery<'a, Page<R>> {
    /// Ask for one resource by id.
    pub fn id(self, id: u64) -> Self {
        self.ids([id])
    }

    pub fn ids(self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.param("ids", ids.into_iter().collect::<Vec<_>>())
    }

    pub fn page(self, page: u32) -> Self {
        self.param("page", page)
    }

    /// Execute and keep a continuation for the following page.
    pub fn paged(self) -> Result<Paged<'a, R>, ClientError> {
        let continuation = self.clone();
        let page = self.execute()?;
        let next = (!page.meta.is_last).then(|| continuation.page(page.meta.page.saturating_add(1)));
        Ok(Paged { page, next })
    }
}

/// A fetched page plus the query for the one after it.
#[derive(Debug)]
pub struct Paged<'a, R> {
    page: Page<R>,
    next: Option<GetQuery<'a, Page<R>>>,
}

impl<'a, R: Resource> Paged<'a, R> {
    pub fn items(&self) -> &[R] {
        &self.page.items
    }

    pub fn meta(&self) -> Meta {
        self.page.meta
    }

    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    /// Builder for the next page, if the server reported one.
    pub fn next_query(&self) -> Option<GetQuery<'a, Page<R>>> {
        self.next.clone()
    }

    /// Fetch the next page. `None` on the last page.
    pub fn fetch_next(self) -> Option<Result<Paged<'a, R>, ClientError>> {
        self.next.map(GetQuery::paged)
    }

    pub fn into_page(self) -> Page<R> {
        self.page
    }
}

/// JSON request body, sent as `{ ROOT: body }`.
pub trait RequestBody: Serialize + Default {
    const ROOT: &'static str;

    /// Reject bodies that miss required fields.
    fn validate(&self) -> Result<(), ClientError> {
        Ok(())
    }
}

/// POST-family query: parameters in a JSON body, never in the URL.
pub struct BodyQuery<'a, B, T> {
    executor: &'a Executor,
    method: HttpMethod,
    path: PathTemplate,
    pub(crate) body: B,
    _response: PhantomData<fn() -> T>,
}

impl<B: fmt::Debug, T> fmt::Debug for BodyQuery<'_, B, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyQuery")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("body", &self.body)
            .finish()
    }
}

impl<'a, B: RequestBody, T: DeserializeOwned> BodyQuery<'a, B, T> {
    pub(crate) fn post(executor: &'a Executor, path: &'static str) -> Self {
        Self::with_method(executor, HttpMethod::Post, path)
    }

    pub(crate) fn put(executor: &'a Executor, path: &'static str) -> Self {
        Self::with_method(executor, HttpMethod::Put, path)
    }

    fn with_method(executor: &'a Executor, method: HttpMethod, path: &'static str) -> Self {
        Self {
            executor,
            method,
            path: PathTemplate::new(path),
            body: B::default(),
            _response: PhantomData,
        }
    }

    /// Replace the whole body.
    pub fn body(mut self, body: B) -> Self {
        self.body = body;
        self
    }

    pub fn path_param(mut self, name: &'static str, value: impl ToString) -> Self {
        self.path.set(name, value);
        self
    }

    pub fn build(&self) -> Result<HttpRequest, ClientError> {
        self.body.validate()?;
        let url = self.executor.url(&self.path.render()?);

        let mut envelope = Map::new();
        envelope.insert(B::ROOT.to_string(), serde_json::to_value(&self.body)?);
        let body = self.executor.codec().encode(&Value::Object(envelope), false)?;

        Ok(HttpRequest {
            method: self.method,
            url,
            headers: vec![("content-type".to_string(), JSON.to_string())],
            body: Some(body),
        })
    }

    pub fn execute(self) -> Result<T, ClientError> {
        let request = self.build()?;
        self.executor.execute(request)
    }
}

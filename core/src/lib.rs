//! Blocking API client core for the Stepik learning platform.
//!
//! # Overview
//! Callers build typed queries through [`StepikClient`], execute them, and get
//! decoded domain values back. They never see raw JSON.
//!
//! # Design
//! - `StepikClient` is an explicitly constructed facade. It holds an
//!   [`Executor`] and hands out query builders that borrow it.
//! - Query builders only describe a request. `build()` yields a plain
//!   [`HttpRequest`], so the exact wire form is inspectable without I/O.
//! - The executor owns the auth/refresh/decode sequence and talks to the
//!   network through the [`Transport`] trait.
//! - Polymorphic payloads (`BlockView`, `Reply`, `Dataset`) resolve to a closed
//!   set of known variants plus an `Unknown` fallback that keeps raw fields.

pub mod auth;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod executor;
pub mod http;
pub mod model;
pub mod query;
pub mod resources;
pub mod variant;

#[cfg(test)]
mod testing;

pub use auth::{AuthError, AuthManager, Credential, OAuthManager, StaticAuth};
pub use client::StepikClient;
pub use codec::{JsonCodec, TracingSink, WarningSink};
pub use config::{ClientConfig, OAuthConfig};
pub use error::ClientError;
pub use executor::Executor;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use model::{Meta, NoContent, Page, Resource};
pub use query::{BodyQuery, GetQuery, Paged, ParamValue, Params, PathTemplate, RequestBody};
pub use resources::{NewAttempt, NewEnrollment, NewMetric, NewSubmission, ProfileUpdate, Resources};
pub use variant::{RawFields, VariantFamily};

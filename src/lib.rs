//! # quimby
//!
//! A controller-based REST framework over an async HTTP/1.1 transport.
//!
//! Controllers declare slash-delimited route templates such as
//! `users/{{id}}`. The [`Router`] stores them in a segment trie; each request
//! gets a [`Context`] that parses the query string, resolves the route,
//! extracts the `{{placeholder}}` values and authenticates the caller before
//! the matched verb handler runs. The [`Dispatcher`] then serializes the
//! model or error the handler recorded.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use quimby::context::Context;
//! use quimby::controller::{Controller, HealthCheckController};
//! use quimby::http::StatusCode;
//! use quimby::server::{Dispatcher, Server};
//!
//! struct Greeter;
//!
//! impl Controller for Greeter {
//!     fn routes(&self) -> Vec<String> {
//!         vec!["hello/{{name}}".into()]
//!     }
//!
//!     fn authenticate(&self, _ctx: &Context) -> bool {
//!         true
//!     }
//!
//!     fn get(&self, ctx: &mut Context) {
//!         let name = ctx.uri_parameters().get("name").unwrap_or("world").to_owned();
//!         ctx.set_response(&format!("Hello, {name}!"), StatusCode::Ok);
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut dispatcher = Dispatcher::new(None);
//!     dispatcher.add_controller(Arc::new(Greeter))?;
//!     dispatcher.add_controller(Arc::new(HealthCheckController))?;
//!
//!     Server::bind("127.0.0.1:8080", dispatcher).await?.run().await?;
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod controller;
pub mod error;
pub mod http;
pub mod router;
pub mod server;
pub mod testing;

pub use context::{Context, FormModel};
pub use controller::Controller;
pub use error::{ErrorCode, FieldError, RestError};
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use router::{Route, Router, RouterError};
pub use server::{Dispatcher, Server, ServerConfig, ServerError};

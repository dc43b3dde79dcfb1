//! SPL pipeline execution engine.
//!
//! A run drains a queue of [`PipelineDescriptor`](spl_types::PipelineDescriptor)s
//! held in a [`RequestRecord`](spl_types::RequestRecord):
//!
//! - [`executor::PipelineEngine`] dequeues descriptors, charges TTL, resolves
//!   each URI (runtime definition, module manifest, compiled-in handler) and
//!   invokes it
//! - [`workspace::WorkspaceStore`] caches fetched resources; a miss schedules
//!   a fetch ahead of a re-entry of the waiting handler
//! - [`parser::CommandParser`] turns a `_!_`-delimited command line into
//!   descriptors, narrowing argument schemas segment by segment
//! - [`actions`] provides the `spl/...` platform actions
//!
//! # Examples
//!
//! ```rust
//! use spl_engine::{ExecutionContext, PipelineEngine, WorkspaceStore, executor::{Completion, HandlerRegistry}};
//! use spl_registry::ActionResolver;
//! use spl_types::{PipelineDescriptor, RequestRecord};
//!
//! let mut handlers = HandlerRegistry::new();
//! handlers.register_fn("demo/hello", |scope| {
//!     scope.request.set_value("demo/hello", serde_json::json!("hi"));
//!     Ok(Completion::Completed)
//! });
//! let engine = PipelineEngine::new(ActionResolver::empty(), handlers);
//!
//! let mut request = RequestRecord::with_pipeline([PipelineDescriptor::new("demo/hello")]);
//! let mut context = ExecutionContext::new(10);
//! let summary = engine.run(&mut request, &mut context, &mut WorkspaceStore::new());
//!
//! assert!(summary.succeeded());
//! assert_eq!(context.ttl, 9);
//! assert_eq!(request.value_of("demo/hello"), Some(&serde_json::json!("hi")));
//! ```

pub mod actions;
pub mod context;
pub mod error;
pub mod executor;
pub mod parser;
pub mod templates;
pub mod workspace;

pub use context::{ConsoleMode, ExecutionContext};
pub use error::{ActionFailure, EngineError, ParseError};
pub use executor::{ActionHandler, ActionScope, Completion, EngineState, HandlerRegistry, PipelineEngine, RunSummary};
pub use parser::{CommandParser, ParserOptions};
pub use workspace::WorkspaceStore;

//! Palaver is a full-screen terminal chat client for a hosted generative-AI
//! model. It forwards one prompt at a time to the model's generate endpoint
//! (with the service's code-execution tool enabled) and renders the reply as
//! markdown in a scrolling conversation log.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the conversation log, the request lifecycle (one request
//!   in flight at a time), configuration, and the model-service client.
//! - [`ui`] renders the terminal interface and runs the interactive event
//!   loop that drives user input and display updates.
//! - [`api`] defines the wire payloads exchanged with the generate endpoint.
//!
//! The runtime entrypoint lives in the binary crate (`src/main.rs`), which
//! resolves configuration and credentials and dispatches into
//! [`ui::chat_loop`] for the interactive session.

pub mod api;
pub mod core;
pub mod logging;
pub mod ui;
pub mod utils;

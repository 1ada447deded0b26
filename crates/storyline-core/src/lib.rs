//! Core types and trait definitions for the Storyline interactive-fiction
//! engine.
//!
//! This crate is deliberately free of HTTP and database dependencies. It holds
//! the narrative graph model (stories, pages, choices), the play-session
//! engine that walks that graph, and the [`store::StoryStore`] abstraction the
//! engine reads and writes through.

// Store methods spell out `+ Send` on their futures.
#![allow(async_fn_in_trait)]

pub mod engine;
pub mod error;
pub mod graph;
pub mod import;
pub mod session;
pub mod store;
pub mod story;
pub mod view;

pub use engine::PlayEngine;
pub use error::{Error, Result};

//! JSON REST API for Storyline.
//!
//! Exposes axum [`Router`]s backed by a [`PlayEngine`] over any
//! [`storyline_core::store::StoryStore`]. Auth, TLS, and transport concerns
//! are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! Router::new()
//!   .merge(storyline_api::reader_router(engine.clone()))
//!   .nest("/author", storyline_api::author_router(engine).route_layer(auth))
//! ```

pub mod choices;
pub mod error;
pub mod pages;
pub mod play;
pub mod stories;

use axum::{
  Router,
  routing::{get, post, put},
};
use storyline_core::{PlayEngine, store::StoryStore};

pub use error::ApiError;

/// Routes for readers: browsing published stories and playing them.
pub fn reader_router<S>(engine: PlayEngine<S>) -> Router<()>
where
  S: StoryStore + 'static,
{
  Router::new()
    .route("/stories", get(stories::list::<S>))
    .route("/stories/{id}", get(stories::get_one::<S>))
    .route("/stories/{id}/start", get(play::start_view::<S>))
    .route("/stories/{id}/sessions", post(play::start::<S>))
    .route("/stories/{id}/restart", post(play::restart::<S>))
    .route("/pages/{id}", get(pages::view::<S>))
    .route("/sessions/{id}", get(play::view::<S>))
    .route("/sessions/{id}/choices/{choice_id}", post(play::advance::<S>))
    .with_state(engine)
}

/// Routes for authors, relative to wherever the caller nests them.
pub fn author_router<S>(engine: PlayEngine<S>) -> Router<()>
where
  S: StoryStore + 'static,
{
  Router::new()
    // Stories
    .route("/stories", get(stories::list_all::<S>).post(stories::create::<S>))
    .route(
      "/stories/{id}",
      get(stories::get_one::<S>)
        .patch(stories::update::<S>)
        .delete(stories::delete::<S>),
    )
    .route("/stories/{id}/start_page", put(stories::set_start_page::<S>))
    .route("/stories/{id}/validate", get(stories::validate::<S>))
    .route("/stories/{id}/completions", get(stories::completions::<S>))
    .route("/import", post(stories::import::<S>))
    // Pages
    .route("/stories/{id}/pages", get(pages::list::<S>).post(pages::create::<S>))
    .route(
      "/pages/{id}",
      get(pages::get_one::<S>)
        .patch(pages::update::<S>)
        .delete(pages::delete::<S>),
    )
    // Choices
    .route("/pages/{id}/choices", get(choices::list::<S>).post(choices::create::<S>))
    .route(
      "/choices/{id}",
      get(choices::get_one::<S>)
        .patch(choices::update::<S>)
        .delete(choices::delete::<S>),
    )
    .with_state(engine)
}

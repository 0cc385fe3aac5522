//! # glimpse-api
//!
//! The REST surface of the Glimpse backend: the [`Backend`] trait every
//! consumer programs against, plus the production [`RestBackend`] built on
//! `reqwest`.  The backend itself is an opaque external service; this crate
//! only knows its paths and payload shapes.

pub mod backend;
pub mod rest;

mod error;

pub use backend::{AuthResponse, Backend, SignUpRequest};
pub use error::{ApiError, Result};
pub use rest::RestBackend;

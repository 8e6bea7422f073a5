//! # API Route Modules
//!
//! Each module exposes a `router()` returning `Router<AppState>`; the
//! routers are merged behind the auth middleware in [`crate::app`].

pub mod disputes;
pub mod jurors;
pub mod observability;
pub mod settlements;

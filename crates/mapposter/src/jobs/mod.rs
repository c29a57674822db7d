//! Job records and their lifecycle.
//!
//! A [`Job`] is persisted through the [`JobStore`] and only ever advances
//! `pending → processing → completed | failed`, driven by [`JobLifecycle`].

pub mod error;
pub mod lifecycle;
pub mod model;
pub mod store;

pub use error::StoreError;
pub use lifecycle::JobLifecycle;
pub use model::{Job, JobStatus, JobUpdate};
pub use store::JobStore;

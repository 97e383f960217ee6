//! HTTP handlers for ideaboard-api, one module per resource.

pub mod feedbacks;
pub mod files;
pub mod groups;
pub mod health;
pub mod ideas;
pub mod tags;
pub mod users;

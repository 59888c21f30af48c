//! smartgoal client
//!
//! Typed async client for the smartgoal backend, the response envelope every
//! call returns, and the view state that re-derives assignment status after
//! each fetch.

pub mod api;
pub mod envelope;
pub mod error;
pub mod view;

pub use api::{ApiClient, UPLOAD_FIELD};
pub use envelope::{decode_body, ApiResponse};
pub use error::{ApiError, PARSE_FAILURE_SUFFIX};
pub use view::{load_session, AssignmentView, Generation, Loadable, RosterView, Ticket};

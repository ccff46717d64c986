//! Domain types returned by repositories and serialized by the API.
//!
//! API payloads use `camelCase` field names to match the mini-app.

pub mod access_request;
pub mod allowed_phone;
pub mod product;
pub mod receipt;
pub mod shift;
pub mod user;

pub use access_request::{AccessRequest, AccessRequestView, Applicant};
pub use allowed_phone::AllowedPhone;
pub use product::{Product, ProductChanges, ProductDraft};
pub use receipt::Receipt;
pub use shift::{ShiftConsumption, ShiftReport};
pub use user::{User, UserChanges};

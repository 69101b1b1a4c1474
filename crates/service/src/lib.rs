//! Service layer for the user record API.
//! - Owns the file-backed durability store and the collection operations.
//! - Keeps HTTP concerns out; handlers in the `server` crate translate
//!   `ServiceError` into status codes.

pub mod errors;
pub mod file;
pub mod runtime;
pub mod storage;

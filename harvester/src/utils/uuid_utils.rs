//! Identifier generation.

use uuid::Uuid;

/// Generates a new UUID v4.
#[must_use]
pub fn generate_uuid() -> Uuid {
    Uuid::new_v4()
}

/// Generates an identifier for one collection request.
#[must_use]
pub fn generate_request_id() -> String {
    format!("req_{}", generate_uuid().simple())
}

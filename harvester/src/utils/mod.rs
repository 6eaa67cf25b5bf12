//! Utility functions for identifiers, timestamps and link handling.

mod links;
pub mod timestamps;
mod uuid_utils;

pub use links::{canonical_link, link_slug};
pub use timestamps::{age_secs, epoch_millis, now_utc, Timestamp};
pub use uuid_utils::{generate_request_id, generate_uuid};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_uuid_is_valid() {
        let id = generate_uuid();
        assert_eq!(id.get_version_num(), 4);
    }

    #[test]
    fn test_request_ids_are_unique() {
        assert_ne!(generate_request_id(), generate_request_id());
    }
}

//! Season id helpers

use uuid::Uuid;

/// Generate a new UUIDv4
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Fresh season id in its canonical string form
pub fn generate_id() -> String {
    generate().to_string()
}

//! Session identifier generation.

use std::fmt::Debug;

use uuid::Uuid;

/// A source of session identifiers.
///
/// Identifiers must be unguessable: they are the only credential a session
/// cookie carries.
pub trait IdGenerator: Debug + Send + Sync + 'static {
    /// Returns a fresh identifier.
    fn generate(&self) -> String;
}

/// Generates random (version 4) UUIDs, i.e. 122 bits of entropy.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

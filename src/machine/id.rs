use rand::RngCore;
use rand::rngs::OsRng;
use uuid::{Builder, Uuid};

use crate::error::MachineError;

/// Source of identifiers for jobs submitted without one.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> Result<String, MachineError>;
}

impl<F> IdGenerator for F
where
    F: Fn() -> Result<String, MachineError> + Send + Sync,
{
    fn generate(&self) -> Result<String, MachineError> {
        self()
    }
}

/// UUIDv4 identifiers from the operating system's entropy source.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsIdGenerator;

impl IdGenerator for OsIdGenerator {
    fn generate(&self) -> Result<String, MachineError> {
        generate_job_id()
    }
}

/// Generate a random job identifier in UUID version 4 format.
///
/// If the entropy source fails the error is returned; there is no weaker
/// fallback.
pub fn generate_job_id() -> Result<String, MachineError> {
    let mut bytes = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| MachineError::IdGeneration(e.to_string()))?;

    // Builder fixes the version (4) and RFC 4122 variant bits.
    let id: Uuid = Builder::from_random_bytes(bytes).into_uuid();
    Ok(id.hyphenated().to_string())
}

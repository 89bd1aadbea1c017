//! Stable cache identity for step sequences.
//!
//! The hashing collaborator turns the final ordered step sequence into a
//! deterministic, order-sensitive identity string. The default digests a
//! canonical byte encoding of the sequence with SHA-256; deployments that
//! need a different identity scheme implement [`StepHasher`] themselves.

use sha2::{Digest, Sha256};

use crate::steps::{ParamValue, Step};

/// Hashing collaborator: ordered step sequence → stable identity string.
///
/// Implementations must be deterministic and order-sensitive: the same
/// sequence always hashes to the same string, and any change to a step, a
/// parameter, or the order yields a different one.
pub trait StepHasher: Send + Sync {
    fn digest(&self, steps: &[Step]) -> String;
}

/// Default hasher: SHA-256 over a canonical byte encoding, hex-encoded.
///
/// Each step contributes its name, its command flag, and its parameters in
/// sorted key order, with separator bytes between fields so adjacent
/// values cannot collide.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256StepHasher;

impl StepHasher for Sha256StepHasher {
    fn digest(&self, steps: &[Step]) -> String {
        let mut hasher = Sha256::new();
        for step in steps {
            hasher.update(step.name.as_bytes());
            hasher.update([0x00, u8::from(step.command)]);
            for (key, value) in &step.params {
                hasher.update(key.as_bytes());
                hasher.update([0x01]);
                match value {
                    ParamValue::Text(text) => hasher.update(text.as_bytes()),
                    ParamValue::Flag(flag) => hasher.update([0x02, u8::from(*flag)]),
                }
                hasher.update([0x01]);
            }
            hasher.update([0xff]);
        }
        hex::encode(hasher.finalize())
    }
}

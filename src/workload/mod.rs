//! Synthetic workload subsystem.
//!
//! # Responsibilities
//! - Burn a tunable amount of CPU and memory per request
//! - Report parameter rejections as `WorkloadError`
//!
//! # Design Decisions
//! - The computation is a load generator only. It protects nothing, and
//!   its input and salt are fixed constants.
//! - Work grows as 2^cost, so each unit of cost doubles request latency
//! - Output is passed through `black_box` and logged so it cannot be elided

use std::hint::black_box;

/// Error raised when the workload primitive rejects its parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct WorkloadError {
    message: String,
}

impl WorkloadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A CPU-bound computation whose running time grows with `cost`.
pub trait SyntheticWorkload: Send + Sync + 'static {
    /// Run the workload once. `cost` is at least 1.
    fn run(&self, cost: u64) -> Result<Vec<u8>, WorkloadError>;
}

const INPUT: &[u8] = b"fidget spinner";
const SALT: [u8; 8] = [0x4f, 0xe5, 0x3d, 0xa6, 0x5e, 0x97, 0x5c, 0x50];
const BLOCK_SIZE: u32 = 8;
const PARALLELISM: u32 = 1;
const OUTPUT_LEN: usize = 32;

/// Load generator backed by scrypt's memory-hard mixing function.
///
/// `cost` is used as scrypt's `log_n`, so one run touches
/// `128 * r * 2^cost` bytes. A non-zero `max_memory_bytes` rejects costs whose
/// working set would exceed it instead of letting the allocation abort the
/// process.
#[derive(Debug, Clone)]
pub struct ScryptWorkload {
    max_memory_bytes: u64,
}

impl ScryptWorkload {
    pub fn new(max_memory_bytes: u64) -> Self {
        Self { max_memory_bytes }
    }

    /// Bytes of scratch memory a run at `log_n` needs, if representable.
    fn working_set(log_n: u8) -> Option<u64> {
        let n = 1u64.checked_shl(u32::from(log_n))?;
        (128 * u64::from(BLOCK_SIZE)).checked_mul(n)
    }
}

impl SyntheticWorkload for ScryptWorkload {
    fn run(&self, cost: u64) -> Result<Vec<u8>, WorkloadError> {
        let log_n = u8::try_from(cost)
            .map_err(|_| WorkloadError::new(format!("cost {cost} is too large")))?;

        if self.max_memory_bytes > 0 {
            match Self::working_set(log_n) {
                Some(bytes) if bytes <= self.max_memory_bytes => {}
                _ => {
                    return Err(WorkloadError::new(format!(
                        "cost {cost} needs more than {} bytes of memory",
                        self.max_memory_bytes
                    )))
                }
            }
        }

        let params = scrypt::Params::new(log_n, BLOCK_SIZE, PARALLELISM, OUTPUT_LEN)
            .map_err(|e| WorkloadError::new(e.to_string()))?;

        let mut output = vec![0u8; OUTPUT_LEN];
        scrypt::scrypt(black_box(INPUT), &SALT, &params, &mut output)
            .map_err(|e| WorkloadError::new(e.to_string()))?;

        let output = black_box(output);
        tracing::debug!(cost, derived = ?output, "Workload finished");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_cost_produces_output() {
        let workload = ScryptWorkload::new(0);
        let out = workload.run(1).unwrap();
        assert_eq!(out.len(), OUTPUT_LEN);
    }

    #[test]
    fn output_is_deterministic() {
        let workload = ScryptWorkload::new(0);
        assert_eq!(workload.run(4).unwrap(), workload.run(4).unwrap());
        assert_ne!(workload.run(4).unwrap(), workload.run(5).unwrap());
    }

    #[test]
    fn memory_ceiling_rejects_large_cost() {
        // 128 * 8 * 2^10 = 1 MiB
        let workload = ScryptWorkload::new(1 << 20);
        assert!(workload.run(10).is_ok());

        let err = workload.run(11).unwrap_err();
        assert!(err.message().contains("memory"));
    }

    #[test]
    fn oversized_cost_is_an_error() {
        let workload = ScryptWorkload::new(0);
        let err = workload.run(300).unwrap_err();
        assert_eq!(err.to_string(), "cost 300 is too large");
    }

    #[test]
    fn primitive_rejection_is_propagated() {
        // scrypt requires log_n < 16 * r, so 128 is rejected before any allocation.
        let workload = ScryptWorkload::new(0);
        assert!(workload.run(128).is_err());
    }
}

//! Tunables for the buffered tee.
//!
//! `io_unit` bounds each read from the source; `block_size` is the spill
//! allocation granularity. Memory held by the tee is roughly one `io_unit`
//! in flight plus a recycled consumer buffer; everything else lives in the
//! spill file.

/// Tee sizing limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TeeLimits {
    /// Maximum bytes requested from the source per read.
    ///
    /// Default: 16 KiB.
    pub io_unit: usize,

    /// Size of one spill block.
    ///
    /// Default: 1 MiB.
    pub block_size: usize,
}

impl TeeLimits {
    /// Defaults for general streaming.
    pub const DEFAULT: Self = Self {
        io_unit: 16 * 1024,
        block_size: 1024 * 1024,
    };

    /// Tiny blocks that force frequent block turnover. Intended for tests.
    pub const SMALL: Self = Self {
        io_unit: 64,
        block_size: 256,
    };

    /// Validates that limits are internally consistent.
    ///
    /// # Panics
    ///
    /// Panics if limits are invalid (configuration bug).
    #[track_caller]
    pub const fn validate(&self) {
        assert!(self.io_unit > 0, "io unit must be > 0");
        assert!(self.block_size > 0, "block size must be > 0");
        assert!(
            self.io_unit <= 64 * 1024 * 1024,
            "io unit > 64MB is unreasonable"
        );
        assert!(
            self.block_size <= 1024 * 1024 * 1024,
            "block size > 1GB is unreasonable"
        );
    }

    /// Non-panicking validation for runtime configuration.
    pub const fn try_validate(&self) -> Result<(), &'static str> {
        if self.io_unit == 0 {
            return Err("io unit must be > 0");
        }
        if self.block_size == 0 {
            return Err("block size must be > 0");
        }
        if self.io_unit > 64 * 1024 * 1024 {
            return Err("io unit > 64MB is unreasonable");
        }
        if self.block_size > 1024 * 1024 * 1024 {
            return Err("block size > 1GB is unreasonable");
        }
        Ok(())
    }
}

impl Default for TeeLimits {
    fn default() -> Self {
        Self::DEFAULT
    }
}

const _: () = TeeLimits::DEFAULT.validate();
const _: () = TeeLimits::SMALL.validate();

//! Window sizing for the reverse scanner.

/// Reverse scanner window limits.
///
/// The window starts at `initial_buf` bytes and doubles whenever a single
/// token fills it, up to `max_buf`. A token longer than `max_buf` is a
/// fatal `TokenTooLong` error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanLimits {
    /// Initial window size in bytes.
    ///
    /// Default: 4 KiB.
    pub initial_buf: usize,

    /// Largest window (and therefore longest token) in bytes.
    ///
    /// Default: 64 KiB.
    pub max_buf: usize,
}

impl ScanLimits {
    /// Defaults for line-oriented text.
    pub const DEFAULT: Self = Self {
        initial_buf: 4 * 1024,
        max_buf: 64 * 1024,
    };

    /// Validates that limits are internally consistent.
    ///
    /// # Panics
    ///
    /// Panics if limits are invalid (configuration bug).
    #[track_caller]
    pub const fn validate(&self) {
        assert!(self.initial_buf > 0, "initial buffer must be > 0");
        assert!(
            self.max_buf >= self.initial_buf,
            "max buffer must be >= initial buffer"
        );
        assert!(
            self.max_buf <= 1024 * 1024 * 1024,
            "max buffer > 1GB is unreasonable"
        );
    }

    /// Non-panicking validation for runtime configuration.
    pub const fn try_validate(&self) -> Result<(), &'static str> {
        if self.initial_buf == 0 {
            return Err("initial buffer must be > 0");
        }
        if self.max_buf < self.initial_buf {
            return Err("max buffer must be >= initial buffer");
        }
        if self.max_buf > 1024 * 1024 * 1024 {
            return Err("max buffer > 1GB is unreasonable");
        }
        Ok(())
    }
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self::DEFAULT
    }
}

const _: () = ScanLimits::DEFAULT.validate();

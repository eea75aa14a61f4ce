//! Subcommand implementations.

pub mod inspect;
pub mod replay;

/// Process exit codes.
pub mod exit_codes {
    /// Success exit code.
    pub const SUCCESS: u8 = 0;
    /// General error exit code (configuration, I/O).
    pub const ERROR: u8 = 1;
    /// A replayed step did not match its expectation.
    pub const SCENARIO_MISMATCH: u8 = 2;
}

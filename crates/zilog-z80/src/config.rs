//! Runtime options.

/// Behavioural variants chosen when the CPU is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Bump the low seven bits of R on every opcode fetch, prefixes
    /// included. When off, R only changes through `LD R,A`.
    pub increment_refresh: bool,
}

//! cgminer API support for the Avalon Nano.
//!
//! - [`client`]: one short-lived TCP connection per command
//! - [`parser`]: pure decoding of the `|`/`,`/`Key[Value]` reply format
//! - [`readings`]: the partial records the parser produces

pub mod client;
pub mod parser;
pub mod readings;

pub use client::CgminerClient;
pub use parser::parse;
pub use readings::{
    AvalonReadings, EstatsReadings, POOL_SLOTS, PoolReadings, StatusReadings, SummaryReadings,
    VersionReadings,
};

/// The commands one Avalon acquisition issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Summary,
    /// Extended stats, carrying the `MM ID0=` sub-record.
    Estats,
    Version,
    Pools,
}

impl Command {
    /// Order of one acquisition. The first entry is the primary command:
    /// if it fails the whole acquisition fails.
    pub const ACQUISITION_ORDER: [Command; 4] = [
        Command::Summary,
        Command::Estats,
        Command::Version,
        Command::Pools,
    ];

    /// Bytes written on the wire (no terminator).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Estats => "estats",
            Self::Version => "version",
            Self::Pools => "pools",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub mod cadence;
pub mod domain;
pub mod error;
pub mod ports;
pub mod selector;
pub mod summarizer;

pub use cadence::{draw_fraction, is_eligible, CadenceCheck, CadencePolicy, SECONDS_PER_DAY};
pub use domain::{Book, LibrarySnapshot, LibraryStats, Post, ProgressLabel};
pub use error::{CoreError, CoreResult};
pub use ports::{HistoryStore, PortError, PortResult, PublishAck, Publisher, SnapshotSource};
pub use selector::{select_next_post, Decision, SelectorSettings};
pub use summarizer::{CandidateKind, DrawThresholds, MessageStyle, Summarizer};

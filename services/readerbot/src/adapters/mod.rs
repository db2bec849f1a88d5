pub mod db;
pub mod log_publisher;
pub mod mastodon;
pub mod sheet;

pub use db::SqliteHistoryStore;
pub use log_publisher::LogPublisher;
pub use mastodon::MastodonPublisher;
pub use sheet::SheetSnapshotSource;

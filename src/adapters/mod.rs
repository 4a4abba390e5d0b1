pub mod api_server;
pub mod feed;
pub mod postgres;

pub use api_server::start_api_server;
pub use feed::{parse_feed_body, FeedClient, HistorySource};
pub use postgres::PostgresStore;

#[cfg(test)]
pub use feed::MockHistorySource;

pub mod buffer;
pub mod ingest;

pub use buffer::{LogBuffer, LogQuery, LogQueryResult, LOG_BUFFER_CAPACITY, LOG_QUERY_LIMIT};
pub use ingest::{extract_source_tag, normalize, LogCall, LogIngestor, LogSink};

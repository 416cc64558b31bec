//! Transport boundary - where statements leave the engine.
//!
//! The engine never executes SQL. It hands an ordered batch of statements to
//! a [`QueryTransport`] and gets back, per statement, the rows it produced:
//!
//! ```text
//! request:  ["DROP TABLE ...", "CREATE TEMPORARY TABLE ...", "SELECT count(*) ...", "SELECT ..."]
//! response: [[], [], [[42]], [["Spring", 12], ["Autumn", 30]]]
//! ```
//!
//! Cells are plain JSON values; decoding them is the field codecs' job.
//! There is no timeout or retry: a stalled executor stalls its fetch.

mod error;
mod process;

pub use error::{TransportError, TransportResult};
pub use process::ProcessTransport;

use async_trait::async_trait;

use crate::query::Row;

/// Rows produced by one statement.
pub type ResultSet = Vec<Row>;

/// Executes statement batches.
///
/// Implementations must return exactly one result set per statement, in
/// statement order.
#[async_trait(?Send)]
pub trait QueryTransport {
    async fn execute(&self, statements: &[String]) -> TransportResult<Vec<ResultSet>>;
}

/// Encode a statement batch in the wire format.
pub fn encode_request(statements: &[String]) -> TransportResult<Vec<u8>> {
    serde_json::to_vec(statements).map_err(TransportError::SerializeFailed)
}

/// Decode an executor response and check it has one result set per statement.
pub fn decode_response(bytes: &[u8], expected: usize) -> TransportResult<Vec<ResultSet>> {
    let results: Vec<ResultSet> =
        serde_json::from_slice(bytes).map_err(TransportError::DeserializeFailed)?;
    if results.len() != expected {
        return Err(TransportError::ResultCountMismatch {
            expected,
            actual: results.len(),
        });
    }
    Ok(results)
}

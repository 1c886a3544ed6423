// Dictionary encoding for load batches: collect each batch's distinct column
// values, give the new ones surrogate keys, and append them to the column
// dictionaries.

mod batch;
pub mod commands;
mod schema;
mod text;

#[cfg(test)]
mod test;

pub use batch::{BatchReport, ColumnOutcome, ColumnStatus, LoadBatch};
pub use schema::{parse_column, parse_schema};
pub use text::{TextFormat, TextPartition, TextRows};

// Finding the values a load batch adds to each column's dictionary. Rows
// are scanned partition by partition, each partition on its own, and the
// per-partition results are merged per column against what the dictionary
// already holds.

mod assemble;
mod collect;
mod order;
mod parser;


pub use assemble::{assemble_column, group_by_column, merge_sorted, NewValues};
pub use collect::{PartitionCollector, PartitionDistinct, Row};
pub use order::{compare_bytes, is_strictly_ascending, sort_distinct};
pub use parser::{split_tokens, ColumnSlots, DistinctSets, ValueParser};

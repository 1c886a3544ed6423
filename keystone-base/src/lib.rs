mod column;
mod error;


pub use column::{
    ColumnDescriptor, ColumnId, ColumnKind, DelimiterTable, Schema, SurrogateKey,
    FIRST_SURROGATE_KEY, NO_SURROGATE_KEY,
};
pub use error::{err, Error, Result};

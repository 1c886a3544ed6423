mod config;
mod logging;


pub use config::{
    CollectFailurePolicy, DictionaryConfig, Properties, CHUNK_SIZE_PROPERTY,
    COLLECT_FAILURE_PROPERTY, DEFAULT_CHUNK_SIZE, ENV_PREFIX,
};
pub use logging::init_logging;

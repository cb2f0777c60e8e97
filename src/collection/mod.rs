//! Data collections: repeat a template once per item of a data source.

pub mod config;
pub mod expand;
pub mod state;

pub use config::{CollectionDataSource, DataCollectionConfig, DataCollectionDef};
pub use state::{merge_state_maps, CollectionState, CollectionStateMap, CollectionStateVariableType};

//! Dataset Module
//!
//! Loading, cleaning and splitting of the labeled measurement table.

pub mod loader;
pub mod split;

pub use loader::{load_csv, read_csv, Dataset, LoadOptions};
pub use split::{stratified_split, Split, DEFAULT_SEED, DEFAULT_TEST_SIZE};

//! Labeled crop dataset loading and splitting.

pub mod loader;
pub mod split;

pub use loader::{CropDataset, DatasetError, Labels, load_csv, read_csv};
pub use split::{Split, train_test_split};

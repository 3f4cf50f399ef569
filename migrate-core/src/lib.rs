pub mod directory;
pub mod migrate;

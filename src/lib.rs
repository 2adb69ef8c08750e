pub mod archive;
pub mod art;
pub mod bundle;
pub mod bundle_fs;
pub mod commands;
pub mod error;
pub mod path;
pub mod properties;
pub mod settings;

pub use error::{Error, Result};

pub mod calendar;
pub mod config;
pub mod document;
pub mod error;
pub mod frontmatter;
pub mod git;
pub mod io;
pub mod memory;
pub mod paths;
pub mod planning;
pub mod process;
pub mod skills;
pub mod store;
pub mod types;

pub use error::{KomorebiError, Result};

// lib.rs - droprust scanning engine
// Purpose: Detect how a CMS host signals existing resources, then enumerate plugins,
//          themes, version and interesting files against that signal

pub mod cli;
pub mod cms;
pub mod detect;
pub mod enumerate;
pub mod error;
pub mod interesting;
pub mod output;
pub mod pool;
pub mod probe;
pub mod report;
pub mod scan;
pub mod target;
pub mod version;
pub mod wordlist;

#[cfg(test)]
mod testing;

pub use error::{Result, ScanError};

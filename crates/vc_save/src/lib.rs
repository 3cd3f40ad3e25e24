#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// no_std support

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod builder;
mod codec;
mod error;
mod indexer;
mod persister;
mod record;
mod resolver;
mod table;
mod teardown;
mod validate;

pub mod format;

#[cfg(test)]
mod testing;

// -----------------------------------------------------------------------------
// Top-Level exports

pub use error::{LoadError, LoadMode, SaveError};
pub use format::SaveData;
pub use persister::{Persister, SaveOptions, load, save};
pub use teardown::detach_and_free;

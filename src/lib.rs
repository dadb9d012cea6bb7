//! stackland - land stacked pull requests in order
//!
//! Merges the bottom PR of a stack, brings trunk up to date, restacks what
//! remains, force-pushes descendants and re-points their PR bases, then moves
//! on to the next branch. All git, stack-tool and host access goes through
//! the traits in [`ports`].

pub mod config;
pub mod error;
pub mod land;
pub mod poll;
pub mod ports;
pub mod progress;
pub mod submit;
pub mod types;

pub use error::{Error, Result};

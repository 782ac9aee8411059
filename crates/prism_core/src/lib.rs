//! # Prism Core
//!
//! Foundational types shared by every Prism crate:
//!
//! - [`Data`] / [`CompoundData`]: dynamically-typed parameter values
//! - [`ContentHasher`] / [`Hash128`]: xxh3-128 content hashing used as cache keys
//! - [`MessageHandler`]: structured message channel (severity + context + text)
//! - [`PrismError`]: the error taxonomy and [`Result`] alias

pub mod data;
pub mod errors;
pub mod hash;
pub mod messages;

pub use data::{CompoundData, Data};
pub use errors::{PrismError, RenderError, Result};
pub use hash::{ContentHash, ContentHasher, Hash128};
pub use messages::{Message, MessageHandler, Severity};

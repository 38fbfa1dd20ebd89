//! Centralized error type for the keytide umbrella crate.
//!
//! Wraps the subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] keytide_core::Error),

    #[error("Output consumer already taken")]
    OutputTaken,
}

pub type Result<T> = std::result::Result<T, Error>;

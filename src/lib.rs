pub mod config;
pub mod error;
pub mod io;
pub mod setup;
pub mod sph;
pub mod units;

pub mod config;
pub mod dashboard;
pub mod domain;
pub mod donations;
pub mod error;
pub mod gateway;
pub mod locale;
pub mod occupancy;
pub mod placement;
pub mod removal;
pub mod roster;
pub mod router;
pub mod session;
pub mod telemetry;

#[cfg(test)]
mod test_support;

pub mod api;
pub mod config;
pub mod controller;
pub mod lobby;
pub mod poller;
pub mod runtime;

#[cfg(any(feature = "native", feature = "web"))]
pub mod http;

#[cfg(test)]
mod testing;

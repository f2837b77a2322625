pub mod events;
pub mod fares;
#[cfg(test)]
pub(crate) mod mock;
pub mod serpapi;

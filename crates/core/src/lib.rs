pub mod buffers;
pub mod client;
pub mod configuration;
pub mod language;
pub mod notify;
pub mod orchestrator;
pub mod protocol;
pub mod target;

#[cfg(test)]
mod test_helpers;

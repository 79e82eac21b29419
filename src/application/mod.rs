// Application layer - synchronization, commands and session lifecycle
pub mod control_backend;
pub mod dispatcher;
pub mod manual_gate;
pub mod session;
pub mod synchronizer;
pub mod telemetry_store;

#[cfg(test)]
pub mod testing;

pub mod actuator;
pub mod agent;
pub mod discovery;
pub mod essay;
pub mod filter;
pub mod oracle;
pub mod planner;
pub mod profile;
pub mod session;
pub mod types;
pub mod verify;

#[cfg(test)]
mod testutil;

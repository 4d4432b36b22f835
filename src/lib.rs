pub mod client;
pub mod functions;

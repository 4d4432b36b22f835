mod config;
mod connection;
mod register;
mod routes;

pub use config::HttpConnectionConfig;
pub use connection::HttpConnection;
pub use register::{register, FunctionRegistration, RegisterRequest};
pub use routes::{AppSummary, FunctionSummary, InvokeRequest, InvokeResponse, RunContext};

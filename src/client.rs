use ukuvi_core::Client;

/// Name this worker registers under with the orchestrator.
pub const APP_ID: &str = "ukuvi";

pub fn client() -> Client {
    Client::new(APP_ID)
}

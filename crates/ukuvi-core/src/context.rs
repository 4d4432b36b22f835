use serde::{Deserialize, Serialize};

use super::Event;

/// Everything a handler is told about the run it is executing.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Context {
    pub app_id: String,
    pub function_id: String,
    pub run_id: String,
    pub attempt: u32,
    pub event: Event,
    pub events: Vec<Event>,
}

impl Context {
    /// First attempt of a fresh run triggered by a single event.
    pub fn new(app_id: &str, function_id: &str, event: Event) -> Self {
        Context {
            app_id: app_id.to_owned(),
            function_id: function_id.to_owned(),
            run_id: uuid::Uuid::new_v4().to_string(),
            attempt: 0,
            events: vec![event.clone()],
            event,
        }
    }
}

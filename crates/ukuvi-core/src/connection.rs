use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{App, Event};

/// A unit of work handed to the worker by a connection.
///
/// With `function_id` set the backend has already chosen the function to run;
/// otherwise the event is routed to every function whose trigger matches it.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Invocation {
    pub id: Uuid,
    pub app_id: Option<String>,
    pub function_id: Option<String>,
    pub run_id: String,
    pub attempt: u32,
    pub event: Event,
    pub events: Vec<Event>,
}

impl Invocation {
    pub fn for_event(event: Event) -> Self {
        Invocation {
            id: Uuid::new_v4(),
            app_id: None,
            function_id: None,
            run_id: Uuid::new_v4().to_string(),
            attempt: 0,
            event,
            events: vec![],
        }
    }

    pub fn for_function(app_id: &str, function_id: &str, event: Event) -> Self {
        Invocation {
            app_id: Some(app_id.to_owned()),
            function_id: Some(function_id.to_owned()),
            ..Self::for_event(event)
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Completed {
        app_id: String,
        function_id: String,
        output: Value,
    },
    Failed {
        app_id: String,
        function_id: String,
        error: String,
    },
}

impl Outcome {
    pub fn function_id(&self) -> &str {
        match self {
            Outcome::Completed { function_id, .. } | Outcome::Failed { function_id, .. } => {
                function_id
            }
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed { .. })
    }
}

#[async_trait]
pub trait Connection: Send + Sync {
    async fn open(&self, apps: &[App]) -> anyhow::Result<()>;
    async fn receive(&self) -> anyhow::Result<Option<Invocation>>;
    async fn respond(&self, invocation: &Invocation, outcomes: Vec<Outcome>)
        -> anyhow::Result<()>;
}

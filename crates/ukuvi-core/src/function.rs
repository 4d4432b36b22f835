use std::{fmt, future::Future, marker::PhantomData, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Context, Event};

/// Condition under which the backend starts a run of a function.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Trigger {
    Event { event: String },
}

impl Trigger {
    pub fn event(name: &str) -> Self {
        Trigger::Event {
            event: name.to_owned(),
        }
    }

    // exact, case sensitive comparison of names
    pub fn matches(&self, event: &Event) -> bool {
        match self {
            Trigger::Event { event: name } => *name == event.name,
        }
    }
}

#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, ctx: Context) -> anyhow::Result<Value>;
}

struct FnHandler<F, Fut, T> {
    f: F,
    _output: PhantomData<fn() -> (Fut, T)>,
}

#[async_trait]
impl<F, Fut, T> Handler for FnHandler<F, Fut, T>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Serialize + Send + 'static,
{
    async fn call(&self, ctx: Context) -> anyhow::Result<Value> {
        let output = (self.f)(ctx).await?;

        Ok(serde_json::to_value(output)?)
    }
}

#[derive(Clone)]
pub struct FunctionDescriptor {
    id: String,
    trigger: Trigger,
    handler: Arc<dyn Handler>,
}

impl FunctionDescriptor {
    /// Wraps an async fn (or closure returning a future) as a function.
    pub fn new<F, Fut, T>(id: &str, trigger: Trigger, handler: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Serialize + Send + 'static,
    {
        let handler = FnHandler {
            f: handler,
            _output: PhantomData,
        };

        Self::from_handler(id, trigger, Arc::new(handler))
    }

    pub fn from_handler(id: &str, trigger: Trigger, handler: Arc<dyn Handler>) -> Self {
        FunctionDescriptor {
            id: id.to_owned(),
            trigger,
            handler,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    pub async fn invoke(&self, ctx: Context) -> anyhow::Result<Value> {
        self.handler.call(ctx).await
    }
}

impl fmt::Debug for FunctionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDescriptor")
            .field("id", &self.id)
            .field("trigger", &self.trigger)
            .finish_non_exhaustive()
    }
}

use std::collections::HashSet;

use super::{Client, Event, FunctionDescriptor};

/// A client together with the functions it serves.
#[derive(Clone, Debug)]
pub struct App {
    client: Client,
    functions: Vec<FunctionDescriptor>,
}

impl App {
    pub fn new(client: Client, functions: Vec<FunctionDescriptor>) -> anyhow::Result<Self> {
        if client.app_id().trim().is_empty() {
            anyhow::bail!("app id must not be empty");
        }

        validate_function_ids(client.app_id(), &functions)?;

        Ok(App { client, functions })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn app_id(&self) -> &str {
        self.client.app_id()
    }

    pub fn functions(&self) -> &[FunctionDescriptor] {
        &self.functions
    }

    pub fn function(&self, function_id: &str) -> Option<&FunctionDescriptor> {
        self.functions
            .iter()
            .find(|function| function.id() == function_id)
    }

    pub fn triggered_by<'a>(
        &'a self,
        event: &'a Event,
    ) -> impl Iterator<Item = &'a FunctionDescriptor> + 'a {
        self.functions
            .iter()
            .filter(move |function| function.trigger().matches(event))
    }
}

fn validate_function_ids(app_id: &str, functions: &[FunctionDescriptor]) -> anyhow::Result<()> {
    let mut function_ids = HashSet::new();

    for function in functions {
        if function.id().is_empty() {
            anyhow::bail!("function id must not be empty in app '{}'", app_id);
        }

        if !function_ids.insert(function.id()) {
            anyhow::bail!(
                "duplicate function id '{}' in app '{}'",
                function.id(),
                app_id
            );
        }
    }

    Ok(())
}

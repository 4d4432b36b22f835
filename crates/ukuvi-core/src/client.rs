/// Identifies an application to the orchestration backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Client {
    app_id: String,
}

impl Client {
    pub fn new(app_id: &str) -> Self {
        Client {
            app_id: app_id.to_owned(),
        }
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }
}

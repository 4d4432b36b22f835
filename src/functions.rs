use ukuvi_core::{Context, FunctionDescriptor, Trigger};

pub const GENERATE_EMBEDDINGS_ID: &str = "generate-embeddings";
pub const VERSION_VECTOR_EVENT: &str = "Crear version_vector - Ukuvi";

// Placeholder: no embeddings are computed yet.
pub async fn generate_embeddings(_ctx: Context) -> anyhow::Result<String> {
    Ok("Hello world!".to_owned())
}

pub fn functions() -> Vec<FunctionDescriptor> {
    vec![FunctionDescriptor::new(
        GENERATE_EMBEDDINGS_ID,
        Trigger::event(VERSION_VECTOR_EVENT),
        generate_embeddings,
    )]
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use ukuvi_core::Event;

    use super::*;
    use crate::client::APP_ID;

    #[test]
    fn test_registry_exposes_single_function() {
        let functions = functions();

        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].id(), "generate-embeddings");
        assert_eq!(
            *functions[0].trigger(),
            Trigger::event("Crear version_vector - Ukuvi")
        );
    }

    #[test]
    fn test_trigger_ignores_similar_event_names() {
        let functions = functions();
        let trigger = functions[0].trigger();

        assert!(trigger.matches(&Event::new(VERSION_VECTOR_EVENT, json!({}))));
        assert!(!trigger.matches(&Event::new("Crear version_vector", json!({}))));
        assert!(!trigger.matches(&Event::new("crear version_vector - ukuvi", json!({}))));
    }

    #[tokio::test]
    async fn test_handler_returns_constant() {
        let event = Event::new(VERSION_VECTOR_EVENT, json!({ "document_id": 7 }));
        let ctx = Context::new(APP_ID, GENERATE_EMBEDDINGS_ID, event);

        assert_eq!(generate_embeddings(ctx).await.unwrap(), "Hello world!");
    }

    #[tokio::test]
    async fn test_descriptor_output_is_constant_for_any_context() {
        let functions = functions();

        for data in [json!(null), json!({ "text": "poliza" }), json!([1, 2])] {
            let ctx = Context::new(APP_ID, GENERATE_EMBEDDINGS_ID, Event::new("anything", data));
            let output = functions[0].invoke(ctx).await.unwrap();

            assert_eq!(output, json!("Hello world!"));
        }
    }
}

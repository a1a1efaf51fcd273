//! Class corpus resource implementation

use crate::api::ontology::{Corpus, CorpusRequest};
use crate::resources::{
    api_client, create_failed, create_response, delete_failed, delete_response, import_failed,
    import_response, optional_bool, optional_string, parent_id, read_failed, read_gone,
    read_response, required_string, set_bool, set_optional_string, set_string,
    store_provider_data, update_failed, update_response,
};
use crate::TamaProviderData;
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, ResourceWithImportState, UpdateResourceRequest,
    UpdateResourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{Diagnostic, DynamicValue};

#[derive(Default)]
pub struct ClassCorpusResource {
    provider_data: Option<TamaProviderData>,
}

impl ClassCorpusResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn extract_corpus_request(value: &DynamicValue) -> Result<CorpusRequest, Diagnostic> {
        Ok(CorpusRequest {
            name: required_string(value, "name")?,
            template: required_string(value, "template")?,
            main: optional_bool(value, "main").unwrap_or(false),
        })
    }
}

fn corpus_state(corpus: Corpus, prior: &DynamicValue) -> DynamicValue {
    let mut state = DynamicValue::object();
    set_string(&mut state, "id", corpus.id);
    set_optional_string(
        &mut state,
        "class_id",
        parent_id(prior, "class_id", corpus.class_id),
    );
    set_string(&mut state, "name", corpus.name);
    set_string(&mut state, "template", corpus.template);
    set_bool(&mut state, "main", corpus.main);
    set_optional_string(&mut state, "slug", corpus.slug);
    set_optional_string(&mut state, "provision_state", corpus.provision_state);
    state
}

#[async_trait]
impl Resource for ClassCorpusResource {
    fn type_name(&self) -> &str {
        "tama_class_corpus"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a corpus, a template that renders entities of a class to text")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Corpus identifier")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("class_id", AttributeType::String)
                    .description("Class the corpus renders")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Corpus name")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("template", AttributeType::String)
                    .description("Liquid template rendering an entity")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("main", AttributeType::Bool)
                    .description("Whether this is the main corpus of the class")
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(false))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("slug", AttributeType::String)
                    .description("URL-friendly name assigned by Tama")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("provision_state", AttributeType::String)
                    .description("Provisioning state reported by Tama")
                    .computed()
                    .build(),
            )
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return create_failed(diag),
        };
        let class_id = match required_string(&request.planned_state, "class_id") {
            Ok(id) => id,
            Err(diag) => return create_failed(diag),
        };
        let body = match Self::extract_corpus_request(&request.planned_state) {
            Ok(body) => body,
            Err(diag) => return create_failed(diag),
        };

        let result = client.ontology().corpora().create(&class_id, &body).await;
        create_response(result, "corpus", |corpus| {
            corpus_state(corpus, &request.planned_state)
        })
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let Some(id) = optional_string(&request.current_state, "id") else {
            return read_gone(request.private);
        };
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return read_failed(request.current_state, request.private, diag),
        };

        let result = client.ontology().corpora().get(&id).await;
        read_response(
            result,
            request.current_state,
            request.private,
            "corpus",
            corpus_state,
        )
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return update_failed(request.prior_state, diag),
        };
        let id = match required_string(&request.prior_state, "id") {
            Ok(id) => id,
            Err(diag) => return update_failed(request.prior_state, diag),
        };
        let body = match Self::extract_corpus_request(&request.planned_state) {
            Ok(body) => body,
            Err(diag) => return update_failed(request.prior_state, diag),
        };

        let result = client.ontology().corpora().update(&id, &body).await;
        let planned = request.planned_state;
        update_response(result, request.prior_state, "corpus", |corpus| {
            corpus_state(corpus, &planned)
        })
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return delete_failed(diag),
        };
        let Some(id) = optional_string(&request.prior_state, "id") else {
            return delete_response(Ok(()), "corpus");
        };

        delete_response(client.ontology().corpora().delete(&id).await, "corpus")
    }
}

#[async_trait]
impl ResourceWithConfigure for ClassCorpusResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        ConfigureResourceResponse {
            diagnostics: store_provider_data(&mut self.provider_data, request.provider_data),
        }
    }
}

#[async_trait]
impl ResourceWithImportState for ClassCorpusResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return import_failed(diag),
        };

        let result = client.ontology().corpora().get(&request.id).await;
        import_response(&request, result, "corpus", |corpus| {
            corpus_state(corpus, &DynamicValue::object())
        })
    }
}

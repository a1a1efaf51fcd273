//! gRPC service implementation for Provider
//!
//! Implements the Terraform Plugin Protocol v6 on top of the factory-based
//! `Provider` trait. Resources and data sources are created per request from
//! their factories and configured with the provider data, so the service
//! holds no per-resource locks.

use crate::context::Context;
use crate::data_source::{
    ConfigureDataSourceRequest, DataSourceFactory, DataSourceSchemaRequest,
    DataSourceWithConfigure, ReadDataSourceRequest, ValidateDataSourceConfigRequest,
};
use crate::error::TfplugError;
use crate::proto::{self, ProviderService as ProtoProvider};
use crate::provider::{
    ConfigureProviderRequest, Provider, ProviderMetadataRequest, ProviderSchemaRequest,
    ValidateProviderConfigRequest,
};
use crate::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
    ImportResourceStateRequest, ManagedResource, ReadResourceRequest, ResourceFactory,
    ResourceSchemaRequest, UpdateResourceRequest, ValidateResourceConfigRequest,
};
use crate::schema::{
    Attribute, Block, DefaultRequest, NestedBlock, NestingMode, PlanModifierRequest, Schema,
    StringKind, ValidatorRequest,
};
use crate::types::{
    has_errors, AttributePath, AttributePathStep, ClientCapabilities, Deferred, DeferredReason,
    Diagnostic, DiagnosticSeverity, Dynamic, DynamicValue, RawState, ResourceIdentityData,
};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tonic::{Request, Response, Status};
use tracing::{debug, warn};

/// Schemas collected from the provider, its resources and data sources
struct Schemas {
    provider: Arc<Schema>,
    resources: HashMap<String, Arc<Schema>>,
    data_sources: HashMap<String, Arc<Schema>>,
    diagnostics: Vec<Diagnostic>,
}

pub struct ProviderService<P: Provider> {
    provider: RwLock<P>,
    resources: HashMap<String, ResourceFactory>,
    data_sources: HashMap<String, DataSourceFactory>,
    provider_data: RwLock<Option<Arc<dyn Any + Send + Sync>>>,
    schemas: OnceCell<Schemas>,
    /// Cancelled on StopProvider; every request works on a clone
    root: Context,
}

impl<P: Provider + 'static> ProviderService<P> {
    pub fn new(provider: P) -> Self {
        let resources = provider.resources();
        let data_sources = provider.data_sources();

        Self {
            provider: RwLock::new(provider),
            resources,
            data_sources,
            provider_data: RwLock::new(None),
            schemas: OnceCell::new(),
            root: Context::new(),
        }
    }

    /// The context shared by all in-flight requests
    pub fn context(&self) -> Context {
        self.root.clone()
    }

    async fn schemas(&self) -> &Schemas {
        self.schemas
            .get_or_init(|| async {
                let ctx = self.context();
                let mut diagnostics = Vec::new();

                let provider_schema = {
                    let provider = self.provider.read().await;
                    let response = provider.schema(ctx.clone(), ProviderSchemaRequest).await;
                    diagnostics.extend(response.diagnostics);
                    Arc::new(response.schema)
                };

                let mut resources = HashMap::new();
                for (name, factory) in &self.resources {
                    let response = factory().schema(ctx.clone(), ResourceSchemaRequest).await;
                    diagnostics.extend(response.diagnostics);
                    resources.insert(name.clone(), Arc::new(response.schema));
                }

                let mut data_sources = HashMap::new();
                for (name, factory) in &self.data_sources {
                    let response = factory().schema(ctx.clone(), DataSourceSchemaRequest).await;
                    diagnostics.extend(response.diagnostics);
                    data_sources.insert(name.clone(), Arc::new(response.schema));
                }

                Schemas {
                    provider: provider_schema,
                    resources,
                    data_sources,
                    diagnostics,
                }
            })
            .await
    }

    #[allow(clippy::result_large_err)]
    async fn resource_schema(&self, type_name: &str) -> Result<Arc<Schema>, Status> {
        self.schemas()
            .await
            .resources
            .get(type_name)
            .cloned()
            .ok_or_else(|| TfplugError::ResourceNotFound(type_name.to_string()).into())
    }

    #[allow(clippy::result_large_err)]
    async fn data_source_schema(&self, type_name: &str) -> Result<Arc<Schema>, Status> {
        self.schemas()
            .await
            .data_sources
            .get(type_name)
            .cloned()
            .ok_or_else(|| TfplugError::DataSourceNotFound(type_name.to_string()).into())
    }

    /// Creates and configures a resource; configure errors come back as diagnostics
    #[allow(clippy::result_large_err)]
    async fn resource(
        &self,
        ctx: &Context,
        type_name: &str,
    ) -> Result<(Box<dyn ManagedResource>, Vec<Diagnostic>), Status> {
        let factory = self
            .resources
            .get(type_name)
            .ok_or_else(|| Status::from(TfplugError::ResourceNotFound(type_name.to_string())))?;

        let mut resource = factory();
        let provider_data = self.provider_data.read().await.clone();
        let response = resource
            .configure(ctx.clone(), ConfigureResourceRequest { provider_data })
            .await;

        Ok((resource, response.diagnostics))
    }

    #[allow(clippy::result_large_err)]
    async fn data_source(
        &self,
        ctx: &Context,
        type_name: &str,
    ) -> Result<(Box<dyn DataSourceWithConfigure>, Vec<Diagnostic>), Status> {
        let factory = self
            .data_sources
            .get(type_name)
            .ok_or_else(|| Status::from(TfplugError::DataSourceNotFound(type_name.to_string())))?;

        let mut data_source = factory();
        let provider_data = self.provider_data.read().await.clone();
        let response = data_source
            .configure(ctx.clone(), ConfigureDataSourceRequest { provider_data })
            .await;

        Ok((data_source, response.diagnostics))
    }
}

#[tonic::async_trait]
impl<P: Provider + 'static> ProtoProvider for ProviderService<P> {
    async fn get_metadata(
        &self,
        _request: Request<proto::get_metadata::Request>,
    ) -> std::result::Result<Response<proto::get_metadata::Response>, Status> {
        let metadata = {
            let provider = self.provider.read().await;
            provider
                .metadata(self.context(), ProviderMetadataRequest)
                .await
        };

        let caps = metadata.server_capabilities;
        Ok(Response::new(proto::get_metadata::Response {
            server_capabilities: Some(proto::ServerCapabilities {
                plan_destroy: caps.plan_destroy,
                get_provider_schema_optional: caps.get_provider_schema_optional,
                move_resource_state: caps.move_resource_state,
            }),
            diagnostics: vec![],
            data_sources: self
                .data_sources
                .keys()
                .map(|name| proto::get_metadata::DataSourceMetadata {
                    type_name: name.clone(),
                })
                .collect(),
            resources: self
                .resources
                .keys()
                .map(|name| proto::get_metadata::ResourceMetadata {
                    type_name: name.clone(),
                })
                .collect(),
        }))
    }

    async fn get_provider_schema(
        &self,
        _request: Request<proto::get_provider_schema::Request>,
    ) -> std::result::Result<Response<proto::get_provider_schema::Response>, Status> {
        let schemas = self.schemas().await;
        debug!(
            resources = schemas.resources.len(),
            data_sources = schemas.data_sources.len(),
            "get_provider_schema"
        );

        Ok(Response::new(proto::get_provider_schema::Response {
            provider: Some(schema_to_proto(&schemas.provider)),
            resource_schemas: schemas
                .resources
                .iter()
                .map(|(name, schema)| (name.clone(), schema_to_proto(schema)))
                .collect(),
            data_source_schemas: schemas
                .data_sources
                .iter()
                .map(|(name, schema)| (name.clone(), schema_to_proto(schema)))
                .collect(),
            diagnostics: diagnostics_to_proto(&schemas.diagnostics),
            provider_meta: None,
            server_capabilities: Some(proto::ServerCapabilities {
                plan_destroy: false,
                get_provider_schema_optional: false,
                move_resource_state: false,
            }),
        }))
    }

    async fn validate_provider_config(
        &self,
        request: Request<proto::validate_provider_config::Request>,
    ) -> std::result::Result<Response<proto::validate_provider_config::Response>, Status> {
        let req = request.into_inner();
        let config = decode_dynamic_value(req.config.as_ref())?;

        let mut diagnostics = Vec::new();
        let schema = self.schemas().await.provider.clone();
        validate_block(&schema.block, &config.value, &AttributePath::root(), &mut diagnostics);

        let provider = self.provider.read().await;
        let response = provider
            .validate(self.context(), ValidateProviderConfigRequest { config })
            .await;
        diagnostics.extend(response.diagnostics);

        Ok(Response::new(proto::validate_provider_config::Response {
            diagnostics: diagnostics_to_proto(&diagnostics),
        }))
    }

    async fn validate_resource_config(
        &self,
        request: Request<proto::validate_resource_config::Request>,
    ) -> std::result::Result<Response<proto::validate_resource_config::Response>, Status> {
        let req = request.into_inner();
        let ctx = self.context();
        let schema = self.resource_schema(&req.type_name).await?;
        let config = decode_dynamic_value(req.config.as_ref())?;

        let mut diagnostics = Vec::new();
        validate_block(&schema.block, &config.value, &AttributePath::root(), &mut diagnostics);

        let (resource, configure_diags) = self.resource(&ctx, &req.type_name).await?;
        diagnostics.extend(configure_diags);

        let response = resource
            .validate(
                ctx,
                ValidateResourceConfigRequest {
                    type_name: req.type_name,
                    config,
                    client_capabilities: client_capabilities(req.client_capabilities),
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);

        Ok(Response::new(proto::validate_resource_config::Response {
            diagnostics: diagnostics_to_proto(&diagnostics),
        }))
    }

    async fn validate_data_resource_config(
        &self,
        request: Request<proto::validate_data_resource_config::Request>,
    ) -> std::result::Result<Response<proto::validate_data_resource_config::Response>, Status> {
        let req = request.into_inner();
        let ctx = self.context();
        let schema = self.data_source_schema(&req.type_name).await?;
        let config = decode_dynamic_value(req.config.as_ref())?;

        let mut diagnostics = Vec::new();
        validate_block(&schema.block, &config.value, &AttributePath::root(), &mut diagnostics);

        let (data_source, configure_diags) = self.data_source(&ctx, &req.type_name).await?;
        diagnostics.extend(configure_diags);

        let response = data_source
            .validate(
                ctx,
                ValidateDataSourceConfigRequest {
                    type_name: req.type_name,
                    config,
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);

        Ok(Response::new(proto::validate_data_resource_config::Response {
            diagnostics: diagnostics_to_proto(&diagnostics),
        }))
    }

    async fn upgrade_resource_state(
        &self,
        request: Request<proto::upgrade_resource_state::Request>,
    ) -> std::result::Result<Response<proto::upgrade_resource_state::Response>, Status> {
        let req = request.into_inner();
        let schema = self.resource_schema(&req.type_name).await?;

        let raw_state = req
            .raw_state
            .map(|raw| RawState {
                json: (!raw.json.is_empty()).then_some(raw.json),
                flatmap: (!raw.flatmap.is_empty()).then_some(raw.flatmap),
            })
            .unwrap_or_default();

        let mut diagnostics = Vec::new();
        if req.version > schema.version {
            diagnostics.push(Diagnostic::error(
                "Unsupported state version",
                format!(
                    "State for {} has schema version {}, newer than the provider's {}",
                    req.type_name, req.version, schema.version
                ),
            ));
        }

        let upgraded = match (&raw_state.json, &raw_state.flatmap) {
            (Some(json), _) => {
                let state = DynamicValue::decode_json(json)?;
                DynamicValue::new(schema.block.normalize(&state.value))
            }
            (None, Some(_)) => {
                diagnostics.push(Diagnostic::error(
                    "Unsupported state format",
                    format!("Flatmap state for {} cannot be upgraded", req.type_name),
                ));
                DynamicValue::null()
            }
            (None, None) => DynamicValue::null(),
        };

        debug!(type_name = %req.type_name, version = req.version, "upgraded resource state");

        Ok(Response::new(proto::upgrade_resource_state::Response {
            upgraded_state: Some(encode_dynamic_value(&upgraded)?),
            diagnostics: diagnostics_to_proto(&diagnostics),
        }))
    }

    async fn configure_provider(
        &self,
        request: Request<proto::configure_provider::Request>,
    ) -> std::result::Result<Response<proto::configure_provider::Response>, Status> {
        let req = request.into_inner();
        let config = decode_dynamic_value(req.config.as_ref())?;

        debug!(terraform_version = %req.terraform_version, "configure_provider");

        let response = {
            let mut provider = self.provider.write().await;
            provider
                .configure(
                    self.context(),
                    ConfigureProviderRequest {
                        terraform_version: req.terraform_version,
                        config,
                        client_capabilities: client_capabilities(req.client_capabilities),
                    },
                )
                .await
        };

        if let Some(data) = response.provider_data {
            *self.provider_data.write().await = Some(data);
        }

        Ok(Response::new(proto::configure_provider::Response {
            diagnostics: diagnostics_to_proto(&response.diagnostics),
        }))
    }

    async fn read_resource(
        &self,
        request: Request<proto::read_resource::Request>,
    ) -> std::result::Result<Response<proto::read_resource::Response>, Status> {
        let req = request.into_inner();
        let ctx = self.context();
        let schema = self.resource_schema(&req.type_name).await?;
        let current_state = decode_dynamic_value(req.current_state.as_ref())?;

        if current_state.is_null() {
            return Ok(Response::new(proto::read_resource::Response {
                new_state: Some(encode_dynamic_value(&current_state)?),
                private: req.private,
                ..Default::default()
            }));
        }

        let (resource, mut diagnostics) = self.resource(&ctx, &req.type_name).await?;
        if has_errors(&diagnostics) {
            return Ok(Response::new(proto::read_resource::Response {
                new_state: req.current_state,
                diagnostics: diagnostics_to_proto(&diagnostics),
                private: req.private,
                ..Default::default()
            }));
        }

        let response = resource
            .read(
                ctx,
                ReadResourceRequest {
                    type_name: req.type_name.clone(),
                    current_state,
                    private: req.private,
                    provider_meta: decode_optional(req.provider_meta.as_ref())?,
                    client_capabilities: client_capabilities(req.client_capabilities),
                    current_identity: identity_from_proto(req.current_identity.as_ref())?,
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);

        let new_state = match response.new_state {
            Some(state) => normalize_state(&schema, state),
            None => {
                debug!(type_name = %req.type_name, "resource no longer exists, removing from state");
                DynamicValue::null()
            }
        };

        Ok(Response::new(proto::read_resource::Response {
            new_state: Some(encode_dynamic_value(&new_state)?),
            diagnostics: diagnostics_to_proto(&diagnostics),
            private: response.private,
            deferred: response.deferred.as_ref().map(deferred_to_proto),
            new_identity: identity_to_proto(response.new_identity.as_ref())?,
        }))
    }

    async fn plan_resource_change(
        &self,
        request: Request<proto::plan_resource_change::Request>,
    ) -> std::result::Result<Response<proto::plan_resource_change::Response>, Status> {
        let req = request.into_inner();
        let schema = self.resource_schema(&req.type_name).await?;

        let prior_state = decode_dynamic_value(req.prior_state.as_ref())?;
        let proposed_new_state = decode_dynamic_value(req.proposed_new_state.as_ref())?;
        let config = decode_dynamic_value(req.config.as_ref())?;

        // Destroy plans pass through untouched
        if proposed_new_state.is_null() {
            return Ok(Response::new(proto::plan_resource_change::Response {
                planned_state: req.proposed_new_state,
                planned_private: req.prior_private,
                ..Default::default()
            }));
        }

        let plan = plan_block(
            &schema.block,
            &config.value,
            &prior_state.value,
            &proposed_new_state.value,
        );

        debug!(
            type_name = %req.type_name,
            create = prior_state.is_null(),
            requires_replace = plan.requires_replace.len(),
            "planned resource change"
        );

        Ok(Response::new(proto::plan_resource_change::Response {
            planned_state: Some(encode_dynamic_value(&DynamicValue::new(plan.planned))?),
            requires_replace: plan.requires_replace.iter().map(path_to_proto).collect(),
            planned_private: req.prior_private,
            diagnostics: diagnostics_to_proto(&plan.diagnostics),
            legacy_type_system: false,
            deferred: None,
            planned_identity: req.prior_identity,
        }))
    }

    async fn apply_resource_change(
        &self,
        request: Request<proto::apply_resource_change::Request>,
    ) -> std::result::Result<Response<proto::apply_resource_change::Response>, Status> {
        let req = request.into_inner();
        let ctx = self.context();
        let schema = self.resource_schema(&req.type_name).await?;

        let prior_state = decode_dynamic_value(req.prior_state.as_ref())?;
        let planned_state = decode_dynamic_value(req.planned_state.as_ref())?;
        let config = decode_dynamic_value(req.config.as_ref())?;
        let provider_meta = decode_optional(req.provider_meta.as_ref())?;

        let (resource, mut diagnostics) = self.resource(&ctx, &req.type_name).await?;
        if has_errors(&diagnostics) {
            return Ok(Response::new(proto::apply_resource_change::Response {
                new_state: req.prior_state,
                diagnostics: diagnostics_to_proto(&diagnostics),
                ..Default::default()
            }));
        }

        let (new_state, private, new_identity) = if planned_state.is_null() {
            debug!(type_name = %req.type_name, "apply: delete");
            let response = resource
                .delete(
                    ctx,
                    DeleteResourceRequest {
                        type_name: req.type_name.clone(),
                        prior_state: prior_state.clone(),
                        planned_private: req.planned_private.clone(),
                        provider_meta,
                    },
                )
                .await;
            diagnostics.extend(response.diagnostics);

            // A failed delete keeps the resource in state
            let state = if has_errors(&diagnostics) {
                prior_state
            } else {
                DynamicValue::null()
            };
            (state, req.planned_private, None)
        } else if prior_state.is_null() {
            debug!(type_name = %req.type_name, "apply: create");
            let response = resource
                .create(
                    ctx,
                    CreateResourceRequest {
                        type_name: req.type_name.clone(),
                        planned_state,
                        config,
                        planned_private: req.planned_private,
                        provider_meta,
                    },
                )
                .await;
            diagnostics.extend(response.diagnostics);
            (normalize_state(&schema, response.new_state), response.private, None)
        } else {
            debug!(type_name = %req.type_name, "apply: update");
            let response = resource
                .update(
                    ctx,
                    UpdateResourceRequest {
                        type_name: req.type_name.clone(),
                        prior_state,
                        planned_state,
                        config,
                        planned_private: req.planned_private,
                        provider_meta,
                        planned_identity: identity_from_proto(req.planned_identity.as_ref())?,
                    },
                )
                .await;
            diagnostics.extend(response.diagnostics);
            (
                normalize_state(&schema, response.new_state),
                response.private,
                response.new_identity,
            )
        };

        if has_errors(&diagnostics) {
            warn!(type_name = %req.type_name, "apply finished with errors");
        }

        Ok(Response::new(proto::apply_resource_change::Response {
            new_state: Some(encode_dynamic_value(&new_state)?),
            private,
            diagnostics: diagnostics_to_proto(&diagnostics),
            legacy_type_system: false,
            new_identity: identity_to_proto(new_identity.as_ref())?,
        }))
    }

    async fn import_resource_state(
        &self,
        request: Request<proto::import_resource_state::Request>,
    ) -> std::result::Result<Response<proto::import_resource_state::Response>, Status> {
        let req = request.into_inner();
        let ctx = self.context();
        let schema = self.resource_schema(&req.type_name).await?;

        let (resource, mut diagnostics) = self.resource(&ctx, &req.type_name).await?;
        if has_errors(&diagnostics) {
            return Ok(Response::new(proto::import_resource_state::Response {
                diagnostics: diagnostics_to_proto(&diagnostics),
                ..Default::default()
            }));
        }

        debug!(type_name = %req.type_name, id = %req.id, "import_resource_state");

        let response = resource
            .import_state(
                ctx,
                ImportResourceStateRequest {
                    type_name: req.type_name,
                    id: req.id,
                    client_capabilities: client_capabilities(req.client_capabilities),
                    identity: identity_from_proto(req.identity.as_ref())?,
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);

        let mut imported_resources = Vec::with_capacity(response.imported_resources.len());
        for imported in response.imported_resources {
            let state = normalize_state(&schema, imported.state);
            imported_resources.push(proto::import_resource_state::ImportedResource {
                type_name: imported.type_name,
                state: Some(encode_dynamic_value(&state)?),
                private: imported.private,
                identity: identity_to_proto(imported.identity.as_ref())?,
            });
        }

        Ok(Response::new(proto::import_resource_state::Response {
            imported_resources,
            diagnostics: diagnostics_to_proto(&diagnostics),
            deferred: response.deferred.as_ref().map(deferred_to_proto),
        }))
    }

    async fn read_data_source(
        &self,
        request: Request<proto::read_data_source::Request>,
    ) -> std::result::Result<Response<proto::read_data_source::Response>, Status> {
        let req = request.into_inner();
        let ctx = self.context();
        let schema = self.data_source_schema(&req.type_name).await?;
        let config = decode_dynamic_value(req.config.as_ref())?;

        let (data_source, mut diagnostics) = self.data_source(&ctx, &req.type_name).await?;
        if has_errors(&diagnostics) {
            return Ok(Response::new(proto::read_data_source::Response {
                state: req.config,
                diagnostics: diagnostics_to_proto(&diagnostics),
                deferred: None,
            }));
        }

        debug!(type_name = %req.type_name, "read_data_source");

        let response = data_source
            .read(
                ctx,
                ReadDataSourceRequest {
                    type_name: req.type_name,
                    config,
                    provider_meta: decode_optional(req.provider_meta.as_ref())?,
                    client_capabilities: client_capabilities(req.client_capabilities),
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);

        let state = normalize_state(&schema, response.state);
        Ok(Response::new(proto::read_data_source::Response {
            state: Some(encode_dynamic_value(&state)?),
            diagnostics: diagnostics_to_proto(&diagnostics),
            deferred: response.deferred.as_ref().map(deferred_to_proto),
        }))
    }

    async fn stop_provider(
        &self,
        _request: Request<proto::stop_provider::Request>,
    ) -> std::result::Result<Response<proto::stop_provider::Response>, Status> {
        debug!("stop_provider: cancelling in-flight requests");
        self.root.cancel();

        Ok(Response::new(proto::stop_provider::Response {
            error: String::new(),
        }))
    }
}

// Planning

struct Plan {
    planned: Dynamic,
    requires_replace: Vec<AttributePath>,
    diagnostics: Vec<Diagnostic>,
}

/// Computes the planned state for a create or update
///
/// 1. Defaults replace null config values
/// 2. Computed attributes without config become unknown on create, and on
///    update whenever the proposed state differs from the prior state
/// 3. Plan modifiers run on the result; requires-replace only counts on update
fn plan_block(block: &Block, config: &Dynamic, prior: &Dynamic, proposed: &Dynamic) -> Plan {
    let is_create = prior.is_null();
    let changed = is_create || proposed != prior;

    let mut planned = match proposed {
        Dynamic::Map(fields) => fields.clone(),
        _ => HashMap::new(),
    };
    let mut requires_replace = Vec::new();
    let mut diagnostics = Vec::new();

    for attr in &block.attributes {
        let path = AttributePath::new(&attr.name);
        let config_value = field(config, &attr.name);
        let prior_value = field(prior, &attr.name);
        let mut plan_value = field(proposed, &attr.name);

        if config_value.is_null() {
            if let Some(default) = &attr.default {
                plan_value = default
                    .default_value(DefaultRequest { path: path.clone() })
                    .value
                    .value;
            } else if attr.computed && changed {
                plan_value = Dynamic::Unknown;
            }
        }

        for modifier in &attr.plan_modifiers {
            let response = modifier.modify(PlanModifierRequest {
                config_value: DynamicValue::new(config_value.clone()),
                state_value: DynamicValue::new(prior_value.clone()),
                plan_value: DynamicValue::new(plan_value),
                path: path.clone(),
            });
            plan_value = response.plan_value.value;
            diagnostics.extend(response.diagnostics);

            if response.requires_replace && !is_create && !requires_replace.contains(&path) {
                requires_replace.push(path.clone());
            }
        }

        planned.insert(attr.name.clone(), plan_value);
    }

    Plan {
        planned: Dynamic::Map(planned),
        requires_replace,
        diagnostics,
    }
}

fn field(value: &Dynamic, name: &str) -> Dynamic {
    value
        .as_map()
        .and_then(|fields| fields.get(name))
        .cloned()
        .unwrap_or(Dynamic::Null)
}

/// Shapes a provider-produced state for Terraform
fn normalize_state(schema: &Schema, state: DynamicValue) -> DynamicValue {
    if state.is_null() {
        return state;
    }
    DynamicValue::new(schema.block.normalize(&state.value.unknowns_to_null()))
}

// Validation

/// Checks presence, types and attribute validators against a block schema
fn validate_block(
    block: &Block,
    value: &Dynamic,
    path: &AttributePath,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let Dynamic::Map(fields) = value else {
        return;
    };

    for attr in &block.attributes {
        let attr_path = child_path(path, &attr.name);
        let attr_value = fields.get(&attr.name).unwrap_or(&Dynamic::Null);
        validate_attribute(attr, attr_value, attr_path, diagnostics);
    }

    for nested in &block.block_types {
        let nested_path = child_path(path, &nested.type_name);
        let nested_value = fields.get(&nested.type_name).unwrap_or(&Dynamic::Null);
        validate_nested_block(nested, nested_value, nested_path, diagnostics);
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: &Dynamic,
    path: AttributePath,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if value.is_null() {
        if attr.required {
            diagnostics.push(
                Diagnostic::error(
                    "Missing required argument",
                    format!("The argument \"{}\" is required, but no definition was found.", path),
                )
                .with_attribute(path),
            );
        }
        return;
    }

    if attr.computed && !attr.optional && !attr.required {
        diagnostics.push(
            Diagnostic::error(
                "Invalid configuration",
                format!("\"{}\" is computed and cannot be set in configuration.", path),
            )
            .with_attribute(path),
        );
        return;
    }

    if !attr.r#type.accepts(value) {
        diagnostics.push(
            Diagnostic::error(
                "Incorrect attribute value type",
                format!(
                    "\"{}\" expects {}, got {}",
                    path,
                    attr.r#type.to_type_json(),
                    value.type_name()
                ),
            )
            .with_attribute(path),
        );
        return;
    }

    if value.is_unknown() {
        return;
    }

    for validator in &attr.validators {
        let response = validator.validate(ValidatorRequest {
            config_value: DynamicValue::new(value.clone()),
            path: path.clone(),
        });
        diagnostics.extend(response.diagnostics);
    }
}

fn validate_nested_block(
    nested: &NestedBlock,
    value: &Dynamic,
    path: AttributePath,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match (nested.nesting, value) {
        (_, Dynamic::Unknown) => {}
        (NestingMode::List | NestingMode::Set, _) => {
            let items = value.as_list().map(Vec::as_slice).unwrap_or(&[]);
            let count = items.len() as i64;

            if count < nested.min_items {
                diagnostics.push(
                    Diagnostic::error(
                        "Insufficient blocks",
                        format!(
                            "At least {} \"{}\" blocks are required.",
                            nested.min_items, nested.type_name
                        ),
                    )
                    .with_attribute(path.clone()),
                );
            }
            if nested.max_items > 0 && count > nested.max_items {
                diagnostics.push(
                    Diagnostic::error(
                        "Too many blocks",
                        format!(
                            "No more than {} \"{}\" blocks are allowed.",
                            nested.max_items, nested.type_name
                        ),
                    )
                    .with_attribute(path.clone()),
                );
            }

            for (idx, item) in items.iter().enumerate() {
                let item_path = path.clone().index(idx as i64);
                validate_block(&nested.block, item, &item_path, diagnostics);
            }
        }
        (NestingMode::Map, Dynamic::Map(entries)) => {
            for (key, item) in entries {
                let item_path = path.clone().key(key);
                validate_block(&nested.block, item, &item_path, diagnostics);
            }
        }
        (NestingMode::Single | NestingMode::Group, Dynamic::Null) => {
            if nested.min_items > 0 {
                diagnostics.push(
                    Diagnostic::error(
                        "Missing required block",
                        format!("A \"{}\" block is required.", nested.type_name),
                    )
                    .with_attribute(path),
                );
            }
        }
        (_, value) => validate_block(&nested.block, value, &path, diagnostics),
    }
}

fn child_path(parent: &AttributePath, name: &str) -> AttributePath {
    parent.clone().attribute(name)
}

// Protocol conversions

#[allow(clippy::result_large_err)]
fn decode_dynamic_value(
    value: Option<&proto::DynamicValue>,
) -> std::result::Result<DynamicValue, Status> {
    let Some(value) = value else {
        return Ok(DynamicValue::null());
    };

    if !value.msgpack.is_empty() {
        Ok(DynamicValue::decode_msgpack(&value.msgpack)?)
    } else if !value.json.is_empty() {
        Ok(DynamicValue::decode_json(&value.json)?)
    } else {
        Ok(DynamicValue::null())
    }
}

#[allow(clippy::result_large_err)]
fn decode_optional(
    value: Option<&proto::DynamicValue>,
) -> std::result::Result<Option<DynamicValue>, Status> {
    value.map(|v| decode_dynamic_value(Some(v))).transpose()
}

#[allow(clippy::result_large_err)]
fn encode_dynamic_value(value: &DynamicValue) -> std::result::Result<proto::DynamicValue, Status> {
    Ok(proto::DynamicValue {
        msgpack: value.encode_msgpack()?,
        json: vec![],
    })
}

#[allow(clippy::result_large_err)]
fn identity_from_proto(
    identity: Option<&proto::ResourceIdentityData>,
) -> std::result::Result<Option<ResourceIdentityData>, Status> {
    identity
        .map(|identity| {
            Ok(ResourceIdentityData {
                identity_data: decode_dynamic_value(identity.identity_data.as_ref())?,
            })
        })
        .transpose()
}

#[allow(clippy::result_large_err)]
fn identity_to_proto(
    identity: Option<&ResourceIdentityData>,
) -> std::result::Result<Option<proto::ResourceIdentityData>, Status> {
    identity
        .map(|identity| {
            Ok(proto::ResourceIdentityData {
                identity_data: Some(encode_dynamic_value(&identity.identity_data)?),
            })
        })
        .transpose()
}

fn client_capabilities(caps: Option<proto::ClientCapabilities>) -> ClientCapabilities {
    caps.map(|caps| ClientCapabilities {
        deferral_allowed: caps.deferral_allowed,
        write_only_attributes_allowed: caps.write_only_attributes_allowed,
    })
    .unwrap_or_default()
}

fn deferred_to_proto(deferred: &Deferred) -> proto::Deferred {
    let reason = match deferred.reason {
        DeferredReason::Unknown => proto::deferred::Reason::Unknown,
        DeferredReason::ResourceConfigUnknown => proto::deferred::Reason::ResourceConfigUnknown,
        DeferredReason::ProviderConfigUnknown => proto::deferred::Reason::ProviderConfigUnknown,
        DeferredReason::AbsentPrereq => proto::deferred::Reason::AbsentPrereq,
    };

    proto::Deferred {
        reason: reason as i32,
    }
}

fn path_to_proto(path: &AttributePath) -> proto::AttributePath {
    use proto::attribute_path::step::Selector;

    proto::AttributePath {
        steps: path
            .steps
            .iter()
            .map(|step| proto::attribute_path::Step {
                selector: Some(match step {
                    AttributePathStep::AttributeName(name) => Selector::AttributeName(name.clone()),
                    AttributePathStep::ElementKeyString(key) => {
                        Selector::ElementKeyString(key.clone())
                    }
                    AttributePathStep::ElementKeyInt(idx) => Selector::ElementKeyInt(*idx),
                }),
            })
            .collect(),
    }
}

fn diagnostics_to_proto(diagnostics: &[Diagnostic]) -> Vec<proto::Diagnostic> {
    diagnostics
        .iter()
        .map(|diag| {
            let severity = match diag.severity {
                DiagnosticSeverity::Invalid => proto::diagnostic::Severity::Invalid,
                DiagnosticSeverity::Error => proto::diagnostic::Severity::Error,
                DiagnosticSeverity::Warning => proto::diagnostic::Severity::Warning,
            };

            proto::Diagnostic {
                severity: severity as i32,
                summary: diag.summary.clone(),
                detail: diag.detail.clone(),
                attribute: diag.attribute.as_ref().map(path_to_proto),
            }
        })
        .collect()
}

fn string_kind(kind: StringKind) -> i32 {
    match kind {
        StringKind::Plain => proto::StringKind::Plain as i32,
        StringKind::Markdown => proto::StringKind::Markdown as i32,
    }
}

fn schema_to_proto(schema: &Schema) -> proto::Schema {
    proto::Schema {
        version: schema.version,
        block: Some(block_to_proto(&schema.block)),
    }
}

fn block_to_proto(block: &Block) -> proto::schema::Block {
    proto::schema::Block {
        version: block.version,
        attributes: block
            .attributes
            .iter()
            .map(|attr| proto::schema::Attribute {
                name: attr.name.clone(),
                r#type: attr.r#type.to_type_bytes(),
                description: attr.description.clone(),
                required: attr.required,
                optional: attr.optional,
                computed: attr.computed,
                sensitive: attr.sensitive,
                description_kind: string_kind(StringKind::Plain),
                deprecated: attr.deprecated,
                write_only: false,
            })
            .collect(),
        block_types: block
            .block_types
            .iter()
            .map(|nested| {
                use proto::schema::nested_block::NestingMode as ProtoNesting;

                let nesting = match nested.nesting {
                    NestingMode::Invalid => ProtoNesting::Invalid,
                    NestingMode::Single => ProtoNesting::Single,
                    NestingMode::List => ProtoNesting::List,
                    NestingMode::Set => ProtoNesting::Set,
                    NestingMode::Map => ProtoNesting::Map,
                    NestingMode::Group => ProtoNesting::Group,
                };

                proto::schema::NestedBlock {
                    type_name: nested.type_name.clone(),
                    block: Some(block_to_proto(&nested.block)),
                    nesting: nesting as i32,
                    min_items: nested.min_items,
                    max_items: nested.max_items,
                }
            })
            .collect(),
        description: block.description.clone(),
        description_kind: string_kind(block.description_kind),
        deprecated: block.deprecated,
    }
}

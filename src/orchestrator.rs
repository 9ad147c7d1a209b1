//! Validation orchestrator: route → parameters → body, stopping at the first failing stage.

use crate::classify::{self, ValidationFailure};
use crate::config::ValidatorConfig;
use crate::contract::{OperationTemplate, SchemaModel};
use crate::routing::{self, MatchResult};
use crate::validation::{
    BodyValidator, BodyValue, FormatChecker, InstanceValidator, ParameterValidator, QueryParams,
};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Everything the validator needs to know about one request
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Raw request path; a `?query` suffix is ignored for routing
    pub path: String,
    pub headers: HeaderMap,
    pub query: QueryParams,
    pub body: BodyValue,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            query: QueryParams::new(),
            body: BodyValue::Absent,
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: impl Into<BodyValue>) -> Self {
        self.body = body.into();
        self
    }
}

/// A request that passed every stage
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub operation: Arc<OperationTemplate>,
    pub path_params: BTreeMap<String, String>,
}

/// Request resolved to an operation
struct Routed {
    operation: Arc<OperationTemplate>,
    path_params: BTreeMap<String, String>,
}

/// Parameters accepted, body still to check
struct ParamsChecked {
    operation: Arc<OperationTemplate>,
    path_params: BTreeMap<String, String>,
}

/// Validates requests against a compiled contract.
///
/// Holds only immutable state, so one instance is shared by every request task.
#[derive(Debug, Clone)]
pub struct RequestValidator {
    model: Arc<SchemaModel>,
    config: ValidatorConfig,
    formats: FormatChecker,
}

impl RequestValidator {
    pub fn new(model: Arc<SchemaModel>, config: ValidatorConfig) -> Self {
        let formats = config.format_checker();
        Self {
            model,
            config,
            formats,
        }
    }

    pub fn model(&self) -> &SchemaModel {
        &self.model
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    #[tracing::instrument(skip_all, fields(method = %request.method, path = %request.path))]
    pub fn validate(&self, request: &RequestDescriptor) -> Result<ValidatedRequest, ValidationFailure> {
        let outcome = self
            .route(request)
            .and_then(|routed| self.check_parameters(request, routed))
            .and_then(|checked| self.check_body(request, checked));

        match &outcome {
            Ok(validated) => {
                tracing::debug!("Request accepted as {}", validated.operation.label());
            }
            Err(failure) if self.config.log_error => {
                tracing::warn!(
                    code = failure.kind.code(),
                    "{} {} rejected: {}",
                    request.method,
                    request.path,
                    failure.message
                );
                for violation in &failure.violations {
                    tracing::warn!("  {}", violation.format());
                }
            }
            Err(_) => {}
        }

        outcome
    }

    fn route(&self, request: &RequestDescriptor) -> Result<Routed, ValidationFailure> {
        match routing::match_route(
            &self.model,
            &request.method,
            &request.path,
            self.config.route_options(),
        ) {
            MatchResult::Matched {
                operation,
                path_params,
            } => {
                tracing::debug!("Routed to {} {}", operation.method, operation.template);
                Ok(Routed {
                    operation,
                    path_params,
                })
            }
            MatchResult::Unmatched {
                kind,
                allowed_methods,
            } => {
                tracing::debug!("No route: {:?}", kind);
                Err(classify::classify_route(
                    kind,
                    &request.method,
                    &request.path,
                    allowed_methods,
                ))
            }
        }
    }

    fn check_parameters(
        &self,
        request: &RequestDescriptor,
        routed: Routed,
    ) -> Result<ParamsChecked, ValidationFailure> {
        let instances = InstanceValidator::new(self.model.schemas(), &self.formats);
        let violations = ParameterValidator::new(&instances).validate(
            &routed.path_params,
            &request.headers,
            &request.query,
            &routed.operation.parameters,
        );
        tracing::debug!(
            "Checked {} parameters, {} violations",
            routed.operation.parameters.len(),
            violations.len()
        );

        match classify::classify_parameters(&routed.operation.label(), violations) {
            Some(failure) => Err(failure),
            None => Ok(ParamsChecked {
                operation: routed.operation,
                path_params: routed.path_params,
            }),
        }
    }

    fn check_body(
        &self,
        request: &RequestDescriptor,
        checked: ParamsChecked,
    ) -> Result<ValidatedRequest, ValidationFailure> {
        if self.config.skip_body_validation {
            tracing::debug!("Body validation skipped by configuration");
        } else {
            let instances = InstanceValidator::new(self.model.schemas(), &self.formats);
            let violations = BodyValidator::new(&instances)
                .validate(&request.body, checked.operation.body.as_ref());
            tracing::debug!("Checked body, {} violations", violations.len());

            if let Some(failure) = classify::classify_body(&checked.operation.label(), violations) {
                return Err(failure);
            }
        }

        Ok(ValidatedRequest {
            operation: checked.operation,
            path_params: checked.path_params,
        })
    }
}

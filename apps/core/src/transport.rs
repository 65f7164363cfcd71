use serde::{Deserialize, Serialize};

use crate::contract::{RouterRequest, RouterResponse};
use crate::preferences::StoreError;
use crate::router_service::{RouterService, ServiceError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidJson,
    InvalidRule,
    RuleNotFound,
    Store,
    Config,
    Discovery,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransportResponse {
    Ok { response: RouterResponse },
    Err { error: ErrorResponse },
}

pub fn handle_request(service: &mut RouterService, request: RouterRequest) -> TransportResponse {
    match service.handle_command(request) {
        Ok(response) => TransportResponse::Ok { response },
        Err(error) => TransportResponse::Err {
            error: map_service_error(error),
        },
    }
}

pub fn handle_json(service: &mut RouterService, payload: &str) -> String {
    let response = match serde_json::from_str::<RouterRequest>(payload) {
        Ok(request) => handle_request(service, request),
        Err(error) => TransportResponse::Err {
            error: ErrorResponse {
                code: ErrorCode::InvalidJson,
                message: error.to_string(),
            },
        },
    };

    serde_json::to_string(&response).unwrap_or_else(|error| {
        tracing::error!(%error, "failed to encode transport response");
        r#"{"status":"err","error":{"code":"store","message":"response encoding failed"}}"#
            .to_string()
    })
}

fn map_service_error(error: ServiceError) -> ErrorResponse {
    match error {
        ServiceError::InvalidRule(message) => ErrorResponse {
            code: ErrorCode::InvalidRule,
            message,
        },
        ServiceError::Store(StoreError::RuleNotFound(id)) => ErrorResponse {
            code: ErrorCode::RuleNotFound,
            message: format!("rule not found: {id}"),
        },
        ServiceError::Store(error) => ErrorResponse {
            code: ErrorCode::Store,
            message: error.to_string(),
        },
        ServiceError::Config(message) => ErrorResponse {
            code: ErrorCode::Config,
            message,
        },
        ServiceError::Discovery(error) => ErrorResponse {
            code: ErrorCode::Discovery,
            message: error.to_string(),
        },
    }
}

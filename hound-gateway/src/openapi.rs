use crate::api::health::Health;
use crate::api::oauth::models::{
    AuthorizationServerMetadata, ProtectedResourceMetadata, RegistrationRequest,
    RegistrationResponse, TokenRequest, TokenResponse,
};
use crate::errors::OAuthErrorBody;
use utoipa::OpenApi;

pub(crate) const HEALTH_TAG: &str = "Health API";
pub(crate) const OAUTH_TAG: &str = "OAuth API";

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::health::health_check,
        crate::api::oauth::handlers::token,
        crate::api::oauth::handlers::authorize,
        crate::api::oauth::handlers::approve,
        crate::api::oauth::handlers::register,
        crate::api::oauth::metadata::authorization_server,
        crate::api::oauth::metadata::protected_resource,
    ),
    components(schemas(
        Health,
        OAuthErrorBody,
        TokenRequest,
        TokenResponse,
        RegistrationRequest,
        RegistrationResponse,
        AuthorizationServerMetadata,
        ProtectedResourceMetadata,
    )),
    tags(
        (name = HEALTH_TAG, description = "Health check endpoints"),
        (name = OAUTH_TAG, description = "OAuth 2.0 authorization server endpoints"),
    ),
    info(
        title = "MCP-Hound Gateway API",
        description = "Authorization server and session gateway for MCP-Hound",
        version = "0.1.0"
    )
)]
pub(crate) struct ApiDoc;

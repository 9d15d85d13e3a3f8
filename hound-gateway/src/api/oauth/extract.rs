use crate::errors::ApiError;
use axum::extract::{Form, FromRequest, Json, Request};
use base64::{engine::general_purpose::STANDARD, Engine};
use hound_auth::TokenParams;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::HeaderMap;
use log::{debug, warn};

/// Token endpoint parameters from a form or JSON body, merged with HTTP Basic
/// client credentials. Values in the body take precedence over the header.
#[derive(Debug)]
pub struct TokenRequestExtractor(pub TokenParams);

impl<S> FromRequest<S> for TokenRequestExtractor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let basic = basic_credentials(req.headers());
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .unwrap_or("");

        let params = if content_type.starts_with("application/json") {
            match Json::<TokenParams>::from_request(req, state).await {
                Ok(Json(params)) => params,
                Err(e) => {
                    warn!("Rejected token request body: {}", e);
                    return Err(ApiError::invalid_request("Invalid JSON in request body"));
                }
            }
        } else {
            match Form::<TokenParams>::from_request(req, state).await {
                Ok(Form(params)) => params,
                Err(e) => {
                    warn!("Rejected token request body: {}", e);
                    return Err(ApiError::invalid_request("Invalid form data in request body"));
                }
            }
        };

        Ok(Self(match basic {
            Some((client_id, client_secret)) => {
                params.with_basic_credentials(client_id, client_secret)
            }
            None => params,
        }))
    }
}

/// Decodes `Authorization: Basic base64(client_id:client_secret)`.
/// Anything unparseable is ignored.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let encoded = headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Basic ")?;
    let decoded = match STANDARD.decode(encoded.trim()) {
        Ok(bytes) => String::from_utf8(bytes).ok()?,
        Err(_) => {
            debug!("Ignoring undecodable Basic credentials");
            return None;
        }
    };
    let (client_id, client_secret) = decoded.split_once(':')?;
    Some((client_id.to_string(), client_secret.to_string()))
}

use actix_web::{
    body::{EitherBody, MessageBody},
    dev::{ServiceRequest, ServiceResponse},
    http::header,
    middleware::Next,
    web, HttpMessage, HttpRequest,
};
use tracing::*;

use super::{
    error::{Error, Result},
    state::AppState,
};
use crate::auth::{AuthError, Claims};

/// Reject requests without a valid session token, and make the token claims
/// available to the handlers.
pub async fn require_auth<B: MessageBody + 'static>(
    req: ServiceRequest,
    next: Next<B>,
) -> actix_web::Result<ServiceResponse<EitherBody<B>>> {
    match authorize(req.request()) {
        Ok(claims) => {
            trace!("Request authorized for {:?}", claims.sub);
            req.extensions_mut().insert(claims);
            next.call(req)
                .await
                .map(ServiceResponse::map_into_left_body)
        }
        Err(error) => {
            debug!("Unauthorized request to {}: {error}", req.path());
            Ok(req.error_response(error).map_into_right_body())
        }
    }
}

/// Validate the `Authorization` header of a request.
pub fn authorize(req: &HttpRequest) -> Result<Claims> {
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .unwrap_or_default();

    if authorization.is_empty() {
        return Err(AuthError::MissingToken.into());
    }

    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| Error::Internal("application state is missing".to_string()))?;

    Ok(state.authenticator.verify(authorization)?)
}

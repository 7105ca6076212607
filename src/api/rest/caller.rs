use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::access::Caller;
use crate::error::AppError;
use crate::state::AppState;

pub struct CallerIdentity(pub Caller);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .map(|value| {
                value
                    .to_str()
                    .map_err(|_| AppError::Unauthorized("malformed authorization header".to_string()))
            })
            .transpose()?;

        state.identity.resolve_header(header).map(CallerIdentity)
    }
}

//! HTTP handlers for the management surface, the firmware-update route, and
//! the public static catch-all.

pub mod edit_handlers;
pub mod static_handlers;
pub mod update_handlers;

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};
use std::convert::Infallible;

/// Optional HTTP Basic credentials as supplied by the client.
///
/// Extraction never rejects: a missing, malformed, or non-Basic
/// `Authorization` header all come out as no credentials. Every deny is
/// decided by the gate and answered with the 401 challenge, never with an
/// extractor rejection.
pub struct AuthHeader(pub Option<Authorization<Basic>>);

impl<S> FromRequestParts<S> for AuthHeader
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Infallible> {
        let supplied = TypedHeader::<Authorization<Basic>>::from_request_parts(parts, state)
            .await
            .ok()
            .map(|TypedHeader(auth)| auth);
        Ok(Self(supplied))
    }
}

/// Borrow the supplied credentials out of the header, if any.
pub(crate) fn supplied_credentials(header: &AuthHeader) -> Option<&Basic> {
    header.0.as_ref().map(|Authorization(basic)| basic)
}

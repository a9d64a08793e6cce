use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request, HeaderMap},
};
use plants_client::api::{ApiError, MemberId};

use crate::{Error, SharedServer};

/// Value of cookie `name`, if the request carries it
pub fn cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .find_map(|kv| {
            let (k, v) = kv.trim().split_once('=')?;
            (k == name && !v.is_empty()).then(|| String::from(v))
        })
}

fn bearer(headers: &HeaderMap) -> Result<Option<&str>, Error> {
    let Some(auth) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let auth = auth.to_str().map_err(|_| ApiError::unauthorized())?;
    let mut auth = auth.split(' ');
    if !auth
        .next()
        .ok_or_else(ApiError::unauthorized)?
        .eq_ignore_ascii_case("bearer")
    {
        return Err(ApiError::unauthorized().into());
    }
    let token = auth.next().ok_or_else(ApiError::unauthorized)?;
    if auth.next().is_some() {
        return Err(ApiError::unauthorized().into());
    }
    Ok(Some(token))
}

/// A signed-in member
pub struct Auth(pub MemberId);

#[async_trait]
impl FromRequestParts<SharedServer> for Auth {
    type Rejection = Error;

    async fn from_request_parts(req: &mut request::Parts, srv: &SharedServer) -> Result<Auth, Error> {
        let token = bearer(&req.headers)?.ok_or_else(ApiError::unauthorized)?;
        Ok(Auth(srv.lock().resolve(token)?))
    }
}

/// Anonymous callers are fine, but a token that is sent must be valid
pub struct MaybeAuth(pub Option<MemberId>);

#[async_trait]
impl FromRequestParts<SharedServer> for MaybeAuth {
    type Rejection = Error;

    async fn from_request_parts(
        req: &mut request::Parts,
        srv: &SharedServer,
    ) -> Result<MaybeAuth, Error> {
        match bearer(&req.headers)? {
            None => Ok(MaybeAuth(None)),
            Some(token) => Ok(MaybeAuth(Some(srv.lock().resolve(token)?))),
        }
    }
}

/// Member id taken from the first path segment of `/api/v1/members/{id}/..`
pub fn member_id(s: &str) -> Result<MemberId, Error> {
    s.parse().map_err(|_| ApiError::not_found("회원").into())
}

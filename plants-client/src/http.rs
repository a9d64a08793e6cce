use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{
    cookie::{CookieStore, Jar},
    header, Method, Url,
};
use serde::de::DeserializeOwned;

use crate::{
    api::{
        AccessToken, ApiError, ApiResponse, ErrorCode, LoginResponse, REFRESH_TOKEN_COOKIE_NAME,
        REFRESH_TOKEN_MAX_AGE_SECS,
    },
    AuthStore,
};

pub const REFRESH_PATH: &str = "/api/auth/token/refresh";

/// Same set as `encodeURIComponent` leaves alone
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn encode_segment(s: &str) -> String {
    utf8_percent_encode(s, PATH_SEGMENT).to_string()
}

/// A multipart field kept as plain bytes so the request can be rebuilt
#[derive(Clone, Debug)]
pub struct FormPart {
    pub name: &'static str,
    pub filename: Option<String>,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl FormPart {
    pub fn file(name: &'static str, filename: String, mime: String, bytes: Vec<u8>) -> FormPart {
        FormPart {
            name,
            filename: Some(filename),
            mime,
            bytes,
        }
    }

    pub fn text(name: &'static str, value: String) -> FormPart {
        FormPart {
            name,
            filename: None,
            mime: String::from("text/plain; charset=utf-8"),
            bytes: value.into_bytes(),
        }
    }

    pub fn json(name: &'static str, value: &impl serde::Serialize) -> Result<FormPart, ApiError> {
        Ok(FormPart {
            name,
            filename: None,
            mime: String::from("application/json"),
            bytes: serde_json::to_vec(value).map_err(|e| ApiError::invalid_input(e.to_string()))?,
        })
    }

    fn to_part(&self) -> Result<reqwest::multipart::Part, ApiError> {
        let part = reqwest::multipart::Part::bytes(self.bytes.clone())
            .mime_str(&self.mime)
            .map_err(|_| ApiError::invalid_input(format!("invalid content type {}", self.mime)))?;
        Ok(match &self.filename {
            Some(f) => part.file_name(f.clone()),
            None => part,
        })
    }
}

#[derive(Clone, Debug)]
pub enum Body {
    Empty,
    Json(serde_json::Value),
    Multipart(Vec<FormPart>),
}

/// Everything needed to send a call, owned so it can be sent a second time
/// after a token refresh
#[derive(Clone, Debug)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub query: Vec<(&'static str, String)>,
    pub body: Body,
    pub skip_auth: bool,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Request {
        Request {
            method,
            path: path.into(),
            query: Vec::new(),
            body: Body::Empty,
            skip_auth: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Request {
        Request::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Request {
        Request::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Request {
        Request::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Request {
        Request::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Request {
        Request::new(Method::DELETE, path)
    }

    pub fn query(mut self, query: Vec<(&'static str, String)>) -> Request {
        self.query.extend(query);
        self
    }

    pub fn json(mut self, body: &impl serde::Serialize) -> Result<Request, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| ApiError::invalid_input(e.to_string()))?;
        self.body = Body::Json(value);
        Ok(self)
    }

    pub fn multipart(mut self, parts: Vec<FormPart>) -> Request {
        self.body = Body::Multipart(parts);
        self
    }

    /// Sent without bearer token, and a 401 is final
    pub fn skip_auth(mut self) -> Request {
        self.skip_auth = true;
        self
    }
}

fn code_for_status(status: u16) -> &'static str {
    match status {
        401 => ErrorCode::UNAUTHORIZED,
        403 => ErrorCode::FORBIDDEN,
        404 => ErrorCode::NOT_FOUND,
        s if s >= 500 => ErrorCode::INTERNAL,
        _ => "request_failed",
    }
}

/// Reads a response body as an envelope. The envelope status wins over the
/// HTTP one; bodies that are not envelopes fall back on the HTTP status.
pub fn parse_envelope<T: DeserializeOwned>(
    http_status: u16,
    body: &[u8],
) -> Result<ApiResponse<T>, ApiError> {
    let envelope = match serde_json::from_slice::<ApiResponse<serde_json::Value>>(body) {
        Ok(e) => e,
        Err(_) if http_status >= 400 => {
            return Err(ApiError::new(http_status, code_for_status(http_status), ""))
        }
        Err(_) if body.iter().all(u8::is_ascii_whitespace) => {
            return Ok(ApiResponse {
                status: http_status,
                code: String::new(),
                message: String::new(),
                data: None,
            })
        }
        Err(e) => {
            tracing::warn!(error = %e, "response body is not an envelope");
            return Err(ApiError::network());
        }
    };
    if envelope.status >= 400 {
        let code = match envelope.code.is_empty() {
            true => String::from(code_for_status(envelope.status)),
            false => envelope.code,
        };
        return Err(ApiError::new(envelope.status, code, envelope.message));
    }
    let data = match envelope.data {
        None => None,
        Some(d) => Some(serde_json::from_value(d).map_err(|e| {
            tracing::warn!(error = %e, "response data does not have the expected shape");
            ApiError::network()
        })?),
    };
    Ok(ApiResponse {
        status: envelope.status,
        code: envelope.code,
        message: envelope.message,
        data,
    })
}

struct Inner {
    http: reqwest::Client,
    jar: Arc<Jar>,
    base: Url,
    base_str: String,
    auth: AuthStore,
    refreshes: AtomicUsize,
}

/// Handle on the backend. Clones share the connection pool, the cookie jar
/// and the auth store.
#[derive(Clone)]
pub struct ApiClient(Arc<Inner>);

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient").field("base", &self.0.base_str).finish()
    }
}

impl ApiClient {
    pub fn new(base_url: &str, auth: AuthStore) -> Result<ApiClient, ApiError> {
        let base_str = String::from(base_url.trim_end_matches('/'));
        let base = Url::parse(&base_str)
            .map_err(|e| ApiError::invalid_input(format!("invalid host {base_url:?}: {e}")))?;
        let jar = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            .build()
            .map_err(|e| {
                tracing::error!(error = %e, "failed to build http client");
                ApiError::network()
            })?;
        Ok(ApiClient(Arc::new(Inner {
            http,
            jar,
            base,
            base_str,
            auth,
            refreshes: AtomicUsize::new(0),
        })))
    }

    pub fn base_url(&self) -> &str {
        &self.0.base_str
    }

    pub fn auth(&self) -> &AuthStore {
        &self.0.auth
    }

    /// Number of refresh calls made so far
    pub fn refresh_count(&self) -> usize {
        self.0.refreshes.load(Ordering::SeqCst)
    }

    pub fn refresh_token(&self) -> Option<String> {
        let cookies = self.0.jar.cookies(&self.0.base)?;
        let cookies = cookies.to_str().ok()?;
        cookies.split(';').find_map(|kv| {
            let (k, v) = kv.trim().split_once('=')?;
            (k == REFRESH_TOKEN_COOKIE_NAME && !v.is_empty()).then(|| String::from(v))
        })
    }

    pub fn set_refresh_token(&self, value: &str) {
        let cookie = format!(
            "{REFRESH_TOKEN_COOKIE_NAME}={value}; Path=/; HttpOnly; Max-Age={REFRESH_TOKEN_MAX_AGE_SECS}"
        );
        self.0.jar.add_cookie_str(&cookie, &self.0.base);
    }

    pub fn clear_refresh_token(&self) {
        let cookie = format!("{REFRESH_TOKEN_COOKIE_NAME}=; Path=/; Max-Age=0");
        self.0.jar.add_cookie_str(&cookie, &self.0.base);
    }

    /// Sends `req`, refreshing the access token and retrying once on 401
    pub async fn send<T: DeserializeOwned>(&self, req: Request) -> Result<ApiResponse<T>, ApiError> {
        match self.send_once(&req).await {
            Err(e) if e.is_unauthorized() && !req.skip_auth => (),
            res => return res,
        }
        tracing::info!(method = %req.method, path = %req.path, "access token rejected, refreshing");
        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "token refresh failed, clearing session");
            self.0.auth.logout();
            return Err(ApiError::authentication_required());
        }
        self.send_once(&req).await
    }

    /// Like `send`, for calls whose response must carry data
    pub async fn fetch<T: DeserializeOwned>(&self, req: Request) -> Result<T, ApiError> {
        self.send(req).await?.data.ok_or_else(ApiError::invalid_response)
    }

    /// Like `send`, ignoring whatever data comes back
    pub async fn execute(&self, req: Request) -> Result<(), ApiError> {
        self.send::<serde::de::IgnoredAny>(req).await.map(|_| ())
    }

    /// Trades the refresh cookie for a new access token
    pub async fn refresh(&self) -> Result<AccessToken, ApiError> {
        self.0.refreshes.fetch_add(1, Ordering::SeqCst);
        let resp: ApiResponse<LoginResponse> =
            self.send_once(&Request::post(REFRESH_PATH).skip_auth()).await.map_err(|e| {
                match e.code.as_str() {
                    ErrorCode::NETWORK_ERROR => e,
                    _ => ApiError::token_refresh_failed(e.status),
                }
            })?;
        let token = resp.data.ok_or_else(ApiError::invalid_response)?.access_token;
        self.0.auth.set_access_token(token.clone());
        tracing::info!("access token refreshed");
        Ok(token)
    }

    async fn send_once<T: DeserializeOwned>(&self, req: &Request) -> Result<ApiResponse<T>, ApiError> {
        let url = format!("{}{}", self.0.base_str, req.path);
        let mut builder = self
            .0
            .http
            .request(req.method.clone(), url)
            .header(header::CACHE_CONTROL, "no-cache, no-store, must-revalidate")
            .header(header::PRAGMA, "no-cache");
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if !req.skip_auth {
            let now = chrono::Utc::now();
            // an expired token is dropped like its cookie would be
            if let Some(tok) = self.0.auth.access_token().filter(|t| !t.is_expired(now)) {
                builder = builder.bearer_auth(tok.0);
            }
        }
        builder = match &req.body {
            Body::Empty => builder,
            Body::Json(v) => builder.json(v),
            Body::Multipart(parts) => {
                let mut form = reqwest::multipart::Form::new();
                for p in parts {
                    form = form.part(p.name, p.to_part()?);
                }
                builder.multipart(form)
            }
        };

        tracing::debug!(method = %req.method, path = %req.path, "sending request");
        let resp = builder.send().await.map_err(|e| {
            tracing::warn!(method = %req.method, path = %req.path, error = %e, "request failed");
            ApiError::network()
        })?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await.map_err(|e| {
            tracing::warn!(path = %req.path, error = %e, "failed reading response body");
            ApiError::network()
        })?;
        parse_envelope(status, &body)
    }
}

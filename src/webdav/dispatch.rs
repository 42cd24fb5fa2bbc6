//! Request dispatch: one logical operation, bounded redirects, bounded retries.
//!
//! Each operation runs an outer attempt loop around an inner redirect loop. The
//! inner loop follows same-origin redirects up to `max_redirects` hops and then
//! hands the final response to [`validate_status`]. The outer loop repeats the whole
//! attempt only when [`AttemptOutcome::should_retry`] says so.

use std::future::Future;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{HeaderMap, Method, Request, Response, Uri, header};
use tokio::time::{Duration, sleep, timeout};
use tracing::{debug, warn};

use crate::common::compression::{
    add_accept_encoding, decode_body, detect_encodings, normalize_decoded_headers,
};
use crate::common::error::{DavError, FailureCause, OperationFailure};
use crate::common::http::HyperClient;
use crate::webdav::path::{Endpoint, Origin, PathContext};
use crate::webdav::retry::RetryPolicy;
use crate::webdav::types::is_redirect;

/// One logical WebDAV operation: verb, caller path, headers, body and status contract.
#[derive(Debug, Clone)]
pub struct DavRequest<'a> {
    pub method: Method,
    pub path: &'a str,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub expected: &'a [u16],
}

impl<'a> DavRequest<'a> {
    pub fn new(method: Method, path: &'a str, expected: &'a [u16]) -> Self {
        Self {
            method,
            path,
            headers: HeaderMap::new(),
            body: None,
            expected,
        }
    }

    pub fn header(mut self, name: &'static str, value: header::HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }
}

/// Classified result of one whole attempt.
#[derive(Debug)]
pub enum AttemptOutcome<T> {
    Success(T),
    /// Transport trouble or an unexpected non-redirect status.
    Retryable(DavError),
    /// Redirect bound exhausted, missing `Location`, or cross-origin target.
    Redirect(DavError),
    /// Failures another attempt cannot fix, such as an unbuildable request.
    Terminal(DavError),
}

impl<T> AttemptOutcome<T> {
    pub fn classify(result: Result<T, DavError>) -> Self {
        match result {
            Ok(value) => AttemptOutcome::Success(value),
            Err(err) => {
                let redirect = err.operation().is_some_and(|failure| {
                    failure.is_redirect() || failure.cause != FailureCause::OperationFailed
                });
                if redirect {
                    AttemptOutcome::Redirect(err)
                } else if err.is_retryable() {
                    AttemptOutcome::Retryable(err)
                } else {
                    AttemptOutcome::Terminal(err)
                }
            }
        }
    }

    pub fn should_retry(&self) -> bool {
        matches!(self, AttemptOutcome::Retryable(_))
    }
}

/// Check the final status against the operation's expected set.
pub fn validate_status<B>(
    resp: Response<B>,
    method: &Method,
    path: &str,
    expected: &[u16],
) -> Result<Response<B>, DavError> {
    let status = resp.status().as_u16();
    if expected.contains(&status) {
        return Ok(resp);
    }
    Err(OperationFailure::new(
        FailureCause::OperationFailed,
        status,
        method.clone(),
        path,
        expected,
    )
    .into())
}

/// Executes [`DavRequest`]s against one endpoint.
#[derive(Clone)]
pub struct Dispatcher {
    client: HyperClient,
    endpoint: Endpoint,
    auth_header: Option<header::HeaderValue>,
    user_agent: Option<header::HeaderValue>,
    timeout: Duration,
    policy: RetryPolicy,
}

impl Dispatcher {
    pub fn new(
        client: HyperClient,
        endpoint: Endpoint,
        auth_header: Option<header::HeaderValue>,
        user_agent: Option<header::HeaderValue>,
        timeout: Duration,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            client,
            endpoint,
            auth_header,
            user_agent,
            timeout,
            policy,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `req` and aggregate (and decode) the validated response body.
    pub async fn execute(
        &self,
        ctx: &PathContext,
        req: &DavRequest<'_>,
    ) -> Result<Response<Bytes>, DavError> {
        self.execute_with(ctx, req, aggregate).await
    }

    /// Run `req` and hand the validated, still-streaming response to `handle`.
    ///
    /// `handle` is part of the attempt: its retryable errors (such as
    /// [`DavError::Body`]) repeat the whole request.
    pub async fn execute_with<T, F, Fut>(
        &self,
        ctx: &PathContext,
        req: &DavRequest<'_>,
        handle: F,
    ) -> Result<T, DavError>
    where
        F: Fn(Response<Incoming>) -> Fut,
        Fut: Future<Output = Result<T, DavError>>,
    {
        let handle = &handle;
        self.with_retries(req, || async move {
            let resp = self.attempt(ctx, req).await?;
            handle(resp).await
        })
        .await
    }

    async fn with_retries<T, F, Fut>(&self, req: &DavRequest<'_>, mut op: F) -> Result<T, DavError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DavError>>,
    {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 1;
        loop {
            match AttemptOutcome::classify(op().await) {
                AttemptOutcome::Success(value) => return Ok(value),
                AttemptOutcome::Retryable(err) if attempt < max_attempts => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        method = %req.method,
                        path = req.path,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "attempt failed, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                AttemptOutcome::Retryable(err) => {
                    debug!(method = %req.method, path = req.path, attempt, "attempts exhausted");
                    return Err(err);
                }
                AttemptOutcome::Redirect(err) | AttemptOutcome::Terminal(err) => return Err(err),
            }
        }
    }

    /// One attempt: send, follow same-origin redirects within the bound, validate.
    async fn attempt(
        &self,
        ctx: &PathContext,
        req: &DavRequest<'_>,
    ) -> Result<Response<Incoming>, DavError> {
        let mut uri = self.endpoint.resolve(ctx, req.path)?;
        let mut hop: u32 = 0;

        let resp = loop {
            hop += 1;
            let resp = self.send_once(req, &uri).await?;
            let status = resp.status().as_u16();
            if !is_redirect(status) {
                break resp;
            }
            if hop > self.policy.max_redirects() {
                debug!(%uri, status, hop, "redirect bound reached");
                break resp;
            }

            let redirect_failure = |cause| {
                DavError::from(OperationFailure::new(
                    cause,
                    status,
                    req.method.clone(),
                    req.path,
                    req.expected,
                ))
            };

            let Some(location) = resp
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
            else {
                return Err(redirect_failure(FailureCause::RedirectWithoutLocation));
            };

            let target_path = match location.parse::<Uri>() {
                Ok(target) => {
                    if target.scheme().is_some() && Origin::of(&target) != Origin::of(&uri) {
                        warn!(%uri, location, "refusing cross-origin redirect");
                        return Err(redirect_failure(FailureCause::RedirectOriginChange));
                    }
                    target.path().to_string()
                }
                Err(_) => location.to_string(),
            };

            let next = self.endpoint.resolve_location(ctx, &target_path)?;
            let delay = self.policy.delay_for(hop);
            debug!(from = %uri, to = %next, status, hop, delay_ms = delay.as_millis() as u64, "following redirect");
            uri = next;
            sleep(delay).await;
        };

        validate_status(resp, &req.method, req.path, req.expected)
    }

    async fn send_once(
        &self,
        req: &DavRequest<'_>,
        uri: &Uri,
    ) -> Result<Response<Incoming>, DavError> {
        let mut headers = req.headers.clone();
        add_accept_encoding(&mut headers);
        if let Some(agent) = &self.user_agent
            && !headers.contains_key(header::USER_AGENT)
        {
            headers.insert(header::USER_AGENT, agent.clone());
        }
        // Credentials only ever go to the endpoint origin.
        if let Some(auth) = &self.auth_header
            && Origin::of(uri).as_ref() == Some(self.endpoint.origin())
        {
            headers.insert(header::AUTHORIZATION, auth.clone());
        }

        let mut builder = Request::builder().method(req.method.clone()).uri(uri.clone());
        if let Some(h) = builder.headers_mut() {
            h.extend(headers);
        }
        let request = builder.body(Full::new(req.body.clone().unwrap_or_default()))?;

        debug!(method = %req.method, %uri, "sending request");
        match timeout(self.timeout, self.client.request(request)).await {
            Ok(Ok(resp)) => Ok(resp),
            Ok(Err(source)) => Err(DavError::Transport {
                method: req.method.clone(),
                url: uri.to_string(),
                source,
            }),
            Err(_) => Err(DavError::Timeout {
                method: req.method.clone(),
                url: uri.to_string(),
            }),
        }
    }
}

async fn aggregate(resp: Response<Incoming>) -> Result<Response<Bytes>, DavError> {
    let encodings = detect_encodings(resp.headers());
    let (mut parts, body) = resp.into_parts();
    let decoded = decode_body(body, &encodings).await.map_err(DavError::Body)?;
    normalize_decoded_headers(&mut parts.headers, &encodings, decoded.len());
    Ok(Response::from_parts(parts, decoded))
}

//! OAuth bearer-token resolver.
//!
//! Tokens are read from the `Authorization` header. A token listed in
//! [`OAuthResolver::valid_token`] resolves to its configured value without
//! any verification; any other token is verified as a JWT:
//!
//! 1. The `kid` header names the signing key (non-alphanumeric characters
//!    are dropped before lookup).
//! 2. On a cache miss the unverified `iss` claim is checked against the
//!    allowed domains, then the issuer's OpenID discovery document and JWKS
//!    are fetched through the [`KeySource`] and every key is cached.
//! 3. The token is verified with the client id as audience. The decoded
//!    claims become the bound value.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use chrono::Utc;
use http::header::AUTHORIZATION;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use parking_lot::RwLock;
use restbind_core::{try_with_version_hooks, FrameworkAdapter, RestError, RestResult};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{ExtractionSource, FieldResolver};

/// The default argument name for OAuth binders.
pub const DEFAULT_OAUTH_FIELD: &str = "user_auth";

const BEARER_PREFIX: &str = "Bearer ";
const INVALID_KEY: &str = "The public key used to sign the token is not valid.";

/// Which JWT checks to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Check the signature.
    pub verify_signature: bool,
    /// Check `aud` against the client id.
    pub verify_aud: bool,
    /// Check `exp`.
    pub verify_exp: bool,
    /// Check `nbf`.
    pub verify_nbf: bool,
    /// Check `iss` against the issuer the key was fetched for.
    pub verify_iss: bool,
    /// Clock skew tolerance, in seconds.
    pub leeway: u64,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            verify_signature: true,
            verify_aud: true,
            verify_exp: true,
            verify_nbf: true,
            verify_iss: false,
            leeway: 0,
        }
    }
}

/// Signing keys by cleaned key id.
///
/// One cache is normally shared by every OAuth binder of a service, so that
/// keys fetched for one route serve all of them.
#[derive(Default)]
pub struct KeyCache {
    keys: RwLock<HashMap<String, DecodingKey>>,
}

impl KeyCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the key for `kid`.
    #[must_use]
    pub fn get(&self, kid: &str) -> Option<DecodingKey> {
        self.keys.read().get(kid).cloned()
    }

    /// Adds keys, replacing any with the same id.
    pub fn extend(&self, keys: impl IntoIterator<Item = (String, DecodingKey)>) {
        self.keys.write().extend(keys);
    }

    /// Returns the number of cached keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    /// Returns `true` when no key is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }

    /// Drops every cached key.
    pub fn clear(&self) {
        self.keys.write().clear();
    }
}

impl fmt::Debug for KeyCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyCache")
            .field("keys", &self.keys.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Fetches the JSON Web Keys of an issuer.
#[async_trait]
pub trait KeySource: Send + Sync + fmt::Debug {
    /// Returns the JWK objects (the `keys` array of the JWKS document).
    async fn fetch_keys(&self, issuer: &str) -> RestResult<Vec<Value>>;
}

/// Fetches keys over HTTP through OpenID Connect discovery.
#[derive(Debug, Clone)]
pub struct HttpKeySource {
    client: reqwest::Client,
}

impl HttpKeySource {
    /// Creates a key source whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> RestResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RestError::internal_with_source("failed to build HTTP client", e))?;
        Ok(Self { client })
    }

    async fn get_json(&self, url: &str) -> RestResult<Value> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| {
                warn!(url = %url, error = %e, "key discovery request failed");
                RestError::unauthorized(INVALID_KEY)
            })?;
        response.json().await.map_err(|e| {
            warn!(url = %url, error = %e, "key discovery returned invalid JSON");
            RestError::unauthorized(INVALID_KEY)
        })
    }
}

#[async_trait]
impl KeySource for HttpKeySource {
    async fn fetch_keys(&self, issuer: &str) -> RestResult<Vec<Value>> {
        let discovery_url = format!(
            "{}/.well-known/openid-configuration",
            issuer.trim_end_matches('/')
        );
        let discovery = self.get_json(&discovery_url).await?;
        let jwks_uri = discovery
            .get("jwks_uri")
            .and_then(Value::as_str)
            .ok_or_else(|| RestError::unauthorized(INVALID_KEY))?;

        let jwks = self.get_json(jwks_uri).await?;
        Ok(jwks
            .get("keys")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }
}

/// Resolves the caller's identity from a bearer token.
#[derive(Debug, Clone)]
pub struct OAuthResolver {
    client_id: Option<String>,
    valid_tokens: HashMap<String, Value>,
    allowed_domains: Option<Vec<String>>,
    options: ValidationOptions,
    cache: Arc<KeyCache>,
    source: Option<Arc<dyn KeySource>>,
}

impl Default for OAuthResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl OAuthResolver {
    /// Creates a resolver with a private key cache and no key source.
    ///
    /// Without a key source only [`valid_token`](Self::valid_token) tokens
    /// and keys already in the cache are accepted.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client_id: None,
            valid_tokens: HashMap::new(),
            allowed_domains: None,
            options: ValidationOptions::default(),
            cache: Arc::new(KeyCache::new()),
            source: None,
        }
    }

    /// Expected audience of verified tokens.
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Accepts `token` without verification, resolving it to `value`.
    pub fn valid_token(mut self, token: impl Into<String>, value: Value) -> Self {
        self.valid_tokens.insert(token.into(), value);
        self
    }

    /// Restricts the issuers whose keys may be fetched, by host (and port).
    pub fn allowed_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_domains = Some(domains.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the JWT checks.
    pub fn options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self
    }

    /// Shares a key cache with other resolvers.
    pub fn key_cache(mut self, cache: Arc<KeyCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Sets where keys are fetched from on a cache miss.
    pub fn key_source(mut self, source: Arc<dyn KeySource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Returns the key cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<KeyCache> {
        &self.cache
    }

    /// Resolves a raw token (without the `Bearer ` prefix).
    pub async fn resolve_token(&self, token: &str) -> RestResult<Value> {
        if let Some(value) = self.valid_tokens.get(token) {
            return Ok(value.clone());
        }
        if !self.options.verify_signature {
            return self.decode_unverified(token);
        }

        let header = jsonwebtoken::decode_header(token).map_err(|e| {
            debug!(error = %e, "bearer token header is not valid");
            RestError::unauthorized("The token is not a valid JWT.")
        })?;
        let kid = header
            .kid
            .as_deref()
            .map(clean_kid)
            .ok_or_else(|| RestError::unauthorized("The token does not name its signing key."))?;

        let key = match self.cache.get(&kid) {
            Some(key) => key,
            None => self.fetch_key(token, &kid).await?,
        };

        let validation = self.validation(header.alg, token)?;
        jsonwebtoken::decode::<Value>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, kid = %kid, "bearer token rejected");
                RestError::forbidden_with_source(format!("The token is not valid: {e}"), e)
            })
    }

    async fn fetch_key(&self, token: &str, kid: &str) -> RestResult<DecodingKey> {
        let issuer = unverified_issuer(token)?;
        if let Some(domains) = &self.allowed_domains {
            let domain = issuer_domain(&issuer)?;
            if !domains.iter().any(|d| d == &domain) {
                warn!(issuer = %issuer, "token issuer is not an allowed domain");
                return Err(RestError::unauthorized(format!(
                    "The token issuer {domain} is not allowed."
                )));
            }
        }
        let Some(source) = &self.source else {
            return Err(RestError::unauthorized(INVALID_KEY));
        };

        let jwks = source.fetch_keys(&issuer).await?;
        let keys: Vec<(String, DecodingKey)> = jwks.iter().filter_map(decoding_key).collect();
        debug!(issuer = %issuer, count = keys.len(), "fetched signing keys");
        self.cache.extend(keys);

        self.cache
            .get(kid)
            .ok_or_else(|| RestError::unauthorized(INVALID_KEY))
    }

    fn validation(&self, alg: Algorithm, token: &str) -> RestResult<Validation> {
        let opts = &self.options;
        let mut validation = Validation::new(alg);
        validation.leeway = opts.leeway;
        validation.validate_exp = opts.verify_exp;
        validation.validate_nbf = opts.verify_nbf;
        if !opts.verify_exp {
            validation.required_spec_claims.remove("exp");
        }
        match (&self.client_id, opts.verify_aud) {
            (Some(client_id), true) => validation.set_audience(&[client_id]),
            _ => validation.validate_aud = false,
        }
        if opts.verify_iss {
            validation.set_issuer(&[unverified_issuer(token)?]);
        }
        Ok(validation)
    }

    /// Decodes a token without checking its signature. The enabled claim
    /// checks still apply.
    fn decode_unverified(&self, token: &str) -> RestResult<Value> {
        let claims = jsonwebtoken::dangerous::insecure_decode::<Value>(token)
            .map_err(|e| {
                debug!(error = %e, "bearer token is not a valid JWT");
                RestError::unauthorized("The token is not a valid JWT.")
            })?
            .claims;

        let opts = &self.options;
        let now = Utc::now().timestamp();
        let leeway = i64::try_from(opts.leeway).unwrap_or(i64::MAX);
        let number = |name: &str| claims.get(name).and_then(Value::as_i64);
        let reject = |reason: &str| RestError::forbidden(format!("The token is not valid: {reason}"));

        if opts.verify_exp {
            match number("exp") {
                None => return Err(reject("Missing required claim: exp")),
                Some(exp) if exp < now.saturating_sub(leeway) => {
                    return Err(reject("ExpiredSignature"))
                }
                Some(_) => {}
            }
        }
        if opts.verify_nbf {
            if let Some(nbf) = number("nbf") {
                if nbf > now.saturating_add(leeway) {
                    return Err(reject("ImmatureSignature"));
                }
            }
        }
        if let (Some(client_id), true) = (&self.client_id, opts.verify_aud) {
            let matches = match claims.get("aud") {
                Some(Value::String(aud)) => aud == client_id,
                Some(Value::Array(auds)) => auds.iter().any(|a| a.as_str() == Some(client_id)),
                _ => false,
            };
            if !matches {
                return Err(reject("InvalidAudience"));
            }
        }
        Ok(claims)
    }
}

#[async_trait]
impl FieldResolver for OAuthResolver {
    async fn resolve(&self, adapter: &dyn FrameworkAdapter) -> RestResult<Value> {
        let headers = try_with_version_hooks(adapter, adapter.headers(), |hooks, headers| {
            hooks.headers(headers)
        })?;
        let raw = headers
            .get(AUTHORIZATION)
            .ok_or_else(|| ExtractionSource::Authorization.missing(AUTHORIZATION.as_str()))?;
        let raw = raw
            .to_str()
            .map_err(|_| RestError::unauthorized("The authorization header is not valid."))?;
        let token = raw.strip_prefix(BEARER_PREFIX).unwrap_or(raw);
        self.resolve_token(token).await
    }

    fn source(&self) -> ExtractionSource {
        ExtractionSource::Authorization
    }

    fn source_field(&self) -> &str {
        AUTHORIZATION.as_str()
    }
}

/// Drops every non-alphanumeric character from a key id.
#[must_use]
pub fn clean_kid(kid: &str) -> String {
    kid.chars().filter(char::is_ascii_alphanumeric).collect()
}

fn unverified_issuer(token: &str) -> RestResult<String> {
    let invalid = || RestError::unauthorized("The token does not name a valid issuer.");
    let payload = token.split('.').nth(1).ok_or_else(invalid)?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| invalid())?;
    let claims: Value = serde_json::from_slice(&bytes).map_err(|_| invalid())?;
    claims
        .get("iss")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(invalid)
}

fn issuer_domain(issuer: &str) -> RestResult<String> {
    let url = url::Url::parse(issuer)
        .map_err(|_| RestError::unauthorized("The token does not name a valid issuer."))?;
    let host = url.host_str().unwrap_or_default();
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

/// Converts one JWK into a cache entry. Unsupported keys are skipped.
fn decoding_key(jwk: &Value) -> Option<(String, DecodingKey)> {
    let kid = clean_kid(jwk.get("kid").and_then(Value::as_str)?);
    let kty = jwk.get("kty").and_then(Value::as_str).unwrap_or_default();
    let field = |name: &str| jwk.get(name).and_then(Value::as_str);

    let key = if kty.eq_ignore_ascii_case("oct") {
        let secret = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(field("k")?.trim_end_matches('='))
            .ok()?;
        DecodingKey::from_secret(&secret)
    } else if kty.eq_ignore_ascii_case("RSA") {
        DecodingKey::from_rsa_components(field("n")?, field("e")?).ok()?
    } else if kty.eq_ignore_ascii_case("EC") {
        DecodingKey::from_ec_components(field("x")?, field("y")?).ok()?
    } else {
        debug!(kty = %kty, kid = %kid, "skipping unsupported key type");
        return None;
    };
    Some((kid, key))
}

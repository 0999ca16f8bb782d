//! End-to-end tests driving the composed pipeline directly, no sockets.
//!
//! The greeter service mirrors a realistic deployment: one public
//! endpoint, one role-gated endpoint, and an authenticator that signs
//! tokens with a real ed25519 key so "valid token", "token from an
//! untrusted key", and "expired token" are all honestly distinct cases.

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use bytes::Bytes;
use chrono::{Duration, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use graft::middleware::{BearerAuth, HttpRequest, HttpResponse, InjectValues, TraceLog};
use graft::{
    App, AuthError, Authenticator, Claims, Endpoint, Invalid, ROLE_USER, Rpc, RpcError,
    RpcRequest, RpcService, Validate, codec,
};

// ── Test authenticator ────────────────────────────────────────────────────────

/// Signs `base64(claims-json).base64(ed25519-signature)` tokens.
struct KeyAuth {
    signing: SigningKey,
    verifying: VerifyingKey,
}

impl KeyAuth {
    fn generate() -> Self {
        let signing = SigningKey::generate(&mut OsRng);
        let verifying = signing.verifying_key();
        Self { signing, verifying }
    }
}

impl Authenticator for KeyAuth {
    fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let (payload_b64, sig_b64) = token.split_once('.').ok_or(AuthError::Malformed)?;
        let payload = URL_SAFE_NO_PAD.decode(payload_b64).map_err(|_| AuthError::Malformed)?;
        let sig_bytes = URL_SAFE_NO_PAD.decode(sig_b64).map_err(|_| AuthError::Malformed)?;
        let sig_bytes: [u8; 64] =
            sig_bytes.as_slice().try_into().map_err(|_| AuthError::Malformed)?;

        self.verifying
            .verify(&payload, &Signature::from_bytes(&sig_bytes))
            .map_err(|_| AuthError::InvalidSignature)?;

        let claims: Claims =
            serde_json::from_slice(&payload).map_err(|_| AuthError::Malformed)?;
        if claims.expired(Utc::now()) {
            return Err(AuthError::Expired);
        }
        Ok(claims)
    }

    fn generate_token(&self, claims: Claims) -> Result<String, AuthError> {
        let payload = serde_json::to_vec(&claims).map_err(|e| AuthError::Other(e.to_string()))?;
        let sig = self.signing.sign(&payload);
        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(sig.to_bytes())
        ))
    }
}

fn user_claims(roles: &[&str]) -> Claims {
    Claims {
        subject: "5cf37266-3473-4006-984f-9325122678b7".into(),
        issuer: "graft tests".into(),
        issued_at: Some(Utc::now()),
        expires_at: Some(Utc::now() + Duration::hours(1)),
        roles: roles.iter().map(|r| (*r).to_owned()).collect(),
    }
}

// ── Greeter service ───────────────────────────────────────────────────────────

struct GreeterService;

impl RpcService for GreeterService {
    fn register(self, rpc: Rpc) -> Rpc {
        rpc.register("GreeterService", "Greet", Endpoint::public(greet))
            .register(
                "GreeterService",
                "SecretGreet",
                Endpoint::restricted([ROLE_USER], secret_greet),
            )
    }
}

#[derive(Deserialize)]
struct GreetRequest {
    #[serde(rename = "Name")]
    name: String,
}

impl Validate for GreetRequest {
    fn validate(&self) -> Result<(), Invalid> {
        let mut violations = Invalid::new();
        if self.name.is_empty() {
            violations.push("Name", "Name must be at least 1 character in length");
        }
        violations.finish()
    }
}

#[derive(Serialize)]
struct GreetResponse {
    #[serde(rename = "Greeting")]
    greeting: String,
}

impl Validate for GreetResponse {
    fn validate(&self) -> Result<(), Invalid> {
        Ok(())
    }
}

async fn greet(req: RpcRequest, body: Bytes) -> Result<GreetResponse, RpcError> {
    let input: GreetRequest = codec::decode(&body)?;
    input.validate()?;
    Ok(GreetResponse {
        greeting: format!("Hello {}, the current time is {}", input.name, req.values.begun_at()),
    })
}

#[derive(Deserialize)]
struct SecretGreetRequest {
    alias: String,
}

impl Validate for SecretGreetRequest {
    fn validate(&self) -> Result<(), Invalid> {
        let mut violations = Invalid::new();
        if self.alias.is_empty() {
            violations.push("alias", "alias must be at least 1 character in length");
        }
        violations.finish()
    }
}

#[derive(Serialize)]
struct SecretGreetResponse {
    #[serde(rename = "SecretGreeting")]
    secret_greeting: String,
    #[serde(rename = "Error")]
    error: String,
}

impl Validate for SecretGreetResponse {
    fn validate(&self) -> Result<(), Invalid> {
        Ok(())
    }
}

/// Reports bad input inside its 200 response rather than through the
/// error envelope, so clients get the structured violation text.
async fn secret_greet(req: RpcRequest, body: Bytes) -> Result<SecretGreetResponse, RpcError> {
    let input: SecretGreetRequest = match codec::decode(&body) {
        Ok(input) => input,
        Err(_) => {
            return Ok(SecretGreetResponse {
                secret_greeting: String::new(),
                error: "invalid SecretGreetRequest data".into(),
            });
        }
    };

    if let Err(invalid) = input.validate() {
        return Ok(SecretGreetResponse {
            secret_greeting: String::new(),
            error: format!("validating data: {invalid}"),
        });
    }

    Ok(SecretGreetResponse {
        secret_greeting: format!(
            "Hello {}, meet at {}",
            input.alias,
            req.values.begun_at() + Duration::hours(2)
        ),
        error: String::new(),
    })
}

// ── Harness ───────────────────────────────────────────────────────────────────

fn app(auth: Arc<KeyAuth>) -> App {
    Rpc::new()
        .intercept(InjectValues)
        .intercept(TraceLog)
        .intercept(BearerAuth::new(auth))
        .service(GreeterService)
        .build()
}

fn rpc_post(path: &str, body: &str, token: Option<&str>) -> HttpRequest {
    let mut builder = http::Request::builder()
        .method(http::Method::POST)
        .uri(path)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder
        .body(
            Full::new(Bytes::from(body.to_owned()))
                .map_err(|never: Infallible| -> hyper::Error { match never {} })
                .boxed(),
        )
        .unwrap()
}

async fn body_text(resp: HttpResponse) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn public_greet_needs_no_credential() {
    let app = app(Arc::new(KeyAuth::generate()));

    let resp = app
        .handle(rpc_post("/v1/GreeterService.Greet", r#"{"Name":"seed"}"#, None))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = serde_json::from_str(&body_text(resp).await).unwrap();
    let greeting = body["Greeting"].as_str().unwrap();
    assert!(greeting.contains("seed"), "greeting should mention the caller: {greeting}");
    assert!(
        greeting.contains("the current time is"),
        "greeting should carry the request timestamp: {greeting}"
    );
}

#[tokio::test]
async fn empty_alias_yields_structured_violation_text() {
    let auth = Arc::new(KeyAuth::generate());
    let token = auth.generate_token(user_claims(&[ROLE_USER])).unwrap();
    let app = app(Arc::clone(&auth));

    let resp = app
        .handle(rpc_post("/v1/GreeterService.SecretGreet", r#"{"alias":""}"#, Some(&token)))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = serde_json::from_str(&body_text(resp).await).unwrap();
    assert_eq!(
        body["Error"].as_str().unwrap(),
        r#"validating data: [{"field":"alias","error":"alias must be at least 1 character in length"}]"#
    );
}

#[tokio::test]
async fn valid_alias_gets_a_secret_greeting() {
    let auth = Arc::new(KeyAuth::generate());
    let token = auth.generate_token(user_claims(&[ROLE_USER])).unwrap();
    let app = app(Arc::clone(&auth));

    let resp = app
        .handle(rpc_post(
            "/v1/GreeterService.SecretGreet",
            r#"{"alias":"Seed Client"}"#,
            Some(&token),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = serde_json::from_str(&body_text(resp).await).unwrap();
    assert!(body["SecretGreeting"].as_str().unwrap().contains("Seed Client"));
    assert_eq!(body["Error"].as_str().unwrap(), "");
}

#[tokio::test]
async fn token_from_an_untrusted_key_is_unauthorized() {
    let trusted = Arc::new(KeyAuth::generate());
    let untrusted = KeyAuth::generate();
    let token = untrusted.generate_token(user_claims(&[ROLE_USER])).unwrap();
    let app = app(Arc::clone(&trusted));

    let resp = app
        .handle(rpc_post(
            "/v1/GreeterService.SecretGreet",
            r#"{"alias":"Suspicious Client"}"#,
            Some(&token),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_text(resp).await, "401 Unauthorized\n");
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    let app = app(Arc::new(KeyAuth::generate()));

    let resp = app.handle(rpc_post("/v1/Nonexistent.Method", "{}", None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(resp).await, "404 page not found\n");
}

#[tokio::test]
async fn expired_token_is_unauthorized() {
    let auth = Arc::new(KeyAuth::generate());
    let mut claims = user_claims(&[ROLE_USER]);
    claims.expires_at = Some(Utc::now() - Duration::minutes(5));
    let token = auth.generate_token(claims).unwrap();
    let app = app(Arc::clone(&auth));

    let resp = app
        .handle(rpc_post("/v1/GreeterService.SecretGreet", r#"{"alias":"x"}"#, Some(&token)))
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// ── Access-decision paths ─────────────────────────────────────────────────────

/// Counts invocations so the tests can assert the handler never ran.
struct Counting {
    calls: Arc<AtomicUsize>,
}

impl RpcService for Counting {
    fn register(self, rpc: Rpc) -> Rpc {
        let calls = self.calls;
        rpc.register(
            "AdminService",
            "Touch",
            Endpoint::restricted(["ADMIN"], move |_req: RpcRequest, _body: Bytes| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, RpcError>(TouchResponse)
                }
            }),
        )
    }
}

#[derive(Serialize)]
struct TouchResponse;

impl Validate for TouchResponse {
    fn validate(&self) -> Result<(), Invalid> {
        Ok(())
    }
}

fn counting_app(auth: Arc<KeyAuth>) -> (App, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = Rpc::new()
        .intercept(InjectValues)
        .intercept(BearerAuth::new(auth))
        .service(Counting { calls: Arc::clone(&calls) })
        .build();
    (app, calls)
}

#[tokio::test]
async fn missing_credential_never_reaches_the_handler() {
    let (app, calls) = counting_app(Arc::new(KeyAuth::generate()));

    let resp = app.handle(rpc_post("/v1/AdminService.Touch", "{}", None)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

/// Valid claims with an empty role set reach the authorizer and are
/// denied there — a different pipeline step than the missing-claims case
/// above, with the same client-visible outcome.
#[tokio::test]
async fn empty_role_set_is_denied_by_the_authorizer() {
    let auth = Arc::new(KeyAuth::generate());
    let token = auth.generate_token(user_claims(&[])).unwrap();
    let (app, calls) = counting_app(Arc::clone(&auth));

    let resp = app
        .handle(rpc_post("/v1/AdminService.Touch", "{}", Some(&token)))
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_text(resp).await, "401 Unauthorized\n");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

// ── Pipeline configuration and encoding ───────────────────────────────────────

#[tokio::test]
async fn missing_values_interceptor_is_a_server_misconfiguration() {
    // No InjectValues: every call must be refused with 406.
    let app = Rpc::new()
        .service(GreeterService)
        .build();

    let resp = app
        .handle(rpc_post("/v1/GreeterService.Greet", r#"{"Name":"seed"}"#, None))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_ACCEPTABLE);
    assert_eq!(body_text(resp).await, "406 Not Acceptable\n");
}

#[tokio::test]
async fn gzip_negotiation_round_trips() {
    use std::io::Read;

    let app = app(Arc::new(KeyAuth::generate()));

    let mut req = rpc_post("/v1/GreeterService.Greet", r#"{"Name":"zipped"}"#, None);
    req.headers_mut()
        .insert("accept-encoding", http::HeaderValue::from_static("gzip"));

    let resp = app.handle(req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-encoding"], "gzip");

    let compressed = resp.into_body().collect().await.unwrap().to_bytes();
    let mut inflated = String::new();
    flate2::read::GzDecoder::new(&compressed[..])
        .read_to_string(&mut inflated)
        .unwrap();

    let body: Value = serde_json::from_str(&inflated).unwrap();
    assert!(body["Greeting"].as_str().unwrap().contains("zipped"));
}

#[tokio::test]
async fn handler_failures_share_one_error_envelope() {
    let app = app(Arc::new(KeyAuth::generate()));

    let resp = app
        .handle(rpc_post("/v1/GreeterService.Greet", "{not json", None))
        .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = serde_json::from_str(&body_text(resp).await).unwrap();
    assert!(
        body["error"].as_str().unwrap().starts_with("decoding request:"),
        "envelope should carry the decode failure: {body}"
    );
}

#[tokio::test]
async fn request_validation_failure_uses_the_envelope_too() {
    let app = app(Arc::new(KeyAuth::generate()));

    let resp = app
        .handle(rpc_post("/v1/GreeterService.Greet", r#"{"Name":""}"#, None))
        .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = serde_json::from_str(&body_text(resp).await).unwrap();
    let msg = body["error"].as_str().unwrap();
    assert!(msg.starts_with("validating data:"), "unexpected envelope: {msg}");
    assert!(msg.contains(r#""field":"Name""#), "unexpected envelope: {msg}");
}

/// Response hardening for a JSON-only API
///
/// Every response gets `nosniff`, `X-Frame-Options: DENY`,
/// `Referrer-Policy: no-referrer` and a CSP that forbids loading or framing
/// anything. HSTS is added only when the deployment serves HTTPS, which is
/// the same switch that marks cookies `Secure`.
///
/// ```no_run
/// use axum::{middleware::from_fn_with_state, Router};
/// use taskmanager_api::middleware::security::{security_headers, SecurityPolicy};
///
/// let app: Router = Router::new()
///     .layer(from_fn_with_state(SecurityPolicy { hsts: true }, security_headers));
/// ```

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};

const CSP: &str = "default-src 'none'; frame-ancestors 'none'";
const HSTS: &str = "max-age=31536000; includeSubDomains";

#[derive(Debug, Clone, Copy)]
pub struct SecurityPolicy {
    pub hsts: bool,
}

impl SecurityPolicy {
    fn apply(&self, headers: &mut HeaderMap) {
        let fixed = [
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
            (header::X_FRAME_OPTIONS, "DENY"),
            (header::REFERRER_POLICY, "no-referrer"),
            (header::CONTENT_SECURITY_POLICY, CSP),
        ];
        for (name, value) in fixed {
            headers.insert(name, HeaderValue::from_static(value));
        }

        if self.hsts {
            headers.insert(header::STRICT_TRANSPORT_SECURITY, HeaderValue::from_static(HSTS));
        }
    }
}

pub async fn security_headers(
    State(policy): State<SecurityPolicy>,
    req: Request,
    next: Next,
) -> Response {
    let mut response = next.run(req).await;
    policy.apply(response.headers_mut());
    response
}

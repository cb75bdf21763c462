//! HTTP middleware and request extractors.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, HTTP context)
//! 2. `TraceLayer` (request span with `request_id` / `session_id` fields)
//! 3. Request ID (reuse or generate, echo in response)
//! 4. CORS (storefront origin, credentials allowed)
//!
//! Session identity is resolved per handler through the [`Session`]
//! extractor rather than a layer, since only cart and checkout routes need it.

pub mod request_id;
pub mod session;

pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use session::{
    SESSION_COOKIE_NAME, SESSION_HEADER, Session, clear_session_cookie, set_session_cookie,
};

/// Router Module Index
///
/// Organizes the application's routing logic into security-segregated modules,
/// enforcing a Defense-in-Depth strategy. Access control is applied explicitly at
/// the module level (via Axum layers), preventing accidental exposure of
/// protected endpoints.
///
/// The three modules map directly to the route classifications of the access gate.

/// Routes accessible to all users: marketing pages and the read-only content API.
/// The access gate does not run here.
pub mod public;

/// Routes wrapped by the access gate: the auth entry pages (Public
/// classification, reachable without a session) and the client portal
/// (session required).
pub mod portal;

/// Routes restricted exclusively to allow-listed administrators. Pages pass the
/// access gate *and* the server-side admin re-check.
pub mod admin;

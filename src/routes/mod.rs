/// Router Module Index
///
/// Organizes the routing surface into security-segregated modules so the
/// access-control boundary of every endpoint is visible from its module:
/// the token validator runs as a layer over everything outside `public`,
/// and role checks sit inside the admin handlers.

/// Routes accessible without a token: health, signup, login.
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware.
pub mod authenticated;

/// Routes restricted to elevated roles (admin/superUser), checked per
/// handler via the role gate.
pub mod admin;

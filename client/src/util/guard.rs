//! Route access rules shared by every navigation surface.
//!
//! SYSTEM CONTEXT
//! ==============
//! Protected pages send signed-out users to `/login`; guest pages send
//! signed-in users home. Nothing is decided while the session is still
//! bootstrapping.

#[cfg(test)]
#[path = "guard_test.rs"]
mod guard_test;

use crate::state::session::SessionState;

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/";

/// Who may view a route.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteAccess {
    Public,
    /// Requires a signed-in user.
    Protected,
    /// Only for signed-out users (login, signup).
    GuestOnly,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session still loading; render nothing yet.
    Wait,
    Allow,
    Redirect(String),
}

/// Access rule for an application path. Unknown paths are public.
#[must_use]
pub fn route_access(path: &str) -> RouteAccess {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    match path.trim_end_matches('/') {
        "/create" | "/profile" => RouteAccess::Protected,
        "/login" | "/signup" => RouteAccess::GuestOnly,
        _ => RouteAccess::Public,
    }
}

#[must_use]
pub fn guard(access: RouteAccess, session: &SessionState) -> GuardDecision {
    if access == RouteAccess::Public {
        return GuardDecision::Allow;
    }
    if session.loading {
        return GuardDecision::Wait;
    }
    match (access, session.user.is_some()) {
        (RouteAccess::Protected, false) => GuardDecision::Redirect(LOGIN_PATH.to_owned()),
        (RouteAccess::GuestOnly, true) => GuardDecision::Redirect(HOME_PATH.to_owned()),
        _ => GuardDecision::Allow,
    }
}

/// [`guard`] for a path.
#[must_use]
pub fn guard_path(path: &str, session: &SessionState) -> GuardDecision {
    guard(route_access(path), session)
}

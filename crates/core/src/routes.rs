//! Route gating
//!
//! Pure decision logic mapping (state, requested route) to an outcome.
//! Re-evaluated on every navigation; no side effects.

use crate::state::StateSnapshot;

/// Navigable views of the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Register,
    VerifyEmail,
    Login,
    /// Profile creation/edit form; also the fallback for
    /// profile-incomplete users
    ProfileCreate,
    /// Read-only profile view
    ProfileView,
    ProfileComplete,
    Dashboard,
    Booking,
}

/// Outcome of a gating decision.
///
/// Redirects are replace-navigation: the disallowed route must not
/// stay in history, so the back button cannot re-enter a gated view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    Redirect(Route),
}

/// Decide whether `route` is reachable given the current state.
///
/// The authentication gate covers dashboard and booking. The
/// profile-completeness gate applies only to the profile view; an
/// authenticated user without a profile can still reach booking. That
/// asymmetry is a product decision, not an oversight.
pub fn decide(state: &StateSnapshot, route: Route) -> RouteDecision {
    match route {
        Route::Dashboard | Route::Booking => {
            if state.authenticated {
                RouteDecision::Allow
            } else {
                RouteDecision::Redirect(Route::Login)
            }
        }
        Route::ProfileView => {
            if state.profile_created {
                RouteDecision::Allow
            } else {
                // Expected transient state for every new user, not an error
                RouteDecision::Redirect(Route::ProfileCreate)
            }
        }
        Route::Home
        | Route::Register
        | Route::VerifyEmail
        | Route::Login
        | Route::ProfileCreate
        | Route::ProfileComplete => RouteDecision::Allow,
    }
}

use chrono::{Duration, Utc};
use strollup_core::{ResolveError, Session, UserIdentity};
use strollup_domain::{Permission, PermissionSet, RouteCatalog, RouteRequirement};

use super::{AccessGate, AccessSnapshot, GateEffect, GateState, PathOutcome, PermissionState};

fn session() -> Session {
    Session::new(
        UserIdentity::new("ada", Some("ada@example.com".to_owned())),
        "access",
        "refresh",
        Utc::now() + Duration::hours(1),
    )
}

fn signed_in(permissions: &[Permission]) -> AccessSnapshot {
    AccessSnapshot {
        session_known: true,
        session: Some(session()),
        generation: 1,
        permissions: PermissionState::Resolved(permissions.iter().copied().collect()),
    }
}

fn signed_out() -> AccessSnapshot {
    AccessSnapshot {
        session_known: true,
        session: None,
        generation: 2,
        permissions: PermissionState::Resolved(PermissionSet::empty()),
    }
}

#[test]
fn missing_session_redirects_to_sign_in_with_destination() {
    let state = AccessGate::evaluate(&signed_out(), Some(Permission::ViewDashboard));

    assert_eq!(state, GateState::Unauthenticated);
    assert_eq!(
        state.effect(Some("/app/dashboard")),
        GateEffect::RedirectToSignIn {
            sign_in_path: "/login".to_owned(),
            return_to: Some("/app/dashboard".to_owned()),
        }
    );
}

#[test]
fn unauthenticated_never_depends_on_permissions() {
    let mut snapshot = signed_out();
    snapshot.permissions = PermissionState::Resolved(Permission::all().iter().copied().collect());

    assert_eq!(
        AccessGate::evaluate(&snapshot, None),
        GateState::Unauthenticated
    );
}

#[test]
fn expired_session_counts_as_signed_out() {
    let mut snapshot = signed_in(&[Permission::ViewDashboard]);
    snapshot.session = Some(Session::new(
        UserIdentity::new("ada", None),
        "access",
        "refresh",
        Utc::now() - Duration::minutes(1),
    ));

    assert_eq!(
        AccessGate::evaluate(&snapshot, Some(Permission::ViewDashboard)),
        GateState::Unauthenticated
    );
}

#[test]
fn missing_permission_denies_access() {
    let state = AccessGate::evaluate(
        &signed_in(&[Permission::ViewDashboard]),
        Some(Permission::ViewRoles),
    );

    assert_eq!(
        state,
        GateState::AuthenticatedNoAccess {
            missing: Permission::ViewRoles
        }
    );
    assert_eq!(state.effect(None), GateEffect::RenderAccessDenied);
}

#[test]
fn held_permission_renders_the_view() {
    let state = AccessGate::evaluate(
        &signed_in(&[Permission::ViewDashboard, Permission::ViewRoles]),
        Some(Permission::ViewDashboard),
    );

    let GateState::AuthenticatedAllowed(grant) = &state else {
        panic!("expected access, got {state:?}");
    };
    assert_eq!(grant.satisfied(), &[Permission::ViewDashboard]);
    assert_eq!(state.effect(None), GateEffect::RenderView);
}

#[test]
fn no_requirement_only_needs_a_session() {
    let state = AccessGate::evaluate(&signed_in(&[]), None);
    assert!(matches!(state, GateState::AuthenticatedAllowed(_)));
}

#[test]
fn nested_views_require_every_enclosing_permission() {
    let requirements = [
        RouteRequirement::Authenticated,
        RouteRequirement::Permission(Permission::ViewAnalytics),
    ];

    let shell = AccessGate::evaluate_nested(&signed_in(&[]), &requirements[..1]);
    let nested = AccessGate::evaluate_nested(&signed_in(&[]), &requirements);

    assert!(matches!(shell, GateState::AuthenticatedAllowed(_)));
    assert_eq!(
        nested,
        GateState::AuthenticatedNoAccess {
            missing: Permission::ViewAnalytics
        }
    );
}

#[test]
fn nested_grant_stops_at_the_first_denied_level() {
    let requirements = [
        RouteRequirement::Permission(Permission::ViewSettings),
        RouteRequirement::Permission(Permission::ViewRoles),
    ];

    let state = AccessGate::evaluate_nested(&signed_in(&[Permission::ViewRoles]), &requirements);

    assert_eq!(
        state,
        GateState::AuthenticatedNoAccess {
            missing: Permission::ViewSettings
        }
    );
}

#[test]
fn nested_grant_reuses_the_parent_set() {
    let parent = AccessGate::evaluate(
        &signed_in(&[Permission::ViewDashboard, Permission::ViewContacts]),
        Some(Permission::ViewDashboard),
    );
    let GateState::AuthenticatedAllowed(grant) = parent else {
        panic!("expected parent access");
    };

    let child = grant.nested(Some(Permission::ViewContacts));

    let GateState::AuthenticatedAllowed(child) = child else {
        panic!("expected nested access");
    };
    assert_eq!(child.permissions(), grant.permissions());
    assert_eq!(
        child.satisfied(),
        &[Permission::ViewDashboard, Permission::ViewContacts]
    );
}

#[test]
fn outstanding_resolution_renders_loading() {
    let mut snapshot = signed_in(&[]);
    snapshot.permissions = PermissionState::Pending;

    let state = AccessGate::evaluate(&snapshot, Some(Permission::ViewDashboard));

    assert_eq!(state, GateState::Loading);
    assert_eq!(state.effect(None), GateEffect::RenderLoading);
}

#[test]
fn unknown_session_renders_loading() {
    assert_eq!(
        AccessGate::evaluate(&AccessSnapshot::starting(), None),
        GateState::Loading
    );
}

#[test]
fn resolution_failure_is_never_allowed() {
    let mut snapshot = signed_in(&[]);
    snapshot.permissions = PermissionState::Failed(ResolveError::Network("offline".to_owned()));

    for required in [None, Some(Permission::ViewDashboard)] {
        let state = AccessGate::evaluate(&snapshot, required);
        assert_eq!(
            state,
            GateState::ResolutionFailed(ResolveError::Network("offline".to_owned()))
        );
        assert_eq!(state.effect(None), GateEffect::RenderRetry);
    }
}

#[test]
fn paths_are_gated_through_the_route_catalog() {
    let catalog = RouteCatalog::standard();
    let snapshot = signed_in(&[Permission::ViewDashboard]);

    assert_eq!(
        AccessGate::evaluate_path(&catalog, &snapshot, "/"),
        PathOutcome::Public
    );
    assert_eq!(
        AccessGate::evaluate_path(&catalog, &snapshot, "/nowhere"),
        PathOutcome::NotFound
    );
    assert!(matches!(
        AccessGate::evaluate_path(&catalog, &snapshot, "/app/dashboard"),
        PathOutcome::Gated(GateState::AuthenticatedAllowed(_))
    ));
    assert_eq!(
        AccessGate::evaluate_path(&catalog, &snapshot, "/app/analytics"),
        PathOutcome::Gated(GateState::AuthenticatedNoAccess {
            missing: Permission::ViewAnalytics
        })
    );
    assert!(matches!(
        AccessGate::evaluate_path(&catalog, &snapshot, "/app/alerts"),
        PathOutcome::Gated(GateState::AuthenticatedAllowed(_))
    ));
}

#[test]
fn gate_effect_serializes_with_a_tag() {
    let effect = GateState::Unauthenticated.effect(Some("/app/roles"));
    let Ok(value) = serde_json::to_value(&effect) else {
        panic!("effect should serialize");
    };

    assert_eq!(value["effect"], "redirect_to_sign_in");
    assert_eq!(value["return_to"], "/app/roles");
}

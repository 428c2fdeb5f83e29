use futures::future::join_all;
use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::repo::User;

/// Privileged operations (delete, update, cross-user listing) require one of
/// these roles.
pub fn is_admin_or_mod(roles: &[String]) -> bool {
    roles.iter().any(|r| r == "admin" || r == "mod")
}

/// Dashboard ids from the request that the user does not already hold, in
/// request order. Ids already present are left untouched on both sides of the
/// relation, which makes repeated assignment idempotent.
pub fn new_assignments(existing: &[Uuid], requested: &[Uuid]) -> Vec<Uuid> {
    requested
        .iter()
        .filter(|id| !existing.contains(id))
        .copied()
        .collect()
}

/// The user's list with every occurrence of the dashboard removed.
pub fn without_dashboard(existing: &[Uuid], dashboard_id: Uuid) -> Vec<Uuid> {
    existing
        .iter()
        .filter(|&&id| id != dashboard_id)
        .copied()
        .collect()
}

/// Outcome of one user's slice of a batch operation. The batch itself is
/// best-effort: per-user failures are recorded here, never aborted on.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Updated,
    NotFound,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub user: Uuid,
    pub status: BatchStatus,
}

/// Give each listed user access to the dashboard. Per-user work items run
/// concurrently; each touches a distinct user row, so no coordination is
/// needed and ordering between items is irrelevant to the end state.
///
/// Only `users.dashboards` is touched: the dashboard's owner column is left
/// alone, so many users can read a dashboard owned by one.
pub async fn grant_access(
    db: &PgPool,
    dashboard_id: Uuid,
    user_ids: &[Uuid],
) -> Vec<BatchOutcome> {
    let tasks = user_ids.iter().map(|&user_id| async move {
        let status = match grant_one(db, dashboard_id, user_id).await {
            Ok(status) => status,
            Err(e) => {
                warn!(error = %e, %user_id, %dashboard_id, "grant failed");
                BatchStatus::Failed
            }
        };
        BatchOutcome { user: user_id, status }
    });
    join_all(tasks).await
}

async fn grant_one(db: &PgPool, dashboard_id: Uuid, user_id: Uuid) -> anyhow::Result<BatchStatus> {
    let Some(user) = User::find_by_id(db, user_id).await? else {
        return Ok(BatchStatus::NotFound);
    };
    if !user.dashboards.contains(&dashboard_id) {
        let mut dashboards = user.dashboards;
        dashboards.push(dashboard_id);
        User::set_dashboards(db, user_id, &dashboards).await?;
        debug!(%user_id, %dashboard_id, "dashboard access granted");
    }
    Ok(BatchStatus::Updated)
}

/// Exact inverse of [`grant_access`] for each (dashboard, user) pair.
pub async fn revoke_access(
    db: &PgPool,
    dashboard_id: Uuid,
    user_ids: &[Uuid],
) -> Vec<BatchOutcome> {
    let tasks = user_ids.iter().map(|&user_id| async move {
        let status = match revoke_one(db, dashboard_id, user_id).await {
            Ok(status) => status,
            Err(e) => {
                warn!(error = %e, %user_id, %dashboard_id, "revoke failed");
                BatchStatus::Failed
            }
        };
        BatchOutcome { user: user_id, status }
    });
    join_all(tasks).await
}

async fn revoke_one(db: &PgPool, dashboard_id: Uuid, user_id: Uuid) -> anyhow::Result<BatchStatus> {
    let Some(user) = User::find_by_id(db, user_id).await? else {
        return Ok(BatchStatus::NotFound);
    };
    let dashboards = without_dashboard(&user.dashboards, dashboard_id);
    User::set_dashboards(db, user_id, &dashboards).await?;
    debug!(%user_id, %dashboard_id, "dashboard access revoked");
    Ok(BatchStatus::Updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn admin_and_mod_roles_are_privileged() {
        assert!(is_admin_or_mod(&["admin".into()]));
        assert!(is_admin_or_mod(&["mod".into()]));
        assert!(is_admin_or_mod(&["user".into(), "mod".into()]));
        assert!(!is_admin_or_mod(&["user".into()]));
        assert!(!is_admin_or_mod(&[]));
        // No substring or case tricks.
        assert!(!is_admin_or_mod(&["Admin".into(), "moderator".into()]));
    }

    #[test]
    fn new_assignments_is_a_set_difference_in_request_order() {
        let existing = ids(2);
        let fresh = ids(2);
        let requested = vec![fresh[0], existing[1], fresh[1], existing[0]];
        assert_eq!(new_assignments(&existing, &requested), vec![fresh[0], fresh[1]]);
    }

    #[test]
    fn new_assignments_of_already_held_ids_is_empty() {
        let existing = ids(3);
        assert!(new_assignments(&existing, &existing).is_empty());
    }

    #[test]
    fn assign_then_append_is_idempotent() {
        // Assigning the same id twice ends with exactly one occurrence.
        let dashboard = Uuid::new_v4();
        let mut held: Vec<Uuid> = vec![];

        held.extend(new_assignments(&held, &[dashboard]));
        held.extend(new_assignments(&held, &[dashboard]));

        assert_eq!(held, vec![dashboard]);
    }

    #[test]
    fn without_dashboard_removes_every_occurrence() {
        let target = Uuid::new_v4();
        let other = Uuid::new_v4();
        let existing = vec![target, other, target];
        assert_eq!(without_dashboard(&existing, target), vec![other]);
    }

    #[test]
    fn without_dashboard_is_a_noop_when_absent() {
        let existing = ids(3);
        assert_eq!(without_dashboard(&existing, Uuid::new_v4()), existing);
    }

    #[test]
    fn grant_then_revoke_restores_prior_state() {
        let dashboard = Uuid::new_v4();
        let prior = ids(2);

        let mut held = prior.clone();
        held.extend(new_assignments(&held, &[dashboard]));
        assert!(held.contains(&dashboard));

        let held = without_dashboard(&held, dashboard);
        assert_eq!(held, prior);
    }

    #[test]
    fn batch_status_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&BatchStatus::Updated).unwrap(), r#""updated""#);
        assert_eq!(serde_json::to_string(&BatchStatus::NotFound).unwrap(), r#""not_found""#);
        assert_eq!(serde_json::to_string(&BatchStatus::Failed).unwrap(), r#""failed""#);
    }

    #[test]
    fn batch_outcome_serializes_user_and_status() {
        let outcome = BatchOutcome {
            user: Uuid::nil(),
            status: BatchStatus::NotFound,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["user"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["status"], "not_found");
    }
}

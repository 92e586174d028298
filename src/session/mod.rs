//! Process-local session bookkeeping.
//!
//! The [`SessionRegistry`] records every sandbox this process created (or
//! adopted through [`SessionRegistry::reconcile`]) and is the sole authority
//! on whether a session id may be used. It is a cache over remote truth: a
//! restart loses it while the remote sandboxes keep running, which is what
//! reconciliation is for.
//!
//! Mutations are serialized by one registry-wide lock. The lock is never held
//! across a remote call; deletion instead claims the id first so two
//! concurrent deletes cannot both reach the remote service.

use crate::sandbox::SandboxClient;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Kind of sandbox image a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentType {
    Linux,
    Browser,
    Code,
    Windows,
    Mobile,
}

impl EnvironmentType {
    pub const ALL: [EnvironmentType; 5] = [
        EnvironmentType::Linux,
        EnvironmentType::Browser,
        EnvironmentType::Code,
        EnvironmentType::Windows,
        EnvironmentType::Mobile,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EnvironmentType::Linux => "linux",
            EnvironmentType::Browser => "browser",
            EnvironmentType::Code => "code",
            EnvironmentType::Windows => "windows",
            EnvironmentType::Mobile => "mobile",
        }
    }

    /// Remote image backing this environment.
    pub fn image_id(self) -> &'static str {
        match self {
            EnvironmentType::Linux => "linux_latest",
            EnvironmentType::Browser => "browser_latest",
            EnvironmentType::Code => "code_latest",
            EnvironmentType::Windows => "windows_latest",
            EnvironmentType::Mobile => "mobile_latest",
        }
    }

    pub fn from_image_id(image_id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|env| env.image_id() == image_id)
    }
}

impl fmt::Display for EnvironmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected environment name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported environment type '{0}' (expected one of linux, browser, code, windows, mobile)")]
pub struct UnknownEnvironment(pub String);

impl FromStr for EnvironmentType {
    type Err = UnknownEnvironment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|env| env.as_str() == s)
            .ok_or_else(|| UnknownEnvironment(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Deleted,
}

/// Bookkeeping record for one sandbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub id: String,
    pub environment_type: EnvironmentType,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_url: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("session '{0}' not found or already deleted")]
    NotFound(String),
    #[error("failed to provision {environment} session: {cause:#}")]
    Provision {
        environment: EnvironmentType,
        cause: anyhow::Error,
    },
    #[error("failed to delete session '{id}': {cause:#}")]
    Delete { id: String, cause: anyhow::Error },
}

/// Outcome of [`SessionRegistry::reconcile`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub adopted: usize,
    pub dropped: usize,
}

#[derive(Default)]
struct RegistryState {
    /// Active sessions in creation order.
    sessions: Vec<Session>,
    /// Ids with a remote delete in flight.
    deleting: HashSet<String>,
}

pub struct SessionRegistry {
    client: Arc<dyn SandboxClient>,
    label: String,
    state: Mutex<RegistryState>,
}

impl SessionRegistry {
    pub fn new(client: Arc<dyn SandboxClient>, label: impl Into<String>) -> Self {
        Self {
            client,
            label: label.into(),
            state: Mutex::new(RegistryState::default()),
        }
    }

    fn labels(&self) -> HashMap<String, String> {
        HashMap::from([(self.label.clone(), "true".to_string())])
    }

    /// Provision a sandbox and record it as active.
    pub async fn create(&self, environment: EnvironmentType) -> Result<Session, RegistryError> {
        let remote = self
            .client
            .create_session(environment.image_id(), &self.labels())
            .await
            .map_err(|cause| RegistryError::Provision { environment, cause })?;

        // Stamped under the lock so `sessions` stays ordered by `created_at`.
        let session = {
            let mut state = self.state.lock();
            let session = Session {
                id: remote.session_id,
                environment_type: environment,
                status: SessionStatus::Active,
                created_at: Utc::now(),
                resource_url: remote.resource_url,
            };
            state.sessions.push(session.clone());
            session
        };
        tracing::info!(
            "Session created: session_id={}, environment={}",
            session.id,
            environment
        );
        Ok(session)
    }

    /// Active sessions in creation order.
    pub fn list(&self) -> Vec<Session> {
        self.state.lock().sessions.clone()
    }

    /// The active session `id`, or `NotFound`.
    pub fn require_active(&self, id: &str) -> Result<Session, RegistryError> {
        self.state
            .lock()
            .sessions
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Delete session `id` remotely and drop it from the registry. Returns
    /// the final record with status `Deleted`.
    pub async fn delete(&self, id: &str, sync_context: bool) -> Result<Session, RegistryError> {
        let claim = self.claim_for_delete(id)?;

        self.client
            .delete_session(id, sync_context)
            .await
            .map_err(|cause| RegistryError::Delete {
                id: id.to_string(),
                cause,
            })?;

        let mut session = claim.commit();
        session.status = SessionStatus::Deleted;
        tracing::info!("Session deleted: session_id={id}, sync_context={sync_context}");
        Ok(session)
    }

    fn claim_for_delete(&self, id: &str) -> Result<DeleteClaim<'_>, RegistryError> {
        let mut state = self.state.lock();
        let known = state.sessions.iter().any(|s| s.id == id);
        if !known || state.deleting.contains(id) {
            return Err(RegistryError::NotFound(id.to_string()));
        }
        state.deleting.insert(id.to_string());
        Ok(DeleteClaim {
            registry: self,
            id: id.to_string(),
            committed: false,
        })
    }

    /// Align local bookkeeping with the sessions the remote service reports
    /// under our label. Sessions recorded after the listing was requested
    /// are never dropped, since the listing cannot know about them.
    pub async fn reconcile(&self) -> anyhow::Result<ReconcileReport> {
        let listed_at = Utc::now();
        let remote = self.client.list_sessions(&self.labels()).await?;
        let remote_ids: HashSet<&str> = remote.iter().map(|r| r.session_id.as_str()).collect();

        let mut guard = self.state.lock();
        let RegistryState { sessions, deleting } = &mut *guard;
        let mut report = ReconcileReport::default();

        let before = sessions.len();
        sessions.retain(|s| {
            remote_ids.contains(s.id.as_str())
                || deleting.contains(&s.id)
                || s.created_at >= listed_at
        });
        report.dropped = before - sessions.len();

        let now = Utc::now();
        for info in &remote {
            if sessions.iter().any(|s| s.id == info.session_id) {
                continue;
            }
            let Some(environment) = info
                .image_id
                .as_deref()
                .and_then(EnvironmentType::from_image_id)
            else {
                tracing::debug!(
                    "Skipping remote session {} with unknown image {:?}",
                    info.session_id,
                    info.image_id
                );
                continue;
            };
            sessions.push(Session {
                id: info.session_id.clone(),
                environment_type: environment,
                status: SessionStatus::Active,
                created_at: now,
                resource_url: None,
            });
            report.adopted += 1;
        }

        tracing::info!(
            "Session registry reconciled: adopted={}, dropped={}",
            report.adopted,
            report.dropped
        );
        Ok(report)
    }
}

/// In-flight deletion of one id. Dropping without [`commit`](Self::commit)
/// (remote failure, timeout, cancellation) releases the claim and leaves the
/// session active.
struct DeleteClaim<'a> {
    registry: &'a SessionRegistry,
    id: String,
    committed: bool,
}

impl DeleteClaim<'_> {
    fn commit(mut self) -> Session {
        self.committed = true;
        let mut state = self.registry.state.lock();
        state.deleting.remove(&self.id);
        let position = state.sessions.iter().position(|s| s.id == self.id);
        match position {
            Some(index) => state.sessions.remove(index),
            // Only reachable if reconcile dropped a claimed id, which it skips.
            None => Session {
                id: self.id.clone(),
                environment_type: EnvironmentType::Linux,
                status: SessionStatus::Deleted,
                created_at: Utc::now(),
                resource_url: None,
            },
        }
    }
}

impl Drop for DeleteClaim<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.registry.state.lock().deleting.remove(&self.id);
        }
    }
}

//! In-memory doubles for workflow tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tenant_common::{EmailSend, Event, VerificationStatus};
use uuid::Uuid;

use super::bus::EventSender;
use super::store::{check_transition, Approver, Decision, DecisionOutcome, VerificationStore};
use super::WorkflowError;

/// Records events instead of queueing them.
#[derive(Default)]
pub struct RecordingSender {
    pub events: Mutex<Vec<Event>>,
    pub fail: AtomicBool,
}

impl RecordingSender {
    pub fn sent(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn emails(&self) -> Vec<EmailSend> {
        self.sent()
            .into_iter()
            .filter_map(|e| match e {
                Event::EmailSend(send) => Some(send),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl EventSender for RecordingSender {
    async fn send(&self, event: Event) -> Result<Uuid, WorkflowError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(WorkflowError::Queue("queue unavailable".into()));
        }
        self.events.lock().unwrap().push(event);
        Ok(Uuid::new_v4())
    }
}

#[derive(Debug, Clone)]
pub struct MemoryProfile {
    pub status: VerificationStatus,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub verified_by: Option<Uuid>,
    pub notes: Option<String>,
}

impl MemoryProfile {
    pub fn pending(first_name: &str, last_name: &str, email: Option<&str>) -> Self {
        Self {
            status: VerificationStatus::Pending,
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.map(String::from),
            verified_by: None,
            notes: None,
        }
    }
}

/// Verification data held in maps.
#[derive(Default)]
pub struct MemoryVerificationStore {
    pub profiles: Mutex<HashMap<Uuid, MemoryProfile>>,
    pub unit_floors: HashMap<Uuid, i32>,
    pub captains: HashMap<i32, Vec<Approver>>,
    pub admins: Vec<Approver>,
    pub verifiers: HashSet<Uuid>,
    pub fail_updates: AtomicBool,
    pub decisions_applied: Mutex<usize>,
}

impl MemoryVerificationStore {
    pub fn with_profile(self, user_id: Uuid, profile: MemoryProfile) -> Self {
        self.profiles.lock().unwrap().insert(user_id, profile);
        self
    }

    pub fn with_admin(mut self, admin: Approver) -> Self {
        self.verifiers.insert(admin.user_id);
        self.admins.push(admin);
        self
    }

    pub fn with_captain(mut self, unit_id: Uuid, floor: i32, captain: Approver) -> Self {
        self.unit_floors.insert(unit_id, floor);
        self.verifiers.insert(captain.user_id);
        self.captains.entry(floor).or_default().push(captain);
        self
    }

    pub fn profile(&self, user_id: Uuid) -> Option<MemoryProfile> {
        self.profiles.lock().unwrap().get(&user_id).cloned()
    }
}

pub fn approver(name: &str, email: &str) -> Approver {
    Approver {
        user_id: Uuid::new_v4(),
        email: email.into(),
        name: name.into(),
    }
}

#[async_trait]
impl VerificationStore for MemoryVerificationStore {
    async fn mark_pending(&self, user_id: Uuid) -> Result<VerificationStatus, WorkflowError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(WorkflowError::Step("Failed to update user profile: connection reset".into()));
        }
        let profiles = self.profiles.lock().unwrap();
        profiles.get(&user_id).map(|p| p.status).ok_or_else(|| {
            WorkflowError::Fatal("Failed to update user profile: profile not found".into())
        })
    }

    async fn unit_floor(&self, unit_id: Uuid) -> Result<Option<i32>, WorkflowError> {
        Ok(self.unit_floors.get(&unit_id).copied())
    }

    async fn floor_captains(&self, floor: i32) -> Result<Vec<Approver>, WorkflowError> {
        Ok(self.captains.get(&floor).cloned().unwrap_or_default())
    }

    async fn admins(&self) -> Result<Vec<Approver>, WorkflowError> {
        Ok(self.admins.clone())
    }

    async fn actor_can_verify(&self, actor_id: Uuid) -> Result<bool, WorkflowError> {
        Ok(self.verifiers.contains(&actor_id))
    }

    async fn apply_decision(&self, decision: &Decision) -> Result<DecisionOutcome, WorkflowError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(WorkflowError::Step(
                "Failed to update user verification status: connection reset".into(),
            ));
        }
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles.get_mut(&decision.user_id).ok_or_else(|| {
            WorkflowError::Fatal("Failed to update user verification status: profile not found".into())
        })?;

        let applied = check_transition(profile.status, decision.status)?;
        if applied {
            profile.status = decision.status;
            profile.verified_by = Some(decision.actor_id);
            profile.notes.clone_from(&decision.notes);
            *self.decisions_applied.lock().unwrap() += 1;
        }

        Ok(DecisionOutcome {
            applied,
            user_name: format!("{} {}", profile.first_name, profile.last_name),
        })
    }

    async fn contact_email(&self, user_id: Uuid) -> Result<Option<String>, WorkflowError> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .get(&user_id)
            .and_then(|p| p.email.clone()))
    }
}

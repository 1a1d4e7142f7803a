//! Workflow Functions
//!
//! - `user-verification-workflow` on `user/registered`
//! - `user-approval-workflow` on `user/verified`
//! - `user-rejection-workflow` on `user/rejected`
//! - `email-notification-service` on `notification/email.send`

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tenant_common::{EmailSend, Event, UserRegistered, UserRejected, UserVerified, VerificationStatus};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::bus::{Envelope, EventSender};
use super::steps::{StepStore, Steps};
use super::store::{Approver, Decision, DecisionOutcome, VerificationStore};
use super::WorkflowError;
use crate::config::Config;
use crate::email::{DispatchOutcome, EmailDispatcher, EmailResult};

/// Reason shown to a rejected user when the approver gave none.
pub const DEFAULT_REJECTION_REASON: &str =
    "Your account verification was declined by the administrator.";

/// A registered function and the event that triggers it.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FunctionSpec {
    pub id: &'static str,
    pub trigger: &'static str,
}

pub const FUNCTIONS: &[FunctionSpec] = &[
    FunctionSpec {
        id: "user-verification-workflow",
        trigger: "user/registered",
    },
    FunctionSpec {
        id: "user-approval-workflow",
        trigger: "user/verified",
    },
    FunctionSpec {
        id: "user-rejection-workflow",
        trigger: "user/rejected",
    },
    FunctionSpec {
        id: "email-notification-service",
        trigger: "notification/email.send",
    },
];

/// The function triggered by an event name, if any.
#[must_use]
pub fn function_for(event_name: &str) -> Option<&'static FunctionSpec> {
    FUNCTIONS.iter().find(|f| f.trigger == event_name)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingVerification {
    pub status: VerificationStatus,
    pub notified_approvers: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovedVerification {
    pub status: VerificationStatus,
    pub verified_by: Uuid,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedVerification {
    pub status: VerificationStatus,
    pub rejected_by: Uuid,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

/// `{userId, verification}` as returned by the verification functions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRun<T> {
    pub user_id: Uuid,
    pub verification: T,
}

/// Links and addresses placed into outgoing emails.
#[derive(Debug, Clone)]
pub struct Links {
    pub site_url: String,
    pub support_email: String,
}

impl Links {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            site_url: config.site_url.clone(),
            support_email: config.support_email.clone(),
        }
    }

    /// Admin page for one pending registration.
    #[must_use]
    pub fn verification_link(&self, user_id: Uuid) -> String {
        format!("{}/dashboard/admin/verify-users/{user_id}", self.site_url)
    }

    fn login_link(&self) -> String {
        format!("{}/login", self.site_url)
    }
}

/// Everything the functions need.
pub struct Runtime {
    store: Arc<dyn VerificationStore>,
    steps: Arc<dyn StepStore>,
    events: Arc<dyn EventSender>,
    email: EmailDispatcher,
    links: Links,
}

impl Runtime {
    pub fn new(
        store: Arc<dyn VerificationStore>,
        steps: Arc<dyn StepStore>,
        events: Arc<dyn EventSender>,
        email: EmailDispatcher,
        links: Links,
    ) -> Self {
        Self {
            store,
            steps,
            events,
            email,
            links,
        }
    }

    /// Run the function for `envelope`. `None` when nothing is registered for it.
    pub async fn run(&self, envelope: &Envelope) -> Result<Option<Value>, WorkflowError> {
        if function_for(&envelope.name).is_none() {
            return Ok(None);
        }

        let steps = Steps::new(envelope.id, self.steps.clone());
        let output = match envelope.event()? {
            Event::UserRegistered(event) => {
                serde_json::to_value(self.user_verification(&steps, &event).await?)?
            }
            Event::UserVerified(event) => {
                serde_json::to_value(self.user_approval(&steps, &event).await?)?
            }
            Event::UserRejected(event) => {
                serde_json::to_value(self.user_rejection(&steps, &event).await?)?
            }
            Event::EmailSend(request) => {
                serde_json::to_value(self.email_notification(&steps, &request).await?)?
            }
            _ => return Ok(None),
        };

        Ok(Some(output))
    }

    /// `user-verification-workflow`
    pub async fn user_verification(
        &self,
        steps: &Steps,
        event: &UserRegistered,
    ) -> Result<VerificationRun<PendingVerification>, WorkflowError> {
        let store = &*self.store;
        let user_id = event.user_id;

        let status: VerificationStatus = steps
            .run("ensure-pending-verification", || async move {
                store.mark_pending(user_id).await
            })
            .await?;

        if status != VerificationStatus::Pending {
            info!(user_id = %user_id, status = %status, "User already verified, skipping approver notification");
            return Ok(VerificationRun {
                user_id,
                verification: PendingVerification {
                    status,
                    notified_approvers: 0,
                },
            });
        }

        let unit_id = event.unit_id;
        let approvers: Vec<Approver> = steps
            .run("find-approvers", || async move {
                let mut approvers = Vec::new();
                if let Some(unit_id) = unit_id {
                    if let Some(floor) = store.unit_floor(unit_id).await? {
                        approvers = store.floor_captains(floor).await?;
                    }
                }
                if approvers.is_empty() {
                    approvers = store.admins().await?;
                }
                if approvers.is_empty() {
                    return Err(WorkflowError::Step(
                        "No admins found to notify for user verification".into(),
                    ));
                }
                Ok(approvers)
            })
            .await?;

        let this = self;
        let approvers_ref = &approvers;
        let notified: usize = steps
            .run("send-notifications", || async move {
                let user_name = format!("{} {}", event.first_name, event.last_name)
                    .trim()
                    .to_string();
                for approver in approvers_ref {
                    let data = json!({
                        "approverName": approver.name,
                        "userName": user_name,
                        "userEmail": event.email,
                        "userId": event.user_id,
                        "verificationLink": this.links.verification_link(event.user_id),
                    });
                    this.send_email(
                        &approver.email,
                        "New User Verification Required",
                        "user-verification",
                        data,
                    )
                    .await?;
                }
                Ok(approvers_ref.len())
            })
            .await?;

        info!(user_id = %user_id, notified, "Verification requested");

        Ok(VerificationRun {
            user_id,
            verification: PendingVerification {
                status: VerificationStatus::Pending,
                notified_approvers: notified,
            },
        })
    }

    /// `user-approval-workflow`
    pub async fn user_approval(
        &self,
        steps: &Steps,
        event: &UserVerified,
    ) -> Result<VerificationRun<ApprovedVerification>, WorkflowError> {
        let decision = Decision {
            user_id: event.user_id,
            status: VerificationStatus::Approved,
            actor_id: event.verified_by,
            at: event.timestamp,
            notes: event.notes.clone(),
        };
        let outcome = self.decide(steps, decision).await?;

        if outcome.applied {
            let this = self;
            let user_name = outcome.user_name.as_str();
            let user_id = event.user_id;
            let _: bool = steps
                .run("notify-user", || async move {
                    let data = json!({
                        "userName": user_name,
                        "loginLink": this.links.login_link(),
                    });
                    Ok(this
                        .notify_user(
                            user_id,
                            "Your Account Has Been Verified",
                            "user-verification-approved",
                            data,
                        )
                        .await)
                })
                .await?;
        }

        Ok(VerificationRun {
            user_id: event.user_id,
            verification: ApprovedVerification {
                status: VerificationStatus::Approved,
                verified_by: event.verified_by,
                timestamp: event.timestamp,
            },
        })
    }

    /// `user-rejection-workflow`
    pub async fn user_rejection(
        &self,
        steps: &Steps,
        event: &UserRejected,
    ) -> Result<VerificationRun<RejectedVerification>, WorkflowError> {
        let reason = event
            .reason
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or(DEFAULT_REJECTION_REASON)
            .to_string();

        let decision = Decision {
            user_id: event.user_id,
            status: VerificationStatus::Rejected,
            actor_id: event.rejected_by,
            at: event.timestamp,
            notes: event.reason.clone(),
        };
        let outcome = self.decide(steps, decision).await?;

        if outcome.applied {
            let this = self;
            let user_name = outcome.user_name.as_str();
            let reason = reason.as_str();
            let user_id = event.user_id;
            let _: bool = steps
                .run("notify-user", || async move {
                    let data = json!({
                        "userName": user_name,
                        "reason": reason,
                        "contactEmail": this.links.support_email,
                    });
                    Ok(this
                        .notify_user(
                            user_id,
                            "Account Verification Status",
                            "user-verification-rejected",
                            data,
                        )
                        .await)
                })
                .await?;
        }

        Ok(VerificationRun {
            user_id: event.user_id,
            verification: RejectedVerification {
                status: VerificationStatus::Rejected,
                rejected_by: event.rejected_by,
                timestamp: event.timestamp,
                reason,
            },
        })
    }

    /// `email-notification-service`
    pub async fn email_notification(
        &self,
        steps: &Steps,
        request: &EmailSend,
    ) -> Result<DispatchOutcome, WorkflowError> {
        let prepared = self.email.prepare(request)?;
        let template = prepared.template.to_string();
        let recipient = prepared.recipient.clone();
        let email = &self.email;

        let email_result: EmailResult = steps
            .run("send-email", move || async move {
                Ok(email.deliver(&prepared).await?)
            })
            .await?;

        Ok(DispatchOutcome {
            success: true,
            timestamp: request.timestamp,
            template,
            recipient,
            email_result,
        })
    }

    async fn decide(
        &self,
        steps: &Steps,
        decision: Decision,
    ) -> Result<DecisionOutcome, WorkflowError> {
        let store = &*self.store;
        let status = decision.status;
        let user_id = decision.user_id;
        let outcome: DecisionOutcome = steps
            .run("update-verification-status", move || async move {
                if !store.actor_can_verify(decision.actor_id).await? {
                    return Err(WorkflowError::Fatal(format!(
                        "User {} is not allowed to verify residents",
                        decision.actor_id
                    )));
                }
                store.apply_decision(&decision).await
            })
            .await?;

        if !outcome.applied {
            info!(
                user_id = %user_id,
                status = %status,
                "Verification status already applied, skipping notification"
            );
        }
        Ok(outcome)
    }

    /// Notify the subject of a decision. Failures are logged, never returned.
    async fn notify_user(&self, user_id: Uuid, subject: &str, template: &str, data: Value) -> bool {
        let email = match self.store.contact_email(user_id).await {
            Ok(Some(email)) => email,
            Ok(None) => {
                warn!(user_id = %user_id, "Could not find user email for notification");
                return false;
            }
            Err(e) => {
                error!(user_id = %user_id, error = %e, "Failed to look up user email for notification");
                return false;
            }
        };

        match self.send_email(&email, subject, template, data).await {
            Ok(()) => true,
            Err(e) => {
                error!(user_id = %user_id, template, error = %e, "Failed to send user notification");
                false
            }
        }
    }

    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        template: &str,
        data: Value,
    ) -> Result<(), WorkflowError> {
        let template_data = match data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.events
            .send(Event::EmailSend(EmailSend {
                to: Some(to.to_string()),
                subject: subject.to_string(),
                template: Some(template.to_string()),
                template_data,
                timestamp: Utc::now(),
            }))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use tenant_common::ProfileUpdated;

    use super::*;
    use crate::email::RecordingMailer;
    use crate::workflow::steps::MemoryStepStore;
    use crate::workflow::testing::{approver, MemoryProfile, MemoryVerificationStore, RecordingSender};

    struct Harness {
        runtime: Runtime,
        store: Arc<MemoryVerificationStore>,
        steps: Arc<MemoryStepStore>,
        sender: Arc<RecordingSender>,
        mailer: Arc<RecordingMailer>,
    }

    fn harness(store: MemoryVerificationStore) -> Harness {
        let store = Arc::new(store);
        let steps = Arc::new(MemoryStepStore::default());
        let sender = Arc::new(RecordingSender::default());
        let mailer = Arc::new(RecordingMailer::default());
        let email = EmailDispatcher::new(mailer.clone(), "no-reply@example.com".parse().unwrap());
        let links = Links {
            site_url: "http://localhost:3000".into(),
            support_email: "management@example.com".into(),
        };
        Harness {
            runtime: Runtime::new(store.clone(), steps.clone(), sender.clone(), email, links),
            store,
            steps,
            sender,
            mailer,
        }
    }

    impl Harness {
        fn steps_for(&self, run_id: Uuid) -> Steps {
            Steps::new(run_id, self.steps.clone())
        }
    }

    fn registered(user_id: Uuid, unit_id: Option<Uuid>) -> UserRegistered {
        UserRegistered {
            user_id,
            email: "jane@example.com".into(),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            unit_id,
            created_at: Utc::now(),
        }
    }

    fn verified(user_id: Uuid, by: Uuid) -> UserVerified {
        UserVerified {
            user_id,
            verified_by: by,
            timestamp: Utc::now(),
            notes: Some("Lease checked".into()),
        }
    }

    fn rejected(user_id: Uuid, by: Uuid, reason: Option<&str>) -> UserRejected {
        UserRejected {
            user_id,
            rejected_by: by,
            timestamp: Utc::now(),
            reason: reason.map(String::from),
        }
    }

    #[test]
    fn every_function_has_a_unique_trigger() {
        assert_eq!(FUNCTIONS.len(), 4);
        assert_eq!(
            function_for("user/registered").map(|f| f.id),
            Some("user-verification-workflow")
        );
        assert_eq!(
            function_for("notification/email.send").map(|f| f.id),
            Some("email-notification-service")
        );
        assert!(function_for("forum/mention").is_none());
    }

    #[tokio::test]
    async fn registration_notifies_floor_captains_of_the_unit() {
        let user = Uuid::new_v4();
        let unit = Uuid::new_v4();
        let h = harness(
            MemoryVerificationStore::default()
                .with_profile(user, MemoryProfile::pending("Jane", "Doe", Some("jane@example.com")))
                .with_admin(approver("Ada Admin", "admin@example.com"))
                .with_captain(unit, 4, approver("Cap One", "cap1@example.com"))
                .with_captain(unit, 4, approver("Cap Two", "cap2@example.com")),
        );

        let run = h
            .runtime
            .user_verification(&h.steps_for(Uuid::new_v4()), &registered(user, Some(unit)))
            .await
            .unwrap();

        assert_eq!(run.verification.status, VerificationStatus::Pending);
        assert_eq!(run.verification.notified_approvers, 2);

        let emails = h.sender.emails();
        let recipients: Vec<_> = emails.iter().filter_map(|e| e.to.clone()).collect();
        assert_eq!(recipients, vec!["cap1@example.com", "cap2@example.com"]);

        let first = &emails[0];
        assert_eq!(first.template.as_deref(), Some("user-verification"));
        assert_eq!(first.template_data["approverName"], "Cap One");
        assert_eq!(first.template_data["userName"], "Jane Doe");
        assert_eq!(first.template_data["userEmail"], "jane@example.com");
        assert_eq!(
            first.template_data["verificationLink"],
            format!("http://localhost:3000/dashboard/admin/verify-users/{user}")
        );
    }

    #[tokio::test]
    async fn registration_without_unit_notifies_admins() {
        let user = Uuid::new_v4();
        let h = harness(
            MemoryVerificationStore::default()
                .with_profile(user, MemoryProfile::pending("Jane", "Doe", None))
                .with_admin(approver("Ada Admin", "admin@example.com")),
        );

        let run = h
            .runtime
            .user_verification(&h.steps_for(Uuid::new_v4()), &registered(user, None))
            .await
            .unwrap();

        assert_eq!(run.verification.notified_approvers, 1);
        assert_eq!(h.sender.emails()[0].to.as_deref(), Some("admin@example.com"));
    }

    #[tokio::test]
    async fn registration_without_any_approver_fails() {
        let user = Uuid::new_v4();
        let h = harness(
            MemoryVerificationStore::default()
                .with_profile(user, MemoryProfile::pending("Jane", "Doe", None)),
        );

        let err = h
            .runtime
            .user_verification(&h.steps_for(Uuid::new_v4()), &registered(user, None))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No admins found to notify for user verification");
        assert!(err.is_retryable());
        assert!(h.sender.sent().is_empty());
    }

    #[tokio::test]
    async fn profile_update_failure_aborts_registration() {
        let user = Uuid::new_v4();
        let h = harness(
            MemoryVerificationStore::default()
                .with_profile(user, MemoryProfile::pending("Jane", "Doe", None))
                .with_admin(approver("Ada Admin", "admin@example.com")),
        );
        h.store.fail_updates.store(true, Ordering::SeqCst);

        let err = h
            .runtime
            .user_verification(&h.steps_for(Uuid::new_v4()), &registered(user, None))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Failed to update user profile"));
        assert!(h.sender.sent().is_empty());
    }

    #[tokio::test]
    async fn retried_registration_reuses_completed_steps() {
        let user = Uuid::new_v4();
        let h = harness(
            MemoryVerificationStore::default()
                .with_profile(user, MemoryProfile::pending("Jane", "Doe", None))
                .with_admin(approver("Ada Admin", "admin@example.com")),
        );
        let steps = h.steps_for(Uuid::new_v4());

        h.sender.fail.store(true, Ordering::SeqCst);
        assert!(h
            .runtime
            .user_verification(&steps, &registered(user, None))
            .await
            .is_err());
        assert_eq!(h.steps.len(), 2);

        h.sender.fail.store(false, Ordering::SeqCst);
        h.store.fail_updates.store(true, Ordering::SeqCst);
        let run = h
            .runtime
            .user_verification(&steps, &registered(user, None))
            .await
            .unwrap();

        assert_eq!(run.verification.notified_approvers, 1);
        assert_eq!(h.steps.len(), 3);
        assert_eq!(h.sender.emails().len(), 1);
    }

    #[tokio::test]
    async fn approval_sets_status_and_emails_user_once() {
        let user = Uuid::new_v4();
        let admin = approver("Ada Admin", "admin@example.com");
        let admin_id = admin.user_id;
        let h = harness(
            MemoryVerificationStore::default()
                .with_profile(user, MemoryProfile::pending("Jane", "Doe", Some("jane@example.com")))
                .with_admin(admin),
        );

        let event = verified(user, admin_id);
        let run = h
            .runtime
            .user_approval(&h.steps_for(Uuid::new_v4()), &event)
            .await
            .unwrap();

        assert_eq!(run.verification.status, VerificationStatus::Approved);
        assert_eq!(run.verification.verified_by, admin_id);
        assert_eq!(run.verification.timestamp, event.timestamp);

        let profile = h.store.profile(user).unwrap();
        assert_eq!(profile.status, VerificationStatus::Approved);
        assert_eq!(profile.verified_by, Some(admin_id));
        assert_eq!(profile.notes.as_deref(), Some("Lease checked"));

        let emails = h.sender.emails();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].to.as_deref(), Some("jane@example.com"));
        assert_eq!(emails[0].template.as_deref(), Some("user-verification-approved"));
        assert_eq!(emails[0].template_data["userName"], "Jane Doe");
        assert_eq!(emails[0].template_data["loginLink"], "http://localhost:3000/login");
    }

    #[tokio::test]
    async fn repeated_approval_is_a_silent_no_op() {
        let user = Uuid::new_v4();
        let admin = approver("Ada Admin", "admin@example.com");
        let admin_id = admin.user_id;
        let h = harness(
            MemoryVerificationStore::default()
                .with_profile(user, MemoryProfile::pending("Jane", "Doe", Some("jane@example.com")))
                .with_admin(admin),
        );

        for _ in 0..2 {
            h.runtime
                .user_approval(&h.steps_for(Uuid::new_v4()), &verified(user, admin_id))
                .await
                .unwrap();
        }

        assert_eq!(*h.store.decisions_applied.lock().unwrap(), 1);
        assert_eq!(h.sender.emails().len(), 1);
    }

    #[tokio::test]
    async fn rejecting_an_approved_user_is_refused() {
        let user = Uuid::new_v4();
        let admin = approver("Ada Admin", "admin@example.com");
        let admin_id = admin.user_id;
        let h = harness(
            MemoryVerificationStore::default()
                .with_profile(user, MemoryProfile::pending("Jane", "Doe", Some("jane@example.com")))
                .with_admin(admin),
        );

        h.runtime
            .user_approval(&h.steps_for(Uuid::new_v4()), &verified(user, admin_id))
            .await
            .unwrap();
        let err = h
            .runtime
            .user_rejection(&h.steps_for(Uuid::new_v4()), &rejected(user, admin_id, None))
            .await
            .unwrap_err();

        assert!(!err.is_retryable());
        assert_eq!(h.store.profile(user).unwrap().status, VerificationStatus::Approved);
    }

    #[tokio::test]
    async fn actor_without_verifier_role_is_refused() {
        let user = Uuid::new_v4();
        let h = harness(
            MemoryVerificationStore::default()
                .with_profile(user, MemoryProfile::pending("Jane", "Doe", Some("jane@example.com"))),
        );

        let err = h
            .runtime
            .user_approval(&h.steps_for(Uuid::new_v4()), &verified(user, Uuid::new_v4()))
            .await
            .unwrap_err();

        assert!(!err.is_retryable());
        assert_eq!(h.store.profile(user).unwrap().status, VerificationStatus::Pending);
        assert!(h.sender.sent().is_empty());
    }

    #[tokio::test]
    async fn rejection_without_reason_uses_default() {
        let user = Uuid::new_v4();
        let admin = approver("Ada Admin", "admin@example.com");
        let admin_id = admin.user_id;
        let h = harness(
            MemoryVerificationStore::default()
                .with_profile(user, MemoryProfile::pending("Jane", "Doe", Some("jane@example.com")))
                .with_admin(admin),
        );

        let run = h
            .runtime
            .user_rejection(&h.steps_for(Uuid::new_v4()), &rejected(user, admin_id, None))
            .await
            .unwrap();

        assert_eq!(run.verification.status, VerificationStatus::Rejected);
        assert_eq!(run.verification.reason, DEFAULT_REJECTION_REASON);

        let emails = h.sender.emails();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].template.as_deref(), Some("user-verification-rejected"));
        assert_eq!(emails[0].template_data["reason"], DEFAULT_REJECTION_REASON);
        assert_eq!(emails[0].template_data["contactEmail"], "management@example.com");
    }

    #[tokio::test]
    async fn rejection_without_address_still_succeeds() {
        let user = Uuid::new_v4();
        let admin = approver("Ada Admin", "admin@example.com");
        let admin_id = admin.user_id;
        let h = harness(
            MemoryVerificationStore::default()
                .with_profile(user, MemoryProfile::pending("Jane", "Doe", None))
                .with_admin(admin),
        );

        let run = h
            .runtime
            .user_rejection(
                &h.steps_for(Uuid::new_v4()),
                &rejected(user, admin_id, Some("No lease on file")),
            )
            .await
            .unwrap();

        assert_eq!(run.verification.status, VerificationStatus::Rejected);
        assert_eq!(run.verification.rejected_by, admin_id);
        assert_eq!(run.verification.reason, "No lease on file");
        assert!(h.sender.sent().is_empty());
        assert_eq!(h.store.profile(user).unwrap().status, VerificationStatus::Rejected);
    }

    #[tokio::test]
    async fn notification_failure_does_not_fail_approval() {
        let user = Uuid::new_v4();
        let admin = approver("Ada Admin", "admin@example.com");
        let admin_id = admin.user_id;
        let h = harness(
            MemoryVerificationStore::default()
                .with_profile(user, MemoryProfile::pending("Jane", "Doe", Some("jane@example.com")))
                .with_admin(admin),
        );
        h.sender.fail.store(true, Ordering::SeqCst);

        let run = h
            .runtime
            .user_approval(&h.steps_for(Uuid::new_v4()), &verified(user, admin_id))
            .await
            .unwrap();
        assert_eq!(run.verification.status, VerificationStatus::Approved);
    }

    #[tokio::test]
    async fn email_service_sends_once_per_run() {
        let h = harness(MemoryVerificationStore::default());
        let envelope = Envelope::new(&Event::EmailSend(EmailSend {
            to: Some("jane@example.com".into()),
            subject: "Your Account Has Been Verified".into(),
            template: Some("user-verification-approved".into()),
            template_data: json!({ "userName": "Jane Doe" })
                .as_object()
                .cloned()
                .unwrap(),
            timestamp: Utc::now(),
        }))
        .unwrap();

        let output = h.runtime.run(&envelope).await.unwrap().unwrap();
        assert_eq!(output["success"], true);
        assert_eq!(output["template"], "user-verification-approved");
        assert_eq!(output["recipient"], "jane@example.com");
        assert!(output["emailResult"]["messageId"].is_string());

        // Redelivery of the same envelope does not send again
        h.runtime.run(&envelope).await.unwrap();
        assert_eq!(h.mailer.count(), 1);
    }

    #[tokio::test]
    async fn email_service_rejects_unknown_template() {
        let h = harness(MemoryVerificationStore::default());
        let envelope = Envelope::new(&Event::EmailSend(EmailSend {
            to: Some("jane@example.com".into()),
            subject: String::new(),
            template: Some("welcome".into()),
            template_data: Map::new(),
            timestamp: Utc::now(),
        }))
        .unwrap();

        let err = h.runtime.run(&envelope).await.unwrap_err();
        assert_eq!(err.to_string(), "Email template 'welcome' not found");
        assert!(!err.is_retryable());
        assert_eq!(h.mailer.count(), 0);
    }

    #[tokio::test]
    async fn events_without_a_function_are_ignored() {
        let h = harness(MemoryVerificationStore::default());
        let envelope = Envelope::new(&Event::ProfileUpdated(ProfileUpdated {
            user_id: Uuid::new_v4(),
            updated_fields: vec!["bio".into()],
            timestamp: Utc::now(),
        }))
        .unwrap();

        assert!(h.runtime.run(&envelope).await.unwrap().is_none());
    }
}

//! In-memory `Store` backend for tests and the demo binary.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::application::model::{BusinessInfo, OnboardingApplication, Subscription};
use crate::error::StoreError;
use crate::notify::model::Notification;
use crate::tasks::model::ReviewTask;

use super::traits::Store;

/// HashMap-backed store. Collection-level `RwLock`s only; cross-record
/// atomicity is the caller's job (the engine holds per-application locks).
#[derive(Default)]
pub struct MemoryStore {
    applications: RwLock<HashMap<Uuid, OnboardingApplication>>,
    business_info: RwLock<HashMap<Uuid, BusinessInfo>>,
    subscriptions: RwLock<HashMap<Uuid, Subscription>>,
    tasks: RwLock<HashMap<Uuid, ReviewTask>>,
    notifications: RwLock<Vec<Notification>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(entity: &str, id: impl ToString) -> StoreError {
    StoreError::NotFound {
        entity: entity.to_string(),
        id: id.to_string(),
    }
}

fn conflict(entity: &str, id: impl ToString) -> StoreError {
    StoreError::Conflict {
        entity: entity.to_string(),
        id: id.to_string(),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_application(&self, app: &OnboardingApplication) -> Result<(), StoreError> {
        let mut apps = self.applications.write().await;
        if apps.contains_key(&app.id) {
            return Err(conflict("application", app.id));
        }
        apps.insert(app.id, app.clone());
        Ok(())
    }

    async fn get_application(
        &self,
        id: Uuid,
    ) -> Result<Option<OnboardingApplication>, StoreError> {
        Ok(self.applications.read().await.get(&id).cloned())
    }

    async fn put_application(&self, app: &OnboardingApplication) -> Result<(), StoreError> {
        let mut apps = self.applications.write().await;
        if !apps.contains_key(&app.id) {
            return Err(not_found("application", app.id));
        }
        apps.insert(app.id, app.clone());
        Ok(())
    }

    async fn find_live_application_for_user(
        &self,
        user_id: &str,
    ) -> Result<Option<OnboardingApplication>, StoreError> {
        Ok(self
            .applications
            .read()
            .await
            .values()
            .find(|a| a.user_id == user_id && a.status.is_live())
            .cloned())
    }

    async fn list_pending_applications(
        &self,
    ) -> Result<Vec<OnboardingApplication>, StoreError> {
        let mut out: Vec<_> = self
            .applications
            .read()
            .await
            .values()
            .filter(|a| !a.status.is_terminal())
            .cloned()
            .collect();
        out.sort_by_key(|a| a.submitted_at);
        Ok(out)
    }

    async fn insert_business_info(&self, info: &BusinessInfo) -> Result<(), StoreError> {
        let mut records = self.business_info.write().await;
        if records.contains_key(&info.application_id) {
            return Err(conflict("business_info", info.application_id));
        }
        records.insert(info.application_id, info.clone());
        Ok(())
    }

    async fn get_business_info(
        &self,
        application_id: Uuid,
    ) -> Result<Option<BusinessInfo>, StoreError> {
        Ok(self.business_info.read().await.get(&application_id).cloned())
    }

    async fn insert_subscription(&self, sub: &Subscription) -> Result<(), StoreError> {
        let mut records = self.subscriptions.write().await;
        if records.contains_key(&sub.application_id) {
            return Err(conflict("subscription", sub.application_id));
        }
        records.insert(sub.application_id, sub.clone());
        Ok(())
    }

    async fn get_subscription(
        &self,
        application_id: Uuid,
    ) -> Result<Option<Subscription>, StoreError> {
        Ok(self.subscriptions.read().await.get(&application_id).cloned())
    }

    async fn insert_task(&self, task: &ReviewTask) -> Result<(), StoreError> {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&task.id) {
            return Err(conflict("task", task.id));
        }
        tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn get_task(&self, id: Uuid) -> Result<Option<ReviewTask>, StoreError> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    async fn put_task(&self, task: &ReviewTask) -> Result<(), StoreError> {
        let mut tasks = self.tasks.write().await;
        if !tasks.contains_key(&task.id) {
            return Err(not_found("task", task.id));
        }
        tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn list_tasks_for_application(
        &self,
        application_id: Uuid,
    ) -> Result<Vec<ReviewTask>, StoreError> {
        let mut out: Vec<_> = self
            .tasks
            .read()
            .await
            .values()
            .filter(|t| t.application_id == application_id)
            .cloned()
            .collect();
        out.sort_by_key(|t| t.created_at);
        Ok(out)
    }

    async fn list_tasks_for_staff(
        &self,
        staff_id: &str,
    ) -> Result<Vec<ReviewTask>, StoreError> {
        let mut out: Vec<_> = self
            .tasks
            .read()
            .await
            .values()
            .filter(|t| t.assigned_to_staff_id == staff_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<(), StoreError> {
        self.notifications.write().await.push(notification.clone());
        Ok(())
    }

    async fn list_notifications_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Notification>, StoreError> {
        let mut out: Vec<_> = self
            .notifications
            .read()
            .await
            .iter()
            .filter(|n| n.recipient_id == user_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn mark_notification_read(&self, id: Uuid) -> Result<(), StoreError> {
        let mut notifications = self.notifications.write().await;
        match notifications.iter_mut().find(|n| n.id == id) {
            Some(n) => {
                n.is_read = true;
                Ok(())
            }
            None => Err(not_found("notification", id)),
        }
    }
}

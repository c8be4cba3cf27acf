//! Process-local store implementing every repository trait.
//!
//! Used when no `DATABASE_URL` is configured and by the test suites. State is
//! lost when the process exits.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::models::budget::BudgetEntry;
use crate::models::notification::Notification;
use crate::models::user::User;
use crate::repositories::RepositoryError;
use crate::repositories::budget_repository::{BudgetRepository, EntryFilters};
use crate::repositories::notification_repository::NotificationRepository;
use crate::repositories::user_repository::{NewUser, UserRepository};

#[derive(Default)]
pub struct InMemoryStore {
    users: Mutex<HashMap<Uuid, User>>,
    entries: Mutex<HashMap<Uuid, BudgetEntry>>,
    notifications: Mutex<Vec<Notification>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::DatabaseError("in-memory store lock poisoned".to_string()))
}

fn recompute_order(a: &BudgetEntry, b: &BudgetEntry) -> std::cmp::Ordering {
    a.date
        .cmp(&b.date)
        .then(a.created_at.cmp(&b.created_at))
        .then(a.id.cmp(&b.id))
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every notification addressed to a user, seen or not, in insertion order
    pub fn notifications_for(&self, user_id: Uuid) -> Result<Vec<Notification>, RepositoryError> {
        let notifications = lock(&self.notifications)?;
        Ok(notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect())
    }

    pub fn notification_count(&self) -> Result<usize, RepositoryError> {
        Ok(lock(&self.notifications)?.len())
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut users = lock(&self.users)?;

        if users.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::ConstraintViolation(
                "Email already exists".to_string(),
            ));
        }

        let new_user = User {
            id: Uuid::new_v4(),
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            budget_limit: user.budget_limit,
            created_at: Utc::now(),
        };

        users.insert(new_user.id, new_user.clone());
        Ok(new_user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let users = lock(&self.users)?;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let users = lock(&self.users)?;
        Ok(users.get(&id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<User>, RepositoryError> {
        let users = lock(&self.users)?;
        let mut all: Vec<User> = users.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn update(&self, user: User) -> Result<User, RepositoryError> {
        let mut users = lock(&self.users)?;
        let existing = users.get_mut(&user.id).ok_or(RepositoryError::NotFound)?;

        existing.first_name = user.first_name;
        existing.last_name = user.last_name;
        existing.role = user.role;
        existing.budget_limit = user.budget_limit;

        Ok(existing.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        if lock(&self.users)?.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }

        lock(&self.entries)?.retain(|_, entry| entry.user_id != id);
        lock(&self.notifications)?.retain(|n| n.user_id != id);
        Ok(())
    }
}

#[async_trait]
impl BudgetRepository for InMemoryStore {
    async fn create(&self, entry: BudgetEntry) -> Result<BudgetEntry, RepositoryError> {
        if !lock(&self.users)?.contains_key(&entry.user_id) {
            return Err(RepositoryError::ConstraintViolation(
                "Entry owner does not exist".to_string(),
            ));
        }

        let mut entries = lock(&self.entries)?;
        entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn update(&self, entry: BudgetEntry) -> Result<BudgetEntry, RepositoryError> {
        let mut entries = lock(&self.entries)?;
        let existing = entries.get_mut(&entry.id).ok_or(RepositoryError::NotFound)?;

        existing.expense = entry.expense;
        existing.price = entry.price;
        existing.date = entry.date;
        existing.updated_at = Utc::now();

        Ok(existing.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<BudgetEntry>, RepositoryError> {
        let entries = lock(&self.entries)?;
        Ok(entries.get(&id).cloned())
    }

    async fn find_by_user_ordered(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<BudgetEntry>, RepositoryError> {
        let entries = lock(&self.entries)?;
        let mut owned: Vec<BudgetEntry> = entries
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(recompute_order);
        Ok(owned)
    }

    async fn find_all(&self, filters: EntryFilters) -> Result<Vec<BudgetEntry>, RepositoryError> {
        let entries = lock(&self.entries)?;
        let mut matching: Vec<BudgetEntry> = entries
            .values()
            .filter(|e| filters.user_id.is_none_or(|id| e.user_id == id))
            .filter(|e| filters.date.is_none_or(|date| e.date == date))
            .cloned()
            .collect();

        // Sort by date descending (most recent first)
        matching.sort_by(|a, b| recompute_order(b, a));
        Ok(matching)
    }

    async fn find_in_range(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<BudgetEntry>, RepositoryError> {
        let entries = lock(&self.entries)?;
        let mut in_range: Vec<BudgetEntry> = entries
            .values()
            .filter(|e| e.user_id == user_id && e.date >= start && e.date < end)
            .cloned()
            .collect();
        in_range.sort_by(recompute_order);
        Ok(in_range)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let mut entries = lock(&self.entries)?;
        if entries.remove(&id).is_some() {
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    async fn update_total_expenditures(
        &self,
        updates: &[(Uuid, Decimal)],
    ) -> Result<(), RepositoryError> {
        let mut entries = lock(&self.entries)?;

        if updates.iter().any(|(id, _)| !entries.contains_key(id)) {
            return Err(RepositoryError::NotFound);
        }
        for (id, total_expenditure) in updates {
            if let Some(entry) = entries.get_mut(id) {
                entry.total_expenditure = *total_expenditure;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationRepository for InMemoryStore {
    async fn create(&self, notification: Notification) -> Result<Notification, RepositoryError> {
        let mut notifications = lock(&self.notifications)?;
        notifications.push(notification.clone());
        Ok(notification)
    }

    async fn find_unseen_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let notifications = lock(&self.notifications)?;
        // Reverse insertion order first so equal timestamps still list newest first
        let mut unseen: Vec<Notification> = notifications
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id && !n.seen)
            .cloned()
            .collect();
        unseen.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(unseen)
    }

    async fn mark_all_seen(&self, user_id: Uuid) -> Result<u64, RepositoryError> {
        let mut notifications = lock(&self.notifications)?;
        let mut updated = 0;
        for notification in notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.seen)
        {
            notification.seen = true;
            updated += 1;
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::notification::NotificationKind;
    use crate::models::user::Role;
    use chrono::Duration;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: Role::User,
            budget_limit: Some(Decimal::from(1000)),
        }
    }

    fn entry(user_id: Uuid, date: NaiveDate, price: i64) -> BudgetEntry {
        let now = Utc::now();
        BudgetEntry {
            id: Uuid::new_v4(),
            user_id,
            date,
            expense: "Item".to_string(),
            price: Decimal::from(price),
            total_expenditure: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_is_constraint_violation() {
        let store = InMemoryStore::new();
        UserRepository::create(&store, new_user("a@example.com"))
            .await
            .unwrap();

        let result = UserRepository::create(&store, new_user("a@example.com")).await;
        assert!(matches!(result, Err(RepositoryError::ConstraintViolation(_))));
    }

    #[tokio::test]
    async fn test_ordered_entries_use_date_then_creation_time() {
        let store = InMemoryStore::new();
        let user = UserRepository::create(&store, new_user("a@example.com"))
            .await
            .unwrap();
        let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();

        let mut late = entry(user.id, day(20), 10);
        let mut early_second = entry(user.id, day(5), 20);
        let mut early_first = entry(user.id, day(5), 30);
        early_first.created_at = early_second.created_at - Duration::seconds(1);
        late.created_at = early_first.created_at - Duration::seconds(1);

        for e in [late.clone(), early_second.clone(), early_first.clone()] {
            BudgetRepository::create(&store, e).await.unwrap();
        }

        let ordered = store.find_by_user_ordered(user.id).await.unwrap();
        let ids: Vec<Uuid> = ordered.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![early_first.id, early_second.id, late.id]);
    }

    #[tokio::test]
    async fn test_deleting_user_removes_their_entries() {
        let store = InMemoryStore::new();
        let user = UserRepository::create(&store, new_user("a@example.com"))
            .await
            .unwrap();
        let other = UserRepository::create(&store, new_user("b@example.com"))
            .await
            .unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        BudgetRepository::create(&store, entry(user.id, day, 10))
            .await
            .unwrap();
        BudgetRepository::create(&store, entry(other.id, day, 10))
            .await
            .unwrap();

        UserRepository::delete(&store, user.id).await.unwrap();

        assert!(store.find_by_user_ordered(user.id).await.unwrap().is_empty());
        assert_eq!(store.find_by_user_ordered(other.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mark_all_seen_counts_only_changed_rows() {
        let store = InMemoryStore::new();
        let user_id = Uuid::new_v4();
        let other_id = Uuid::new_v4();

        NotificationRepository::create(
            &store,
            Notification::new(NotificationKind::Added, None, "a", user_id),
        )
        .await
        .unwrap();
        NotificationRepository::create(
            &store,
            Notification::new(NotificationKind::Added, None, "b", other_id),
        )
        .await
        .unwrap();

        assert_eq!(store.mark_all_seen(user_id).await.unwrap(), 1);
        assert_eq!(store.mark_all_seen(user_id).await.unwrap(), 0);
        assert!(store.find_unseen_by_user(user_id).await.unwrap().is_empty());
        assert_eq!(store.find_unseen_by_user(other_id).await.unwrap().len(), 1);
    }
}

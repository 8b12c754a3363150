use crate::auth::{AuthError, IdentityProvider};
use crate::io::repository::TaskRepository;
use crate::model::user::User;
use crate::store::TaskStore;

/// Ties the signed-in user to the task store: signing in loads that user's
/// collection, signing out saves and forgets it.
pub struct App<R: TaskRepository> {
    identity: IdentityProvider,
    store: TaskStore<R>,
    user: Option<User>,
}

impl<R: TaskRepository> App<R> {
    pub fn new(identity: IdentityProvider, store: TaskStore<R>) -> Self {
        App {
            identity,
            store,
            user: None,
        }
    }

    pub fn store(&self) -> &TaskStore<R> {
        &self.store
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Authenticate, then load the user's tasks. Signing in as someone else
    /// saves the previous user's pending edits first.
    pub async fn login(&mut self, email: &str) -> Result<User, AuthError> {
        let user = self.identity.login(email).await?;
        self.resume(user.clone()).await;
        Ok(user)
    }

    /// Restore a previously authenticated session without signing in again
    pub async fn resume(&mut self, user: User) {
        self.store.load(&user.id).await;
        self.user = Some(user);
    }

    /// Save pending edits, then drop the collection and history. Returns the
    /// user that was signed in, if any.
    pub async fn logout(&mut self) -> Option<User> {
        let user = self.user.take()?;
        if !self.store.flush().await {
            tracing::warn!(user_id = %user.id, "could not save pending changes before sign-out");
        }
        self.store.clear();
        self.identity.logout(&user).await;
        Some(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::repository::MemoryRepository;
    use crate::model::task::TaskDraft;
    use crate::store::StoreOptions;
    use std::sync::Arc;

    fn app() -> (App<MemoryRepository>, Arc<MemoryRepository>) {
        let repo = Arc::new(MemoryRepository::new());
        let store = TaskStore::new(Arc::clone(&repo), StoreOptions::default());
        (App::new(IdentityProvider::default(), store), repo)
    }

    #[tokio::test(start_paused = true)]
    async fn login_edit_logout_login_restores_tasks() {
        let (mut app, repo) = app();
        let user = app.login("alice@example.com").await.unwrap();
        assert_eq!(app.store().user_id(), Some(user.id.clone()));
        app.store().add_task(TaskDraft::new("Buy milk"));

        let out = app.logout().await.unwrap();
        assert_eq!(out.id, user.id);
        assert!(app.user().is_none());
        assert!(app.store().tasks().is_empty());
        assert_eq!(repo.save_count(), 1);

        app.login("ALICE@example.com").await.unwrap();
        assert_eq!(app.store().tasks()[0].title, "Buy milk");
        assert!(!app.store().can_undo());
    }

    #[tokio::test]
    async fn failed_login_leaves_state_alone() {
        let (mut app, _) = app();
        assert!(app.login("not-an-email").await.is_err());
        assert!(app.user().is_none());
        assert!(!app.store().is_loaded());
    }

    #[tokio::test]
    async fn logout_without_session_is_noop() {
        let (mut app, repo) = app();
        assert!(app.logout().await.is_none());
        assert_eq!(repo.save_count(), 0);
    }
}

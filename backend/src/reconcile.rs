//! Maps an authenticated principal to its directory record.

use std::sync::Arc;

use travel_common::{NewUser, UserRecord};

use crate::auth::SessionContext;
use crate::directory::Directory;
use crate::profile::PhotoSource;

/// Create-or-fetch of the caller's directory record.
pub struct Reconciler {
    directory: Arc<dyn Directory>,
    photos: Arc<dyn PhotoSource>,
}

impl Reconciler {
    pub fn new(directory: Arc<dyn Directory>, photos: Arc<dyn PhotoSource>) -> Self {
        Self { directory, photos }
    }

    /// Return the caller's record, creating it on first sight.
    ///
    /// Runs on every page load, so failures are logged and reported as
    /// `None` ("not yet reconciled") rather than as errors. A missing
    /// profile photo never prevents creation.
    pub async fn reconcile(&self, session: &SessionContext) -> Option<UserRecord> {
        let account_id = session.account_id();

        match self.directory.find_user(account_id).await {
            Ok(Some(user)) => return Some(user),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(account_id, "Directory lookup failed: {}", e);
                return None;
            }
        }

        let image_url = match self.photos.profile_photo(session.access_token()).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::debug!(account_id, "No profile photo: {}", e);
                None
            }
        };

        let new_user = NewUser::from_principal(&session.principal, image_url);
        match self.directory.create_user(new_user).await {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(account_id, "Directory create failed: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{SubsecRound, Utc};
    use travel_common::UserStatus;

    use crate::directory::SqliteStore;
    use crate::test_util::{test_session, FailingDirectory, FixedPhoto};

    fn reconciler(directory: Arc<dyn Directory>, photo: FixedPhoto) -> Reconciler {
        Reconciler::new(directory, Arc::new(photo))
    }

    fn store() -> Arc<SqliteStore> {
        Arc::new(SqliteStore::open(":memory:").unwrap())
    }

    #[tokio::test]
    async fn test_first_reconcile_creates_user_record() {
        let store = store();
        let reconciler = reconciler(store.clone(), FixedPhoto::url("https://lh3.example/a.jpg"));
        let session = test_session("acc-1", Some("ya29.token"));

        let before = Utc::now().trunc_subsecs(6);
        let user = reconciler.reconcile(&session).await.unwrap();
        let after = Utc::now();

        assert_eq!(user.account_id, "acc-1");
        assert_eq!(user.email, session.principal.email);
        assert_eq!(user.name, session.principal.name);
        assert_eq!(user.status, UserStatus::User);
        assert_eq!(user.image_url.as_deref(), Some("https://lh3.example/a.jpg"));
        assert!(user.joined_at >= before && user.joined_at <= after);
        assert!(store.get_user("acc-1").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sequential_reconciles_return_same_record() {
        let reconciler = reconciler(store(), FixedPhoto::url("https://lh3.example/a.jpg"));
        let session = test_session("acc-1", None);

        let first = reconciler.reconcile(&session).await.unwrap();
        let second = reconciler.reconcile(&session).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_existing_record_returned_unchanged() {
        let store = store();
        let reconciler = reconciler(store.clone(), FixedPhoto::url("https://lh3.example/a.jpg"));
        let session = test_session("acc-1", None);

        reconciler.reconcile(&session).await.unwrap();
        let promoted = store.promote_user("acc-1").unwrap();

        let again = reconciler.reconcile(&session).await.unwrap();
        assert_eq!(again, promoted);
    }

    #[tokio::test]
    async fn test_photo_failure_still_creates_record() {
        let reconciler = reconciler(store(), FixedPhoto::failing());
        let session = test_session("acc-1", Some("ya29.token"));

        let user = reconciler.reconcile(&session).await.unwrap();
        assert!(user.image_url.is_none());
        assert_eq!(user.status, UserStatus::User);
    }

    #[tokio::test]
    async fn test_directory_failure_is_no_record() {
        let reconciler = reconciler(Arc::new(FailingDirectory), FixedPhoto::failing());
        let session = test_session("acc-1", None);

        assert!(reconciler.reconcile(&session).await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_reconciles_leave_one_record() {
        let store = store();
        let reconciler = Arc::new(reconciler(store.clone(), FixedPhoto::url("https://lh3.example/a.jpg")));
        let session = test_session("acc-new", None);

        let (a, b) = tokio::join!(reconciler.reconcile(&session), reconciler.reconcile(&session));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(a, b);
        assert_eq!(store.list_users_page(10, 0).unwrap().total, 1);
    }
}

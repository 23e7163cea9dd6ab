//! Credential service: signup and signin business rules
//!
//! # Invariants
//!
//! - Unknown email and wrong password produce the same `InvalidCredentials`
//!   outcome. An unknown email still pays for one password verification
//!   against a placeholder hash, so the two cases also take similar time.
//! - The existence check before create is only a fast path. The store's
//!   `Conflict` is what guarantees one account per email.
//! - Passwords and hashes never appear in errors, logs or responses.

use crate::auth::{AuthUser, JwtService, PasswordService};
use crate::error::CredentialError;
use crate::repositories::AccountStore;
use crate::services::RequestContext;
use chrono::Utc;
use pomodeep_shared::validation::{validate_credentials, CredentialRules};
use pomodeep_shared::{AccountView, CreateUserRequest, CreateUserResponse, SignInRequest, SignInResponse};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, instrument};

const PLACEHOLDER_PASSWORD: &str = "pomodeep-placeholder-password";

/// Credential service shared across request handlers
#[derive(Clone)]
pub struct CredentialService {
    store: Arc<dyn AccountStore>,
    passwords: PasswordService,
    tokens: JwtService,
    rules: CredentialRules,
    placeholder_hash: Arc<OnceCell<String>>,
}

impl CredentialService {
    pub fn new(
        store: Arc<dyn AccountStore>,
        passwords: PasswordService,
        tokens: JwtService,
        rules: CredentialRules,
    ) -> Self {
        Self {
            store,
            passwords,
            tokens,
            rules,
            placeholder_hash: Arc::new(OnceCell::new()),
        }
    }

    pub fn store(&self) -> &dyn AccountStore {
        self.store.as_ref()
    }

    pub fn tokens(&self) -> &JwtService {
        &self.tokens
    }

    fn validate(&self, email: &str, password: &str) -> Result<(), CredentialError> {
        validate_credentials(email, password, &self.rules)
            .map_err(|e| CredentialError::InvalidInput(e.message))
    }

    /// Register a new account
    #[instrument(skip_all)]
    pub async fn sign_up(
        &self,
        ctx: &RequestContext,
        req: &CreateUserRequest,
    ) -> Result<CreateUserResponse, CredentialError> {
        let result = self.sign_up_inner(ctx, req).await;
        record("signup", &result);
        result
    }

    async fn sign_up_inner(
        &self,
        ctx: &RequestContext,
        req: &CreateUserRequest,
    ) -> Result<CreateUserResponse, CredentialError> {
        self.validate(&req.email, &req.password)?;

        if ctx.run(self.store.find_by_email(&req.email)).await??.is_some() {
            return Err(CredentialError::DuplicateAccount);
        }

        let password_hash = ctx
            .run(self.passwords.hash_async(req.password.clone()))
            .await??;

        // A concurrent signup that slipped past the check surfaces here as
        // a store conflict, mapped to DuplicateAccount.
        let account = ctx
            .run(self.store.create(&req.email, &password_hash))
            .await??;

        info!(account_id = %account.id, "Account created");
        Ok(CreateUserResponse {
            user: account.view(),
        })
    }

    /// Authenticate with email and password and issue a token
    #[instrument(skip_all)]
    pub async fn sign_in(
        &self,
        ctx: &RequestContext,
        req: &SignInRequest,
    ) -> Result<SignInResponse, CredentialError> {
        let result = self.sign_in_inner(ctx, req).await;
        record("signin", &result);
        result
    }

    async fn sign_in_inner(
        &self,
        ctx: &RequestContext,
        req: &SignInRequest,
    ) -> Result<SignInResponse, CredentialError> {
        self.validate(&req.email, &req.password)?;

        let account = ctx.run(self.store.find_by_email(&req.email)).await??;

        let stored_hash = match &account {
            Some(account) => account.password_hash.clone(),
            None => ctx.run(self.placeholder_hash()).await??,
        };

        let valid = ctx
            .run(self.passwords.verify_async(req.password.clone(), stored_hash))
            .await??;

        let account = match account {
            Some(account) if valid => account,
            _ => return Err(CredentialError::InvalidCredentials),
        };

        let token = self
            .tokens
            .issue(account.id, &account.email, Utc::now())
            .map_err(CredentialError::Token)?;

        info!(account_id = %account.id, "Signed in");
        Ok(SignInResponse {
            user: account.view(),
            token,
        })
    }

    /// Resolve an authenticated identity to its current account
    #[instrument(skip_all, fields(account_id = %user.account_id))]
    pub async fn current_account(
        &self,
        ctx: &RequestContext,
        user: &AuthUser,
    ) -> Result<AccountView, CredentialError> {
        ctx.run(self.store.find_by_id(user.account_id))
            .await??
            .map(|account| account.view())
            .ok_or(CredentialError::NotFound)
    }

    async fn placeholder_hash(&self) -> Result<String, CredentialError> {
        let hash = self
            .placeholder_hash
            .get_or_try_init(|| self.passwords.hash_async(PLACEHOLDER_PASSWORD.to_string()))
            .await?;
        Ok(hash.clone())
    }
}

fn record<T>(operation: &'static str, result: &Result<T, CredentialError>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(e) => e.kind().code(),
    };
    metrics::counter!("auth_operations_total", "operation" => operation, "outcome" => outcome)
        .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HashAlgorithm;
    use crate::repositories::{AccountRecord, MemoryAccountStore, StoreError};
    use async_trait::async_trait;
    use pomodeep_shared::ErrorKind;
    use secrecy::SecretString;
    use std::time::Duration;
    use uuid::Uuid;

    fn tokens() -> JwtService {
        JwtService::new(Some(&SecretString::new("service-secret".to_string())), 86400)
    }

    fn service_with(store: Arc<dyn AccountStore>) -> CredentialService {
        CredentialService::new(
            store,
            PasswordService::new(HashAlgorithm::Bcrypt, 4),
            tokens(),
            CredentialRules::default(),
        )
    }

    fn signup(email: &str, password: &str) -> CreateUserRequest {
        CreateUserRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    fn signin(email: &str, password: &str) -> SignInRequest {
        SignInRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    /// Store that always fails
    struct BrokenStore;

    #[async_trait]
    impl AccountStore for BrokenStore {
        async fn find_by_email(&self, _: &str) -> Result<Option<AccountRecord>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
        async fn find_by_id(&self, _: Uuid) -> Result<Option<AccountRecord>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
        async fn create(&self, _: &str, _: &str) -> Result<AccountRecord, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    /// Store whose existence check always misses, like a lost race
    struct RacingStore(MemoryAccountStore);

    #[async_trait]
    impl AccountStore for RacingStore {
        async fn find_by_email(&self, _: &str) -> Result<Option<AccountRecord>, StoreError> {
            Ok(None)
        }
        async fn find_by_id(&self, id: Uuid) -> Result<Option<AccountRecord>, StoreError> {
            self.0.find_by_id(id).await
        }
        async fn create(&self, email: &str, hash: &str) -> Result<AccountRecord, StoreError> {
            self.0.create(email, hash).await
        }
    }

    /// Store that stalls on every call
    struct SlowStore(MemoryAccountStore);

    #[async_trait]
    impl AccountStore for SlowStore {
        async fn find_by_email(&self, email: &str) -> Result<Option<AccountRecord>, StoreError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            self.0.find_by_email(email).await
        }
        async fn find_by_id(&self, id: Uuid) -> Result<Option<AccountRecord>, StoreError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            self.0.find_by_id(id).await
        }
        async fn create(&self, email: &str, hash: &str) -> Result<AccountRecord, StoreError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            self.0.create(email, hash).await
        }
    }

    #[tokio::test]
    async fn test_sign_up_stores_hash_not_password() {
        let store = Arc::new(MemoryAccountStore::new());
        let service = service_with(store.clone());
        let ctx = RequestContext::background();

        let resp = service.sign_up(&ctx, &signup("a@x.com", "secret1")).await.unwrap();
        assert_eq!(resp.user.email, "a@x.com");

        let record = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(record.id, resp.user.id);
        assert_ne!(record.password_hash, "secret1");
        assert!(record.password_hash.starts_with("$2"));
    }

    #[tokio::test]
    async fn test_sign_up_duplicate() {
        let store = Arc::new(MemoryAccountStore::new());
        let service = service_with(store.clone());
        let ctx = RequestContext::background();

        service.sign_up(&ctx, &signup("a@x.com", "secret1")).await.unwrap();
        let err = service
            .sign_up(&ctx, &signup("a@x.com", "another1"))
            .await
            .unwrap_err();

        assert!(matches!(err, CredentialError::DuplicateAccount));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_sign_up_lost_race_maps_conflict_to_duplicate() {
        let store = Arc::new(RacingStore(MemoryAccountStore::new()));
        let service = service_with(store.clone());
        let ctx = RequestContext::background();

        service.sign_up(&ctx, &signup("a@x.com", "secret1")).await.unwrap();
        let err = service
            .sign_up(&ctx, &signup("a@x.com", "secret1"))
            .await
            .unwrap_err();

        assert!(matches!(err, CredentialError::DuplicateAccount));
        assert_eq!(store.0.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_input_never_touches_store() {
        let service = service_with(Arc::new(BrokenStore));
        let ctx = RequestContext::background();

        for (email, password) in [("", "secret1"), ("a@x.com", ""), ("a@x.com", "short")] {
            let err = service.sign_up(&ctx, &signup(email, password)).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);

            let err = service.sign_in(&ctx, &signin(email, password)).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
        }
    }

    #[tokio::test]
    async fn test_email_format_only_checked_when_enabled() {
        let ctx = RequestContext::background();

        let lenient = service_with(Arc::new(MemoryAccountStore::new()));
        assert!(lenient.sign_up(&ctx, &signup("alice", "secret1")).await.is_ok());

        let strict = CredentialService::new(
            Arc::new(MemoryAccountStore::new()),
            PasswordService::new(HashAlgorithm::Bcrypt, 4),
            tokens(),
            CredentialRules {
                check_email_format: true,
                ..CredentialRules::default()
            },
        );
        let err = strict.sign_up(&ctx, &signup("alice", "secret1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_sign_up_rejects_password_bcrypt_would_truncate() {
        let store = Arc::new(MemoryAccountStore::new());
        let service = service_with(store.clone());
        let ctx = RequestContext::background();

        let err = service
            .sign_up(&ctx, &signup("a@x.com", &"a".repeat(73)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_store_error() {
        let service = service_with(Arc::new(BrokenStore));
        let ctx = RequestContext::background();

        let err = service.sign_up(&ctx, &signup("a@x.com", "secret1")).await.unwrap_err();
        assert!(matches!(err, CredentialError::Store(_)));
        assert!(!err.to_string().contains("connection refused"));

        let err = service.sign_in(&ctx, &signin("a@x.com", "secret1")).await.unwrap_err();
        assert!(matches!(err, CredentialError::Store(_)));
    }

    #[tokio::test]
    async fn test_sign_in_issues_valid_token() {
        let service = service_with(Arc::new(MemoryAccountStore::new()));
        let ctx = RequestContext::background();

        let created = service.sign_up(&ctx, &signup("a@x.com", "secret1")).await.unwrap();
        let resp = service.sign_in(&ctx, &signin("a@x.com", "secret1")).await.unwrap();

        assert_eq!(resp.user, created.user);
        let claims = service.tokens().validate(&resp.token, Utc::now()).unwrap();
        assert_eq!(claims.sub, created.user.id);
        assert_eq!(claims.email, "a@x.com");
    }

    #[tokio::test]
    async fn test_unknown_email_and_wrong_password_are_indistinguishable() {
        let service = service_with(Arc::new(MemoryAccountStore::new()));
        let ctx = RequestContext::background();
        service.sign_up(&ctx, &signup("a@x.com", "secret1")).await.unwrap();

        let unknown = service
            .sign_in(&ctx, &signin("nobody@x.com", "secret1"))
            .await
            .unwrap_err();
        let wrong = service
            .sign_in(&ctx, &signin("a@x.com", "wrong-password"))
            .await
            .unwrap_err();

        assert!(matches!(unknown, CredentialError::InvalidCredentials));
        assert!(matches!(wrong, CredentialError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn test_placeholder_password_never_signs_in() {
        let service = service_with(Arc::new(MemoryAccountStore::new()));
        let ctx = RequestContext::background();

        let err = service
            .sign_in(&ctx, &signin("nobody@x.com", PLACEHOLDER_PASSWORD))
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_current_account() {
        let service = service_with(Arc::new(MemoryAccountStore::new()));
        let ctx = RequestContext::background();
        let created = service.sign_up(&ctx, &signup("a@x.com", "secret1")).await.unwrap();

        let user = AuthUser {
            account_id: created.user.id,
            email: created.user.email.clone(),
        };
        assert_eq!(service.current_account(&ctx, &user).await.unwrap(), created.user);

        let ghost = AuthUser {
            account_id: Uuid::new_v4(),
            email: "ghost@x.com".to_string(),
        };
        assert!(matches!(
            service.current_account(&ctx, &ghost).await,
            Err(CredentialError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_deadline_cancels_sign_up_without_creating() {
        let store = Arc::new(SlowStore(MemoryAccountStore::new()));
        let service = service_with(store.clone());
        let ctx = RequestContext::with_timeout(Duration::from_millis(50));

        let err = service
            .sign_up(&ctx, &signup("a@x.com", "secret1"))
            .await
            .unwrap_err();

        assert!(matches!(err, CredentialError::Cancelled));
        assert!(store.0.is_empty());
    }

    #[tokio::test]
    async fn test_deadline_cancels_sign_in() {
        let service = service_with(Arc::new(SlowStore(MemoryAccountStore::new())));
        let ctx = RequestContext::with_timeout(Duration::from_millis(50));

        let err = service
            .sign_in(&ctx, &signin("a@x.com", "secret1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }
}

// SPDX-License-Identifier: MIT

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile + entitlement state)
//! - Prompts (static content, read-only)
//! - Engagement records (unlocks, accesses, favorites)
//! - Billing transactions (webhook audit trail)
//! - Leads (funnel capture)

use crate::db::collections;
use crate::entitlements;
use crate::error::AppError;
use crate::models::{AccessRecord, FavoriteRecord, Lead, Prompt, TransactionRecord, UnlockRecord, User};
use chrono::{DateTime, Utc};

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

/// Result of the transactional unlock operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockOutcome {
    /// A credit was spent and an unlock record written.
    Unlocked,
    /// The prompt was already unlocked; no credit spent.
    AlreadyUnlocked,
    /// No credits remain this period; nothing written.
    NoCredits,
}

/// Outcome of a single unlock transaction attempt.
enum UnlockAttempt {
    Done(UnlockOutcome),
    /// The commit was rejected (contention); retry with fresh reads.
    CommitRejected(String),
}

/// Fields applied to a profile when a checkout completes.
#[derive(Debug, Clone)]
pub struct CheckoutActivation {
    pub event_id: String,
    pub uid: String,
    pub plano: String,
    pub customer_id: Option<String>,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
}

/// Composite document ID for per-user engagement records.
///
/// Prompt IDs come from request paths, so they are percent-encoded to
/// keep the ID Firestore-safe.
fn engagement_doc_id(uid: &str, prompt_id: &str) -> String {
    format!("{}_{}", uid, urlencoding::encode(prompt_id))
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        // Use ExternalJwtFunctionSource to provide a dummy token without needing async-trait
        // or a custom TokenSource implementation struct.
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by their identity-provider uid.
    pub async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a user.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.uid)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Load a user, lazily rolling them into the current credit period.
    ///
    /// Every profile-loading code path goes through here so the monthly
    /// reset is applied consistently. The reset is persisted before the
    /// profile is returned.
    pub async fn load_user_current_period(
        &self,
        uid: &str,
        free_ceiling: u32,
    ) -> Result<Option<User>, AppError> {
        let Some(mut user) = self.get_user(uid).await? else {
            return Ok(None);
        };

        if entitlements::ensure_current_period(&mut user, free_ceiling, Utc::now()) {
            tracing::info!(
                uid = %user.uid,
                monthly_credits = user.monthly_credits,
                "Monthly credit reset applied on read"
            );
            self.upsert_user(&user).await?;
        }

        Ok(Some(user))
    }

    /// Load a user, creating the profile on first sign-in.
    pub async fn get_or_create_user(
        &self,
        uid: &str,
        email: Option<String>,
        display_name: Option<String>,
        free_ceiling: u32,
    ) -> Result<User, AppError> {
        if let Some(user) = self.load_user_current_period(uid, free_ceiling).await? {
            return Ok(user);
        }

        let user = User::new(uid.to_string(), email, display_name, free_ceiling, Utc::now());
        self.upsert_user(&user).await?;
        tracing::info!(uid = %user.uid, "User profile created on first sign-in");
        Ok(user)
    }

    /// Find a user by their Stripe customer ID.
    ///
    /// A query rather than a key lookup; used by subscription webhooks
    /// that only carry the customer ID.
    pub async fn find_user_by_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<User>, AppError> {
        let customer_id = customer_id.to_string();
        let users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.for_all([q.field("stripe_customer_id").eq(customer_id.clone())]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.into_iter().next())
    }

    // ─── Prompt Operations ───────────────────────────────────────

    /// Get a single prompt by ID.
    pub async fn get_prompt(&self, prompt_id: &str) -> Result<Option<Prompt>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PROMPTS)
            .obj()
            .one(prompt_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List all prompts, newest first.
    pub async fn list_prompts(&self) -> Result<Vec<Prompt>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PROMPTS)
            .order_by([(
                "created_at",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or replace a prompt (content seeding / admin tooling).
    pub async fn upsert_prompt(&self, prompt: &Prompt) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PROMPTS)
            .document_id(&prompt.id)
            .object(prompt)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Unlock Operations ───────────────────────────────────────

    /// Get a single unlock record.
    pub async fn get_unlock(
        &self,
        uid: &str,
        prompt_id: &str,
    ) -> Result<Option<UnlockRecord>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::UNLOCKED_PROMPTS)
            .obj()
            .one(engagement_doc_id(uid, prompt_id))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List all unlocks for a user.
    pub async fn list_unlocked(&self, uid: &str) -> Result<Vec<UnlockRecord>, AppError> {
        let uid = uid.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::UNLOCKED_PROMPTS)
            .filter(move |q| q.for_all([q.field("user_id").eq(uid.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Atomically spend one credit to unlock a prompt.
    ///
    /// The credit increment and the unlock record are written in a single
    /// Firestore transaction whose reads are transaction-scoped, so a
    /// concurrent unlock from another device conflicts at commit and is
    /// retried against the fresh balance. Re-unlocking an already-unlocked
    /// prompt is an idempotent no-op that spends nothing.
    pub async fn unlock_prompt(
        &self,
        uid: &str,
        prompt_id: &str,
        free_ceiling: u32,
    ) -> Result<UnlockOutcome, AppError> {
        const MAX_COMMIT_ATTEMPTS: u32 = 3;

        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            match self.unlock_prompt_attempt(uid, prompt_id, free_ceiling).await? {
                UnlockAttempt::Done(outcome) => return Ok(outcome),
                UnlockAttempt::CommitRejected(reason) => {
                    if attempt == MAX_COMMIT_ATTEMPTS {
                        return Err(AppError::Database(format!(
                            "Unlock transaction failed after {} attempts: {}",
                            MAX_COMMIT_ATTEMPTS, reason
                        )));
                    }
                    tracing::warn!(uid, prompt_id, attempt, reason = %reason, "Unlock commit rejected, retrying");
                }
            }
        }

        unreachable!("unlock retry loop always returns")
    }

    /// One transactional unlock attempt.
    async fn unlock_prompt_attempt(
        &self,
        uid: &str,
        prompt_id: &str,
        free_ceiling: u32,
    ) -> Result<UnlockAttempt, AppError> {
        let now = Utc::now();

        let mut transaction = self
            .get_client()?
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        // Reads must go through the transaction's consistency selector so
        // the documents land in the read-set and the commit conflict-checks
        // against concurrent writers.
        let consistency = firestore::FirestoreConsistencySelector::Transaction(
            transaction.transaction_id().clone(),
        );

        // 1. Read the profile within the transaction scope.
        let mut user: User = self
            .get_client()?
            .clone_with_consistency_selector(consistency.clone())
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Database(format!("Failed to read user in transaction: {}", e)))?
            .ok_or_else(|| AppError::Database(format!("User {} missing during unlock", uid)))?;

        // 2. Roll into the current period before checking the balance.
        let period_reset = entitlements::ensure_current_period(&mut user, free_ceiling, now);

        // 3. Idempotency: already unlocked means no spend.
        let existing: Option<UnlockRecord> = self
            .get_client()?
            .clone_with_consistency_selector(consistency)
            .fluent()
            .select()
            .by_id_in(collections::UNLOCKED_PROMPTS)
            .obj()
            .one(engagement_doc_id(uid, prompt_id))
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if existing.is_some() {
            tracing::debug!(uid, prompt_id, "Prompt already unlocked (idempotent skip)");
            let _ = transaction.rollback().await;
            if period_reset {
                self.upsert_user(&user).await?;
            }
            return Ok(UnlockAttempt::Done(UnlockOutcome::AlreadyUnlocked));
        }

        // 4. Balance check.
        if entitlements::remaining_credits(&user) == 0 {
            let _ = transaction.rollback().await;
            if period_reset {
                self.upsert_user(&user).await?;
            }
            return Ok(UnlockAttempt::Done(UnlockOutcome::NoCredits));
        }

        // 5. Spend the credit and write both documents atomically.
        user.credits_used += 1;
        user.updated_at = now;

        let record = UnlockRecord {
            user_id: uid.to_string(),
            prompt_id: prompt_id.to_string(),
            unlocked_at: now,
        };

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::UNLOCKED_PROMPTS)
            .document_id(engagement_doc_id(uid, prompt_id))
            .object(&record)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add unlock to transaction: {}", e))
            })?;

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.uid)
            .object(&user)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add user to transaction: {}", e)))?;

        // A contended commit is rejected by Firestore; the caller retries
        // the whole attempt with a fresh read of the balance.
        if let Err(e) = transaction.commit().await {
            return Ok(UnlockAttempt::CommitRejected(e.to_string()));
        }

        tracing::info!(
            uid,
            prompt_id,
            credits_used = user.credits_used,
            monthly_credits = user.monthly_credits,
            "Credit spent, prompt unlocked"
        );

        Ok(UnlockAttempt::Done(UnlockOutcome::Unlocked))
    }

    // ─── Access Operations ───────────────────────────────────────

    /// Get a single access record.
    pub async fn get_access(
        &self,
        uid: &str,
        prompt_id: &str,
    ) -> Result<Option<AccessRecord>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ACCESSED_PROMPTS)
            .obj()
            .one(engagement_doc_id(uid, prompt_id))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List all access records for a user.
    pub async fn list_accessed(&self, uid: &str) -> Result<Vec<AccessRecord>, AppError> {
        let uid = uid.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::ACCESSED_PROMPTS)
            .filter(move |q| q.for_all([q.field("user_id").eq(uid.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Record that a user opened a prompt (idempotent merge).
    ///
    /// The first call creates the record; later calls only bump
    /// `last_accessed_at`. Exactly one record exists per (user, prompt).
    pub async fn record_access(&self, uid: &str, prompt_id: &str) -> Result<(), AppError> {
        let now = Utc::now();

        let record = match self.get_access(uid, prompt_id).await? {
            Some(mut existing) => {
                existing.last_accessed_at = now;
                existing
            }
            None => AccessRecord {
                user_id: uid.to_string(),
                prompt_id: prompt_id.to_string(),
                accessed_at: now,
                last_accessed_at: now,
            },
        };

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::ACCESSED_PROMPTS)
            .document_id(engagement_doc_id(uid, prompt_id))
            .object(&record)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Favorite Operations ─────────────────────────────────────

    /// List all favorites for a user.
    pub async fn list_favorites(&self, uid: &str) -> Result<Vec<FavoriteRecord>, AppError> {
        let uid = uid.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::FAVORITES)
            .filter(move |q| q.for_all([q.field("user_id").eq(uid.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Toggle a favorite. Returns the new state (`true` = favorited).
    pub async fn toggle_favorite(&self, uid: &str, prompt_id: &str) -> Result<bool, AppError> {
        let doc_id = engagement_doc_id(uid, prompt_id);

        let existing: Option<FavoriteRecord> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::FAVORITES)
            .obj()
            .one(&doc_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if existing.is_some() {
            self.get_client()?
                .fluent()
                .delete()
                .from(collections::FAVORITES)
                .document_id(&doc_id)
                .execute()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            return Ok(false);
        }

        let record = FavoriteRecord {
            user_id: uid.to_string(),
            prompt_id: prompt_id.to_string(),
            favorited_at: Utc::now(),
        };

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::FAVORITES)
            .document_id(&doc_id)
            .object(&record)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(true)
    }

    // ─── Billing Reconciliation ──────────────────────────────────

    /// Get a billing transaction by Stripe event ID.
    pub async fn get_transaction(
        &self,
        event_id: &str,
    ) -> Result<Option<TransactionRecord>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::TRANSACTIONS)
            .obj()
            .one(event_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List billing transactions for a user.
    pub async fn list_transactions_for_user(
        &self,
        uid: &str,
    ) -> Result<Vec<TransactionRecord>, AppError> {
        let uid = uid.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::TRANSACTIONS)
            .filter(move |q| q.for_all([q.field("user_id").eq(uid.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Apply a completed checkout: activate the plan and write the audit
    /// transaction in a single Firestore transaction.
    ///
    /// The audit document is keyed by the Stripe event ID, so webhook
    /// redelivery overwrites the same record instead of appending twice.
    pub async fn apply_checkout_completed(
        &self,
        activation: &CheckoutActivation,
        free_ceiling: u32,
    ) -> Result<(), AppError> {
        let now = Utc::now();

        let mut transaction = self
            .get_client()?
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        // The checkout may complete before the user's first API sign-in;
        // create a skeleton profile in that case. The read is transaction-
        // scoped so a concurrent subscription webhook cannot interleave.
        let mut user: User = self
            .get_client()?
            .clone_with_consistency_selector(firestore::FirestoreConsistencySelector::Transaction(
                transaction.transaction_id().clone(),
            ))
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(&activation.uid)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .unwrap_or_else(|| {
                User::new(activation.uid.clone(), None, None, free_ceiling, now)
            });

        user.plano = activation.plano.clone();
        user.subscription_status = Some(crate::models::user::STATUS_ACTIVE.to_string());
        if activation.customer_id.is_some() {
            user.stripe_customer_id = activation.customer_id.clone();
        }
        user.activated_at = Some(now);
        user.updated_at = now;

        let audit = TransactionRecord {
            event_id: activation.event_id.clone(),
            event_type: "checkout.session.completed".to_string(),
            user_id: activation.uid.clone(),
            plano: activation.plano.clone(),
            amount_total: activation.amount_total,
            currency: activation.currency.clone(),
            created_at: now,
        };

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.uid)
            .object(&user)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add user to transaction: {}", e)))?;

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::TRANSACTIONS)
            .document_id(&audit.event_id)
            .object(&audit)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add audit record to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(
            uid = %activation.uid,
            plano = %activation.plano,
            event_id = %activation.event_id,
            "Checkout reconciled, plan activated"
        );

        Ok(())
    }

    /// Update subscription linkage from a `customer.subscription.*` event.
    ///
    /// Looks the user up by Stripe customer ID. Returns `false` when no
    /// profile matches (the event may have raced ahead of checkout).
    pub async fn update_subscription_by_customer(
        &self,
        customer_id: &str,
        subscription_id: Option<String>,
        status: &str,
        current_period_end: Option<DateTime<Utc>>,
    ) -> Result<bool, AppError> {
        let Some(mut user) = self.find_user_by_customer(customer_id).await? else {
            return Ok(false);
        };

        if subscription_id.is_some() {
            user.subscription_id = subscription_id;
        }
        user.subscription_status = Some(status.to_string());
        user.current_period_end = current_period_end;

        // A canceled subscription drops the user back to Free; the credit
        // ceiling is recomputed by the next lazy period check.
        if status == "canceled" {
            user.plano = crate::models::user::PLAN_FREE.to_string();
        }
        user.updated_at = Utc::now();

        self.upsert_user(&user).await?;
        Ok(true)
    }

    // ─── Lead Capture ────────────────────────────────────────────

    /// Store a funnel lead, keyed by email so repeat submissions merge.
    pub async fn upsert_lead(&self, lead: &Lead) -> Result<(), AppError> {
        let doc_id = urlencoding::encode(&lead.email).into_owned();

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::LEADS)
            .document_id(&doc_id)
            .object(lead)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

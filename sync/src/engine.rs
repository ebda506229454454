//! The reconciliation pass.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::Instrument;

use tokengate_entitlements::{
    evaluate, evaluate_detailed, managed_roles, RoleMutationPlan, WalletHoldings,
};
use tokengate_membership::{MembershipDirectory, MembershipError, SYNC_REASON};
use tokengate_oracle::AssetOracle;
use tokengate_store::{
    BindingStore, EntitlementRule, RuleStore, SessionStore, StoreError, VerifiedBinding,
};
use tokengate_types::{RoleId, Timestamp};
use tokengate_utils::format_duration;

use crate::{SyncError, SyncReport};

#[derive(Clone, Debug)]
pub struct SyncSettings {
    /// Subjects processed concurrently.
    pub workers: usize,
    /// Bound on every oracle, membership and store call.
    pub call_timeout: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            call_timeout: Duration::from_secs(10),
        }
    }
}

/// Converges member roles onto wallet entitlements.
///
/// Every collaborator is injected, so tests run the real pass against
/// nullables.
pub struct ReconciliationEngine {
    oracle: Arc<dyn AssetOracle>,
    membership: Arc<dyn MembershipDirectory>,
    bindings: Arc<dyn BindingStore>,
    rules: Arc<dyn RuleStore>,
    sessions: Arc<dyn SessionStore>,
    settings: SyncSettings,
}

/// Read-only inputs shared by every subject of one pass.
struct PassContext {
    oracle: Arc<dyn AssetOracle>,
    membership: Arc<dyn MembershipDirectory>,
    bindings: Arc<dyn BindingStore>,
    rules: Vec<EntitlementRule>,
    managed: BTreeSet<RoleId>,
    call_timeout: Duration,
    now: Timestamp,
}

/// What happened to one subject.
#[derive(Debug, Default)]
struct SubjectOutcome {
    missing: bool,
    failed: bool,
    oracle_failed: bool,
    roles_added: usize,
    roles_removed: usize,
    mutation_failures: usize,
}

impl ReconciliationEngine {
    pub fn new(
        oracle: Arc<dyn AssetOracle>,
        membership: Arc<dyn MembershipDirectory>,
        bindings: Arc<dyn BindingStore>,
        rules: Arc<dyn RuleStore>,
        sessions: Arc<dyn SessionStore>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            oracle,
            membership,
            bindings,
            rules,
            sessions,
            settings,
        }
    }

    /// Run one full pass over every verified binding.
    ///
    /// Only failing to load the rules or bindings aborts the pass. Setting
    /// `cancel` to `true` stops new subjects from starting; in-flight
    /// subjects finish and the report has `cancelled` set.
    pub async fn run_pass(
        &self,
        now: Timestamp,
        cancel: watch::Receiver<bool>,
    ) -> Result<SyncReport, SyncError> {
        let started = Instant::now();
        let limit = self.settings.call_timeout;

        let sessions = Arc::clone(&self.sessions);
        match blocking_store(limit, move || sessions.purge_expired(now)).await {
            Ok(0) => {}
            Ok(purged) => tracing::debug!(purged, "purged expired sessions"),
            Err(e) => tracing::warn!(error = %e, "could not purge expired sessions"),
        }

        let rule_store = Arc::clone(&self.rules);
        let rules = blocking_store(limit, move || rule_store.list_rules())
            .await
            .map_err(|source| SyncError::Fatal {
                what: "entitlement rules",
                source,
            })?;
        let binding_store = Arc::clone(&self.bindings);
        let bindings = blocking_store(limit, move || binding_store.list_bindings())
            .await
            .map_err(|source| SyncError::Fatal {
                what: "verified bindings",
                source,
            })?;
        tracing::info!(
            subjects = bindings.len(),
            rules = rules.len(),
            "starting sync pass"
        );

        // The skip decision does not depend on holdings.
        for rule in evaluate_detailed(&WalletHoldings::empty(), &rules).skipped {
            tracing::warn!(
                rule = rule.id,
                role = %rule.role_label(),
                kind = %rule.asset_kind,
                condition = %rule.condition,
                "skipping rule with unsupported shape"
            );
        }

        let managed = self.effective_managed_roles(&rules).await;
        let ctx = Arc::new(PassContext {
            oracle: Arc::clone(&self.oracle),
            membership: Arc::clone(&self.membership),
            bindings: Arc::clone(&self.bindings),
            rules,
            managed,
            call_timeout: self.settings.call_timeout,
            now,
        });

        let mut report = SyncReport {
            subjects_total: bindings.len(),
            ..SyncReport::default()
        };
        let semaphore = Arc::new(Semaphore::new(self.settings.workers.max(1)));
        let mut workers = JoinSet::new();

        for binding in bindings {
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            if *cancel.borrow() {
                report.cancelled = true;
                break;
            }
            let ctx = Arc::clone(&ctx);
            let span = tracing::info_span!("sync_subject", subject = %binding.subject_id);
            workers.spawn(
                async move {
                    let outcome = reconcile_subject(&ctx, &binding).await;
                    drop(permit);
                    outcome
                }
                .instrument(span),
            );
        }

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(outcome) => report.absorb(&outcome),
                Err(e) => {
                    tracing::error!(error = %e, "subject worker died");
                    report.subjects_failed += 1;
                }
            }
        }

        tracing::info!(
            elapsed = %format_duration(started.elapsed().as_secs()),
            cancelled = report.cancelled,
            "sync pass finished: {report}"
        );
        Ok(report)
    }

    /// Managed roles that still exist in the community. When the role list
    /// cannot be fetched, every rule role stays managed.
    async fn effective_managed_roles(&self, rules: &[EntitlementRule]) -> BTreeSet<RoleId> {
        let mut managed = managed_roles(rules);
        let existing = with_timeout(self.settings.call_timeout, self.membership.guild_roles()).await;
        match existing {
            Ok(existing) => {
                for rule in rules.iter().filter(|r| !existing.contains(&r.role_id)) {
                    tracing::warn!(
                        rule = rule.id,
                        role = %rule.role_label(),
                        "rule targets a role that does not exist in the community"
                    );
                }
                managed.retain(|r| existing.contains(r));
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not list community roles; continuing unfiltered")
            }
        }
        managed
    }
}

impl SyncReport {
    fn absorb(&mut self, outcome: &SubjectOutcome) {
        if outcome.missing {
            self.subjects_skipped_missing += 1;
        } else if outcome.failed {
            self.subjects_failed += 1;
        } else {
            self.subjects_synced += 1;
        }
        if outcome.oracle_failed {
            self.oracle_failures += 1;
        }
        self.roles_added += outcome.roles_added;
        self.roles_removed += outcome.roles_removed;
        self.mutation_failures += outcome.mutation_failures;
    }
}

/// Run a synchronous store call on the blocking pool, bounded by `limit`.
///
/// On timeout the call keeps running to completion in the background; only
/// the pass stops waiting for it.
async fn blocking_store<T, F>(limit: Duration, call: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::time::timeout(limit, tokio::task::spawn_blocking(call)).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(StoreError::Backend(format!("store task failed: {e}"))),
        Err(_) => Err(StoreError::Unavailable(format!("timed out after {limit:?}"))),
    }
}

/// Bound a membership call, mapping elapsed time to a transient failure.
async fn with_timeout<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, MembershipError>>,
) -> Result<T, MembershipError> {
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or_else(|_| Err(MembershipError::Transient(format!("timed out after {limit:?}"))))
}

async fn reconcile_subject(ctx: &PassContext, binding: &VerifiedBinding) -> SubjectOutcome {
    let mut outcome = SubjectOutcome::default();
    let subject = &binding.subject_id;

    let current = match with_timeout(ctx.call_timeout, ctx.membership.member_roles(subject)).await
    {
        Ok(Some(current)) => current,
        Ok(None) => {
            tracing::info!("member no longer in community; skipping");
            outcome.missing = true;
            return outcome;
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not read member roles");
            outcome.failed = true;
            return outcome;
        }
    };

    // A wallet whose assets cannot be read is evaluated as holding nothing.
    let items = match tokio::time::timeout(
        ctx.call_timeout,
        ctx.oracle.fetch_assets(&binding.wallet_address),
    )
    .await
    {
        Ok(Ok(items)) => items,
        Ok(Err(e)) => {
            tracing::warn!(wallet = %binding.wallet_address, error = %e, "asset oracle failed");
            outcome.oracle_failed = true;
            Vec::new()
        }
        Err(_) => {
            tracing::warn!(wallet = %binding.wallet_address, "asset oracle timed out");
            outcome.oracle_failed = true;
            Vec::new()
        }
    };
    let holdings = WalletHoldings::from_items(&items);
    let target = evaluate(&holdings, &ctx.rules);
    let plan = RoleMutationPlan::compute(&target, &current, &ctx.managed);

    if !plan.roles_to_add.is_empty() {
        match with_timeout(
            ctx.call_timeout,
            ctx.membership.add_roles(subject, &plan.roles_to_add, SYNC_REASON),
        )
        .await
        {
            Ok(()) => {
                tracing::info!(roles = ?plan.roles_to_add, "roles added");
                outcome.roles_added = plan.roles_to_add.len();
            }
            Err(e) => {
                tracing::error!(roles = ?plan.roles_to_add, error = %e, "adding roles failed");
                outcome.mutation_failures += 1;
            }
        }
    }
    if !plan.roles_to_remove.is_empty() {
        match with_timeout(
            ctx.call_timeout,
            ctx.membership.remove_roles(subject, &plan.roles_to_remove, SYNC_REASON),
        )
        .await
        {
            Ok(()) => {
                tracing::info!(roles = ?plan.roles_to_remove, "roles removed");
                outcome.roles_removed = plan.roles_to_remove.len();
            }
            Err(e) => {
                tracing::error!(roles = ?plan.roles_to_remove, error = %e, "removing roles failed");
                outcome.mutation_failures += 1;
            }
        }
    }

    let bindings = Arc::clone(&ctx.bindings);
    let (synced, at) = (subject.clone(), ctx.now);
    let recorded = blocking_store(ctx.call_timeout, move || bindings.record_sync(&synced, at));
    if let Err(e) = recorded.await {
        tracing::warn!(error = %e, "could not record sync time");
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokengate_entitlements::{AssetGroup, AssetItem, TokenInfo};
    use tokengate_nullables::{Mutation, NullMembership, NullOracle, NullStore};
    use tokengate_store::{AssetKind, Condition};
    use tokengate_types::{SubjectId, WalletAddress};

    struct Fixture {
        store: Arc<NullStore>,
        oracle: Arc<NullOracle>,
        membership: Arc<NullMembership>,
        engine: ReconciliationEngine,
    }

    fn fixture_with(settings: SyncSettings) -> Fixture {
        let store = Arc::new(NullStore::new());
        let oracle = Arc::new(NullOracle::new());
        let membership = Arc::new(NullMembership::new());
        membership.set_guild_roles(roles(&[7, 42, 43]));
        let engine = ReconciliationEngine::new(
            oracle.clone(),
            membership.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            settings,
        );
        Fixture {
            store,
            oracle,
            membership,
            engine,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(SyncSettings {
            workers: 2,
            call_timeout: Duration::from_millis(200),
        })
    }

    fn roles(ids: &[u64]) -> BTreeSet<RoleId> {
        ids.iter().copied().map(RoleId::new).collect()
    }

    fn subject(id: &str) -> SubjectId {
        SubjectId::new(id).unwrap()
    }

    fn nft(collection: &str) -> AssetItem {
        AssetItem {
            id: format!("{collection}-item"),
            token_info: None,
            grouping: vec![AssetGroup {
                group_key: "collection".into(),
                group_value: Some(collection.into()),
            }],
        }
    }

    fn token(mint: &str, balance: u128, decimals: u8) -> AssetItem {
        AssetItem {
            id: mint.into(),
            token_info: Some(TokenInfo {
                balance: Some(balance),
                decimals: Some(decimals),
            }),
            grouping: Vec::new(),
        }
    }

    impl Fixture {
        /// A verified member with wallet `W{id}` holding `roles`.
        fn member(&self, id: &str, held: &[u64]) -> SubjectId {
            let s = subject(id);
            self.store.insert_binding(VerifiedBinding::new(
                s.clone(),
                WalletAddress::new(format!("W{id}")),
            ));
            self.membership.add_member(&s, roles(held));
            s
        }

        fn rule(&self, role: u64, kind: AssetKind, condition: Condition, asset: &str, n: f64) {
            self.store
                .add_rule(EntitlementRule {
                    id: 0,
                    role_id: RoleId::new(role),
                    role_name: None,
                    asset_address: asset.into(),
                    asset_kind: kind,
                    condition,
                    required_value: n,
                })
                .unwrap();
        }

        fn standard_rules(&self) {
            self.rule(42, AssetKind::NftCollection, Condition::HasAtLeastN, "COLLX", 1.0);
            self.rule(43, AssetKind::Token, Condition::GreaterOrEqualBalance, "MINT", 100.0);
        }

        async fn pass(&self) -> SyncReport {
            let (_tx, rx) = watch::channel(false);
            self.engine.run_pass(Timestamp::new(1_000), rx).await.unwrap()
        }
    }

    #[tokio::test]
    async fn crashed_subject_counts_as_failed_and_pass_continues() {
        let f = fixture();
        f.standard_rules();
        let alice = f.member("1", &[]);
        f.member("2", &[]);
        f.oracle.set_items("W1", vec![nft("COLLX")]);
        f.oracle.crash("W2");

        let report = f.pass().await;

        assert_eq!(report.subjects_failed, 1);
        assert_eq!(report.subjects_synced, 1);
        assert_eq!(f.membership.roles_of(&alice), Some(roles(&[42])));
    }

    #[tokio::test]
    async fn slow_rule_table_aborts_pass() {
        let f = fixture_with(SyncSettings {
            workers: 2,
            call_timeout: Duration::from_millis(50),
        });
        f.standard_rules();
        f.member("1", &[]);
        f.store.set_read_latency(Duration::from_millis(400));

        let (_tx, rx) = watch::channel(false);
        let result = f.engine.run_pass(Timestamp::new(1_000), rx).await;

        assert!(matches!(
            result,
            Err(SyncError::Fatal {
                what: "entitlement rules",
                source: StoreError::Unavailable(_),
            })
        ));
        assert!(f.membership.mutations().is_empty());
    }

    #[tokio::test]
    async fn slow_writes_do_not_stall_the_pass() {
        let f = fixture_with(SyncSettings {
            workers: 2,
            call_timeout: Duration::from_millis(50),
        });
        f.standard_rules();
        let alice = f.member("1", &[]);
        f.oracle.set_items("W1", vec![nft("COLLX")]);
        f.store.set_write_latency(Duration::from_millis(500));

        let started = Instant::now();
        let report = f.pass().await;

        // Purge and record_sync both give up at the call timeout.
        assert!(started.elapsed() < Duration::from_millis(400));
        assert_eq!(report.subjects_synced, 1);
        assert_eq!(f.membership.roles_of(&alice), Some(roles(&[42])));
    }

    #[tokio::test]
    async fn grants_and_revokes_only_managed_roles() {
        let f = fixture();
        f.standard_rules();
        let alice = f.member("1", &[7]);
        let bob = f.member("2", &[7, 42, 43]);
        f.oracle.set_items("W1", vec![nft("COLLX"), nft("COLLX"), token("MINT", 150_000_000, 6)]);

        let report = f.pass().await;

        assert_eq!(f.membership.roles_of(&alice), Some(roles(&[7, 42, 43])));
        assert_eq!(f.membership.roles_of(&bob), Some(roles(&[7])));
        assert_eq!(report.subjects_synced, 2);
        assert_eq!(report.roles_added, 2);
        assert_eq!(report.roles_removed, 2);
        assert_eq!(
            f.store.get_binding(&alice).unwrap().unwrap().last_sync_at,
            Some(Timestamp::new(1_000))
        );
    }

    #[tokio::test]
    async fn second_pass_issues_no_mutations() {
        let f = fixture();
        f.standard_rules();
        f.member("1", &[]);
        f.member("2", &[42]);
        f.oracle.set_items("W1", vec![nft("COLLX")]);

        f.pass().await;
        assert!(!f.membership.mutations().is_empty());
        f.membership.clear_mutations();

        let report = f.pass().await;
        assert!(f.membership.mutations().is_empty());
        assert_eq!(report.roles_added + report.roles_removed, 0);
    }

    #[tokio::test]
    async fn oracle_failure_is_isolated_and_revokes() {
        let f = fixture();
        f.standard_rules();
        let a = f.member("1", &[42]);
        let b = f.member("2", &[]);
        f.oracle.fail("W1");
        f.oracle.set_items("W2", vec![nft("COLLX")]);

        let report = f.pass().await;

        assert_eq!(f.membership.roles_of(&a), Some(roles(&[])));
        assert_eq!(f.membership.roles_of(&b), Some(roles(&[42])));
        assert_eq!(report.oracle_failures, 1);
        assert_eq!(report.subjects_synced, 2);
    }

    #[tokio::test]
    async fn oracle_timeout_counts_as_failure() {
        let f = fixture_with(SyncSettings {
            workers: 2,
            call_timeout: Duration::from_millis(50),
        });
        f.standard_rules();
        let a = f.member("1", &[42]);
        f.oracle.hang("W1");

        let report = f.pass().await;
        assert_eq!(report.oracle_failures, 1);
        assert_eq!(f.membership.roles_of(&a), Some(roles(&[])));
    }

    #[tokio::test]
    async fn departed_member_is_skipped() {
        let f = fixture();
        f.standard_rules();
        let gone = subject("9");
        f.store.insert_binding(VerifiedBinding::new(gone, WalletAddress::new("W9")));
        f.member("1", &[]);
        f.oracle.set_items("W1", vec![nft("COLLX")]);

        let report = f.pass().await;
        assert_eq!(report.subjects_skipped_missing, 1);
        assert_eq!(report.subjects_synced, 1);
        assert_eq!(report.roles_added, 1);
        // Only the present member's wallet was looked up.
        assert_eq!(f.oracle.call_count(), 1);
    }

    #[tokio::test]
    async fn forbidden_mutation_does_not_stop_the_pass() {
        let f = fixture();
        f.standard_rules();
        let locked = f.member("1", &[]);
        let open = f.member("2", &[]);
        f.membership.forbid(&locked);
        f.oracle.set_items("W1", vec![nft("COLLX")]);
        f.oracle.set_items("W2", vec![nft("COLLX")]);

        let report = f.pass().await;
        assert_eq!(report.mutation_failures, 1);
        assert_eq!(report.roles_added, 1);
        assert_eq!(
            f.membership.mutations(),
            vec![Mutation::Add(open.clone(), roles(&[42]))]
        );
        assert_eq!(f.membership.roles_of(&open), Some(roles(&[42])));
    }

    #[tokio::test]
    async fn unreadable_member_is_counted_failed() {
        let f = fixture();
        f.standard_rules();
        let a = f.member("1", &[]);
        f.member("2", &[]);
        f.membership.make_unreachable(&a);

        let report = f.pass().await;
        assert_eq!(report.subjects_failed, 1);
        assert_eq!(report.subjects_synced, 1);
    }

    #[tokio::test]
    async fn roles_missing_from_community_are_left_alone() {
        let f = fixture();
        f.standard_rules();
        f.rule(99, AssetKind::NftCollection, Condition::HasAtLeastN, "COLLX", 1.0);
        let a = f.member("1", &[]);
        f.oracle.set_items("W1", vec![nft("COLLX")]);

        f.pass().await;
        assert_eq!(f.membership.roles_of(&a), Some(roles(&[42])));
    }

    #[tokio::test]
    async fn unfiltered_when_community_roles_unavailable() {
        let store = Arc::new(NullStore::new());
        let oracle = Arc::new(NullOracle::new());
        let membership = Arc::new(NullMembership::new());
        let engine = ReconciliationEngine::new(
            oracle.clone(),
            membership.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            SyncSettings::default(),
        );
        store
            .add_rule(EntitlementRule {
                id: 0,
                role_id: RoleId::new(99),
                role_name: Some("Holder".into()),
                asset_address: "COLLX".into(),
                asset_kind: AssetKind::NftCollection,
                condition: Condition::HasAtLeastN,
                required_value: 1.0,
            })
            .unwrap();
        let s = subject("1");
        store.insert_binding(VerifiedBinding::new(s.clone(), WalletAddress::new("W1")));
        membership.add_member(&s, roles(&[]));
        oracle.set_items("W1", vec![nft("COLLX")]);

        let (_tx, rx) = watch::channel(false);
        engine.run_pass(Timestamp::new(1), rx).await.unwrap();
        assert_eq!(membership.roles_of(&s), Some(roles(&[99])));
    }

    #[tokio::test]
    async fn cancelled_pass_starts_no_subjects() {
        let f = fixture();
        f.standard_rules();
        f.member("1", &[]);
        f.member("2", &[]);

        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let report = f.engine.run_pass(Timestamp::new(1), rx).await.unwrap();

        assert!(report.cancelled);
        assert_eq!(report.subjects_total, 2);
        assert_eq!(report.subjects_unprocessed(), 2);
        assert_eq!(f.oracle.call_count(), 0);
    }

    #[tokio::test]
    async fn store_outage_is_fatal() {
        let f = fixture();
        f.member("1", &[]);
        f.store.set_unavailable(true);

        let (_tx, rx) = watch::channel(false);
        let result = f.engine.run_pass(Timestamp::new(1), rx).await;
        assert!(matches!(result, Err(SyncError::Fatal { .. })));
        assert!(f.membership.mutations().is_empty());
    }

    #[tokio::test]
    async fn pass_purges_expired_sessions() {
        let f = fixture();
        f.store
            .create_session(&subject("1"), Timestamp::new(0), Timestamp::new(600))
            .unwrap();
        f.store
            .create_session(&subject("2"), Timestamp::new(900), Timestamp::new(1_500))
            .unwrap();

        f.pass().await;
        assert_eq!(f.store.session_count(), 1);
    }
}

//! Subcommand implementations.

use std::sync::Arc;
use std::time::Duration;

use tokengate_membership::{DiscordConfig, DiscordDirectory};
use tokengate_oracle::{DasOracle, DasOracleConfig};
use tokengate_rpc::{ApiToken, AppState, RpcServer};
use tokengate_store::{EntitlementRule, RuleStore};
use tokengate_store_lmdb::LmdbEnvironment;
use tokengate_sync::{ReconciliationEngine, SyncSettings};
use tokengate_types::Timestamp;
use tokengate_utils::format_duration;
use tokengate_verification::{ChallengeIssuer, ChallengeTemplate, SignatureVerifier};

use crate::config::GateConfig;
use crate::error::DaemonError;
use crate::shutdown::{wait_for_shutdown, ShutdownController};

/// Env var holding the Discord bot token. Never read from the config file.
const DISCORD_TOKEN_ENV: &str = "TOKENGATE_DISCORD_TOKEN";

/// Env var holding the secret the bot presents when opening sessions.
const API_TOKEN_ENV: &str = "TOKENGATE_API_TOKEN";

fn api_token_from(value: Option<String>) -> Result<ApiToken, DaemonError> {
    value
        .and_then(ApiToken::new)
        .ok_or(DaemonError::MissingSetting(API_TOKEN_ENV))
}

fn open_env(config: &GateConfig) -> Result<LmdbEnvironment, DaemonError> {
    std::fs::create_dir_all(&config.data_dir)?;
    Ok(LmdbEnvironment::open(&config.data_dir, config.lmdb_map_size)?)
}

fn install_signal_handler() -> Arc<ShutdownController> {
    let controller = Arc::new(ShutdownController::new());
    let waiter = Arc::clone(&controller);
    tokio::spawn(async move { waiter.wait_for_signal().await });
    controller
}

pub async fn serve(config: &GateConfig) -> Result<(), DaemonError> {
    let api_token = api_token_from(std::env::var(API_TOKEN_ENV).ok())?;
    let env = open_env(config)?;
    let sessions = Arc::new(env.session_store());
    let template = ChallengeTemplate::new(config.community_name.clone());
    let issuer = ChallengeIssuer::new(sessions.clone(), template.clone(), config.session_ttl_secs);
    let verifier = SignatureVerifier::new(sessions, template);
    let state = AppState::new(
        Arc::new(issuer),
        Arc::new(verifier),
        Arc::new(env.binding_store()),
        api_token,
        Duration::from_secs(config.call_timeout_secs),
    );

    let controller = install_signal_handler();
    tracing::info!(
        community = %config.community_name,
        ttl = %format_duration(config.session_ttl_secs),
        "starting verification API"
    );
    RpcServer::new(config.listen_addr, state)
        .start(wait_for_shutdown(controller.subscribe()))
        .await?;
    tracing::info!("verification API stopped");
    Ok(())
}

fn build_engine(config: &GateConfig, env: &LmdbEnvironment) -> Result<ReconciliationEngine, DaemonError> {
    if config.oracle_url.is_empty() {
        return Err(DaemonError::MissingSetting("oracle_url"));
    }
    if config.guild_id.is_empty() {
        return Err(DaemonError::MissingSetting("guild_id"));
    }
    let bot_token = std::env::var(DISCORD_TOKEN_ENV)
        .map_err(|_| DaemonError::MissingSetting(DISCORD_TOKEN_ENV))?;
    let call_timeout = Duration::from_secs(config.call_timeout_secs);

    let oracle = DasOracle::new(DasOracleConfig {
        url: config.oracle_url.clone(),
        page_limit: config.oracle_page_limit,
        max_pages: config.oracle_max_pages,
        timeout: call_timeout,
    });
    let membership = DiscordDirectory::new(DiscordConfig {
        api_base: config.discord_api_base.clone(),
        guild_id: config.guild_id.clone(),
        bot_token,
        timeout: call_timeout,
    });
    Ok(ReconciliationEngine::new(
        Arc::new(oracle),
        Arc::new(membership),
        Arc::new(env.binding_store()),
        Arc::new(env.rule_store()),
        Arc::new(env.session_store()),
        SyncSettings {
            workers: config.sync_workers,
            call_timeout,
        },
    ))
}

pub async fn sync(config: &GateConfig) -> Result<(), DaemonError> {
    let env = open_env(config)?;
    let engine = build_engine(config, &env)?;
    let controller = install_signal_handler();

    if config.sync_interval_secs == 0 {
        let report = engine
            .run_pass(Timestamp::now(), controller.subscribe())
            .await?;
        tracing::info!(%report, "sync complete");
        return Ok(());
    }

    let interval = Duration::from_secs(config.sync_interval_secs);
    tracing::info!(every = %format_duration(config.sync_interval_secs), "periodic sync");
    while !controller.is_shutdown() {
        match engine.run_pass(Timestamp::now(), controller.subscribe()).await {
            Ok(report) => tracing::info!(%report, "sync pass complete"),
            // Retried on the next tick.
            Err(e) => tracing::error!(error = %e, "sync pass aborted"),
        }
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = wait_for_shutdown(controller.subscribe()) => {}
        }
    }
    tracing::info!("periodic sync stopped");
    Ok(())
}

pub fn list_rules(config: &GateConfig) -> Result<(), DaemonError> {
    let rules = open_env(config)?.rule_store().list_rules()?;
    if rules.is_empty() {
        println!("no rules");
    }
    for rule in rules {
        println!(
            "{:>4}  role {} ({})  {} {} {} >= {}",
            rule.id,
            rule.role_id,
            rule.role_name.as_deref().unwrap_or("-"),
            rule.asset_kind,
            rule.asset_address,
            rule.condition,
            rule.required_value,
        );
    }
    Ok(())
}

pub fn add_rule(config: &GateConfig, rule: EntitlementRule) -> Result<(), DaemonError> {
    if !rule.required_value.is_finite() || rule.required_value < 0.0 {
        return Err(DaemonError::Config(format!(
            "required value must be a non-negative number, got {}",
            rule.required_value
        )));
    }
    let label = rule.role_label();
    let id = open_env(config)?.rule_store().add_rule(rule)?;
    tracing::info!(rule = id, role = %label, "rule added");
    println!("added rule {id}");
    Ok(())
}

pub fn remove_rule(config: &GateConfig, id: u64) -> Result<(), DaemonError> {
    if open_env(config)?.rule_store().remove_rule(id)? {
        println!("removed rule {id}");
    } else {
        println!("no rule with id {id}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokengate_store::{AssetKind, Condition};
    use tokengate_types::RoleId;

    fn config_in(dir: &tempfile::TempDir) -> GateConfig {
        GateConfig {
            data_dir: dir.path().join("data"),
            lmdb_map_size: 16 * 1024 * 1024,
            ..GateConfig::default()
        }
    }

    fn rule(required_value: f64) -> EntitlementRule {
        EntitlementRule {
            id: 0,
            role_id: RoleId::new(42),
            role_name: Some("Holder".into()),
            asset_address: "COLLX".into(),
            asset_kind: AssetKind::NftCollection,
            condition: Condition::HasAtLeastN,
            required_value,
        }
    }

    #[test]
    fn rules_persist_across_commands() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);

        add_rule(&config, rule(1.0)).unwrap();
        let stored = open_env(&config).unwrap().rule_store().list_rules().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].role_id, RoleId::new(42));

        remove_rule(&config, stored[0].id).unwrap();
        assert!(open_env(&config).unwrap().rule_store().list_rules().unwrap().is_empty());
    }

    #[test]
    fn negative_threshold_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        assert!(matches!(add_rule(&config, rule(-1.0)), Err(DaemonError::Config(_))));
    }

    #[test]
    fn serve_requires_a_non_blank_api_token() {
        assert!(matches!(
            api_token_from(None),
            Err(DaemonError::MissingSetting(API_TOKEN_ENV))
        ));
        assert!(matches!(
            api_token_from(Some("  ".into())),
            Err(DaemonError::MissingSetting(API_TOKEN_ENV))
        ));
        assert!(api_token_from(Some("bot-secret".into())).unwrap().matches("bot-secret"));
    }

    #[test]
    fn sync_requires_oracle_and_guild() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let env = open_env(&config).unwrap();
        assert!(matches!(
            build_engine(&config, &env),
            Err(DaemonError::MissingSetting("oracle_url"))
        ));

        let config = GateConfig {
            oracle_url: "http://localhost:8899".into(),
            ..config
        };
        assert!(matches!(
            build_engine(&config, &env),
            Err(DaemonError::MissingSetting("guild_id"))
        ));
    }
}

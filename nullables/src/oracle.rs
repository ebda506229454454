//! Nullable asset oracle: scripted holdings per wallet.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokengate_entitlements::AssetItem;
use tokengate_oracle::{AssetOracle, OracleError};
use tokengate_types::WalletAddress;

#[derive(Clone)]
enum Script {
    Items(Vec<AssetItem>),
    Fail,
    Hang,
    Crash,
}

/// An oracle that answers from a script instead of the network.
///
/// Unscripted wallets own nothing.
pub struct NullOracle {
    scripts: Mutex<HashMap<String, Script>>,
    calls: AtomicUsize,
}

impl NullOracle {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_items(&self, wallet: &str, items: Vec<AssetItem>) {
        self.script(wallet, Script::Items(items));
    }

    /// Fail every call for `wallet` with an unreachable error.
    pub fn fail(&self, wallet: &str) {
        self.script(wallet, Script::Fail);
    }

    /// Never answer for `wallet`, to exercise caller timeouts.
    pub fn hang(&self, wallet: &str) {
        self.script(wallet, Script::Hang);
    }

    /// Panic inside the call for `wallet`.
    pub fn crash(&self, wallet: &str) {
        self.script(wallet, Script::Crash);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn script(&self, wallet: &str, script: Script) {
        self.scripts
            .lock()
            .unwrap()
            .insert(wallet.to_string(), script);
    }
}

impl Default for NullOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssetOracle for NullOracle {
    async fn fetch_assets(&self, owner: &WalletAddress) -> Result<Vec<AssetItem>, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let script = self.scripts.lock().unwrap().get(owner.as_str()).cloned();
        match script {
            None => Ok(Vec::new()),
            Some(Script::Items(items)) => Ok(items),
            Some(Script::Fail) => Err(OracleError::Unreachable(format!(
                "null oracle scripted failure for {owner}"
            ))),
            Some(Script::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
            Some(Script::Crash) => panic!("null oracle scripted crash for {owner}"),
        }
    }
}

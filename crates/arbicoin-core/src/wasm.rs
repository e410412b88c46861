//! WebAssembly bindings for the ArbiCoin game engine.
//!
//! This module exposes the engine and the wallet display model to JavaScript
//! through wasm-bindgen. The page owns the timer and calls `regenerateEnergy`
//! once per second; the wallet adapter forwards provider notifications to
//! `WasmWallet`.

use wasm_bindgen::prelude::*;

use crate::actions::{GameAction, GameEvent};
use crate::engine::GameEngine;
use crate::game::GameError;
use crate::storage::{LocalStorage, SaveSlot, DEFAULT_SLOT};
use crate::wallet::{parse_wei, WalletStatus};

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// WASM-exposed game wrapper
#[wasm_bindgen]
pub struct WasmGame {
    engine: GameEngine<LocalStorage>,
}

#[wasm_bindgen]
impl WasmGame {
    /// Open the game saved in `localStorage`, or start a fresh one.
    /// Without `localStorage` the game runs but does not save.
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmGame {
        WasmGame {
            engine: GameEngine::open(SaveSlot::new(LocalStorage::open(), DEFAULT_SLOT)),
        }
    }

    /// Whether progress is being saved
    #[wasm_bindgen(js_name = canSave)]
    pub fn can_save(&self) -> bool {
        self.engine.slot().storage_available()
    }

    /// Tap the coin, returns events JSON or error
    pub fn tap(&mut self) -> Result<String, JsValue> {
        self.apply(GameAction::Tap)
    }

    /// Buy an upgrade by name (`tapPower`, `energyCapacity`, `energyRegen`)
    #[wasm_bindgen(js_name = purchaseUpgrade)]
    pub fn purchase_upgrade(&mut self, kind: &str) -> Result<String, JsValue> {
        let result = self
            .engine
            .purchase_upgrade_named(kind)
            .map(|outcome| vec![GameEvent::from(outcome)]);
        events_json(result)
    }

    /// One regeneration tick, returns events JSON
    #[wasm_bindgen(js_name = regenerateEnergy)]
    pub fn regenerate_energy(&mut self) -> Result<String, JsValue> {
        self.apply(GameAction::RegenerateEnergy)
    }

    /// Get the presentation view as JSON
    #[wasm_bindgen(js_name = getView)]
    pub fn get_view(&self) -> String {
        serde_json::to_string(&self.engine.view()).unwrap_or_else(|_| "{}".to_string())
    }

    /// Get the current snapshot as JSON
    #[wasm_bindgen(js_name = getSnapshot)]
    pub fn get_snapshot(&self) -> String {
        self.engine
            .to_snapshot()
            .to_json()
            .unwrap_or_else(|_| "{}".to_string())
    }
}

impl WasmGame {
    fn apply(&mut self, action: GameAction) -> Result<String, JsValue> {
        events_json(self.engine.apply_action(action))
    }
}

fn events_json(result: Result<Vec<GameEvent>, GameError>) -> Result<String, JsValue> {
    match result {
        Ok(events) => Ok(serde_json::to_string(&events).unwrap_or_else(|_| "[]".to_string())),
        Err(e) => Err(JsValue::from_str(&e.to_string())),
    }
}

/// WASM-exposed wallet display state
#[wasm_bindgen]
pub struct WasmWallet {
    status: WalletStatus,
}

#[wasm_bindgen]
impl WasmWallet {
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmWallet {
        WasmWallet {
            status: WalletStatus::new(),
        }
    }

    /// Record a connected account and, if known, its chain id
    pub fn connect(&mut self, address: &str, chain_id: Option<String>) {
        self.status.connect(address, chain_id);
    }

    pub fn disconnect(&mut self) {
        self.status.disconnect();
    }

    /// Forward an `accountsChanged` payload, given as a JSON array of addresses
    #[wasm_bindgen(js_name = switchAccount)]
    pub fn switch_account(&mut self, accounts_json: &str) -> Result<(), JsValue> {
        let accounts: Vec<String> = serde_json::from_str(accounts_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid accounts: {}", e)))?;
        self.status.switch_account(&accounts);
        Ok(())
    }

    /// Forward a `chainChanged` payload
    #[wasm_bindgen(js_name = switchChain)]
    pub fn switch_chain(&mut self, chain_id: &str) {
        self.status.switch_chain(chain_id);
    }

    /// Record a balance in wei, as hex (`0x...`) or decimal
    #[wasm_bindgen(js_name = setBalance)]
    pub fn set_balance(&mut self, wei: &str) -> Result<(), JsValue> {
        let wei = parse_wei(wei)
            .ok_or_else(|| JsValue::from_str(&format!("Invalid balance: {}", wei)))?;
        self.status.set_balance_wei(wei);
        Ok(())
    }

    /// Get the wallet panel strings as JSON
    #[wasm_bindgen(js_name = getView)]
    pub fn get_view(&self) -> String {
        serde_json::to_string(&self.status.view()).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for WasmGame {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for WasmWallet {
    fn default() -> Self {
        Self::new()
    }
}

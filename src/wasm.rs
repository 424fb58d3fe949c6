//! WebAssembly bindings for the simulator.
//!
//! Events arrive from JavaScript as JSON strings and snapshots leave the same
//! way, so the page only needs `JSON.parse`/`JSON.stringify`.

use wasm_bindgen::prelude::*;

use crate::isa::disasm::disassemble_word;
use crate::isa::parse_program;
use crate::{share, AutoRun, Machine, MachineEvent, NextSource, SimConfig, SimError};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly machine wrapper.
#[wasm_bindgen]
pub struct WasmMachine {
    machine: Machine,
    autorun: AutoRun,
    config: SimConfig,
}

#[wasm_bindgen]
impl WasmMachine {
    /// Create a new machine with default configuration.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        let config = SimConfig::default();
        Self {
            machine: Machine::with_config(&config),
            autorun: AutoRun::from_config(&config),
            config,
        }
    }

    /// Load program text into memory. Returns the number of words.
    #[wasm_bindgen]
    pub fn load_program(&mut self, source: &str) -> Result<usize, JsError> {
        let program = parse_program(source).map_err(|e| JsError::new(&e.to_string()))?;
        self.machine.load_program(&program);
        Ok(program.len())
    }

    /// Dispatch one event given as JSON. Returns whether it was accepted.
    ///
    /// Throws for malformed JSON or an unknown unit; an unknown operation on
    /// a known unit returns false.
    #[wasm_bindgen]
    pub fn dispatch(&mut self, event_json: &str) -> Result<bool, JsError> {
        self.apply(event_json).map_err(|e| JsError::new(&e.to_string()))
    }

    /// Select where PC's next address comes from: `increment`, `branch`,
    /// `return` or `interrupt`. Raises no signal.
    #[wasm_bindgen]
    pub fn set_pc_next_source(&mut self, source: &str) -> Result<(), JsError> {
        let source = source.parse::<NextSource>().map_err(|e| JsError::new(&e.to_string()))?;
        self.machine.pc.set_next_source(source);
        Ok(())
    }

    #[wasm_bindgen]
    pub fn set_pc_branch_target(&mut self, address: u32) {
        self.machine.pc.set_branch_target(u64::from(address));
    }

    #[wasm_bindgen]
    pub fn set_pc_return_address(&mut self, address: u32) {
        self.machine.pc.set_return_address(u64::from(address));
    }

    #[wasm_bindgen]
    pub fn set_pc_interrupt_vector(&mut self, address: u32) {
        self.machine.pc.set_interrupt_vector(u64::from(address));
    }

    /// Address PC would load next under the current selector.
    #[wasm_bindgen]
    pub fn pc_next_address(&self) -> u16 {
        self.machine.pc.next_address()
    }

    /// Advance simulated time, injecting any auto-run events that fall due.
    #[wasm_bindgen]
    pub fn tick(&mut self, elapsed: u32) -> usize {
        self.autorun.advance(&mut self.machine, u64::from(elapsed))
    }

    /// Queue a JSON array of events and start auto-run.
    #[wasm_bindgen]
    pub fn start_autorun(&mut self, events_json: &str) -> Result<bool, JsError> {
        let events =
            MachineEvent::list_from_json(events_json).map_err(|e| JsError::new(&e.to_string()))?;
        self.autorun.enqueue(events);
        Ok(self.autorun.start())
    }

    /// Cancel auto-run. Returns the number of events dropped.
    #[wasm_bindgen]
    pub fn stop_autorun(&mut self) -> usize {
        self.autorun.stop()
    }

    /// Reset every unit, keeping the configuration.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.autorun.stop();
        self.machine = Machine::with_config(&self.config);
    }

    /// Full machine snapshot as JSON.
    #[wasm_bindgen]
    pub fn snapshot_json(&self) -> Result<String, JsError> {
        share::to_json(&self.machine.snapshot()).map_err(|e| JsError::new(&e.to_string()))
    }

    /// Snapshot as a URL-safe share token.
    #[wasm_bindgen]
    pub fn share_token(&self) -> Result<String, JsError> {
        share::encode_share(&self.machine.snapshot()).map_err(|e| JsError::new(&e.to_string()))
    }

    /// Memory as a flat array of words.
    #[wasm_bindgen]
    pub fn memory_all(&self) -> Vec<u16> {
        self.machine.snapshot().memory.words
    }
}

impl WasmMachine {
    fn apply(&mut self, event_json: &str) -> Result<bool, SimError> {
        let event = MachineEvent::from_json(event_json)?;
        Ok(self.machine.dispatch(event).is_accepted())
    }
}

impl Default for WasmMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a share token into snapshot JSON; `undefined` if the token is bad.
#[wasm_bindgen]
pub fn wasm_unshare(token: &str) -> Option<String> {
    share::decode_share::<crate::MachineSnapshot>(token).and_then(|s| share::to_json(&s).ok())
}

/// Disassemble a single word.
#[wasm_bindgen]
pub fn wasm_disassemble(word: u16) -> String {
    disassemble_word(word)
}

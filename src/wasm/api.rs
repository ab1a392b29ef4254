//! WASM API for the Z80 emulator.
//!
//! Provides JavaScript-callable interfaces for CPU control, state inspection,
//! port access and assembly/disassembly. Board events are forwarded to a
//! JavaScript callback as they happen.

use crate::devices::BoardEvent;
use crate::{assemble, disassemble, Cpu, DisassemblyOptions, FlatMemory, MemoryBus};
use wasm_bindgen::prelude::*;

/// JavaScript-compatible error wrapper
#[wasm_bindgen]
#[derive(Debug, Clone)]
pub struct JsError {
    message: String,
}

#[wasm_bindgen]
impl JsError {
    #[wasm_bindgen(constructor)]
    pub fn new(message: &str) -> JsError {
        JsError {
            message: message.to_string(),
        }
    }

    #[wasm_bindgen(getter)]
    pub fn message(&self) -> String {
        self.message.clone()
    }
}

/// Result of assembly operation
#[wasm_bindgen]
#[derive(Debug, Clone)]
pub struct AssemblyResult {
    success: bool,
    machine_code: Vec<u8>,
    start_addr: u16,
    end_addr: u16,
    listing: String,
    error_message: Option<String>,
    error_line: Option<usize>,
}

#[wasm_bindgen]
impl AssemblyResult {
    #[wasm_bindgen(getter)]
    pub fn success(&self) -> bool {
        self.success
    }

    #[wasm_bindgen(getter)]
    pub fn machine_code(&self) -> Vec<u8> {
        self.machine_code.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn start_addr(&self) -> u16 {
        self.start_addr
    }

    /// Highest written address
    #[wasm_bindgen(getter)]
    pub fn end_addr(&self) -> u16 {
        self.end_addr
    }

    #[wasm_bindgen(getter)]
    pub fn listing(&self) -> String {
        self.listing.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn error_message(&self) -> Option<String> {
        self.error_message.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn error_line(&self) -> Option<usize> {
        self.error_line
    }
}

/// Main emulator interface for JavaScript
#[wasm_bindgen]
pub struct EmulatorZ80 {
    cpu: Cpu<FlatMemory>,
    on_event: js_sys::Function,
}

#[wasm_bindgen]
impl EmulatorZ80 {
    /// Create an emulator; `on_event` receives a description of every board
    /// event.
    #[wasm_bindgen(constructor)]
    pub fn new(on_event: js_sys::Function) -> Self {
        EmulatorZ80 {
            cpu: Cpu::new(FlatMemory::new()),
            on_event,
        }
    }

    fn notify(&self, events: &[BoardEvent]) {
        for event in events {
            let _ = self
                .on_event
                .call1(&JsValue::NULL, &JsValue::from_str(&event.to_string()));
        }
    }

    /// Execute a single instruction. Returns true once the CPU has halted.
    pub fn step(&mut self) -> Result<bool, JsError> {
        let result = self
            .cpu
            .step()
            .map_err(|e| JsError::new(&e.to_string()))?;
        self.notify(&result.events);
        Ok(result.status == crate::StepStatus::Halted)
    }

    /// Execute up to `max_steps` instructions and return how many ran
    pub fn run(&mut self, max_steps: u32) -> Result<u32, JsError> {
        let summary = self
            .cpu
            .run(max_steps as usize)
            .map_err(|e| JsError::new(&e.to_string()))?;
        self.notify(&summary.events);
        Ok(summary.steps as u32)
    }

    /// Accept a maskable interrupt with `data` on the bus
    pub fn interrupt(&mut self, data: u8) -> Result<bool, JsError> {
        self.cpu
            .interrupt(data)
            .map_err(|e| JsError::new(&e.to_string()))
    }

    pub fn nmi(&mut self) {
        self.cpu.nmi();
    }

    /// Reset registers; memory and ports are kept
    pub fn reset(&mut self) {
        self.cpu.reset();
    }

    pub fn reset_ram(&mut self) {
        self.cpu.reset_ram();
    }

    pub fn reset_ports(&mut self) {
        self.cpu.reset_ports();
    }

    // Register getters
    #[wasm_bindgen(getter)]
    pub fn a(&self) -> u8 {
        self.cpu.a()
    }

    #[wasm_bindgen(getter)]
    pub fn f(&self) -> u8 {
        self.cpu.f()
    }

    #[wasm_bindgen(getter)]
    pub fn bc(&self) -> u16 {
        self.cpu.bc()
    }

    #[wasm_bindgen(getter)]
    pub fn de(&self) -> u16 {
        self.cpu.de()
    }

    #[wasm_bindgen(getter)]
    pub fn hl(&self) -> u16 {
        self.cpu.hl()
    }

    #[wasm_bindgen(getter)]
    pub fn ix(&self) -> u16 {
        self.cpu.ix()
    }

    #[wasm_bindgen(getter)]
    pub fn iy(&self) -> u16 {
        self.cpu.iy()
    }

    #[wasm_bindgen(getter)]
    pub fn sp(&self) -> u16 {
        self.cpu.sp()
    }

    #[wasm_bindgen(getter)]
    pub fn pc(&self) -> u16 {
        self.cpu.pc()
    }

    #[wasm_bindgen(getter)]
    pub fn halted(&self) -> bool {
        self.cpu.is_halted()
    }

    // Flag getters
    #[wasm_bindgen(getter)]
    pub fn flag_s(&self) -> bool {
        self.cpu.flags().s
    }

    #[wasm_bindgen(getter)]
    pub fn flag_z(&self) -> bool {
        self.cpu.flags().z
    }

    #[wasm_bindgen(getter)]
    pub fn flag_h(&self) -> bool {
        self.cpu.flags().h
    }

    #[wasm_bindgen(getter)]
    pub fn flag_pv(&self) -> bool {
        self.cpu.flags().pv
    }

    #[wasm_bindgen(getter)]
    pub fn flag_n(&self) -> bool {
        self.cpu.flags().n
    }

    #[wasm_bindgen(getter)]
    pub fn flag_c(&self) -> bool {
        self.cpu.flags().c
    }

    // Register setters

    pub fn set_a(&mut self, value: u8) {
        self.cpu.set_a(value);
    }

    pub fn set_f(&mut self, value: u8) {
        self.cpu.set_f(value);
    }

    pub fn set_bc(&mut self, value: u16) {
        self.cpu.state_mut().set_bc(value);
    }

    pub fn set_de(&mut self, value: u16) {
        self.cpu.state_mut().set_de(value);
    }

    pub fn set_hl(&mut self, value: u16) {
        self.cpu.state_mut().set_hl(value);
    }

    pub fn set_sp(&mut self, value: u16) {
        self.cpu.set_sp(value);
    }

    pub fn set_pc(&mut self, addr: u16) {
        self.cpu.set_pc(addr);
    }

    // Memory and port access

    pub fn read_memory(&self, addr: u16) -> u8 {
        self.cpu.memory().read(addr)
    }

    pub fn write_memory(&mut self, addr: u16, value: u8) {
        self.cpu.memory_mut().write(addr, value);
    }

    /// Read a 256-byte page from memory (for efficient display)
    pub fn get_memory_page(&self, page: u8) -> Vec<u8> {
        let start = (page as u16) << 8;
        (0..256).map(|i| self.cpu.memory().read(start + i)).collect()
    }

    pub fn read_port(&self, port: u8) -> u8 {
        self.cpu.ports().read(port)
    }

    /// Supply a byte on a port, e.g. the storage controller's reply
    pub fn write_port(&mut self, port: u8, value: u8) {
        self.cpu.ports_mut().write(port, value);
    }

    /// Load a program into memory and set PC
    pub fn load_program(&mut self, program: &[u8], start_addr: u16) {
        self.cpu.memory_mut().load(start_addr, program);
        self.cpu.set_pc(start_addr);
    }

    /// Assemble Z80 source code
    pub fn assemble(&self, source: String) -> AssemblyResult {
        match assemble(&source) {
            Ok(output) => {
                let (start_addr, bytes) = output.image();
                let end_addr = output.written_range().map_or(start_addr, |(_, end)| end);
                AssemblyResult {
                    success: true,
                    machine_code: bytes.to_vec(),
                    start_addr,
                    end_addr,
                    listing: output.listing.to_string(),
                    error_message: None,
                    error_line: None,
                }
            }
            Err(error) => AssemblyResult {
                success: false,
                machine_code: Vec::new(),
                start_addr: 0,
                end_addr: 0,
                listing: String::new(),
                error_message: Some(error.kind.to_string()),
                error_line: Some(error.line),
            },
        }
    }

    /// Assemble and load program in one step
    pub fn assemble_and_load(&mut self, source: String) -> AssemblyResult {
        let result = self.assemble(source);
        if result.success {
            self.load_program(&result.machine_code, result.start_addr);
        }
        result
    }

    /// Disassemble `length` bytes of memory starting at `start_addr`
    pub fn disassemble(&self, start_addr: u16, length: u16, use_labels: bool) -> String {
        let bytes: Vec<u8> = (0..length)
            .map(|i| self.cpu.memory().read(start_addr.wrapping_add(i)))
            .collect();
        let options = DisassemblyOptions {
            load_address: start_addr,
            use_labels,
            ..DisassemblyOptions::default()
        };
        disassemble(&bytes, &options).to_source()
    }
}

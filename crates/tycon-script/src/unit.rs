//! Compiled unit assembly
//!
//! A compiled unit is one text blob with a fixed section order: stack-size
//! header, register and array declarations, label tables (actions, moves,
//! ais, quotes), the heap-allocator preamble, the optional new-game and
//! on-spawn blocks, then every compiled state/actor/event body in visit
//! order.

use crate::ops;
use rustc_hash::FxHashMap;
use std::fmt::Write as _;

/// Accumulates the pieces of one compiled program and assembles them in
/// the section order the host runtime expects.
pub struct ScriptUnit {
    stack_size: u32,
    registers: Vec<(String, i64)>,
    register_index: FxHashMap<String, usize>,
    arrays: Vec<(String, u32)>,
    array_index: FxHashMap<String, usize>,
    /// `action`/`move`/`ai` table lines, in declaration order.
    labels: Vec<String>,
    quotes: Vec<String>,
    quote_index: FxHashMap<String, u32>,
    preamble: String,
    new_game: Option<String>,
    on_spawn: Option<String>,
    bodies: Vec<String>,
}

impl ScriptUnit {
    pub fn new(stack_size: u32) -> Self {
        Self {
            stack_size,
            registers: Vec::new(),
            register_index: FxHashMap::default(),
            arrays: Vec::new(),
            array_index: FxHashMap::default(),
            labels: Vec::new(),
            quotes: Vec::new(),
            quote_index: FxHashMap::default(),
            preamble: String::new(),
            new_game: None,
            on_spawn: None,
            bodies: Vec::new(),
        }
    }

    /// Declare a named register. Re-declaring updates the initial value.
    pub fn declare_register(&mut self, name: &str, init: i64) {
        match self.register_index.get(name) {
            Some(&idx) => self.registers[idx].1 = init,
            None => {
                self.register_index.insert(name.to_string(), self.registers.len());
                self.registers.push((name.to_string(), init));
            }
        }
    }

    /// Declare a named array. Re-declaring keeps the larger size.
    pub fn declare_array(&mut self, name: &str, size: u32) {
        match self.array_index.get(name) {
            Some(&idx) => {
                if size > self.arrays[idx].1 {
                    self.arrays[idx].1 = size;
                }
            }
            None => {
                self.array_index.insert(name.to_string(), self.arrays.len());
                self.arrays.push((name.to_string(), size));
            }
        }
    }

    /// Append one label-table line (`action ...`, `move ...`, `ai ...`).
    pub fn push_label(&mut self, line: String) {
        self.labels.push(line);
    }

    /// Intern a quote string, returning its index.
    pub fn add_quote(&mut self, text: &str) -> u32 {
        if let Some(&idx) = self.quote_index.get(text) {
            return idx;
        }
        let idx = self.quotes.len() as u32;
        self.quote_index.insert(text.to_string(), idx);
        self.quotes.push(text.to_string());
        idx
    }

    pub fn set_preamble(&mut self, text: String) {
        self.preamble = text;
    }

    pub fn set_new_game(&mut self, text: String) {
        self.new_game = Some(text);
    }

    pub fn set_on_spawn(&mut self, text: String) {
        self.on_spawn = Some(text);
    }

    /// Append one compiled state/actor/event block, in visit order.
    pub fn push_body(&mut self, text: String) {
        self.bodies.push(text);
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn bodies(&self) -> &[String] {
        &self.bodies
    }

    /// Assemble the final program text.
    pub fn assemble(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} {}", ops::STACKSIZE, self.stack_size);
        for (name, init) in &self.registers {
            let _ = writeln!(out, "{} {} {}", ops::VAR, name, init);
        }
        for (name, size) in &self.arrays {
            let _ = writeln!(out, "{} {} {}", ops::ARRAY, name, size);
        }
        for line in &self.labels {
            out.push_str(line);
            out.push('\n');
        }
        for (idx, text) in self.quotes.iter().enumerate() {
            let _ = writeln!(out, "{} {} {}", ops::DEFINEQUOTE, idx, text);
        }
        out.push_str(&self.preamble);
        if let Some(block) = &self.new_game {
            out.push_str(block);
        }
        if let Some(block) = &self.on_spawn {
            out.push_str(block);
        }
        for body in &self.bodies {
            out.push_str(body);
        }
        out
    }
}

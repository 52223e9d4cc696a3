use egui::Context;
use winit::keyboard::{Key, NamedKey};

/// Actions the debug surface can ask the engine for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugCommand {
    Spawn,
    Reset,
    SetWireframes(bool),
}

/// Snapshot shown by the panel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DebugState {
    pub objects: usize,
    pub pending_loads: usize,
    pub wireframes: bool,
    pub fps: f32,
}

/// Space spawns, R resets.
pub fn command_for_key(key: &Key) -> Option<DebugCommand> {
    match key {
        Key::Named(NamedKey::Space) => Some(DebugCommand::Spawn),
        Key::Character(c) if c.eq_ignore_ascii_case("r") => Some(DebugCommand::Reset),
        _ => None,
    }
}

pub struct DebugPanel {
    open: bool,
}

impl Default for DebugPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl DebugPanel {
    pub fn new() -> Self {
        Self { open: true }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn toggle(&mut self) {
        self.open = !self.open;
    }

    pub fn draw(&mut self, ctx: &Context, state: &DebugState) -> Vec<DebugCommand> {
        let mut commands = Vec::new();
        if !self.open {
            return commands;
        }

        egui::Window::new("Debug")
            .default_pos([12.0, 12.0])
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    if ui.button("createObd").clicked() {
                        commands.push(DebugCommand::Spawn);
                    }
                    if ui.button("reset").clicked() {
                        commands.push(DebugCommand::Reset);
                    }
                });

                let mut wireframes = state.wireframes;
                if ui.checkbox(&mut wireframes, "collision wireframes").changed() {
                    commands.push(DebugCommand::SetWireframes(wireframes));
                }

                ui.separator();
                ui.label(format!("Objects: {}", state.objects));
                ui.label(format!("Loading: {}", state.pending_loads));
                ui.label(format!("FPS: {:.0}", state.fps));
            });

        commands
    }
}

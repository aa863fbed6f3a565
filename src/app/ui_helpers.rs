use egui::{Context, RichText, Color32, Key};
use super::{MindMapApp, Settings, rfd_open_outline};

impl MindMapApp {
    // ── UI helpers ────────────────────────────────────────────────────────────

    pub(super) fn draw_menu_bar(&mut self, ctx: &Context) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("New").clicked() {
                        self.new_document();
                        ui.close_menu();
                    }
                    if ui.button("Open…  Ctrl+O").clicked() {
                        if let Some(path) = rfd_open_outline() {
                            self.open_document(&path);
                        }
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("Save  Ctrl+S").clicked() {
                        self.save_document();
                        ui.close_menu();
                    }
                    if ui.button("Save As…").clicked() {
                        self.save_document_as();
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("Export Map as JSON…").clicked() {
                        self.export_json();
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });

                ui.menu_button("Edit", |ui| {
                    let can_undo = !self.undo_stack.is_empty();
                    if ui.add_enabled(can_undo, egui::Button::new("Undo  Ctrl+Z")).clicked() {
                        self.undo();
                        ui.close_menu();
                    }
                    if ui.button("Normalize Indentation").clicked() {
                        self.normalize_indentation();
                        ui.close_menu();
                    }
                });

                ui.menu_button("View", |ui| {
                    if ui.button("Expand All").clicked() {
                        self.state.expand_all();
                        ui.close_menu();
                    }
                    if ui.button("Collapse All").clicked() {
                        self.state.collapse_all(&self.map);
                        ui.close_menu();
                    }
                    for (count, text) in [(1, "Show 1 Level"), (2, "Show 2 Levels")] {
                        if ui.button(text).clicked() {
                            self.state.show_levels(&self.map, count);
                            ui.close_menu();
                        }
                    }
                    ui.separator();
                    if ui.button("Fit View").clicked() {
                        self.view.request_fit();
                        ui.close_menu();
                    }
                    if ui.button("Reset Zoom").clicked() {
                        self.view.reset_zoom();
                        ui.close_menu();
                    }
                    ui.separator();
                    ui.checkbox(&mut self.settings.view.dark_mode, "Dark Mode");
                    if ui.checkbox(&mut self.fullscreen, "Fullscreen  F11").changed() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(self.fullscreen));
                    }
                });

                ui.menu_button("Settings", |ui| {
                    if ui.button("⚙ Layout & View…").clicked() {
                        self.show_settings_window = true;
                        ui.close_menu();
                    }
                });
            });
        });
    }

    pub(super) fn draw_status_bar(&self, ctx: &Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(RichText::new(&self.status).color(Color32::from_gray(180)));
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(
                        RichText::new(format!(
                            "{} nodes · {} roots · {} folded · {:.0}%",
                            self.map.len(),
                            self.map.roots().count(),
                            self.state.collapsed_count(),
                            self.view.zoom * 100.0,
                        ))
                        .color(Color32::from_gray(120))
                        .small(),
                    );
                });
            });
        });
    }

    pub(super) fn handle_keyboard(&mut self, ctx: &Context) {
        // the focused TextEdit keeps its own undo history
        let editing = ctx.wants_keyboard_input();
        let input = ctx.input(|i| {
            let ctrl = i.modifiers.ctrl || i.modifiers.command;
            (
                ctrl && i.key_pressed(Key::S),   // Ctrl+S
                ctrl && i.key_pressed(Key::O),   // Ctrl+O
                !editing && ctrl && i.key_pressed(Key::Z),   // Ctrl+Z
                i.key_pressed(Key::F11),
            )
        });
        if input.0 {
            self.save_document();
        }
        if input.1 {
            if let Some(path) = rfd_open_outline() {
                self.open_document(&path);
            }
        }
        if input.2 {
            self.undo();
        }
        if input.3 {
            self.fullscreen = !self.fullscreen;
            ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(self.fullscreen));
        }
    }

    /// Draw the floating layout/view settings window.
    pub(super) fn draw_settings_window(&mut self, ctx: &Context) {
        if !self.show_settings_window {
            return;
        }

        let before = self.settings.layout.clone();
        let mut open = self.show_settings_window;
        let mut save = false;
        egui::Window::new("⚙ Layout & View")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .min_width(300.0)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                let layout = &mut self.settings.layout;
                ui.heading("Layout");
                ui.horizontal(|ui| {
                    ui.label("Level spacing:");
                    ui.add(egui::Slider::new(&mut layout.h_spacing, 80.0..=480.0).suffix(" px"));
                });
                ui.horizontal(|ui| {
                    ui.label("Row spacing:");
                    ui.add(egui::Slider::new(&mut layout.v_spacing, 24.0..=160.0).suffix(" px"));
                });
                ui.horizontal(|ui| {
                    ui.label("Tab width:");
                    ui.add(egui::Slider::new(&mut layout.tab_width, 1..=8));
                });
                ui.checkbox(&mut layout.strip_bullets, "Strip leading - * + markers");
                ui.checkbox(&mut layout.compact_collapsed, "Close gaps left by folded branches");

                ui.add_space(8.0);
                let view = &mut self.settings.view;
                ui.heading("View");
                ui.horizontal(|ui| {
                    ui.label("Font size:");
                    ui.add(egui::Slider::new(&mut view.font_size, 10.0..=26.0).step_by(1.0).suffix(" px"));
                });
                ui.horizontal(|ui| {
                    ui.label("Label length:");
                    ui.add(egui::Slider::new(&mut view.max_label_chars, 8..=80));
                });
                ui.checkbox(&mut view.hover_highlight, "Highlight branch under pointer");
                ui.checkbox(&mut view.dark_mode, "Dark mode");

                ui.add_space(8.0);
                ui.separator();
                ui.horizontal(|ui| {
                    if ui.button("Reset Defaults").clicked() {
                        self.settings = Settings::default();
                    }
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("Save").clicked() {
                            save = true;
                        }
                    });
                });
            });

        self.show_settings_window = open;
        if self.settings.layout != before {
            self.relayout();
        }
        if save {
            self.save_settings();
        }
    }
}

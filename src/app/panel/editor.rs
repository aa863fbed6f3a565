use egui::{Color32, Context, RichText};

use super::super::{line_of_char, MindMapApp};

impl MindMapApp {
    // ── Panel: outline text ───────────────────────────────────────────────────

    pub(in crate::app) fn draw_editor_panel(&mut self, ctx: &Context) {
        let mut cursor_line: Option<usize> = None;

        egui::SidePanel::left("outline_editor")
            .resizable(true)
            .default_width(320.0)
            .min_width(200.0)
            .show(ctx, |ui| {
                ui.add_space(4.0);
                ui.horizontal(|ui| {
                    ui.label(RichText::new(self.doc.title()).strong());
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.small_button("💾").on_hover_text("Save (Ctrl+S)").clicked() {
                            self.save_document();
                        }
                    });
                });
                ui.separator();

                let prev = self.doc.content.clone();
                egui::ScrollArea::vertical()
                    .id_salt("outline_editor_scroll")
                    .show(ui, |ui| {
                        let output = egui::TextEdit::multiline(&mut self.doc.content)
                            .desired_width(f32::INFINITY)
                            .desired_rows(30)
                            .min_size(egui::vec2(0.0, ui.available_height()))
                            .font(egui::TextStyle::Monospace)
                            .hint_text("Root\n    Child\n        Grandchild")
                            .code_editor()
                            .show(ui);
                        if output.response.changed() {
                            self.text_edited(prev);
                        }
                        if output.response.has_focus() {
                            if let Some(range) = output.cursor_range {
                                cursor_line = Some(line_of_char(
                                    &self.doc.content,
                                    range.primary.ccursor.index,
                                ));
                            }
                        }
                    });

                if self.map.is_empty() && !self.doc.content.trim().is_empty() {
                    ui.label(RichText::new("No nodes: every line is blank or a bare bullet")
                        .color(Color32::GRAY));
                }
            });

        if let Some(line) = cursor_line {
            self.cursor_moved(line);
        }
    }
}

use crate::executor::QueryResult;
use crate::tutor::{Nav, RunOutcome, Tutor};
use eframe::{App, egui};
use egui::{Color32, RichText};
use egui_extras::syntax_highlighting::CodeTheme;
use egui_extras::{Column, TableBuilder};

const EDITOR_HEIGHT: f32 = 140.0;

pub struct Application {
    tutor: Tutor,
    /// 단원을 옮기면 지워집니다.
    last_run: Option<RunOutcome>,
    show_schema: bool,
}

impl App for Application {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::SidePanel::left("curriculum")
            .resizable(false)
            .default_width(240.0)
            .show(ctx, |ui| self.draw_sidebar(ui));
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| self.draw_lesson(ui));
        });
    }
}

impl Application {
    pub fn new(tutor: Tutor) -> Self {
        Self {
            tutor,
            last_run: None,
            show_schema: false,
        }
    }

    pub fn launch(self) -> Result<(), eframe::Error> {
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default().with_inner_size([1100.0, 760.0]),
            ..Default::default()
        };
        eframe::run_native(
            "SQL Masterclass",
            options,
            Box::new(|_cc| Ok(Box::new(self))),
        )
    }

    fn navigate(&mut self, nav: Nav) {
        self.tutor.navigate(nav);
        if nav != Nav::ShowSolution {
            self.last_run = None;
        }
    }

    fn draw_sidebar(&mut self, ui: &mut egui::Ui) {
        ui.heading("SQL Masterclass");
        ui.separator();

        let progress = self.tutor.progress();
        ui.add(egui::ProgressBar::new(progress.fraction()));
        ui.label(RichText::new(progress.caption()).small().weak());
        ui.add_space(8.0);

        ui.label(RichText::new("Curriculum").strong());
        let mut picked = None;
        for entry in self.tutor.lessons() {
            if ui.selectable_label(entry.is_active, entry.category).clicked() {
                picked = Some(entry.index);
            }
        }
        if let Some(index) = picked {
            self.navigate(Nav::Select(index));
        }

        ui.add_space(8.0);
        ui.separator();
        ui.checkbox(&mut self.show_schema, "Show Database Schema");
        if self.show_schema {
            for (table, columns) in self.tutor.schema() {
                ui.add_space(4.0);
                ui.label(RichText::new(&table).monospace().strong());
                egui::Grid::new(("schema", table.as_str()))
                    .striped(true)
                    .show(ui, |ui| {
                        for (name, ty) in columns {
                            ui.monospace(name);
                            ui.label(RichText::new(ty).weak());
                            ui.end_row();
                        }
                    });
            }
        }
    }

    fn draw_lesson(&mut self, ui: &mut egui::Ui) {
        let lesson = self.tutor.current_lesson();
        ui.heading(lesson.title);
        ui.add_space(6.0);

        egui::CollapsingHeader::new("Key Concept")
            .default_open(true)
            .show(ui, |ui| {
                ui.label(RichText::new(lesson.concept).color(Color32::LIGHT_BLUE));
                ui.label(lesson.description);
            });
        ui.add_space(6.0);

        ui.label(RichText::new("Your Mission").heading());
        ui.label(RichText::new(lesson.task).strong());
        egui::CollapsingHeader::new("Need a hint?")
            .default_open(false)
            .show(ui, |ui| {
                ui.horizontal_wrapped(|ui| {
                    ui.label("Try using:");
                    ui.monospace(lesson.hint);
                });
            });
        ui.add_space(6.0);

        self.draw_code_editor(EDITOR_HEIGHT, ui);
        ui.horizontal(|ui| {
            if ui.button("Run Query").clicked() {
                self.last_run = Some(self.tutor.run_editor());
            }
            if ui.button("Show Solution").clicked() {
                self.navigate(Nav::ShowSolution);
            }
        });
        ui.add_space(6.0);

        if let Some(outcome) = &self.last_run {
            draw_outcome(ui, outcome);
        }

        ui.add_space(12.0);
        ui.separator();
        self.draw_navigation(ui);
    }

    fn draw_navigation(&mut self, ui: &mut egui::Ui) {
        let mut nav = None;
        ui.horizontal(|ui| {
            if self.tutor.can_go_prev() && ui.button("Previous Lesson").clicked() {
                nav = Some(Nav::Prev);
            }
            if self.tutor.can_go_next() {
                let mut next = egui::Button::new("Next Lesson");
                if self.tutor.last_run_success() {
                    next = next.fill(Color32::DARK_GREEN);
                }
                if ui.add(next).clicked() {
                    nav = Some(Nav::Next);
                }
            }
        });
        if let Some(nav) = nav {
            self.navigate(nav);
        }
    }

    fn draw_code_editor(&mut self, height: f32, ui: &mut egui::Ui) {
        let mut layouter = |ui: &egui::Ui, buf: &dyn egui::TextBuffer, wrap_width: f32| {
            let mut layout_job = egui_extras::syntax_highlighting::highlight(
                ui.ctx(),
                ui.style(),
                &CodeTheme::dark(16.0),
                buf.as_str(),
                "SQL",
            );
            layout_job.wrap.max_width = wrap_width;
            ui.fonts_mut(|f| f.layout_job(layout_job))
        };
        egui::ScrollArea::vertical()
            .id_salt("editor")
            .max_height(height)
            .show(ui, |ui| {
                let editor = egui::TextEdit::multiline(self.tutor.editor_mut())
                    .font(egui::TextStyle::Monospace) // 커서 높이
                    .code_editor()
                    .desired_rows(6)
                    .lock_focus(true)
                    .desired_width(f32::INFINITY)
                    .layouter(&mut layouter);
                ui.add(editor);
            });
    }
}

fn draw_outcome(ui: &mut egui::Ui, outcome: &RunOutcome) {
    match &outcome.result {
        Ok(result) => {
            ui.label(RichText::new("Result").strong());
            draw_result_table(ui, result);
            ui.add_space(6.0);
            let color = if outcome.passed() {
                Color32::GREEN
            } else {
                Color32::YELLOW
            };
            ui.colored_label(color, outcome.message());
        }
        Err(_) => {
            ui.colored_label(Color32::RED, outcome.message());
        }
    }
}

fn draw_result_table(ui: &mut egui::Ui, result: &QueryResult) {
    if result.column_count() == 0 {
        ui.label("No results yet.");
        return;
    }
    TableBuilder::new(ui)
        .id_salt("result")
        .striped(true)
        .vscroll(false)
        .columns(Column::auto().at_least(60.0), result.column_count())
        .header(20.0, |mut header| {
            for name in &result.columns {
                header.col(|ui| {
                    ui.strong(name);
                });
            }
        })
        .body(|body| {
            body.rows(18.0, result.row_count(), |mut row| {
                let values = &result.rows[row.index()];
                for value in values {
                    row.col(|ui| {
                        ui.monospace(value.to_string());
                    });
                }
            });
        });
    ui.label(RichText::new(format!("{} rows", result.row_count())).small().weak());
}

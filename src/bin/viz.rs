use std::path::Path;

use eframe::egui;
use egui_plot::{Legend, Line, Plot, PlotPoints};

use rocket_traj::io::{load_mission, TrajectoryRecord};
use rocket_traj::sim::{self, MissionReport};
use rocket_traj::vehicle::{presets, Mission};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mission = match std::env::args().nth(1) {
        Some(path) => load_mission(Path::new(&path))?,
        None => presets::two_stage(),
    };
    let report = sim::simulate(&mission)?;

    let app = TrajectoryViz { mission, report };
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1200.0, 800.0]),
        ..Default::default()
    };
    eframe::run_native("Rocket Trajectory", options, Box::new(|_| Ok(Box::new(app))))
        .map_err(|e| anyhow::anyhow!("viewer failed: {e}"))
}

struct TrajectoryViz {
    mission: Mission,
    report: MissionReport<Vec<TrajectoryRecord>>,
}

impl TrajectoryViz {
    /// One line per segment, decimated to at most ~2000 points each.
    fn lines(&self, f: impl Fn(&TrajectoryRecord) -> [f64; 2]) -> Vec<Line<'static>> {
        self.report
            .segments
            .iter()
            .map(|seg| {
                let step = (seg.sink.len() / 2000).max(1);
                let points: PlotPoints = seg.sink.iter().step_by(step).map(&f).collect();
                Line::new(seg.label.to_string(), points)
            })
            .collect()
    }

    fn plot(&self, ui: &mut egui::Ui, id: &str, x_label: &str, size: egui::Vec2, lines: Vec<Line<'static>>) {
        Plot::new(id)
            .width(size.x)
            .height(size.y)
            .x_axis_label(x_label)
            .legend(Legend::default())
            .show(ui, |plot_ui| {
                for line in lines {
                    plot_ui.line(line);
                }
            });
    }
}

impl eframe::App for TrajectoryViz {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.heading(format!("Mission: {}", self.mission.name));
            let orbit = self
                .report
                .orbit
                .map_or("-".to_string(), |o| if o.in_orbit { "in orbit".into() } else { "suborbital".into() });
            ui.label(format!(
                "Max altitude: {:.1} km  |  Max downrange: {:.1} km  |  Segments: {}  |  {}",
                self.report.max_altitude / 1000.0,
                self.report.max_downrange / 1000.0,
                self.report.segments.len(),
                orbit,
            ));
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let available = ui.available_size();
            let half = egui::vec2(available.x / 2.0 - 8.0, available.y / 2.0 - 24.0);

            ui.horizontal(|ui| {
                ui.vertical(|ui| {
                    ui.label("Altitude (km)");
                    self.plot(ui, "altitude", "Time (s)", half, self.lines(|r| [r.time, r.altitude / 1000.0]));
                });
                ui.vertical(|ui| {
                    ui.label("Inertial speed (m/s)");
                    self.plot(ui, "speed", "Time (s)", half, self.lines(|r| [r.time, r.inertial_speed]));
                });
            });

            ui.horizontal(|ui| {
                ui.vertical(|ui| {
                    ui.label("Mass (kg)");
                    self.plot(ui, "mass", "Time (s)", half, self.lines(|r| [r.time, r.mass]));
                });
                ui.vertical(|ui| {
                    ui.label("Trajectory profile (km)");
                    self.plot(
                        ui,
                        "profile",
                        "Downrange (km)",
                        half,
                        self.lines(|r| [r.downrange / 1000.0, r.altitude / 1000.0]),
                    );
                });
            });
        });
    }
}

// src/bin/visualizer.rs

use eframe::egui;
use egui::{Color32, FontId, Frame, RichText};
use egui_plot::{Legend, Line, Plot, PlotPoints};
use std::sync::Arc;
use std::time::Duration;

use agent_exchange::{
    CascadeAlert, EngineConfig, MarketEngine, Sector, ShockRequest, ShockType, SnapshotRecorder,
};

// Ticks kept on screen.
const PLOT_WINDOW: usize = 200;

struct ExchangeApp {
    engine: MarketEngine,
    recorder: Arc<SnapshotRecorder>,

    // shock injector
    shock_type: ShockType,
    severity: f64,
    use_default_severity: bool,

    // trading panel
    selected_agent: String,
    trade_amount: f64,

    last_message: Option<String>,
}

fn sector_color(sector: Sector) -> Color32 {
    match sector {
        Sector::FraudAml => Color32::LIGHT_RED,
        Sector::Compliance => Color32::LIGHT_GREEN,
        Sector::GeoOsint => Color32::LIGHT_BLUE,
    }
}

impl eframe::App for ExchangeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // the engine ticks on its own thread; just keep redrawing
        ctx.request_repaint_after(Duration::from_millis(100));
        let status = self.engine.status();
        let latest = self.recorder.latest();

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Agent Exchange");
                ui.separator();

                let running = self.engine.is_running();
                if ui.button(if running { "⏸ Stop Market" } else { "▶ Start Market" }).clicked() {
                    if running {
                        self.engine.stop();
                    } else if let Err(err) = self.engine.start() {
                        self.last_message = Some(err.to_string());
                    }
                }
                if ui.button("⏭ Step").clicked() {
                    if let Err(err) = self.engine.tick_once() {
                        self.last_message = Some(err.to_string());
                    }
                }
                if ui.button("🔄 Reset").clicked() {
                    self.engine.reset();
                    self.recorder.clear();
                    self.last_message = None;
                }
                ui.separator();
                ui.label(format!("tick {}", status.tick_number));
                if let Some(ms) = status.last_tick_latency_ms {
                    ui.label(format!("{ms:.2} ms"));
                }
                if status.failed_ticks > 0 {
                    ui.label(RichText::new(format!("{} failed", status.failed_ticks)).color(Color32::RED));
                }
            });
        });

        egui::SidePanel::right("controls").min_width(260.0).show(ctx, |ui| {
            ui.heading("Shock");
            egui::ComboBox::from_id_source("shock_type")
                .selected_text(self.shock_type.as_str())
                .show_ui(ui, |ui| {
                    for t in ShockType::ALL {
                        ui.selectable_value(&mut self.shock_type, t, t.as_str());
                    }
                });
            ui.checkbox(&mut self.use_default_severity, "default severity");
            ui.add_enabled(
                !self.use_default_severity,
                egui::Slider::new(&mut self.severity, 0.0..=1.0).text("severity"),
            );
            if ui.button("💥 Inject").clicked() {
                let mut request = ShockRequest::new(self.shock_type).with_source("visualizer");
                if !self.use_default_severity {
                    request = request.with_severity(self.severity);
                }
                self.last_message = Some(match self.engine.inject_shock(request) {
                    Ok(shock) => format!("{} {} ({:.2})", shock.id, shock.shock_type, shock.severity),
                    Err(err) => err.to_string(),
                });
            }

            ui.separator();
            ui.heading("Trade");
            let agents = self.engine.get_agents();
            egui::ComboBox::from_id_source("agent")
                .selected_text(self.selected_agent.clone())
                .show_ui(ui, |ui| {
                    for a in &agents {
                        ui.selectable_value(&mut self.selected_agent, a.id.clone(), a.name.as_str());
                    }
                });
            ui.add(egui::DragValue::new(&mut self.trade_amount).speed(10.0).prefix("amount: "));
            ui.horizontal(|ui| {
                if ui.button("Buy").clicked() {
                    if let Err(err) = self.engine.simulate_buy(&self.selected_agent, self.trade_amount) {
                        self.last_message = Some(err.to_string());
                    }
                }
                if ui.button("Sell").clicked() {
                    if let Err(err) = self.engine.simulate_sell(&self.selected_agent, self.trade_amount) {
                        self.last_message = Some(err.to_string());
                    }
                }
            });

            if let Some(msg) = &self.last_message {
                ui.separator();
                ui.label(msg.as_str());
            }

            ui.separator();
            Frame::dark_canvas(ui.style())
                .inner_margin(egui::Margin::symmetric(12.0, 8.0))
                .show(ui, |ui| {
                    let mono = FontId::monospace(13.0);
                    if let Some(snap) = &latest {
                        let risk_color = if snap.cascade_probability > 0.5 {
                            Color32::RED
                        } else {
                            Color32::LIGHT_GREEN
                        };
                        ui.label(
                            RichText::new(format!("cascade {:.4}", snap.cascade_probability))
                                .font(FontId::monospace(16.0))
                                .color(risk_color),
                        );
                        ui.label(RichText::new(format!("cap {:.2}", snap.total_market_cap)).font(mono.clone()));
                        ui.label(RichText::new(format!("drawdown {:.2}%", snap.drawdown_pct)).font(mono.clone()));
                        for shock in &snap.active_shocks {
                            ui.label(
                                RichText::new(format!(
                                    "{} {:.2} [{}]",
                                    shock.shock_type, shock.severity, shock.ticks_remaining
                                ))
                                .font(mono.clone()),
                            );
                        }
                    } else {
                        ui.label("no ticks yet");
                    }
                });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let snapshots = self.recorder.snapshots();
            let agents = self.engine.get_agents();
            Plot::new("price_plot")
                .legend(Legend::default())
                .height(ui.available_height())
                .show(ui, |plot_ui| {
                    for agent in &agents {
                        let points: Vec<[f64; 2]> = snapshots
                            .iter()
                            .filter_map(|s| s.agent(&agent.id).map(|a| [s.tick_number as f64, a.price]))
                            .collect();
                        plot_ui.line(
                            Line::new(PlotPoints::from(points))
                                .color(sector_color(agent.sector))
                                .name(&agent.name),
                        );
                    }
                });
        });
    }
}

fn main() -> Result<(), eframe::Error> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("agent_exchange=info,info")),
        )
        .try_init();

    let config = EngineConfig::from_env().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "bad environment, using defaults");
        EngineConfig::default()
    });
    let engine = MarketEngine::new(config);
    let recorder = Arc::new(SnapshotRecorder::new(PLOT_WINDOW));
    engine.on_tick(recorder.clone());
    engine.on_tick(Arc::new(CascadeAlert::new(engine.config().cascade_alert_threshold)));

    let selected_agent = engine
        .get_agents()
        .first()
        .map(|a| a.id.clone())
        .unwrap_or_default();

    let app = ExchangeApp {
        engine,
        recorder,
        shock_type: ShockType::Regulation,
        severity: 0.7,
        use_default_severity: false,
        selected_agent,
        trade_amount: 1_000.0,
        last_message: None,
    };

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 700.0])
            .with_title("Agent Exchange"),
        ..Default::default()
    };

    eframe::run_native(
        "Agent Exchange",
        native_options,
        Box::new(|_cc| Box::new(app)),
    )
}

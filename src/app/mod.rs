use std::mem;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Context, mutex::Mutex};
use eframe::glow;

use crate::error::{RenderError, Result};
use crate::graph::{GraphData, load_graph};
use crate::layout::Waker;
use crate::quality::{DeviceProfiler, HostProbe, Preferences};
use crate::render::{GpuScene, GpuState, RenderMode, SharedGpu};

mod a11y;
mod graph;
mod ui;

pub use graph::ConstellationProps;
use graph::{Constellation, RenderSession};

type LoadResult = std::result::Result<GraphData, String>;

pub struct AppConfig {
    pub graph_path: PathBuf,
    pub preferences: Preferences,
    pub props: ConstellationProps,
    pub show_telemetry: bool,
}

pub struct ConstellationApp {
    config: AppConfig,
    state: AppState,
    /// Parked here whenever no graph is on screen.
    session: Option<RenderSession>,
    gpu: Option<SharedGpu>,
    waker: Waker,
    reload_rx: Option<Receiver<LoadResult>>,
}

enum AppState {
    Loading { rx: Receiver<LoadResult> },
    Ready(Box<ViewModel>),
    Error(String),
}

enum Transition {
    Loaded(LoadResult),
    Retry,
}

struct ViewModel {
    graph: Arc<GraphData>,
    constellation: Constellation,
    props: ConstellationProps,
    announcement: String,
    show_telemetry: bool,
}

impl ConstellationApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: AppConfig) -> Result<Self> {
        let gl = cc.gl.as_deref();
        let probe = HostProbe::detect(gl, config.preferences);
        let mut profiler = DeviceProfiler::new()?;
        let profile = profiler.profile(&probe).clone();

        let mut mode = RenderMode::Detecting;
        let scene = mode.detect(config.preferences, gl.is_some(), || {
            gl.map_or(Err(RenderError::NoContext), GpuScene::new)
        });
        let gpu = scene.map(|scene| Arc::new(Mutex::new(GpuState::new(scene))));
        tracing::info!(mode = mode.label(), tier = %profile.tier, "rendering mode selected");

        let ctx = cc.egui_ctx.clone();
        let waker: Waker = Arc::new(move || ctx.request_repaint());

        Ok(Self {
            state: Self::start_load(config.graph_path.clone()),
            session: Some(RenderSession::new(mode, gpu.clone(), profile)),
            config,
            gpu,
            waker,
            reload_rx: None,
        })
    }

    fn spawn_load(graph_path: PathBuf) -> Receiver<LoadResult> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = load_graph(&graph_path).map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(graph_path: PathBuf) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(graph_path),
        }
    }

    fn apply(&mut self, transition: Transition) {
        match transition {
            Transition::Retry => {
                self.state = Self::start_load(self.config.graph_path.clone());
            }
            Transition::Loaded(Ok(graph)) => {
                let graph = Arc::new(graph);
                if let AppState::Ready(model) = &mut self.state {
                    model.set_graph(graph);
                    return;
                }
                match self.session.take() {
                    Some(session) => {
                        let model = ViewModel::new(graph, session, &self.config, Arc::clone(&self.waker));
                        self.state = AppState::Ready(Box::new(model));
                    }
                    None => {
                        tracing::error!("render session missing; cannot show graph");
                        self.state = AppState::Error("Rendering session is unavailable".to_owned());
                    }
                }
            }
            Transition::Loaded(Err(error)) => {
                tracing::error!(%error, "graph load failed");
                if let AppState::Ready(model) = mem::replace(&mut self.state, AppState::Error(error)) {
                    self.session = Some(model.constellation.into_session());
                }
            }
        }
    }
}

impl ViewModel {
    fn new(graph: Arc<GraphData>, session: RenderSession, config: &AppConfig, waker: Waker) -> Self {
        let props = config.props.clone();
        let constellation = Constellation::new(Arc::clone(&graph), session, Some(waker), props.is_3d);
        Self {
            announcement: a11y::announcement(&graph, props.selected_id.as_deref()),
            graph,
            constellation,
            props,
            show_telemetry: config.show_telemetry,
        }
    }

    fn set_graph(&mut self, graph: Arc<GraphData>) {
        if let Some(selected) = self.props.selected_id.as_deref()
            && graph.node(selected).is_none()
        {
            self.props.selected_id = None;
        }
        self.constellation.set_graph(Arc::clone(&graph), self.props.keep_layout);
        self.graph = graph;
    }
}

impl eframe::App for ConstellationApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(result) => transition = Some(Transition::Loaded(result)),
                    Err(TryRecvError::Empty) => {}
                    Err(TryRecvError::Disconnected) => {
                        transition = Some(Transition::Loaded(Err(
                            "Background load worker disconnected".to_owned()
                        )));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading constellation graph...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load constellation graph");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Transition::Retry);
                    }
                });
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &self.config.graph_path, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(self.config.graph_path.clone()));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(result) => transition = Some(Transition::Loaded(result)),
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            transition = Some(Transition::Loaded(Err(
                                "Background load worker disconnected".to_owned()
                            )));
                        }
                    }
                }
            }
        }

        if let Some(transition) = transition {
            self.apply(transition);
        }
    }

    fn on_exit(&mut self, gl: Option<&glow::Context>) {
        if let (Some(gl), Some(gpu)) = (gl, &self.gpu) {
            gpu.lock().destroy(gl);
        }
    }
}

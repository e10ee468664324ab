//! Wavescene - an audio-reactive visual player
//!
//! Plays a WAV file (or a built-in composition), analyzes its spectrum in
//! real time, and drives a 3D scene whose motion, scale, and color follow
//! the music.

use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::EventLoop,
    keyboard::{Key, KeyCode, NamedKey, PhysicalKey},
    window::{Window, WindowId},
};

use wavescene::audio::{AudioSource, AudioSystem};
use wavescene::cli::Args;
use wavescene::frame::{FrameHandle, FrameScheduler};
use wavescene::lifecycle;
use wavescene::pipeline::VisualizerPipeline;
use wavescene::scene::SceneHost;
use wavescene::settings::{StyleKind, VisualizerSettings};

/// Main application state
struct App {
    // Window and rendering
    window: Option<Arc<Window>>,
    scene: Option<SceneHost>,

    // Audio and pipeline
    audio: Option<AudioSystem>,
    pipeline: Option<VisualizerPipeline>,

    // Frame scheduling
    scheduler: FrameScheduler,
    frame_handle: Option<FrameHandle>,
    last_frame: Option<Instant>,

    // Configuration (this app is the settings owner)
    source: AudioSource,
    settings: VisualizerSettings,
}

impl App {
    fn new(source: AudioSource, settings: VisualizerSettings) -> Self {
        Self {
            window: None,
            scene: None,
            audio: None,
            pipeline: None,
            scheduler: FrameScheduler::new(),
            frame_handle: None,
            last_frame: None,
            source,
            settings,
        }
    }

    /// Run one frame: tick the pipeline, then draw
    fn render_frame(&mut self) {
        let Some(handle) = self.frame_handle else {
            return;
        };
        if !self.scheduler.begin_tick(handle) {
            return;
        }
        let (Some(pipeline), Some(scene)) = (self.pipeline.as_mut(), self.scene.as_mut())
        else {
            return;
        };

        let now = Instant::now();
        let dt = self
            .last_frame
            .map(|t| (now - t).as_secs_f32())
            .unwrap_or(1.0 / 60.0);
        self.last_frame = Some(now);

        pipeline.tick(&self.settings, dt);

        if let Err(e) = scene.render(pipeline.node_mut()) {
            tracing::warn!("render error: {}", e);
        }
    }

    fn teardown(&mut self) {
        lifecycle::teardown(
            &mut self.scheduler,
            self.pipeline.as_mut(),
            self.scene.as_mut(),
        );
        self.frame_handle = None;
        // Dropping the audio system stops the output stream
        self.audio = None;
    }

    fn handle_key(&mut self, event: &KeyEvent) -> bool {
        if event.state != ElementState::Pressed {
            return false;
        }

        if event.logical_key == Key::Named(NamedKey::Escape) {
            return true;
        }

        // Number keys switch styles; the pipeline observes the change on
        // the next tick
        if let PhysicalKey::Code(code) = event.physical_key {
            let style = match code {
                KeyCode::Digit1 => Some(StyleKind::Default),
                KeyCode::Digit2 => Some(StyleKind::Circular),
                KeyCode::Digit3 => Some(StyleKind::Wave),
                KeyCode::Digit4 => Some(StyleKind::Blocks),
                KeyCode::Digit5 => Some(StyleKind::Particles),
                KeyCode::Digit6 => Some(StyleKind::ParticleBurst),
                KeyCode::Digit7 => Some(StyleKind::Ripple),
                KeyCode::Digit8 => Some(StyleKind::Grid),
                KeyCode::Digit9 => Some(StyleKind::Pattern),
                _ => None,
            };
            if let Some(style) = style {
                tracing::info!("switching style to {}", style);
                self.settings.style = style;
                return false;
            }

            match code {
                KeyCode::ArrowUp => {
                    self.settings.intensity = (self.settings.intensity + 0.05).min(1.0);
                }
                KeyCode::ArrowDown => {
                    self.settings.intensity = (self.settings.intensity - 0.05).max(0.0);
                }
                KeyCode::ArrowRight => {
                    self.settings.speed = (self.settings.speed + 0.05).min(1.0);
                }
                KeyCode::ArrowLeft => {
                    self.settings.speed = (self.settings.speed - 0.05).max(0.0);
                }
                KeyCode::KeyG => {
                    self.settings.glitch_amount =
                        if self.settings.glitch_amount > 0.0 { 0.0 } else { 0.5 };
                }
                _ => {}
            }
        }
        false
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, _event_loop: &winit::event_loop::ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &winit::event_loop::ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        let window_attributes = Window::default_attributes()
            .with_title("Wavescene - Audio-Reactive Visuals")
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.settings.size_x.max(320.0),
                self.settings.size_y.max(240.0),
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                tracing::error!("failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let scene = match SceneHost::create(Some(Arc::clone(&window))) {
            Ok(Some(scene)) => scene,
            Ok(None) => return, // not ready yet, retried on next resume
            Err(e) => {
                tracing::error!("failed to set up rendering: {}", e);
                event_loop.exit();
                return;
            }
        };

        let audio = match AudioSystem::new(self.source.clone()) {
            Ok(audio) => audio,
            Err(e) => {
                tracing::error!("failed to start audio: {}", e);
                event_loop.exit();
                return;
            }
        };

        // The analyzer only exists once audio does
        let pipeline = match VisualizerPipeline::new(&audio, &self.settings) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                tracing::error!("failed to build pipeline: {}", e);
                event_loop.exit();
                return;
            }
        };

        let mut scene = scene;
        scene.attach();

        tracing::info!("wavescene running, ESC to quit, keys 1-9 switch styles");

        self.window = Some(window);
        self.scene = Some(scene);
        self.audio = Some(audio);
        self.pipeline = Some(pipeline);
        self.frame_handle = self.scheduler.start();
    }

    fn window_event(
        &mut self,
        event_loop: &winit::event_loop::ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                self.teardown();
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if self.handle_key(&event) {
                    self.teardown();
                    event_loop.exit();
                }
            }
            WindowEvent::Resized(size) => {
                if let Some(scene) = &mut self.scene {
                    scene.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                self.render_frame();
            }
            _ => {}
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if args.list_styles {
        for style in StyleKind::ALL {
            println!("{}", style);
        }
        return;
    }

    let settings = match args.build_settings() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("invalid settings: {}", e);
            std::process::exit(1);
        }
    };

    let mut app = App::new(args.audio_source(), settings);
    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            tracing::error!("failed to create event loop: {}", e);
            std::process::exit(1);
        }
    };
    let _ = event_loop.run_app(&mut app);
}

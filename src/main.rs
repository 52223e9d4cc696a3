use anyhow::{anyhow, Context, Result};
use glutin::{
    config::ConfigTemplateBuilder,
    context::{ContextApi, ContextAttributesBuilder, GlProfile, PossiblyCurrentContext, Version},
    display::{GetGlDisplay, GlDisplay},
    prelude::*,
    surface::{Surface, SwapInterval, WindowSurface},
};
use glutin_winit::{DisplayBuilder, GlWindow};
use log::{error, info, warn};
use raw_window_handle::HasRawWindowHandle;
use simple_logger::SimpleLogger;
use std::{num::NonZeroU32, path::PathBuf, rc::Rc, sync::Arc};
use winit::{
    dpi::{LogicalSize, PhysicalSize},
    event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::EventLoop,
    window::{Window, WindowBuilder},
};

use obdrop::{
    config::AppConfig,
    engine::Engine,
    render::GlRenderer,
    ui::{command_for_key, DebugPanel},
    utils::audio::HitSound,
    GltfSource,
};

/// Pixels of touchpad scroll that count as one wheel notch.
const PIXELS_PER_LINE: f32 = 50.0;

struct App {
    window: Window,
    gl_context: PossiblyCurrentContext,
    gl_surface: Surface<WindowSurface>,
    engine: Engine<GlRenderer>,
    egui_ctx: egui::Context,
    egui_winit: egui_winit::State,
    painter: egui_glow::Painter,
    panel: DebugPanel,
}

fn load_config() -> Result<(AppConfig, Option<PathBuf>)> {
    if let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) {
        let config = AppConfig::load(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?;
        return Ok((config, Some(path)));
    }
    match AppConfig::default_path() {
        Ok(path) => {
            let config = AppConfig::load_or_create(&path)
                .with_context(|| format!("Failed to load config {}", path.display()))?;
            Ok((config, Some(path)))
        }
        Err(_) => Ok((AppConfig::default(), None)),
    }
}

impl App {
    fn new(config: &AppConfig) -> Result<(Self, EventLoop<()>)> {
        let rendering = &config.rendering;
        let event_loop = EventLoop::new()?;
        let window_builder = WindowBuilder::new()
            .with_title("obdrop")
            .with_inner_size(LogicalSize::new(rendering.width, rendering.height));

        let template = ConfigTemplateBuilder::new()
            .with_alpha_size(8)
            .with_depth_size(24);

        let display_builder = DisplayBuilder::new().with_window_builder(Some(window_builder));
        let (window, gl_config) = display_builder
            .build(&event_loop, template, |configs| {
                configs
                    .reduce(|accum, config| {
                        if config.num_samples() > accum.num_samples() {
                            config
                        } else {
                            accum
                        }
                    })
                    .expect("display offered no GL configs")
            })
            .map_err(|e| anyhow!("Failed to create window: {}", e))?;
        let window = window.context("Display builder returned no window")?;
        let raw_window_handle = window.raw_window_handle();

        let context_attributes = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
            .with_profile(GlProfile::Core)
            .build(Some(raw_window_handle));

        let gl_display = gl_config.display();
        let not_current = unsafe {
            gl_display
                .create_context(&gl_config, &context_attributes)
                .context("Failed to create OpenGL context")?
        };

        let attrs = window.build_surface_attributes(<_>::default());
        let gl_surface = unsafe {
            gl_display
                .create_window_surface(&gl_config, &attrs)
                .context("Failed to create GL surface")?
        };
        let gl_context = not_current
            .make_current(&gl_surface)
            .context("Failed to make context current")?;

        if rendering.vsync {
            if let Err(e) =
                gl_surface.set_swap_interval(&gl_context, SwapInterval::Wait(NonZeroU32::MIN))
            {
                warn!("Couldn't enable vsync: {}", e);
            }
        }

        let gl = Arc::new(unsafe {
            glow::Context::from_loader_function_cstr(|s| gl_display.get_proc_address(s) as *const _)
        });

        let egui_ctx = egui::Context::default();
        let egui_winit = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &event_loop,
            Some(window.scale_factor() as f32),
            None,
        );
        let painter = egui_glow::Painter::new(Arc::clone(&gl), "", None)
            .map_err(|e| anyhow!("Failed to create egui painter: {}", e))?;

        let size = window.inner_size();
        let scale = window.scale_factor();
        let viewport = obdrop::Viewport::new(size.width, size.height, 1.0);
        let mut renderer = GlRenderer::new(gl, viewport)?;
        renderer.set_surface_size(size.width, size.height);

        let hit_sound = Rc::new(HitSound::from_config(&config.audio));
        let mut engine = Engine::new(config, renderer, Arc::new(GltfSource), hit_sound)?;
        let logical: LogicalSize<u32> = size.to_logical(scale);
        engine.resize(logical.width, logical.height, scale);

        Ok((
            Self {
                window,
                gl_context,
                gl_surface,
                engine,
                egui_ctx,
                egui_winit,
                painter,
                panel: DebugPanel::new(),
            },
            event_loop,
        ))
    }

    /// Returns `true` when the window should close.
    fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::CloseRequested => return true,
            WindowEvent::Resized(size) => {
                self.resize(*size);
                return false;
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
                return false;
            }
            _ => {}
        }

        let response = self.egui_winit.on_window_event(&self.window, event);
        if response.repaint {
            self.window.request_redraw();
        }
        if response.consumed {
            return false;
        }

        if let WindowEvent::KeyboardInput { event, .. } = event {
            if event.state == ElementState::Pressed && !event.repeat {
                if let Some(command) = command_for_key(&event.logical_key) {
                    self.engine.handle(command);
                }
            }
            return false;
        }

        let viewport_height = self.window.inner_size().height;
        let controls = &mut self.engine.context_mut().controls;
        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed => controls.pointer_down(),
                ElementState::Released => controls.pointer_up(),
            },
            WindowEvent::CursorMoved { position, .. } => {
                controls.pointer_moved(position.x, position.y, viewport_height);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_LINE,
                };
                controls.zoom(steps);
            }
            _ => {}
        }
        false
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        let (Some(width), Some(height)) =
            (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
        else {
            return;
        };
        self.gl_surface.resize(&self.gl_context, width, height);
        self.engine
            .renderer_mut()
            .set_surface_size(size.width, size.height);

        let scale = self.window.scale_factor();
        let logical: LogicalSize<u32> = size.to_logical(scale);
        self.engine.resize(logical.width, logical.height, scale);
    }

    fn redraw(&mut self) {
        if let Err(e) = self.engine.frame() {
            error!("Frame failed: {}", e);
        }

        let state = self.engine.debug_state();
        let raw_input = self.egui_winit.take_egui_input(&self.window);
        let mut commands = Vec::new();
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            commands = self.panel.draw(ctx, &state);
        });
        self.egui_winit
            .handle_platform_output(&self.window, full_output.platform_output);

        let primitives = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        let size = self.window.inner_size();
        self.painter.paint_and_update_textures(
            [size.width, size.height],
            full_output.pixels_per_point,
            &primitives,
            &full_output.textures_delta,
        );

        for command in commands {
            self.engine.handle(command);
        }

        if let Err(e) = self.gl_surface.swap_buffers(&self.gl_context) {
            error!("Failed to swap buffers: {}", e);
        }
    }

    fn cleanup(&mut self) {
        info!("Shutting down");
        self.painter.destroy();
        self.engine.renderer_mut().destroy();
    }
}

fn main() -> Result<()> {
    let (config, path) = load_config()?;
    SimpleLogger::new()
        .with_level(config.log_level.into())
        .init()?;
    match path {
        Some(path) => info!("Using config {}", path.display()),
        None => warn!("No config directory available, using defaults"),
    }

    let (mut app, event_loop) = App::new(&config)?;

    event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { event, .. } => {
            if app.handle_window_event(&event) {
                app.cleanup();
                elwt.exit();
            }
        }
        Event::AboutToWait => app.window.request_redraw(),
        _ => (),
    })?;

    Ok(())
}

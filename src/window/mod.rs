//! Window management module for pp
//!
//! Runs the winit event loop on the main thread. Key presses become player
//! commands, and the controller's tick result decides when the loop wakes
//! up again and whether the frame needs to be drawn.

mod keymap;

pub use keymap::{command_for_key, controls_help};

use crate::player::PlayerController;
use crate::renderer::WgpuRenderer;
use crate::utils::error::{IntoPlayerError, PlayerError, Result};
use crate::utils::WindowConfig;
use log::{debug, error, info};
use std::sync::Arc;
use std::time::Instant;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

/// The windowed application
pub struct App {
    controller: PlayerController,
    config: WindowConfig,
    window: Option<Arc<Window>>,
    renderer: Option<WgpuRenderer>,
    title: String,
    error: Option<PlayerError>,
}

impl App {
    pub fn new(controller: PlayerController, config: WindowConfig) -> Self {
        Self {
            controller,
            config,
            window: None,
            renderer: None,
            title: String::new(),
            error: None,
        }
    }

    /// Run until the user quits or the window closes
    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new().window_err("Failed to create event loop")?;
        event_loop.set_control_flow(ControlFlow::Wait);
        event_loop.run_app(&mut self).window_err("Event loop failed")?;

        self.controller.shutdown();
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn exit(&mut self, event_loop: &ActiveEventLoop) {
        self.controller.shutdown();
        event_loop.exit();
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: PlayerError) {
        error!("{}", err);
        self.error = Some(err);
        self.exit(event_loop);
    }

    fn request_redraw(&self) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn update_title(&mut self) {
        let title = self.controller.window_title();
        if title != self.title {
            if let Some(window) = &self.window {
                window.set_title(&title);
            }
            self.title = title;
        }
    }

    fn redraw(&mut self) -> Result<()> {
        if let Some(renderer) = self.renderer.as_mut() {
            if let Some(frame) = self.controller.compose_frame(Instant::now()) {
                renderer.upload(&frame)?;
            }
            renderer.present()?;
        }
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = Window::default_attributes()
            .with_title(self.controller.window_title())
            .with_inner_size(LogicalSize::new(self.config.width, self.config.height));

        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.fail(event_loop, PlayerError::Window(format!("Failed to create window: {}", e)));
                return;
            }
        };

        match WgpuRenderer::new(window.clone()) {
            Ok(renderer) => self.renderer = Some(renderer),
            Err(e) => {
                self.fail(event_loop, e);
                return;
            }
        }

        info!("Window created ({}x{})", self.config.width, self.config.height);
        self.window = Some(window);
        self.update_title();
        self.request_redraw();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                debug!("Window close requested");
                self.exit(event_loop);
            }

            WindowEvent::Resized(size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(size.width, size.height);
                }
                self.request_redraw();
            }

            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                let Some(command) = command_for_key(&event.logical_key) else {
                    return;
                };

                if let Err(e) = self.controller.handle(command, Instant::now()) {
                    error!("{:?} failed: {}", command, e);
                }

                if self.controller.is_quit_requested() {
                    self.exit(event_loop);
                    return;
                }

                self.update_title();
                self.request_redraw();
            }

            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    self.fail(event_loop, e);
                }
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        match self.controller.tick(Instant::now()) {
            Ok(outcome) => {
                if outcome.redraw {
                    self.request_redraw();
                }
                self.update_title();
                event_loop.set_control_flow(match outcome.wake_at {
                    Some(at) => ControlFlow::WaitUntil(at),
                    None => ControlFlow::Wait,
                });
            }
            Err(e) => self.fail(event_loop, e),
        }
    }
}

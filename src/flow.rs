//! Application event loop.
//!
//! Wires the window, the renderer, the placement controller and the AR
//! runtime together:
//!
//! 1. `resumed` creates the window, the GPU context and fetches the model
//! 2. UI input is mapped to [`UiCommand`]s (start AR, select the item, end AR)
//! 3. Starting AR negotiates a session and an [`ActiveSession`] asynchronously
//! 4. Every redraw hands the current AR frame to [`ActiveSession::on_frame`]
//!
//! Async work runs on a tokio runtime with `block_on` natively and with
//! `spawn_local` in the browser, where results come back as [`AppEvent`]s
//! through the event loop proxy.

use std::sync::Arc;

use instant::Instant;
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use crate::{
    config::ArConfig,
    context::Context,
    placement::{ActiveSession, FrameOutcome, PlacementController},
    render::WgpuRenderer,
    resources::load_model_gltf,
    xr::{
        SessionMode, XrError, XrSystem,
        emulated::{EmulatedSession, EmulatedXr},
    },
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// What the two on-screen controls (and the exit key) ask for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiCommand {
    /// The "Start AR" control
    StartSession,
    /// The item control, selects the model for placement
    SelectItem,
    EndSession,
}

/// Page elements that drive the app in the browser.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageControl {
    /// Button appended to the page body
    StartButton,
    /// Pre-existing element the page provides for the item
    ItemButtons,
}

impl PageControl {
    pub const ALL: [PageControl; 2] = [PageControl::StartButton, PageControl::ItemButtons];

    pub const START_BUTTON_ID: &'static str = "start-ar";
    pub const START_BUTTON_LABEL: &'static str = "Start AR";

    pub fn selector(self) -> &'static str {
        match self {
            PageControl::StartButton => "#start-ar",
            PageControl::ItemButtons => "#item-buttons",
        }
    }

    /// What a click on this control asks for.
    pub fn command(self) -> UiCommand {
        match self {
            PageControl::StartButton => UiCommand::StartSession,
            PageControl::ItemButtons => UiCommand::SelectItem,
        }
    }
}

/// Appends the start button and forwards clicks on every [`PageControl`]
/// to the event loop as [`AppEvent::Command`]s.
#[cfg(target_arch = "wasm32")]
fn attach_page_controls(proxy: &EventLoopProxy<AppEvent>) -> Result<(), JsValue> {
    use wasm_bindgen::JsCast;

    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let body = document
        .body()
        .ok_or_else(|| JsValue::from_str("no document body"))?;

    let button = document.create_element("button")?;
    button.set_id(PageControl::START_BUTTON_ID);
    button.set_text_content(Some(PageControl::START_BUTTON_LABEL));
    body.append_child(&button)?;

    for control in PageControl::ALL {
        let Some(element) = document.query_selector(control.selector())? else {
            log::warn!("Page has no {} element", control.selector());
            continue;
        };
        let proxy = proxy.clone();
        let command = control.command();
        let on_click = Closure::<dyn FnMut()>::new(move || {
            if proxy.send_event(AppEvent::Command(command)).is_err() {
                log::error!("Event loop is closed, dropping {:?}", command);
            }
        });
        element.add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())?;
        // The listeners live as long as the page
        on_click.forget();
    }
    Ok(())
}

/// Keyboard shortcuts of the UI controls.
pub fn map_key(key: KeyCode) -> Option<UiCommand> {
    match key {
        KeyCode::Enter | KeyCode::NumpadEnter => Some(UiCommand::StartSession),
        KeyCode::Digit1 | KeyCode::Numpad1 => Some(UiCommand::SelectItem),
        KeyCode::Escape => Some(UiCommand::EndSession),
        _ => None,
    }
}

type Session = ActiveSession<EmulatedSession>;

pub(crate) struct AppState {
    renderer: WgpuRenderer,
    controller: PlacementController,
}

impl AppState {
    async fn new(window: Arc<Window>, config: ArConfig) -> anyhow::Result<Self> {
        let size = window.inner_size();
        let ctx = Context::new(window).await?;
        let renderer = WgpuRenderer::new(ctx);
        let model = load_model_gltf(&config.model_url).await?;
        let controller = PlacementController::from_model(&config, model, size.width, size.height)?;
        Ok(Self {
            renderer,
            controller,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.renderer.resize(width, height);
        self.controller.camera_mut().resize(width, height);
    }

    fn window(&self) -> &Arc<Window> {
        self.renderer.context().window()
    }
}

pub(crate) enum AppEvent {
    #[allow(dead_code)]
    Ready(Box<AppState>),
    #[allow(dead_code)]
    LoadFailed(anyhow::Error),
    #[allow(dead_code)]
    SessionStarted(Box<Session>),
    #[allow(dead_code)]
    SessionFailed(XrError),
    /// A click on one of the page controls
    #[allow(dead_code)]
    Command(UiCommand),
}

pub(crate) struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    #[allow(dead_code)]
    proxy: EventLoopProxy<AppEvent>,
    config: ArConfig,
    xr: EmulatedXr,
    state: Option<AppState>,
    session: Option<Session>,
    session_pending: bool,
    looking: bool,
    error: Option<anyhow::Error>,
    started: Instant,
    last_time: Instant,
}

impl App {
    fn new(event_loop: &EventLoop<AppEvent>, config: ArConfig) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        let xr = EmulatedXr::new(config.emulation.clone());
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            config,
            xr,
            state: None,
            session: None,
            session_pending: false,
            looking: false,
            error: None,
            started: Instant::now(),
            last_time: Instant::now(),
        })
    }

    fn install(&mut self, mut state: AppState) {
        let size = state.window().inner_size();
        state.resize(size.width, size.height);
        state.window().request_redraw();
        log::info!("Ready. Start AR (Enter), then select the item (1 or left click)");
        self.state = Some(state);
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("Could not initialize the app: {:#}", error);
        self.error = Some(error);
        event_loop.exit();
    }

    fn handle_command(&mut self, command: UiCommand) {
        match command {
            UiCommand::StartSession => self.start_session(),
            UiCommand::SelectItem => {
                if let Some(state) = &mut self.state {
                    let item = state.controller.item();
                    state.controller.select(item);
                }
            }
            UiCommand::EndSession => {
                if let Some(session) = self.session.take() {
                    session.end();
                    log::info!("AR session ended");
                }
            }
        }
    }

    fn start_session(&mut self) {
        if self.session.is_some() || self.session_pending {
            log::warn!("An AR session is already running");
            return;
        }
        self.session_pending = true;
        let xr = self.xr.clone();
        let init = self.config.session.to_session_init();
        let reference_space = self.config.session.reference_space;
        let start = async move {
            if !xr.is_session_supported(SessionMode::ImmersiveAr).await {
                return Err(XrError::UnsupportedMode(SessionMode::ImmersiveAr));
            }
            let session = xr.request_session(SessionMode::ImmersiveAr, &init).await?;
            ActiveSession::start(session, reference_space).await
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            let result = self.async_runtime.block_on(start);
            self.on_session_result(result);
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let event = match start.await {
                    Ok(session) => AppEvent::SessionStarted(Box::new(session)),
                    Err(e) => AppEvent::SessionFailed(e),
                };
                if proxy.send_event(event).is_err() {
                    log::error!("Event loop was closed before the AR session was ready");
                }
            });
        }
    }

    fn on_session_result(&mut self, result: Result<Session, XrError>) {
        self.session_pending = false;
        match result {
            Ok(session) => self.session = Some(session),
            Err(e) => log::error!("Could not start the AR session: {}", e),
        }
    }

    fn redraw(&mut self) {
        let dt = self.last_time.elapsed();
        self.last_time = Instant::now();
        let timestamp = self.started.elapsed().as_secs_f64() * 1000.0;

        let Some(state) = &mut self.state else {
            return;
        };
        state.window().request_redraw();

        let result = match &mut self.session {
            Some(session) => {
                session.session_mut().viewer_mut().update(dt);
                let frame = if state.renderer.context().is_surface_configured() {
                    session.session().frame()
                } else {
                    None
                };
                session
                    .on_frame(
                        &mut state.controller,
                        timestamp,
                        frame.as_ref(),
                        &mut state.renderer,
                    )
                    .map(|outcome| {
                        if outcome == FrameOutcome::Hidden {
                            log::trace!("No surface under the viewer");
                        }
                    })
            }
            // Keep presenting the (empty) scene until a session starts
            None => state
                .renderer
                .draw(state.controller.scene(), state.controller.camera())
                .map_err(anyhow::Error::from),
        };

        if let Err(e) = result {
            match e.downcast_ref::<wgpu::SurfaceError>() {
                // Reconfigure the surface if it's lost or outdated
                Some(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    let size = state.window().inner_size();
                    state.resize(size.width, size.height);
                }
                _ => log::error!("Unable to render {}", e),
            }
        }
    }
}

impl ApplicationHandler<AppEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("flow-ar");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));

            if let Err(e) = attach_page_controls(&self.proxy) {
                log::error!("Could not attach the page controls: {:?}", e);
            }
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };

        let init_future = AppState::new(window, self.config.clone());

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok(state) => self.install(state),
                Err(e) => self.fail(event_loop, e),
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let event = match init_future.await {
                    Ok(state) => AppEvent::Ready(Box::new(state)),
                    Err(e) => AppEvent::LoadFailed(e),
                };
                if proxy.send_event(event).is_err() {
                    log::error!("Event loop was closed before the app was initialized");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: AppEvent) {
        match event {
            // These are the messages from our wasm `spawn_local`s
            AppEvent::Ready(state) => self.install(*state),
            AppEvent::LoadFailed(e) => self.fail(event_loop, e),
            AppEvent::SessionStarted(session) => self.on_session_result(Ok(*session)),
            AppEvent::SessionFailed(e) => self.on_session_result(Err(e)),
            AppEvent::Command(command) => self.handle_command(command),
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            if let (true, Some(session)) = (self.looking, &mut self.session) {
                session.session_mut().viewer_mut().rotate(dx, dy);
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        if self.state.is_none() {
            if let WindowEvent::CloseRequested = event {
                event_loop.exit();
            }
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                self.handle_command(UiCommand::EndSession);
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(state) = &mut self.state {
                    state.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: key_state,
                        repeat,
                        ..
                    },
                ..
            } => match map_key(code) {
                Some(command) => {
                    if key_state == ElementState::Pressed && !repeat {
                        self.handle_command(command);
                    }
                }
                None => {
                    if let Some(session) = &mut self.session {
                        session
                            .session_mut()
                            .viewer_mut()
                            .process_key(code, key_state.is_pressed());
                    }
                }
            },
            WindowEvent::MouseInput {
                state: button_state,
                button,
                ..
            } => match (button, button_state.is_pressed()) {
                (MouseButton::Left, true) => self.handle_command(UiCommand::SelectItem),
                (MouseButton::Right, pressed) => self.looking = pressed,
                _ => (),
            },
            _ => {}
        }
    }
}

/// Opens the window and runs the app until it is closed.
pub fn run(config: ArConfig) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }

    let event_loop: EventLoop<AppEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, config)?;

    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ui_keys_map_to_commands() {
        assert_eq!(map_key(KeyCode::Enter), Some(UiCommand::StartSession));
        assert_eq!(map_key(KeyCode::Digit1), Some(UiCommand::SelectItem));
        assert_eq!(map_key(KeyCode::Escape), Some(UiCommand::EndSession));
        assert_eq!(map_key(KeyCode::KeyW), None);
    }

    #[test]
    fn page_controls_start_and_select() {
        assert_eq!(PageControl::StartButton.command(), UiCommand::StartSession);
        assert_eq!(PageControl::ItemButtons.command(), UiCommand::SelectItem);
        assert_eq!(PageControl::ItemButtons.selector(), "#item-buttons");
        assert_eq!(
            PageControl::StartButton.selector(),
            format!("#{}", PageControl::START_BUTTON_ID)
        );
    }
}

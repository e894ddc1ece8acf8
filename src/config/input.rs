use std::collections::HashSet;

use winit::event::{ElementState, MouseScrollDelta, VirtualKeyCode, WindowEvent};

use crate::frame::gbuffer::DisplayMode;
use crate::scene_pkg::camera::{Camera, CameraMovement};
use crate::scene_pkg::scene::Scene;

/// Pixels a single scroll-wheel line counts for.
const PIXELS_PER_LINE: f32 = 20.0;

const MOVEMENT_KEYS: [(VirtualKeyCode, CameraMovement); 6] = [
    (VirtualKeyCode::W, CameraMovement::Forward),
    (VirtualKeyCode::S, CameraMovement::Backward),
    (VirtualKeyCode::A, CameraMovement::Left),
    (VirtualKeyCode::D, CameraMovement::Right),
    (VirtualKeyCode::LShift, CameraMovement::Up),
    (VirtualKeyCode::LControl, CameraMovement::Down),
];

/// Keyboard state between two frames.
#[derive(Debug, Default)]
pub struct Input {
    pub key_pressed: HashSet<VirtualKeyCode>,
    pub key_held: HashSet<VirtualKeyCode>,
    pub key_released: HashSet<VirtualKeyCode>,
}

impl Input {
    pub fn new() -> Input {
        Input::default()
    }

    /// Returns true when the key went down with this event.
    pub fn handle_keyboard_input(&mut self, key: VirtualKeyCode, state: ElementState) -> bool {
        match state {
            ElementState::Pressed => {
                let fresh = !self.key_held.contains(&key);
                if fresh {
                    self.key_pressed.insert(key);
                }
                self.key_held.insert(key);
                fresh
            }
            ElementState::Released => {
                self.key_released.insert(key);
                self.key_held.remove(&key);
                false
            }
        }
    }

    /// Forgets edge state; held keys stay held.
    pub fn end_frame(&mut self) {
        self.key_pressed.clear();
        self.key_released.clear();
    }

    pub fn key_pressed(&self, key: VirtualKeyCode) -> bool {
        self.key_pressed.contains(&key)
    }

    pub fn key_held(&self, key: VirtualKeyCode) -> bool {
        self.key_held.contains(&key)
    }

    pub fn key_released(&self, key: VirtualKeyCode) -> bool {
        self.key_released.contains(&key)
    }
}

/// Something the driver has to act on after an input event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputAction {
    Close,
    /// Cursor grab must follow the new lock state.
    CursorLock(bool),
    ToggleProjection,
    ToggleFog,
    SetDisplayMode(DisplayMode),
    NextCamera,
    TogglePipeline,
}

impl InputAction {
    /// Applies the actions that only touch scene parameters. Returns false
    /// for the ones the driver handles itself.
    pub fn apply_to_scene(self, scene: &mut Scene) -> bool {
        match self {
            InputAction::ToggleProjection => {
                if let Some(camera) = scene.active_camera_mut() {
                    camera.projection = camera.projection.toggled();
                    log::info!("projection: {:?}", camera.projection);
                }
                true
            }
            InputAction::ToggleFog => {
                scene.fog.enabled = !scene.fog.enabled;
                log::info!("fog enabled: {}", scene.fog.enabled);
                true
            }
            InputAction::SetDisplayMode(mode) => {
                scene.set_display_mode(mode);
                log::info!("display mode: {:?}", mode);
                true
            }
            InputAction::NextCamera => {
                if let Some(current) = scene.active_camera_index() {
                    let next = (current + 1) % scene.cameras().len();
                    scene.set_active_camera(next);
                    log::info!("active camera: {}", next);
                }
                true
            }
            InputAction::Close | InputAction::CursorLock(_) | InputAction::TogglePipeline => false,
        }
    }
}

/// Turns window events into camera motion and debug toggles.
#[derive(Debug)]
pub struct InputHandler {
    pub input: Input,
    first_mouse: bool,
    last_x: f64,
    last_y: f64,
    cursor_locked: bool,
    last_tab_state: bool,
    look_delta: (f32, f32),
    scroll_delta: f32,
}

impl Default for InputHandler {
    fn default() -> Self {
        InputHandler::new()
    }
}

impl InputHandler {
    pub fn new() -> InputHandler {
        InputHandler {
            input: Input::new(),
            first_mouse: true,
            last_x: 0.0,
            last_y: 0.0,
            cursor_locked: false,
            last_tab_state: false,
            look_delta: (0.0, 0.0),
            scroll_delta: 0.0,
        }
    }

    pub fn cursor_locked(&self) -> bool {
        self.cursor_locked
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent) -> Option<InputAction> {
        match event {
            WindowEvent::KeyboardInput { input, .. } => {
                let key = input.virtual_keycode?;
                self.handle_key(key, input.state)
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.handle_cursor_moved(position.x, position.y);
                None
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(position) => position.y as f32 / PIXELS_PER_LINE,
                };
                self.handle_scroll(lines);
                None
            }
            WindowEvent::Focused(false) if self.cursor_locked => {
                self.cursor_locked = false;
                Some(InputAction::CursorLock(false))
            }
            _ => None,
        }
    }

    pub fn handle_key(&mut self, key: VirtualKeyCode, state: ElementState) -> Option<InputAction> {
        let fresh = self.input.handle_keyboard_input(key, state);

        if key == VirtualKeyCode::Tab {
            let pressed = state == ElementState::Pressed;
            let rising = pressed && !self.last_tab_state;
            self.last_tab_state = pressed;
            if rising {
                self.cursor_locked = !self.cursor_locked;
                self.first_mouse = true;
                return Some(InputAction::CursorLock(self.cursor_locked));
            }
            return None;
        }

        if !fresh {
            return None;
        }
        match key {
            VirtualKeyCode::Escape => Some(InputAction::Close),
            VirtualKeyCode::P => Some(InputAction::ToggleProjection),
            VirtualKeyCode::F => Some(InputAction::ToggleFog),
            VirtualKeyCode::C => Some(InputAction::NextCamera),
            VirtualKeyCode::G => Some(InputAction::TogglePipeline),
            _ => display_mode_key(key).map(InputAction::SetDisplayMode),
        }
    }

    /// Absolute cursor position in window pixels.
    pub fn handle_cursor_moved(&mut self, x: f64, y: f64) {
        if self.first_mouse {
            self.last_x = x;
            self.last_y = y;
            self.first_mouse = false;
        }
        let x_offset = (x - self.last_x) as f32;
        // window y grows downwards
        let y_offset = (self.last_y - y) as f32;
        self.last_x = x;
        self.last_y = y;

        if self.cursor_locked {
            self.look_delta.0 += x_offset;
            self.look_delta.1 += y_offset;
        }
    }

    pub fn handle_scroll(&mut self, y_offset: f32) {
        self.scroll_delta += y_offset;
    }

    /// Applies held movement keys and the look/zoom accumulated since the
    /// last frame, then starts a new frame.
    pub fn update_camera(&mut self, camera: &mut Camera, delta_time: f32) {
        for (key, movement) in MOVEMENT_KEYS {
            if self.input.key_held(key) {
                camera.apply_movement(movement, delta_time);
            }
        }
        let (x_offset, y_offset) = self.look_delta;
        if x_offset != 0.0 || y_offset != 0.0 {
            camera.apply_look_delta(x_offset, y_offset, true);
        }
        if self.scroll_delta != 0.0 {
            camera.apply_zoom_delta(self.scroll_delta);
        }
        self.end_frame();
    }

    pub fn end_frame(&mut self) {
        self.look_delta = (0.0, 0.0);
        self.scroll_delta = 0.0;
        self.input.end_frame();
    }
}

fn display_mode_key(key: VirtualKeyCode) -> Option<DisplayMode> {
    let mode = match key {
        VirtualKeyCode::Key0 | VirtualKeyCode::Numpad0 => DisplayMode::Combined,
        VirtualKeyCode::Key1 | VirtualKeyCode::Numpad1 => DisplayMode::Position,
        VirtualKeyCode::Key2 | VirtualKeyCode::Numpad2 => DisplayMode::Normal,
        VirtualKeyCode::Key3 | VirtualKeyCode::Numpad3 => DisplayMode::Albedo,
        VirtualKeyCode::Key4 | VirtualKeyCode::Numpad4 => DisplayMode::Specular,
        _ => return None,
    };
    Some(mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cgmath::Point3;

    fn press(handler: &mut InputHandler, key: VirtualKeyCode) -> Option<InputAction> {
        handler.handle_key(key, ElementState::Pressed)
    }

    fn release(handler: &mut InputHandler, key: VirtualKeyCode) -> Option<InputAction> {
        handler.handle_key(key, ElementState::Released)
    }

    #[test]
    fn held_w_moves_forward_each_frame() {
        let mut handler = InputHandler::new();
        let mut camera = Camera::new(Point3::new(0.0, 0.0, 6.0));
        press(&mut handler, VirtualKeyCode::W);
        handler.update_camera(&mut camera, 1.0);
        handler.update_camera(&mut camera, 1.0);
        assert_relative_eq!(camera.position.z, 1.0, epsilon = 1e-5);

        release(&mut handler, VirtualKeyCode::W);
        handler.update_camera(&mut camera, 1.0);
        assert_relative_eq!(camera.position.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn look_needs_locked_cursor() {
        let mut handler = InputHandler::new();
        let mut camera = Camera::default();
        handler.handle_cursor_moved(100.0, 100.0);
        handler.handle_cursor_moved(150.0, 100.0);
        handler.update_camera(&mut camera, 0.016);
        assert_relative_eq!(camera.yaw(), -90.0);

        assert_eq!(press(&mut handler, VirtualKeyCode::Tab), Some(InputAction::CursorLock(true)));
        // first position after locking only primes the tracker
        handler.handle_cursor_moved(400.0, 300.0);
        handler.handle_cursor_moved(410.0, 280.0);
        handler.update_camera(&mut camera, 0.016);
        assert_relative_eq!(camera.yaw(), -89.0, epsilon = 1e-4);
        // moving the cursor up looks up
        assert_relative_eq!(camera.pitch(), 2.0, epsilon = 1e-4);
    }

    #[test]
    fn tab_toggles_on_rising_edge_only() {
        let mut handler = InputHandler::new();
        assert_eq!(press(&mut handler, VirtualKeyCode::Tab), Some(InputAction::CursorLock(true)));
        // key repeat
        assert_eq!(press(&mut handler, VirtualKeyCode::Tab), None);
        assert_eq!(release(&mut handler, VirtualKeyCode::Tab), None);
        assert!(handler.cursor_locked());
        assert_eq!(press(&mut handler, VirtualKeyCode::Tab), Some(InputAction::CursorLock(false)));
        assert!(!handler.cursor_locked());
    }

    #[test]
    fn scroll_zooms() {
        let mut handler = InputHandler::new();
        let mut camera = Camera::default();
        handler.handle_scroll(5.0);
        handler.update_camera(&mut camera, 0.016);
        assert_relative_eq!(camera.zoom, 40.0);
    }

    #[test]
    fn debug_keys_map_to_actions() {
        let mut handler = InputHandler::new();
        assert_eq!(press(&mut handler, VirtualKeyCode::Escape), Some(InputAction::Close));
        assert_eq!(press(&mut handler, VirtualKeyCode::G), Some(InputAction::TogglePipeline));
        assert_eq!(
            press(&mut handler, VirtualKeyCode::Key2),
            Some(InputAction::SetDisplayMode(DisplayMode::Normal))
        );
        // repeat of a held key does not fire again
        assert_eq!(press(&mut handler, VirtualKeyCode::G), None);
        assert_eq!(press(&mut handler, VirtualKeyCode::Q), None);
    }

    #[test]
    fn scene_toggles_mutate_scene() {
        let mut scene = Scene::new();
        scene.add_camera(Camera::default());
        scene.add_camera(Camera::new(Point3::new(3.0, 0.0, 0.0)));

        assert!(InputAction::ToggleFog.apply_to_scene(&mut scene));
        assert!(scene.fog.enabled);
        assert!(InputAction::NextCamera.apply_to_scene(&mut scene));
        assert_eq!(scene.active_camera_index(), Some(1));
        assert!(InputAction::NextCamera.apply_to_scene(&mut scene));
        assert_eq!(scene.active_camera_index(), Some(0));
        assert!(InputAction::ToggleProjection.apply_to_scene(&mut scene));
        assert_eq!(
            scene.active_camera().map(|c| c.projection),
            Some(crate::scene_pkg::camera::ProjectionKind::Orthographic)
        );
        assert!(!InputAction::Close.apply_to_scene(&mut scene));
    }
}

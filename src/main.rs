//! Pumpkin Smash entry point
//!
//! Browser builds wire DOM input, HUD and sound to a session. Native builds
//! play one scripted round headless and report the result.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::f64::consts::TAU;
    use std::rc::Rc;

    use glam::Vec2;
    use wasm_bindgen::prelude::*;
    use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement, KeyboardEvent, PointerEvent};

    use pumpkin_smash::audio::{AudioManager, SoundEffect};
    use pumpkin_smash::consts::*;
    use pumpkin_smash::physics::{RapierWorld, Shape};
    use pumpkin_smash::session::Command;
    use pumpkin_smash::sim::{Arena, RoundOutcome, SpriteKind, Variant};
    use pumpkin_smash::storage::LocalStore;
    use pumpkin_smash::{Session, Settings};

    /// Game instance holding all state
    struct Game {
        session: Session<RapierWorld, LocalStore>,
        audio: AudioManager,
        variant: Variant,
        ctx: Option<CanvasRenderingContext2d>,
        canvas: HtmlCanvasElement,
        last_time: f64,
        /// Epoch a sling drag started in; a release from an older level is dropped
        drag_epoch: Option<u64>,
        left: bool,
        right: bool,
    }

    impl Game {
        fn new(canvas: HtmlCanvasElement, settings: &Settings) -> Self {
            let arena = Arena::for_container(canvas.client_width().max(1) as f32);
            canvas.set_width(arena.width as u32);
            canvas.set_height(arena.height as u32);
            let ctx = canvas
                .get_context("2d")
                .ok()
                .flatten()
                .and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok());
            if ctx.is_none() {
                log::warn!("No 2d context, running without drawing");
            }

            Self {
                session: Session::new(
                    RapierWorld::default(),
                    LocalStore,
                    settings.rules(),
                    arena,
                    1,
                    settings.seed,
                ),
                audio: AudioManager::from_settings(settings),
                variant: settings.variant,
                ctx,
                canvas,
                last_time: 0.0,
                drag_epoch: None,
                left: false,
                right: false,
            }
        }

        /// Convert a pointer position on the canvas to world units
        fn to_world(&self, event: &PointerEvent) -> Vec2 {
            let arena = self.session.state().arena;
            let scale = arena.width / self.canvas.client_width().max(1) as f32;
            Vec2::new(event.offset_x() as f32, event.offset_y() as f32) * scale
        }

        fn send(&mut self, command: Command) {
            let epoch = self.session.epoch();
            self.session.command(epoch, command);
        }

        fn update(&mut self, dt: f32) {
            for event in self.session.frame(dt) {
                if let Some(effect) = SoundEffect::for_event(&event) {
                    self.audio.play(effect);
                }
            }
        }

        fn render(&self) {
            let Some(ctx) = &self.ctx else { return };
            let arena = self.session.state().arena;
            ctx.clear_rect(0.0, 0.0, arena.width as f64, arena.height as f64);

            for sprite in self.session.sprites() {
                let color = match sprite.kind {
                    SpriteKind::Scenery => "#5b3a1e",
                    SpriteKind::Target(tint) => tint.css(),
                    SpriteKind::Pumpkin => "#ff7518",
                    SpriteKind::Player => "#3a7bd5",
                    SpriteKind::Bullet => "#222222",
                    SpriteKind::Particle => "#ffb347",
                };
                ctx.set_fill_style_str(color);
                let (x, y) = (sprite.position.x as f64, sprite.position.y as f64);
                match sprite.shape {
                    Shape::Circle { radius } => {
                        ctx.begin_path();
                        if ctx.arc(x, y, radius as f64, 0.0, TAU).is_ok() {
                            ctx.fill();
                        }
                    }
                    Shape::Rect { half_extents } => ctx.fill_rect(
                        x - half_extents.x as f64,
                        y - half_extents.y as f64,
                        half_extents.x as f64 * 2.0,
                        half_extents.y as f64 * 2.0,
                    ),
                }
            }
        }

        /// Update HUD elements in DOM
        fn update_hud(&self, document: &Document) {
            let hud = self.session.hud();
            let set = |id: &str, text: &str| {
                if let Some(el) = document.get_element_by_id(id) {
                    el.set_text_content(Some(text));
                }
            };
            let show = |id: &str, visible: bool| {
                if let Some(el) = document.get_element_by_id(id) {
                    let _ = el.set_attribute("class", if visible { "" } else { "hidden" });
                }
            };

            set("hud-level", &hud.level.to_string());
            set("hud-score", &hud.score.to_string());
            set("hud-best", &hud.best.to_string());
            set("hud-targets", &hud.targets_remaining.to_string());
            match hud.shots_remaining {
                Some(left) => set("hud-shots", &left.to_string()),
                None => set("hud-shots", &hud.shots_taken.to_string()),
            }
            show("win-banner", hud.outcome == RoundOutcome::Won);
            show("lose-banner", hud.outcome == RoundOutcome::Lost);
            show("next-btn", hud.outcome == RoundOutcome::Won);
            show("retry-btn", hud.outcome == RoundOutcome::Lost);
        }
    }

    pub fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            web_sys::console::warn_1(&"Logger already initialized".into());
        }

        log::info!("Pumpkin Smash starting...");

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;
        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .ok_or("no canvas")?
            .dyn_into()?;

        let settings = Settings::load(&LocalStore);
        let game = Rc::new(RefCell::new(Game::new(canvas.clone(), &settings)));

        setup_pointer_handlers(&canvas, game.clone());
        setup_keyboard(&window, game.clone());
        setup_buttons(&document, game.clone());
        setup_focus(&window, game.clone());
        setup_resize(&window, game.clone());

        request_animation_frame(game);
        log::info!("Pumpkin Smash running ({})", settings.variant.as_str());
        Ok(())
    }

    fn setup_pointer_handlers(canvas: &HtmlCanvasElement, game: Rc<RefCell<Game>>) {
        // Press starts a drag on the sling
        {
            let game = game.clone();
            let target = canvas.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: PointerEvent| {
                let mut g = game.borrow_mut();
                if !g.variant.uses_slingshot() || !g.session.state().is_armed() {
                    return;
                }
                // Keep receiving moves and the release even off the canvas
                let _ = target.set_pointer_capture(event.pointer_id());
                let point = g.to_world(&event);
                g.drag_epoch = Some(g.session.epoch());
                g.send(Command::Aim(point));
            });
            let _ = canvas
                .add_event_listener_with_callback("pointerdown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: PointerEvent| {
                let mut g = game.borrow_mut();
                if let Some(epoch) = g.drag_epoch {
                    let point = g.to_world(&event);
                    g.session.command(epoch, Command::Aim(point));
                }
            });
            let _ = canvas
                .add_event_listener_with_callback("pointermove", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Letting go fires, but only into the level the drag began in
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: PointerEvent| {
                let mut g = game.borrow_mut();
                if let Some(epoch) = g.drag_epoch.take() {
                    g.session.command(epoch, Command::Release);
                }
            });
            let _ = canvas
                .add_event_listener_with_callback("pointerup", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: PointerEvent| {
                game.borrow_mut().drag_epoch = None;
            });
            let _ = canvas
                .add_event_listener_with_callback("pointercancel", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_resize(window: &web_sys::Window, game: Rc<RefCell<Game>>) {
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let mut g = game.borrow_mut();
            let arena = Arena::for_container(g.canvas.client_width().max(1) as f32);
            if g.session.resize(arena) {
                g.canvas.set_width(arena.width as u32);
                g.canvas.set_height(arena.height as u32);
                g.drag_epoch = None;
            }
        });
        let _ = window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_keyboard(window: &web_sys::Window, game: Rc<RefCell<Game>>) {
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let mut g = game.borrow_mut();
                let shooter = !g.variant.uses_slingshot();
                match event.key().as_str() {
                    "ArrowLeft" | "a" | "A" => g.left = true,
                    "ArrowRight" | "d" | "D" => g.right = true,
                    "ArrowUp" | "w" | "W" | " " if shooter => g.send(Command::Jump),
                    " " => g.send(Command::Reload),
                    "f" | "F" | "Enter" if shooter => g.send(Command::Fire),
                    "r" | "R" => g.send(Command::Reset),
                    _ => return,
                }
                let (left, right) = (g.left, g.right);
                g.send(Command::Move { left, right });
            });
            let _ = window
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let mut g = game.borrow_mut();
                match event.key().as_str() {
                    "ArrowLeft" | "a" | "A" => g.left = false,
                    "ArrowRight" | "d" | "D" => g.right = false,
                    _ => return,
                }
                let (left, right) = (g.left, g.right);
                g.send(Command::Move { left, right });
            });
            let _ = window
                .add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_buttons(document: &Document, game: Rc<RefCell<Game>>) {
        for (id, command) in [
            ("reset-btn", Command::Reset),
            ("retry-btn", Command::Retry),
            ("next-btn", Command::Advance),
        ] {
            let Some(btn) = document.get_element_by_id(id) else {
                continue;
            };
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                let mut g = game.borrow_mut();
                g.drag_epoch = None;
                g.send(command);
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_focus(window: &web_sys::Window, game: Rc<RefCell<Game>>) {
        for (name, focused) in [("blur", false), ("focus", true)] {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                game.borrow_mut().audio.set_focused(focused);
            });
            let _ = window.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
            closure.forget();
        }

        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            game.borrow_mut().audio.shutdown();
        });
        let _ = window.add_event_listener_with_callback("pagehide", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else { return };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        {
            let mut g = game.borrow_mut();

            let dt = if g.last_time > 0.0 {
                ((time - g.last_time) / 1000.0) as f32
            } else {
                SIM_DT
            };
            g.last_time = time;

            g.update(dt);
            g.render();
            if let Some(document) = web_sys::window().and_then(|w| w.document()) {
                g.update_hud(&document);
            }
        }

        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() -> Result<(), JsValue> {
    wasm_game::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use pumpkin_smash::Settings;
    use pumpkin_smash::storage::FileStore;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Pumpkin Smash (native) starting...");

    let mut args = std::env::args().skip(1);
    let store = FileStore::new("pumpkin-smash.json");
    let mut settings = Settings::load(&store);
    if let Some(name) = args.next() {
        match pumpkin_smash::sim::Variant::from_str(&name) {
            Some(variant) => settings.variant = variant,
            None => log::warn!("Unknown variant '{}', using {}", name, settings.variant.as_str()),
        }
    }
    let level = args.next().and_then(|l| l.parse().ok()).unwrap_or(1);

    let hud = headless::play_round(store, &settings, level);
    match serde_json::to_string_pretty(&hud) {
        Ok(json) => println!("{}", json),
        Err(e) => log::error!("Could not print result: {}", e),
    }
}

/// Scripted round for native builds
#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use glam::Vec2;

    use pumpkin_smash::consts::*;
    use pumpkin_smash::physics::{PhysicsWorld, RapierWorld};
    use pumpkin_smash::session::Command;
    use pumpkin_smash::sim::{Arena, GameEvent, RoundOutcome};
    use pumpkin_smash::storage::FileStore;
    use pumpkin_smash::{HudState, Session, Settings};

    /// Give up after this much simulated time
    const MAX_STEPS: u32 = 60 * 60;
    /// Pull back and a little down so the pumpkin arcs into the pyramid
    const PULL: Vec2 = Vec2::new(-MAX_PULL * 0.99, 13.0);

    pub fn play_round(store: FileStore, settings: &Settings, level: u32) -> HudState {
        let mut session = Session::new(
            RapierWorld::default(),
            store,
            settings.rules(),
            Arena::default(),
            level,
            settings.seed,
        );
        let shooter = !settings.variant.uses_slingshot();
        let mut since_launch = 0u32;

        for step in 0..MAX_STEPS {
            if shooter {
                drive_shooter(&mut session, step);
            } else if session.state().is_armed() {
                let anchor = session.state().arena.sling_anchor();
                session.apply(Command::Aim(anchor + PULL));
                session.apply(Command::Release);
                since_launch = 0;
            } else {
                since_launch += 1;
                // Manual reload rules never re-arm on their own
                if since_launch > 240 {
                    session.apply(Command::Reload);
                }
            }

            for event in session.step() {
                match event {
                    GameEvent::TargetDestroyed { points, .. } => {
                        log::info!("Crate destroyed (+{})", points)
                    }
                    GameEvent::Launched { shot } => log::info!("Shot {}", shot),
                    GameEvent::Won { score } => log::info!("Level cleared, score {}", score),
                    GameEvent::Lost { score } => log::info!("Out of pumpkins, score {}", score),
                    _ => {}
                }
            }
            if session.hud().outcome != RoundOutcome::InProgress {
                break;
            }
        }

        let hud = session.hud();
        if hud.outcome == RoundOutcome::InProgress {
            log::info!("Stopping after {} steps with {} crates left", MAX_STEPS, hud.targets_remaining);
            // Abandoning still records the attempt
            session.apply(Command::Reset);
        }
        hud
    }

    fn drive_shooter(session: &mut Session<RapierWorld, FileStore>, step: u32) {
        let player_x = session
            .state()
            .player
            .and_then(|p| session.state().world.position(p.id))
            .map(|p| p.x)
            .unwrap_or(0.0);
        let range_x = session.state().arena.target_base().x - 250.0;
        session.apply(Command::Move {
            left: false,
            right: player_x < range_x,
        });
        if step % 15 == 0 {
            session.apply(Command::Fire);
        }
        if step % 90 == 45 {
            session.apply(Command::Jump);
        }
    }
}

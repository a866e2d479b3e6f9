use crate::browser;
use anyhow::{anyhow, Context, Error, Result};
use async_trait::async_trait;
use futures::channel::mpsc::UnboundedReceiver;
use futures::channel::oneshot::channel;
use serde::{Deserialize, Serialize};
// wasm is single threaded, so Rc + RefCell/Cell rather than Arc + Mutex
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::collections::HashMap;
use std::future::Future;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{
    // unchecked_ref casts the closure to the js Function the callback setters
    // expect; we build the closure ourselves so the type is known
    JsCast,
    JsValue,
};
use web_sys::{CanvasRenderingContext2d, HtmlImageElement};

use self::input::{KeyPress, KeyState};

/// One session driven by the [`GameLoop`]
/// - `update` advances the world once per display refresh
/// - `draw` renders the current world, and may suspend while sprites load
#[async_trait(?Send)]
pub trait Game {
    fn update(&mut self, keystate: &KeyState, now: f64);
    async fn draw(&mut self) -> Result<()>;
}

/// Cancellation hook handed to the host page
#[derive(Debug, Clone, Default)]
pub struct LoopHandle {
    stopped: Rc<Cell<bool>>,
}

impl LoopHandle {
    pub fn stop(&self) {
        self.stopped.set(true);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.get()
    }
}

/// ┌──────────────────── One Tick ────────────────────┐
/// │ next frame → input → update → draw (awaited)     │
/// │     ▲                                  │         │
/// │     └──────────── request next ────────┘         │
/// └──────────────────────────────────────────────────┘
/// The next frame is requested only after the previous draw resolved, so two
/// ticks never overlap even when a draw suspends on a sprite load.
pub struct GameLoop {
    keystate: KeyState,
    receiver: UnboundedReceiver<KeyPress>,
    handle: LoopHandle,
}

impl GameLoop {
    pub fn new(receiver: UnboundedReceiver<KeyPress>) -> Self {
        GameLoop {
            keystate: KeyState::new(),
            receiver,
            handle: LoopHandle::default(),
        }
    }

    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    /// Wires keyboard input and animation frames, then runs `game` until the
    /// returned handle is stopped or a draw fails
    pub fn start(game: impl Game + 'static, jump_key: &str) -> Result<LoopHandle> {
        let receiver = input::prepare_input(jump_key)?;
        let game_loop = GameLoop::new(receiver);
        let handle = game_loop.handle();

        browser::spawn_local(async move {
            if let Err(err) = game_loop.run(game, browser::next_animation_frame).await {
                error!("Game loop halted : {:#?}", err);
            }
        });

        Ok(handle)
    }

    pub async fn run<G, F, Fut>(mut self, mut game: G, mut next_frame: F) -> Result<()>
    where
        G: Game,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<f64>>,
    {
        while !self.handle.is_stopped() {
            let now = next_frame().await?;
            // stop() may have been called while waiting for the frame
            if self.handle.is_stopped() {
                break;
            }
            input::process_input(&mut self.keystate, &mut self.receiver);
            game.update(&self.keystate, now);
            self.keystate.end_frame();
            game.draw().await?;
        }
        log!("Game loop stopped");
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

/// Draw-space rectangle, in canvas pixels
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(position: Point, width: f64, height: f64) -> Self {
        Rect {
            x: position.x.into(),
            y: position.y.into(),
            width,
            height,
        }
    }
}

/// Raster image with intrinsic pixel dimensions
pub trait Sprite {
    fn natural_width(&self) -> u32;
    fn natural_height(&self) -> u32;
}

impl Sprite for HtmlImageElement {
    fn natural_width(&self) -> u32 {
        HtmlImageElement::natural_width(self)
    }

    fn natural_height(&self) -> u32 {
        HtmlImageElement::natural_height(self)
    }
}

/// Fixed-size 2D drawing surface with a save/restore transform stack
pub trait Surface {
    type Image: Sprite;

    fn width(&self) -> f64;
    fn height(&self) -> f64;
    fn clear(&self);
    fn fill_rect(&self, rect: &Rect);
    fn draw_image(&self, image: &Self::Image, destination: &Rect) -> Result<()>;
    fn save(&self);
    fn translate(&self, dx: f64, dy: f64) -> Result<()>;
    fn restore(&self);
}

pub struct Renderer {
    context: CanvasRenderingContext2d,
    width: f64,
    height: f64,
}

impl Renderer {
    /// Size is read once from the context's canvas and fixed afterwards
    pub fn new(context: CanvasRenderingContext2d) -> Result<Self> {
        let canvas = context
            .canvas()
            .ok_or_else(|| anyhow!("Context is not attached to a canvas"))?;
        Ok(Renderer {
            width: canvas.width().into(),
            height: canvas.height().into(),
            context,
        })
    }
}

impl Surface for Renderer {
    type Image = HtmlImageElement;

    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn clear(&self) {
        self.context.clear_rect(0.0, 0.0, self.width, self.height);
    }

    fn fill_rect(&self, rect: &Rect) {
        self.context
            .fill_rect(rect.x, rect.y, rect.width, rect.height);
    }

    fn draw_image(&self, image: &HtmlImageElement, destination: &Rect) -> Result<()> {
        self.context
            .draw_image_with_html_image_element_and_dw_and_dh(
                image,
                destination.x,
                destination.y,
                destination.width,
                destination.height,
            )
            .map_err(|err| anyhow!("Error drawing image : {:#?}", err))
    }

    fn save(&self) {
        self.context.save();
    }

    fn translate(&self, dx: f64, dy: f64) -> Result<()> {
        self.context
            .translate(dx, dy)
            .map_err(|err| anyhow!("Error translating context : {:#?}", err))
    }

    fn restore(&self) {
        self.context.restore();
    }
}

/// Given a path, asynchronously yields a decoded image
#[async_trait(?Send)]
pub trait ImageLoader {
    type Image: Sprite;

    async fn load(&self, path: &str) -> Result<Self::Image>;
}

pub struct BrowserImageLoader;

#[async_trait(?Send)]
impl ImageLoader for BrowserImageLoader {
    type Image = HtmlImageElement;

    async fn load(&self, path: &str) -> Result<HtmlImageElement> {
        load_image(path).await
    }
}

/// Asynchronously load an image from a given source path
/// # Arguments
/// * `source` - string slice to path/url
/// # Returns
/// * `Ok(HtmlImageElement)` - on load success
/// * `Err` - on load fail
pub async fn load_image(source: &str) -> Result<HtmlImageElement> {
    let image = browser::new_image()?;
    let (tx, rx) = channel::<Result<(), Error>>();
    let success_tx = Rc::new(RefCell::new(Some(tx)));
    let error_tx = success_tx.clone();

    let success_callback = Closure::<dyn FnMut()>::once(move || {
        if let Some(tx) = success_tx.borrow_mut().take() {
            let _ = tx.send(Ok(()));
        }
    });

    let error_callback = Closure::<dyn FnMut(JsValue)>::once(move |err: JsValue| {
        if let Some(tx) = error_tx.borrow_mut().take() {
            let _ = tx.send(Err(anyhow!("Error loading image : {:#?}", err)));
        }
    });

    image.set_onload(Some(success_callback.as_ref().unchecked_ref()));
    image.set_onerror(Some(error_callback.as_ref().unchecked_ref()));
    image.set_src(source);

    // keep callbacks alive until image is loaded or errors
    success_callback.forget();
    error_callback.forget();

    // Result<Result<(), Error>, oneshot::Canceled>
    // - first ? yields the channel result
    // - second ? yields the load result
    rx.await??;

    Ok(image)
}

/// Session-owned sprite cache: empty at start, filled on first use, never
/// reloads a path once it is cached. Failed loads are not cached.
pub struct ImageCache<I> {
    images: HashMap<String, Rc<I>>,
}

impl<I> Default for ImageCache<I> {
    fn default() -> Self {
        ImageCache {
            images: HashMap::new(),
        }
    }
}

impl<I> ImageCache<I> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<Rc<I>> {
        self.images.get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub async fn get_or_load<L>(&mut self, loader: &L, path: &str) -> Result<Rc<I>>
    where
        L: ImageLoader<Image = I> + ?Sized,
    {
        if let Some(image) = self.get(path) {
            return Ok(image);
        }
        let image = loader
            .load(path)
            .await
            .with_context(|| format!("Failed to load sprite image resource from : {}", path))?;
        log!("Loaded sprite image : {}", path);
        let image = Rc::new(image);
        self.images.insert(path.to_string(), image.clone());
        Ok(image)
    }
}

pub mod input {
    use crate::browser;
    use anyhow::{anyhow, Result};
    use futures::channel::mpsc::{unbounded, UnboundedReceiver};
    use std::collections::HashSet;
    use wasm_bindgen::JsCast;
    use web_sys::KeyboardEvent;

    const KEYDOWN: &str = "keydown";
    const KEYUP: &str = "keyup";

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum KeyPress {
        KeyDown(String),
        KeyUp(String),
    }

    /// Keys currently held, plus the keys that went down since the last frame.
    /// Auto-repeated keydowns of a held key are not new presses.
    #[derive(Debug, Default)]
    pub struct KeyState {
        held: HashSet<String>,
        pressed: HashSet<String>,
    }

    impl KeyState {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn is_held(&self, code: &str) -> bool {
            self.held.contains(code)
        }

        pub fn was_pressed(&self, code: &str) -> bool {
            self.pressed.contains(code)
        }

        pub fn set_pressed(&mut self, code: &str) {
            if self.held.insert(code.to_string()) {
                self.pressed.insert(code.to_string());
            }
        }

        pub fn set_released(&mut self, code: &str) {
            self.held.remove(code);
        }

        pub fn end_frame(&mut self) {
            self.pressed.clear();
        }
    }

    /// Installs window key listeners feeding the returned queue. The default
    /// action of `jump_key` (page scroll for Space) is suppressed.
    pub fn prepare_input(jump_key: &str) -> Result<UnboundedReceiver<KeyPress>> {
        let (keydown_sender, receiver) = unbounded();
        let keyup_sender = keydown_sender.clone();
        let jump_key = jump_key.to_string();

        let onkeydown = browser::closure_wrap(Box::new(move |event: KeyboardEvent| {
            let code = event.code();
            if code == jump_key {
                event.prevent_default();
            }
            let _ = keydown_sender.unbounded_send(KeyPress::KeyDown(code));
        }) as Box<dyn FnMut(KeyboardEvent)>);

        let onkeyup = browser::closure_wrap(Box::new(move |event: KeyboardEvent| {
            let _ = keyup_sender.unbounded_send(KeyPress::KeyUp(event.code()));
        }) as Box<dyn FnMut(KeyboardEvent)>);

        let window = browser::window()?;
        window
            .add_event_listener_with_callback(KEYDOWN, onkeydown.as_ref().unchecked_ref())
            .map_err(|err| anyhow!("Could not listen for {} : {:#?}", KEYDOWN, err))?;
        window
            .add_event_listener_with_callback(KEYUP, onkeyup.as_ref().unchecked_ref())
            .map_err(|err| anyhow!("Could not listen for {} : {:#?}", KEYUP, err))?;

        // listeners live as long as the page
        onkeydown.forget();
        onkeyup.forget();

        Ok(receiver)
    }

    /// Drains every queued key event into `state` without blocking
    pub fn process_input(state: &mut KeyState, receiver: &mut UnboundedReceiver<KeyPress>) {
        // Err = queue empty, Ok(None) = all senders dropped
        while let Ok(Some(event)) = receiver.try_next() {
            match event {
                KeyPress::KeyDown(code) => state.set_pressed(&code),
                KeyPress::KeyUp(code) => state.set_released(&code),
            }
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{FakeImage, FakeLoader};
    use futures::channel::mpsc::unbounded;
    use futures::channel::oneshot;
    use futures::executor::{block_on, LocalPool};
    use futures::future::ready;
    use futures::task::LocalSpawnExt;

    #[test]
    fn cache_loads_each_path_once() {
        let loader = FakeLoader::new();
        let mut cache = ImageCache::<FakeImage>::new();
        assert!(cache.is_empty());

        block_on(async {
            cache.get_or_load(&loader, "images/pony.png").await.unwrap();
            cache.get_or_load(&loader, "images/pony.png").await.unwrap();
            cache.get_or_load(&loader, "images/hurdle.png").await.unwrap();
        });

        assert_eq!(loader.loads("images/pony.png"), 1);
        assert_eq!(loader.loads("images/hurdle.png"), 1);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn failed_load_propagates_and_is_not_cached() {
        let loader = FakeLoader::new().failing("images/pony.png");
        let mut cache = ImageCache::<FakeImage>::new();

        let result = block_on(cache.get_or_load(&loader, "images/pony.png"));
        let message = format!("{:#}", result.err().unwrap());
        assert!(message.contains("images/pony.png"));
        assert!(cache.get("images/pony.png").is_none());

        let _ = block_on(cache.get_or_load(&loader, "images/pony.png"));
        assert_eq!(loader.loads("images/pony.png"), 2);
    }

    #[test]
    fn rect_from_point_converts_to_draw_space() {
        let rect = Rect::new(Point { x: 180, y: 450 }, 20.0, 30.0);
        assert_eq!(
            rect,
            Rect {
                x: 180.0,
                y: 450.0,
                width: 20.0,
                height: 30.0
            }
        );
    }

    struct ScriptedGame {
        events: Rc<RefCell<Vec<String>>>,
        fail_on_draw: Option<usize>,
        draws: usize,
    }

    #[async_trait(?Send)]
    impl Game for ScriptedGame {
        fn update(&mut self, keystate: &KeyState, now: f64) {
            self.events.borrow_mut().push(format!(
                "update {} {}",
                now,
                keystate.was_pressed("Space")
            ));
        }

        async fn draw(&mut self) -> Result<()> {
            self.draws += 1;
            if self.fail_on_draw == Some(self.draws) {
                return Err(anyhow!("sprite missing"));
            }
            self.events.borrow_mut().push("draw".to_string());
            Ok(())
        }
    }

    #[test]
    fn loop_alternates_update_and_draw_until_stopped() {
        let (sender, receiver) = unbounded();
        sender
            .unbounded_send(KeyPress::KeyDown("Space".to_string()))
            .unwrap();
        let game_loop = GameLoop::new(receiver);
        let handle = game_loop.handle();
        let events = Rc::new(RefCell::new(vec![]));
        let game = ScriptedGame {
            events: events.clone(),
            fail_on_draw: None,
            draws: 0,
        };

        let mut frame = 0.0;
        let result = block_on(game_loop.run(game, || {
            frame += 16.0;
            if frame > 48.0 {
                handle.stop();
            }
            ready(Ok(frame))
        }));

        assert!(result.is_ok());
        assert_eq!(
            *events.borrow(),
            vec![
                "update 16 true",
                "draw",
                "update 32 false",
                "draw",
                "update 48 false",
                "draw",
            ]
        );
    }

    #[test]
    fn draw_failure_halts_the_loop() {
        let (_sender, receiver) = unbounded();
        let game_loop = GameLoop::new(receiver);
        let events = Rc::new(RefCell::new(vec![]));
        let game = ScriptedGame {
            events: events.clone(),
            fail_on_draw: Some(2),
            draws: 0,
        };

        let mut frames = 0;
        let result = block_on(game_loop.run(game, || {
            frames += 1;
            ready(Ok(frames as f64))
        }));

        assert!(result.is_err());
        assert_eq!(frames, 2);
        assert_eq!(*events.borrow(), vec!["update 1 false", "draw", "update 2 false"]);
    }

    /// Draw that suspends on its first call until the gate is opened,
    /// like a sprite that is still loading
    struct GatedGame {
        events: Rc<RefCell<Vec<String>>>,
        gate: Option<oneshot::Receiver<()>>,
    }

    #[async_trait(?Send)]
    impl Game for GatedGame {
        fn update(&mut self, _keystate: &KeyState, now: f64) {
            self.events.borrow_mut().push(format!("update {}", now));
        }

        async fn draw(&mut self) -> Result<()> {
            if let Some(gate) = self.gate.take() {
                self.events.borrow_mut().push("draw waiting".to_string());
                gate.await.map_err(|_| anyhow!("gate dropped"))?;
            }
            self.events.borrow_mut().push("draw".to_string());
            Ok(())
        }
    }

    #[test]
    fn next_frame_waits_for_a_suspended_draw() {
        let (_sender, receiver) = unbounded();
        let game_loop = GameLoop::new(receiver);
        let handle = game_loop.handle();
        let (open_gate, gate) = oneshot::channel();
        let events = Rc::new(RefCell::new(vec![]));
        let game = GatedGame {
            events: events.clone(),
            gate: Some(gate),
        };

        let frames = Rc::new(Cell::new(0));
        let finished = Rc::new(Cell::new(false));
        let counter = frames.clone();
        let done = finished.clone();
        let mut pool = LocalPool::new();
        pool.spawner()
            .spawn_local(async move {
                let result = game_loop
                    .run(game, move || {
                        counter.set(counter.get() + 1);
                        if counter.get() > 2 {
                            handle.stop();
                        }
                        ready(Ok(f64::from(counter.get())))
                    })
                    .await;
                done.set(result.is_ok());
            })
            .unwrap();

        pool.run_until_stalled();
        assert_eq!(frames.get(), 1);
        assert_eq!(*events.borrow(), vec!["update 1", "draw waiting"]);
        assert!(!finished.get());

        open_gate.send(()).unwrap();
        pool.run_until_stalled();
        assert_eq!(frames.get(), 3);
        assert_eq!(
            *events.borrow(),
            vec!["update 1", "draw waiting", "draw", "update 2", "draw"]
        );
        assert!(finished.get());
    }
}

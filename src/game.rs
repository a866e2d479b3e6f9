use crate::config::{AssetPaths, Config};
use crate::engine::input::KeyState;
use crate::engine::{Game, ImageCache, ImageLoader, Point, Rect, Size, Sprite, Surface};
use crate::jump::Jump;
use crate::level::Level;
use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;

/// ┌───────────────────── Session Overview ───────────────────────┐
/// │                                                              │
/// │  ┌────────────┐  update  ┌────────────┐  draw  ┌───────────┐ │
/// │  │ engine.rs  ├─────────►│  Session   ├───────►│RenderPass │ │
/// │  │  GameLoop  │          │   World    │        │ ImageCache│ │
/// │  └─────┬──────┘          └─────┬──────┘        └───────────┘ │
/// │        │                       │                             │
/// │  ┌─────┴──────┐          ┌─────┴──────┐                      │
/// │  │  KeyState  ├─────────►│    Jump    │                      │
/// │  └────────────┘  press   └────────────┘                      │
/// │                                                              │
/// ├──────────────────────── Per Tick ────────────────────────────┤
/// │  1. jump key press   → Jump::trigger()                       │
/// │  2. character.x     += scroll speed                          │
/// │  3. Jump::update(now)                                        │
/// │  4. RenderPass::draw(world), awaited before the next tick    │
/// └──────────────────────────────────────────────────────────────┘
pub struct Session<S: Surface, L> {
    jump_key: String,
    world: World,
    render_pass: RenderPass<S, L>,
}

impl<S, L> Session<S, L>
where
    S: Surface,
    L: ImageLoader<Image = S::Image>,
{
    /// The ground line is placed from the surface height, and the level is
    /// generated once here for the whole session
    pub fn new<R: Rng + ?Sized>(config: Config, surface: S, loader: L, rng: &mut R) -> Result<Self> {
        let config = config.validate()?;
        let ground = config.ground_level(surface.height());
        let world = World::new(&config, ground, rng);
        log!(
            "Session started : {} obstacles, ground at {}",
            world.level().len(),
            ground
        );
        Ok(Session {
            jump_key: config.jump_key.clone(),
            render_pass: RenderPass::new(surface, loader, &config),
            world,
        })
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn render_pass(&self) -> &RenderPass<S, L> {
        &self.render_pass
    }
}

#[async_trait(?Send)]
impl<S, L> Game for Session<S, L>
where
    S: Surface,
    L: ImageLoader<Image = S::Image>,
{
    fn update(&mut self, keystate: &KeyState, now: f64) {
        let jump_pressed = keystate.was_pressed(&self.jump_key);
        self.world.update(jump_pressed, now);
    }

    async fn draw(&mut self) -> Result<()> {
        self.render_pass.draw(&self.world).await
    }
}

/// The auto-advancing, player-controlled entity. `y` never changes; jumps
/// only offset where it is drawn.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Character {
    position: Point,
}

impl Character {
    pub fn new(position: Point) -> Self {
        Character { position }
    }

    pub fn position(&self) -> Point {
        self.position
    }

    fn advance(&mut self, dx: i32) {
        // never wraps back, so x stays non-decreasing for any run length
        self.position.x = self.position.x.saturating_add(dx);
    }
}

pub struct World {
    character: Character,
    level: Level,
    jump: Jump,
    ground: i32,
    scroll_speed: i32,
}

impl World {
    pub fn new<R: Rng + ?Sized>(config: &Config, ground: i32, rng: &mut R) -> Self {
        World {
            character: Character::new(Point {
                x: 0,
                y: ground.saturating_sub(config.character_size.height),
            }),
            level: Level::generate(rng, config, ground),
            jump: Jump::from_config(config),
            ground,
            scroll_speed: config.scroll_speed,
        }
    }

    pub fn character(&self) -> &Character {
        &self.character
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn jump(&self) -> &Jump {
        &self.jump
    }

    pub fn ground(&self) -> i32 {
        self.ground
    }

    /// One simulation step
    pub fn update(&mut self, jump_pressed: bool, now: f64) {
        if jump_pressed && self.jump.trigger() {
            log!("Jump at x = {}", self.character.position().x);
        }
        self.character.advance(self.scroll_speed);
        self.jump.update(now);
    }
}

/// Composites one frame: ground, then obstacles and character through a
/// camera that keeps the character horizontally centered
pub struct RenderPass<S: Surface, L> {
    surface: S,
    loader: L,
    cache: ImageCache<S::Image>,
    assets: AssetPaths,
    obstacle_size: Size,
    character_size: Size,
}

impl<S, L> RenderPass<S, L>
where
    S: Surface,
    L: ImageLoader<Image = S::Image>,
{
    pub fn new(surface: S, loader: L, config: &Config) -> Self {
        RenderPass {
            surface,
            loader,
            cache: ImageCache::new(),
            assets: config.assets.clone(),
            obstacle_size: config.obstacle_size,
            character_size: config.character_size,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn cache(&self) -> &ImageCache<S::Image> {
        &self.cache
    }

    pub async fn draw(&mut self, world: &World) -> Result<()> {
        self.surface.clear();
        self.surface.fill_rect(&Rect {
            x: 0.0,
            y: world.ground().into(),
            width: self.surface.width(),
            height: 1.0,
        });

        self.surface.save();
        let result = self.draw_world(world).await;
        // the transform stack is unwound even when a sprite failed to load
        self.surface.restore();
        result
    }

    async fn draw_world(&mut self, world: &World) -> Result<()> {
        let camera_x = 0.5 * self.surface.width() - f64::from(world.character().position().x);
        self.surface.translate(camera_x, 0.0)?;
        self.draw_obstacles(world.level()).await?;
        self.draw_character(world).await
    }

    async fn draw_obstacles(&mut self, level: &Level) -> Result<()> {
        for obstacle in level.obstacles() {
            let sprite = self
                .cache
                .get_or_load(&self.loader, &self.assets.obstacle)
                .await?;
            self.surface.draw_image(
                &sprite,
                &Rect::new(
                    obstacle.position(),
                    self.obstacle_size.width.into(),
                    self.obstacle_size.height.into(),
                ),
            )?;
        }
        Ok(())
    }

    async fn draw_character(&mut self, world: &World) -> Result<()> {
        let sprite = self
            .cache
            .get_or_load(&self.loader, &self.assets.character)
            .await?;
        let position = world.character().position();
        let width = f64::from(self.character_size.width);
        let height = match sprite.natural_width() {
            0 => f64::from(self.character_size.height),
            natural_width => {
                width / f64::from(natural_width) * f64::from(sprite.natural_height())
            }
        };
        self.surface.draw_image(
            &sprite,
            &Rect::new(
                Point {
                    x: position.x,
                    y: position.y + world.jump().offset(),
                },
                width,
                height,
            ),
        )
    }
}

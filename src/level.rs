use crate::config::Config;
use crate::engine::Point;
use rand::Rng;

/// Static ground-level object the character jumps over
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Obstacle {
    position: Point,
}

impl Obstacle {
    pub fn new(position: Point) -> Self {
        Obstacle { position }
    }

    pub fn position(&self) -> Point {
        self.position
    }
}

/// Obstacles in ascending `x`, fixed for the whole session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Level {
    obstacles: Vec<Obstacle>,
}

impl Level {
    /// ┌──────────────── Obstacle Placement ────────────────┐
    /// │ x₀ = 3W                                            │
    /// │ xₙ = xₙ₋₁ + rand[3W, 3W + jitter)                  │
    /// │ y  = ground - obstacle height                      │
    /// └────────────────────────────────────────────────────┘
    /// The first obstacle sits one gap away from the starting character, and
    /// every gap leaves room to land before the next obstacle.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, config: &Config, ground: i32) -> Self {
        let min_spacing = config.min_spacing();
        let y = ground.saturating_sub(config.obstacle_size.height);
        let max_spacing = min_spacing.saturating_add(config.spacing_jitter);

        // a validated config keeps every x below i32::MAX, so the additions
        // never saturate there
        let mut x = min_spacing;
        let mut obstacles = Vec::with_capacity(config.obstacle_count);
        for index in 0..config.obstacle_count {
            if index > 0 {
                let gap = if max_spacing > min_spacing {
                    rng.gen_range(min_spacing..max_spacing)
                } else {
                    min_spacing
                };
                x = x.saturating_add(gap);
            }
            obstacles.push(Obstacle::new(Point { x, y }));
        }
        Level { obstacles }
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }
}

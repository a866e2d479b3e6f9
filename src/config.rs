use crate::engine::Size;
use anyhow::{anyhow, ensure, Result};
use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;

/// Sprite locations, relative to the page
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AssetPaths {
    pub character: String,
    pub obstacle: String,
}

impl Default for AssetPaths {
    fn default() -> Self {
        AssetPaths {
            character: "images/pony.png".to_string(),
            obstacle: "images/hurdle.png".to_string(),
        }
    }
}

/// Session tuning. Every field has a default, so a host only passes the
/// values it wants to change, e.g. `{ "holdMs": 800 }`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub obstacle_count: usize,
    pub obstacle_size: Size,
    pub character_size: Size,
    /// added on top of the obstacle height to get the jump height
    pub jump_margin: i32,
    /// wall-clock time spent at the top of a jump
    pub hold_ms: f64,
    /// horizontal advance per tick
    pub scroll_speed: i32,
    /// obstacle gaps are drawn from [min_spacing, min_spacing + spacing_jitter)
    pub spacing_jitter: i32,
    /// ground line as a fraction of the viewport height
    pub ground_ratio: f64,
    /// `KeyboardEvent.code` that triggers a jump
    pub jump_key: String,
    pub assets: AssetPaths,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            obstacle_count: 30,
            obstacle_size: Size {
                width: 20,
                height: 30,
            },
            character_size: Size {
                width: 60,
                height: 40,
            },
            jump_margin: 10,
            hold_ms: 1500.0,
            scroll_speed: 1,
            spacing_jitter: 100,
            ground_ratio: 0.8,
            jump_key: "Space".to_string(),
            assets: AssetPaths::default(),
        }
    }
}

impl Config {
    pub fn from_js(value: JsValue) -> Result<Config> {
        serde_wasm_bindgen::from_value::<Config>(value)
            .map_err(|err| anyhow!("Invalid configuration object : {:#?}", err))?
            .validate()
    }

    pub fn validate(self) -> Result<Config> {
        ensure!(
            self.obstacle_size.width > 0 && self.obstacle_size.height > 0,
            "obstacleSize must be positive, got {:?}",
            self.obstacle_size
        );
        ensure!(
            self.character_size.width > 0 && self.character_size.height > 0,
            "characterSize must be positive, got {:?}",
            self.character_size
        );
        ensure!(
            self.jump_margin >= 0,
            "jumpMargin must not be negative, got {}",
            self.jump_margin
        );
        ensure!(
            self.hold_ms.is_finite() && self.hold_ms >= 0.0,
            "holdMs must be a non-negative number, got {}",
            self.hold_ms
        );
        // a negative speed would walk the character backwards
        ensure!(
            self.scroll_speed >= 0,
            "scrollSpeed must not be negative, got {}",
            self.scroll_speed
        );
        ensure!(
            self.spacing_jitter > 0,
            "spacingJitter must be positive, got {}",
            self.spacing_jitter
        );
        ensure!(
            self.ground_ratio > 0.0 && self.ground_ratio <= 1.0,
            "groundRatio must be in (0, 1], got {}",
            self.ground_ratio
        );
        ensure!(!self.jump_key.is_empty(), "jumpKey must not be empty");
        ensure!(
            self.obstacle_size
                .height
                .checked_add(self.jump_margin)
                .is_some(),
            "obstacleSize.height + jumpMargin does not fit in world coordinates"
        );
        // the whole level, gaps at their widest, must fit in world coordinates
        let level_extent = self
            .character_size
            .width
            .checked_mul(3)
            .and_then(|min_spacing| min_spacing.checked_add(self.spacing_jitter))
            .zip(i32::try_from(self.obstacle_count).ok())
            .and_then(|(max_gap, count)| max_gap.checked_mul(count));
        ensure!(
            level_extent.is_some(),
            "{} obstacles of up to 3 x {} + {} spacing do not fit in world coordinates",
            self.obstacle_count,
            self.character_size.width,
            self.spacing_jitter
        );
        Ok(self)
    }

    pub fn jump_height(&self) -> i32 {
        self.obstacle_size.height.saturating_add(self.jump_margin)
    }

    /// Room the character needs to land between two obstacles
    pub fn min_spacing(&self) -> i32 {
        self.character_size.width.saturating_mul(3)
    }

    pub fn ground_level(&self, viewport_height: f64) -> i32 {
        (self.ground_ratio * viewport_height).floor() as i32
    }
}

use crate::engine::{ImageLoader, Rect, Sprite, Surface};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FakeImage {
    pub path: String,
    pub width: u32,
    pub height: u32,
}

impl Sprite for FakeImage {
    fn natural_width(&self) -> u32 {
        self.width
    }

    fn natural_height(&self) -> u32 {
        self.height
    }
}

/// Hands out `FakeImage`s and counts how often each path was requested
pub(crate) struct FakeLoader {
    sizes: HashMap<String, (u32, u32)>,
    failing: HashSet<String>,
    loads: RefCell<HashMap<String, usize>>,
}

impl FakeLoader {
    pub fn new() -> Self {
        FakeLoader {
            sizes: HashMap::new(),
            failing: HashSet::new(),
            loads: RefCell::new(HashMap::new()),
        }
    }

    pub fn with_size(mut self, path: &str, width: u32, height: u32) -> Self {
        self.sizes.insert(path.to_string(), (width, height));
        self
    }

    pub fn failing(mut self, path: &str) -> Self {
        self.failing.insert(path.to_string());
        self
    }

    pub fn loads(&self, path: &str) -> usize {
        self.loads.borrow().get(path).copied().unwrap_or(0)
    }
}

#[async_trait(?Send)]
impl ImageLoader for FakeLoader {
    type Image = FakeImage;

    async fn load(&self, path: &str) -> Result<FakeImage> {
        *self.loads.borrow_mut().entry(path.to_string()).or_insert(0) += 1;
        if self.failing.contains(path) {
            return Err(anyhow!("404 : {}", path));
        }
        let (width, height) = self.sizes.get(path).copied().unwrap_or((10, 10));
        Ok(FakeImage {
            path: path.to_string(),
            width,
            height,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DrawCall {
    Clear,
    FillRect(Rect),
    DrawImage(String, Rect),
    Save,
    Translate(f64, f64),
    Restore,
}

/// Surface that records every call instead of drawing
pub(crate) struct RecordingSurface {
    width: f64,
    height: f64,
    pub calls: RefCell<Vec<DrawCall>>,
}

impl RecordingSurface {
    pub fn new(width: f64, height: f64) -> Self {
        RecordingSurface {
            width,
            height,
            calls: RefCell::new(vec![]),
        }
    }

    pub fn take_calls(&self) -> Vec<DrawCall> {
        self.calls.borrow_mut().drain(..).collect()
    }
}

impl Surface for RecordingSurface {
    type Image = FakeImage;

    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn clear(&self) {
        self.calls.borrow_mut().push(DrawCall::Clear);
    }

    fn fill_rect(&self, rect: &Rect) {
        self.calls.borrow_mut().push(DrawCall::FillRect(*rect));
    }

    fn draw_image(&self, image: &FakeImage, destination: &Rect) -> Result<()> {
        self.calls
            .borrow_mut()
            .push(DrawCall::DrawImage(image.path.clone(), *destination));
        Ok(())
    }

    fn save(&self) {
        self.calls.borrow_mut().push(DrawCall::Save);
    }

    fn translate(&self, dx: f64, dy: f64) -> Result<()> {
        self.calls.borrow_mut().push(DrawCall::Translate(dx, dy));
        Ok(())
    }

    fn restore(&self) {
        self.calls.borrow_mut().push(DrawCall::Restore);
    }
}

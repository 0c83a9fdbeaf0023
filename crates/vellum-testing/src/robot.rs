//! Robot-style driver for lazy grids.
//!
//! [`GridRobot`] plays the rendering framework around a [`LazyGrid`]: it
//! mounts a [`Container`] for every pool slot, forwards viewport changes and
//! simulates frames by handing each rendered container's extent back to the
//! grid after "commit".
//!
//! # Example
//!
//! ```
//! use vellum_foundation::lazy::{GridConfig, KeyedItems};
//! use vellum_testing::GridRobot;
//!
//! let mut robot = GridRobot::new(GridConfig::default());
//! robot.submit(&KeyedItems::sequential(100));
//! robot.set_viewport(0.0, 480.0, 320.0);
//! robot.settle(|_, _| 60.0);
//!
//! assert!(robot.rendered_keys().len() >= 8);
//! ```

use crate::recording::{RecordingHost, RecordingRenderer};
use std::cell::{Ref, RefCell};
use std::rc::Rc;
use vellum_foundation::lazy::{
    Container, GridConfig, ItemKey, LazyGrid, LazyItemProvider, MeasureOutcome, ScrollToOptions,
    SlotId,
};
use vellum_foundation::GridError;

/// Frames [`GridRobot::settle`] runs before giving up on convergence.
const MAX_SETTLE_FRAMES: usize = 32;

/// Outcomes of the measurements delivered in one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub applied: usize,
    pub unchanged: usize,
    pub zero_ignored: usize,
    pub stale: usize,
}

impl FrameReport {
    fn record(&mut self, outcome: MeasureOutcome) {
        match outcome {
            MeasureOutcome::Applied => self.applied += 1,
            MeasureOutcome::Unchanged => self.unchanged += 1,
            MeasureOutcome::ZeroIgnored => self.zero_ignored += 1,
            MeasureOutcome::Stale => self.stale += 1,
        }
    }
}

pub struct GridRobot {
    grid: LazyGrid,
    host: RecordingHost,
    renderer: Rc<RefCell<RecordingRenderer>>,
    containers: Vec<Container<RecordingRenderer>>,
}

impl GridRobot {
    pub fn new(config: GridConfig) -> Self {
        let host = RecordingHost::new();
        let mut grid = LazyGrid::new(config);
        grid.set_host(host.clone());
        Self {
            grid,
            host,
            renderer: Rc::new(RefCell::new(RecordingRenderer::new())),
            containers: Vec::new(),
        }
    }

    pub fn grid(&self) -> &LazyGrid {
        &self.grid
    }

    /// Direct access for calls the robot does not wrap. Call
    /// [`sync`](Self::sync) afterwards if the pool may have grown.
    pub fn grid_mut(&mut self) -> &mut LazyGrid {
        &mut self.grid
    }

    pub fn host(&self) -> &RecordingHost {
        &self.host
    }

    pub fn renderer(&self) -> Ref<'_, RecordingRenderer> {
        self.renderer.borrow()
    }

    pub fn containers(&self) -> &[Container<RecordingRenderer>] {
        &self.containers
    }

    pub fn container(&self, slot: SlotId) -> Option<&Container<RecordingRenderer>> {
        self.containers.get(slot.index())
    }

    /// Container currently showing `key`.
    pub fn container_for(&self, key: &ItemKey) -> Option<&Container<RecordingRenderer>> {
        self.containers
            .iter()
            .find(|container| container.item().is_some_and(|item| &item.key == key))
    }

    pub fn submit(&mut self, provider: &dyn LazyItemProvider) {
        self.grid.submit_items(provider);
        self.sync();
    }

    pub fn set_viewport(&mut self, scroll_offset: f32, viewport_extent: f32, cross_extent: f32) {
        self.grid
            .set_viewport(scroll_offset, viewport_extent, cross_extent);
        self.sync();
    }

    pub fn scroll_by(&mut self, delta: f32) -> f32 {
        let consumed = self.grid.scroll_by(delta);
        self.sync();
        consumed
    }

    pub fn scroll_to_index(&mut self, index: usize, options: ScrollToOptions) -> Result<f32, GridError> {
        let offset = self.grid.scroll_to_index(index, options)?;
        self.sync();
        Ok(offset)
    }

    /// Mounts containers for pool slots that appeared since the last call.
    pub fn sync(&mut self) {
        while self.containers.len() < self.grid.pool_size() {
            let slot = SlotId(self.containers.len() as u32);
            log::trace!("robot: mounting container {slot}");
            let container = self.grid.mount_container(slot, Rc::clone(&self.renderer));
            self.containers.push(container);
        }
    }

    /// Simulates one frame: every rendering container reports
    /// `measure(key, index)` as its laid out extent.
    pub fn frame(&mut self, measure: impl Fn(&ItemKey, usize) -> f32) -> FrameReport {
        let mut report = FrameReport::default();
        for container in &self.containers {
            let Some(item) = container.item() else {
                continue;
            };
            let raw = measure(&item.key, item.index);
            report.record(self.grid.deliver(container, raw));
        }
        self.sync();
        report
    }

    /// Runs frames until a frame applies no new size. Returns the number of
    /// frames run.
    pub fn settle(&mut self, measure: impl Fn(&ItemKey, usize) -> f32) -> usize {
        for frame in 1..=MAX_SETTLE_FRAMES {
            if self.frame(&measure).applied == 0 {
                return frame;
            }
        }
        log::warn!("robot: grid did not settle within {MAX_SETTLE_FRAMES} frames");
        MAX_SETTLE_FRAMES
    }

    /// Keys currently rendered by some container, sorted.
    pub fn rendered_keys(&self) -> Vec<ItemKey> {
        let mut keys: Vec<ItemKey> = self
            .containers
            .iter()
            .filter(|container| container.is_rendering())
            .filter_map(|container| container.item().map(|item| item.key))
            .collect();
        keys.sort();
        keys
    }

    /// On-screen main-axis offset of `key` as its container would draw it.
    pub fn screen_offset(&self, key: &ItemKey) -> Option<f32> {
        let container = self.container_for(key)?;
        let content = container.position().resolve(self.grid.content_extent());
        Some(content - self.grid.scroll_offset())
    }
}

//! Headless photo gallery driven through the Vellum lazy grid.
//!
//! A masonry grid of photos and a horizontal filmstrip are pushed through the
//! usual life of a gallery screen: scrolling, a window resize that changes
//! the column count, newer photos arriving on top while the user reads, and a
//! jump to a photo that has never been measured.

use anyhow::{anyhow, ensure, Context};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use vellum_foundation::lazy::{
    Container, GridConfig, GridGap, ItemKey, ItemRenderer, KeyedItems, LazyGrid, LazyItemProvider,
    MeasureOutcome, Orientation, ScrollToOptions, SlotId, ViewportHost,
};

const PHOTO_COUNT: usize = 2_000;
const NEWER_PHOTOS: u64 = 24;

/// Thumbnail extent along the scroll axis, from a made-up aspect ratio.
fn thumbnail_extent(key: &ItemKey, column_width: f32) -> f32 {
    let seed = key.as_num().unwrap_or(0);
    let aspect = 0.6 + (seed.wrapping_mul(2_654_435_761) % 90) as f32 / 100.0;
    column_width * aspect
}

struct Thumbnail {
    key: ItemKey,
}

#[derive(Default)]
struct ThumbnailRenderer {
    decoded: usize,
    released: usize,
}

impl ItemRenderer for ThumbnailRenderer {
    type View = Thumbnail;

    fn render(&mut self, key: &ItemKey, index: usize) -> Thumbnail {
        self.decoded += 1;
        log::trace!("decode photo {key} at {index}");
        Thumbnail { key: key.clone() }
    }

    fn teardown(&mut self, view: Thumbnail) {
        self.released += 1;
        log::trace!("release photo {}", view.key);
    }
}

/// Scroll view position shared with the grid.
#[derive(Clone, Default)]
struct ScrollView {
    offset: Rc<Cell<f32>>,
    extent: Rc<Cell<f32>>,
}

impl ViewportHost for ScrollView {
    fn scroll_to(&mut self, offset: f32, animated: bool) {
        log::debug!("scroll view -> {offset:.1} (animated: {animated})");
        self.offset.set(offset);
    }

    fn content_extent_changed(&mut self, extent: f32) {
        self.extent.set(extent);
    }
}

struct Gallery {
    name: &'static str,
    grid: LazyGrid,
    view: ScrollView,
    renderer: Rc<RefCell<ThumbnailRenderer>>,
    containers: Vec<Container<ThumbnailRenderer>>,
    viewport: (f32, f32),
}

impl Gallery {
    fn new(name: &'static str, config: GridConfig, viewport: (f32, f32)) -> Self {
        let view = ScrollView::default();
        let mut grid = LazyGrid::new(config);
        grid.set_host(view.clone());
        Self {
            name,
            grid,
            view,
            renderer: Rc::new(RefCell::new(ThumbnailRenderer::default())),
            containers: Vec::new(),
            viewport,
        }
    }

    fn mount_new_containers(&mut self) {
        while self.containers.len() < self.grid.pool_size() {
            let slot = SlotId(self.containers.len() as u32);
            let container = self.grid.mount_container(slot, Rc::clone(&self.renderer));
            self.containers.push(container);
        }
    }

    fn column_width(&self) -> f32 {
        self.grid.column_span(0).size
    }

    /// Lays out rendered thumbnails and reports their extents until nothing
    /// changes any more.
    fn settle(&mut self) -> anyhow::Result<usize> {
        for frame in 1..=16 {
            self.mount_new_containers();
            let width = self.column_width();
            let mut applied = 0;
            for container in &self.containers {
                let Some(item) = container.item() else {
                    continue;
                };
                let extent = thumbnail_extent(&item.key, width);
                if self.grid.deliver(container, extent) == MeasureOutcome::Applied {
                    applied += 1;
                }
            }
            if applied == 0 {
                return Ok(frame);
            }
        }
        Err(anyhow!("{} did not settle", self.name))
    }

    fn set_viewport(&mut self, offset: f32) -> anyhow::Result<()> {
        let (main, cross) = self.viewport;
        self.view.offset.set(offset);
        self.grid.set_viewport(offset, main, cross);
        self.settle().map(|_| ())
    }

    fn scroll_by(&mut self, delta: f32) -> anyhow::Result<f32> {
        let consumed = self.grid.scroll_by(delta);
        self.view.offset.set(self.grid.scroll_offset());
        self.settle()?;
        Ok(consumed)
    }

    fn resize(&mut self, main: f32, cross: f32, columns: i32) -> anyhow::Result<()> {
        self.viewport = (main, cross);
        self.grid.set_columns(columns);
        self.grid.set_viewport(self.view.offset.get(), main, cross);
        self.settle().map(|_| ())
    }

    fn first_visible(&self) -> Option<ItemKey> {
        let first = self.grid.layout_info().visible_items_info.first()?;
        Some(first.key.clone())
    }

    /// Where `key` sits relative to the top of the viewport.
    fn screen_offset(&self, key: &ItemKey) -> Option<f32> {
        let placement = self.grid.placement_of(self.grid.index_of(key)?)?;
        Some(placement.offset - self.grid.scroll_offset())
    }

    fn report(&self, step: &str) {
        let info = self.grid.layout_info();
        let stats = self.grid.stats();
        let renderer = self.renderer.borrow();
        let visible = match (info.visible_items_info.first(), info.visible_items_info.last()) {
            (Some(first), Some(last)) => format!("{}..={}", first.index, last.index),
            _ => "none".to_string(),
        };
        log::info!(
            "[{}] {step}: offset {:.1} of {:.1}, {} columns, visible {visible}, slots {}+{} idle, reused {}, decoded {}, released {}",
            self.name,
            info.scroll_offset,
            self.view.extent.get(),
            info.columns,
            stats.slots_in_use,
            stats.slots_in_pool,
            stats.reuse_count,
            renderer.decoded,
            renderer.released,
        );
    }
}

fn run_masonry() -> anyhow::Result<()> {
    let mut gallery = Gallery::new(
        "masonry",
        GridConfig {
            columns: 4,
            gap: GridGap::Uniform(8.0),
            estimated_item_size: 240.0,
            maintain_visible_content_position: true,
            before_content_padding: 16.0,
            after_content_padding: 16.0,
            ..Default::default()
        },
        (900.0, 1200.0),
    );
    let photos = KeyedItems::sequential(PHOTO_COUNT);
    gallery.grid.submit_items(&photos);
    gallery.set_viewport(0.0)?;
    gallery.report("opened");

    for _ in 0..12 {
        gallery.scroll_by(640.0)?;
    }
    gallery.report("flung forward");

    gallery.resize(900.0, 620.0, 2)?;
    gallery.report("window narrowed");

    let reading = gallery.first_visible().context("nothing visible before refresh")?;
    let before = gallery.screen_offset(&reading).context("reading position lost")?;
    let newer = photos.inserted(0, PHOTO_COUNT as u64..PHOTO_COUNT as u64 + NEWER_PHOTOS);
    gallery.grid.submit_items(&newer);
    gallery.settle()?;
    let after = gallery.screen_offset(&reading).context("reading position lost")?;
    gallery.report("newer photos arrived");
    ensure!(
        (before - after).abs() < 1.0,
        "photo {reading} moved on screen from {before:.1} to {after:.1}"
    );

    let target = newer.item_count() - 10;
    let offset = gallery
        .grid
        .scroll_to_index(target, ScrollToOptions::centered())
        .map_err(|err| anyhow!("jump to photo {target}: {err}"))?;
    log::info!("[masonry] jump to photo {target} estimated at {offset:.1}");
    gallery.settle()?;
    gallery.report("jumped near the end");
    Ok(())
}

fn run_filmstrip() -> anyhow::Result<()> {
    let mut strip = Gallery::new(
        "filmstrip",
        GridConfig {
            columns: 1,
            orientation: Orientation::Horizontal,
            gap: GridGap::Uniform(4.0),
            estimated_item_size: 120.0,
            ..Default::default()
        },
        (1280.0, 96.0),
    );
    strip.grid.submit_items(&KeyedItems::sequential(PHOTO_COUNT));
    strip.set_viewport(0.0)?;
    strip.report("opened");

    while strip.grid.can_scroll_forward() {
        if strip.scroll_by(4_000.0)? == 0.0 {
            break;
        }
    }
    strip.report("reached the end");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    run_masonry()?;
    run_filmstrip()?;
    Ok(())
}

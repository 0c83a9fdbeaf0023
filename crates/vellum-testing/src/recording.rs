//! Recording stand-ins for the collaborators of a lazy grid.

use std::cell::RefCell;
use std::rc::Rc;
use vellum_foundation::lazy::{ItemKey, ItemRenderer, ViewportHost};

/// Something the grid asked of its viewport host.
#[derive(Clone, Debug, PartialEq)]
pub enum HostEvent {
    ScrollTo { offset: f32, animated: bool },
    ContentExtent(f32),
}

/// Viewport host that records every request.
///
/// Clones share the same log, so a test keeps one clone and hands the other
/// to the grid.
#[derive(Clone, Debug, Default)]
pub struct RecordingHost {
    events: Rc<RefCell<Vec<HostEvent>>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.events.borrow().clone()
    }

    pub fn scrolls(&self) -> Vec<f32> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                HostEvent::ScrollTo { offset, .. } => Some(*offset),
                HostEvent::ContentExtent(_) => None,
            })
            .collect()
    }

    pub fn last_extent(&self) -> Option<f32> {
        self.events.borrow().iter().rev().find_map(|event| match event {
            HostEvent::ContentExtent(extent) => Some(*extent),
            HostEvent::ScrollTo { .. } => None,
        })
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl ViewportHost for RecordingHost {
    fn scroll_to(&mut self, offset: f32, animated: bool) {
        self.events
            .borrow_mut()
            .push(HostEvent::ScrollTo { offset, animated });
    }

    fn content_extent_changed(&mut self, extent: f32) {
        self.events
            .borrow_mut()
            .push(HostEvent::ContentExtent(extent));
    }
}

/// View produced by [`RecordingRenderer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedCell {
    pub key: ItemKey,
    pub index: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RendererEvent {
    Render(ItemKey),
    Teardown(ItemKey),
}

/// Item renderer that records renders and teardowns.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    events: Vec<RendererEvent>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[RendererEvent] {
        &self.events
    }

    pub fn render_count(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, RendererEvent::Render(_)))
            .count()
    }

    pub fn rendered(&self, key: &ItemKey) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, RendererEvent::Render(rendered) if rendered == key))
            .count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl ItemRenderer for RecordingRenderer {
    type View = RenderedCell;

    fn render(&mut self, key: &ItemKey, index: usize) -> RenderedCell {
        self.events.push(RendererEvent::Render(key.clone()));
        RenderedCell {
            key: key.clone(),
            index,
        }
    }

    fn teardown(&mut self, view: RenderedCell) {
        self.events.push(RendererEvent::Teardown(view.key));
    }
}

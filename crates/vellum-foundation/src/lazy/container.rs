//! Render slot bound to one pooled container id.
//!
//! A [`Container`] subscribes to the four binding-store keys of its slot and
//! nothing else. A write for another slot never reaches it, and a pass that
//! leaves its values unchanged produces no callback at all.

use super::anchor::AnchoredOffset;
use super::item_key::ItemKey;
use super::recycler::{MeasureTicket, SlotId};
use super::size_cache::quantize;
use smallvec::SmallVec;
use std::cell::RefCell;
use std::rc::Rc;
use vellum_core::{BindingStore, Subscription};

/// Item a slot is currently bound to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoundItem {
    pub key: ItemKey,
    pub index: usize,
    /// Binding generation, see [`MeasureTicket`].
    pub generation: u64,
}

impl BoundItem {
    pub fn ticket(&self, slot: SlotId) -> MeasureTicket {
        MeasureTicket {
            slot,
            generation: self.generation,
        }
    }
}

/// Value type of the engine's binding store.
#[derive(Clone, Debug, PartialEq)]
pub enum SlotValue {
    /// `itemKey:<id>`; `None` while the slot is unbound.
    Item(Option<BoundItem>),
    /// `position:<id>`
    Position(AnchoredOffset),
    /// `column:<id>`
    Column(usize),
    /// `trailingGap:<id>`; cross-axis gap after the cell, zero for the last
    /// cell of a row.
    TrailingGap(f32),
}

/// Store key names of one slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotKeys {
    pub item: String,
    pub position: String,
    pub column: String,
    pub trailing_gap: String,
}

impl SlotKeys {
    pub fn new(slot: SlotId) -> Self {
        let id = slot.0;
        Self {
            item: format!("itemKey:{id}"),
            position: format!("position:{id}"),
            column: format!("column:{id}"),
            trailing_gap: format!("trailingGap:{id}"),
        }
    }
}

/// Renders items into views. Supplied by the data source.
pub trait ItemRenderer {
    type View;

    fn render(&mut self, key: &ItemKey, index: usize) -> Self::View;

    /// Called when a slot drops the view of its previous item.
    fn teardown(&mut self, view: Self::View) {
        let _ = view;
    }
}

/// What a container makes of a post-layout measurement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Measurement {
    /// Quantized size to hand to the engine.
    Report { ticket: MeasureTicket, size: f32 },
    /// The slot is unbound; nothing to report.
    Unbound,
    /// Zero or negative extent, treated as not yet known.
    Zero,
    /// Same quantized size as the engine already has.
    SameAsCached,
}

struct SlotState<V> {
    item: Option<BoundItem>,
    view: Option<V>,
    position: AnchoredOffset,
    column: usize,
    trailing_gap: f32,
    renders: u64,
    repositions: u64,
}

pub struct Container<R: ItemRenderer> {
    slot: SlotId,
    state: Rc<RefCell<SlotState<R::View>>>,
    _subscriptions: SmallVec<[Subscription; 4]>,
}

impl<R: ItemRenderer + 'static> Container<R> {
    /// Attaches a render slot to `slot` and renders whatever is currently
    /// bound to it.
    pub fn mount(slot: SlotId, store: &BindingStore<SlotValue>, renderer: Rc<RefCell<R>>) -> Self {
        let keys = SlotKeys::new(slot);
        let state = Rc::new(RefCell::new(SlotState {
            item: None,
            view: None,
            position: AnchoredOffset::default(),
            column: 0,
            trailing_gap: 0.0,
            renders: 0,
            repositions: 0,
        }));

        {
            let mut state = state.borrow_mut();
            if let Some(SlotValue::Position(position)) = store.get(&keys.position) {
                state.position = position;
            }
            if let Some(SlotValue::Column(column)) = store.get(&keys.column) {
                state.column = column;
            }
            if let Some(SlotValue::TrailingGap(gap)) = store.get(&keys.trailing_gap) {
                state.trailing_gap = gap;
            }
        }
        if let Some(SlotValue::Item(item)) = store.get(&keys.item) {
            apply_item(&state, &renderer, item.as_ref());
        }

        let mut subscriptions = SmallVec::new();

        let item_state = Rc::clone(&state);
        subscriptions.push(store.subscribe(&keys.item, move |value: &SlotValue| {
            if let SlotValue::Item(item) = value {
                apply_item(&item_state, &renderer, item.as_ref());
            }
        }));

        let position_state = Rc::clone(&state);
        subscriptions.push(store.subscribe(&keys.position, move |value: &SlotValue| {
            if let SlotValue::Position(position) = value {
                let mut state = position_state.borrow_mut();
                state.position = *position;
                state.repositions += 1;
            }
        }));

        let column_state = Rc::clone(&state);
        subscriptions.push(store.subscribe(&keys.column, move |value: &SlotValue| {
            if let SlotValue::Column(column) = value {
                let mut state = column_state.borrow_mut();
                state.column = *column;
                state.repositions += 1;
            }
        }));

        let gap_state = Rc::clone(&state);
        subscriptions.push(store.subscribe(&keys.trailing_gap, move |value: &SlotValue| {
            if let SlotValue::TrailingGap(gap) = value {
                gap_state.borrow_mut().trailing_gap = *gap;
            }
        }));

        Self {
            slot,
            state,
            _subscriptions: subscriptions,
        }
    }
}

impl<R: ItemRenderer> Container<R> {
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn item(&self) -> Option<BoundItem> {
        self.state.borrow().item.clone()
    }

    /// Whether the slot currently shows a view. Unbound slots render nothing.
    pub fn is_rendering(&self) -> bool {
        self.state.borrow().view.is_some()
    }

    pub fn with_view<T>(&self, f: impl FnOnce(Option<&R::View>) -> T) -> T {
        f(self.state.borrow().view.as_ref())
    }

    pub fn position(&self) -> AnchoredOffset {
        self.state.borrow().position
    }

    pub fn column(&self) -> usize {
        self.state.borrow().column
    }

    pub fn trailing_gap(&self) -> f32 {
        self.state.borrow().trailing_gap
    }

    /// Number of times a view was rendered for new content.
    pub fn render_count(&self) -> u64 {
        self.state.borrow().renders
    }

    /// Number of position or column updates received.
    pub fn reposition_count(&self) -> u64 {
        self.state.borrow().repositions
    }

    /// Turns a raw post-layout extent into a report for the engine.
    ///
    /// `cached` is the engine's current size for the bound key.
    pub fn measured(&self, raw: f32, cached: Option<f32>) -> Measurement {
        let state = self.state.borrow();
        let Some(item) = state.item.as_ref() else {
            return Measurement::Unbound;
        };
        let size = if raw.is_finite() { quantize(raw) } else { 0.0 };
        if size <= 0.0 {
            log::debug!(
                "container {} reported zero extent for item {}; ignored",
                self.slot,
                item.key
            );
            return Measurement::Zero;
        }
        if cached == Some(size) {
            return Measurement::SameAsCached;
        }
        Measurement::Report {
            ticket: item.ticket(self.slot),
            size,
        }
    }
}

fn apply_item<R: ItemRenderer>(
    state: &Rc<RefCell<SlotState<R::View>>>,
    renderer: &Rc<RefCell<R>>,
    next: Option<&BoundItem>,
) {
    let mut state = state.borrow_mut();
    let same_content = match (state.item.as_ref(), next) {
        (Some(current), Some(next)) => {
            current.key == next.key && current.generation == next.generation
        }
        (None, None) => true,
        _ => false,
    };
    if same_content {
        // Index-only moves keep the rendered view.
        state.item = next.cloned();
        return;
    }

    if let Some(view) = state.view.take() {
        renderer.borrow_mut().teardown(view);
    }
    state.item = next.cloned();
    if let Some(item) = next {
        state.view = Some(renderer.borrow_mut().render(&item.key, item.index));
        state.renders += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Log {
        rendered: Vec<ItemKey>,
        torn_down: Vec<ItemKey>,
    }

    impl ItemRenderer for Log {
        type View = ItemKey;

        fn render(&mut self, key: &ItemKey, _index: usize) -> ItemKey {
            self.rendered.push(key.clone());
            key.clone()
        }

        fn teardown(&mut self, view: ItemKey) {
            self.torn_down.push(view);
        }
    }

    fn bound(key: &str, index: usize, generation: u64) -> SlotValue {
        SlotValue::Item(Some(BoundItem {
            key: ItemKey::from(key),
            index,
            generation,
        }))
    }

    #[test]
    fn renders_on_bind_and_tears_down_on_unbind() {
        let store = BindingStore::new();
        let renderer = Rc::new(RefCell::new(Log::default()));
        let container = Container::mount(SlotId(0), &store, Rc::clone(&renderer));
        assert!(!container.is_rendering());

        store.set("itemKey:0", bound("a", 0, 1));
        assert!(container.is_rendering());
        assert_eq!(renderer.borrow().rendered, vec![ItemKey::from("a")]);

        store.set("itemKey:0", SlotValue::Item(None));
        assert!(!container.is_rendering());
        assert_eq!(renderer.borrow().torn_down, vec![ItemKey::from("a")]);
    }

    #[test]
    fn rebind_replaces_view() {
        let store = BindingStore::new();
        let renderer = Rc::new(RefCell::new(Log::default()));
        let container = Container::mount(SlotId(3), &store, Rc::clone(&renderer));

        store.set("itemKey:3", bound("a", 0, 1));
        store.set("itemKey:3", bound("b", 7, 3));

        assert_eq!(container.with_view(|view| view.cloned()), Some(ItemKey::from("b")));
        assert_eq!(container.render_count(), 2);
        assert_eq!(renderer.borrow().torn_down, vec![ItemKey::from("a")]);
    }

    #[test]
    fn index_shift_keeps_view() {
        let store = BindingStore::new();
        let renderer = Rc::new(RefCell::new(Log::default()));
        let container = Container::mount(SlotId(0), &store, Rc::clone(&renderer));

        store.set("itemKey:0", bound("a", 10, 1));
        store.set("itemKey:0", bound("a", 15, 1));

        assert_eq!(container.render_count(), 1);
        assert_eq!(container.item().map(|item| item.index), Some(15));
    }

    #[test]
    fn ignores_other_slots() {
        let store = BindingStore::new();
        let renderer = Rc::new(RefCell::new(Log::default()));
        let container = Container::mount(SlotId(0), &store, renderer);

        store.set("position:1", SlotValue::Position(AnchoredOffset::FromStart(40.0)));
        store.set("column:1", SlotValue::Column(2));

        assert_eq!(container.reposition_count(), 0);
        assert_eq!(container.position(), AnchoredOffset::FromStart(0.0));
    }

    #[test]
    fn mount_reads_existing_values() {
        let store = BindingStore::new();
        store.set("itemKey:2", bound("x", 4, 1));
        store.set("column:2", SlotValue::Column(1));
        store.set("trailingGap:2", SlotValue::TrailingGap(8.0));

        let container = Container::mount(SlotId(2), &store, Rc::new(RefCell::new(Log::default())));

        assert!(container.is_rendering());
        assert_eq!(container.column(), 1);
        assert_eq!(container.trailing_gap(), 8.0);
    }

    #[test]
    fn measurement_filtering() {
        let store = BindingStore::new();
        let container = Container::mount(SlotId(0), &store, Rc::new(RefCell::new(Log::default())));
        assert_eq!(container.measured(120.0, None), Measurement::Unbound);

        store.set("itemKey:0", bound("a", 0, 4));
        assert_eq!(container.measured(0.0, None), Measurement::Zero);
        assert_eq!(container.measured(199.94, Some(200.0)), Measurement::SameAsCached);
        assert_eq!(
            container.measured(199.96, None),
            Measurement::Report {
                ticket: MeasureTicket {
                    slot: SlotId(0),
                    generation: 4
                },
                size: 200.0
            }
        );
    }
}

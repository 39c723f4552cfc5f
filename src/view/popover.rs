use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

type Handler<T> = Box<dyn Fn(&T)>;

struct Listeners<T> {
    next_id: u64,
    entries: Vec<(u64, Handler<T>)>,
}

/// Dispatches pointer-down events to whoever is currently subscribed.
pub struct PointerEvents<T> {
    listeners: Rc<RefCell<Listeners<T>>>,
}

impl<T> Default for PointerEvents<T> {
    fn default() -> Self {
        Self {
            listeners: Rc::new(RefCell::new(Listeners {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }
}

impl<T> PointerEvents<T> {
    /// Registers `handler` until the returned guard is dropped.
    pub fn subscribe(&self, handler: impl Fn(&T) + 'static) -> Subscription<T> {
        let mut listeners = self.listeners.borrow_mut();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push((id, Box::new(handler)));
        Subscription {
            id,
            listeners: Rc::downgrade(&self.listeners),
        }
    }

    // handlers must not subscribe or unsubscribe while being called
    pub fn pointer_down(&self, target: &T) {
        for (_, handler) in self.listeners.borrow().entries.iter() {
            handler(target);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().entries.len()
    }
}

pub struct Subscription<T> {
    id: u64,
    listeners: Weak<RefCell<Listeners<T>>>,
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .borrow_mut()
                .entries
                .retain(|(id, _)| *id != self.id);
        }
    }
}

/// A popover that closes itself when the pointer goes down outside of it.
///
/// The outside-click listener only exists while the popover is open.
pub struct Popover<T> {
    dismissed: Rc<Cell<bool>>,
    subscription: Option<Subscription<T>>,
}

impl<T> Default for Popover<T> {
    fn default() -> Self {
        Self {
            dismissed: Rc::new(Cell::new(false)),
            subscription: None,
        }
    }
}

impl<T: 'static> Popover<T> {
    /// Opens the popover. `contains` tells whether an event target lies inside it.
    pub fn open(&mut self, events: &PointerEvents<T>, contains: impl Fn(&T) -> bool + 'static) {
        if self.subscription.is_some() {
            return;
        }
        self.dismissed.set(false);
        let dismissed = Rc::clone(&self.dismissed);
        self.subscription = Some(events.subscribe(move |target| {
            if !contains(target) {
                dismissed.set(true);
            }
        }));
    }

    pub fn close(&mut self) {
        self.subscription = None;
        self.dismissed.set(false);
    }

    /// Drops the listener if an outside click dismissed the popover. Returns
    /// whether the popover is still open.
    pub fn sync(&mut self) -> bool {
        if self.dismissed.get() {
            self.close();
        }
        self.subscription.is_some()
    }
}

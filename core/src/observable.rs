use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Handle returned by [`Observable::subscribe`], used to unsubscribe later.
///
/// Unique across all observables, so one id can be offered to several of them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

type Listener<T> = Box<dyn FnMut(&T)>;

/// A value that notifies its subscribers synchronously whenever it changes.
///
/// Only the owning crate can write to it; consumers may read and subscribe.
/// Writing a value equal to the current one is silent.
pub struct Observable<T> {
    value: T,
    version: u64,
    listeners: Vec<(SubscriptionId, Listener<T>)>,
}

impl<T> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            version: 0,
            listeners: Vec::new(),
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    /// Incremented on every change, used to invalidate derived caches.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&T) + 'static) -> SubscriptionId {
        let id = SubscriptionId::next();
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }

    fn notify(&mut self) {
        let Self {
            value, listeners, ..
        } = self;
        for (_, listener) in listeners.iter_mut() {
            listener(value);
        }
    }
}

impl<T: PartialEq> Observable<T> {
    /// Stores `value`, notifying subscribers only when it differs from the current one.
    pub(crate) fn set(&mut self, value: T) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        self.version += 1;
        self.notify();
        true
    }

    pub(crate) fn update(&mut self, f: impl FnOnce(&T) -> T) -> bool {
        let value = f(&self.value);
        self.set(value)
    }
}

impl<T: Copy> Observable<T> {
    pub fn value(&self) -> T {
        self.value
    }
}

impl<T: Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("value", &self.value)
            .field("version", &self.version)
            .field("subscribers", &self.listeners.len())
            .finish()
    }
}

/// Lazily computed value derived from an [`Observable`], cached per dependency version.
pub struct Memo<T> {
    cache: RefCell<Option<(u64, T)>>,
}

impl<T: Clone> Memo<T> {
    pub fn new() -> Self {
        Self {
            cache: RefCell::new(None),
        }
    }

    pub fn get_or_compute(&self, version: u64, compute: impl FnOnce() -> T) -> T {
        let mut cache = self.cache.borrow_mut();
        if let Some((cached_version, value)) = cache.as_ref() {
            if *cached_version == version {
                return value.clone();
            }
        }
        let value = compute();
        *cache = Some((version, value.clone()));
        value
    }
}

impl<T: Clone> Default for Memo<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo")
            .field("cache", &self.cache.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn set_notifies_subscribers_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut observable = Observable::new(0u16);

        let first = Rc::clone(&log);
        observable.subscribe(move |value| first.borrow_mut().push(("first", *value)));
        let second = Rc::clone(&log);
        observable.subscribe(move |value| second.borrow_mut().push(("second", *value)));

        assert!(observable.set(3));

        assert_eq!(*log.borrow(), vec![("first", 3), ("second", 3)]);
        assert_eq!(observable.version(), 1);
    }

    #[test]
    fn setting_equal_value_is_silent() {
        let calls = Rc::new(Cell::new(0));
        let mut observable = Observable::new(false);
        let counter = Rc::clone(&calls);
        observable.subscribe(move |_| counter.set(counter.get() + 1));

        assert!(!observable.set(false));
        assert!(observable.set(true));
        assert!(!observable.set(true));

        assert_eq!(calls.get(), 1);
        assert_eq!(observable.version(), 1);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let calls = Rc::new(Cell::new(0));
        let mut observable = Observable::new(0u32);
        let counter = Rc::clone(&calls);
        let id = observable.subscribe(move |_| counter.set(counter.get() + 1));

        observable.update(|value| value + 1);
        assert!(observable.unsubscribe(id));
        assert!(!observable.unsubscribe(id));
        observable.update(|value| value + 1);

        assert_eq!(calls.get(), 1);
        assert_eq!(observable.value(), 2);
        assert_eq!(observable.subscriber_count(), 0);
    }

    #[test]
    fn ids_are_unique_across_observables() {
        let mut first = Observable::new(0u8);
        let mut second = Observable::new(0u8);

        let id = first.subscribe(|_| {});
        second.subscribe(|_| {});

        assert!(!second.unsubscribe(id));
        assert!(first.unsubscribe(id));
    }

    #[test]
    fn memo_recomputes_only_after_dependency_changes() {
        let computations = Cell::new(0);
        let mut source = Observable::new(1u32);
        let memo = Memo::new();
        let read = |source: &Observable<u32>| {
            memo.get_or_compute(source.version(), || {
                computations.set(computations.get() + 1);
                source.value() * 10
            })
        };

        assert_eq!(read(&source), 10);
        assert_eq!(read(&source), 10);
        assert_eq!(computations.get(), 1);

        source.set(2);
        assert_eq!(read(&source), 20);
        assert_eq!(computations.get(), 2);
    }
}

// Shared, observable UI state
// Single-threaded: handles are Rc clones, listeners run synchronously on set

use std::cell::RefCell;
use std::rc::Rc;

type Listener<T> = Rc<dyn Fn(&T)>;

/// A value shared between the page and the pipeline, with change callbacks
pub struct Watch<T> {
    inner: Rc<WatchInner<T>>,
}

struct WatchInner<T> {
    value: RefCell<T>,
    listeners: RefCell<Vec<Listener<T>>>,
}

impl<T> Clone for Watch<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> Watch<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(WatchInner {
                value: RefCell::new(value),
                listeners: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    pub fn set(&self, value: T) {
        *self.inner.value.borrow_mut() = value;
        self.notify();
    }

    /// Mutate in place, then notify
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.inner.value.borrow_mut());
        self.notify();
    }

    pub fn subscribe(&self, listener: impl Fn(&T) + 'static) {
        self.inner.listeners.borrow_mut().push(Rc::new(listener));
    }

    fn notify(&self) {
        // Listeners may read or subscribe, so neither cell stays borrowed
        let value = self.get();
        let listeners: Vec<Listener<T>> = self.inner.listeners.borrow().clone();
        for listener in listeners {
            listener(&value);
        }
    }
}

impl<T: Clone + Default + 'static> Default for Watch<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Whether the create-group dialog is showing
///
/// Owned by the page; opened by the page's trigger and closed either by the
/// page or by a successful submission.
#[derive(Clone, Default)]
pub struct ModalVisibility(Watch<bool>);

impl ModalVisibility {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self) {
        self.0.set(true);
    }

    pub fn close(&self) {
        self.0.set(false);
    }

    pub fn is_open(&self) -> bool {
        self.0.get()
    }

    pub fn subscribe(&self, listener: impl Fn(bool) + 'static) {
        self.0.subscribe(move |open| listener(*open));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn listeners_see_every_change() {
        let watch = Watch::new(0u32);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        watch.subscribe(move |v| sink.borrow_mut().push(*v));

        watch.set(1);
        watch.update(|v| *v += 10);

        assert_eq!(*seen.borrow(), vec![1, 11]);
        assert_eq!(watch.get(), 11);
    }

    #[test]
    fn listener_can_read_back_without_panicking() {
        let watch = Watch::new(String::from("a"));
        let reader = watch.clone();
        let matched = Rc::new(Cell::new(false));
        let flag = matched.clone();
        watch.subscribe(move |v| flag.set(*v == reader.get()));

        watch.set("b".into());
        assert!(matched.get());
    }

    #[test]
    fn modal_visibility_is_shared_between_clones() {
        let page = ModalVisibility::new();
        let dialog = page.clone();
        page.open();
        assert!(dialog.is_open());
        dialog.close();
        assert!(!page.is_open());
    }
}

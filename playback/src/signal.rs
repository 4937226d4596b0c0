use std::cell::RefCell;
use std::rc::{Rc, Weak};

type Callback<T> = Rc<dyn Fn(&T)>;

struct Inner<T> {
    value: T,
    next_id: usize,
    subscribers: Vec<(usize, Callback<T>)>,
}

/// A value that notifies subscribers whenever it's set. New subscribers immediately get called
/// with the latest value. Cloning a signal shares the same value.
pub struct Signal<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + 'static> Signal<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                value,
                next_id: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    pub fn set(&self, value: T) {
        let subscribers: Vec<Callback<T>> = {
            let mut inner = self.inner.borrow_mut();
            inner.value = value.clone();
            inner.subscribers.iter().map(|(_, cb)| cb.clone()).collect()
        };
        // Callbacks may read or set this signal again, so nothing can be borrowed here
        for cb in subscribers {
            cb(&value);
        }
    }

    pub fn subscribe<F: Fn(&T) + 'static>(&self, cb: F) -> Subscription<T> {
        let cb: Callback<T> = Rc::new(cb);
        let (id, latest) = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.subscribers.push((id, cb.clone()));
            (id, inner.value.clone())
        };
        cb(&latest);
        Subscription {
            id,
            signal: Rc::downgrade(&self.inner),
        }
    }
}

#[must_use]
pub struct Subscription<T> {
    id: usize,
    signal: Weak<RefCell<Inner<T>>>,
}

impl<T> Subscription<T> {
    pub fn unsubscribe(self) {
        if let Some(inner) = self.signal.upgrade() {
            inner.borrow_mut().subscribers.retain(|(id, _)| *id != self.id);
        }
    }
}

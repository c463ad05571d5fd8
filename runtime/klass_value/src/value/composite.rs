//! Reference kinds: slices, maps, channels and functions.
//!
//! Each has a nil state distinct from "empty": a nil slice has no backing
//! storage, an empty one does. Clones share storage.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use klass_types::{registry, ClassInfo};
use rustc_hash::FxHashMap;

use super::{Address, Value};

/// A growable sequence of values.
#[derive(Clone)]
pub struct Slice {
    elem: &'static ClassInfo,
    items: Option<Rc<RefCell<Vec<Value>>>>,
}

impl Slice {
    /// The nil slice of `elem`.
    #[inline]
    pub fn nil(elem: &'static ClassInfo) -> Self {
        Slice { elem, items: None }
    }

    /// An empty, non-nil slice.
    pub fn new(elem: &'static ClassInfo) -> Self {
        Self::from_values(elem, Vec::new())
    }

    pub fn from_values(elem: &'static ClassInfo, values: Vec<Value>) -> Self {
        Slice {
            elem,
            items: Some(Rc::new(RefCell::new(values))),
        }
    }

    #[inline]
    pub fn elem(&self) -> &'static ClassInfo {
        self.elem
    }

    pub fn class(&self) -> &'static ClassInfo {
        registry().slice_of(self.elem)
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        self.items.is_none()
    }

    pub fn len(&self) -> usize {
        self.items.as_ref().map_or(0, |items| items.borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append, allocating storage for a nil slice.
    pub fn push(&mut self, value: Value) {
        self.items
            .get_or_insert_with(|| Rc::new(RefCell::new(Vec::new())))
            .borrow_mut()
            .push(value);
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.items.as_ref()?.borrow().get(index).cloned()
    }

    pub fn address(&self) -> Address {
        self.items.as_ref().map_or(Address::NULL, Address::of)
    }
}

impl fmt::Debug for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.items {
            None => write!(f, "[{}](nil)", self.elem.name()),
            Some(items) => f.debug_list().entries(items.borrow().iter()).finish(),
        }
    }
}

/// A string-keyed map.
#[derive(Clone)]
pub struct MapValue {
    value_type: &'static ClassInfo,
    entries: Option<Rc<RefCell<FxHashMap<String, Value>>>>,
}

impl MapValue {
    #[inline]
    pub fn nil(value_type: &'static ClassInfo) -> Self {
        MapValue {
            value_type,
            entries: None,
        }
    }

    pub fn new(value_type: &'static ClassInfo) -> Self {
        MapValue {
            value_type,
            entries: Some(Rc::new(RefCell::new(FxHashMap::default()))),
        }
    }

    #[inline]
    pub fn value_type(&self) -> &'static ClassInfo {
        self.value_type
    }

    pub fn class(&self) -> &'static ClassInfo {
        registry().map_of(self.value_type)
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        self.entries.is_none()
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |entries| entries.borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert or replace an entry.
    ///
    /// A nil map has nowhere to store it: returns `false` and drops the value.
    pub fn insert(&self, key: impl Into<String>, value: Value) -> bool {
        let Some(entries) = &self.entries else {
            tracing::debug!(value_type = self.value_type.name(), "insert into nil map ignored");
            return false;
        };
        entries.borrow_mut().insert(key.into(), value);
        true
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.as_ref()?.borrow().get(key).cloned()
    }

    pub fn address(&self) -> Address {
        self.entries.as_ref().map_or(Address::NULL, Address::of)
    }
}

impl fmt::Debug for MapValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.entries {
            None => write!(f, "map[String]{}(nil)", self.value_type.name()),
            Some(entries) => f.debug_map().entries(entries.borrow().iter()).finish(),
        }
    }
}

struct ChanState {
    capacity: usize,
    queue: VecDeque<Value>,
}

/// A buffered, single-threaded channel.
#[derive(Clone)]
pub struct Chan {
    elem: &'static ClassInfo,
    state: Option<Rc<RefCell<ChanState>>>,
}

impl Chan {
    #[inline]
    pub fn nil(elem: &'static ClassInfo) -> Self {
        Chan { elem, state: None }
    }

    pub fn with_capacity(elem: &'static ClassInfo, capacity: usize) -> Self {
        Chan {
            elem,
            state: Some(Rc::new(RefCell::new(ChanState {
                capacity,
                queue: VecDeque::with_capacity(capacity),
            }))),
        }
    }

    #[inline]
    pub fn elem(&self) -> &'static ClassInfo {
        self.elem
    }

    pub fn class(&self) -> &'static ClassInfo {
        registry().chan_of(self.elem)
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        self.state.is_none()
    }

    pub fn capacity(&self) -> usize {
        self.state.as_ref().map_or(0, |state| state.borrow().capacity)
    }

    pub fn len(&self) -> usize {
        self.state.as_ref().map_or(0, |state| state.borrow().queue.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queue a value. Hands it back if the channel is nil or full.
    pub fn send(&self, value: Value) -> Result<(), Value> {
        let Some(state) = &self.state else {
            return Err(value);
        };
        let mut state = state.borrow_mut();
        if state.queue.len() >= state.capacity {
            return Err(value);
        }
        state.queue.push_back(value);
        Ok(())
    }

    /// Take the oldest queued value.
    pub fn recv(&self) -> Option<Value> {
        self.state.as_ref()?.borrow_mut().queue.pop_front()
    }

    pub fn address(&self) -> Address {
        self.state.as_ref().map_or(Address::NULL, Address::of)
    }
}

impl fmt::Debug for Chan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nil() {
            write!(f, "chan {}(nil)", self.elem.name())
        } else {
            write!(f, "chan {}[{}/{}]", self.elem.name(), self.len(), self.capacity())
        }
    }
}

type Callable = Rc<dyn Fn(&[Value]) -> Value>;

/// A dynamically typed function.
#[derive(Clone, Default)]
pub struct Func {
    target: Option<Callable>,
}

impl Func {
    pub fn new(f: impl Fn(&[Value]) -> Value + 'static) -> Self {
        Func {
            target: Some(Rc::new(f)),
        }
    }

    #[inline]
    pub fn nil() -> Self {
        Func { target: None }
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        self.target.is_none()
    }

    /// Call the function. `None` for a nil function.
    pub fn call(&self, args: &[Value]) -> Option<Value> {
        self.target.as_ref().map(|f| f(args))
    }

    pub fn address(&self) -> Address {
        self.target.as_ref().map_or(Address::NULL, Address::of)
    }
}

impl fmt::Debug for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nil() {
            write!(f, "fn(nil)")
        } else {
            write!(f, "fn@{}", self.address())
        }
    }
}

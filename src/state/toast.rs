//! Transient notifications
//!
//! A toast is visible for the configured timeout, then fades for a
//! short moment before it is removed. The timers themselves are iced
//! tasks owned by the app; this module only tracks the list.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Ok,
    Err,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: u64,
    pub kind: ToastKind,
    pub message: String,
    pub fading: bool,
}

#[derive(Debug, Default)]
pub struct Toasts {
    next_id: u64,
    items: Vec<Toast>,
}

impl Toasts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a toast and return its id
    pub fn push(&mut self, kind: ToastKind, message: impl Into<String>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.items.push(Toast {
            id,
            kind,
            message: message.into(),
            fading: false,
        });
        id
    }

    /// Start fading a toast. Returns false if it is already gone.
    pub fn fade(&mut self, id: u64) -> bool {
        match self.items.iter_mut().find(|t| t.id == id) {
            Some(toast) => {
                toast.fading = true;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: u64) {
        self.items.retain(|t| t.id != id);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of error toasts currently shown
    #[cfg(test)]
    pub fn error_count(&self) -> usize {
        self.items.iter().filter(|t| t.kind == ToastKind::Err).count()
    }
}

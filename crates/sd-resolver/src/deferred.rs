use crate::*;

type Thunk<T> = Box<dyn FnOnce(&Referencer<'_>) -> Result<T, SchemaError>>;

struct DeferredCell<T> {
    label: String,
    value: OnceCell<T>,
    thunk: Cell<Option<Thunk<T>>>,
}

/// A compute-once cell holding a cross-reference that is resolved lazily.
///
/// The thunk runs at most once. Re-entering a cell while its own thunk is
/// running is reported as `DEFERRED_CYCLE`.
pub struct Deferred<T>(Rc<DeferredCell<T>>);

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: 'static> Deferred<T> {
    pub(crate) fn new(
        label: impl Into<String>,
        thunk: impl FnOnce(&Referencer<'_>) -> Result<T, SchemaError> + 'static,
    ) -> Self {
        Self(Rc::new(DeferredCell {
            label: label.into(),
            value: OnceCell::new(),
            thunk: Cell::new(Some(Box::new(thunk))),
        }))
    }

    pub(crate) fn ready(label: impl Into<String>, value: T) -> Self {
        let cell = OnceCell::new();
        let _ = cell.set(value);
        Self(Rc::new(DeferredCell {
            label: label.into(),
            value: cell,
            thunk: Cell::new(None),
        }))
    }

    pub(crate) fn force(&self, referencer: &Referencer<'_>) -> Result<&T, SchemaError> {
        if let Some(value) = self.0.value.get() {
            return Ok(value);
        }

        let Some(thunk) = self.0.thunk.take() else {
            return Err(SchemaError::new(
                "DEFERRED_CYCLE",
                format!(
                    "\"{}\" requires its own value while it is being computed.",
                    self.0.label
                ),
            ));
        };

        let value = thunk(referencer)?;
        Ok(self.0.value.get_or_init(|| value))
    }
}

impl<T> Deferred<T> {
    pub fn label(&self) -> &str {
        &self.0.label
    }

    pub fn is_ready(&self) -> bool {
        self.0.value.get().is_some()
    }

    pub fn try_get(&self) -> Option<&T> {
        self.0.value.get()
    }

    /// The computed value; only valid once resolution has completed.
    pub fn get(&self) -> &T {
        self.0
            .value
            .get()
            .expect("deferred cells are forced before resolution completes")
    }
}

impl<T: fmt::Debug> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.value.get() {
            Some(value) => write!(f, "Deferred({}: {:?})", self.0.label, value),
            None => write!(f, "Deferred({}: <pending>)", self.0.label),
        }
    }
}

pub(crate) trait Force {
    fn force_erased(&self, referencer: &Referencer<'_>) -> Result<(), SchemaError>;
}

impl<T: 'static> Force for Deferred<T> {
    fn force_erased(&self, referencer: &Referencer<'_>) -> Result<(), SchemaError> {
        self.force(referencer).map(|_| ())
    }
}

/// Cells registered but not yet forced.
#[derive(Default)]
pub(crate) struct WorkQueue {
    pending: RefCell<Vec<Box<dyn Force>>>,
}

impl WorkQueue {
    pub(crate) fn defer<T: 'static>(
        &self,
        label: impl Into<String>,
        thunk: impl FnOnce(&Referencer<'_>) -> Result<T, SchemaError> + 'static,
    ) -> Deferred<T> {
        let cell = Deferred::new(label, thunk);
        self.pending.borrow_mut().push(Box::new(cell.clone()));
        cell
    }

    pub(crate) fn take(&self) -> Vec<Box<dyn Force>> {
        std::mem::take(&mut *self.pending.borrow_mut())
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.borrow().len()
    }
}

#[cfg(test)]
mod deferred_tests {
    use super::*;

    #[test]
    fn thunk_runs_once_and_value_is_memoized() {
        let session = SchemaResolver::create(&[]).expect("empty session");
        let referencer = session.referencer();
        let runs = Rc::new(Cell::new(0));
        let counter = Rc::clone(&runs);
        let cell = Deferred::new("answer", move |_| {
            counter.set(counter.get() + 1);
            Ok(42)
        });

        assert!(!cell.is_ready());
        assert_eq!(*cell.force(&referencer).expect("first force"), 42);
        assert_eq!(*cell.force(&referencer).expect("second force"), 42);
        assert_eq!(runs.get(), 1);
        assert_eq!(*cell.get(), 42);
    }

    #[test]
    fn self_dependent_cell_reports_cycle() {
        let session = SchemaResolver::create(&[]).expect("empty session");
        let referencer = session.referencer();
        let slot: Rc<RefCell<Option<Deferred<u32>>>> = Rc::new(RefCell::new(None));
        let inner = Rc::clone(&slot);
        let cell = Deferred::new("Loop.value", move |referencer| {
            let me = inner.borrow().clone().expect("slot should be filled");
            me.force(referencer).map(|value| value + 1)
        });
        *slot.borrow_mut() = Some(cell.clone());

        let error = cell.force(&referencer).expect_err("cycle should fail");
        assert_eq!(error.code, "DEFERRED_CYCLE");
        assert!(error.message.contains("Loop.value"));
        assert!(cell.try_get().is_none());
    }

    #[test]
    fn queue_hands_out_pending_cells_once() {
        let queue = WorkQueue::default();
        let first = queue.defer("a", |_| Ok(1_u8));
        let _second = queue.defer("b", |_| Ok(2_u8));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.take().len(), 2);
        assert_eq!(queue.len(), 0);
        assert_eq!(first.label(), "a");
        assert!(format!("{:?}", first).contains("<pending>"));
    }
}

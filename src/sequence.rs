use crate::future::Future;
use crate::job::Job;
use crate::shared::SharedFuture;
use crate::state::SharedState;

/// Object-safe view of a shared state: just enough for the composition
/// primitives to subscribe to inputs of differing value types.
#[doc(hidden)]
pub trait StateCore: Send + Sync {
    fn subscribe(&self, job: Job);
    fn ready(&self) -> bool;
}

impl<T: Send + 'static> StateCore for SharedState<T> {
    fn subscribe(&self, job: Job) {
        self.push(job);
    }

    fn ready(&self) -> bool {
        self.is_ready()
    }
}

/// A future usable as an element of a [`Sequence`].
#[doc(hidden)]
pub trait SequenceItem: Send + 'static {
    fn item_state(&self) -> &dyn StateCore;
}

impl<T: Send + 'static> SequenceItem for Future<T> {
    fn item_state(&self) -> &dyn StateCore {
        &*self.state
    }
}

impl<T: Send + 'static> SequenceItem for SharedFuture<T> {
    fn item_state(&self) -> &dyn StateCore {
        &*self.state
    }
}

/// An owned collection of futures accepted by
/// [`when_all`](crate::when_all) and [`when_any`](crate::when_any).
///
/// Implemented for vectors of unique or shared futures and for tuples of
/// futures (possibly of mixed kinds and element types) up to arity eight.
pub trait Sequence: Send + Sized + 'static {
    /// Number of futures in the collection.
    fn len(&self) -> usize;

    /// True for the empty collection.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[doc(hidden)]
    fn for_each_state(&self, f: &mut dyn FnMut(&dyn StateCore));

    /// Position of the first ready future, `usize::MAX` when none is.
    fn ready_index(&self) -> usize;
}

impl<I: SequenceItem> Sequence for Vec<I> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn for_each_state(&self, f: &mut dyn FnMut(&dyn StateCore)) {
        for item in self {
            f(item.item_state());
        }
    }

    fn ready_index(&self) -> usize {
        self.iter()
            .position(|item| item.item_state().ready())
            .unwrap_or(usize::MAX)
    }
}

impl Sequence for () {
    fn len(&self) -> usize {
        0
    }

    fn for_each_state(&self, _: &mut dyn FnMut(&dyn StateCore)) {}

    fn ready_index(&self) -> usize {
        usize::MAX
    }
}

macro_rules! tuple_sequence {
    ($($idx:tt $item:ident),+) => {
        impl<$($item: SequenceItem),+> Sequence for ($($item,)+) {
            fn len(&self) -> usize {
                let mut len = 0;
                $( let _ = &self.$idx; len += 1; )+
                len
            }

            fn for_each_state(&self, f: &mut dyn FnMut(&dyn StateCore)) {
                $( f(self.$idx.item_state()); )+
            }

            fn ready_index(&self) -> usize {
                $(
                    if self.$idx.item_state().ready() {
                        return $idx;
                    }
                )+
                usize::MAX
            }
        }
    };
}

tuple_sequence!(0 A);
tuple_sequence!(0 A, 1 B);
tuple_sequence!(0 A, 1 B, 2 C);
tuple_sequence!(0 A, 1 B, 2 C, 3 D);
tuple_sequence!(0 A, 1 B, 2 C, 3 D, 4 E);
tuple_sequence!(0 A, 1 B, 2 C, 3 D, 4 E, 5 F);
tuple_sequence!(0 A, 1 B, 2 C, 3 D, 4 E, 5 F, 6 G);
tuple_sequence!(0 A, 1 B, 2 C, 3 D, 4 E, 5 F, 6 G, 7 H);

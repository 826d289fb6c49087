//! Continuation-chaining futures and promises
//!
//! A [`Promise`] produces, a [`Future`] consumes, and a lock-free shared
//! state in between mediates, with no runtime and no global state.
//! Consumers chain work directly onto the state instead of polling it:
//!
//!```text
//! ┌──────────┐ set_value  ┌──────────────┐  drain   ┌─────────────────┐
//! │ Promise  │ ─────────► │ shared state │ ───────► │ continuations   │
//! │ (once)   │            │ value | err  │  (LIFO)  │ then/map/notify │
//! └──────────┘            └──────────────┘          └─────────────────┘
//!                                ▲
//!                 Future::get / wait / await
//!```
//!
//! ## How it works
//!
//! Every state carries a once-consumable lock-free stack of continuations.
//! Fulfilment stores the result, consumes the stack with a single atomic
//! exchange and runs the drained continuations; a continuation attached
//! after that point runs inline on the attaching thread. The exchange's
//! acquire/release pairing guarantees that whoever observes the consumed
//! stack also observes the stored result.
//!
//! | Operation | Runs on |
//! |-----------|---------|
//! | `then`/`map`/`and_then` before readiness | the fulfilling thread |
//! | the same, after readiness | the attaching thread |
//! | `*_via(exec, ..)` | wherever the [`Executor`] runs work |
//!
//! ## Composition
//!
//! [`when_all`] resolves once every input future does, [`when_any`] as soon
//! as one is ready; both hand the input futures back unconsumed.
//! Continuations returning futures are implicitly unwrapped: chaining
//! never produces a future of a future (see [`Chained`]).
//!
//! ## Cancellation and errors
//!
//! Dropping a producer, or an executor discarding posted work, resolves the
//! affected futures with [`Error::BrokenPromise`]; no consumer is ever left
//! blocked on an abandoned state. User errors travel as [`Error`] values
//! through the same channel as values.
//!
//! ## Async support
//!
//! With the `async` feature (default), [`Future`] and [`SharedFuture`]
//! implement [`std::future::Future`] and can be awaited from any runtime;
//! the waker rides the continuation list like every other consumer.
//!
//! ## Example
//!
//!```
//! use presto::{Promise, when_all};
//!
//! let mut p = Promise::<i32>::new();
//! let doubled = p.get_future().unwrap().map(|x| x * 2);
//! let all = when_all(vec![doubled]);
//! p.set_value(21);
//! let mut done = all.get().unwrap();
//! assert_eq!(done.remove(0).get().unwrap(), 42);
//!```

mod chain;
mod error;
mod executor;
mod future;
mod job;
mod latch;
mod packaged_task;
mod promise;
mod sequence;
mod shared;
mod stack;
mod state;
mod timed_waiter;
mod when_all;
mod when_any;

pub use chain::{ChainHandle, Chained};
pub use error::Error;
pub use executor::{Executor, InlineExecutor, spawn, spawn_flat};
pub use future::{Future, WaitStatus};
pub use job::Job;
pub use latch::Latch;
pub use packaged_task::PackagedTask;
pub use promise::Promise;
pub use sequence::{Sequence, SequenceItem, StateCore};
pub use shared::SharedFuture;
pub use timed_waiter::TimedWaiter;
pub use when_all::when_all;
pub use when_any::{WhenAny, when_any};

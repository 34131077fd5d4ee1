//! Actor sources.
//!
//! The guard asks its [`ActorSource`] for the current actor on every access.
//! [`FixedActor`] carries an explicit actor for one unit of work.
//! [`ScopedActor`] reads a thread-local stack that [`ScopedActor::enter`]
//! pushes onto. The returned [`ActorScope`] removes exactly its own entry when
//! dropped, in whatever order scopes end, so an outer actor comes back once
//! every inner scope is gone and other threads never see it.

use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Supplies the actor performing the current access
pub trait ActorSource<A>: Send + Sync {
    /// Current actor, `None` when anonymous
    fn current(&self) -> Option<A>;
}

impl<A, S: ActorSource<A> + ?Sized> ActorSource<A> for Arc<S> {
    fn current(&self) -> Option<A> {
        (**self).current()
    }
}

/// Explicit actor, fixed at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedActor<A> {
    actor: Option<A>,
}

impl<A> FixedActor<A> {
    /// Act as `actor`
    #[must_use]
    pub fn new(actor: A) -> Self {
        Self { actor: Some(actor) }
    }

    /// Act anonymously
    #[must_use]
    pub fn anonymous() -> Self {
        Self { actor: None }
    }
}

impl<A> From<Option<A>> for FixedActor<A> {
    fn from(actor: Option<A>) -> Self {
        Self { actor }
    }
}

impl<A: Clone + Send + Sync> ActorSource<A> for FixedActor<A> {
    fn current(&self) -> Option<A> {
        self.actor.clone()
    }
}

/// Adapter for any `Fn() -> Option<A>`
pub struct FnActorSource<F> {
    current: F,
}

impl<F> FnActorSource<F> {
    /// Wrap `current`
    #[must_use]
    pub fn new(current: F) -> Self {
        Self { current }
    }
}

impl<A, F> ActorSource<A> for FnActorSource<F>
where
    F: Fn() -> Option<A> + Send + Sync,
{
    fn current(&self) -> Option<A> {
        (self.current)()
    }
}

impl<F> fmt::Debug for FnActorSource<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnActorSource").finish_non_exhaustive()
    }
}

/// Entries keyed by the id of the scope that pushed them
type ScopeStacks = HashMap<TypeId, Vec<(u64, Option<Box<dyn Any>>)>>;

thread_local! {
    static SCOPES: RefCell<ScopeStacks> = RefCell::new(HashMap::new());
    static NEXT_SCOPE_ID: Cell<u64> = const { Cell::new(0) };
}

/// Thread-local, scoped actor of type `A`
pub struct ScopedActor<A> {
    _actor: PhantomData<fn() -> A>,
}

impl<A: Clone + 'static> ScopedActor<A> {
    /// Source reading the calling thread's innermost scope
    #[must_use]
    pub fn new() -> Self {
        Self { _actor: PhantomData }
    }

    /// Make `actor` current on this thread until the scope drops
    #[must_use = "the actor is only current while the scope is alive"]
    pub fn enter(actor: A) -> ActorScope {
        Self::push(Some(Box::new(actor)))
    }

    /// Make the anonymous actor current on this thread until the scope drops
    #[must_use = "the actor is only current while the scope is alive"]
    pub fn enter_anonymous() -> ActorScope {
        Self::push(None)
    }

    /// Innermost actor on this thread
    #[must_use]
    pub fn get() -> Option<A> {
        SCOPES.with(|scopes| {
            scopes
                .borrow()
                .get(&TypeId::of::<A>())
                .and_then(|stack| stack.last())
                .and_then(|(_, actor)| actor.as_ref())
                .and_then(|actor| actor.downcast_ref::<A>())
                .cloned()
        })
    }

    fn push(entry: Option<Box<dyn Any>>) -> ActorScope {
        let type_id = TypeId::of::<A>();
        let id = NEXT_SCOPE_ID.with(|next| {
            let id = next.get();
            next.set(id.wrapping_add(1));
            id
        });
        SCOPES.with(|scopes| scopes.borrow_mut().entry(type_id).or_default().push((id, entry)));
        ActorScope {
            type_id,
            id,
            _thread_bound: PhantomData,
        }
    }
}

impl<A: Clone + 'static> Default for ScopedActor<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for ScopedActor<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedActor").finish()
    }
}

impl<A: Clone + 'static> ActorSource<A> for ScopedActor<A> {
    fn current(&self) -> Option<A> {
        Self::get()
    }
}

/// Removes its own actor when dropped, in any order relative to other
/// scopes. Not `Send`: it belongs to the thread whose stack it pushed onto.
#[derive(Debug)]
pub struct ActorScope {
    type_id: TypeId,
    id: u64,
    _thread_bound: PhantomData<*const ()>,
}

impl Drop for ActorScope {
    fn drop(&mut self) {
        // Thread-local may already be gone during thread teardown
        let removed = SCOPES
            .try_with(|scopes| {
                let mut scopes = scopes.borrow_mut();
                let stack = scopes.get_mut(&self.type_id)?;
                let position = stack.iter().rposition(|(id, _)| *id == self.id)?;
                Some(stack.remove(position))
            })
            .ok()
            .flatten();
        drop(removed);
    }
}

//! Local values that change before the server confirms them

/// A pending change returned by [`Optimistic::apply`]
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct Pending<T> {
    previous: T,
    next: T,
    generation: u64,
}

impl<T> Pending<T> {
    /// Value before the change
    pub const fn previous(&self) -> &T {
        &self.previous
    }

    /// Value the change applied
    pub const fn next(&self) -> &T {
        &self.next
    }
}

/// How a successful commit landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    /// The local value is the confirmed value
    Confirmed,
    /// A newer change was applied meanwhile; its own commit decides
    Superseded,
}

/// A locally cached value updated optimistically
///
/// Each [`apply`](Self::apply) bumps a generation. When a commit fails,
/// [`settle`](Self::settle) restores the previous value only if no newer
/// change has been applied since, so a late failure never clobbers a newer
/// optimistic value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Optimistic<T> {
    value: T,
    generation: u64,
}

impl<T: Clone> Optimistic<T> {
    /// Start from a known server value
    pub const fn new(value: T) -> Self {
        Self {
            value,
            generation: 0,
        }
    }

    /// Current local value
    pub const fn get(&self) -> &T {
        &self.value
    }

    /// Replace the local value immediately
    pub fn apply(&mut self, next: T) -> Pending<T> {
        self.generation += 1;
        let previous = std::mem::replace(&mut self.value, next.clone());
        Pending {
            previous,
            next,
            generation: self.generation,
        }
    }

    /// Reconcile with the commit's outcome
    pub fn settle<E>(&mut self, pending: Pending<T>, result: Result<(), E>) -> Result<Settled, E> {
        let current = pending.generation == self.generation;
        match result {
            Ok(()) if current => Ok(Settled::Confirmed),
            Ok(()) => Ok(Settled::Superseded),
            Err(e) => {
                if current {
                    self.value = pending.previous;
                }
                Err(e)
            }
        }
    }

    /// Reconcile a failed commit that left the server at `actual`
    ///
    /// Used when the failure could not be fully undone, so neither the
    /// previous nor the applied value matches the server.
    pub fn settle_at<E>(&mut self, pending: Pending<T>, error: E, actual: T) -> Result<Settled, E> {
        if pending.generation == self.generation {
            self.value = actual;
        }
        Err(error)
    }
}

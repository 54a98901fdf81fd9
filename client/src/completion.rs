//! single assignment result cell bridging a transport's terminal event to its consumer.
//!
//! [Completer] is the write half owned by the exchange. [Pending] is the read half that can be
//! consumed in one of three ways: blocking wait, callback or future.

use core::{
    fmt,
    future::Future,
    mem,
    pin::Pin,
    task::{Context, Poll, Waker},
    time::Duration,
};

use std::{
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    time::Instant,
};

use tracing::debug;

use crate::{error::Error, response::Response};

type Callback<T> = Box<dyn FnOnce(Result<T, Error>) + Send>;

enum State<T> {
    Waiting {
        waker: Option<Waker>,
        callback: Option<Callback<T>>,
    },
    Done(Result<T, Error>),
    Taken,
}

struct Inner<T> {
    state: Mutex<State<T>>,
    cond: Condvar,
}

impl<T> Inner<T> {
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set(&self, res: Result<T, Error>) {
        let mut state = self.lock();

        match mem::replace(&mut *state, State::Taken) {
            State::Waiting { waker, callback } => {
                match callback {
                    // callback consumes the result. it runs outside of lock.
                    Some(callback) => {
                        drop(state);
                        callback(res);
                    }
                    None => {
                        *state = State::Done(res);
                        drop(state);
                        self.cond.notify_all();
                    }
                }
                if let Some(waker) = waker {
                    waker.wake();
                }
            }
            // already completed. first result wins.
            prev => *state = prev,
        }
    }
}

/// create a connected pair of write and read half.
pub(crate) fn completion<T>() -> (Completer<T>, Pending<T>) {
    let inner = Arc::new(Inner {
        state: Mutex::new(State::Waiting {
            waker: None,
            callback: None,
        }),
        cond: Condvar::new(),
    });
    (Completer { inner: Some(inner.clone()) }, Pending { inner })
}

/// write half of the cell. dropping it without a result completes the cell with
/// [Error::Interrupted].
pub(crate) struct Completer<T> {
    inner: Option<Arc<Inner<T>>>,
}

impl<T> Completer<T> {
    pub(crate) fn complete(mut self, res: Result<T, Error>) {
        if let Some(inner) = self.inner.take() {
            inner.set(res);
        }
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            debug!("exchange abandoned without terminal event");
            inner.set(Err(Error::Interrupted));
        }
    }
}

/// read half of a single assignment result cell.
pub struct Pending<T> {
    inner: Arc<Inner<T>>,
}

impl<T> fmt::Debug for Pending<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending").field("done", &self.is_done()).finish()
    }
}

impl<T> Pending<T> {
    /// cell holds a result that is not yet taken.
    pub fn is_done(&self) -> bool {
        matches!(*self.inner.lock(), State::Done(_))
    }

    /// block current thread until a result is available or timeout elapsed.
    ///
    /// timing out does not cancel the exchange. it keeps running and its result is discarded.
    pub fn wait(self, timeout: Duration) -> Result<T, Error> {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.inner.lock();

        loop {
            match *state {
                State::Done(_) => {
                    return match mem::replace(&mut *state, State::Taken) {
                        State::Done(res) => res,
                        _ => Err(Error::Interrupted),
                    };
                }
                State::Taken => return Err(Error::Interrupted),
                State::Waiting { .. } => {}
            }

            state = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        debug!("wait timed out after {timeout:?}");
                        return Err(Error::WaitTimeout(timeout));
                    }
                    self.inner
                        .cond
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                // deadline beyond representable instant. wait without bound.
                None => self.inner.cond.wait(state).unwrap_or_else(PoisonError::into_inner),
            };
        }
    }

    /// register the callback receiving the result. when result is already available the callback
    /// runs immediately on the calling thread.
    pub fn on_complete<F>(self, f: F)
    where
        F: FnOnce(Result<T, Error>) + Send + 'static,
    {
        let mut state = self.inner.lock();
        match mem::replace(&mut *state, State::Taken) {
            State::Done(res) => {
                drop(state);
                f(res);
            }
            State::Waiting { waker, .. } => {
                *state = State::Waiting {
                    waker,
                    callback: Some(Box::new(f)),
                };
            }
            State::Taken => {
                drop(state);
                f(Err(Error::Interrupted));
            }
        }
    }

    /// take the result when it's available. later reads of a taken result resolve to
    /// [Error::Interrupted].
    pub fn try_take(&mut self) -> Option<Result<T, Error>> {
        let mut state = self.inner.lock();
        match *state {
            State::Done(_) => match mem::replace(&mut *state, State::Taken) {
                State::Done(res) => Some(res),
                _ => None,
            },
            _ => None,
        }
    }
}

impl<T> Future for Pending<T> {
    type Output = Result<T, Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.inner.lock();
        match mem::replace(&mut *state, State::Taken) {
            State::Done(res) => Poll::Ready(res),
            State::Waiting { callback, .. } => {
                *state = State::Waiting {
                    waker: Some(cx.waker().clone()),
                    callback,
                };
                Poll::Pending
            }
            State::Taken => Poll::Ready(Err(Error::Interrupted)),
        }
    }
}

/// callback style view of an exchange result.
#[derive(Debug)]
pub struct Listenable<T> {
    pending: Pending<T>,
}

/// callback style view of a response.
pub type ListenableResponse = Listenable<Response>;

impl<T> Listenable<T> {
    pub(crate) fn new(pending: Pending<T>) -> Self {
        Self { pending }
    }

    pub fn is_done(&self) -> bool {
        self.pending.is_done()
    }

    /// register the single completion callback. it receives either the response or the failure.
    /// when the exchange already completed the callback runs immediately on the calling thread.
    pub fn on_complete<F>(self, f: F)
    where
        F: FnOnce(Result<T, Error>) + Send + 'static,
    {
        self.pending.on_complete(f)
    }

    /// block for the result.
    pub fn get(self, timeout: Duration) -> Result<T, Error> {
        self.pending.wait(timeout)
    }
}

/// promise style view of an exchange result. await it or poll it with [Promise::try_take].
#[derive(Debug)]
pub struct Promise<T> {
    pending: Pending<T>,
}

/// promise style view of a response.
pub type ResponseFuture = Promise<Response>;

impl<T> Promise<T> {
    pub(crate) fn new(pending: Pending<T>) -> Self {
        Self { pending }
    }

    pub fn is_done(&self) -> bool {
        self.pending.is_done()
    }

    pub fn try_take(&mut self) -> Option<Result<T, Error>> {
        self.pending.try_take()
    }

    /// block for the result.
    pub fn get(self, timeout: Duration) -> Result<T, Error> {
        self.pending.wait(timeout)
    }
}

impl<T> Future for Promise<T> {
    type Output = Result<T, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.pending).poll(cx)
    }
}

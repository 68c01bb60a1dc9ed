use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;

use super::impl_operator;
use crate::{
  error::{Fault, RxError},
  observable::Observable,
  observer::Observer,
  scheduler::{Scheduler, TaskHandle},
  subject::Subject,
  token::Token,
};

/// Emit the most recent value once the source has been quiet for
/// `duration`.
///
/// Every source value re-arms the timer; a burst therefore collapses into its
/// last value. A value still pending when the source completes is flushed
/// before the completion.
pub struct Throttle<T> {
  subject: Subject<T>,
  token: Token,
}

impl<T> Throttle<T>
where
  T: Clone + Send + Sync + 'static,
{
  /// Fails with [`RxError::NoRuntime`] outside a tokio runtime.
  pub fn new<S>(source: &S, duration: Duration) -> Result<Self, RxError>
  where
    S: Observable<T> + ?Sized,
  {
    let scheduler = Scheduler::current()?;
    let subject = Subject::new();
    let token = Token::new();
    let state = Arc::new(Mutex::new(Trailing { value: None, generation: 0, timer: None }));

    let c_state = state.clone();
    token.register(move || {
      if let Some(timer) = c_state.lock().timer.take() {
        timer.unsubscribe();
      }
    });

    let observer = ThrottleObserver { downstream: subject.clone(), scheduler, duration, state };
    source.subscribe(Arc::new(observer)).tie_to(&token);
    Ok(Throttle { subject, token })
  }
}

impl_operator!(Throttle<T> => T);

struct Trailing<T> {
  value: Option<T>,
  generation: u64,
  timer: Option<TaskHandle>,
}

struct ThrottleObserver<T> {
  downstream: Subject<T>,
  scheduler: Scheduler,
  duration: Duration,
  state: Arc<Mutex<Trailing<T>>>,
}

impl<T> Observer<T> for ThrottleObserver<T>
where
  T: Clone + Send + Sync + 'static,
{
  fn on_next(&self, value: T) {
    let mut state = self.state.lock();
    state.value = Some(value);
    state.generation += 1;
    if let Some(timer) = state.timer.take() {
      timer.unsubscribe();
    }

    let generation = state.generation;
    let trailing = self.state.clone();
    let downstream = self.downstream.clone();
    let task = async move {
      let value = {
        let mut state = trailing.lock();
        if state.generation != generation {
          return;
        }
        state.timer = None;
        state.value.take()
      };
      if let Some(value) = value {
        downstream.on_next(value);
      }
    };
    state.timer = Some(self.scheduler.schedule(task, Some(self.duration)));
  }

  fn on_error(&self, err: Fault) {
    let timer = {
      let mut state = self.state.lock();
      state.value = None;
      state.timer.take()
    };
    if let Some(timer) = timer {
      timer.unsubscribe();
    }
    self.downstream.on_error(err);
  }

  fn on_completed(&self) {
    let (value, timer) = {
      let mut state = self.state.lock();
      (state.value.take(), state.timer.take())
    };
    if let Some(timer) = timer {
      timer.unsubscribe();
    }
    if let Some(value) = value {
      self.downstream.on_next(value);
    }
    self.downstream.on_completed();
  }
}

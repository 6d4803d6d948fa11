use std::{marker::PhantomData, sync::Arc, time::Duration};

use crate::{scheduler::Scheduler, sink::Sink};

use super::{Observable, Producer};

/// Emit a single `0` after `delay` on `scheduler`, then complete.
pub fn timer<Err>(delay: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<usize, Err>
where
  Err: Send + 'static,
{
  Observable::from_producer(TimerProducer { delay, scheduler, _hint: PhantomData })
}

struct TimerProducer<Err> {
  delay: Duration,
  scheduler: Arc<dyn Scheduler>,
  _hint: PhantomData<fn() -> Err>,
}

impl<Err> Producer for TimerProducer<Err>
where
  Err: Send + 'static,
{
  type Item = usize;
  type Err = Err;

  fn run(&self, sink: Sink<usize, Err>) {
    let emitter = sink.clone();
    let pending = self.scheduler.schedule_after(
      self.delay,
      Box::new(move || {
        emitter.next(0);
        emitter.complete();
      }),
    );
    sink.add_upstream(pending);
  }
}

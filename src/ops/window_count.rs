use crate::{
  observable::{Observable, Producer},
  observer::Observer,
  sink::Sink,
  subject::PublishSubject,
};

pub struct WindowCountOp<Item, Err> {
  pub(crate) source: Observable<Item, Err>,
  pub(crate) capacity: usize,
}

impl<Item, Err> Producer for WindowCountOp<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  type Item = Observable<Item, Err>;
  type Err = Err;

  fn run(&self, sink: Sink<Observable<Item, Err>, Err>) {
    let window = PublishSubject::new();
    // The first window opens at subscription, before any value arrives.
    sink.next(window.observable());
    let observer = WindowCountObserver {
      sink: sink.clone(),
      capacity: self.capacity.max(1),
      window,
      filled: 0,
    };
    self.source.attach(observer, &sink);
  }
}

struct WindowCountObserver<Item, Err> {
  sink: Sink<Observable<Item, Err>, Err>,
  capacity: usize,
  window: PublishSubject<Item, Err>,
  filled: usize,
}

impl<Item, Err> Observer<Item, Err> for WindowCountObserver<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn next(&mut self, value: Item) {
    self.window.next(value);
    self.filled += 1;
    if self.filled >= self.capacity {
      self.filled = 0;
      self.window.complete();
      self.window = PublishSubject::new();
      self.sink.next(self.window.observable());
    }
  }

  fn error(&mut self, err: Err) {
    self.window.error(err.clone());
    self.sink.error(err);
  }

  fn complete(&mut self) {
    self.window.complete();
    self.sink.complete();
  }

  fn is_closed(&self) -> bool { self.sink.is_disposed() }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  /// Split the stream into consecutive windows of `capacity` values, each
  /// exposed as its own observable the moment it opens.
  pub fn window_count(&self, capacity: usize) -> Observable<Observable<Item, Err>, Err> {
    Observable::from_producer(WindowCountOp { source: self.clone(), capacity })
  }
}

#[cfg(test)]
mod test {
  use std::sync::{Arc, Mutex};

  use crate::observable::from_iter;

  #[test]
  fn windows_fill_in_turn() {
    let windows = Arc::new(Mutex::new(Vec::new()));
    let w = windows.clone();
    from_iter::<_, ()>(1..=5).window_count(2).subscribe(move |window| {
      let collected = Arc::new(Mutex::new(Vec::new()));
      w.lock().unwrap().push(collected.clone());
      window.subscribe(move |v| collected.lock().unwrap().push(v));
    });
    let collected: Vec<Vec<i32>> =
      windows.lock().unwrap().iter().map(|w| w.lock().unwrap().clone()).collect();
    assert_eq!(collected, vec![vec![1, 2], vec![3, 4], vec![5]]);
  }
}

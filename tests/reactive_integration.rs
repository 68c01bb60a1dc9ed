//! Integration tests for subjects, change-tracked fields and operators.
//!
//! Exercises operator chains end to end through the public prelude.

use std::{
  sync::{Arc, Mutex},
  thread,
  time::Duration,
};

use rxhub::prelude::*;

fn collector<T: Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl Fn(T) + Send + Sync + 'static) {
  let result = Arc::new(Mutex::new(Vec::new()));
  let result_clone = result.clone();
  (result, move |v| result_clone.lock().unwrap().push(v))
}

#[test]
fn observers_see_exactly_the_values_emitted_while_subscribed() {
  let subject = Subject::<i32>::new();
  let (early, push_early) = collector::<i32>();
  let (late, push_late) = collector::<i32>();

  let early_sub = subject.subscribe_fn(push_early);
  subject.on_next(1);
  let late_sub = subject.subscribe_fn(push_late);
  subject.on_next(2);
  early_sub.unsubscribe();
  subject.on_next(3);
  late_sub.unsubscribe();
  subject.on_next(4);

  assert_eq!(*early.lock().unwrap(), vec![1, 2]);
  assert_eq!(*late.lock().unwrap(), vec![2, 3]);
  assert_eq!(subject.observer_count(), 0);
}

#[test]
fn observer_unsubscribing_a_sibling_mid_dispatch_keeps_the_snapshot() {
  let subject = Subject::<i32>::new();
  let (seen, push) = collector::<i32>();
  let sibling: Arc<Mutex<Option<Subscription>>> = Arc::default();

  let c_sibling = sibling.clone();
  subject.subscribe_fn(move |_| {
    if let Some(sub) = c_sibling.lock().unwrap().take() {
      sub.unsubscribe();
    }
  });
  *sibling.lock().unwrap() = Some(subject.subscribe_fn(push));

  subject.on_next(1);
  subject.on_next(2);
  assert_eq!(*seen.lock().unwrap(), vec![1]);
}

#[test]
fn behavior_subject_replays_only_the_latest_value() {
  let subject = BehaviorSubject::<&str>::new();
  subject.on_next("first");
  subject.on_next("second");

  let (seen, push) = collector::<&str>();
  subject.subscribe_fn(push);
  subject.on_next("third");

  assert_eq!(*seen.lock().unwrap(), vec!["second", "third"]);
  assert_eq!(subject.value().unwrap(), Some("third"));
}

#[test]
fn backing_field_reports_each_change_once() {
  let field = BackingField::<String>::new();
  let (changes, push) = collector::<(Option<String>, Option<String>)>();
  field
    .value_changed()
    .subscribe_fn(move |c: ValueChanged<String>| push((c.previous, c.current)));

  assert!(field.update_value("a".to_string()));
  assert!(!field.update_value("a".to_string()));
  assert!(field.is_changed());
  field.mark_resolved();
  assert!(!field.is_changed());
  assert!(field.update_value(None::<String>));

  assert_eq!(
    *changes.lock().unwrap(),
    vec![(None, Some("a".to_string())), (Some("a".to_string()), None)]
  );
}

#[test]
fn vetoed_change_is_not_committed() {
  let field = BackingField::with_value(10);
  field.value_changing().subscribe_fn(|change: ValueChanging<i32>| {
    if change.next.is_some_and(|v| v < 0) {
      change.cancel();
    }
  });

  assert!(!field.update_value(-1));
  assert_eq!(field.value(), Some(10));
  assert!(field.update_value(11));
  assert_eq!(field.previous_value(), Some(10));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_async_writers_commit_an_equal_value_once() {
  let field = Arc::new(BackingField::with_value(0));
  let (commits, push) = collector::<Option<i32>>();
  field
    .value_changed()
    .subscribe_fn(move |c: ValueChanged<i32>| push(c.current));

  let writers: Vec<_> = (0..8)
    .map(|_| {
      let field = field.clone();
      tokio::spawn(async move { field.update_value_async(42).await })
    })
    .collect();
  let mut committed = 0;
  for writer in writers {
    if writer.await.unwrap() {
      committed += 1;
    }
  }

  assert_eq!(committed, 1);
  assert_eq!(*commits.lock().unwrap(), vec![Some(42)]);
}

#[tokio::test(start_paused = true)]
async fn throttle_collapses_a_burst_to_its_last_value() {
  let source = Subject::<u32>::new();
  let throttled = source.throttle(Duration::from_millis(100)).unwrap();
  let (seen, push) = collector::<u32>();
  throttled.subscribe_fn(push);

  for i in 0..50 {
    source.on_next(i);
    tokio::time::sleep(Duration::from_millis(10)).await;
  }
  tokio::time::sleep(Duration::from_millis(200)).await;

  assert_eq!(*seen.lock().unwrap(), vec![49]);
}

#[derive(Clone, Debug, PartialEq)]
struct Reading {
  name: &'static str,
  sensor: u8,
}

#[test]
fn distinct_by_key_suppresses_consecutive_duplicates() {
  let source = Subject::<Reading>::new();
  let (seen, push) = collector::<&'static str>();
  source
    .distinct_by(|r: &Reading| r.sensor, Comparer::structural())
    .map(|r| r.name)
    .subscribe_fn(push);

  source.on_next(Reading { name: "A", sensor: 1 });
  source.on_next(Reading { name: "B", sensor: 1 });
  source.on_next(Reading { name: "C", sensor: 2 });

  assert_eq!(*seen.lock().unwrap(), vec!["A", "C"]);
}

#[test]
fn disposing_an_operator_detaches_the_chain() {
  let source = Subject::<i32>::new();
  let doubled = source.map(|v| v * 2);
  let (seen, push) = collector::<i32>();
  doubled.subscribe_fn(push);

  source.on_next(1);
  doubled.dispose();
  source.on_next(2);

  assert_eq!(*seen.lock().unwrap(), vec![2]);
  assert_eq!(source.observer_count(), 0);
  assert!(doubled.is_disposed());
}

#[test]
fn callback_source_feeds_operators_across_threads() {
  let listeners: Arc<Mutex<Vec<Handler<u64>>>> = Arc::default();
  let c_listeners = listeners.clone();
  let r_listeners = listeners.clone();
  let ticks = from_handler(
    move |h: Handler<u64>| c_listeners.lock().unwrap().push(h),
    move |()| r_listeners.lock().unwrap().clear(),
  );

  let (seen, push) = collector::<u64>();
  let evens = ticks.filter(|v: &u64| v % 2 == 0);
  evens.subscribe_fn(push);

  let emitter = listeners.lock().unwrap()[0].clone();
  let worker = thread::spawn(move || {
    for i in 0..10 {
      emitter(i);
    }
  });
  worker.join().unwrap();

  let mut seen = seen.lock().unwrap().clone();
  seen.sort();
  assert_eq!(seen, vec![0, 2, 4, 6, 8]);

  evens.dispose();
  assert!(listeners.lock().unwrap().is_empty());
}

#[test]
fn token_scopes_plain_subscriptions() {
  let subject = Subject::<i32>::new();
  let token = Token::new();
  let (seen, push) = collector::<i32>();
  let _ = subject.subscribe_fn(push).tie_to(&token);

  subject.on_next(1);
  token.cancel();
  subject.on_next(2);

  assert_eq!(*seen.lock().unwrap(), vec![1]);
}

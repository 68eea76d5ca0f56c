mod support;

use std::{
    sync::{mpsc::channel, Arc},
    time::Duration,
};

use futures::executor::{block_on, ThreadPool};
use promise_out::{
    combinators::{after_all, after_any, join_all, race_first_success},
    executor::inline,
    Executor, Failure, Promise, Resolver,
};
use support::{init_tracing, Log};

fn pending<V: Clone + Send + 'static>() -> (Promise<V>, Resolver<V>) {
    let (tx, rx) = channel();
    let promise = Promise::new(move |resolver| {
        tx.send(resolver).map_err(|_| Failure::msg("receiver gone"))
    });
    (promise, rx.recv().unwrap())
}

fn outcomes<V>(promise: &Promise<V>) -> Log<Result<V, String>>
where
    V: Clone + Send + 'static,
{
    let log = Log::default();
    let on_value = log.clone();
    let on_failure = log.clone();
    promise
        .then(move |value| on_value.push(Ok(value)))
        .unwrap()
        .catch(move |failure| on_failure.push(Err(failure.to_string())))
        .unwrap();
    log
}

#[test]
fn test_join_all_keeps_input_order() {
    init_tracing();
    let (first, first_resolver) = pending::<&str>();
    let (second, second_resolver) = pending::<&str>();
    let (third, third_resolver) = pending::<&str>();
    let all = join_all(inline(), [first, second, third]);
    let log = outcomes(&all);

    third_resolver.resolve("c").unwrap();
    first_resolver.resolve("a").unwrap();
    assert!(log.entries().is_empty());
    second_resolver.resolve("b").unwrap();
    assert_eq!(log.entries(), vec![Ok(vec!["a", "b", "c"])]);
}

#[test]
fn test_join_all_rejects_with_first_failure() {
    let (first, first_resolver) = pending::<u8>();
    let (second, second_resolver) = pending::<u8>();
    let all = join_all(inline(), [first, second]);
    let log = outcomes(&all);

    let e = Failure::msg("E");
    second_resolver.reject(e.clone()).unwrap();
    first_resolver.resolve(1).unwrap();
    assert_eq!(log.entries(), vec![Err("E".to_owned())]);

    let failure = block_on(async { all.await }).unwrap_err();
    assert!(failure.is(&e));
}

#[test]
fn test_join_all_later_failures_are_ignored() {
    let (first, first_resolver) = pending::<u8>();
    let (second, second_resolver) = pending::<u8>();
    let all = join_all(inline(), [first, second]);
    first_resolver.reject(Failure::msg("E1")).unwrap();
    second_resolver.reject(Failure::msg("E2")).unwrap();
    assert_eq!(outcomes(&all).entries(), vec![Err("E1".to_owned())]);
}

#[test]
fn test_race_first_success_wins() {
    let (first, first_resolver) = pending::<u8>();
    let (second, second_resolver) = pending::<u8>();
    let race = race_first_success(inline(), [first, second]);
    let log = outcomes(&race);

    first_resolver.reject(Failure::msg("E1")).unwrap();
    assert!(log.entries().is_empty());
    second_resolver.resolve(2).unwrap();
    assert_eq!(log.entries(), vec![Ok(2)]);
}

#[test]
fn test_race_first_success_ignores_later_values() {
    let (first, first_resolver) = pending::<u8>();
    let (second, second_resolver) = pending::<u8>();
    let race = race_first_success(inline(), [first, second]);
    second_resolver.resolve(2).unwrap();
    first_resolver.resolve(1).unwrap();
    assert_eq!(outcomes(&race).entries(), vec![Ok(2)]);
}

#[test]
fn test_race_first_success_aggregates_in_input_order() {
    let (first, first_resolver) = pending::<u8>();
    let (second, second_resolver) = pending::<u8>();
    let race = race_first_success(inline(), [first, second]);

    let e1 = Failure::msg("E1");
    let e2 = Failure::msg("E2");
    second_resolver.reject(e2.clone()).unwrap();
    first_resolver.reject(e1.clone()).unwrap();

    let failure = block_on(async { race.await }).unwrap_err();
    assert_eq!(failure.suppressed().len(), 2);
    assert!(failure.suppressed()[0].is(&e1));
    assert!(failure.suppressed()[1].is(&e2));
    assert_eq!(
        format!("{failure:#}"),
        "every promise failed\n  suppressed: E1\n  suppressed: E2"
    );
}

#[test]
fn test_combinators_over_settled_inputs() {
    let all = join_all(inline(), vec![Promise::resolved(1), Promise::resolved(2)]);
    assert_eq!(outcomes(&all).entries(), vec![Ok(vec![1, 2])]);

    let race = race_first_success(
        inline(),
        vec![Promise::rejected(Failure::msg("E")), Promise::resolved(3)],
    );
    assert_eq!(outcomes(&race).entries(), vec![Ok(3)]);

    let never = race_first_success(inline(), vec![Promise::<u8>::never()]);
    assert!(!never.is_settled());
}

#[test]
fn test_after_all_and_after_any() {
    let (first, first_resolver) = pending::<String>();
    let (second, second_resolver) = pending::<String>();
    let all = after_all(inline(), [first.clone(), second.clone()]);
    let any = after_any(inline(), [first, second]);
    let all_log = outcomes(&all);
    let any_log = outcomes(&any);

    first_resolver.resolve("a".to_owned()).unwrap();
    assert!(all_log.entries().is_empty());
    assert_eq!(any_log.entries(), vec![Ok(())]);

    second_resolver.resolve("b".to_owned()).unwrap();
    assert_eq!(all_log.entries(), vec![Ok(())]);
    assert_eq!(any_log.entries().len(), 1);
}

#[test]
fn test_after_any_rejects_when_every_input_rejects() {
    let any = after_any(
        inline(),
        vec![
            Promise::<u8>::rejected(Failure::msg("E1")),
            Promise::rejected(Failure::msg("E2")),
        ],
    );
    let failure = block_on(async { any.await }).unwrap_err();
    assert_eq!(failure.to_string(), "every promise failed");
    assert_eq!(failure.suppressed().len(), 2);
}

#[test]
fn test_join_all_on_thread_pool() {
    init_tracing();
    let pool: Arc<dyn Executor> = Arc::new(ThreadPool::new().unwrap());
    let inputs: Vec<Promise<usize>> = (0..16)
        .map(|index| Promise::new_on(pool.clone(), move |resolver| resolver.resolve(index * index)))
        .collect();
    let all = join_all(pool, inputs);

    let (tx, rx) = channel();
    all.then(move |values| tx.send(values).map_err(|_| Failure::msg("receiver gone")))
        .unwrap();
    let values = rx.recv_timeout(Duration::from_secs(10)).unwrap();
    assert_eq!(values, (0..16).map(|index| index * index).collect::<Vec<_>>());
}

// tests/replies.rs

use futures::stream::{FuturesUnordered, StreamExt};
use rdispatch::{Envelope, ReplyError, Strategy};
use std::collections::HashSet;
use std::time::Duration;
mod common;

use common::{both_strategies, reply_within, test_dispatcher, LONG_TIMEOUT};

#[rdispatch::test]
async fn every_envelope_gets_exactly_one_reply() {
  for strategy in both_strategies(5) {
    let dispatcher = test_dispatcher(strategy);

    let mut replies = Vec::new();
    for i in 0..500u32 {
      let reply = dispatcher
        .submit(
          |i: u32| async move {
            if i % 7 == 0 {
              Err(format!("request {} rejected", i))
            } else {
              Ok(i * 10)
            }
          },
          i,
        )
        .await
        .unwrap();
      replies.push((i, reply));
    }

    for (i, reply) in replies {
      let result = reply_within(reply, LONG_TIMEOUT).await;
      if i % 7 == 0 {
        assert_eq!(result, Err(ReplyError::Failed(format!("request {} rejected", i))));
      } else {
        assert_eq!(result, Ok(i * 10));
      }
    }
    dispatcher.request_shutdown().await.unwrap();
  }
}

#[rdispatch::test]
async fn completion_order_is_not_submission_order() {
  for strategy in both_strategies(2) {
    let dispatcher = test_dispatcher(strategy);

    // Request 0 sleeps longest, request 1 shortest.
    let mut pending = FuturesUnordered::new();
    for (id, ms) in [(0u32, 150u64), (1, 5)] {
      let reply = dispatcher
        .submit(
          move |id: u32| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok::<_, ()>(id)
          },
          id,
        )
        .await
        .unwrap();
      pending.push(reply);
    }

    let mut seen = HashSet::new();
    while let Some(result) = tokio::time::timeout(LONG_TIMEOUT, pending.next()).await.unwrap() {
      assert!(seen.insert(result.unwrap()), "duplicate reply");
    }
    // Only arrival of both is asserted, never their order.
    assert_eq!(seen, HashSet::from([0, 1]));
    dispatcher.request_shutdown().await.unwrap();
  }
}

#[rdispatch::test]
async fn producers_can_build_envelopes_themselves() {
  let dispatcher = test_dispatcher(Strategy::Pool { size: 2 });

  let (envelope, reply) = Envelope::new(|words: Vec<&'static str>| async move { Ok::<_, ()>(words.join(" ")) }, vec!["channels", "of", "channels"]);
  assert_eq!(envelope.arguments().len(), 3);
  dispatcher.dispatch(envelope).await.unwrap();

  assert_eq!(reply_within(reply, LONG_TIMEOUT).await, Ok("channels of channels".to_string()));
  dispatcher.request_shutdown().await.unwrap();
}

#[rdispatch::test]
async fn heterogeneous_requests_share_one_dispatcher() {
  let dispatcher = test_dispatcher(Strategy::Gated { capacity: 3 });

  let length = dispatcher
    .submit(|s: String| async move { Ok::<usize, ()>(s.len()) }, "hello".to_string())
    .await
    .unwrap();
  let parsed = dispatcher
    .submit(|s: &'static str| async move { s.parse::<i64>() }, "-17")
    .await
    .unwrap();
  let not_a_number = dispatcher
    .submit(|s: &'static str| async move { s.parse::<i64>() }, "seventeen")
    .await
    .unwrap();

  assert_eq!(reply_within(length, LONG_TIMEOUT).await, Ok(5));
  assert_eq!(reply_within(parsed, LONG_TIMEOUT).await, Ok(-17));
  let err = reply_within(not_a_number, LONG_TIMEOUT).await.unwrap_err();
  assert!(err.is_failure());
  dispatcher.request_shutdown().await.unwrap();
}

#[rdispatch::test]
async fn panicking_work_units_do_not_take_the_dispatcher_down() {
  for strategy in both_strategies(1) {
    let dispatcher = test_dispatcher(strategy);

    let exploded = dispatcher
      .submit(
        |code: u8| async move {
          if code > 0 {
            panic!("work unit {} exploded", code);
          }
          Ok::<u8, ()>(code)
        },
        9,
      )
      .await
      .unwrap();
    assert_eq!(
      reply_within(exploded, LONG_TIMEOUT).await,
      Err(ReplyError::Panicked("work unit 9 exploded".to_string()))
    );

    // With a limit of one, the next request only runs if the slot came back.
    let healthy = dispatcher.submit(|n: u8| async move { Ok::<u8, ()>(n) }, 1).await.unwrap();
    assert_eq!(reply_within(healthy, LONG_TIMEOUT).await, Ok(1));

    dispatcher.request_shutdown().await.unwrap();
    assert!(matches!(dispatcher.outstanding(), None | Some(0)));
  }
}

#[rdispatch::test]
async fn abandoned_replies_do_not_disturb_other_requests() {
  let dispatcher = test_dispatcher(Strategy::Gated { capacity: 2 });

  let abandoned = dispatcher.submit(|n: u32| async move { Ok::<_, ()>(n) }, 1).await.unwrap();
  drop(abandoned);
  let kept = dispatcher.submit(|n: u32| async move { Ok::<_, ()>(n) }, 2).await.unwrap();

  assert_eq!(reply_within(kept, LONG_TIMEOUT).await, Ok(2));
  dispatcher.request_shutdown().await.unwrap();
  assert_eq!(dispatcher.outstanding(), Some(0));
}

use crate::cli::RunArgs;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context as AnyhowContext, Result};
use rand::Rng;
use rdispatch::{Dispatcher, DispatcherOptions, ReplyError};

/// What a single synthetic work unit will do once it runs.
#[derive(Debug, Clone, Copy)]
struct Job {
  id: usize,
  duration: Duration,
  fail: bool,
}

/// Tracks how many jobs are inside their work unit at once.
#[derive(Debug, Default)]
struct Occupancy {
  current: AtomicUsize,
  peak: AtomicUsize,
}

impl Occupancy {
  fn enter(&self) {
    let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
    self.peak.fetch_max(now, Ordering::SeqCst);
  }

  fn leave(&self) {
    self.current.fetch_sub(1, Ordering::SeqCst);
  }
}

#[derive(Debug, Default)]
struct Summary {
  ok: usize,
  failed: usize,
  panicked: usize,
  dropped: usize,
}

fn plan_jobs(args: &RunArgs) -> Vec<Job> {
  let mut rng = rand::rng();
  (0..args.requests)
    .map(|id| {
      let jitter = if args.jitter_ms > 0 { rng.random_range(0..=args.jitter_ms) } else { 0 };
      Job {
        id,
        duration: Duration::from_millis(args.work_ms + jitter),
        fail: rng.random_bool(args.fail_rate),
      }
    })
    .collect()
}

fn options_from(args: &RunArgs) -> DispatcherOptions {
  let mut options = DispatcherOptions::new()
    .with_strategy(args.strategy)
    .with_name(format!("cli-{}", args.strategy));
  if args.unbounded {
    options = options.with_unbounded_queue();
  } else if let Some(capacity) = args.queue_capacity {
    options = options.with_queue_capacity(capacity);
  }
  if let Some(ms) = args.drain_timeout_ms {
    options = options.with_drain_timeout(Duration::from_millis(ms));
  }
  options
}

pub async fn run_load(args: RunArgs) -> Result<()> {
  let jobs = plan_jobs(&args);
  let dispatcher = Dispatcher::start(options_from(&args)).context("Failed to start dispatcher")?;
  let occupancy = Arc::new(Occupancy::default());

  tracing::info!(strategy = %args.strategy, requests = args.requests, "Starting load run");
  let started = Instant::now();

  let mut replies = Vec::with_capacity(jobs.len());
  for job in jobs {
    let occupancy = occupancy.clone();
    let reply = dispatcher
      .submit(
        move |job: Job| async move {
          occupancy.enter();
          tokio::time::sleep(job.duration).await;
          occupancy.leave();
          if job.fail {
            Err(format!("job {} failed on purpose", job.id))
          } else {
            Ok(job.id)
          }
        },
        job,
      )
      .await
      .with_context(|| format!("Failed to submit job {}", job.id))?;
    replies.push(reply);
  }

  let mut summary = Summary::default();
  for reply in replies {
    match reply.await {
      Ok(_) => summary.ok += 1,
      Err(ReplyError::Failed(reason)) => {
        tracing::debug!(%reason, "Job replied with an error");
        summary.failed += 1;
      }
      Err(ReplyError::Panicked(_)) => summary.panicked += 1,
      Err(ReplyError::Dropped) => summary.dropped += 1,
    }
  }

  dispatcher.request_shutdown().await.context("Dispatcher did not drain")?;
  let elapsed = started.elapsed();

  println!("strategy:         {}", args.strategy);
  println!("requests:         {}", args.requests);
  println!("ok:               {}", summary.ok);
  println!("failed:           {}", summary.failed);
  if summary.panicked > 0 || summary.dropped > 0 {
    println!("panicked:         {}", summary.panicked);
    println!("dropped:          {}", summary.dropped);
  }
  println!(
    "peak concurrency: {} (limit {})",
    occupancy.peak.load(Ordering::SeqCst),
    args.strategy.concurrency()
  );
  println!("elapsed:          {:.2?}", elapsed);
  Ok(())
}

use std::sync::Arc;

use anyhow::Context;
use drain_core::{Consumer, HandlerRegistry, consumer_id};
use drain_exec::{ProcAction, ProcConfig, builtin_registry};
use drain_observe::LogSubscriber;
use drain_prometheus::PrometheusMetrics;
use drain_redis::RedisQueue;
use tracing::info;

use crate::{
    cli::{ExecMapping, RunArgs},
    signal,
};

pub async fn run(redis_url: &str, args: RunArgs) -> anyhow::Result<()> {
    let config = args.run_config();
    config.validate().context("invalid run configuration")?;

    let registry = Arc::new(build_registry(&args.exec)?);
    let queue = RedisQueue::connect(redis_url)
        .await
        .with_context(|| format!("connecting to {redis_url}"))?;
    let metrics = PrometheusMetrics::new().context("registering metrics")?;

    info!(
        id = consumer_id(),
        queue = %config.queue_key,
        policy = %config.policy,
        max_concurrency = config.max_concurrency,
        max_jobs = ?config.max_jobs,
        "starting consumer"
    );

    let consumer = Consumer::new(Arc::new(queue), registry, config)?
        .with_subscriber(Arc::new(LogSubscriber::new()))
        .with_subscriber(Arc::new(metrics.clone()));

    let report = consumer.run(signal::shutdown_token()).await?;
    info!(
        processed = report.processed,
        succeeded = report.succeeded,
        failed = report.failed,
        decode_failures = report.decode_failures,
        rejected = report.rejected,
        backend_errors = report.backend_errors,
        peak_in_flight = report.peak_in_flight,
        "consumer finished"
    );

    if args.print_metrics {
        print!("{}", metrics.encode_text().context("encoding metrics")?);
    }
    Ok(())
}

/// Built-in delay actions, with `--exec` mappings layered on top.
fn build_registry(mappings: &[ExecMapping]) -> anyhow::Result<HandlerRegistry> {
    let mut registry = builtin_registry();
    for m in mappings {
        let action = ProcAction::new(ProcConfig::new(&m.program).with_args(&m.args))
            .with_context(|| format!("--exec {}", m.kind))?
            .with_name(format!("exec:{}", m.kind));
        registry.register(m.kind.as_str(), Arc::new(action));
    }
    Ok(registry)
}

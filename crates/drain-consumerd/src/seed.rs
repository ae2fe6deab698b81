use anyhow::Context;
use drain_core::QueueClient;
use drain_redis::RedisQueue;
use serde_json::{Value, json};
use tracing::info;

use crate::cli::SeedArgs;

pub async fn seed(redis_url: &str, args: SeedArgs) -> anyhow::Result<()> {
    let queue = RedisQueue::connect(redis_url)
        .await
        .with_context(|| format!("connecting to {redis_url}"))?;

    if args.clear {
        queue.clear(&args.queue_key).await?;
        info!(queue = %args.queue_key, "queue cleared");
    }

    let items = match args.email {
        Some(n) => email_jobs(n),
        None => mixed_durations(),
    };
    let pushed = items.len();
    for item in items {
        queue
            .push(&args.queue_key, item.to_string().into_bytes())
            .await?;
    }

    let waiting = queue.len(&args.queue_key).await?;
    info!(queue = %args.queue_key, pushed, waiting, "jobs seeded");
    Ok(())
}

fn email_jobs(n: usize) -> Vec<Value> {
    (1..=n)
        .map(|i| {
            json!({
                "type": "email",
                "data": { "to": format!("user{i}@example.com"), "subject": format!("message {i}") }
            })
        })
        .collect()
}

/// Three fast, two medium and two slow jobs.
fn mixed_durations() -> Vec<Value> {
    let mut items = Vec::new();
    for (kind, label, duration, count) in [
        ("fast_task", "fast", 0.5, 3),
        ("medium_task", "medium", 1.0, 2),
        ("slow_task", "slow", 2.0, 2),
    ] {
        for i in 1..=count {
            items.push(json!({
                "type": kind,
                "data": {
                    "task_id": format!("{label}_{i}"),
                    "duration": duration,
                    "message": format!("{label} task {i}"),
                }
            }));
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_set_shape() {
        let items = mixed_durations();
        assert_eq!(items.len(), 7);
        let slow = items.iter().filter(|v| v["type"] == "slow_task").count();
        assert_eq!(slow, 2);
        assert_eq!(items[0]["data"]["task_id"], "fast_1");
        assert_eq!(items[6]["data"]["duration"], 2.0);
    }

    #[test]
    fn email_jobs_decode() {
        for item in email_jobs(3) {
            let job = drain_core::decode(item.to_string().as_bytes()).unwrap();
            assert_eq!(job.kind().as_str(), "email");
        }
    }
}

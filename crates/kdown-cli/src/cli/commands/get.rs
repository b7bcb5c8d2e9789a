//! `kdown get` – queue URLs and run until the queue drains or Ctrl-C.

use anyhow::{bail, Result};
use kdown_core::config::KdownConfig;
use kdown_core::{LifecycleHook, Scheduler, Status, Task};
use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::progress::ConsoleListener;

#[derive(Debug)]
pub struct GetArgs {
    pub urls: Vec<String>,
    pub dir: PathBuf,
    pub name: Option<String>,
    pub priority: i32,
    pub overwrite: bool,
    pub group: Option<String>,
}

fn build_tasks(args: &GetArgs, retry_times: u32) -> Result<Vec<Arc<Task>>> {
    if args.name.is_some() && args.urls.len() > 1 {
        bail!("--name needs exactly one URL, got {}", args.urls.len());
    }
    Ok(args
        .urls
        .iter()
        .enumerate()
        .map(|(i, url)| {
            let mut b = Task::builder(url.as_str())
                .id(i as i64 + 1)
                .dest_dir(args.dir.clone())
                .overwrite(args.overwrite)
                .priority(args.priority)
                .retry_times(retry_times);
            if let Some(name) = &args.name {
                b = b.name(name.as_str());
            }
            b.build()
        })
        .collect())
}

pub async fn run_get(cfg: KdownConfig, args: GetArgs) -> Result<()> {
    let tasks = build_tasks(&args, cfg.retry_times)?;
    let sched = Scheduler::builder(cfg)
        .listener(Arc::new(ConsoleListener::new()))
        .build()?;

    match &args.group {
        Some(label) => {
            let group = sched.create_task_group(Some(label.clone()), tasks.clone())?;
            let added = sched.add_task_group(&group).await;
            tracing::info!(group = %label, added, total = group.total_length(), "group queued");
        }
        None => {
            for t in &tasks {
                sched.add_task(Arc::clone(t));
            }
        }
    }

    let hook: Arc<dyn LifecycleHook> = Arc::new(sched.clone());
    let stop = Arc::clone(&hook);
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("stopping; partial data is kept for the next run");
            stop.on_stop();
        }
    });

    hook.on_start();
    sched.wait_idle().await;
    ctrl_c.abort();

    summarize(&tasks)
}

fn summarize(tasks: &[Arc<Task>]) -> Result<()> {
    let count = |s: Status| tasks.iter().filter(|t| t.status() == s).count();
    let (finished, failed) = (count(Status::Finished), count(Status::Failed));
    let paused = tasks.iter().filter(|t| t.is_waiting()).count();
    println!(
        "{} finished, {} paused, {} failed, {} cancelled",
        finished,
        paused,
        failed,
        count(Status::Cancel)
    );
    if failed > 0 {
        bail!("{} download(s) failed", failed);
    }
    Ok(())
}

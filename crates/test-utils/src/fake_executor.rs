use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use buildgraph::dag::ScheduledTask;
use buildgraph::engine::{RuntimeEvent, TaskFailure, TaskOutcome};
use buildgraph::errors::Result;
use buildgraph::exec::ExecutorBackend;
use buildgraph::exec::substitute::ResolvedAction;
use buildgraph::fs::mock::MockFileSystem;
use tokio::sync::mpsc;

/// A fake executor that:
/// - records which tasks were "run", in dispatch order
/// - invokes callable actions in-process
/// - "produces" each task's targets by touching them in a `MockFileSystem`
/// - reports `TaskCompleted` immediately.
///
/// Tasks named in `failing` report an action failure instead; tasks named
/// in `lazy` succeed without producing their targets.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    fs: MockFileSystem,
    executed: Arc<Mutex<Vec<String>>>,
    failing: BTreeSet<String>,
    lazy: BTreeSet<String>,
}

impl FakeExecutor {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        fs: MockFileSystem,
        executed: Arc<Mutex<Vec<String>>>,
    ) -> Self {
        Self {
            runtime_tx,
            fs,
            executed,
            failing: BTreeSet::new(),
            lazy: BTreeSet::new(),
        }
    }

    pub fn failing(mut self, task: &str) -> Self {
        self.failing.insert(task.to_string());
        self
    }

    pub fn without_targets(mut self, task: &str) -> Self {
        self.lazy.insert(task.to_string());
        self
    }

    fn execute(&self, task: &ScheduledTask) -> TaskOutcome {
        if self.failing.contains(&task.name) {
            return TaskOutcome::Failed(TaskFailure::Action {
                index: 0,
                action: "fake".to_string(),
                exit_code: Some(1),
                output: format!("{} failed on purpose\n", task.name),
            });
        }

        for (index, action) in task.task.actions.iter().enumerate() {
            if let ResolvedAction::Call(callable) = action
                && let Err(err) = callable.call(&task.task.params)
            {
                return TaskOutcome::Failed(TaskFailure::Action {
                    index,
                    action: action.to_string(),
                    exit_code: None,
                    output: format!("{err:#}"),
                });
            }
        }

        if !self.lazy.contains(&task.name) {
            for target in &task.task.targets {
                self.fs.touch(target);
            }
        }
        TaskOutcome::Success
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for t in tasks {
                self.executed.lock().unwrap().push(t.name.clone());
                let outcome = self.execute(&t);

                self.runtime_tx
                    .send(RuntimeEvent::TaskCompleted {
                        task: t.name.clone(),
                        outcome,
                    })
                    .await
                    .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }

    fn cancel_all(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Every task completes as soon as it is dispatched.
        Box::pin(async { Ok(()) })
    }
}

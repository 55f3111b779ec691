//! The workflow engine: the API UI callers and the scheduler drive.

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};
use uuid::Uuid;

use cadence_core::workflow::{
    sweep_candidate, InstanceStore, NotificationEmitter, OverduePolicy, ProcessKind, StartedStep,
    StepNotification, StepStatus, SweepResult, WorkflowInstance,
};
use cadence_core::Result;

/// Drives workflow instances through their step chains.
///
/// Every mutation is load, mutate in memory, save the whole document. The
/// engine keeps no instance state of its own between calls.
pub struct WorkflowEngine<S, N> {
    store: S,
    notifier: N,
    timezone: Tz,
    overdue_policy: OverduePolicy,
    sweep_lock: Mutex<()>,
    /// In-flight notification deliveries.
    notifications: TaskTracker,
}

impl<S, N> WorkflowEngine<S, N>
where
    S: InstanceStore,
    N: NotificationEmitter + Clone + 'static,
{
    pub fn new(store: S, notifier: N) -> Self {
        Self {
            store,
            notifier,
            timezone: Tz::UTC,
            overdue_policy: OverduePolicy::default(),
            sweep_lock: Mutex::new(()),
            notifications: TaskTracker::new(),
        }
    }

    /// Timezone that defines "today" for completion dates and sweeps.
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn with_overdue_policy(mut self, policy: OverduePolicy) -> Self {
        self.overdue_policy = policy;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn overdue_policy(&self) -> OverduePolicy {
        self.overdue_policy
    }

    /// Current calendar date in the engine timezone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }

    /// Generate the chain for `kind` and persist a fresh instance.
    ///
    /// The first step stays pending; nothing is started or notified.
    pub async fn create_instance(
        &self,
        process_id: &str,
        process_title: &str,
        anchor: NaiveDate,
        kind: ProcessKind,
    ) -> Result<WorkflowInstance> {
        let mut instance =
            WorkflowInstance::from_template(process_id, process_title, anchor, kind)?;
        instance.touch(Utc::now());
        self.store.save(&instance).await?;

        info!(
            instance_id = %instance.id,
            process_id = %instance.process_id,
            kind = %kind,
            "Workflow instance created"
        );
        Ok(instance)
    }

    pub async fn get_instance(&self, id: Uuid) -> Result<WorkflowInstance> {
        self.store.load(id).await
    }

    pub async fn list_instances(&self) -> Result<Vec<WorkflowInstance>> {
        self.store.list_all().await
    }

    /// Move a step to `status`, advancing the cursor and auto-starting the
    /// next step when the cursor step finishes.
    pub async fn transition_step(
        &self,
        id: Uuid,
        step_id: &str,
        status: StepStatus,
    ) -> Result<WorkflowInstance> {
        let mut instance = self.store.load(id).await?;
        let outcome = instance.apply_transition(step_id, status, self.today())?;

        instance.touch(Utc::now());
        self.store.save(&instance).await?;

        info!(
            instance_id = %instance.id,
            step_id = %step_id,
            from = %outcome.from,
            status = %outcome.to,
            current_step = %instance.current_step,
            "Step transitioned"
        );

        if let Some(started) = &outcome.started {
            self.notify_started(&instance, started);
        }
        Ok(instance)
    }

    /// Halt an instance; the sweep ignores it until resumed.
    pub async fn pause_instance(&self, id: Uuid) -> Result<WorkflowInstance> {
        let mut instance = self.store.load(id).await?;
        instance.pause()?;
        instance.touch(Utc::now());
        self.store.save(&instance).await?;

        info!(instance_id = %id, "Workflow instance paused");
        Ok(instance)
    }

    pub async fn resume_instance(&self, id: Uuid) -> Result<WorkflowInstance> {
        let mut instance = self.store.load(id).await?;
        instance.resume()?;
        instance.touch(Utc::now());
        self.store.save(&instance).await?;

        info!(instance_id = %id, status = %instance.status, "Workflow instance resumed");
        Ok(instance)
    }

    /// Administrative override of a step status. No notifications.
    pub async fn override_step_status(
        &self,
        id: Uuid,
        step_id: &str,
        status: StepStatus,
    ) -> Result<WorkflowInstance> {
        let mut instance = self.store.load(id).await?;
        let previous = instance.override_status(step_id, status, self.today())?;
        instance.touch(Utc::now());
        self.store.save(&instance).await?;

        warn!(
            instance_id = %id,
            step_id = %step_id,
            from = %previous,
            status = %status,
            "Step status overridden"
        );
        Ok(instance)
    }

    /// Complete every automatable step that is due on `today`.
    ///
    /// Failures are recorded per instance and never abort the sweep.
    /// Cancellation stops before the next instance; the one in flight
    /// finishes. Concurrent sweeps queue on an internal lock.
    pub async fn run_automatic_sweep(
        &self,
        today: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<Vec<SweepResult>> {
        let _guard = self.sweep_lock.lock().await;

        let instances = self.store.list_active().await?;
        debug!(count = instances.len(), %today, "Sweeping active instances");

        let mut results = Vec::new();
        for instance in instances {
            if cancel.is_cancelled() {
                info!("Sweep cancelled before all instances were inspected");
                break;
            }
            self.sweep_instance(instance, today, &mut results).await;
        }

        Ok(results)
    }

    async fn sweep_instance(
        &self,
        mut instance: WorkflowInstance,
        today: NaiveDate,
        results: &mut Vec<SweepResult>,
    ) {
        // Each pass finishes one step, so the chain length bounds the drain.
        for _ in 0..instance.steps.len() {
            let Some(step) = sweep_candidate(&instance, today, self.overdue_policy) else {
                break;
            };
            let step_id = step.id.clone();

            match self.complete_automatically(&mut instance, &step_id, today).await {
                Ok(()) => {
                    info!(
                        instance_id = %instance.id,
                        step_id = %step_id,
                        "Automatable step completed"
                    );
                    results.push(SweepResult::completed(instance.id, step_id));
                }
                Err(e) => {
                    warn!(
                        instance_id = %instance.id,
                        step_id = %step_id,
                        error = %e,
                        "Automatic completion failed"
                    );
                    results.push(SweepResult::failed(instance.id, step_id, e.to_string()));
                    break;
                }
            }
        }
    }

    /// Persist a completion on a copy so a failed save leaves `instance`
    /// untouched.
    async fn complete_automatically(
        &self,
        instance: &mut WorkflowInstance,
        step_id: &str,
        today: NaiveDate,
    ) -> Result<()> {
        let mut next = instance.clone();
        let outcome = next.apply_transition(step_id, StepStatus::Completed, today)?;
        next.touch(Utc::now());
        self.store.save(&next).await?;

        *instance = next;
        if let Some(started) = &outcome.started {
            self.notify_started(instance, started);
        }
        Ok(())
    }

    /// Wait for every notification spawned so far to be delivered.
    pub async fn drain_notifications(&self) {
        self.notifications.close();
        self.notifications.wait().await;
        self.notifications.reopen();
    }

    /// Deliver in the background; the transition never waits on the emitter.
    fn notify_started(&self, instance: &WorkflowInstance, started: &StartedStep) {
        let Some(step) = instance.step(&started.step_id) else {
            return;
        };
        let notification =
            StepNotification::for_started_step(instance, step, started.trigger.into());
        let notifier = self.notifier.clone();

        self.notifications.spawn(async move {
            if let Err(e) = notifier.emit(&notification).await {
                warn!(
                    instance_id = %notification.instance_id,
                    step_id = %notification.step_id,
                    error = %e,
                    "Failed to emit step notification"
                );
            }
        });
    }
}

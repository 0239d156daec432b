use tokio::sync::watch;

/// Pause/resume switch for the tick cadence.
///
/// Pausing only stops ticks from being taken. It never touches policy
/// state: cooldowns and daily counters are wall-clock anchored and simply
/// resume where they were.
pub fn tick_scheduler() -> (SchedulerHandle, TickGate) {
    let (tx, rx) = watch::channel(true);
    (SchedulerHandle { tx }, TickGate { rx })
}

/// Held by whoever controls the loop (e.g. the window host).
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    tx: watch::Sender<bool>,
}

impl SchedulerHandle {
    pub fn pause(&self) {
        self.tx.send_replace(false);
    }

    pub fn resume(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_running(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Held by the driver loop.
#[derive(Debug, Clone)]
pub struct TickGate {
    rx: watch::Receiver<bool>,
}

impl TickGate {
    pub fn is_running(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves on the next pause/resume change. Returns false once every
    /// handle has been dropped.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

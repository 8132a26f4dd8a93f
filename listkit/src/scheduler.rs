/// A tick-driven, single-threaded task scheduler owned by one control instance.
///
/// Nothing runs on its own: the owner calls [`Scheduler::pop_due`] from its frame tick and
/// executes whatever comes back. Scheduling a task that is already pending moves its deadline
/// (cancel-and-reschedule), so repeated requests within one frame collapse into one run.
#[derive(Clone, Debug)]
pub struct Scheduler<T> {
    pending: Vec<(T, u64)>,
    paused: bool,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
            paused: false,
        }
    }
}

impl<T: Copy + PartialEq + core::fmt::Debug> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `task` to run at or after `due_ms`, replacing any pending run of the same task.
    pub fn schedule(&mut self, task: T, due_ms: u64) {
        if let Some(entry) = self.pending.iter_mut().find(|(t, _)| *t == task) {
            ltrace!(?task, due_ms, "scheduler: rescheduled");
            entry.1 = due_ms;
            return;
        }
        ltrace!(?task, due_ms, "scheduler: scheduled");
        self.pending.push((task, due_ms));
    }

    /// Returns whether `task` was pending.
    pub fn cancel(&mut self, task: T) -> bool {
        let before = self.pending.len();
        self.pending.retain(|(t, _)| *t != task);
        before != self.pending.len()
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn is_scheduled(&self, task: T) -> bool {
        self.pending.iter().any(|(t, _)| *t == task)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Holds pending tasks without dropping them. Idempotent.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Idempotent.
    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Removes and returns the tasks due at `now_ms`, earliest deadline first.
    ///
    /// Returns nothing while paused.
    pub fn pop_due(&mut self, now_ms: u64) -> Vec<T> {
        if self.paused || self.pending.is_empty() {
            return Vec::new();
        }
        let mut due: Vec<(T, u64)> = Vec::new();
        self.pending.retain(|&(task, at)| {
            if at <= now_ms {
                due.push((task, at));
                false
            } else {
                true
            }
        });
        due.sort_by_key(|&(_, at)| at);
        ltrace!(count = due.len(), now_ms, "scheduler: dispatch");
        due.into_iter().map(|(task, _)| task).collect()
    }

    /// Earliest pending deadline, if any (for hosts that sleep between frames).
    pub fn next_due(&self) -> Option<u64> {
        self.pending.iter().map(|&(_, at)| at).min()
    }
}

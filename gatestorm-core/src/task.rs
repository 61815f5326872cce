use futures::future::BoxFuture;

use crate::error::TaskResult;
use crate::session::Session;

/// Body of a task: borrows the user state and the session for the duration of one invocation.
pub type TaskFn<U> = for<'a> fn(&'a mut U, &'a mut Session) -> BoxFuture<'a, TaskResult>;

pub struct Task<U> {
    pub name: &'static str,
    pub weight: u32,
    pub run: TaskFn<U>,
}

impl<U> Task<U> {
    pub const fn new(name: &'static str, weight: u32, run: TaskFn<U>) -> Self {
        Self { name, weight, run }
    }
}

impl<U> Clone for Task<U> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<U> Copy for Task<U> {}

impl<U> std::fmt::Debug for Task<U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("weight", &self.weight)
            .finish_non_exhaustive()
    }
}

/// Weighted task table of an archetype. Selection probability is `weight / total_weight`.
pub struct TaskSet<U> {
    tasks: Vec<Task<U>>,
}

impl<U> TaskSet<U> {
    pub fn new(tasks: impl IntoIterator<Item = Task<U>>) -> Self {
        Self {
            tasks: tasks.into_iter().collect(),
        }
    }

    pub fn total_weight(&self) -> u64 {
        self.tasks.iter().map(|t| u64::from(t.weight)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_weight() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task<U>> {
        self.tasks.iter()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(|t| t.name).collect()
    }

    pub fn pick(&self, rng: &mut fastrand::Rng) -> Option<&Task<U>> {
        let total = self.total_weight();
        if total == 0 {
            return None;
        }

        let mut roll = rng.u64(0..total);
        for task in &self.tasks {
            let w = u64::from(task.weight);
            if roll < w {
                return Some(task);
            }
            roll -= w;
        }
        None
    }
}

impl<U> std::fmt::Debug for TaskSet<U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.tasks.iter()).finish()
    }
}

pub mod scheduler;

pub use scheduler::{SchedulerHandle, SchedulerOptions, spawn_scheduler};

#[cfg(test)]
mod tests;

//! # Task Management System
//!
//! A small worker pool for the CPU-bound stages of the chunk pipeline
//! (generation and meshing).
//!
//! ## Architecture Overview
//! - `TaskManager`: owns the workers, distributes tasks and collects results
//! - `Task`: a self-contained unit of work executed on a worker
//! - `TaskResult`: the output of a task, turned into chunk commands on the
//!   owning thread
//! - `TaskChannel`: the pair of channels connecting the manager to one worker
//!
//! Each worker is a `std::thread` reading tasks from its own mpsc channel and
//! sending results back on another. Tasks are handed out round-robin, one in
//! flight per worker; anything that finds every worker busy waits in a FIFO
//! queue until `process_queued_tasks` is called again.
//!
//! A manager created with zero workers runs queued tasks inline inside
//! `process_queued_tasks`. Results then flow through exactly the same path,
//! which makes the whole pipeline deterministic for tests.
//!
//! ## Usage
//! ```text
//! task_manager.publish_task(Box::new(task));
//!
//! // once per tick, on the owning thread:
//! task_manager.process_queued_tasks();
//! task_manager.process_completed_tasks(&mut command_buffer);
//! ```

pub mod task;

use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use task::{Task, TaskResult};

use super::command_buffer::CommandBuffer;

/// Connection between the manager and one worker thread.
#[derive(Debug)]
pub struct TaskChannel {
    task_sender: Sender<Box<dyn Task + Send>>,
    result_receiver: Receiver<Box<dyn TaskResult + Send>>,
    num_tasks_in_flight: usize,
    _worker: JoinHandle<()>,
}

/// Coordinates task execution across a pool of worker threads.
///
/// Dropping the manager closes every task channel, which ends the worker
/// loops; workers finish the task they are running and exit.
pub struct TaskManager {
    channels: Vec<TaskChannel>,
    queued_tasks: VecDeque<Box<dyn Task + Send>>,
    inline_results: Vec<Box<dyn TaskResult + Send>>,
    current_channel: usize,
}

/// Maximum number of tasks that can be in flight per worker channel.
pub const MAX_TASKS_IN_FLIGHT: usize = 1;

impl TaskManager {
    /// Creates a manager with `num_workers` threads. Zero means inline execution.
    pub fn new(num_workers: usize) -> Self {
        let mut channels = Vec::with_capacity(num_workers);

        if num_workers > 0 {
            log::info!(
                "Starting {} chunk workers (available parallelism: {:?})",
                num_workers,
                thread::available_parallelism()
            );
        } else {
            log::info!("Running chunk tasks inline");
        }

        for index in 0..num_workers {
            let (task_tx, task_rx) = channel::<Box<dyn Task + Send>>();
            let (result_tx, result_rx) = channel::<Box<dyn TaskResult + Send>>();

            let worker = thread::Builder::new()
                .name(format!("chunk-worker-{index}"))
                .spawn(move || {
                    while let Ok(task) = task_rx.recv() {
                        let result = task.process();
                        if result_tx.send(result).is_err() {
                            break;
                        }
                    }
                });

            match worker {
                Ok(worker) => channels.push(TaskChannel {
                    task_sender: task_tx,
                    result_receiver: result_rx,
                    num_tasks_in_flight: 0,
                    _worker: worker,
                }),
                Err(err) => log::error!("Failed to spawn chunk worker {}: {}", index, err),
            }
        }

        TaskManager {
            channels,
            queued_tasks: VecDeque::new(),
            inline_results: Vec::new(),
            current_channel: 0,
        }
    }

    /// Number of live worker threads.
    pub fn worker_count(&self) -> usize {
        self.channels.len()
    }

    /// Tasks waiting for a free worker.
    pub fn queued_len(&self) -> usize {
        self.queued_tasks.len()
    }

    /// Tasks currently running on workers.
    pub fn in_flight(&self) -> usize {
        self.channels.iter().map(|c| c.num_tasks_in_flight).sum()
    }

    /// `true` when nothing is queued, running, or waiting to be handled.
    pub fn is_idle(&self) -> bool {
        self.queued_tasks.is_empty() && self.inline_results.is_empty() && self.in_flight() == 0
    }

    fn try_send_task(
        &mut self,
        task: Box<dyn Task + Send>,
        channel_idx: usize,
    ) -> Result<(), Box<dyn Task + Send>> {
        match self.channels[channel_idx].task_sender.send(task) {
            Ok(_) => {
                self.channels[channel_idx].num_tasks_in_flight += 1;
                Ok(())
            }
            Err(err) => Err(err.0),
        }
    }

    /// Round-robin search for a channel below `MAX_TASKS_IN_FLIGHT`.
    fn find_available_channel(&self) -> Option<usize> {
        let len = self.channels.len();
        (0..len)
            .map(|offset| (self.current_channel + offset) % len)
            .find(|&idx| self.channels[idx].num_tasks_in_flight < MAX_TASKS_IN_FLIGHT)
    }

    /// Schedules a task, or queues it when every worker is busy.
    ///
    /// Returns `true` if the task went straight to a worker.
    pub fn publish_task(&mut self, task: Box<dyn Task + Send>) -> bool {
        let Some(channel_idx) = self.find_available_channel() else {
            self.queued_tasks.push_back(task);
            return false;
        };

        match self.try_send_task(task, channel_idx) {
            Ok(_) => {
                self.current_channel = (channel_idx + 1) % self.channels.len();
                true
            }
            Err(task) => {
                log::warn!("Chunk worker {} disconnected, queueing task", channel_idx);
                self.queued_tasks.push_back(task);
                false
            }
        }
    }

    /// Moves queued tasks onto free workers, oldest first.
    ///
    /// Without workers this runs every queued task to completion right here.
    pub fn process_queued_tasks(&mut self) {
        if self.channels.is_empty() {
            while let Some(task) = self.queued_tasks.pop_front() {
                self.inline_results.push(task.process());
            }
            return;
        }

        while let Some(channel_idx) = self.find_available_channel() {
            let Some(task) = self.queued_tasks.pop_front() else {
                break;
            };
            match self.try_send_task(task, channel_idx) {
                Ok(_) => self.current_channel = (channel_idx + 1) % self.channels.len(),
                Err(task) => {
                    // Channel is disconnected, put task back and stop processing
                    self.queued_tasks.push_front(task);
                    break;
                }
            }
        }
    }

    /// Drains every finished result into `commands`.
    ///
    /// Returns the number of results handled.
    pub fn process_completed_tasks(&mut self, commands: &mut CommandBuffer) -> usize {
        let mut handled = 0;

        for result in self.inline_results.drain(..) {
            commands.extend(result.handle_result());
            handled += 1;
        }

        for (idx, channel) in self.channels.iter_mut().enumerate() {
            loop {
                match channel.result_receiver.try_recv() {
                    Ok(result) => {
                        channel.num_tasks_in_flight = channel.num_tasks_in_flight.saturating_sub(1);
                        commands.extend(result.handle_result());
                        handled += 1;
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        if channel.num_tasks_in_flight > 0 {
                            log::error!(
                                "Chunk worker {} died with {} task(s) in flight",
                                idx,
                                channel.num_tasks_in_flight
                            );
                            channel.num_tasks_in_flight = 0;
                        }
                        break;
                    }
                }
            }
        }

        handled
    }
}

// Motion command sequencer
//
// Serializes motion requests into one ordered execution stream. A dedicated
// worker thread owns the drivetrain: it pops commands in FIFO order, inserts
// a settling pause between consecutive commands (residual momentum from the
// previous stop would corrupt the next command's tick baseline), and applies
// each command to the pose exactly once, when its physical motion completes.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering::SeqCst};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::config::SequencerConfig;
use crate::drive::pose::Pose;
use crate::drive::Drivetrain;
use crate::retcode::Retcode;

/// One queued motion. Immutable once enqueued, consumed by the worker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionCommand {
    /// Rotate on the spot by the signed angle in radians.
    Turn(f64),
    /// Drive straight by the signed distance in cm.
    Drive(f64),
}

/// State shared between the caller-facing API and the worker thread. The
/// queue is the only multi-writer structure; the flags are single-writer.
struct SeqShared {
    queue: Mutex<VecDeque<MotionCommand>>,
    pose: Mutex<Pose>,
    running: AtomicBool,
    speed: AtomicI32,
    shutdown: AtomicBool,
}

impl SeqShared {
    fn queue(&self) -> MutexGuard<'_, VecDeque<MotionCommand>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pose(&self) -> MutexGuard<'_, Pose> {
        self.pose.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct MotionSequencer {
    shared: Arc<SeqShared>,
    config: SequencerConfig,
    thread: Option<JoinHandle<()>>,
}

impl MotionSequencer {
    /// Take ownership of a drivetrain and start the worker thread. The
    /// sequencer comes up idle with an empty queue.
    pub fn spawn(drivetrain: impl Drivetrain + 'static, config: SequencerConfig) -> Self {
        let shared = Arc::new(SeqShared {
            queue: Mutex::new(VecDeque::new()),
            pose: Mutex::new(Pose::default()),
            running: AtomicBool::new(false),
            speed: AtomicI32::new(config.default_speed),
            shutdown: AtomicBool::new(false),
        });

        let thread = {
            let shared = Arc::clone(&shared);
            let config = config.clone();
            thread::spawn(move || worker(drivetrain, &shared, &config))
        };

        Self {
            shared,
            config,
            thread: Some(thread),
        }
    }

    /// Append a turn. Legal in any state; executes once the sequence runs.
    pub fn enqueue_turn(&self, angle_rad: f64) {
        self.shared.queue().push_back(MotionCommand::Turn(angle_rad));
    }

    /// Append a straight move. Legal in any state.
    pub fn enqueue_drive(&self, distance_cm: f64) {
        self.shared
            .queue()
            .push_back(MotionCommand::Drive(distance_cm));
    }

    /// Begin executing the queued commands. `NotApplicable` if a sequence
    /// is already running, `Rejected` if the queue is empty.
    pub fn start(&self) -> Retcode {
        if self.shared.running.load(SeqCst) {
            return Retcode::NotApplicable;
        }
        if self.shared.queue().is_empty() {
            return Retcode::Rejected;
        }
        // Only the caller that wins the false->true transition owns the
        // start; a racing caller gets the already-running answer.
        if self
            .shared
            .running
            .compare_exchange(false, true, SeqCst, SeqCst)
            .is_err()
        {
            return Retcode::NotApplicable;
        }
        info!("starting motion sequence");
        Retcode::Ok
    }

    /// True when no command is executing and the queue has drained (including
    /// the settling pause after the last command).
    pub fn target_reached(&self) -> bool {
        !self.shared.running.load(SeqCst)
    }

    /// Busy-poll until the sequence completes. `NotApplicable` when already
    /// idle.
    pub fn await_sequence_complete(&self) -> Retcode {
        if self.target_reached() {
            return Retcode::NotApplicable;
        }
        while !self.target_reached() {
            thread::sleep(self.config.poll_period());
        }
        Retcode::Ok
    }

    /// Snapshot of the dead-reckoned pose.
    pub fn pose(&self) -> Pose {
        *self.shared.pose()
    }

    /// Wheel speed used for subsequent commands, in ticks/s.
    pub fn set_speed(&self, ticks_per_second: i32) {
        self.shared.speed.store(ticks_per_second, SeqCst);
    }

    /// Enqueue the shortest rotation that ends at the given absolute
    /// heading, judged against the pose at call time. With commands still
    /// queued or in flight the result is not guaranteed accurate.
    pub fn turn_to(&self, heading_rad: f64) {
        let delta = self.shared.pose().shortest_angle_to(heading_rad);
        self.enqueue_turn(delta);
    }

    /// Enqueue a turn toward the vector `(dx, dy)` followed by a drive of
    /// its magnitude, both as plain relative commands.
    pub fn drive_vector(&self, dx: f64, dy: f64) {
        self.turn_to(dy.atan2(dx));
        self.enqueue_drive(dx.hypot(dy));
    }
}

impl Drop for MotionSequencer {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Sleep `duration` in poll-sized slices, bailing out early on shutdown.
/// Returns false once shutdown is observed.
fn settle(duration: Duration, poll: Duration, shutdown: &AtomicBool) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if shutdown.load(SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep(poll.min(deadline - now));
    }
}

fn worker(mut drivetrain: impl Drivetrain, shared: &SeqShared, config: &SequencerConfig) {
    // The first command after Idle->Running skips the settling pause; the
    // robot is already at rest when a sequence starts.
    let mut first_in_sequence = true;

    'outer: while !shared.shutdown.load(SeqCst) {
        if !shared.running.load(SeqCst) {
            first_in_sequence = true;
            thread::sleep(config.poll_period());
            continue;
        }

        let head = shared.queue().front().copied();
        let Some(command) = head else {
            // Let the last motion settle, then go idle unless something was
            // enqueued in the meantime.
            if !settle(config.settle_timeout(), config.poll_period(), &shared.shutdown) {
                break;
            }
            let queue = shared.queue();
            if queue.is_empty() {
                info!("queue drained, sequence complete");
                shared.running.store(false, SeqCst);
            }
            continue;
        };

        if !first_in_sequence
            && !settle(config.settle_timeout(), config.poll_period(), &shared.shutdown)
        {
            break;
        }
        first_in_sequence = false;

        let speed = shared.speed.load(SeqCst);
        debug!(?command, speed, "executing motion command");
        let issued = match command {
            MotionCommand::Turn(angle) => drivetrain.turn(speed, angle),
            MotionCommand::Drive(distance) => drivetrain.drive(speed, distance),
        };

        match issued {
            Err(e) => {
                // No retry policy: the command is dropped without a pose
                // update and the sequence moves on.
                error!(?command, "drivetrain rejected command: {e}");
            }
            Ok(()) => {
                while !drivetrain.is_done() {
                    if shared.shutdown.load(SeqCst) {
                        break 'outer;
                    }
                    thread::sleep(config.poll_period());
                }
                // The worker is the pose's only writer, so the stored
                // heading still is the heading this motion started at.
                let mut pose = shared.pose();
                match command {
                    MotionCommand::Turn(angle) => pose.rotate(angle),
                    MotionCommand::Drive(distance) => pose.advance(distance),
                }
            }
        }

        shared.queue().pop_front();
    }

    if let Err(e) = drivetrain.stop() {
        error!("failed to stop drivetrain on teardown: {e}");
    }
}

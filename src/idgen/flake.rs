//! Time-ordered 64-bit id generator.

use std::net::{IpAddr, SocketAddr};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

const BITS_TIME: u32 = 39;
const BITS_SEQUENCE: u32 = 8;
const BITS_MACHINE_ID: u32 = 16;

const SEQUENCE_MASK: u16 = (1 << BITS_SEQUENCE) - 1;

/// Length of one tick.
pub const TICK: Duration = Duration::from_millis(10);

/// 2014-09-01T00:00:00Z.
const DEFAULT_EPOCH_SECS: u64 = 1_409_529_600;

/// Errors raised while assigning an id.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// The wall clock is behind the last issued tick by more than the tolerance.
    #[error("clock moved backwards by {behind_ms} ms")]
    ClockMovedBackwards { behind_ms: u64 },

    /// The elapsed time no longer fits the time field.
    #[error("time since epoch exceeds the 39-bit limit")]
    TimeOverflow,

    /// The configured epoch lies in the future.
    #[error("epoch is in the future")]
    EpochInFuture,
}

/// Fields of a decoded id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdParts {
    pub elapsed_ticks: u64,
    pub sequence: u16,
    pub machine_id: u16,
}

/// Source of wall-clock time, replaceable in tests.
pub(crate) trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Clock whose value is set by the test, in milliseconds since UNIX epoch.
#[cfg(test)]
pub(crate) struct ManualClock(pub std::sync::Arc<std::sync::atomic::AtomicU64>);

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        UNIX_EPOCH
            + Duration::from_millis(self.0.load(std::sync::atomic::Ordering::SeqCst))
    }
}

#[derive(Debug)]
struct State {
    elapsed: u64,
    sequence: u16,
}

/// Generator of unique, monotonically non-decreasing ids.
///
/// Safe to share between tasks; callers serialize on an internal mutex only
/// for the duration of a clock read. Waiting for a future tick happens after
/// the lock is released.
pub struct IdGenerator {
    epoch: SystemTime,
    machine_id: u16,
    max_backward_ticks: u64,
    clock: Box<dyn Clock>,
    state: Mutex<State>,
}

impl std::fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdGenerator")
            .field("machine_id", &self.machine_id)
            .field("max_backward_ticks", &self.max_backward_ticks)
            .finish()
    }
}

impl IdGenerator {
    /// Create a generator using the default epoch and the system clock.
    pub fn new(machine_id: u16, max_clock_backward: Duration) -> Result<Self, GenerationError> {
        let epoch = UNIX_EPOCH + Duration::from_secs(DEFAULT_EPOCH_SECS);
        Self::with_clock(epoch, machine_id, max_clock_backward, Box::new(SystemClock))
    }

    pub(crate) fn with_clock(
        epoch: SystemTime,
        machine_id: u16,
        max_clock_backward: Duration,
        clock: Box<dyn Clock>,
    ) -> Result<Self, GenerationError> {
        if epoch > clock.now() {
            return Err(GenerationError::EpochInFuture);
        }

        Ok(Self {
            epoch,
            machine_id,
            max_backward_ticks: to_ticks(max_clock_backward),
            clock,
            state: Mutex::new(State {
                elapsed: 0,
                sequence: 0,
            }),
        })
    }

    /// Issue the next id.
    ///
    /// When the id lies in a future tick, resolves once that tick is reached.
    pub async fn next_id(&self) -> Result<u64, GenerationError> {
        let (id, wait) = self.reserve()?;
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
        Ok(id)
    }

    /// Assign an id under the lock and report how long until its tick starts.
    fn reserve(&self) -> Result<(u64, Duration), GenerationError> {
        // A poisoned lock only means another caller panicked mid-update;
        // the state is two integers and stays consistent.
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        let current = self.elapsed_ticks();
        let mut wait = Duration::ZERO;

        if current > state.elapsed {
            state.elapsed = current;
            state.sequence = 0;
        } else {
            // One extra tick covers the slot reserved by sequence exhaustion.
            let behind = state.elapsed - current;
            if behind > self.max_backward_ticks + 1 {
                return Err(GenerationError::ClockMovedBackwards {
                    behind_ms: behind * TICK.as_millis() as u64,
                });
            }

            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                state.elapsed += 1;
                let overtime = state.elapsed.saturating_sub(current);
                wait = self.sleep_time(overtime);
            }
        }

        Ok((self.compose(state.elapsed, state.sequence)?, wait))
    }

    fn compose(&self, elapsed: u64, sequence: u16) -> Result<u64, GenerationError> {
        if elapsed >= 1 << BITS_TIME {
            return Err(GenerationError::TimeOverflow);
        }

        Ok(elapsed << (BITS_SEQUENCE + BITS_MACHINE_ID)
            | (sequence as u64) << BITS_MACHINE_ID
            | self.machine_id as u64)
    }

    /// Split an id into its fields.
    pub fn decompose(id: u64) -> IdParts {
        IdParts {
            elapsed_ticks: id >> (BITS_SEQUENCE + BITS_MACHINE_ID),
            sequence: ((id >> BITS_MACHINE_ID) as u16) & SEQUENCE_MASK,
            machine_id: id as u16,
        }
    }

    fn elapsed_ticks(&self) -> u64 {
        // Clock before the epoch counts as tick zero and is caught by the
        // backwards check.
        let elapsed = self
            .clock
            .now()
            .duration_since(self.epoch)
            .unwrap_or_default();
        to_ticks(elapsed)
    }

    /// Time left until the clock reaches `overtime` ticks past the current one.
    fn sleep_time(&self, overtime: u64) -> Duration {
        let since_epoch = self
            .clock
            .now()
            .duration_since(self.epoch)
            .unwrap_or_default();
        let into_tick = Duration::from_nanos((since_epoch.as_nanos() % TICK.as_nanos()) as u64);
        (TICK * overtime as u32).saturating_sub(into_tick)
    }
}

fn to_ticks(d: Duration) -> u64 {
    (d.as_nanos() / TICK.as_nanos()) as u64
}

/// Pick a machine id for this process.
///
/// An explicit id wins. Otherwise the low 16 bits of a private IPv4 bind
/// address are used, and failing that a random id.
pub fn machine_id_for(configured: Option<u16>, bind: Option<SocketAddr>) -> u16 {
    if let Some(id) = configured {
        return id;
    }

    match bind.map(|addr| addr.ip()) {
        Some(IpAddr::V4(ip)) if ip.is_private() => {
            let octets = ip.octets();
            u16::from_be_bytes([octets[2], octets[3]])
        }
        _ => rand::random(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    fn manual(start_ms: u64, tolerance: Duration) -> (IdGenerator, Arc<AtomicU64>) {
        let now = Arc::new(AtomicU64::new(start_ms));
        let generator = IdGenerator::with_clock(
            UNIX_EPOCH,
            7,
            tolerance,
            Box::new(ManualClock(now.clone())),
        )
        .unwrap();
        (generator, now)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_ids_are_unique() {
        let generator = Arc::new(IdGenerator::new(1, Duration::from_secs(1)).unwrap());
        let mut handles = Vec::new();

        for _ in 0..8 {
            let generator = generator.clone();
            handles.push(tokio::spawn(async move {
                let mut ids = Vec::with_capacity(1000);
                for _ in 0..1000 {
                    ids.push(generator.next_id().await.unwrap());
                }
                ids
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.await.unwrap() {
                assert!(seen.insert(id), "duplicate id {}", id);
            }
        }
        assert_eq!(seen.len(), 8000);
    }

    #[tokio::test]
    async fn test_serial_ids_increase() {
        let generator = IdGenerator::new(1, Duration::from_secs(1)).unwrap();
        let mut last = generator.next_id().await.unwrap();
        for _ in 0..2000 {
            let id = generator.next_id().await.unwrap();
            assert!(id > last);
            last = id;
        }
    }

    #[test]
    fn test_id_layout() {
        let (generator, _) = manual(1_000, Duration::from_secs(1));
        let first = IdGenerator::decompose(generator.reserve().unwrap().0);
        let second = IdGenerator::decompose(generator.reserve().unwrap().0);

        assert_eq!(first.elapsed_ticks, 100);
        assert_eq!(first.sequence, 0);
        assert_eq!(first.machine_id, 7);
        assert_eq!(second.elapsed_ticks, 100);
        assert_eq!(second.sequence, 1);
    }

    #[test]
    fn test_sequence_resets_on_new_tick() {
        let (generator, now) = manual(1_000, Duration::from_secs(1));
        generator.reserve().unwrap();
        generator.reserve().unwrap();

        now.store(1_020, Ordering::SeqCst);
        let parts = IdGenerator::decompose(generator.reserve().unwrap().0);
        assert_eq!(parts.elapsed_ticks, 102);
        assert_eq!(parts.sequence, 0);
    }

    #[tokio::test]
    async fn test_sequence_exhaustion_moves_to_next_tick() {
        let (generator, _) = manual(1_000, Duration::from_secs(1));
        let mut ids = Vec::new();
        for _ in 0..=256 {
            ids.push(generator.next_id().await.unwrap());
        }

        let last = IdGenerator::decompose(*ids.last().unwrap());
        assert_eq!(last.elapsed_ticks, 101);
        assert_eq!(last.sequence, 0);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_exhaustion_wait_is_returned_not_slept() {
        let (generator, _) = manual(1_000, Duration::from_secs(1));
        for _ in 0..256 {
            let (_, wait) = generator.reserve().unwrap();
            assert!(wait.is_zero());
        }

        let (id, wait) = generator.reserve().unwrap();
        assert_eq!(IdGenerator::decompose(id).elapsed_ticks, 101);
        assert_eq!(wait, TICK);
        // The lock is free while the caller waits.
        assert!(generator.state.try_lock().is_ok());
    }

    #[test]
    fn test_small_clock_regression_is_tolerated() {
        let (generator, now) = manual(10_000, Duration::from_millis(100));
        let before = generator.reserve().unwrap().0;

        now.store(9_950, Ordering::SeqCst);
        let after = generator.reserve().unwrap().0;
        assert!(after > before);
        assert_eq!(IdGenerator::decompose(after).elapsed_ticks, 1_000);
    }

    #[test]
    fn test_large_clock_regression_fails() {
        let (generator, now) = manual(10_000, Duration::from_millis(100));
        generator.reserve().unwrap();

        now.store(8_000, Ordering::SeqCst);
        assert_eq!(
            generator.reserve().map(|(id, _)| id),
            Err(GenerationError::ClockMovedBackwards { behind_ms: 2_000 })
        );
    }

    #[test]
    fn test_epoch_in_future_is_rejected() {
        let now = Arc::new(AtomicU64::new(0));
        let result = IdGenerator::with_clock(
            UNIX_EPOCH + Duration::from_secs(60),
            1,
            Duration::from_secs(1),
            Box::new(ManualClock(now)),
        );
        assert_eq!(result.unwrap_err(), GenerationError::EpochInFuture);
    }

    #[test]
    fn test_time_overflow() {
        let overflow_ms = (1u64 << BITS_TIME) * 10;
        let (generator, _) = manual(overflow_ms, Duration::from_secs(1));
        assert_eq!(generator.reserve().map(|(id, _)| id), Err(GenerationError::TimeOverflow));
    }

    #[test]
    fn test_machine_id_selection() {
        assert_eq!(machine_id_for(Some(42), None), 42);

        let private: SocketAddr = "10.1.2.3:8080".parse().unwrap();
        assert_eq!(machine_id_for(None, Some(private)), 0x0203);
    }
}

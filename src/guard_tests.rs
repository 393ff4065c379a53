//! Unit tests for [`LengthGuard`] bound enforcement and release.

use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use rstest::{fixture, rstest};

use super::*;

/// Scripted codec returning queued outputs and counting calls.
#[derive(Debug)]
struct ScriptedCodec {
    outputs: VecDeque<Result<Chunk>>,
    tail: Result<Chunk>,
    calls: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
    phase: Phase,
}

#[derive(Clone, Debug, Default)]
struct Probe {
    calls: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
}

impl Probe {
    fn codec(&self, outputs: Vec<Result<Chunk>>, tail: Result<Chunk>) -> ScriptedCodec {
        ScriptedCodec {
            outputs: outputs.into(),
            tail,
            calls: Arc::clone(&self.calls),
            releases: Arc::clone(&self.releases),
            phase: Phase::Init,
        }
    }

    fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }

    fn releases(&self) -> usize { self.releases.load(Ordering::SeqCst) }
}

impl CodecDecoder for ScriptedCodec {
    fn encoding(&self) -> &'static str { "scripted" }

    fn phase(&self) -> Phase { self.phase }

    fn decode(&mut self, _input: Chunk) -> Result<Chunk> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.phase = Phase::Decoding;
        self.outputs.pop_front().unwrap_or_else(|| Ok(Chunk::empty()))
    }

    fn finish(&mut self) -> Result<Chunk> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.phase = Phase::Finished;
        std::mem::replace(&mut self.tail, Ok(Chunk::empty()))
    }

    fn release(&mut self) { self.releases.fetch_add(1, Ordering::SeqCst); }
}

fn bytes(n: usize) -> Chunk { Chunk::from(vec![b'x'; n]) }

#[fixture]
fn probe() -> Probe { Probe::default() }

#[rstest]
fn eleven_bytes_over_a_ten_byte_bound_fails(probe: Probe) {
    let mut guard = LengthGuard::new(probe.codec(vec![Ok(bytes(11))], Ok(Chunk::empty())), MaxLength::new(10));

    let err = guard.decode(Chunk::from_static(b"z")).expect_err("bound exceeded");

    assert!(matches!(
        err,
        DecodeError::ContentTooLarge { attempted: 11, limit } if limit.get() == 10
    ));
    assert_eq!(guard.decoded_len(), 0, "rejected output is never counted");
    assert_eq!(guard.phase(), Phase::Failed);
    assert_eq!(probe.releases(), 1);
}

#[rstest]
fn nine_then_one_byte_fits_a_ten_byte_bound(probe: Probe) {
    let mut guard = LengthGuard::new(probe.codec(vec![Ok(bytes(9))], Ok(bytes(1))), MaxLength::new(10));

    let first = guard.decode(Chunk::from_static(b"z")).expect("within bound");
    let tail = guard.finish().expect("exactly at bound");

    assert_eq!(first.len() + tail.len(), 10);
    assert_eq!(guard.decoded_len(), 10);
    assert_eq!(guard.phase(), Phase::Finished);
    assert_eq!(probe.releases(), 1);
}

#[rstest]
fn finish_overflow_discards_tail(probe: Probe) {
    let mut guard = LengthGuard::new(probe.codec(vec![Ok(bytes(9))], Ok(bytes(2))), MaxLength::new(10));

    guard.decode(Chunk::from_static(b"z")).expect("within bound");
    let err = guard.finish().expect_err("tail crosses bound");

    assert!(matches!(err, DecodeError::ContentTooLarge { attempted: 11, .. }));
    assert_eq!(guard.decoded_len(), 9);
}

#[rstest]
fn poisoned_guard_never_touches_inner_codec(probe: Probe) {
    let mut guard = LengthGuard::new(probe.codec(vec![Ok(bytes(11))], Ok(Chunk::empty())), MaxLength::new(10));
    guard.decode(Chunk::from_static(b"z")).expect_err("bound exceeded");
    let calls = probe.calls();

    for _ in 0..3 {
        let err = guard.decode(Chunk::from_static(b"more")).expect_err("poisoned");
        assert!(matches!(
            err,
            DecodeError::IllegalState {
                operation: Operation::Decode,
                phase: Phase::Failed
            }
        ));
    }
    let err = guard.finish().expect_err("poisoned");
    assert!(matches!(err, DecodeError::IllegalState { operation: Operation::Finish, .. }));

    assert_eq!(probe.calls(), calls);
    assert_eq!(probe.releases(), 1);
}

#[rstest]
fn inner_corruption_poisons_guard(probe: Probe) {
    let corrupt = Err(DecodeError::corruption("scripted", "bad block"));
    let mut guard = LengthGuard::new(probe.codec(vec![corrupt], Ok(Chunk::empty())), MaxLength::UNLIMITED);

    let err = guard.decode(Chunk::from_static(b"z")).expect_err("corrupt input");

    assert_eq!(err.error_type(), "codec_corruption");
    assert_eq!(guard.phase(), Phase::Failed);
    assert!(guard.decode(Chunk::empty()).is_err());
    assert_eq!(probe.releases(), 1);
}

#[rstest]
fn unlimited_bound_passes_everything_through(probe: Probe) {
    let outputs = (0..64).map(|_| Ok(bytes(64 * 1024))).collect();
    let mut guard = LengthGuard::new(probe.codec(outputs, Ok(Chunk::empty())), MaxLength::UNLIMITED);

    for _ in 0..64 {
        guard.decode(Chunk::from_static(b"z")).expect("no bound");
    }
    guard.finish().expect("no bound");

    assert_eq!(guard.decoded_len(), 64 * 64 * 1024);
    assert_eq!(guard.max_length(), 0);
}

#[rstest]
fn decode_after_finish_is_illegal_state(probe: Probe) {
    let mut guard = LengthGuard::new(probe.codec(vec![], Ok(Chunk::empty())), MaxLength::new(10));
    guard.finish().expect("empty stream");

    let err = guard.decode(Chunk::empty()).expect_err("finished");
    assert!(matches!(
        err,
        DecodeError::IllegalState {
            operation: Operation::Decode,
            phase: Phase::Finished
        }
    ));
    let err = guard.finish().expect_err("second finish");
    assert!(matches!(err, DecodeError::IllegalState { operation: Operation::Finish, .. }));
}

#[rstest]
fn drop_releases_exactly_once(probe: Probe) {
    {
        let mut guard = LengthGuard::new(probe.codec(vec![Ok(bytes(3))], Ok(Chunk::empty())), MaxLength::new(10));
        guard.decode(Chunk::from_static(b"z")).expect("within bound");
    }
    assert_eq!(probe.releases(), 1);

    {
        let mut guard = LengthGuard::new(probe.codec(vec![], Ok(Chunk::empty())), MaxLength::new(10));
        guard.release();
        guard.release();
    }
    assert_eq!(probe.releases(), 2);
}

#[rstest]
#[case(MaxLength::new(10), Some(7))]
#[case(MaxLength::UNLIMITED, None)]
fn remaining_budget_is_forwarded(#[case] bound: MaxLength, #[case] expected: Option<u64>) {
    let probe = Probe::default();
    let mut guard = LengthGuard::new(probe.codec(vec![Ok(bytes(3))], Ok(Chunk::empty())), bound);
    guard.decode(Chunk::from_static(b"z")).expect("within bound");
    assert_eq!(guard.remaining(), expected);
}

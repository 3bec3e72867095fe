//! Move buffer pool properties through the producer/consumer halves.

use cnc_planner::planner::Planner;
use cnc_planner::pool::BufferState;
use cnc_planner::slot::{DwellItem, WorkItem};

fn dwell() -> WorkItem {
    WorkItem::Dwell(DwellItem { seconds: 0.01 })
}

#[test]
fn free_on_empty_queue_changes_nothing() {
    let mut planner = Planner::<4>::new();
    let (mut producer, mut consumer) = planner.split();

    assert_eq!(consumer.free_run_buffer(), None);
    assert_eq!(consumer.buffers_available(), 4);
    let cursors = consumer.pool().cursors();
    assert_eq!(cursors.run, cursors.write);

    // A later commit is still reachable.
    producer.get_write_buffer().unwrap().commit(dwell());
    assert!(consumer.get_run_buffer().is_some());
    assert_eq!(consumer.free_run_buffer(), Some(true));
}

#[test]
fn free_before_promotion_keeps_queued_item() {
    let mut planner = Planner::<4>::new();
    let (mut producer, mut consumer) = planner.split();
    let buffer = producer.get_write_buffer().unwrap();
    let id = buffer.id();
    buffer.commit(dwell());

    assert_eq!(consumer.free_run_buffer(), None);
    assert_eq!(consumer.pool().state(id), BufferState::Queued);
    assert_eq!(consumer.buffers_available(), 3);

    assert_eq!(consumer.get_run_buffer(), Some(id));
    assert_eq!(consumer.free_run_buffer(), Some(true));
    assert_eq!(consumer.buffers_available(), 4);
}

#[test]
fn available_tracks_committed_minus_freed() {
    let mut planner = Planner::<6>::new();
    let (mut producer, mut consumer) = planner.split();

    // Deterministic interleaving of commits and frees.
    let pattern = [3usize, 1, 2, 0, 4, 2, 1, 3, 0, 5];
    let mut outstanding = 0usize;
    for (round, &commits) in pattern.iter().enumerate() {
        for _ in 0..commits.min(6 - outstanding) {
            producer.get_write_buffer().unwrap().commit(dwell());
            outstanding += 1;
        }
        assert_eq!(producer.buffers_available(), 6 - outstanding);

        let frees = round % 3;
        for _ in 0..frees.min(outstanding) {
            consumer.get_run_buffer().unwrap();
            consumer.free_run_buffer();
            outstanding -= 1;
        }
        assert_eq!(consumer.buffers_available(), 6 - outstanding);
    }
}

#[test]
fn commit_order_is_run_order() {
    let mut planner = Planner::<4>::new();
    let (mut producer, mut consumer) = planner.split();

    let mut committed = Vec::new();
    for _ in 0..3 {
        let buffer = producer.get_write_buffer().unwrap();
        committed.push(buffer.id());
        buffer.commit(dwell());
    }

    let mut ran = Vec::new();
    while let Some(id) = consumer.get_run_buffer() {
        ran.push(id);
        consumer.free_run_buffer();
    }
    assert_eq!(ran, committed);
}

#[test]
fn run_order_survives_wraparound() {
    let mut planner = Planner::<3>::new();
    let (mut producer, mut consumer) = planner.split();

    let mut ran = Vec::new();
    for _ in 0..10 {
        let buffer = producer.get_write_buffer().unwrap();
        let id = buffer.id();
        buffer.commit(dwell());
        let run = consumer.get_run_buffer().unwrap();
        assert_eq!(run, id);
        ran.push(run.index());
        consumer.free_run_buffer();
    }
    assert_eq!(ran, [0, 1, 2, 0, 1, 2, 0, 1, 2, 0]);
}

#[test]
fn run_buffer_is_idempotent_until_freed() {
    let mut planner = Planner::<4>::new();
    let (mut producer, mut consumer) = planner.split();
    producer.get_write_buffer().unwrap().commit(dwell());
    producer.get_write_buffer().unwrap().commit(dwell());

    let first = consumer.get_run_buffer().unwrap();
    assert_eq!(consumer.get_run_buffer(), Some(first));
    assert_eq!(consumer.pool().state(first), BufferState::Running);

    consumer.free_run_buffer();
    assert_ne!(consumer.get_run_buffer(), Some(first));
}

#[test]
fn free_reports_empty_iff_write_meets_run() {
    let mut planner = Planner::<4>::new();
    let (mut producer, mut consumer) = planner.split();

    for _ in 0..3 {
        producer.get_write_buffer().unwrap().commit(dwell());
    }
    for _ in 0..3 {
        consumer.get_run_buffer().unwrap();
        let drained = consumer.free_run_buffer();
        let cursors = consumer.pool().cursors();
        assert_eq!(drained, Some(cursors.write == cursors.run));
    }
    assert_eq!(consumer.buffers_available(), 4);
}

#[test]
fn loading_slot_blocks_drain_signal() {
    let mut planner = Planner::<4>::new();
    let (mut producer, mut consumer) = planner.split();
    producer.get_write_buffer().unwrap().commit(dwell());
    let loading = producer.get_write_buffer().unwrap();

    consumer.get_run_buffer().unwrap();
    assert_eq!(consumer.free_run_buffer(), Some(false));
    assert!(consumer.get_run_buffer().is_none());
    loading.commit(dwell());
    assert!(consumer.get_run_buffer().is_some());
}

#[test]
fn exhaustion_never_overwrites() {
    let mut planner = Planner::<4>::new();
    let (mut producer, mut consumer) = planner.split();

    let mut ids = Vec::new();
    for _ in 0..4 {
        let buffer = producer.get_write_buffer().unwrap();
        ids.push(buffer.id());
        buffer.commit(dwell());
    }
    assert_eq!(producer.buffers_available(), 0);
    assert!(producer.get_write_buffer().is_none());
    for &id in &ids {
        assert_eq!(producer.pool().state(id), BufferState::Queued);
    }

    let mut ran = Vec::new();
    while let Some(id) = consumer.get_run_buffer() {
        ran.push(id);
        consumer.free_run_buffer();
    }
    assert_eq!(ran, ids);
}

#[test]
fn unget_restores_availability() {
    let mut planner = Planner::<4>::new();
    let (mut producer, _consumer) = planner.split();
    producer.get_write_buffer().unwrap().commit(dwell());
    let before = producer.buffers_available();

    let buffer = producer.get_write_buffer().unwrap();
    let id = buffer.id();
    buffer.unget();

    assert_eq!(producer.buffers_available(), before);
    assert_eq!(producer.pool().state(id), BufferState::Empty);
    // The same slot is handed out again.
    assert_eq!(producer.get_write_buffer().unwrap().id(), id);
}

#[test]
fn dropped_write_buffer_is_returned() {
    let mut planner = Planner::<4>::new();
    let (mut producer, _consumer) = planner.split();
    let id = {
        let buffer = producer.get_write_buffer().unwrap();
        buffer.id()
    };
    assert_eq!(producer.buffers_available(), 4);
    assert_eq!(producer.pool().state(id), BufferState::Empty);
}

#[test]
fn last_buffer_follows_committed_run() {
    let mut planner = Planner::<5>::new();
    let (mut producer, mut consumer) = planner.split();

    let mut ids = Vec::new();
    for _ in 0..3 {
        let buffer = producer.get_write_buffer().unwrap();
        ids.push(buffer.id());
        buffer.commit(dwell());
    }
    assert_eq!(consumer.get_first_buffer(), Some(ids[0]));
    assert_eq!(consumer.get_last_buffer(), Some(ids[2]));

    consumer.free_run_buffer();
    assert_eq!(consumer.get_first_buffer(), Some(ids[1]));
    assert_eq!(consumer.get_last_buffer(), Some(ids[2]));
}

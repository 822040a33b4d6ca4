use super::*;
use crate::util::test::{trace_init, SETTLE};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering::SeqCst},
        Barrier,
    },
    thread,
};

#[test]
fn readers_overlap() {
    const READERS: usize = 4;
    let _trace = trace_init();
    let guard = ReaderPriority::new(7);
    // Every reader waits for all the others while inside its read section, so
    // this only completes if they are all reading at once.
    let barrier = Barrier::new(READERS);

    thread::scope(|s| {
        let readers = (0..READERS)
            .map(|_| {
                s.spawn(|| {
                    guard.read_with(|value| {
                        barrier.wait();
                        value
                    })
                })
            })
            .collect::<Vec<_>>();

        for reader in readers {
            assert_eq!(reader.join().unwrap(), 7);
        }
    });
    assert_eq!(guard.active_readers(), 0);
}

#[test]
fn writer_waits_for_reader() {
    let _trace = trace_init();
    let guard = ReaderPriority::new(1);
    let wrote = AtomicBool::new(false);

    thread::scope(|s| {
        let section = guard.enter_read();
        let writer = s.spawn(|| {
            let value = guard.write(|x| x * 2);
            wrote.store(true, SeqCst);
            value
        });

        thread::sleep(SETTLE);
        assert!(!wrote.load(SeqCst), "writer got in while a reader was active");
        assert_eq!(section.read(), 1);

        drop(section);
        assert_eq!(writer.join().unwrap(), 2);
    });
    assert_eq!(guard.read(), 2);
}

#[test]
fn arriving_readers_overtake_waiting_writer() {
    let _trace = trace_init();
    let guard = ReaderPriority::new(1);
    let wrote = AtomicBool::new(false);

    thread::scope(|s| {
        let first = guard.enter_read();
        let writer = s.spawn(|| {
            let value = guard.write(|x| x * 2);
            wrote.store(true, SeqCst);
            value
        });
        thread::sleep(SETTLE);

        // A reader arriving after the writer is admitted right away...
        let second = guard.enter_read();
        assert_eq!(guard.active_readers(), 2);

        // ...and keeps the writer out even after the first reader leaves.
        drop(first);
        thread::sleep(SETTLE);
        assert!(!wrote.load(SeqCst), "writer got in while a reader was active");
        assert_eq!(second.read(), 1);

        drop(second);
        assert_eq!(writer.join().unwrap(), 2);
    });
    assert_eq!(guard.read(), 2);
}

#[test]
fn section_exits_on_another_thread() {
    let _trace = trace_init();
    let guard = &ReaderPriority::new(3);

    let section = guard.enter_read();
    assert_eq!(guard.try_write(|_| unreachable!()), None);

    let exited = thread::scope(|s| s.spawn(move || guard.exit_read(section)).join().unwrap());
    assert_eq!(exited, Ok(()));
    assert_eq!(guard.try_write(|x| x + 1), Some(4));
}

#[test]
fn writers_make_progress_once_readers_stop() {
    const WRITERS: u32 = 3;
    let _trace = trace_init();
    let guard = ReaderPriority::new(1);
    let section = guard.enter_read();

    thread::scope(|s| {
        for _ in 0..WRITERS {
            s.spawn(|| guard.write(|x| x * 2));
        }

        thread::sleep(SETTLE);
        assert_eq!(section.read(), 1);
        drop(section);
    });

    assert_eq!(guard.read(), 2i64.pow(WRITERS));
}

use super::*;
use crate::loom::{
    self,
    sync::{
        atomic::{AtomicBool, Ordering::SeqCst},
        Arc,
    },
    thread,
};

#[test]
fn write_vs_read() {
    loom::model(|| {
        let guard = Arc::new(WriterPriority::new(1));

        let writer = thread::spawn({
            let guard = guard.clone();
            move || guard.write(|x| x * 2)
        });

        let seen = guard.read();
        assert!(seen == 1 || seen == 2, "read a torn value: {seen}");

        assert_eq!(writer.join().unwrap(), 2);
        assert_eq!(guard.read(), 2);
        assert!(!guard.is_admission_closed());
    })
}

#[test]
fn writers_are_serialized() {
    loom::model(|| {
        let guard = Arc::new(WriterPriority::new(1));

        let writer = thread::spawn({
            let guard = guard.clone();
            move || guard.write(|x| x * 2)
        });

        let mine = guard.write(|x| x * 2);
        let theirs = writer.join().unwrap();

        let mut results = [mine, theirs];
        results.sort_unstable();
        assert_eq!(results, [2, 4]);
        assert_eq!(guard.active_writers(), 0);
        assert!(!guard.is_admission_closed());
    })
}

#[test]
fn reader_excludes_writer() {
    loom::model(|| {
        let guard = Arc::new(WriterPriority::new(1));
        let reading = Arc::new(AtomicBool::new(false));

        let writer = thread::spawn({
            let guard = guard.clone();
            let reading = reading.clone();
            move || {
                guard.write(|x| {
                    assert!(!reading.load(SeqCst), "wrote while a reader was reading");
                    x + 1
                })
            }
        });

        guard.read_with(|value| {
            reading.store(true, SeqCst);
            assert!(value == 1 || value == 2);
            reading.store(false, SeqCst);
        });

        assert_eq!(writer.join().unwrap(), 2);
    })
}

#[test]
fn try_read_vs_write() {
    loom::model(|| {
        let guard = Arc::new(WriterPriority::new(1));

        let writer = thread::spawn({
            let guard = guard.clone();
            move || guard.write(|x| x * 2)
        });

        if let Some(seen) = guard.try_read() {
            assert!(seen == 1 || seen == 2, "read a torn value: {seen}");
        }

        writer.join().unwrap();
        assert_eq!(guard.try_read(), Some(2));
    })
}

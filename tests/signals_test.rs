#[cfg(test)]
mod signals_tests {
    use coco::signals::{CaughtSignal, SignalMonitor, SIGINT_GENERATIONS_GAP};

    #[test]
    fn test_disconnected_monitor_stays_quiet() {
        let mut monitor = SignalMonitor::disconnected();
        assert_eq!(monitor.check(0), None);
        assert_eq!(monitor.check(1_000_000), None);
    }

    /// One test driving the whole protocol: signals are process-wide state,
    /// so the sequencing must not interleave with other tests.
    #[test]
    fn test_signal_protocol() {
        let mut monitor = SignalMonitor::install().expect("handlers should install");

        // nothing pending
        assert_eq!(monitor.check(10), None);

        // first SIGINT is a note, the run continues
        unsafe { libc::raise(libc::SIGINT) };
        assert_eq!(monitor.check(100), Some(CaughtSignal::Note(libc::SIGINT)));
        assert_eq!(monitor.check(101), None);

        // a second SIGINT inside the window is fatal
        unsafe { libc::raise(libc::SIGINT) };
        assert_eq!(monitor.check(500), Some(CaughtSignal::Stop(libc::SIGINT)));

        // outside the window the count restarts
        let mut monitor = SignalMonitor::install().expect("handlers should install");
        unsafe { libc::raise(libc::SIGINT) };
        assert_eq!(monitor.check(100), Some(CaughtSignal::Note(libc::SIGINT)));
        unsafe { libc::raise(libc::SIGINT) };
        let after_gap = 100 + SIGINT_GENERATIONS_GAP;
        assert_eq!(
            monitor.check(after_gap),
            Some(CaughtSignal::Note(libc::SIGINT))
        );

        // SIGTERM asks for a clean stop with its own number
        unsafe { libc::raise(libc::SIGTERM) };
        assert_eq!(monitor.check(600), Some(CaughtSignal::Stop(libc::SIGTERM)));

        assert_eq!(CaughtSignal::Note(2).number(), 2);
        assert_eq!(CaughtSignal::Stop(15).number(), 15);
    }
}

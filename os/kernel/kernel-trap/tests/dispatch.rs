use std::cell::RefCell;
use std::rc::Rc;

use kernel_context::ProcessorState;
use kernel_cycles::{CycleAccount, CycleSource};
use kernel_trap::{
    BreakReason, Debugger, InterruptControl, SignalSink, TrapFrame, dispatch_debug_service,
    dispatch_nmi, dispatch_single_step,
};

/// Shared ordered record of every collaborator touch.
#[derive(Clone, Default)]
struct EventLog(Rc<RefCell<Vec<&'static str>>>);

impl EventLog {
    fn record(&self, event: &'static str) {
        self.0.borrow_mut().push(event);
    }

    fn events(&self) -> Vec<&'static str> {
        self.0.borrow().clone()
    }
}

struct MockSignals {
    log: EventLog,
    has_handler: bool,
}

impl SignalSink for MockSignals {
    fn has_trap_handler(&self) -> bool {
        self.has_handler
    }

    fn raise_trap_signal(&mut self) {
        self.log.record("raise-signal");
    }

    fn run_due_timers(&mut self) {
        self.log.record("run-timers");
    }

    fn dispatch_pending_signals(&mut self, _frame: &mut TrapFrame) {
        self.log.record("dispatch-signals");
    }
}

#[derive(Default)]
struct MockDebugger {
    log: EventLog,
    breaks: Vec<BreakReason>,
}

impl MockDebugger {
    fn with_log(log: EventLog) -> Self {
        Self {
            log,
            breaks: Vec::new(),
        }
    }
}

impl Debugger for MockDebugger {
    fn break_in(&mut self, reason: BreakReason, _frame: &mut TrapFrame) {
        self.log.record("debugger-break");
        self.breaks.push(reason);
    }

    fn handle_nmi(&mut self, _frame: &mut TrapFrame) {
        self.log.record("handle-nmi");
    }
}

struct MockIrq {
    log: EventLog,
}

impl InterruptControl for MockIrq {
    fn enable(&mut self) {
        self.log.record("irq-enable");
    }

    fn disable(&mut self) {
        self.log.record("irq-disable");
    }
}

/// Counts reads so tests can tell whether accounting was bracketed.
#[derive(Default)]
struct CountingClock {
    reads: RefCell<u32>,
}

impl CycleSource for CountingClock {
    fn now(&self) -> u64 {
        let mut reads = self.reads.borrow_mut();
        *reads += 1;
        u64::from(*reads) * 100
    }
}

fn user_frame() -> TrapFrame {
    TrapFrame {
        cs: 0x2b,
        rip: 0x40_0000,
        ..TrapFrame::default()
    }
}

fn kernel_frame() -> TrapFrame {
    TrapFrame {
        cs: 0x08,
        ..TrapFrame::default()
    }
}

#[test]
fn user_single_step_with_handler_returns_without_debugger() {
    let log = EventLog::default();
    let clock = CountingClock::default();
    let mut processor = ProcessorState::new(0);
    processor.cycles.begin(CycleAccount::User, &clock);

    let mut signals = MockSignals {
        log: log.clone(),
        has_handler: true,
    };
    let mut debugger = MockDebugger::with_log(log.clone());
    let mut irq = MockIrq { log: log.clone() };
    let mut frame = user_frame();

    dispatch_single_step(&mut processor, &mut frame, &mut signals, &mut debugger, &mut irq, &clock);

    assert_eq!(
        log.events(),
        vec!["irq-enable", "raise-signal", "run-timers", "dispatch-signals", "irq-disable"]
    );
    assert!(debugger.breaks.is_empty());
    assert_eq!(processor.cycles.current_account(), CycleAccount::User);
}

#[test]
fn user_single_step_without_handler_falls_into_debugger() {
    let log = EventLog::default();
    let clock = CountingClock::default();
    let mut processor = ProcessorState::new(0);
    processor.cycles.begin(CycleAccount::User, &clock);

    let mut signals = MockSignals {
        log: log.clone(),
        has_handler: false,
    };
    let mut debugger = MockDebugger::with_log(log.clone());
    let mut irq = MockIrq { log: log.clone() };
    let mut frame = user_frame();

    dispatch_single_step(&mut processor, &mut frame, &mut signals, &mut debugger, &mut irq, &clock);

    // The break happens after the bracket is fully closed.
    assert_eq!(log.events().last(), Some(&"debugger-break"));
    assert!(log.events().contains(&"irq-disable"));
    assert_eq!(debugger.breaks, vec![BreakReason::MissingSignalHandler]);
    assert_eq!(processor.cycles.current_account(), CycleAccount::User);
}

#[test]
fn privileged_single_step_goes_straight_to_debugger() {
    let log = EventLog::default();
    let clock = CountingClock::default();
    let mut processor = ProcessorState::new(0);

    let mut signals = MockSignals {
        log: log.clone(),
        has_handler: true,
    };
    let mut debugger = MockDebugger::with_log(log.clone());
    let mut irq = MockIrq { log: log.clone() };
    let mut frame = kernel_frame();

    dispatch_single_step(&mut processor, &mut frame, &mut signals, &mut debugger, &mut irq, &clock);

    assert_eq!(log.events(), vec!["debugger-break"]);
    assert_eq!(debugger.breaks, vec![BreakReason::SingleStep]);
    assert_eq!(*clock.reads.borrow(), 0);
}

#[test]
fn privileged_debug_service_carries_register_arguments() {
    let log = EventLog::default();
    let clock = CountingClock::default();
    let mut processor = ProcessorState::new(0);

    let mut signals = MockSignals {
        log: log.clone(),
        has_handler: true,
    };
    let mut debugger = MockDebugger::with_log(log.clone());
    let mut irq = MockIrq { log: log.clone() };
    let mut frame = kernel_frame();
    frame.rdi = 0x21;
    frame.rsi = 0xdead_beef;

    dispatch_debug_service(&mut processor, &mut frame, &mut signals, &mut debugger, &mut irq, &clock);

    assert_eq!(
        debugger.breaks,
        vec![BreakReason::ServiceRequest {
            reason: 0x21,
            data: 0xdead_beef
        }]
    );
}

#[test]
fn user_debug_service_has_no_debugger_fallback() {
    let log = EventLog::default();
    let clock = CountingClock::default();
    let mut processor = ProcessorState::new(0);
    processor.cycles.begin(CycleAccount::User, &clock);

    let mut signals = MockSignals {
        log: log.clone(),
        has_handler: false,
    };
    let mut debugger = MockDebugger::with_log(log.clone());
    let mut irq = MockIrq { log: log.clone() };
    let mut frame = user_frame();

    dispatch_debug_service(&mut processor, &mut frame, &mut signals, &mut debugger, &mut irq, &clock);

    assert!(debugger.breaks.is_empty());
    assert_eq!(
        log.events(),
        vec!["irq-enable", "raise-signal", "run-timers", "dispatch-signals", "irq-disable"]
    );
    assert_eq!(processor.cycles.current_account(), CycleAccount::User);
}

#[test]
fn nmi_arriving_during_nmi_handling_breaks_fatally_first() {
    let log = EventLog::default();
    let clock = CountingClock::default();
    let mut processor = ProcessorState::new(0);
    processor.nmi_count = 1;

    let mut debugger = MockDebugger::with_log(log.clone());
    let mut frame = kernel_frame();

    dispatch_nmi(&mut processor, &mut frame, &mut debugger, &clock);

    assert_eq!(log.events(), vec!["debugger-break", "handle-nmi"]);
    assert_eq!(debugger.breaks, vec![BreakReason::NmiReentry]);
    assert_eq!(processor.nmi_count, 1);
}

#[test]
fn single_nmi_never_touches_the_debugger_break_path() {
    let log = EventLog::default();
    let clock = CountingClock::default();
    let mut processor = ProcessorState::new(0);

    let mut debugger = MockDebugger::with_log(log.clone());
    let mut frame = kernel_frame();

    dispatch_nmi(&mut processor, &mut frame, &mut debugger, &clock);

    assert_eq!(log.events(), vec!["handle-nmi"]);
    assert_eq!(processor.nmi_count, 0);
}

#[test]
fn nmi_from_privileged_mode_skips_accounting() {
    let clock = CountingClock::default();
    let mut processor = ProcessorState::new(0);
    let mut debugger = MockDebugger::default();
    let mut frame = kernel_frame();

    dispatch_nmi(&mut processor, &mut frame, &mut debugger, &clock);

    // No cycle-counter reads means no bracket was opened.
    assert_eq!(*clock.reads.borrow(), 0);
}

#[test]
fn nmi_from_user_mode_brackets_and_restores_accounting() {
    let clock = CountingClock::default();
    let mut processor = ProcessorState::new(0);
    processor.cycles.begin(CycleAccount::User, &clock);

    let mut debugger = MockDebugger::default();
    let mut frame = user_frame();

    dispatch_nmi(&mut processor, &mut frame, &mut debugger, &clock);

    assert_eq!(processor.cycles.current_account(), CycleAccount::User);
    assert!(*clock.reads.borrow() >= 3);
}

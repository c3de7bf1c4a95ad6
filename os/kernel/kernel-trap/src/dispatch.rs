//! The trap-kind × origin dispatch state machine.

use kernel_context::ProcessorState;
use kernel_cycles::{CycleAccount, CycleScope, CycleSource};
use log::{trace, warn};

use crate::frame::TrapFrame;

/// Why the dispatcher is entering the kernel debugger.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BreakReason {
    /// A single-step exception interrupted privileged code.
    SingleStep,
    /// An unprivileged trap was delivered but the owning process has no
    /// signal-handling mechanism installed; returning to user code would
    /// re-trap forever.
    MissingSignalHandler,
    /// An NMI arrived while this processor was already handling one.
    /// Fatal: this cannot be unwound safely.
    NmiReentry,
    /// Privileged code deliberately requested the debugger, passing a
    /// reason code and a data pointer in argument registers.
    ServiceRequest { reason: u64, data: u64 },
}

/// Signal delivery for the thread the trap interrupted.
///
/// Implemented by the process/thread manager; the dispatcher only calls
/// these while interrupts are re-enabled under a kernel accounting
/// bracket.
pub trait SignalSink {
    /// Whether the owning process has any signal-handling mechanism
    /// installed.
    fn has_trap_handler(&self) -> bool;

    /// Synchronously raises the trap/debug signal on the current thread.
    fn raise_trap_signal(&mut self);

    /// Runs any runtime timers that have come due.
    fn run_due_timers(&mut self);

    /// Applies pending signals against the trap frame, possibly
    /// rewriting its return state.
    fn dispatch_pending_signals(&mut self, frame: &mut TrapFrame);
}

/// The kernel debugger, terminal authority for unresolvable traps.
pub trait Debugger {
    /// Breaks into the debugger. May resume the interrupted context or
    /// halt; either way the dispatcher's work is done when it returns.
    fn break_in(&mut self, reason: BreakReason, frame: &mut TrapFrame);

    /// Handles the body of a non-maskable interrupt.
    fn handle_nmi(&mut self, frame: &mut TrapFrame);
}

/// The processor's interrupt-enable flag.
///
/// The dispatcher toggles it around signal delivery; everything else
/// runs with interrupts already hardware-disabled by trap entry.
pub trait InterruptControl {
    fn enable(&mut self);
    fn disable(&mut self);
}

/// Dispatches a hardware single-step exception.
///
/// Privileged origin goes straight to the debugger; no signal machinery
/// applies to privileged execution. Unprivileged origin delivers the
/// trap signal under a kernel accounting bracket with interrupts
/// re-enabled, then falls into the debugger anyway if the process has
/// nothing installed to handle it.
pub fn dispatch_single_step(
    processor: &mut ProcessorState,
    frame: &mut TrapFrame,
    signals: &mut impl SignalSink,
    debugger: &mut impl Debugger,
    irq: &mut impl InterruptControl,
    clock: &impl CycleSource,
) {
    if frame.from_privileged_mode() {
        debugger.break_in(BreakReason::SingleStep, frame);
        return;
    }

    trace!("single-step trap from user mode at {}", frame.instruction_pointer());
    {
        let _bracket = CycleScope::enter(&mut processor.cycles, clock, CycleAccount::Kernel);
        irq.enable();

        signals.raise_trap_signal();
        signals.run_due_timers();
        signals.dispatch_pending_signals(frame);

        irq.disable();
    }

    if !signals.has_trap_handler() {
        debugger.break_in(BreakReason::MissingSignalHandler, frame);
    }
}

/// Dispatches the debug-service software trap.
///
/// From privileged mode this is the deliberate break-into-the-debugger
/// hook, carrying a reason code and data pointer in argument registers.
/// From user mode it takes the generic signal-delivery bracket with no
/// debugger fallback.
pub fn dispatch_debug_service(
    processor: &mut ProcessorState,
    frame: &mut TrapFrame,
    signals: &mut impl SignalSink,
    debugger: &mut impl Debugger,
    irq: &mut impl InterruptControl,
    clock: &impl CycleSource,
) {
    if frame.from_privileged_mode() {
        debugger.break_in(
            BreakReason::ServiceRequest {
                reason: frame.debug_service_reason(),
                data: frame.debug_service_data(),
            },
            frame,
        );
        return;
    }

    let _bracket = CycleScope::enter(&mut processor.cycles, clock, CycleAccount::Kernel);
    irq.enable();

    signals.raise_trap_signal();
    signals.run_due_timers();
    signals.dispatch_pending_signals(frame);

    irq.disable();
}

/// Dispatches a non-maskable interrupt.
///
/// Runs the reentrancy guard first: a nesting count of exactly 2 means
/// an NMI interrupted NMI handling, which cannot be unwound safely, so
/// the debugger is entered immediately and unconditionally before the
/// new NMI is processed.
///
/// Accounting is bracketed only when the NMI interrupted unprivileged
/// execution; a privileged interruptee is already inside a
/// kernel-accounted region. The exit path deliberately skips restoring
/// an invalid previous account; see
/// [`kernel_cycles::CycleLedger::restore_unless_invalid`].
pub fn dispatch_nmi(
    processor: &mut ProcessorState,
    frame: &mut TrapFrame,
    debugger: &mut impl Debugger,
    clock: &impl CycleSource,
) {
    processor.nmi_count += 1;
    debug_assert!(processor.nmi_count <= 2, "NMI nesting beyond the fatal break");
    if processor.nmi_count == 2 {
        warn!("cpu {}: NMI re-entered NMI handling", processor.cpu_id);
        debugger.break_in(BreakReason::NmiReentry, frame);
    }

    let previous = if frame.from_privileged_mode() {
        None
    } else {
        Some(processor.cycles.begin(CycleAccount::Kernel, clock))
    };

    debugger.handle_nmi(frame);

    if let Some(previous) = previous {
        processor.cycles.restore_unless_invalid(previous, clock);
    }

    processor.nmi_count -= 1;
}

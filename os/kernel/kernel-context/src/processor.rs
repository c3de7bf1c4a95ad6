//! Per-processor state touched on the switch and trap paths.

use kernel_addr::VirtualAddress;
use kernel_cycles::CycleLedger;
use kernel_runlevel::RunLevelState;

/// State pinned to one logical processor.
///
/// Exactly one of these exists per processor and only that processor
/// reads or writes it, so every accessor takes `&mut self` and no locks
/// exist here. Cache-line aligned so two processors' blocks never share
/// a line.
#[repr(C, align(64))]
pub struct ProcessorState {
    /// Logical processor number, for log correlation.
    pub cpu_id: u32,

    /// Where the hardware switches the stack on a privilege-raising
    /// trap. Retargeted at every context switch to the incoming
    /// thread's kernel stack.
    pub privileged_stack_top: VirtualAddress,

    /// Non-maskable interrupt nesting depth; see the trap dispatcher.
    pub nmi_count: u32,

    /// Current interrupt-masking run level.
    pub run_level: RunLevelState,

    /// Cycle accounting for time spent on this processor.
    pub cycles: CycleLedger,
}

impl ProcessorState {
    #[must_use]
    pub fn new(cpu_id: u32) -> Self {
        Self {
            cpu_id,
            privileged_stack_top: VirtualAddress::zero(),
            nmi_count: 0,
            run_level: RunLevelState::new(),
            cycles: CycleLedger::new(),
        }
    }
}

//! CPU core trait.

/// A CPU core.
///
/// Cores execute instructions against their own architectural state.
/// One `step()` is one full fetch/decode/execute cycle, including any
/// peripheral tick that hangs off the cycle boundary.
///
/// Cores expose their internal state for observation and debugging.
pub trait Cpu {
    /// The type used for register inspection.
    type Registers;

    /// Execute one instruction cycle.
    fn step(&mut self);

    /// Returns the current program counter.
    ///
    /// Returns `u32` to support all program-counter widths; narrower
    /// cores zero-extend.
    fn pc(&self) -> u32;

    /// Returns a snapshot of all registers for inspection.
    fn registers(&self) -> Self::Registers;

    /// Reset the CPU to its initial state. Program memory is preserved.
    fn reset(&mut self);
}

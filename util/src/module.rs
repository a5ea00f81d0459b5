//! Periodic module interface
//!
//! Anything stepped once per control period (for instance trajectory
//! playback) implements [`State`], so that executors can drive it without
//! knowing what it does.

/// A module initialised once and then processed once per period.
pub trait State {
    type InitData;
    type InitError;

    type InputData;
    type OutputData;
    type StatusReport;
    type ProcError;

    /// Configure the module. May be called again to change the configuration
    /// while the module is not doing anything.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError>;

    /// Process one period, returning the outputs written this period and a
    /// status report.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>;
}

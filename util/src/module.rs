//! Cyclic module interface
//!
//! Every module run from an executable's main loop implements [`State`]. A
//! module is created, attached to the session with `init`, then driven once
//! per control cycle with `proc`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use std::convert::Infallible;

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// MODULE STATE
// ---------------------------------------------------------------------------

/// The module's internal state.
pub trait State {
    /// Data required to attach the module to a session
    type InitData;
    /// An error which can occur during initialisation.
    type InitError;

    /// Data required for one cycle of processing.
    type InputData;
    /// Data produced by one cycle of processing.
    type OutputData;
    /// A report on the status of the cycle, suitable for archiving.
    type StatusReport;
    /// An error which can occur during a cycle.
    ///
    /// Modules which always produce an output use `Infallible`.
    type ProcError;

    /// Attach the module to the given session, for example by opening its
    /// archives.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>;

    /// Run one cycle of the module.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>;
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Run one cycle of a module which cannot fail.
pub fn proc_infallible<M>(module: &mut M, input_data: &M::InputData)
    -> (M::OutputData, M::StatusReport)
where
    M: State<ProcError = Infallible>
{
    match module.proc(input_data) {
        Ok(r) => r,
        Err(e) => match e {}
    }
}

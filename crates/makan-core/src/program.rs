//! Seam to the ledger node's program compiler.

use crate::address::Address;
use std::future::Future;

/// Program bytes as returned by a node, with the address it reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledProgram {
    pub bytes: Vec<u8>,
    /// Address the node derived. Callers must cross-check it against
    /// [`Address::for_program`] on `bytes`.
    pub reported_address: Address,
}

/// Compiles TEAL source into program bytes.
pub trait ProgramCompiler {
    type Error: std::error::Error + Send + Sync + 'static;

    fn compile(
        &self,
        teal_source: &str,
    ) -> impl Future<Output = Result<CompiledProgram, Self::Error>> + Send;
}

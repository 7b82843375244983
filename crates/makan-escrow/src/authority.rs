//! Escrow program loading and logic-signature signing.
//!
//! The escrow account is controlled by a program, not a key: its address is
//! SHA-512/256("Program" || bytes), and "signing" attaches those exact bytes
//! to a transaction. If the bytes loaded here differ by one byte from the
//! ones whose address holds the asset, every signature is for the wrong
//! account. Loading therefore cross-checks the node-reported address when
//! compiling.

use crate::rejection::Rejection;
use base64::Engine;
use makan_core::{Address, ProgramCompiler, SignedTransaction, UnsignedTransaction};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProgramLoadError {
    #[error("Escrow program not found: {0}")]
    Missing(PathBuf),

    #[error("Failed to read escrow program {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Escrow program is empty")]
    Empty,

    #[error("Escrow program file is not valid base64: {0}")]
    InvalidBase64(String),

    #[error("Escrow program compilation failed: {0}")]
    Compile(String),

    #[error("Node reported program address {reported}, but the program bytes hash to {derived}")]
    AddressMismatch { reported: Address, derived: Address },
}

/// Where the escrow program comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramSource {
    /// Compiled program bytes: base64 text (node compile output) or raw.
    Compiled(PathBuf),
    /// TEAL source, compiled through a ledger node.
    Teal(PathBuf),
}

/// Immutable program bytes plus the address they control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowProgram {
    bytes: Vec<u8>,
    address: Address,
}

impl EscrowProgram {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ProgramLoadError> {
        if bytes.is_empty() {
            return Err(ProgramLoadError::Empty);
        }
        let address = Address::for_program(&bytes);
        Ok(Self { bytes, address })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn address(&self) -> Address {
        self.address
    }
}

/// Signing capability bound to one escrow program.
#[derive(Debug, Clone)]
pub struct EscrowAuthority {
    program: EscrowProgram,
}

impl EscrowAuthority {
    pub fn new(program: EscrowProgram) -> Self {
        Self { program }
    }

    /// Load the authority from `source`.
    ///
    /// `compiler` is only consulted for [`ProgramSource::Teal`].
    pub async fn load<C: ProgramCompiler>(
        source: &ProgramSource,
        compiler: &C,
    ) -> Result<Self, ProgramLoadError> {
        match source {
            ProgramSource::Compiled(path) => Self::from_program_file(path),
            ProgramSource::Teal(path) => Self::compile(path, compiler).await,
        }
    }

    /// Read compiled program bytes from `path`.
    pub fn from_program_file(path: &Path) -> Result<Self, ProgramLoadError> {
        let contents = read_file(path)?;
        let bytes = decode_program_file(&contents)?;
        let authority = Self::new(EscrowProgram::from_bytes(bytes)?);
        log::info!(
            "Escrow program loaded from {} ({} bytes), address {}",
            path.display(),
            authority.program.bytes.len(),
            authority.address()
        );
        Ok(authority)
    }

    /// Compile the TEAL source at `teal_path` and bind to the result.
    pub async fn compile<C: ProgramCompiler>(
        teal_path: &Path,
        compiler: &C,
    ) -> Result<Self, ProgramLoadError> {
        let source = read_file(teal_path)?;
        let source = String::from_utf8(source)
            .map_err(|_| ProgramLoadError::Compile("TEAL source is not UTF-8".into()))?;

        let compiled = compiler
            .compile(&source)
            .await
            .map_err(|e| ProgramLoadError::Compile(e.to_string()))?;

        let program = EscrowProgram::from_bytes(compiled.bytes)?;
        if program.address != compiled.reported_address {
            return Err(ProgramLoadError::AddressMismatch {
                reported: compiled.reported_address,
                derived: program.address,
            });
        }

        log::info!(
            "Escrow program compiled from {} ({} bytes), address {}",
            teal_path.display(),
            program.bytes.len(),
            program.address
        );
        Ok(Self::new(program))
    }

    pub fn address(&self) -> Address {
        self.program.address
    }

    pub fn program(&self) -> &EscrowProgram {
        &self.program
    }

    /// Attach the escrow logic signature to `txn`.
    ///
    /// The program approves anything; this only refuses transactions the
    /// signature could not possibly authorize.
    pub fn sign(&self, txn: UnsignedTransaction) -> Result<SignedTransaction, Rejection> {
        if txn.sender != self.program.address {
            return Err(Rejection::SigningFailure(format!(
                "transaction sender {} is not the escrow address {}",
                txn.sender, self.program.address
            )));
        }
        Ok(SignedTransaction::with_logic_sig(
            txn,
            self.program.bytes.clone(),
        ))
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, ProgramLoadError> {
    std::fs::read(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ProgramLoadError::Missing(path.to_path_buf())
        } else {
            ProgramLoadError::Unreadable {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

/// Base64 text if it decodes as such, raw bytes otherwise.
/// Text files hold base64 (whitespace, including line wraps, is ignored);
/// anything that is not UTF-8 is taken as raw program bytes.
fn decode_program_file(contents: &[u8]) -> Result<Vec<u8>, ProgramLoadError> {
    let Ok(text) = std::str::from_utf8(contents) else {
        return Ok(contents.to_vec());
    };
    let packed: String = text.split_whitespace().collect();
    base64::engine::general_purpose::STANDARD
        .decode(packed)
        .map_err(|e| ProgramLoadError::InvalidBase64(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use makan_core::{CompiledProgram, TxnBuilder};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const PROGRAM: [u8; 3] = [0x08, 0x81, 0x01];

    #[derive(Debug, thiserror::Error)]
    #[error("node unavailable")]
    struct NodeDown;

    /// Compiler stub returning fixed bytes and a fixed reported address.
    struct FixedCompiler {
        bytes: Vec<u8>,
        reported: Address,
    }

    impl ProgramCompiler for FixedCompiler {
        type Error = NodeDown;

        async fn compile(&self, _teal: &str) -> Result<CompiledProgram, NodeDown> {
            Ok(CompiledProgram {
                bytes: self.bytes.clone(),
                reported_address: self.reported,
            })
        }
    }

    struct DownCompiler;

    impl ProgramCompiler for DownCompiler {
        type Error = NodeDown;

        async fn compile(&self, _teal: &str) -> Result<CompiledProgram, NodeDown> {
            Err(NodeDown)
        }
    }

    fn teal_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "#pragma version 8\nint 1\n").unwrap();
        file
    }

    #[test]
    fn test_program_file_base64() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "CIEB").unwrap();
        let authority = EscrowAuthority::from_program_file(file.path()).unwrap();
        assert_eq!(authority.program().bytes(), &PROGRAM);
        assert_eq!(authority.address(), Address::for_program(&PROGRAM));
    }

    #[test]
    fn test_program_file_raw_bytes() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&PROGRAM).unwrap();
        let authority = EscrowAuthority::from_program_file(file.path()).unwrap();
        assert_eq!(authority.program().bytes(), &PROGRAM);
    }

    #[test]
    fn test_program_file_line_wrapped() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "CI\nEB\n").unwrap();
        let authority = EscrowAuthority::from_program_file(file.path()).unwrap();
        assert_eq!(authority.program().bytes(), &PROGRAM);
    }

    #[test]
    fn test_corrupt_base64_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "CIE!").unwrap();
        let result = EscrowAuthority::from_program_file(file.path());
        assert!(matches!(result, Err(ProgramLoadError::InvalidBase64(_))));
    }

    #[test]
    fn test_missing_program_file() {
        let result = EscrowAuthority::from_program_file(Path::new("/nonexistent/escrow.b64"));
        assert!(matches!(result, Err(ProgramLoadError::Missing(_))));
    }

    #[test]
    fn test_empty_program_rejected() {
        let file = NamedTempFile::new().unwrap();
        let result = EscrowAuthority::from_program_file(file.path());
        assert!(matches!(result, Err(ProgramLoadError::Empty)));
    }

    #[tokio::test]
    async fn test_compile_checks_reported_address() {
        let file = teal_file();
        let good = FixedCompiler {
            bytes: PROGRAM.to_vec(),
            reported: Address::for_program(&PROGRAM),
        };
        let authority = EscrowAuthority::compile(file.path(), &good).await.unwrap();
        assert_eq!(authority.address(), Address::for_program(&PROGRAM));

        let diverged = FixedCompiler {
            bytes: PROGRAM.to_vec(),
            reported: Address::new([7; 32]),
        };
        let result = EscrowAuthority::compile(file.path(), &diverged).await;
        assert!(matches!(
            result,
            Err(ProgramLoadError::AddressMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_compile_failure_is_load_error() {
        let file = teal_file();
        let result = EscrowAuthority::compile(file.path(), &DownCompiler).await;
        match result {
            Err(ProgramLoadError::Compile(msg)) => assert_eq!(msg, "node unavailable"),
            other => panic!("expected compile error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_load_compiled_source_skips_compiler() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "CIEB").unwrap();
        let source = ProgramSource::Compiled(file.path().to_path_buf());
        let authority = EscrowAuthority::load(&source, &DownCompiler).await.unwrap();
        assert_eq!(authority.program().bytes(), &PROGRAM);
    }

    #[test]
    fn test_sign_requires_escrow_sender() {
        let authority = EscrowAuthority::new(EscrowProgram::from_bytes(PROGRAM.to_vec()).unwrap());
        let other = Address::new([3; 32]);

        let foreign = TxnBuilder::asset_transfer(other, other, 1, 1).build();
        let txn = UnsignedTransaction::decode(&foreign).unwrap();
        assert!(matches!(
            authority.sign(txn),
            Err(Rejection::SigningFailure(_))
        ));

        let own = TxnBuilder::asset_transfer(authority.address(), other, 1, 1).build();
        let txn = UnsignedTransaction::decode(&own).unwrap();
        let signed = authority.sign(txn.clone()).unwrap();
        assert_eq!(signed.txn(), &txn);
        assert_eq!(signed.program(), &PROGRAM);
    }
}

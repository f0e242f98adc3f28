//! Binary encoding of a frozen [`Program`], for shipping compiled programs to a separate VM
//! process.

use crate::Program;

#[derive(Debug)]
pub struct SaveError(bitcode::Error);

impl std::fmt::Display for SaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to save program: {}", self.0)
    }
}

impl std::error::Error for SaveError {}

#[derive(Debug)]
pub struct LoadError(bitcode::Error);

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to load program: {}", self.0)
    }
}

impl std::error::Error for LoadError {}

pub fn to_bytes(program: &Program) -> Result<Vec<u8>, SaveError> {
    bitcode::serialize(program).map_err(SaveError)
}

/// Decodes bytes produced by [`to_bytes`]. Label indexes are rebuilt from the instructions.
pub fn load_program(bytes: &[u8]) -> Result<Program, LoadError> {
    let mut program: Program = bitcode::deserialize(bytes).map_err(LoadError)?;
    for container in &mut program.containers {
        container.index_labels();
    }
    Ok(program)
}

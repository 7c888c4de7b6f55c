use std::{fs, path::Path};

use super::DataError;
use crate::types::SymbolRecord;

pub fn save(path: impl AsRef<Path>, records: &[SymbolRecord]) -> Result<(), DataError> {
    let encoded = postcard::to_allocvec(records)?;
    fs::write(path, encoded)?;
    Ok(())
}

pub fn load(path: impl AsRef<Path>) -> Result<Vec<SymbolRecord>, DataError> {
    let file = fs::read(path)?;
    let records: Vec<SymbolRecord> = postcard::from_bytes(&file)?;
    Ok(records)
}

use std::{fs::File, path::Path, result};

use serde::{Deserialize, Serialize};

use crate::error::MerkleTreeError;

pub type Result<T> = result::Result<T, MerkleTreeError>;

/// Represents a single entry in a CSV
#[derive(Debug, Clone, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct CsvEntry {
    /// Address of the claimant, any letter casing
    pub address: String,
    /// Amount in ether units, e.g. `10.0`
    pub amount: String,
}

impl CsvEntry {
    pub fn new_from_file(path: &Path) -> Result<Vec<Self>> {
        let file = File::open(path)?;
        let mut rdr = csv::Reader::from_reader(file);

        let mut entries = Vec::new();
        for result in rdr.deserialize() {
            let record: CsvEntry = result?;
            entries.push(record);
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_csv_parsing() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_fixtures/test_csv.csv");
        let entries = CsvEntry::new_from_file(&path).expect("Failed to parse CSV");

        assert_eq!(entries.len(), 3);

        assert_eq!(
            entries[0].address,
            "0x5B38Da6a701c568545dCfcB03FcB875f56beddC4"
        );
        assert_eq!(entries[0].amount, "10.0");
        assert_eq!(entries[2].amount, "0.000000000000000001");
    }
}

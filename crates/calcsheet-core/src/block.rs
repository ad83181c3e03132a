use serde::{Deserialize, Serialize};

use crate::address::{CellAddress, CellRange};

/// A named rectangle of the template the application works with
/// (parameter block, main table, totals).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingBlock {
    pub name: String,
    pub range: CellRange,
}

impl WorkingBlock {
    pub fn contains(&self, addr: CellAddress) -> bool {
        self.range.contains(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_json() {
        let block: WorkingBlock = serde_json::from_str(r#"{"name": "main", "range": "C27:O134"}"#).unwrap();
        assert!(block.contains(CellAddress::parse("O134").unwrap()));
        assert!(!block.contains(CellAddress::parse("C135").unwrap()));
    }
}

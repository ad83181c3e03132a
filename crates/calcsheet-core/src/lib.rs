pub mod address;
pub mod block;
pub mod classify;
pub mod coerce;
pub mod error;
pub mod store;
pub mod value;
pub mod workbook;

pub use address::{
    col_from_label, col_to_label, expand_range, strip_revision_markers, CellAddress, CellRange,
    CellRangeIter,
};
pub use block::WorkingBlock;
pub use classify::{CellClass, Classification};
pub use coerce::{parse_number_text, to_number};
pub use error::{CoreError, CoreResult};
pub use store::ValueStore;
pub use value::CellValue;
pub use workbook::Workbook;

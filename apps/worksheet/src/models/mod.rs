pub mod sheet;

pub use sheet::{
    GridSpec, GridType, InkOpacity, PracticeMode, PracticeSheetConfig, Script, TextSpec,
};

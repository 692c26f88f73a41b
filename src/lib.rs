pub mod carver;
pub mod devices;
pub mod error;
pub mod extract;
pub mod forensics;
pub mod options;
pub mod report;
pub mod results;
pub mod scanner;
pub mod signatures;
pub mod source;
pub mod testimage;
pub mod utils;

pub use carver::Carver;
pub use error::{CarveError, Result};
pub use forensics::{CarveOutcome, ForensicAnalysis};
pub use options::CarveOptions;
pub use report::{Report, ReportGenerator, ReportOptions};
pub use results::{CarveResult, CarvedFile, Detection, ScanResult};
pub use scanner::Occurrence;
pub use signatures::{Category, SignatureEntry, SignatureTable};

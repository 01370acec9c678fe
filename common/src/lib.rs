pub mod buffer2;
pub mod file_format;
pub mod file_utils;
pub mod log_setup;
pub mod test_utils;

pub use buffer2::Buffer2;
pub use file_format::{
    deserialize, serialize, FileExtensionError, FileFormat, FileFormatResult, SerdeFormatError,
    SerdeFormatResult,
};

pub mod csv_export;

pub use csv_export::{output_path, write_csv};

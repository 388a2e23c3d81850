mod io_utils;
pub mod math;
mod oligo;
mod orientation;
mod readers;
mod util;

pub use io_utils::{create_writer, format_number_with_commas, open_writer};
pub use oligo::{
    grouped_oligo_path, oligo_file_location, oligo_id_from_read_id, oligo_index, per_oligo_path,
};
pub use orientation::{reverse_complement, PamOrientation};
pub use readers::{open_reader, split_tabs};
pub use util::{handle_error_and_exit, Error, Result};

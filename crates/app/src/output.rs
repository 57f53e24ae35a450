use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use frontier::prelude::{Idx, NewIds};

/// Writes the per-vertex values into the application output file inside
/// `dir`, one value per line in vertex-id order.
///
/// With a real permutation the values are read through it and the file is
/// named `AppOutput.out`; without preprocessing the values are written
/// as-is into `AppOutput-nopreprocess.out`.
pub fn write_output<NI, T>(dir: &Path, values: &[T], new_ids: &NewIds<NI>) -> io::Result<()>
where
    NI: Idx,
    T: Display,
{
    let file_name = if new_ids.is_identity() {
        "AppOutput-nopreprocess.out"
    } else {
        "AppOutput.out"
    };

    let mut out = BufWriter::new(File::create(dir.join(file_name))?);
    for v in 0..values.len() {
        let index = new_ids.translate(NI::new(v)).index();
        writeln!(out, "{}", values[index])?;
    }

    out.flush()
}

use ao_types::SubapTable;
use stream_port::LocalStreamPort;

use crate::errors::{Error, Result};

/// Loads one WFS slot's subaperture geometry from its `lutx{slot}`/
/// `luty{slot}` streams (spec.md §6.1, §9): externally-supplied
/// fractional-pixel centers, not a computed grid. `wfsvalid{slot}` is
/// opened too if present and folded into the table's validity mask;
/// absent means every subaperture is valid (spec.md §6.1).
pub fn load_subap_table(port: &LocalStreamPort, slot: usize, nsubx: u32, nsuby: u32) -> Result<SubapTable> {
    let lutx_name = format!("lutx{slot}");
    let luty_name = format!("luty{slot}");
    let x_center = port.open::<f32>(&lutx_name)?.read().clone();
    let y_center = port.open::<f32>(&luty_name)?.read().clone();

    let wfsvalid_name = format!("wfsvalid{slot}");
    let valid = match port.open::<u8>(&wfsvalid_name) {
        Ok(stream) => stream.read().iter().map(|&v| v != 0).collect(),
        Err(stream_port::Error::NotFound(_)) => Vec::new(),
        Err(e) => return Err(Error::Stream(e)),
    };

    Ok(SubapTable::new(nsubx, nsuby, x_center, y_center, valid)?)
}

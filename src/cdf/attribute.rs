//! Attributes: named metadata with ordered entry lists.
//!
//! An ADR heads two AEDR chains, g-entries and z-entries. Entry lists
//! are sparse: the chain carries `declared_count` records whose `num`
//! fields scatter them over `max_entry + 1` slots, and absent slots
//! stay empty. Global attributes expose both lists concatenated;
//! per-variable attributes answer entry lookups keyed by a variable's
//! kind and number.

use super::buf::Buf;
use super::data::DataReader;
use super::format::descriptor::AedrRecord;
use super::format::factory::RecordFactory;
use super::shape::Shaper;
use super::types::data_type::DataType;
use super::types::error::{CdfError, Result};
use super::types::values::Value;
use super::variable::Variable;

/// A global-scope attribute: a name and its ordered entries.
#[derive(Debug, Clone)]
pub struct GlobalAttribute {
    name: String,
    entries: Vec<Option<Value>>,
}

impl GlobalAttribute {
    pub(crate) fn new(
        name: String,
        gr_entries: Vec<Option<Value>>,
        z_entries: Vec<Option<Value>>,
    ) -> Self {
        let mut entries = gr_entries;
        entries.extend(z_entries);
        GlobalAttribute { name, entries }
    }

    /// The attribute's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The g-entries followed by the z-entries; sparse slots are
    /// `None`.
    pub fn entries(&self) -> &[Option<Value>] {
        &self.entries
    }
}

/// A variable-scope attribute: entry lookup keyed by variable.
#[derive(Debug, Clone)]
pub struct VariableAttribute {
    name: String,
    gr_entries: Vec<Option<Value>>,
    z_entries: Vec<Option<Value>>,
}

impl VariableAttribute {
    pub(crate) fn new(
        name: String,
        gr_entries: Vec<Option<Value>>,
        z_entries: Vec<Option<Value>>,
    ) -> Self {
        VariableAttribute {
            name,
            gr_entries,
            z_entries,
        }
    }

    /// The attribute's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// This attribute's entry for `variable`: the slot indexed by the
    /// variable's number in the list matching its kind, or `None`
    /// when the slot is empty or out of range.
    pub fn entry(&self, variable: &Variable) -> Option<&Value> {
        let entries = if variable.is_z_variable() {
            &self.z_entries
        } else {
            &self.gr_entries
        };
        usize::try_from(variable.num())
            .ok()
            .and_then(|ix| entries.get(ix))
            .and_then(Option::as_ref)
    }
}

/// Follows an AEDR chain, placing each entry's shaped value at its
/// declared slot in a list of `n_slot` entries.
pub(crate) fn walk_entry_list(
    buf: &Buf,
    factory: &RecordFactory,
    head: i64,
    declared_count: i32,
    n_slot: i32,
) -> Result<Vec<Option<Value>>> {
    let declared_count = declared_count.max(0) as u64;
    let mut entries: Vec<Option<Value>> = vec![None; n_slot.max(0) as usize];
    let mut off = head;
    for found in 0..declared_count {
        if off <= 0 {
            return Err(CdfError::CountMismatch {
                item_type: "attribute entries",
                expected: declared_count,
                found,
            });
        }
        let aedr = factory.read_aedr(buf, off as u64)?;
        let slot = aedr.num;
        if slot < 0 || slot as usize >= entries.len() {
            return Err(CdfError::InvalidFormat(format!(
                "Attribute entry index {} outside declared range of {} slots",
                slot,
                entries.len()
            )));
        }
        entries[slot as usize] = Some(read_entry_value(buf, &aedr)?);
        off = aedr.aedr_next;
    }
    Ok(entries)
}

/// Reads and shapes one AEDR's inline value: `num_elems` is the array
/// length (string length for the character types), and a single
/// element yields a scalar.
fn read_entry_value(buf: &Buf, aedr: &AedrRecord) -> Result<Value> {
    let data_type = DataType::from_code(aedr.data_type)?;
    let reader = DataReader::new(data_type, aedr.num_elems.max(0) as usize, 1);
    let shaper = Shaper::new(data_type, &[], &[], true);
    let mut raw = reader.create_raw_value_array();
    reader.read_value(buf, aedr.value_offset, &mut raw)?;
    Ok(shaper.shape(&raw, true))
}

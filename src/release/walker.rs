use super::{Fault, FreeReport};
use crate::config::{cfg_log, Config, LogLevel};
use crate::constants::{MAX_RECORDED_FAULTS, NULL_ADDRESS};
use crate::memory::width::{read_pointer, read_uint};
use crate::memory::{Address, Memory};
use crate::schema::{Field, Kind, Schema};

/// State of one free pass
pub(super) struct Walker<'a, M: Memory + ?Sized> {
    config: &'a Config,
    memory: &'a mut M,
    depth: usize,
    visited: usize,
    released: usize,
    faults: Vec<Fault>,
    suppressed: usize,
}

impl<'a, M: Memory + ?Sized> Walker<'a, M> {
    pub(super) fn new(config: &'a Config, memory: &'a mut M) -> Self {
        Walker {
            config,
            memory,
            depth: 0,
            visited: 0,
            released: 0,
            faults: Vec::new(),
            suppressed: 0,
        }
    }

    pub(super) fn finish(self) -> FreeReport {
        FreeReport {
            visited: self.visited,
            released: self.released,
            faults: self.faults,
            suppressed_faults: self.suppressed,
        }
    }

    /// Walk the root block by value, then release it
    ///
    /// `data` is the block itself, never a pointer slot, whatever the
    /// root schema's storage.
    pub(super) fn free_root(&mut self, schema: &Schema, data: Address) {
        if data == NULL_ADDRESS {
            return;
        }
        self.free_value(schema, data, false);
        self.release(data);
    }

    /// Free whatever `schema` owns at `data`, then the block `data` points to if owned
    ///
    /// For an owned node, `data` is the location of the pointer slot.
    fn free_node(&mut self, schema: &Schema, data: Address) {
        self.visited += 1;
        if data == NULL_ADDRESS {
            return;
        }
        if !schema.is_owned() {
            self.free_value(schema, data, false);
            return;
        }

        let allocation = match read_pointer(&*self.memory, data) {
            Ok(NULL_ADDRESS) => return,
            Ok(allocation) => allocation,
            Err(error) => {
                self.fault(Fault::Decode {
                    address: data,
                    error,
                });
                return;
            }
        };

        // A sequence resolves its own storage: its count is found relative to
        // the pointer slot, not the pointed-to block
        let value = match schema.kind {
            Kind::Mapping(_) => allocation,
            _ => data,
        };
        self.free_value(schema, value, true);
        self.release(allocation);
    }

    /// Free the children of the value at `data`
    ///
    /// `owned` tells a sequence that `data` is its pointer slot.
    fn free_value(&mut self, schema: &Schema, data: Address, owned: bool) {
        if let Some(limit) = self.config.max_depth() {
            if self.depth >= limit {
                self.fault(Fault::DepthExceeded {
                    address: data,
                    kind: schema.kind_name(),
                    limit,
                });
                return;
            }
        }

        self.depth += 1;
        match &schema.kind {
            Kind::Scalar(_) => {}
            Kind::Mapping(fields) => self.free_mapping(fields, data),
            Kind::Sequence {
                element,
                count_offset,
                count_width,
            } => {
                let at = data.wrapping_add_signed(*count_offset as i64);
                match read_uint(&*self.memory, *count_width, at) {
                    Ok(count) => self.free_sequence(element, count, data, owned),
                    Err(error) => self.fault(Fault::Decode { address: at, error }),
                }
            }
            Kind::SequenceFixed { element, count } => {
                self.free_sequence(element, *count, data, owned)
            }
        }
        self.depth -= 1;
    }

    fn free_mapping(&mut self, fields: &[Field], data: Address) {
        for field in fields {
            self.free_node(&field.value, data.wrapping_add(field.offset as u64));
        }
    }

    fn free_sequence(&mut self, element: &Schema, count: u64, data: Address, owned: bool) {
        if let Some(limit) = self.config.max_sequence_len() {
            if count > limit {
                self.fault(Fault::SequenceTooLong {
                    address: data,
                    count,
                    limit,
                });
                return;
            }
        }

        let base = if owned {
            match read_pointer(&*self.memory, data) {
                Ok(NULL_ADDRESS) => return,
                Ok(base) => base,
                Err(error) => {
                    self.fault(Fault::Decode {
                        address: data,
                        error,
                    });
                    return;
                }
            }
        } else {
            data
        };

        // Owned elements are stored as an array of pointers
        let stride = if element.is_owned() {
            self.memory.pointer_width() as u64
        } else {
            element.data_size as u64
        };

        for i in 0..count {
            self.free_node(element, base.wrapping_add(i.wrapping_mul(stride)));
        }
    }

    fn release(&mut self, allocation: Address) {
        if allocation == NULL_ADDRESS {
            return;
        }
        cfg_log!(
            self.config,
            LogLevel::Debug,
            "Freeing allocation: 0x{:x}",
            allocation
        );
        match self.memory.release(allocation) {
            Ok(()) => self.released += 1,
            Err(error) => {
                cfg_log!(
                    self.config,
                    LogLevel::Warning,
                    "Release of 0x{:x} failed: {}",
                    allocation,
                    error
                );
                self.fault(Fault::Release {
                    address: allocation,
                    error,
                });
            }
        }
    }

    /// Record an abandoned branch; past the cap only a count is kept
    fn fault(&mut self, fault: Fault) {
        if self.faults.len() >= MAX_RECORDED_FAULTS {
            self.suppressed += 1;
            return;
        }
        cfg_log!(self.config, LogLevel::Info, "Abandoning branch: {}", fault);
        self.faults.push(fault);
    }
}

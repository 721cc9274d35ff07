/// A finalized method body (spec.md §3, "Compiled method body (output)").
#[derive(Debug, Clone)]
pub struct MethodBody {
    pub code_bytes: Vec<u8>,
    pub max_stack: u16,
    pub init_locals_flag: bool,
    pub local_signature_bytes: Vec<u8>,
    /// Token identifying the standalone local-variable signature, when the
    /// token provider materializes one (spec.md §4.1, "Local signature").
    pub local_signature_handle: Option<u32>,
    pub exception_section_bytes: Vec<u8>,
    /// Byte offsets of every virtual token emitted (spec.md §4.1, "Virtual
    /// tokens"), already passed through the relocation function.
    pub virtual_token_locations: Vec<u32>,
}

impl MethodBody {
    pub fn code_len(&self) -> usize {
        self.code_bytes.len()
    }
}

//! Legacy packet headers for the "C1"/"C2" framing families.
//!
//! Every packet starts with a one-byte marker, the total packet length and a
//! packet code at a fixed offset. The C1 family carries a byte-sized length,
//! the C2 family a big-endian word-sized length.

/// Marker byte of the short-header (byte-sized length) family.
pub const C1_MARKER: u8 = 0xC1;

/// Marker byte of the long-header (word-sized length) family.
pub const C2_MARKER: u8 = 0xC2;

/// Offset of the packet code in a C1 frame.
pub const C1_CODE_OFFSET: usize = 2;

/// Offset of the sub-code in a sub-coded C1 frame.
pub const C1_SUB_CODE_OFFSET: usize = 3;

/// "C1" framed packet header (byte-sized length).
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct C1Header {
    pub marker: u8,
    pub size: u8,
    pub code: u8,
}

impl C1Header {
    #[must_use]
    pub const fn new(code: u8, total_len: u8) -> Self {
        Self {
            marker: C1_MARKER,
            size: total_len,
            code,
        }
    }

    /// Appends the header bytes to an outgoing buffer.
    pub fn write_to(&self, dst: &mut Vec<u8>) {
        dst.extend_from_slice(&[self.marker, self.size, self.code]);
    }
}

/// "C1" framed packet header with a sub-code byte.
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct C1SubHeader {
    pub marker: u8,
    pub size: u8,
    pub code: u8,
    pub sub_code: u8,
}

impl C1SubHeader {
    #[must_use]
    pub const fn new(code: u8, sub_code: u8, total_len: u8) -> Self {
        Self {
            marker: C1_MARKER,
            size: total_len,
            code,
            sub_code,
        }
    }

    pub fn write_to(&self, dst: &mut Vec<u8>) {
        dst.extend_from_slice(&[self.marker, self.size, self.code, self.sub_code]);
    }
}

/// "C2" framed packet header (big-endian word-sized length).
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct C2Header {
    pub marker: u8,
    pub size: [u8; 2],
    pub code: u8,
}

impl C2Header {
    #[must_use]
    pub const fn new(code: u8, total_len: u16) -> Self {
        Self {
            marker: C2_MARKER,
            size: total_len.to_be_bytes(),
            code,
        }
    }

    pub fn write_to(&self, dst: &mut Vec<u8>) {
        dst.extend_from_slice(&[self.marker, self.size[0], self.size[1], self.code]);
    }
}

/// "C2" framed packet header with a sub-code byte.
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct C2SubHeader {
    pub marker: u8,
    pub size: [u8; 2],
    pub code: u8,
    pub sub_code: u8,
}

impl C2SubHeader {
    #[must_use]
    pub const fn new(code: u8, sub_code: u8, total_len: u16) -> Self {
        Self {
            marker: C2_MARKER,
            size: total_len.to_be_bytes(),
            code,
            sub_code,
        }
    }

    pub fn write_to(&self, dst: &mut Vec<u8>) {
        dst.extend_from_slice(&[
            self.marker,
            self.size[0],
            self.size[1],
            self.code,
            self.sub_code,
        ]);
    }
}

/// Reads the packet code of a framed packet, if the frame is long enough.
#[must_use]
pub fn packet_code(frame: &[u8]) -> Option<u8> {
    match frame.first() {
        Some(&C1_MARKER) => frame.get(C1_CODE_OFFSET).copied(),
        Some(&C2_MARKER) => frame.get(3).copied(),
        _ => None,
    }
}

/// Reads the sub-code of a sub-coded framed packet.
#[must_use]
pub fn packet_sub_code(frame: &[u8]) -> Option<u8> {
    match frame.first() {
        Some(&C1_MARKER) => frame.get(C1_SUB_CODE_OFFSET).copied(),
        Some(&C2_MARKER) => frame.get(4).copied(),
        _ => None,
    }
}

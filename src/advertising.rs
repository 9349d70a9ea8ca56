//! Legacy advertising payload encoder.
//!
//! A legacy advertising packet carries at most 31 bytes of AD data, built
//! from self-describing elements:
//!
//! ```text
//!  ┌─────┬──────┬──────────────┐┌─────┬──────┬─────────┐
//!  │ len │ type │ data (len-1) ││ len │ type │ data …  │  ≤ 31 bytes
//!  └─────┴──────┴──────────────┘└─────┴──────┴─────────┘
//! ```
//!
//! `len` counts the bytes that follow it within the element, so a scanner
//! can skip element types it does not understand.  Every append checks the
//! remaining capacity and leaves the buffer untouched on failure.

use core::fmt;

use crate::app::ports::AttributePort;
use crate::error::{Error, Result};

/// Capacity of a legacy advertising or scan-response payload.
pub const ADV_PAYLOAD_CAPACITY: usize = 31;

/// AD type codes used by the responder.
pub mod ad_type {
    pub const FLAGS: u8 = 0x01;
    pub const COMPLETE_LOCAL_NAME: u8 = 0x09;
    pub const MANUFACTURER_SPECIFIC_DATA: u8 = 0xFF;
}

/// An append did not fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityError {
    /// Bytes the element needs.
    pub needed: usize,
    /// Bytes left in the buffer.
    pub available: usize,
}

impl fmt::Display for CapacityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "element needs {} bytes, only {} left of {}",
            self.needed, self.available, ADV_PAYLOAD_CAPACITY
        )
    }
}

/// One decoded AD element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdElement<'a> {
    pub ad_type: u8,
    pub data: &'a [u8],
}

/// Fixed-capacity advertising payload with an embedded write cursor.
#[derive(Clone, PartialEq, Eq)]
pub struct AdvertisingBuffer {
    length: u8,
    payload: [u8; ADV_PAYLOAD_CAPACITY],
}

impl Default for AdvertisingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AdvertisingBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AdvertisingBuffer({}) {:02x?}", self.length, self.as_bytes())
    }
}

impl AdvertisingBuffer {
    pub const fn new() -> Self {
        Self {
            length: 0,
            payload: [0; ADV_PAYLOAD_CAPACITY],
        }
    }

    pub fn reset(&mut self) {
        self.length = 0;
    }

    pub fn len(&self) -> usize {
        self.length as usize
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn remaining(&self) -> usize {
        ADV_PAYLOAD_CAPACITY - self.len()
    }

    /// The encoded bytes, ready to push to the stack.
    pub fn as_bytes(&self) -> &[u8] {
        &self.payload[..self.len()]
    }

    /// Append a 3-byte Flags element.
    pub fn append_flags(&mut self, flags: u8) -> core::result::Result<(), CapacityError> {
        self.reserve(3)?;
        self.push_header(2, ad_type::FLAGS);
        self.push(&[flags]);
        Ok(())
    }

    /// Append a Complete Local Name element read straight from the GATT
    /// database.  The name is truncated to whatever still fits.
    pub fn append_local_name(&mut self, store: &impl AttributePort, handle: u16) -> Result<()> {
        self.reserve(2)?;
        let max_length = self.remaining() - 2;
        let start = self.len() + 2;

        let name = &mut self.payload[start..start + max_length];
        let read = store
            .read_attribute_value(handle, 0, name)
            .map_err(|error| Error::AttributeRead { handle, error })?;
        // A store may not report more than it was offered.
        let read = read.min(max_length);

        self.push_header(1 + read as u8, ad_type::COMPLETE_LOCAL_NAME);
        self.length += read as u8;
        Ok(())
    }

    /// Append a Manufacturer Specific Data element:
    /// `company_id`, two 16-bit handles, then `data`, all little-endian.
    ///
    /// The length byte is `data.len() + 7`, counting every byte after it, and
    /// the element takes `data.len() + 8` bytes.  This deliberately differs
    /// from the legacy `length + 5` encoding, which under-counts the element.
    pub fn append_manufacturer_data(
        &mut self,
        company_id: u16,
        slot_a: u16,
        slot_b: u16,
        data: &[u8],
    ) -> core::result::Result<(), CapacityError> {
        let body = 6 + data.len();
        self.reserve(2 + body)?;
        self.push_header(1 + body as u8, ad_type::MANUFACTURER_SPECIFIC_DATA);
        self.push(&company_id.to_le_bytes());
        self.push(&slot_a.to_le_bytes());
        self.push(&slot_b.to_le_bytes());
        self.push(data);
        Ok(())
    }

    /// Walk the encoded elements.  Stops at the first truncated element.
    pub fn elements(&self) -> AdElements<'_> {
        AdElements::new(self.as_bytes())
    }

    /// True when element lengths exactly account for every encoded byte.
    pub fn is_well_formed(&self) -> bool {
        well_formed(self.as_bytes())
    }

    // ── Internal ──────────────────────────────────────────────

    fn reserve(&self, needed: usize) -> core::result::Result<(), CapacityError> {
        let available = self.remaining();
        if needed > available {
            return Err(CapacityError { needed, available });
        }
        Ok(())
    }

    fn push_header(&mut self, len: u8, ty: u8) {
        self.push(&[len, ty]);
    }

    fn push(&mut self, bytes: &[u8]) {
        let start = self.len();
        self.payload[start..start + bytes.len()].copy_from_slice(bytes);
        self.length += bytes.len() as u8;
    }
}

/// Check that `ad` is an exact concatenation of length-prefixed elements.
pub fn well_formed(ad: &[u8]) -> bool {
    let mut i = 0usize;
    while i < ad.len() {
        let len = ad[i] as usize;
        if len == 0 {
            return false;
        }
        i += len + 1;
    }
    i == ad.len()
}

/// Iterator over the AD elements of a payload.
pub struct AdElements<'a> {
    rest: &'a [u8],
}

impl<'a> AdElements<'a> {
    pub fn new(ad: &'a [u8]) -> Self {
        Self { rest: ad }
    }
}

impl<'a> Iterator for AdElements<'a> {
    type Item = AdElement<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (&len, tail) = self.rest.split_first()?;
        let len = len as usize;
        if len == 0 || len > tail.len() {
            self.rest = &[];
            return None;
        }
        let (element, rest) = tail.split_at(len);
        self.rest = rest;
        Some(AdElement {
            ad_type: element[0],
            data: &element[1..],
        })
    }
}

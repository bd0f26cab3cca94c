//! Messages that are exchanged between the policy engine and the transport.
//!
//! A message consists of a [`Header`] and up to seven 32 bit data objects. Typed views on the data
//! objects are provided by the [`pdo`], [`request`] and [`vendor_defined`] modules.
pub mod header;
pub mod pdo;
pub mod request;
pub mod vendor_defined;

use core::ops::BitOr;

use byteorder::{ByteOrder, LittleEndian};
use heapless::Vec;

use header::{ControlMessageType, DataMessageType, Header, MessageType};
use vendor_defined::{VdmHeader, VdmHeaderStructured};

/// The maximum number of data objects in a (non-extended) message.
pub const MAX_DATA_OBJECTS: usize = 7;

/// The maximum size of a serialized message in bytes.
pub const MAX_MESSAGE_SIZE: usize = 2 + 4 * MAX_DATA_OBJECTS;

/// Errors that can occur during message parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// The input buffer has an invalid length.
    #[error("invalid input buffer length (expected {expected:?}, found {found:?})")]
    InvalidLength {
        /// The expected length.
        expected: usize,
        /// The actual length.
        found: usize,
    },
    /// The specification revision field is reserved.
    #[error("unsupported specification revision `{0}`")]
    UnsupportedSpecificationRevision(u8),
    /// Extended messages are not supported.
    #[error("extended messages are not supported")]
    ExtendedMessage,
}

/// A USB PD message.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Message {
    /// The message header.
    pub header: Header,
    /// Raw data objects that follow the header.
    pub objects: Vec<u32, MAX_DATA_OBJECTS>,
}

impl Default for Message {
    fn default() -> Self {
        Self::new(Header(0))
    }
}

impl Message {
    /// Create a new message without data objects.
    pub fn new(header: Header) -> Self {
        Self {
            header,
            objects: Vec::new(),
        }
    }

    /// Create a new message with data objects.
    ///
    /// Surplus objects are dropped, and the header's object count is updated.
    pub fn new_with_objects(header: Header, objects: &[u32]) -> Self {
        let objects: Vec<u32, MAX_DATA_OBJECTS> = objects.iter().copied().take(MAX_DATA_OBJECTS).collect();

        Self {
            header: header.with_num_objects(objects.len() as u8),
            objects,
        }
    }

    /// The type of the message.
    pub fn message_type(&self) -> MessageType {
        self.header.message_type()
    }

    /// Whether this is a control message of the given type.
    pub fn is_control(&self, message_type: ControlMessageType) -> bool {
        self.message_type() == MessageType::Control(message_type)
    }

    /// Whether this is a data message of the given type.
    pub fn is_data(&self, message_type: DataMessageType) -> bool {
        self.message_type() == MessageType::Data(message_type)
    }

    /// The data object at `index`, if present.
    pub fn object(&self, index: usize) -> Option<u32> {
        self.objects.get(index).copied()
    }

    /// The VDM header, if this is a vendor defined message.
    pub fn vdm_header(&self) -> Option<VdmHeader> {
        if self.is_data(DataMessageType::VendorDefined) {
            self.object(0).map(VdmHeader::from)
        } else {
            None
        }
    }

    /// The structured VDM header, if this is a structured vendor defined message.
    pub fn structured_vdm(&self) -> Option<VdmHeaderStructured> {
        match self.vdm_header() {
            Some(VdmHeader::Structured(header)) => Some(header),
            _ => None,
        }
    }

    /// The VDOs that follow the VDM header.
    pub fn vdos(&self) -> &[u32] {
        self.objects.get(1..).unwrap_or(&[])
    }

    /// Serialize the message into `buffer`, and return the number of written bytes.
    pub fn to_bytes(&self, buffer: &mut [u8]) -> Result<usize, ParseError> {
        let size = 2 + 4 * self.objects.len();
        if buffer.len() < size {
            return Err(ParseError::InvalidLength {
                expected: size,
                found: buffer.len(),
            });
        }

        let mut offset = self.header.to_bytes(buffer);
        for object in &self.objects {
            LittleEndian::write_u32(&mut buffer[offset..offset + 4], *object);
            offset += 4;
        }

        Ok(offset)
    }

    /// Parse a message from its binary representation.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ParseError> {
        let header = Header::from_bytes(data.get(..2).unwrap_or(data))?;

        if header.extended() {
            return Err(ParseError::ExtendedMessage);
        }

        let expected = 2 + 4 * header.num_objects();
        if data.len() != expected {
            return Err(ParseError::InvalidLength {
                expected,
                found: data.len(),
            });
        }

        let objects = data[2..].chunks_exact(4).map(LittleEndian::read_u32).collect();
        Ok(Self { header, objects })
    }
}

/// A set of message types.
///
/// Control message types occupy the lower 32 bits, data message types the upper 32 bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MessageMask(u64);

impl MessageMask {
    /// The empty set.
    pub const NONE: Self = Self(0);

    const fn bit(message_type: MessageType) -> u64 {
        match message_type {
            MessageType::Control(_) => 1 << message_type.raw(),
            MessageType::Data(_) => 1 << (32 + message_type.raw() as u32),
        }
    }

    /// A set with a single message type.
    pub const fn of(message_type: MessageType) -> Self {
        Self(Self::bit(message_type))
    }

    /// A set with a single control message type.
    pub const fn control(message_type: ControlMessageType) -> Self {
        Self::of(MessageType::Control(message_type))
    }

    /// A set with a single data message type.
    pub const fn data(message_type: DataMessageType) -> Self {
        Self::of(MessageType::Data(message_type))
    }

    /// Add a message type to the set.
    pub const fn with(self, message_type: MessageType) -> Self {
        Self(self.0 | Self::bit(message_type))
    }

    /// Whether the set contains a message type.
    pub const fn contains(self, message_type: MessageType) -> bool {
        self.0 & Self::bit(message_type) != 0
    }

    /// Whether the set is empty.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for MessageMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl From<MessageType> for MessageMask {
    fn from(message_type: MessageType) -> Self {
        Self::of(message_type)
    }
}

#[cfg(test)]
mod tests {
    use super::header::{ControlMessageType, DataMessageType, Header, MessageType, SpecificationRevision};
    use super::{Message, MessageMask, ParseError};
    use crate::{DataRole, PowerRole};

    fn template() -> Header {
        Header::new_template(DataRole::Ufp, PowerRole::Sink, SpecificationRevision::R3_X)
    }

    #[test]
    fn test_request_to_bytes() {
        let header = Header::new_data(template(), DataMessageType::Request, 0);
        let message = Message::new_with_objects(header, &[0x1304_B12C]);

        let mut buf = [0u8; super::MAX_MESSAGE_SIZE];
        let size = message.to_bytes(&mut buf).unwrap();

        assert_eq!(size, 6);
        assert_eq!(message.header.num_objects(), 1);
        assert_eq!(&buf[2..6], &[0x2C, 0xB1, 0x04, 0x13]);

        let parsed = Message::from_bytes(&buf[..size]).unwrap();
        assert_eq!(parsed, message);
        assert!(parsed.is_data(DataMessageType::Request));
    }

    #[test]
    fn test_surplus_objects_are_dropped() {
        let header = Header::new_data(template(), DataMessageType::SourceCapabilities, 0);
        let message = Message::new_with_objects(header, &[1, 2, 3, 4, 5, 6, 7, 8, 9]);

        assert_eq!(message.objects.len(), 7);
        assert_eq!(message.header.num_objects(), 7);
    }

    #[test]
    fn test_parse_errors() {
        // Header announces one object, but none follows.
        let header = Header::new_data(template(), DataMessageType::Request, 1);
        let mut buf = [0u8; 2];
        header.to_bytes(&mut buf);

        assert_eq!(
            Message::from_bytes(&buf),
            Err(ParseError::InvalidLength { expected: 6, found: 2 })
        );

        let mut short = [0u8; 2];
        let message = Message::new_with_objects(header, &[1]);
        assert!(message.to_bytes(&mut short).is_err());
    }

    #[test]
    fn test_mask() {
        let mask = MessageMask::control(ControlMessageType::Accept)
            | MessageMask::control(ControlMessageType::Reject)
            | MessageMask::data(DataMessageType::Request);

        assert!(mask.contains(MessageType::Control(ControlMessageType::Accept)));
        assert!(mask.contains(MessageType::Data(DataMessageType::Request)));
        assert!(!mask.contains(MessageType::Control(ControlMessageType::Wait)));

        // Same raw value, different message class.
        assert!(!mask.contains(MessageType::Control(ControlMessageType::GotoMin)));
        assert!(MessageMask::NONE.is_empty());
    }
}

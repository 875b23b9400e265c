/*! **\[Internal\]** Block definitions.

> Caveat: This is an internal module, and is exposed for the sake of
> interest only.  The API may change in a patch bump.

Only the three block types the capture pipeline actually consumes are
modelled here: the Section Header Block, the Interface Description
Block, and the Enhanced Packet Block. Every other pcapng block type
(obsolete/simple packets, name resolution, interface statistics,
decryption secrets, ...) is read past as an opaque, length-prefixed
blob and discarded; [`crate::block::frame::parse_frame`] only needs a
block's type and length to skip it.

All documentation in this module is taken from [the pcap-ng spec][].  It is
copyright (c) 2018 IETF Trust and the persons identified as the authors of
the linked document. All rights reserved.

[the pcap-ng spec]: https://github.com/pcapng/pcapng
*/

mod epb;
mod frame;
mod idb;
mod opts;
mod shb;
mod util;

pub use self::epb::*;
pub use self::frame::*;
pub use self::idb::*;
pub use self::shb::*;
pub use self::util::*;

use bytes::Buf;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BlockType {
    SectionHeader,
    InterfaceDescription,
    EnhancedPacket,
    Unknown(u32),
}

impl From<u32> for BlockType {
    fn from(code: u32) -> Self {
        match code {
            0x0A0D_0D0A => BlockType::SectionHeader,
            0x0000_0001 => BlockType::InterfaceDescription,
            0x0000_0006 => BlockType::EnhancedPacket,
            n => BlockType::Unknown(n),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Block {
    SectionHeader(SectionHeader),
    InterfaceDescription(InterfaceDescription),
    EnhancedPacket(EnhancedPacket),
    Unparsed(BlockType),
}

impl Block {
    pub(crate) fn parse(
        block_type: BlockType,
        block_data: impl Buf,
        endianness: Endianness,
    ) -> Result<Block, BlockError> {
        use BlockType as BT;
        Ok(match block_type {
            BT::SectionHeader => SectionHeader::parse(block_data, endianness)?.into(),
            BT::InterfaceDescription => InterfaceDescription::parse(block_data, endianness)?.into(),
            BT::EnhancedPacket => EnhancedPacket::parse(block_data, endianness)?.into(),
            BT::Unknown(_) => Block::Unparsed(block_type),
        })
    }
}

impl From<SectionHeader> for Block {
    fn from(x: SectionHeader) -> Self {
        Block::SectionHeader(x)
    }
}
impl From<InterfaceDescription> for Block {
    fn from(x: InterfaceDescription) -> Self {
        Block::InterfaceDescription(x)
    }
}
impl From<EnhancedPacket> for Block {
    fn from(x: EnhancedPacket) -> Self {
        Block::EnhancedPacket(x)
    }
}

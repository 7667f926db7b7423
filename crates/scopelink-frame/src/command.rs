//! Command opcodes.
//!
//! The opcode byte follows the length field of every frame. Values are part
//! of the wire contract with device firmware and never change.

/// A frame opcode.
///
/// Bytes without a known meaning decode to [`Command::Unknown`] and encode
/// back to the same byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Device serial number.
    Serial,
    /// Drop pending acquisition data.
    Flush,
    /// Orderly disconnect.
    Disconnect,
    /// Controller register read.
    Get,
    /// Controller register write.
    Set,
    /// Bulk data transfer.
    Data,
    /// PIC firmware version.
    PicFwVersion,
    /// Flash a new FPGA bitstream.
    FlashFpga,
    /// Port of the acquisition data socket.
    DataPort,
    /// Acquisition packet.
    Acquisition,
    /// List wireless access points.
    LedeListAps,
    /// Reset network configuration.
    LedeReset,
    /// Join a wireless access point.
    LedeConnectAp,
    /// Reboot the network bridge.
    LedeReboot,
    /// Server protocol version.
    ServerVersion,
    /// Any opcode not listed above.
    Unknown(u8),
}

impl Command {
    pub const SERIAL: u8 = 0x0d;
    pub const FLUSH: u8 = 0x0e;
    pub const DISCONNECT: u8 = 0x0f;
    pub const GET: u8 = 0x18;
    pub const SET: u8 = 0x19;
    pub const DATA: u8 = 0x1a;
    pub const PIC_FW_VERSION: u8 = 0x1b;
    pub const FLASH_FPGA: u8 = 0x24;
    pub const DATA_PORT: u8 = 0x2a;
    pub const ACQUISITION: u8 = 0x34;
    pub const LEDE_LIST_APS: u8 = 0x40;
    pub const LEDE_RESET: u8 = 0x41;
    pub const LEDE_CONNECT_AP: u8 = 0x42;
    pub const LEDE_REBOOT: u8 = 0x43;
    pub const SERVER_VERSION: u8 = 0x50;

    pub fn from_u8(value: u8) -> Self {
        match value {
            Self::SERIAL => Command::Serial,
            Self::FLUSH => Command::Flush,
            Self::DISCONNECT => Command::Disconnect,
            Self::GET => Command::Get,
            Self::SET => Command::Set,
            Self::DATA => Command::Data,
            Self::PIC_FW_VERSION => Command::PicFwVersion,
            Self::FLASH_FPGA => Command::FlashFpga,
            Self::DATA_PORT => Command::DataPort,
            Self::ACQUISITION => Command::Acquisition,
            Self::LEDE_LIST_APS => Command::LedeListAps,
            Self::LEDE_RESET => Command::LedeReset,
            Self::LEDE_CONNECT_AP => Command::LedeConnectAp,
            Self::LEDE_REBOOT => Command::LedeReboot,
            Self::SERVER_VERSION => Command::ServerVersion,
            other => Command::Unknown(other),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Command::Serial => Self::SERIAL,
            Command::Flush => Self::FLUSH,
            Command::Disconnect => Self::DISCONNECT,
            Command::Get => Self::GET,
            Command::Set => Self::SET,
            Command::Data => Self::DATA,
            Command::PicFwVersion => Self::PIC_FW_VERSION,
            Command::FlashFpga => Self::FLASH_FPGA,
            Command::DataPort => Self::DATA_PORT,
            Command::Acquisition => Self::ACQUISITION,
            Command::LedeListAps => Self::LEDE_LIST_APS,
            Command::LedeReset => Self::LEDE_RESET,
            Command::LedeConnectAp => Self::LEDE_CONNECT_AP,
            Command::LedeReboot => Self::LEDE_REBOOT,
            Command::ServerVersion => Self::SERVER_VERSION,
            Command::Unknown(value) => value,
        }
    }

    /// Human-readable opcode name.
    pub fn name(self) -> &'static str {
        match self {
            Command::Serial => "SERIAL",
            Command::Flush => "FLUSH",
            Command::Disconnect => "DISCONNECT",
            Command::Get => "GET",
            Command::Set => "SET",
            Command::Data => "DATA",
            Command::PicFwVersion => "PIC_FW_VERSION",
            Command::FlashFpga => "FLASH_FPGA",
            Command::DataPort => "DATA_PORT",
            Command::Acquisition => "ACQUISITION",
            Command::LedeListAps => "LEDE_LIST_APS",
            Command::LedeReset => "LEDE_RESET",
            Command::LedeConnectAp => "LEDE_CONNECT_AP",
            Command::LedeReboot => "LEDE_REBOOT",
            Command::ServerVersion => "SERVER_VERSION",
            Command::Unknown(_) => "UNKNOWN",
        }
    }

    /// Returns true for commands whose payload carries controller sub-headers.
    pub fn is_register_access(self) -> bool {
        matches!(self, Command::Get | Command::Set)
    }

    pub fn is_known(self) -> bool {
        !matches!(self, Command::Unknown(_))
    }
}

impl From<u8> for Command {
    fn from(value: u8) -> Self {
        Command::from_u8(value)
    }
}

impl From<Command> for u8 {
    fn from(command: Command) -> Self {
        command.as_u8()
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Unknown(value) => write!(f, "UNKNOWN(0x{value:02x})"),
            known => f.write_str(known.name()),
        }
    }
}

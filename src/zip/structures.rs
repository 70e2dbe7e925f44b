use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }
}

/// General purpose flag: entry is encrypted
pub const FLAG_ENCRYPTED: u16 = 0x0001;
/// General purpose flag: sizes and CRC follow the payload in a data descriptor
pub const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;

/// End of Central Directory (EOCD) - 22 bytes plus comment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: u32 = 0x0605_4b50;
    pub const SIZE: usize = 22;
    /// Largest comment the 16-bit length field can describe
    pub const MAX_COMMENT_LEN: usize = 0xFFFF;

    /// Decode the fixed part of a record. `data` must start at the signature.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < Self::SIZE {
            return None;
        }

        let mut cursor = Cursor::new(data);
        if cursor.read_u32::<LittleEndian>().ok()? != Self::SIGNATURE {
            return None;
        }

        Some(Self {
            disk_number: cursor.read_u16::<LittleEndian>().ok()?,
            disk_with_cd: cursor.read_u16::<LittleEndian>().ok()?,
            disk_entries: cursor.read_u16::<LittleEndian>().ok()?,
            total_entries: cursor.read_u16::<LittleEndian>().ok()?,
            cd_size: cursor.read_u32::<LittleEndian>().ok()?,
            cd_offset: cursor.read_u32::<LittleEndian>().ok()?,
            comment_len: cursor.read_u16::<LittleEndian>().ok()?,
        })
    }

    pub fn is_multi_disk(&self) -> bool {
        self.disk_number != 0 || self.disk_with_cd != 0 || self.disk_entries != self.total_entries
    }
}

/// Central Directory File Header, fixed part (46 bytes).
///
/// The name, extra field and comment follow the record in the directory buffer;
/// `record_offset` locates the record there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CentralDirectoryEntry {
    pub signature: u32,
    pub version: u16,
    pub version_extract: u16,
    /// Raw general purpose bits
    pub flags: u16,
    pub method: u16,
    pub mod_time: u16,
    pub mod_date: u16,
    /// Stored as found, never checked
    pub crc32: u32,
    pub compressed_size: u32,
    pub size: u32,
    pub len_file_name: u16,
    pub len_extra: u16,
    pub len_comment: u16,
    pub disk_start: u16,
    pub internal_attr: u16,
    pub external_attr: u32,
    /// Offset of the Local File Header in the archive
    pub offset: u32,
    pub record_offset: usize,
}

impl CentralDirectoryEntry {
    pub const SIGNATURE: u32 = 0x0201_4b50;
    pub const SIZE: usize = 46;

    /// Decode the fixed record at `record_offset`. The caller checks that 46 bytes remain.
    pub(crate) fn read(cursor: &mut Cursor<&[u8]>, record_offset: usize) -> std::io::Result<Self> {
        Ok(Self {
            signature: cursor.read_u32::<LittleEndian>()?,
            version: cursor.read_u16::<LittleEndian>()?,
            version_extract: cursor.read_u16::<LittleEndian>()?,
            flags: cursor.read_u16::<LittleEndian>()?,
            method: cursor.read_u16::<LittleEndian>()?,
            mod_time: cursor.read_u16::<LittleEndian>()?,
            mod_date: cursor.read_u16::<LittleEndian>()?,
            crc32: cursor.read_u32::<LittleEndian>()?,
            compressed_size: cursor.read_u32::<LittleEndian>()?,
            size: cursor.read_u32::<LittleEndian>()?,
            len_file_name: cursor.read_u16::<LittleEndian>()?,
            len_extra: cursor.read_u16::<LittleEndian>()?,
            len_comment: cursor.read_u16::<LittleEndian>()?,
            disk_start: cursor.read_u16::<LittleEndian>()?,
            internal_attr: cursor.read_u16::<LittleEndian>()?,
            external_attr: cursor.read_u32::<LittleEndian>()?,
            offset: cursor.read_u32::<LittleEndian>()?,
            record_offset,
        })
    }

    /// Bytes taken by the name, extra field and comment
    pub fn variable_len(&self) -> usize {
        self.len_file_name as usize + self.len_extra as usize + self.len_comment as usize
    }

    /// Full length of this record in the directory
    pub fn record_len(&self) -> usize {
        Self::SIZE + self.variable_len()
    }

    pub fn compression_method(&self) -> CompressionMethod {
        CompressionMethod::from_u16(self.method)
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }

    pub fn has_data_descriptor(&self) -> bool {
        self.flags & FLAG_DATA_DESCRIPTOR != 0
    }

    pub fn modified(&self) -> DosDateTime {
        DosDateTime::from_dos(self.mod_date, self.mod_time)
    }
}

/// Local File Header (LFH) - 30 bytes, followed by name, extra field and payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalFileHeader {
    pub version_extract: u16,
    pub flags: u16,
    pub method: u16,
    pub mod_time: u16,
    pub mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub size: u32,
    pub len_file_name: u16,
    pub len_extra: u16,
}

impl LocalFileHeader {
    pub const SIGNATURE: u32 = 0x0403_4b50;
    pub const SIZE: usize = 30;

    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < Self::SIZE {
            return None;
        }

        let mut cursor = Cursor::new(data);
        if cursor.read_u32::<LittleEndian>().ok()? != Self::SIGNATURE {
            return None;
        }

        Some(Self {
            version_extract: cursor.read_u16::<LittleEndian>().ok()?,
            flags: cursor.read_u16::<LittleEndian>().ok()?,
            method: cursor.read_u16::<LittleEndian>().ok()?,
            mod_time: cursor.read_u16::<LittleEndian>().ok()?,
            mod_date: cursor.read_u16::<LittleEndian>().ok()?,
            crc32: cursor.read_u32::<LittleEndian>().ok()?,
            compressed_size: cursor.read_u32::<LittleEndian>().ok()?,
            size: cursor.read_u32::<LittleEndian>().ok()?,
            len_file_name: cursor.read_u16::<LittleEndian>().ok()?,
            len_extra: cursor.read_u16::<LittleEndian>().ok()?,
        })
    }

    /// Distance from the start of the header to the first payload byte
    pub fn payload_offset(&self) -> u64 {
        Self::SIZE as u64 + self.len_file_name as u64 + self.len_extra as u64
    }
}

/// Modification timestamp decoded from the packed MS-DOS date and time fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DosDateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl DosDateTime {
    pub fn from_dos(date: u16, time: u16) -> Self {
        Self {
            year: ((date >> 9) & 0x7F) + 1980,
            month: ((date >> 5) & 0x0F) as u8,
            day: (date & 0x1F) as u8,
            hour: ((time >> 11) & 0x1F) as u8,
            minute: ((time >> 5) & 0x3F) as u8,
            // two-second resolution
            second: ((time & 0x1F) * 2) as u8,
        }
    }
}

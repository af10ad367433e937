//! CAN 帧定义与编解码
//!
//! 二进制布局与 Linux `include/linux/can.h` 中的 `struct can_frame` 完全一致：
//!
//! ```text
//! byte 0..4   can_id（小端，bit 31 = EFF 扩展帧标志）
//! byte 4      can_dlc（有效数据长度 0..8）
//! byte 5..8   __pad / __res0 / __res1（保留，原样往返）
//! byte 8..16  data[8]
//! ```
//!
//! 文本格式沿用 can-utils 的 `cansend` / `candump -L` 日志格式：`<can_id>#{data}`。

use crate::ProtocolError;
use crate::ids::{CAN_EFF_FLAG, CAN_EFF_MASK, CAN_SFF_MASK};
use bytes::{Buf, BufMut, BytesMut};
use std::fmt;
use std::str::FromStr;

/// 二进制帧大小（字节）
pub const FRAME_SIZE: usize = 16;

/// 最大有效数据长度（CAN 2.0）
pub const MAX_DLC: u8 = 8;

/// 标准帧 ID 的十六进制字符数（11-bit）
const SFF_ID_HEX_LEN: usize = 3;

/// 扩展帧 ID 的十六进制字符数（29-bit）
const EFF_ID_HEX_LEN: usize = 8;

/// 数据字段最多 16 个十六进制字符（8 字节）
const MAX_DATA_HEX_LEN: usize = 16;

/// CAN 2.0 帧
///
/// 设计要点：
/// - `Copy`：帧在流水线中按值传递，交给传输层后不再被修改
/// - 固定 8 字节数据：避免堆分配
/// - `id` 内嵌 EFF 标志位（bit 31），与内核 `canid_t` 语义一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Frame {
    /// CAN ID（含 EFF 标志位）
    pub id: u32,

    /// 有效数据长度 (0-8)
    pub len: u8,

    /// 保留字节（无语义，但必须原样往返）
    pub reserved: [u8; 3],

    /// 帧数据（固定 8 字节，只有前 `len` 字节有效）
    pub data: [u8; 8],
}

impl Frame {
    /// 创建标准帧（11-bit ID）
    pub fn new_standard(id: u16, data: &[u8]) -> Self {
        Self::new(u32::from(id) & CAN_SFF_MASK, data)
    }

    /// 创建扩展帧（29-bit ID，自动设置 EFF 标志）
    pub fn new_extended(id: u32, data: &[u8]) -> Self {
        Self::new((id & CAN_EFF_MASK) | CAN_EFF_FLAG, data)
    }

    /// 通用构造器（超过 8 字节的数据会被截断）
    fn new(id: u32, data: &[u8]) -> Self {
        let mut fixed_data = [0u8; 8];
        let len = data.len().min(MAX_DLC as usize);
        fixed_data[..len].copy_from_slice(&data[..len]);

        Self {
            id,
            len: len as u8,
            reserved: [0; 3],
            data: fixed_data,
        }
    }

    /// 获取有效数据切片
    ///
    /// 对于非法的 `len`（> 8），只返回完整的 8 字节。
    pub fn payload(&self) -> &[u8] {
        &self.data[..usize::from(self.len.min(MAX_DLC))]
    }

    /// 是否为扩展帧（29-bit ID）
    pub fn is_extended(&self) -> bool {
        self.id & CAN_EFF_FLAG != 0
    }

    /// 去除标志位后的 ID
    pub fn raw_id(&self) -> u32 {
        if self.is_extended() {
            self.id & CAN_EFF_MASK
        } else {
            self.id & CAN_SFF_MASK
        }
    }

    /// 编码为 16 字节二进制帧
    ///
    /// # 错误
    /// - `ProtocolError::FrameTooLarge`: `len > 8`，无法放入 16 字节布局
    pub fn encode(&self) -> Result<[u8; FRAME_SIZE], ProtocolError> {
        let mut buf = BytesMut::with_capacity(FRAME_SIZE);
        self.pack_to(&mut buf)?;

        let mut out = [0u8; FRAME_SIZE];
        out.copy_from_slice(&buf[..FRAME_SIZE]);
        Ok(out)
    }

    /// 追加写入到 `BytesMut`
    pub fn pack_to(&self, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        if self.len > MAX_DLC {
            return Err(ProtocolError::FrameTooLarge { dlc: self.len });
        }

        buf.reserve(FRAME_SIZE);
        buf.put_u32_le(self.id);
        buf.put_u8(self.len);
        buf.put_slice(&self.reserved);
        buf.put_slice(&self.data);
        Ok(())
    }

    /// 从二进制缓冲区解码（只读取前 16 字节）
    ///
    /// # 错误
    /// - `ProtocolError::InvalidLength`: 缓冲区不足 16 字节
    /// - `ProtocolError::FrameTooLarge`: DLC 字节大于 8
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < FRAME_SIZE {
            return Err(ProtocolError::InvalidLength {
                expected: FRAME_SIZE,
                actual: bytes.len(),
            });
        }

        let mut buf = &bytes[..FRAME_SIZE];
        let id = buf.get_u32_le();
        let len = buf.get_u8();
        if len > MAX_DLC {
            return Err(ProtocolError::FrameTooLarge { dlc: len });
        }

        let mut reserved = [0u8; 3];
        buf.copy_to_slice(&mut reserved);
        let mut data = [0u8; 8];
        buf.copy_to_slice(&mut data);

        Ok(Self {
            id,
            len,
            reserved,
            data,
        })
    }

    /// 解析 candump 日志行
    ///
    /// 格式：`<can_id>#{data}`
    /// - `<can_id>`: 3 个（SFF）或 8 个（EFF）十六进制字符
    /// - `{data}`: 2..16 个十六进制字符，偶数长度
    ///
    /// 不支持远程帧（`R`）与 CAN FD（`##`）。
    ///
    /// # 示例
    ///
    /// ```
    /// use pican_protocol::Frame;
    ///
    /// let frame = Frame::from_log_line("02000100#6400").unwrap();
    /// assert!(frame.is_extended());
    /// assert_eq!(frame.payload(), &[0x64, 0x00]);
    /// ```
    pub fn from_log_line(line: &str) -> Result<Self, ProtocolError> {
        if line.contains('R') {
            return Err(ProtocolError::RemoteFrameUnsupported);
        }

        let mut parts = line.split('#');
        let (Some(id_text), Some(data_text), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(ProtocolError::InvalidSeparator);
        };

        if id_text.len() != SFF_ID_HEX_LEN && id_text.len() != EFF_ID_HEX_LEN {
            return Err(ProtocolError::InvalidIdWidth {
                width: id_text.len(),
            });
        }
        if data_text.len() % 2 != 0 {
            return Err(ProtocolError::OddDataLength {
                len: data_text.len(),
            });
        }
        if data_text.len() > MAX_DATA_HEX_LEN {
            return Err(ProtocolError::DataTooLong {
                len: data_text.len(),
            });
        }
        if data_text.len() < 2 {
            return Err(ProtocolError::MissingData);
        }

        let is_extended = id_text.len() == EFF_ID_HEX_LEN;
        // 3 字符 ID 左侧补零到 8 字符，统一按 u32 大端解码
        let padded_id = format!("{:0>8}", id_text);
        let mut id_bytes = [0u8; 4];
        hex::decode_to_slice(&padded_id, &mut id_bytes).map_err(|e| {
            ProtocolError::InvalidHex {
                field: "id",
                reason: e.to_string(),
            }
        })?;
        let mut id = u32::from_be_bytes(id_bytes);
        if is_extended {
            id |= CAN_EFF_FLAG;
        }

        let data = hex::decode(data_text).map_err(|e| ProtocolError::InvalidHex {
            field: "data",
            reason: e.to_string(),
        })?;

        Ok(Self::new(id, &data))
    }
}

impl FromStr for Frame {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_log_line(s)
    }
}

/// 以 candump 日志格式输出（`123#0102`、`02000100#6400`）
impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_extended() {
            write!(f, "{:08X}", self.raw_id())?;
        } else {
            write!(f, "{:03X}", self.id & 0xFFF)?;
        }
        write!(f, "#{}", hex::encode_upper(self.payload()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_log_line_matches_constructors() {
        assert_eq!(
            Frame::from_log_line("02000100#6400").unwrap(),
            Frame::new_extended(0x0200_0100, &[0x64, 0x00])
        );
        assert_eq!(
            Frame::from_log_line("7ff#01").unwrap(),
            Frame::new_standard(0x7FF, &[0x01])
        );
    }

    #[test]
    fn test_from_log_line_standard() {
        let frame = Frame::from_log_line("123#01020304050607").unwrap();
        assert_eq!(frame.id, 0x123);
        assert_eq!(frame.len, 7);
        assert!(!frame.is_extended());
        assert_eq!(frame.payload(), &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07]);
        assert_eq!(frame.data[7], 0); // 未使用部分为 0
    }

    #[test]
    fn test_from_log_line_extended() {
        let frame = Frame::from_log_line("02000100#6400").unwrap();
        assert_eq!(frame.id, 0x0200_0100 | CAN_EFF_FLAG);
        assert!(frame.is_extended());
        assert_eq!(frame.raw_id(), 0x0200_0100);
        assert_eq!(frame.payload(), &[0x64, 0x00]);
    }

    #[test]
    fn test_from_log_line_lowercase_hex() {
        let frame = Frame::from_log_line("7ff#9c64").unwrap();
        assert_eq!(frame.id, 0x7FF);
        assert_eq!(frame.payload(), &[0x9C, 0x64]);
    }

    #[test]
    fn test_from_log_line_zero_payload_bytes() {
        let frame = Frame::from_log_line("000#0000").unwrap();
        assert_eq!(frame.id, 0);
        assert_eq!(frame.len, 2);
        assert_eq!(frame.payload(), &[0, 0]);
    }

    #[test]
    fn test_from_log_line_full_payload() {
        let frame = Frame::from_log_line("123#0102030405060708").unwrap();
        assert_eq!(frame.len, 8);
        assert_eq!(frame.data, [1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_from_log_line_rejections() {
        assert!(matches!(
            Frame::from_log_line("00x#0000"),
            Err(ProtocolError::InvalidHex { field: "id", .. })
        ));
        assert_eq!(
            Frame::from_log_line("0000#00"),
            Err(ProtocolError::InvalidIdWidth { width: 4 })
        );
        assert_eq!(
            Frame::from_log_line("000#000"),
            Err(ProtocolError::OddDataLength { len: 3 })
        );
        assert_eq!(Frame::from_log_line("000#"), Err(ProtocolError::MissingData));
        assert_eq!(
            Frame::from_log_line("123#R"),
            Err(ProtocolError::RemoteFrameUnsupported)
        );
        assert_eq!(
            Frame::from_log_line("123"),
            Err(ProtocolError::InvalidSeparator)
        );
        assert_eq!(
            Frame::from_log_line("123##0102"),
            Err(ProtocolError::InvalidSeparator)
        );
        assert_eq!(
            Frame::from_log_line("123#010203040506070809"),
            Err(ProtocolError::DataTooLong { len: 18 })
        );
        assert!(matches!(
            Frame::from_log_line("123#zz"),
            Err(ProtocolError::InvalidHex { field: "data", .. })
        ));
    }

    #[test]
    fn test_encode_layout() {
        let mut frame = Frame::from_log_line("02000100#649C").unwrap();
        frame.reserved = [0xA1, 0xB2, 0xC3];
        let bytes = frame.encode().unwrap();

        // ID 小端
        assert_eq!(&bytes[0..4], &[0x00, 0x01, 0x00, 0x82]);
        assert_eq!(bytes[4], 2);
        assert_eq!(&bytes[5..8], &[0xA1, 0xB2, 0xC3]);
        assert_eq!(&bytes[8..10], &[0x64, 0x9C]);
        assert_eq!(&bytes[10..16], &[0; 6]);
    }

    #[test]
    fn test_encode_decode_preserves_reserved_and_filler() {
        let frame = Frame {
            id: 0x123,
            len: 2,
            reserved: [1, 2, 3],
            data: [0x10, 0x20, 0xFF, 0xEE, 0, 0, 0, 0x77],
        };
        let decoded = Frame::decode(&frame.encode().unwrap()).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_encode_frame_too_large() {
        let frame = Frame {
            id: 0x123,
            len: 9,
            ..Default::default()
        };
        assert_eq!(frame.encode(), Err(ProtocolError::FrameTooLarge { dlc: 9 }));
    }

    #[test]
    fn test_decode_short_buffer() {
        assert_eq!(
            Frame::decode(&[0u8; 8]),
            Err(ProtocolError::InvalidLength {
                expected: 16,
                actual: 8
            })
        );
    }

    #[test]
    fn test_decode_invalid_dlc() {
        let mut bytes = [0u8; FRAME_SIZE];
        bytes[4] = 12;
        assert_eq!(
            Frame::decode(&bytes),
            Err(ProtocolError::FrameTooLarge { dlc: 12 })
        );
    }

    #[test]
    fn test_new_standard_and_extended() {
        let frame = Frame::new_standard(0x123, &[1, 2, 3]);
        assert_eq!(frame.id, 0x123);
        assert_eq!(frame.len, 3);
        assert!(!frame.is_extended());

        let frame = Frame::new_extended(0x0200_0500, &[0xBE, 0xEF]);
        assert_eq!(frame.id, 0x8200_0500);
        assert_eq!(frame.raw_id(), 0x0200_0500);
        assert!(frame.is_extended());
    }

    #[test]
    fn test_data_truncation() {
        let data = [0u8; 12];
        let frame = Frame::new_standard(0x1, &data);
        assert_eq!(frame.len, 8);
    }

    #[test]
    fn test_display_log_format() {
        let frame = Frame::from_log_line("123#01020304050607").unwrap();
        assert_eq!(frame.to_string(), "123#01020304050607");

        let frame = Frame::from_log_line("02000100#9c64").unwrap();
        assert_eq!(frame.to_string(), "02000100#9C64");
    }

    #[test]
    fn test_from_str() {
        let frame: Frame = "000#0000".parse().unwrap();
        assert_eq!(frame.len, 2);
    }
}

//! I/O 抽象层.
//!
//! 为解复用器提供带缓冲的统一读取接口, 后端可以是文件、内存,
//! 或者调用方提供的读取/定位回调.

use std::fmt;
use std::io::{self, Read, Seek};
use violet_core::{VioletError, VioletResult};

/// I/O 上下文
///
/// 封装底层 I/O 操作, 为解复用器提供统一的数据读取接口.
pub struct IoContext {
    /// 内部 I/O 实现
    inner: Box<dyn IoBackend>,
    /// 读缓冲区
    buffer: Vec<u8>,
    /// 缓冲区中的有效数据长度
    buf_len: usize,
    /// 缓冲区当前读取位置
    buf_pos: usize,
}

/// I/O 后端 trait
///
/// 实现此 trait 以支持不同的输入来源.
pub trait IoBackend: Send {
    /// 读取数据到缓冲区, 返回 0 表示已到末尾
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    /// 定位 (seek)
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64>;
    /// 获取当前位置
    fn position(&mut self) -> io::Result<u64>;
    /// 获取总大小 (如果可知)
    fn size(&self) -> Option<u64>;
    /// 是否支持 seek
    fn is_seekable(&self) -> bool;
}

/// 默认缓冲区大小 (32 KB)
pub const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

impl IoContext {
    /// 从 I/O 后端创建上下文
    pub fn new(backend: Box<dyn IoBackend>) -> Self {
        Self {
            inner: backend,
            buffer: vec![0u8; DEFAULT_BUFFER_SIZE],
            buf_len: 0,
            buf_pos: 0,
        }
    }

    /// 以指定读缓冲区大小创建上下文
    pub fn with_buffer_size(backend: Box<dyn IoBackend>, buffer_size: usize) -> VioletResult<Self> {
        if buffer_size == 0 {
            return Err(VioletError::InvalidArgument("I/O 缓冲区大小不能为 0".into()));
        }
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(buffer_size).map_err(|e| {
            VioletError::ResourceExhausted(format!("无法分配 {} 字节 I/O 缓冲区: {}", buffer_size, e))
        })?;
        buffer.resize(buffer_size, 0);
        Ok(Self {
            inner: backend,
            buffer,
            buf_len: 0,
            buf_pos: 0,
        })
    }

    /// 从文件路径打开 (只读)
    pub fn open_read(path: &str) -> VioletResult<Self> {
        Ok(Self::new(Box::new(FileBackend::open(path)?)))
    }

    /// 读缓冲区大小
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    // ========================
    // 读取方法
    // ========================

    /// 读取指定字节数, 数据不足时返回 `Eof`
    pub fn read_exact(&mut self, buf: &mut [u8]) -> VioletResult<()> {
        let mut total_read = 0;
        while total_read < buf.len() {
            let buffered = self.buf_len - self.buf_pos;
            if buffered > 0 {
                let to_copy = buffered.min(buf.len() - total_read);
                buf[total_read..total_read + to_copy]
                    .copy_from_slice(&self.buffer[self.buf_pos..self.buf_pos + to_copy]);
                self.buf_pos += to_copy;
                total_read += to_copy;
            } else {
                self.buf_pos = 0;
                self.buf_len = self.inner.read(&mut self.buffer)?;
                if self.buf_len == 0 {
                    return Err(VioletError::Eof);
                }
            }
        }
        Ok(())
    }

    /// 尽可能读取, 返回实际读取的字节数 (0 表示末尾)
    pub fn read_up_to(&mut self, buf: &mut [u8]) -> VioletResult<usize> {
        let mut total_read = 0;
        while total_read < buf.len() {
            match self.read_exact(&mut buf[total_read..total_read + 1]) {
                Ok(()) => total_read += 1,
                Err(VioletError::Eof) => break,
                Err(e) => return Err(e),
            }
            // 整块拷贝缓冲区中剩余数据
            let buffered = self.buf_len - self.buf_pos;
            let to_copy = buffered.min(buf.len() - total_read);
            buf[total_read..total_read + to_copy]
                .copy_from_slice(&self.buffer[self.buf_pos..self.buf_pos + to_copy]);
            self.buf_pos += to_copy;
            total_read += to_copy;
        }
        Ok(total_read)
    }

    /// 读取 1 个字节
    pub fn read_u8(&mut self) -> VioletResult<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// 读取 u16 小端
    pub fn read_u16_le(&mut self) -> VioletResult<u16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    /// 读取 u32 小端
    pub fn read_u32_le(&mut self) -> VioletResult<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// 读取 i32 小端
    pub fn read_i32_le(&mut self) -> VioletResult<i32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(i32::from_le_bytes(buf))
    }

    /// 读取 4 字节标签 (FourCC)
    pub fn read_tag(&mut self) -> VioletResult<[u8; 4]> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// 读取指定数量的字节
    pub fn read_bytes(&mut self, count: usize) -> VioletResult<Vec<u8>> {
        let mut buf = vec![0u8; count];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// 跳过指定字节数
    pub fn skip(&mut self, count: usize) -> VioletResult<()> {
        let buffered = self.buf_len - self.buf_pos;
        if count <= buffered {
            self.buf_pos += count;
            return Ok(());
        }

        let remaining = count - buffered;
        self.buf_pos = self.buf_len;

        if self.inner.is_seekable() {
            self.inner.seek(io::SeekFrom::Current(remaining as i64))?;
        } else {
            // 逐块丢弃读取的数据
            let mut left = remaining;
            while left > 0 {
                let to_read = left.min(self.buffer.len());
                self.buf_len = self.inner.read(&mut self.buffer[..to_read])?;
                if self.buf_len == 0 {
                    return Err(VioletError::Eof);
                }
                left -= self.buf_len;
            }
            self.buf_pos = 0;
            self.buf_len = 0;
        }
        Ok(())
    }

    // ========================
    // 定位方法
    // ========================

    /// 定位 (seek), 会清空读缓冲区
    pub fn seek(&mut self, pos: io::SeekFrom) -> VioletResult<u64> {
        self.buf_pos = 0;
        self.buf_len = 0;
        Ok(self.inner.seek(pos)?)
    }

    /// 获取当前位置 (扣除读缓冲区中尚未消耗的数据)
    pub fn position(&mut self) -> VioletResult<u64> {
        let raw_pos = self.inner.position()?;
        let buffered = (self.buf_len - self.buf_pos) as u64;
        Ok(raw_pos - buffered)
    }

    /// 是否支持随机访问
    pub fn is_seekable(&self) -> bool {
        self.inner.is_seekable()
    }

    /// 获取总大小
    pub fn size(&self) -> Option<u64> {
        self.inner.size()
    }
}

/// 文件 I/O 后端
pub struct FileBackend {
    file: std::fs::File,
    size: Option<u64>,
}

impl FileBackend {
    fn new(file: std::fs::File) -> Self {
        let size = file.metadata().ok().map(|m| m.len());
        Self { file, size }
    }

    /// 以只读方式打开文件
    pub fn open(path: &str) -> VioletResult<Self> {
        Ok(Self::new(std::fs::File::open(path)?))
    }
}

impl IoBackend for FileBackend {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }

    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }

    fn position(&mut self) -> io::Result<u64> {
        self.file.stream_position()
    }

    fn size(&self) -> Option<u64> {
        self.size
    }

    fn is_seekable(&self) -> bool {
        true
    }
}

/// 内存缓冲区 I/O 后端
pub struct MemoryBackend {
    /// 数据缓冲区
    data: Vec<u8>,
    /// 当前位置
    pos: usize,
}

impl MemoryBackend {
    /// 从已有数据创建
    pub fn from_data(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }
}

impl IoBackend for MemoryBackend {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.data.len().saturating_sub(self.pos);
        let to_read = buf.len().min(available);
        if to_read == 0 {
            return Ok(0);
        }
        buf[..to_read].copy_from_slice(&self.data[self.pos..self.pos + to_read]);
        self.pos += to_read;
        Ok(to_read)
    }

    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let new_pos = match pos {
            io::SeekFrom::Start(offset) => offset as i64,
            io::SeekFrom::End(offset) => self.data.len() as i64 + offset,
            io::SeekFrom::Current(offset) => self.pos as i64 + offset,
        };
        if new_pos < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek 位置不能为负",
            ));
        }
        self.pos = new_pos as usize;
        Ok(self.pos as u64)
    }

    fn position(&mut self) -> io::Result<u64> {
        Ok(self.pos as u64)
    }

    fn size(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }

    fn is_seekable(&self) -> bool {
        true
    }
}

// ========================
// 回调 I/O 后端
// ========================

/// 回调定位的基准
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOrigin {
    /// 相对开头
    Start,
    /// 相对当前位置
    Current,
    /// 相对末尾
    End,
    /// 不移动, 只询问总大小
    Size,
}

/// 读取回调: 返回读取字节数, 0 表示末尾
pub type ReadCallback = Box<dyn FnMut(&mut [u8]) -> io::Result<usize> + Send>;

/// 定位回调: 返回新的绝对位置 (`SeekOrigin::Size` 时返回总大小)
pub type SeekCallback = Box<dyn FnMut(i64, SeekOrigin) -> io::Result<u64> + Send>;

/// 由调用方回调驱动的 I/O 后端
///
/// 适用于输入来自应用自有流对象 (网络缓存、加密文件等) 的场景.
/// 没有定位回调时只能顺序读取.
pub struct CallbackBackend {
    read: ReadCallback,
    seek: Option<SeekCallback>,
    pos: u64,
    size: Option<u64>,
}

impl CallbackBackend {
    /// 创建回调后端, 有定位回调时立即询问一次总大小
    pub fn new(read: ReadCallback, mut seek: Option<SeekCallback>) -> Self {
        let size = seek
            .as_mut()
            .and_then(|seek_fn| seek_fn(0, SeekOrigin::Size).ok());
        Self {
            read,
            seek,
            pos: 0,
            size,
        }
    }
}

impl fmt::Debug for CallbackBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackBackend")
            .field("pos", &self.pos)
            .field("size", &self.size)
            .field("seekable", &self.seek.is_some())
            .finish()
    }
}

impl IoBackend for CallbackBackend {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = (self.read)(buf)?;
        self.pos += n as u64;
        Ok(n)
    }

    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let Some(seek_fn) = self.seek.as_mut() else {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "回调输入不支持 seek",
            ));
        };
        let (offset, origin) = match pos {
            io::SeekFrom::Start(offset) => (offset as i64, SeekOrigin::Start),
            io::SeekFrom::Current(offset) => (offset, SeekOrigin::Current),
            io::SeekFrom::End(offset) => (offset, SeekOrigin::End),
        };
        self.pos = seek_fn(offset, origin)?;
        Ok(self.pos)
    }

    fn position(&mut self) -> io::Result<u64> {
        Ok(self.pos)
    }

    fn size(&self) -> Option<u64> {
        self.size
    }

    fn is_seekable(&self) -> bool {
        self.seek.is_some()
    }
}

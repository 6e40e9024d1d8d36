//! 按流的数据包队列.
//!
//! 先进先出, 顺序即读取器观察到的容器存储顺序.
//! 队列本身不加锁, 只在会话锁内访问.

use std::collections::VecDeque;

use violet_codec::Packet;

/// 未解码数据包队列
#[derive(Debug, Default)]
pub struct PacketQueue {
    packets: VecDeque<Packet>,
}

impl PacketQueue {
    /// 创建空队列
    pub fn new() -> Self {
        Self::default()
    }

    /// 入队 (取得所有权)
    pub fn push(&mut self, packet: Packet) {
        self.packets.push_back(packet);
    }

    /// 出队
    pub fn pop(&mut self) -> Option<Packet> {
        self.packets.pop_front()
    }

    /// 队列中的包数
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// 丢弃全部未解码的包, 返回丢弃数量
    pub fn clear(&mut self) -> usize {
        let n = self.packets.len();
        self.packets.clear();
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(pts: i64) -> Packet {
        let mut pkt = Packet::from_data(vec![0u8; 4]);
        pkt.pts = pts;
        pkt
    }

    #[test]
    fn test_先进先出() {
        let mut q = PacketQueue::new();
        q.push(packet(1));
        q.push(packet(2));
        q.push(packet(3));
        assert_eq!(q.len(), 3);
        assert_eq!(q.pop().map(|p| p.pts), Some(1));
        assert_eq!(q.pop().map(|p| p.pts), Some(2));
        assert_eq!(q.pop().map(|p| p.pts), Some(3));
        assert!(q.pop().is_none());
    }

    #[test]
    fn test_清空() {
        let mut q = PacketQueue::new();
        assert_eq!(q.clear(), 0);
        q.push(packet(1));
        q.push(packet(2));
        assert_eq!(q.clear(), 2);
        assert!(q.is_empty());
    }
}

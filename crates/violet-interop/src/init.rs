//! 进程级初始化与库锁.
//!
//! [`ensure_initialized`] 在第一次调用时构建全局解码器与格式注册表,
//! 并通过 [`LockManager`] 创建库锁, 之后的调用直接返回同一份全局状态.
//! 解码器打开在库锁保护下进行.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use log::debug;
use parking_lot::{Condvar, Mutex};
use violet_codec::CodecRegistry;
use violet_core::{VioletError, VioletResult};
use violet_format::FormatRegistry;

/// 库锁: 获取/释放
pub trait LibraryLock: Send + Sync {
    /// 阻塞直到获得锁
    fn obtain(&self);

    /// 释放锁
    fn release(&self);
}

/// 库锁管理器, 负责创建锁; 锁的销毁由 `Arc` 释放完成
pub trait LockManager: Send + Sync {
    /// 创建一把新锁
    fn create_lock(&self) -> Arc<dyn LibraryLock>;
}

/// 库锁守卫, 离开作用域时释放锁
pub struct LockGuard<'a> {
    lock: &'a dyn LibraryLock,
}

impl<'a> LockGuard<'a> {
    /// 获取锁并返回守卫
    pub fn acquire(lock: &'a dyn LibraryLock) -> Self {
        lock.obtain();
        Self { lock }
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
    }
}

/// 默认库锁: 二值信号量, 允许在不同线程获取与释放
#[derive(Default)]
pub struct SemaphoreLock {
    held: Mutex<bool>,
    cond: Condvar,
}

impl LibraryLock for SemaphoreLock {
    fn obtain(&self) {
        let mut held = self.held.lock();
        while *held {
            self.cond.wait(&mut held);
        }
        *held = true;
    }

    fn release(&self) {
        *self.held.lock() = false;
        self.cond.notify_one();
    }
}

/// 默认库锁管理器
pub struct DefaultLockManager;

impl LockManager for DefaultLockManager {
    fn create_lock(&self) -> Arc<dyn LibraryLock> {
        Arc::new(SemaphoreLock::default())
    }
}

/// 全局状态
pub struct Globals {
    /// 解码器注册表
    pub codecs: CodecRegistry,
    /// 容器格式注册表
    pub formats: FormatRegistry,
    lock: Arc<dyn LibraryLock>,
}

impl Globals {
    /// 由已构建的注册表与库锁组成全局状态
    pub(crate) fn new(codecs: CodecRegistry, formats: FormatRegistry, lock: Arc<dyn LibraryLock>) -> Self {
        Self {
            codecs,
            formats,
            lock,
        }
    }

    /// 获取库锁
    pub fn lock(&self) -> LockGuard<'_> {
        LockGuard::acquire(self.lock.as_ref())
    }
}

static INITIALIZED: AtomicBool = AtomicBool::new(false);
static GLOBALS: OnceLock<Globals> = OnceLock::new();
static LOCK_MANAGER: Mutex<Option<Box<dyn LockManager>>> = Mutex::new(None);

/// 安装自定义库锁管理器, 必须在第一次初始化之前调用
pub fn set_lock_manager(manager: Box<dyn LockManager>) -> VioletResult<()> {
    let mut slot = LOCK_MANAGER.lock();
    if INITIALIZED.load(Ordering::Acquire) {
        return Err(VioletError::InvalidArgument(
            "初始化完成后无法替换库锁管理器".into(),
        ));
    }
    *slot = Some(manager);
    Ok(())
}

/// 是否已完成初始化
pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::Acquire)
}

/// 确保全局状态已初始化, 返回全局状态
///
/// 可在任意线程重复调用, 注册表只构建一次.
pub fn ensure_initialized() -> &'static Globals {
    if INITIALIZED.load(Ordering::Acquire) {
        if let Some(globals) = GLOBALS.get() {
            return globals;
        }
    }
    GLOBALS.get_or_init(|| {
        let mut codecs = CodecRegistry::new();
        violet_codec::register_all(&mut codecs);
        let mut formats = FormatRegistry::new();
        violet_format::register_all(&mut formats);

        let mut slot = LOCK_MANAGER.lock();
        let lock = match slot.take() {
            Some(manager) => manager.create_lock(),
            None => DefaultLockManager.create_lock(),
        };
        INITIALIZED.store(true, Ordering::Release);
        drop(slot);

        debug!(
            "全局初始化完成: {} 个解码器, {} 个解复用器",
            codecs.list_decoders().len(),
            formats.list_demuxers().len()
        );
        Globals::new(codecs, formats, lock)
    })
}

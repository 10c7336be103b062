// Scripted in-memory engine for tests and local development
//
// Every engine created by a `MockFactory` shares one script and one set of
// counters, so a test can flip behaviour mid-run and check that every
// opened context was closed.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use printworks_pool::{FactoryError, WorkerFactory, WorkerId};

use crate::artifact::EngineOutput;
use crate::engine::{RenderContext, RenderEngine};
use crate::error::EngineError;
use crate::options::RenderOptions;

/// Minimal well-formed document returned by the mock engine
pub const MOCK_PDF: &[u8] = b"%PDF-1.4\n% printworks mock\n%%EOF\n";

/// What the next render context does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MockBehavior {
    #[default]
    Succeed,
    /// Return the document as base64 text
    SucceedBase64,
    /// Return the document in several chunks
    SucceedChunked,
    FailOpen,
    FailLoad,
    /// Never become ready
    HangLoad,
    /// Never finish exporting
    HangExport,
    FailExport,
    /// Export bytes without a PDF signature
    Malformed,
    /// Export nothing
    Empty,
    /// Render fine but fail to close the context
    FailClose,
    /// Panic while exporting
    PanicExport,
}

#[derive(Default)]
struct Shared {
    behavior: Mutex<MockBehavior>,
    fail_launch: AtomicBool,
    created: AtomicUsize,
    destroyed: AtomicUsize,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

/// Factory producing scripted engines
#[derive(Clone, Default)]
pub struct MockFactory {
    shared: Arc<Shared>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(self, behavior: MockBehavior) -> Self {
        self.set_behavior(behavior);
        self
    }

    pub fn set_behavior(&self, behavior: MockBehavior) {
        *self.shared.behavior.lock() = behavior;
    }

    /// Make every subsequent launch fail
    pub fn set_fail_launch(&self, fail: bool) {
        self.shared.fail_launch.store(fail, Ordering::SeqCst);
    }

    pub fn engines_created(&self) -> usize {
        self.shared.created.load(Ordering::SeqCst)
    }

    pub fn engines_destroyed(&self) -> usize {
        self.shared.destroyed.load(Ordering::SeqCst)
    }

    pub fn contexts_opened(&self) -> usize {
        self.shared.opened.load(Ordering::SeqCst)
    }

    pub fn contexts_closed(&self) -> usize {
        self.shared.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkerFactory for MockFactory {
    type Instance = MockEngine;

    async fn create(&self, _id: WorkerId) -> Result<MockEngine, FactoryError> {
        if self.shared.fail_launch.load(Ordering::SeqCst) {
            return Err(FactoryError::Launch("mock engine refused to start".into()));
        }
        self.shared.created.fetch_add(1, Ordering::SeqCst);
        Ok(MockEngine {
            shared: Arc::clone(&self.shared),
        })
    }

    async fn destroy(&self, _id: WorkerId, _instance: MockEngine) -> Result<(), FactoryError> {
        self.shared.destroyed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Scripted engine instance
pub struct MockEngine {
    shared: Arc<Shared>,
}

impl MockEngine {
    /// Standalone engine, not tied to a factory
    pub fn new(behavior: MockBehavior) -> Self {
        let shared = Shared::default();
        *shared.behavior.lock() = behavior;
        Self {
            shared: Arc::new(shared),
        }
    }

    pub fn contexts_opened(&self) -> usize {
        self.shared.opened.load(Ordering::SeqCst)
    }

    pub fn contexts_closed(&self) -> usize {
        self.shared.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenderEngine for MockEngine {
    type Context = MockContext;

    async fn open_context(&self) -> Result<MockContext, EngineError> {
        let behavior = *self.shared.behavior.lock();
        if behavior == MockBehavior::FailOpen {
            return Err(EngineError::OpenContext("mock page crashed".into()));
        }
        self.shared.opened.fetch_add(1, Ordering::SeqCst);
        Ok(MockContext {
            behavior,
            shared: Arc::clone(&self.shared),
        })
    }
}

/// One scripted context
pub struct MockContext {
    behavior: MockBehavior,
    shared: Arc<Shared>,
}

#[async_trait]
impl RenderContext for MockContext {
    async fn load(&mut self, _content: &str) -> Result<(), EngineError> {
        match self.behavior {
            MockBehavior::FailLoad => Err(EngineError::Load("mock navigation failed".into())),
            _ => Ok(()),
        }
    }

    async fn wait_until_ready(&mut self) -> Result<(), EngineError> {
        if self.behavior == MockBehavior::HangLoad {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn export(&mut self, _options: &RenderOptions) -> Result<EngineOutput, EngineError> {
        use base64::Engine as _;

        match self.behavior {
            MockBehavior::HangExport => std::future::pending().await,
            MockBehavior::PanicExport => panic!("mock engine crashed"),
            MockBehavior::FailExport => Err(EngineError::Export("mock printer jammed".into())),
            MockBehavior::Malformed => Ok(EngineOutput::Bytes(b"<html></html>".to_vec())),
            MockBehavior::Empty => Ok(EngineOutput::Bytes(Vec::new())),
            MockBehavior::SucceedBase64 => Ok(EngineOutput::Base64(
                base64::engine::general_purpose::STANDARD.encode(MOCK_PDF),
            )),
            MockBehavior::SucceedChunked => Ok(EngineOutput::Chunks(
                MOCK_PDF.chunks(8).map(<[u8]>::to_vec).collect(),
            )),
            _ => Ok(EngineOutput::Bytes(MOCK_PDF.to_vec())),
        }
    }

    async fn close(&mut self) -> Result<(), EngineError> {
        self.shared.closed.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            MockBehavior::FailClose => Err(EngineError::Close("mock target already gone".into())),
            _ => Ok(()),
        }
    }
}

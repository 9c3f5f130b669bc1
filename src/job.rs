//! Background execution of rewrites and renders with cooperative cancellation.
//!
//! A render is one atomic unit of work: the token is checked once before it
//! starts and a render in flight always runs to completion. A rewrite also
//! checks after the generator returns, so a late result from a cancelled
//! request is discarded.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::JoinHandle;

use crate::error::{GenerateError, RenderError};
use crate::generate::{Progress, TextGenerator};
use crate::normalize::normalize;
use crate::page::PageSpec;
use crate::parser::build_flow;
use crate::render::{RenderReport, Renderer};

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub enum JobOutcome<T, E> {
    Cancelled,
    Finished(Result<T, E>),
}

impl<T, E> JobOutcome<T, E> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, JobOutcome::Cancelled)
    }
}

/// Text to render and where to put it.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub text: String,
    pub page: PageSpec,
    pub renderer: Renderer,
    pub destination: PathBuf,
}

impl RenderJob {
    pub fn run(self, token: &CancelToken) -> JobOutcome<RenderReport, RenderError> {
        if token.is_cancelled() {
            log::info!("PDF generation cancelled before starting");
            return JobOutcome::Cancelled;
        }

        let text = normalize(&self.text);
        let blocks = build_flow(&text);
        JobOutcome::Finished(self.renderer.render(&blocks, &self.page, &self.destination))
    }

    /// Run on tokio's blocking pool.
    pub fn spawn(self, token: CancelToken) -> JoinHandle<JobOutcome<RenderReport, RenderError>> {
        tokio::task::spawn_blocking(move || self.run(&token))
    }
}

/// Source text and the instruction to rewrite it with.
pub struct RewriteJob {
    pub generator: Arc<dyn TextGenerator>,
    pub source: String,
    pub instruction: String,
}

impl RewriteJob {
    pub async fn run(
        &self,
        token: &CancelToken,
        progress: Progress<'_>,
    ) -> JobOutcome<String, GenerateError> {
        if token.is_cancelled() {
            log::info!("Rewrite cancelled before starting");
            return JobOutcome::Cancelled;
        }

        let result = self
            .generator
            .generate(&self.source, &self.instruction, progress)
            .await;

        if token.is_cancelled() {
            log::info!("Rewrite was cancelled, discarding result");
            return JobOutcome::Cancelled;
        }
        JobOutcome::Finished(result)
    }
}

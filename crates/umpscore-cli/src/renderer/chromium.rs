//! Chromium-based renderer using chromiumoxide.
//!
//! Each context is a fresh page with CDP network listeners attached before
//! navigation. Listener tasks write into shared state; response bodies are
//! fetched with `Network.getResponseBody` when the caller drains them.

use super::{InteractionPlan, NavigationResult, ObservedRequest, RenderContext, Renderer};
use crate::config::{home_dir, ScrapeConfig};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
    EventResponseReceived, GetResponseBodyParams, RequestId,
};
use chromiumoxide::page::Page;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use umpscore::{CapturedResponse, Classifier};

/// Environment override for the Chromium binary.
pub const CHROMIUM_ENV: &str = "UMPSCORE_CHROMIUM_PATH";

/// Quiet period that counts as network idle.
const IDLE_QUIET: Duration = Duration::from_millis(500);
const IDLE_POLL: Duration = Duration::from_millis(100);

/// Find the Chromium binary path.
pub fn find_chromium(configured: Option<&Path>) -> Option<PathBuf> {
    // 1. UMPSCORE_CHROMIUM_PATH env
    if let Ok(p) = std::env::var(CHROMIUM_ENV) {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. chromium_path from config
    if let Some(path) = configured {
        if path.exists() {
            return Some(path.to_path_buf());
        }
    }

    // 3. ~/.umpscore/chromium/
    let local = home_dir().join("chromium");
    let candidates = if cfg!(target_os = "macos") {
        vec![
            local.join("chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
            local.join("chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
            local.join("chrome"),
        ]
    } else {
        vec![local.join("chrome-linux64/chrome"), local.join("chrome")]
    };
    if let Some(found) = candidates.into_iter().find(|c| c.exists()) {
        return Some(found);
    }

    // 4. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Chromium-based renderer. One browser process serves every context of a run.
pub struct ChromiumRenderer {
    browser: Browser,
    handler_task: JoinHandle<()>,
    classifier: Classifier,
    user_agent: String,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumRenderer {
    /// Launch a headless Chromium instance configured from `config`.
    pub async fn launch(config: &ScrapeConfig) -> Result<Self> {
        let chrome_path = find_chromium(config.chromium_path.as_deref()).context(
            "Chromium not found. Set UMPSCORE_CHROMIUM_PATH or run `umpscore doctor`.",
        )?;
        tracing::debug!("launching Chromium from {}", chrome_path.display());

        let browser_config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .window_size(1920, 1080)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg(format!("--user-agent={}", config.user_agent))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .context("failed to launch Chromium")?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("browser handler: {e}");
                }
            }
        });

        Ok(Self {
            browser,
            handler_task,
            classifier: Classifier::new(config.url_policy),
            user_agent: config.user_agent.clone(),
            active_count: Arc::new(AtomicUsize::new(0)),
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;

        page.execute(SetUserAgentOverrideParams::new(self.user_agent.clone()))
            .await
            .context("failed to set user agent")?;
        page.execute(EnableParams::default())
            .await
            .context("failed to enable network events")?;

        let state = Arc::new(Mutex::new(NetworkState::default()));
        let listeners = attach_listeners(&page, &state, self.classifier).await?;

        self.active_count.fetch_add(1, Ordering::Relaxed);

        Ok(Box::new(ChromiumContext {
            page,
            state,
            guard: ContextGuard {
                listeners,
                active_count: Arc::clone(&self.active_count),
            },
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        self.handler_task.abort();
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

/// A response that passed the classifier and is waiting for its body.
#[derive(Debug, Clone)]
struct Candidate {
    url: String,
    status: u16,
    content_type: String,
    observed_at: DateTime<Utc>,
}

/// Network bookkeeping for one page.
///
/// CDP events for a request arrive on separate listener tasks, so every
/// transition here accepts any arrival order.
#[derive(Debug)]
struct NetworkState {
    in_flight: HashSet<String>,
    /// Requests that finished or failed. A late `requestWillBeSent` for one of
    /// these does not reopen it.
    settled: HashSet<String>,
    finished: HashSet<String>,
    failed: HashSet<String>,
    last_activity: Instant,
    requests: Vec<ObservedRequest>,
    /// Classified responses in arrival order, waiting for their load to finish.
    candidates: Vec<(String, Candidate)>,
}

impl Default for NetworkState {
    fn default() -> Self {
        Self {
            in_flight: HashSet::new(),
            settled: HashSet::new(),
            finished: HashSet::new(),
            failed: HashSet::new(),
            last_activity: Instant::now(),
            requests: Vec::new(),
            candidates: Vec::new(),
        }
    }
}

impl NetworkState {
    fn on_request(&mut self, id: String, request: ObservedRequest) {
        if !self.settled.contains(&id) {
            self.in_flight.insert(id);
        }
        self.last_activity = Instant::now();
        self.requests.push(request);
    }

    fn on_candidate(&mut self, id: String, candidate: Candidate) {
        if !self.failed.contains(&id) {
            self.candidates.push((id, candidate));
        }
    }

    fn on_finished(&mut self, id: String) {
        self.settle(&id);
        self.finished.insert(id);
    }

    fn on_failed(&mut self, id: String) {
        self.settle(&id);
        self.candidates.retain(|(c, _)| *c != id);
        self.failed.insert(id);
    }

    fn settle(&mut self, id: &str) {
        self.in_flight.remove(id);
        self.settled.insert(id.to_string());
        self.last_activity = Instant::now();
    }

    fn is_idle(&self) -> bool {
        self.in_flight.is_empty() && self.last_activity.elapsed() >= IDLE_QUIET
    }

    /// Remove and return candidates whose load has finished.
    fn take_ready(&mut self) -> Vec<(String, Candidate)> {
        let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.candidates)
            .into_iter()
            .partition(|(id, _)| self.finished.contains(id));
        self.candidates = waiting;
        for (id, _) in &ready {
            self.finished.remove(id);
        }
        ready
    }
}

async fn attach_listeners(
    page: &Page,
    state: &Arc<Mutex<NetworkState>>,
    classifier: Classifier,
) -> Result<Vec<JoinHandle<()>>> {
    let mut requests = page
        .event_listener::<EventRequestWillBeSent>()
        .await
        .context("failed to listen for requests")?;
    let mut responses = page
        .event_listener::<EventResponseReceived>()
        .await
        .context("failed to listen for responses")?;
    let mut finished = page
        .event_listener::<EventLoadingFinished>()
        .await
        .context("failed to listen for finished loads")?;
    let mut failed = page
        .event_listener::<EventLoadingFailed>()
        .await
        .context("failed to listen for failed loads")?;

    let mut handles = Vec::with_capacity(4);

    let st = Arc::clone(state);
    handles.push(tokio::spawn(async move {
        while let Some(event) = requests.next().await {
            let request = ObservedRequest {
                url: event.request.url.clone(),
                method: event.request.method.clone(),
                resource_type: event.r#type.as_ref().map(|t| format!("{t:?}")),
                headers: serde_json::to_value(&event.request.headers).unwrap_or_default(),
                observed_at: Utc::now(),
            };
            st.lock()
                .await
                .on_request(event.request_id.inner().clone(), request);
        }
    }));

    let st = Arc::clone(state);
    handles.push(tokio::spawn(async move {
        while let Some(event) = responses.next().await {
            let url = &event.response.url;
            let status = u16::try_from(event.response.status).unwrap_or(0);
            let content_type = &event.response.mime_type;
            if !classifier.is_capturable(url, status, content_type) {
                tracing::debug!("not captured ({status}, {content_type}): {url}");
                continue;
            }
            tracing::info!("captured response: {url}");
            st.lock().await.on_candidate(
                event.request_id.inner().clone(),
                Candidate {
                    url: url.clone(),
                    status,
                    content_type: content_type.clone(),
                    observed_at: Utc::now(),
                },
            );
        }
    }));

    let st = Arc::clone(state);
    handles.push(tokio::spawn(async move {
        while let Some(event) = finished.next().await {
            st.lock()
                .await
                .on_finished(event.request_id.inner().clone());
        }
    }));

    let st = Arc::clone(state);
    handles.push(tokio::spawn(async move {
        while let Some(event) = failed.next().await {
            st.lock().await.on_failed(event.request_id.inner().clone());
        }
    }));

    Ok(handles)
}

/// Owns a context's listener tasks and its slot in the renderer's count.
/// Dropping it, on close or when the context is abandoned, tears both down.
struct ContextGuard {
    listeners: Vec<JoinHandle<()>>,
    active_count: Arc<AtomicUsize>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        for handle in &self.listeners {
            handle.abort();
        }
        self.active_count.fetch_sub(1, Ordering::Relaxed);
    }
}

/// A single Chromium page context.
pub struct ChromiumContext {
    page: Page,
    state: Arc<Mutex<NetworkState>>,
    guard: ContextGuard,
}

impl ChromiumContext {
    async fn wait_for_idle(&self, idle_timeout_ms: u64) -> bool {
        let deadline = Instant::now() + Duration::from_millis(idle_timeout_ms);
        loop {
            if self.state.lock().await.is_idle() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(IDLE_POLL).await;
        }
    }

    async fn fetch_body(&self, id: &str, candidate: Candidate) -> Option<CapturedResponse> {
        let body = match self
            .page
            .execute(GetResponseBodyParams::new(RequestId::new(id)))
            .await
        {
            Ok(resp) => resp.result,
            Err(e) => {
                tracing::warn!("could not read body of {}: {e}", candidate.url);
                return None;
            }
        };

        let text = if body.base64_encoded {
            match general_purpose::STANDARD.decode(body.body.as_bytes()) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    tracing::warn!("invalid base64 body from {}: {e}", candidate.url);
                    return None;
                }
            }
        } else {
            body.body
        };

        match CapturedResponse::from_raw(
            candidate.url.clone(),
            candidate.status,
            candidate.content_type,
            &text,
            candidate.observed_at,
        ) {
            Ok(response) => Some(response),
            Err(e) => {
                tracing::warn!("dropping unparseable response from {}: {e}", candidate.url);
                None
            }
        }
    }
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(
        &mut self,
        url: &str,
        timeout_ms: u64,
        idle_timeout_ms: u64,
    ) -> Result<NavigationResult> {
        let start = Instant::now();

        let result =
            tokio::time::timeout(Duration::from_millis(timeout_ms), self.page.goto(url)).await;

        match result {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => bail!("navigation failed: {e}"),
            Err(_) => bail!("navigation timed out after {timeout_ms}ms"),
        }

        let reached_idle = self.wait_for_idle(idle_timeout_ms).await;
        if !reached_idle {
            tracing::debug!("network not idle after {idle_timeout_ms}ms: {url}");
        }

        let final_url = self
            .page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| url.to_string());

        Ok(NavigationResult {
            final_url,
            load_time_ms: start.elapsed().as_millis() as u64,
            reached_idle,
        })
    }

    async fn settle(&mut self, ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    async fn interact(&mut self, plan: &InteractionPlan, delay_ms: u64) -> usize {
        let mut clicks = 0;
        for selector in &plan.selectors {
            let elements = match self.page.find_elements(selector.as_str()).await {
                Ok(elements) => elements,
                Err(_) => continue,
            };

            let mut clicked_here = 0;
            for element in elements {
                if clicked_here >= plan.per_selector_limit {
                    break;
                }
                if !plan.text_filter.is_empty() {
                    let text = element.inner_text().await.ok().flatten().unwrap_or_default();
                    if !plan.accepts_text(&text) {
                        continue;
                    }
                }
                match element.click().await {
                    Ok(_) => {
                        clicked_here += 1;
                        tracing::debug!("clicked {selector}");
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    }
                    Err(e) => tracing::warn!("click on {selector} failed: {e}"),
                }
            }
            clicks += clicked_here;
        }
        clicks
    }

    async fn take_responses(&mut self) -> Vec<CapturedResponse> {
        let ready = self.state.lock().await.take_ready();

        let mut out = Vec::with_capacity(ready.len());
        for (id, candidate) in ready {
            if let Some(response) = self.fetch_body(&id, candidate).await {
                out.push(response);
            }
        }
        out
    }

    async fn observed_requests(&self) -> Vec<ObservedRequest> {
        self.state.lock().await.requests.clone()
    }

    async fn get_html(&self) -> Result<String> {
        self.page.content().await.context("failed to get HTML")
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let ChromiumContext { page, guard, .. } = *self;
        drop(guard);
        let _ = page.close().await;
        Ok(())
    }
}

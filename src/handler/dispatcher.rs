//! Request dispatch
//!
//! Entry point of the preview core: resolves the request path against the
//! sitemap and either streams a static file or renders a template.

use crate::error::DispatchError;
use crate::handler::context::{RawEnvironment, RequestContext};
use crate::handler::path::{decode_path, IndexNormalizer, PathNormalizer};
use crate::handler::static_files::StaticSender;
use crate::hooks::{Hook, Hooks};
use crate::http::{set_content_type, ContentTypeOptions, FinalizedResponse, MimeRegistry};
use crate::logger;
use crate::render::{RenderError, Renderer};
use crate::sitemap::{Resource, Sitemap};
use hyper::StatusCode;
use std::sync::Arc;
use std::time::Instant;

/// Outcome of a pipeline stage
///
/// `Halt` carries the response that ends the request; `Continue` lets the
/// pipeline run on.
#[derive(Debug)]
pub enum Flow {
    Halt(FinalizedResponse),
    Continue,
}

/// Dispatches requests for one site
///
/// Holds only process-wide collaborators. Every per-request value lives in
/// the [`RequestContext`] created by [`Dispatcher::dispatch`], so one
/// dispatcher can serve any number of concurrent requests.
pub struct Dispatcher {
    sitemap: Arc<dyn Sitemap>,
    renderer: Arc<dyn Renderer>,
    registry: Arc<MimeRegistry>,
    normalizer: Arc<dyn PathNormalizer>,
    hooks: Arc<Hooks>,
    sender: StaticSender,
    logging: bool,
}

impl Dispatcher {
    pub fn new(
        sitemap: Arc<dyn Sitemap>,
        renderer: Arc<dyn Renderer>,
        registry: Arc<MimeRegistry>,
    ) -> Self {
        Self {
            sitemap,
            renderer,
            sender: StaticSender::new(Arc::clone(&registry)),
            registry,
            normalizer: Arc::new(IndexNormalizer::default()),
            hooks: Arc::new(Hooks::new()),
            logging: false,
        }
    }

    #[must_use]
    pub fn with_normalizer(mut self, normalizer: Arc<dyn PathNormalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: Arc<Hooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Log request start and finish lines
    #[must_use]
    pub const fn with_logging(mut self, logging: bool) -> Self {
        self.logging = logging;
        self
    }

    pub fn registry(&self) -> &MimeRegistry {
        &self.registry
    }

    /// Handle one request from start to finalized response
    ///
    /// Only failures the preview cannot answer itself come back as `Err`.
    pub async fn dispatch(&self, env: RawEnvironment) -> Result<FinalizedResponse, DispatchError> {
        let mut ctx = RequestContext::new(env);

        if self.logging {
            logger::log_request(ctx.env().path_info());
        }

        match self.process_request(&mut ctx).await? {
            Flow::Halt(response) => Ok(response),
            Flow::Continue => {
                logger::log_warning(&format!(
                    "No stage answered {}, falling back to 404",
                    ctx.env().path_info()
                ));
                ctx.response_mut().set_status(StatusCode::NOT_FOUND);
                Ok(ctx.finish())
            }
        }
    }

    /// Run the pipeline; every branch that serves something halts
    pub(crate) async fn process_request(
        &self,
        ctx: &mut RequestContext,
    ) -> Result<Flow, DispatchError> {
        let start_time = Instant::now();

        // Normalize the path and add index if we're looking at a directory
        let original_path = decode_path(ctx.env().path_info());
        let request_path = self.normalizer.normalize(&original_path);

        self.hooks.run_hook(Hook::Before);

        let Some(resource) = self.resolve(&original_path, &request_path) else {
            return Ok(Flow::Halt(not_found(ctx, &request_path)));
        };
        if resource.ignored {
            return Ok(Flow::Halt(not_found(ctx, &request_path)));
        }

        if resource.is_static() {
            let response = self.sender.send(&resource.source_file, ctx).await?;
            return Ok(Flow::Halt(response));
        }

        ctx.set_current_path(request_path.as_str());

        let declared = resource
            .mime_type
            .clone()
            .or_else(|| self.registry.lookup(resource.destination_extension().as_deref()));
        set_content_type(
            ctx.response_mut(),
            &self.registry,
            declared.as_deref(),
            &ContentTypeOptions::default(),
        )?;

        let outcome = self.render_off_thread(&resource, ctx).await;
        apply_render_outcome(outcome, &resource, ctx)?;

        if self.logging {
            logger::log_request_finished(&request_path, start_time.elapsed());
        }
        Ok(Flow::Halt(ctx.take_response().finish()))
    }

    /// Look up the decoded path first, then its normalized form
    fn resolve(&self, original_path: &str, request_path: &str) -> Option<Arc<Resource>> {
        let exact = if original_path == request_path {
            None
        } else {
            self.sitemap.find_resource_by_destination_path(original_path)
        };
        exact.or_else(|| self.sitemap.find_resource_by_destination_path(request_path))
    }

    /// Render on the blocking pool against a snapshot of the context
    async fn render_off_thread(
        &self,
        resource: &Arc<Resource>,
        ctx: &RequestContext,
    ) -> Result<Vec<u8>, RenderError> {
        let renderer = Arc::clone(&self.renderer);
        let resource = Arc::clone(resource);
        let snapshot = ctx.clone();
        tokio::task::spawn_blocking(move || renderer.render(&resource, &snapshot))
            .await
            .unwrap_or_else(|e| Err(RenderError::Interrupted(e.to_string())))
    }
}

/// Write a render result into the response; unrecoverable errors propagate
fn apply_render_outcome(
    outcome: Result<Vec<u8>, RenderError>,
    resource: &Resource,
    ctx: &mut RequestContext,
) -> Result<(), RenderError> {
    match outcome {
        Ok(bytes) => {
            let response = ctx.response_mut();
            response.write(&bytes);
            response.set_status(StatusCode::OK);
            Ok(())
        }
        Err(err) if err.is_recoverable() => {
            logger::log_warning(&format!(
                "Template not found while rendering {}: {err}",
                resource.destination_path
            ));
            let response = ctx.response_mut();
            response.write(format!("Error: {err}").as_bytes());
            response.set_status(StatusCode::INTERNAL_SERVER_ERROR);
            Ok(())
        }
        Err(err) => Err(err),
    }
}

/// Finalize a 404 for a path with no servable resource
fn not_found(ctx: &mut RequestContext, request_path: &str) -> FinalizedResponse {
    logger::log_not_found(request_path);
    let mut response = ctx.take_response();
    response.set_status(StatusCode::NOT_FOUND);
    if let Err(e) = response.set_content_type(crate::http::mime::HTML_UTF8) {
        logger::log_error(&e.to_string());
    }
    response.write(
        format!(
            "<html><body><h1>File Not Found</h1><p>{}</p></body>",
            escape_path(request_path)
        )
        .as_bytes(),
    );
    response.finish()
}

fn escape_path(path: &str) -> String {
    path.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::RawEnvironment;
    use crate::http::MimeError;
    use crate::sitemap::SourceSitemap;
    use http_body_util::BodyExt;
    use hyper::body::Bytes;
    use hyper::header::{CONTENT_ENCODING, CONTENT_TYPE};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Scripted renderer recording what it saw
    #[derive(Default)]
    struct FakeRenderer {
        calls: AtomicUsize,
        seen_content_type: Mutex<Vec<Option<String>>>,
        fail_with: Option<fn() -> RenderError>,
        delay_ms: u64,
    }

    impl Renderer for FakeRenderer {
        fn render(&self, resource: &Resource, ctx: &RequestContext) -> Result<Vec<u8>, RenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_content_type
                .lock()
                .unwrap()
                .push(ctx.response().content_type().map(ToString::to_string));
            if self.delay_ms > 0 {
                std::thread::sleep(std::time::Duration::from_millis(self.delay_ms));
            }
            if let Some(fail) = self.fail_with {
                return Err(fail());
            }
            Ok(format!(
                "rendered {} at {}",
                resource.destination_path,
                ctx.current_path().unwrap_or("-")
            )
            .into_bytes())
        }
    }

    struct Fixture {
        dir: TempDir,
        renderer: Arc<FakeRenderer>,
        dispatcher: Dispatcher,
    }

    fn fixture(renderer: FakeRenderer) -> Fixture {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("site.css"), b"body{}").unwrap();
        std::fs::write(dir.path().join("logo.svgz"), [0x1f, 0x8b]).unwrap();
        std::fs::write(dir.path().join("notes"), b"plain notes").unwrap();

        let sitemap = SourceSitemap::from_resources([
            Resource::template("index.html", dir.path().join("index.html.tmpl"))
                .with_mime_type("text/html;charset=utf8"),
            Resource::template("feed.xml", dir.path().join("feed.xml.tmpl")),
            Resource::template("blog/index.html", dir.path().join("blog.tmpl")),
            Resource::static_file("site.css", dir.path().join("site.css")),
            Resource::static_file("logo.svgz", dir.path().join("logo.svgz")),
            Resource::static_file("notes", dir.path().join("notes")),
            Resource::template("notes/index.html", dir.path().join("notes.tmpl")),
            Resource::static_file("secret.txt", dir.path().join("secret.txt")).ignored(),
        ]);

        let renderer = Arc::new(renderer);
        let dispatcher = Dispatcher::new(
            Arc::new(sitemap),
            Arc::clone(&renderer) as Arc<dyn Renderer>,
            Arc::new(MimeRegistry::with_defaults()),
        );
        Fixture {
            dir,
            renderer,
            dispatcher,
        }
    }

    async fn body_of(response: FinalizedResponse) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    async fn get(dispatcher: &Dispatcher, uri: &str) -> FinalizedResponse {
        dispatcher.dispatch(RawEnvironment::get(uri)).await.unwrap()
    }

    #[tokio::test]
    async fn test_missing_path_is_404() {
        let f = fixture(FakeRenderer::default());
        let response = get(&f.dispatcher, "/nowhere.html").await;
        assert_eq!(response.status(), 404);
        let body = body_of(response).await;
        assert!(String::from_utf8_lossy(&body).contains("File Not Found"));
        assert!(String::from_utf8_lossy(&body).contains("/nowhere.html"));
        assert_eq!(f.renderer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ignored_resource_is_404() {
        let f = fixture(FakeRenderer::default());
        std::fs::write(f.dir.path().join("secret.txt"), b"hidden").unwrap();
        let response = get(&f.dispatcher, "/secret.txt").await;
        assert_eq!(response.status(), 404);
        assert!(String::from_utf8_lossy(&body_of(response).await).contains("File Not Found"));
    }

    #[tokio::test]
    async fn test_static_resource_never_renders() {
        let f = fixture(FakeRenderer::default());
        let response = get(&f.dispatcher, "/site.css").await;
        assert_eq!(response.status(), 200);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "text/css;charset=utf-8"
        );
        assert_eq!(&body_of(response).await[..], b"body{}");
        assert_eq!(f.renderer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_svgz_through_dispatch() {
        let f = fixture(FakeRenderer::default());
        let response = get(&f.dispatcher, "/logo.svgz").await;
        assert_eq!(response.headers().get(CONTENT_ENCODING).unwrap(), "gzip");
    }

    #[tokio::test]
    async fn test_template_renders_with_current_path() {
        let f = fixture(FakeRenderer::default());
        let response = get(&f.dispatcher, "/").await;
        assert_eq!(response.status(), 200);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "text/html;charset=utf8"
        );
        assert_eq!(
            &body_of(response).await[..],
            b"rendered index.html at /index.html"
        );
    }

    #[tokio::test]
    async fn test_content_type_set_before_render() {
        let f = fixture(FakeRenderer {
            fail_with: Some(|| RenderError::TemplateNotFound("layout".to_string())),
            ..FakeRenderer::default()
        });
        get(&f.dispatcher, "/feed.xml").await;
        assert_eq!(
            *f.renderer.seen_content_type.lock().unwrap(),
            vec![Some("application/xml;charset=utf-8".to_string())]
        );
    }

    #[tokio::test]
    async fn test_template_not_found_is_500() {
        let f = fixture(FakeRenderer {
            fail_with: Some(|| {
                RenderError::TemplateNotFound("Could not locate partial: footer".to_string())
            }),
            ..FakeRenderer::default()
        });
        let response = get(&f.dispatcher, "/index.html").await;
        assert_eq!(response.status(), 500);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "text/html;charset=utf8"
        );
        assert_eq!(
            &body_of(response).await[..],
            b"Error: Could not locate partial: footer"
        );
    }

    #[tokio::test]
    async fn test_other_render_errors_propagate() {
        let f = fixture(FakeRenderer {
            fail_with: Some(|| RenderError::Syntax {
                path: "index.html.tmpl".into(),
                message: "unknown tag".to_string(),
            }),
            ..FakeRenderer::default()
        });
        let result = f.dispatcher.dispatch(RawEnvironment::get("/")).await;
        assert!(matches!(
            result,
            Err(DispatchError::Render(RenderError::Syntax { .. }))
        ));
    }

    #[tokio::test]
    async fn test_original_path_preferred() {
        // "/notes" exists as a file and "/notes/index.html" as a page
        let f = fixture(FakeRenderer::default());
        let response = get(&f.dispatcher, "/notes").await;
        assert_eq!(&body_of(response).await[..], b"plain notes");
        assert_eq!(f.renderer.calls.load(Ordering::SeqCst), 0);

        let response = get(&f.dispatcher, "/notes/").await;
        assert_eq!(
            &body_of(response).await[..],
            b"rendered notes/index.html at /notes/index.html"
        );
    }

    #[tokio::test]
    async fn test_directory_falls_back_to_index() {
        let f = fixture(FakeRenderer::default());
        let response = get(&f.dispatcher, "/blog").await;
        assert_eq!(response.status(), 200);
        assert_eq!(
            &body_of(response).await[..],
            b"rendered blog/index.html at /blog/index.html"
        );
    }

    #[tokio::test]
    async fn test_percent_encoded_path() {
        let f = fixture(FakeRenderer::default());
        let response = get(&f.dispatcher, "/site%2Ecss").await;
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn test_before_hook_runs_per_dispatch() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut hooks = Hooks::new();
        let seen = Arc::clone(&counter);
        hooks.register(Hook::Before, move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        let f = fixture(FakeRenderer::default());
        let dispatcher = f.dispatcher.with_hooks(Arc::new(hooks));

        get(&dispatcher, "/").await;
        get(&dispatcher, "/missing").await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_every_branch_halts() {
        let f = fixture(FakeRenderer::default());
        for uri in ["/", "/site.css", "/missing.html", "/secret.txt", "/blog/"] {
            let mut ctx = RequestContext::new(RawEnvironment::get(uri));
            let flow = f.dispatcher.process_request(&mut ctx).await.unwrap();
            assert!(matches!(flow, Flow::Halt(_)), "{uri} fell through");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_dispatches_stay_isolated() {
        let f = fixture(FakeRenderer {
            delay_ms: 20,
            ..FakeRenderer::default()
        });
        let dispatcher = Arc::new(f.dispatcher);

        let tasks: Vec<_> = ["/", "/blog/", "/feed.xml", "/notes/"]
            .into_iter()
            .cycle()
            .take(16)
            .map(|uri| {
                let dispatcher = Arc::clone(&dispatcher);
                tokio::spawn(async move {
                    let response = dispatcher
                        .dispatch(RawEnvironment::get(uri))
                        .await
                        .unwrap();
                    (uri, body_of(response).await)
                })
            })
            .collect();

        for task in tasks {
            let (uri, body) = task.await.unwrap();
            let body = String::from_utf8(body.to_vec()).unwrap();
            let expected = match uri {
                "/" => "rendered index.html at /index.html",
                "/blog/" => "rendered blog/index.html at /blog/index.html",
                "/feed.xml" => "rendered feed.xml at /feed.xml",
                _ => "rendered notes/index.html at /notes/index.html",
            };
            assert_eq!(body, expected);
        }
    }

    #[tokio::test]
    async fn test_slow_render_does_not_stall_local_dispatches() {
        let f = fixture(FakeRenderer {
            delay_ms: 400,
            ..FakeRenderer::default()
        });
        let dispatcher = Arc::new(f.dispatcher);

        // Same single-threaded LocalSet layout the server uses
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async move {
                let slow = tokio::task::spawn_local({
                    let dispatcher = Arc::clone(&dispatcher);
                    async move { dispatcher.dispatch(RawEnvironment::get("/")).await }
                });
                tokio::task::yield_now().await;

                let started = Instant::now();
                let missing = get(&dispatcher, "/missing.html").await;
                let elapsed = started.elapsed();
                assert_eq!(missing.status(), 404);
                assert!(
                    elapsed < std::time::Duration::from_millis(200),
                    "404 waited {elapsed:?} on an unrelated render"
                );

                let rendered = slow.await.unwrap().unwrap();
                assert_eq!(rendered.status(), 200);
            })
            .await;
        assert_eq!(f.renderer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_render_panic_is_fatal_error() {
        struct PanickingRenderer;
        impl Renderer for PanickingRenderer {
            fn render(&self, _: &Resource, _: &RequestContext) -> Result<Vec<u8>, RenderError> {
                panic!("renderer bug");
            }
        }

        let dispatcher = Dispatcher::new(
            Arc::new(SourceSitemap::from_resources([Resource::template(
                "index.html",
                "index.html.tmpl",
            )])),
            Arc::new(PanickingRenderer),
            Arc::new(MimeRegistry::with_defaults()),
        );
        let result = dispatcher.dispatch(RawEnvironment::get("/")).await;
        assert!(matches!(
            result,
            Err(DispatchError::Render(RenderError::Interrupted(_)))
        ));
    }

    #[tokio::test]
    async fn test_unknown_declared_type_escapes_dispatch() {
        let renderer = Arc::new(FakeRenderer::default());
        let dispatcher = Dispatcher::new(
            Arc::new(SourceSitemap::from_resources([
                Resource::template("x.page", "x.page.tmpl").with_mime_type("nope"),
            ])),
            Arc::clone(&renderer) as Arc<dyn Renderer>,
            Arc::new(MimeRegistry::with_defaults()),
        );

        let result = dispatcher.dispatch(RawEnvironment::get("/x.page")).await;
        match result {
            Err(DispatchError::MediaType(MimeError::UnknownMediaType(input))) => {
                assert_eq!(input, "nope");
            }
            other => panic!("expected an unknown media type error, got {other:?}"),
        }
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
    }
}

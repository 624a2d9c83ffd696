use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use clap::Parser;
use site_preview::cli::{Cli, Mode};
use site_preview::config::{AppState, Config};
use site_preview::error::AppError;
use site_preview::handler::{Dispatcher, IndexNormalizer};
use site_preview::hooks::{Hook, Hooks};
use site_preview::http::MimeRegistry;
use site_preview::logger;
use site_preview::render::TemplateRenderer;
use site_preview::server::{create_reusable_listener, signal, start_server_loop};
use site_preview::sitemap::{ScanOptions, SourceSitemap};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let cfg = Config::load_from(&cli.config).map_err(AppError::from)?;

    if cli.mode() == Mode::PrintConfig {
        print!("{}", toml::to_string_pretty(&cfg).map_err(AppError::from)?);
        return Ok(());
    }

    logger::init(&cfg)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg, cli.mode()))?;
    Ok(())
}

async fn async_main(cfg: Config, mode: Mode) -> Result<(), AppError> {
    let registry = Arc::new(MimeRegistry::with_defaults());
    registry.register_all(&cfg.mime);

    let scan_options = ScanOptions {
        template_suffix: cfg.site.template_suffix.clone(),
        ignore: cfg.site.ignore.clone(),
    };
    let sitemap = SourceSitemap::scan(&cfg.source_dir(), &registry, &scan_options)?;

    if mode == Mode::ListSitemap {
        println!("{}", sitemap.dump_json()?);
        return Ok(());
    }
    logger::log_sitemap_loaded(sitemap.len());

    let mut hooks = Hooks::new();
    let started_at = chrono::Local::now();
    hooks.register(Hook::Ready, move || {
        logger::log_debug(&format!("Ready at {}", started_at.to_rfc3339()));
    });
    let hooks = Arc::new(hooks);

    let dispatcher = Dispatcher::new(
        Arc::new(sitemap),
        Arc::new(TemplateRenderer::new(cfg.partials_dir())),
        registry,
    )
    .with_normalizer(Arc::new(IndexNormalizer::new(cfg.site.index_file.clone())))
    .with_hooks(Arc::clone(&hooks))
    .with_logging(cfg.logging.access_log);

    let addr = cfg.get_socket_addr()?;
    let listener = create_reusable_listener(addr)?;
    logger::log_server_start(&addr, &cfg);
    hooks.run_hook(Hook::Ready);

    let state = Arc::new(AppState::new(cfg, dispatcher));
    let active_connections = Arc::new(AtomicUsize::new(0));

    // Connections are served with spawn_local
    let local = tokio::task::LocalSet::new();
    local
        .run_until(start_server_loop(
            listener,
            state,
            active_connections,
            signal::shutdown_signal(),
        ))
        .await;
    Ok(())
}

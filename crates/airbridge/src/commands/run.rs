//! Long-running bridge: restore, poll, reconcile, persist on shutdown.

use std::sync::Arc;

use tracing::{debug, info, warn};

use airbridge_core::{AccessoryCache, AccessoryHost, AccessoryReconciler};

use crate::cli::{GlobalOpts, RunArgs};
use crate::error::CliError;
use crate::host::LoggingHost;

pub async fn handle(args: RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = super::load_settings(global)?;
    if let Some(interval) = args.interval {
        cfg.interval = interval;
    }
    if let Some(cache) = args.cache {
        cfg.accessory_cache = Some(cache);
    }
    let bridge = super::bridge_config(global, &cfg)?;

    let cache = AccessoryCache::new(cfg.accessory_cache_path());
    let cached = cache.load().unwrap_or_else(|e| {
        warn!(path = %cache.path().display(), error = %e, "ignoring unreadable accessory cache");
        Vec::new()
    });

    let host = Arc::new(LoggingHost::new(cache));
    let accessory_host: Arc<dyn AccessoryHost> = host.clone();
    let reconciler = Arc::new(AccessoryReconciler::from_config(&bridge, accessory_host)?);

    host.attach(reconciler.restore(cached)?);
    info!(
        accessories = host.count(),
        interval_ms = cfg.interval,
        cache = %host.cache().path().display(),
        "bridge starting"
    );

    let poller = reconciler.start_polling(bridge.poll_interval);
    let mut updates = reconciler.device_client().subscribe_updates();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            res = &mut shutdown => {
                res?;
                info!("shutdown requested");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let at = *updates.borrow_and_update();
                debug!(?at, "device set updated");
                host.sample();
            }
        }
    }

    poller.stop().await;
    host.persist(&reconciler.cached_accessories());
    info!(accessories = host.count(), "bridge stopped");
    Ok(())
}

//! 演示：发布配置中的服务实例，并为第一个服务建立一个动态解析的 balance channel。
//!
//! ```bash
//! ETCD_ENDPOINTS=http://127.0.0.1:2379 cargo run --bin flare-resolver-demo -- resolver.toml
//! ```

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use flare_resolver::{
    BalanceChannelConn, Config, EtcdResolverBuilder, Registrar, Resolver, SchemeRegistry,
    init_tracing,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load_from_file(&path)
            .with_context(|| format!("failed to load config from {}", path))?,
        None => {
            let mut config = Config::default();
            config.apply_env();
            config
        }
    };

    init_tracing(&config.telemetry)?;

    let builder = EtcdResolverBuilder::connect(&config)
        .await
        .context("failed to connect to etcd")?;

    let registrar = Registrar::new(builder.registry()).with_key_root(&config.registry.key_root);
    for instance in &config.instances {
        let id = instance
            .id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        registrar
            .publish(
                &instance.service,
                &id,
                &instance.addr,
                instance.weight,
                instance.metadata.clone(),
            )
            .await
            .with_context(|| format!("failed to register {}/{}", instance.service, id))?;
    }

    let service = config
        .instances
        .first()
        .map(|i| i.service.clone())
        .unwrap_or_else(|| "hello-service".to_string());

    let mut schemes = SchemeRegistry::new();
    schemes.register(Arc::new(builder))?;

    let (_channel, conn) = BalanceChannelConn::channel(64);
    let conn = Arc::new(conn.with_connect_timeout(Duration::from_secs(5)));

    let target = format!("{}:///{}", config.resolver.scheme, service);
    let resolver = schemes
        .dial(&target, conn.clone())
        .await
        .with_context(|| format!("failed to build resolver for {}", target))?;

    info!(target_uri = %target, endpoints = ?conn.endpoints().await, "Resolver running, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received (Ctrl+C)");
    resolver.close();

    Ok(())
}

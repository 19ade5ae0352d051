use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Context;
use dashmap::DashMap;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::watch;

use protocol::cipher::{CipherBinding, Direction};
use protocol::codec::{CodecLimits, FrameCodec};
use protocol::packets::build_hello;

use crate::connection::Connection;
use crate::directory::ServerDirectory;
use crate::dispatch::PacketDispatcher;
use crate::registry::CipherRegistry;
use crate::settings::Settings;

/// Accept-time connection ceilings, total and per remote address.
///
/// Enforced by the listener before a connection task is spawned; the packet
/// hot path never consults it.
pub struct ConnectionLimiter {
    per_address: DashMap<IpAddr, usize>,
    total: AtomicUsize,
    max_total: usize,
    max_per_address: usize,
}

impl ConnectionLimiter {
    #[must_use]
    pub fn new(max_total: usize, max_per_address: usize) -> Self {
        Self {
            per_address: DashMap::new(),
            total: AtomicUsize::new(0),
            max_total,
            max_per_address,
        }
    }

    /// Reserves a slot for a connection from `ip`. Returns false when
    /// either ceiling is reached.
    pub fn try_acquire(&self, ip: IpAddr) -> bool {
        if self.total.load(Ordering::Acquire) >= self.max_total {
            return false;
        }

        let mut count = self.per_address.entry(ip).or_insert(0);
        if *count >= self.max_per_address {
            return false;
        }
        *count += 1;
        drop(count);

        self.total.fetch_add(1, Ordering::AcqRel);
        true
    }

    /// Returns a slot previously reserved with [`Self::try_acquire`].
    pub fn release(&self, ip: IpAddr) {
        if let Some(mut count) = self.per_address.get_mut(&ip) {
            *count = count.saturating_sub(1);
        }
        self.per_address.remove_if(&ip, |_, count| *count == 0);
        let _ = self
            .total
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                Some(n.saturating_sub(1))
            });
    }

    #[must_use]
    pub fn active(&self) -> usize {
        self.total.load(Ordering::Acquire)
    }
}

/// Shared state driving every connection task.
pub struct GatewayRuntime {
    settings: Arc<Settings>,
    registry: Arc<CipherRegistry>,
    dispatcher: PacketDispatcher,
    limiter: ConnectionLimiter,
}

impl GatewayRuntime {
    #[must_use]
    pub fn new(
        settings: Arc<Settings>,
        registry: Arc<CipherRegistry>,
        directory: Arc<ServerDirectory>,
    ) -> Self {
        let limiter = ConnectionLimiter::new(
            settings.listener.max_connections,
            settings.listener.max_connections_per_address,
        );
        Self {
            dispatcher: PacketDispatcher::new(Arc::clone(&settings), directory),
            registry,
            limiter,
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Resolves the cipher pair serving this endpoint's clients. Unknown
    /// declared versions fall back to the configured default version.
    pub fn resolve_binding(&self) -> crate::error::Result<CipherBinding> {
        let declared = self.settings.default_client_version;
        self.registry.resolve_or_default(&declared).cloned()
    }

    #[must_use]
    pub fn limiter(&self) -> &ConnectionLimiter {
        &self.limiter
    }
}

/// Running listener; `close` (or dropping the handle) stops the accept
/// loop. Established connections drain on their own.
pub struct GatewayHandle {
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
}

impl GatewayHandle {
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn close(&self) {
        let _ = self.shutdown.send(true);
    }
}

/// Binds the listener and spawns the accept loop.
pub async fn start_gateway(runtime: Arc<GatewayRuntime>) -> anyhow::Result<GatewayHandle> {
    let listener_settings = &runtime.settings.listener;
    let bind_addr = format!("{}:{}", listener_settings.host, listener_settings.port)
        .parse::<SocketAddr>()
        .with_context(|| {
            format!(
                "invalid gateway bind address '{}:{}'",
                listener_settings.host, listener_settings.port
            )
        })?;

    let socket = match bind_addr {
        SocketAddr::V4(_) => TcpSocket::new_v4(),
        SocketAddr::V6(_) => TcpSocket::new_v6(),
    }
    .context("failed to create listener socket")?;
    socket
        .set_reuseaddr(true)
        .context("failed to configure listener socket")?;
    socket
        .bind(bind_addr)
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    let listener = socket
        .listen(listener_settings.backlog)
        .context("failed to listen")?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve listener address")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(accept_loop(listener, runtime, shutdown_rx));

    Ok(GatewayHandle {
        local_addr,
        shutdown: shutdown_tx,
    })
}

async fn accept_loop(
    listener: TcpListener,
    runtime: Arc<GatewayRuntime>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                log::info!("gateway listener shutting down");
                break;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, remote_addr)) => {
                        if !runtime.limiter.try_acquire(remote_addr.ip()) {
                            log::debug!("rejecting {}: connection limit reached", remote_addr);
                            continue;
                        }

                        let runtime = Arc::clone(&runtime);
                        tokio::spawn(async move {
                            let ip = remote_addr.ip();
                            if let Err(err) = handle_connection(stream, remote_addr, &runtime).await {
                                log::debug!("connection {} ended: {}", remote_addr, err);
                            }
                            runtime.limiter.release(ip);
                        });
                    }
                    Err(err) => {
                        log::warn!("accept failed: {}", err);
                    }
                }
            }
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    remote_addr: SocketAddr,
    runtime: &GatewayRuntime,
) -> anyhow::Result<()> {
    let local_addr = stream
        .local_addr()
        .context("failed to resolve accepted socket address")?;

    let binding = runtime
        .resolve_binding()
        .context("no cipher binding for this endpoint")?;
    let decryptor = binding.create_decryptor(Direction::ClientToServer);

    let mut connection = Connection::new(remote_addr, local_addr, &binding);
    log::info!("client connected from {}", remote_addr);

    connection.send(&build_hello());
    flush(&mut stream, &mut connection).await?;

    let codec = FrameCodec::new(CodecLimits {
        max_receive_size: runtime.settings.max_receive_size,
    });
    let mut buffer: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 512];

    while connection.is_open() {
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);

        while connection.is_open() {
            match codec.try_frame_len(&buffer) {
                Ok(Some(len)) => {
                    let frame: Vec<u8> = buffer.drain(..len).collect();
                    match decryptor.decrypt(&frame) {
                        Ok(decrypted) => {
                            runtime.dispatcher.dispatch(&mut connection, &decrypted);
                        }
                        Err(err) => {
                            log::debug!("undecodable frame from {}: {}", remote_addr, err);
                            connection.disconnect();
                        }
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    log::debug!("malformed stream from {}: {}", remote_addr, err);
                    connection.disconnect();
                }
            }
        }

        flush(&mut stream, &mut connection).await?;
    }

    let _ = stream.shutdown().await;
    log::info!("client disconnected from {}", remote_addr);
    Ok(())
}

async fn flush(stream: &mut TcpStream, connection: &mut Connection) -> anyhow::Result<()> {
    let pending = connection.take_output();
    if !pending.is_empty() {
        stream
            .write_all(&pending)
            .await
            .context("failed to write response bytes")?;
    }
    Ok(())
}

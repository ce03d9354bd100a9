use std::{
    fmt,
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use axum::Router;
use hyper::server::conn::http1;
use hyper_util::{
    rt::{TokioIo, TokioTimer},
    service::TowerToHyperService,
};
use lineage_core::LINEAGE_PATH;
use lineage_transport_tls::{
    CertificateOrigin, CertificatePaths, TlsAcceptor, ensure_certificate,
    remove_certificate_files, server_config,
};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{TcpListener, TcpStream},
    sync::watch,
    task::{JoinHandle, JoinSet},
    time,
};
use tracing::{debug, info, warn};

use crate::{CollectorConfig, CollectorError, EventSink, TransportMode, router};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// 收集器生命周期。
///
/// `Listening → Serving → ShuttingDown → Stopped`；进入 `ShuttingDown` 时端口已关闭，`Stopped` 为终态，证书文件已清理。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectorState {
    Listening,
    Serving,
    ShuttingDown,
    Stopped,
}

impl CollectorState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Listening => "listening",
            Self::Serving => "serving",
            Self::ShuttingDown => "shutting_down",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for CollectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 尚未启动的收集器：配置与摘要去向。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 把“构造”与“启动”分开：构造不触碰文件系统与网络，启动才准备证书并绑定端口；
/// - 启动成功后返回 [`RunningCollector`]，停机能力由它与 [`ShutdownHandle`] 显式持有，
///   不依赖进程级全局状态。
///
/// ## 逻辑（How）
/// 1. TLS 模式下先 [`ensure_certificate`] 再构造 `ServerConfig`，任一步失败都直接返回错误；
/// 2. 绑定 `bind_host:port`，端口为 0 时由操作系统分配，实际地址见 [`RunningCollector::local_addr`]；
/// 3. 派生服务任务：接受循环 + 每连接一个任务，连接任务统一挂在 `JoinSet` 上以便停机时收拢。
///
/// ## 契约（What）
/// - 启动失败时收集器从未进入 `Listening`；本次新生成的证书会被删除，复用的证书保持原样；
/// - 停机顺序：停止接受并关闭监听套接字 → 在宽限期内等待在途请求 → 删除证书 → `Stopped`。
///
/// ## 风险与权衡（Trade-offs）
/// - 宽限期结束仍未完成的连接会被强制中止，客户端可能看到连接被重置；
/// - 丢弃全部 [`RunningCollector`] 与 [`ShutdownHandle`] 等价于触发停机。
pub struct CollectorServer {
    config: CollectorConfig,
    sink: Arc<dyn EventSink>,
}

impl CollectorServer {
    pub fn new(config: CollectorConfig, sink: Arc<dyn EventSink>) -> Self {
        Self { config, sink }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// 准备证书、绑定端口并开始服务。
    pub async fn start(self) -> Result<RunningCollector, CollectorError> {
        let Self { config, sink } = self;
        let transport = config.transport;

        let (acceptor, credentials) = match transport {
            TransportMode::Plain => (None, None),
            TransportMode::SelfSignedTls => {
                let paths = config.certificate_paths();
                let material = ensure_certificate(&paths)?;
                let credentials = Credentials {
                    paths,
                    generated: material.origin == CertificateOrigin::Generated,
                    cleanup: config.cleanup_certificates,
                };
                match server_config(&material) {
                    Ok(tls) => (Some(TlsAcceptor::new(tls)), Some(credentials)),
                    Err(err) => {
                        credentials.discard_after_failed_start();
                        return Err(err.into());
                    }
                }
            }
        };

        let requested = SocketAddr::new(config.bind_host, config.effective_port());
        let bound = match TcpListener::bind(requested).await {
            Ok(listener) => listener.local_addr().map(|addr| (listener, addr)),
            Err(err) => Err(err),
        };
        let (listener, local_addr) = match bound {
            Ok(bound) => bound,
            Err(source) => {
                if let Some(credentials) = &credentials {
                    credentials.discard_after_failed_start();
                }
                return Err(CollectorError::Bind {
                    addr: requested,
                    source,
                });
            }
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(CollectorState::Listening);
        let handle = ShutdownHandle {
            shutdown: Arc::new(shutdown_tx),
            state: state_rx,
        };
        let endpoint = endpoint_url(transport, local_addr);
        info!(
            endpoint = %endpoint,
            transport = transport.scheme(),
            "lineage collector listening"
        );

        let serve = ServeLoop {
            listener,
            acceptor,
            router: router::router(sink),
            shutdown: shutdown_rx,
            state: state_tx,
            grace: config.shutdown_grace(),
            credentials: credentials.filter(|c| c.cleanup),
        };
        let task = tokio::spawn(serve.run());

        Ok(RunningCollector {
            local_addr,
            transport,
            endpoint,
            handle,
            task,
        })
    }
}

/// 正在运行的收集器。
///
/// 通过 [`RunningCollector::shutdown`] 或任意 [`ShutdownHandle`] 停机；
/// [`RunningCollector::wait`] 在服务任务结束（即到达 `Stopped`）后返回。
pub struct RunningCollector {
    local_addr: SocketAddr,
    transport: TransportMode,
    endpoint: String,
    handle: ShutdownHandle,
    task: JoinHandle<()>,
}

impl RunningCollector {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn transport(&self) -> TransportMode {
        self.transport
    }

    /// 生产者应投递的完整地址；监听在通配地址时以回环地址呈现。
    pub fn endpoint_url(&self) -> &str {
        &self.endpoint
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> CollectorState {
        self.handle.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<CollectorState> {
        self.handle.state.clone()
    }

    /// 等待服务任务结束。
    pub async fn wait(self) -> Result<(), CollectorError> {
        // 句柄须存活到任务结束，否则停机信号的发送端被丢弃会被视为停机请求。
        let Self {
            task,
            handle: _handle,
            ..
        } = self;
        task.await?;
        Ok(())
    }

    /// 触发停机并等待完成。
    pub async fn shutdown(self) -> Result<(), CollectorError> {
        self.handle.trigger();
        self.wait().await
    }
}

impl fmt::Debug for RunningCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunningCollector")
            .field("local_addr", &self.local_addr)
            .field("transport", &self.transport)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// 可克隆的停机句柄，适合交给信号处理任务。
///
/// # 教案式说明
/// - **契约（What）**：`trigger` 只发出请求、立即返回；`shutdown` 发出请求并等到 `Stopped`；
/// - **幂等**：重复调用任何一个方法都安全，停机流程只执行一次，已停机后调用立即返回。
#[derive(Clone, Debug)]
pub struct ShutdownHandle {
    shutdown: Arc<watch::Sender<bool>>,
    state: watch::Receiver<CollectorState>,
}

impl ShutdownHandle {
    pub fn trigger(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.shutdown.borrow()
    }

    pub fn state(&self) -> CollectorState {
        *self.state.borrow()
    }

    pub async fn shutdown(&self) {
        self.trigger();
        let mut state = self.state.clone();
        let _ = state
            .wait_for(|state| *state == CollectorState::Stopped)
            .await;
    }
}

struct Credentials {
    paths: CertificatePaths,
    generated: bool,
    cleanup: bool,
}

impl Credentials {
    fn discard_after_failed_start(&self) {
        if self.generated {
            remove_certificate_files(&self.paths);
        }
    }
}

struct ServeLoop {
    listener: TcpListener,
    acceptor: Option<TlsAcceptor>,
    router: Router,
    shutdown: watch::Receiver<bool>,
    state: watch::Sender<CollectorState>,
    grace: Duration,
    credentials: Option<Credentials>,
}

impl ServeLoop {
    async fn run(self) {
        let Self {
            listener,
            acceptor,
            router,
            mut shutdown,
            state,
            grace,
            credentials,
        } = self;
        let mut connections = JoinSet::new();

        state.send_replace(CollectorState::Serving);
        loop {
            tokio::select! {
                biased;
                _ = requested(&mut shutdown) => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        connections.spawn(handle_connection(
                            stream,
                            peer,
                            acceptor.clone(),
                            router.clone(),
                            shutdown.clone(),
                        ));
                    }
                    Err(err) => {
                        warn!(error = %err, "accept failed");
                        time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(err) = joined {
                        warn!(error = %err, "connection task ended abnormally");
                    }
                }
            }
        }

        // 监听套接字先于排空关闭，排空期间的新连接直接被拒绝。
        drop(listener);
        state.send_replace(CollectorState::ShuttingDown);
        info!(in_flight = connections.len(), "lineage collector shutting down");
        drain(&mut connections, grace).await;
        if let Some(credentials) = credentials {
            remove_certificate_files(&credentials.paths);
        }
        state.send_replace(CollectorState::Stopped);
        info!("lineage collector stopped");
    }
}

async fn requested(shutdown: &mut watch::Receiver<bool>) {
    // 发送端全部被丢弃时同样视为停机请求。
    let _ = shutdown.wait_for(|requested| *requested).await;
}

async fn drain(connections: &mut JoinSet<()>, grace: Duration) {
    if connections.is_empty() {
        return;
    }
    let finished = time::timeout(grace, async {
        while connections.join_next().await.is_some() {}
    })
    .await;
    if finished.is_err() {
        warn!(
            remaining = connections.len(),
            grace_ms = grace.as_millis() as u64,
            "grace period elapsed, aborting connections"
        );
        connections.shutdown().await;
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    acceptor: Option<TlsAcceptor>,
    router: Router,
    shutdown: watch::Receiver<bool>,
) {
    let Some(acceptor) = acceptor else {
        serve_http(stream, peer, router, shutdown).await;
        return;
    };
    match acceptor.accept(stream).await {
        Ok(tls) => serve_http(tls, peer, router, shutdown).await,
        Err(err) => debug!(
            %peer,
            code = err.code(),
            class = ?err.class(),
            error = %err,
            "tls handshake failed"
        ),
    }
}

async fn serve_http<IO>(io: IO, peer: SocketAddr, router: Router, mut shutdown: watch::Receiver<bool>)
where
    IO: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let connection = http1::Builder::new()
        .timer(TokioTimer::new())
        .serve_connection(TokioIo::new(io), TowerToHyperService::new(router));
    tokio::pin!(connection);

    let mut draining = false;
    loop {
        tokio::select! {
            result = connection.as_mut() => {
                if let Err(err) = result {
                    debug!(%peer, error = %err, "connection closed with error");
                }
                break;
            }
            _ = requested(&mut shutdown), if !draining => {
                draining = true;
                connection.as_mut().graceful_shutdown();
            }
        }
    }
}

fn endpoint_url(transport: TransportMode, local_addr: SocketAddr) -> String {
    let host = match local_addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    format!(
        "{}://{}{}",
        transport.scheme(),
        SocketAddr::new(host, local_addr.port()),
        LINEAGE_PATH
    )
}

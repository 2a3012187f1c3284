use bundle_system::{BundleSources, LoadOrder, StaticBundles};
use grimm_core::{
    BundleError, Context, Environment, FnBundle, IdSpec, Locals, Permissions, RouteHandler,
};
use grimm_server::{
    ErrorPages, Grimm, GrimmConfig, Identity, PrivilegeDrop, PrivilegeError, StartupError,
    EXIT_PRIVILEGE_DROP,
};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Pretends the process already runs unprivileged.
struct Unprivileged;

impl PrivilegeDrop for Unprivileged {
    fn current(&self) -> Identity {
        Identity {
            uid: 1000,
            gid: 1000,
        }
    }

    fn drop_to(&self, _permissions: Option<&Permissions>) -> Result<Identity, PrivilegeError> {
        Ok(self.current())
    }
}

fn write(root: &Path, file: &str, contents: &str) {
    let path = root.join(file);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

fn local_env() -> Environment {
    let mut env = Environment::named("test");
    env.web.host = Some("127.0.0.1".into());
    env.web.port = 0;
    env
}

async fn get(addr: SocketAddr, path: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();

    let status = raw
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .unwrap();
    let body = raw
        .split_once("\r\n\r\n")
        .map(|(_, body)| body.to_string())
        .unwrap_or_default();
    (status, body)
}

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[tokio::test]
async fn test_bundle_routes_and_public_files_are_served() {
    let root = TempDir::new().unwrap();
    write(root.path(), "bundles/blog/index", "");
    write(root.path(), "bundles/blog/public/style.css", "h1 { color: red }");
    write(root.path(), "bundles/_errors/index", "");
    write(root.path(), "bundles/_errors/views/404.html", "<p>missing {{path}}</p>");
    write(root.path(), "public/robots.txt", "User-agent: *");

    let bundles = StaticBundles::new()
        .with(
            "blog",
            FnBundle::new(|ctx: Arc<dyn Context>, locals: Locals| async move {
                let greeting = format!("hello from {}", locals.name);
                ctx.get(
                    "/blog/hello",
                    RouteHandler::new(move |_req| {
                        let greeting = greeting.clone();
                        async move { greeting }
                    }),
                );
                Ok::<(), BundleError>(())
            }),
        )
        .with("_errors", ErrorPages);
    let config = GrimmConfig::standard(root.path(), local_env())
        .with_bundles(BundleSources::default().with(bundles))
        .with_privileges(Unprivileged);

    let grimm = Arc::new(Grimm::new(config).await.unwrap());
    let mut server = grimm.start().await.unwrap();
    let addr = server.local_addr();

    assert_eq!(get(addr, "/blog/hello").await, (200, "hello from blog".to_string()));
    assert_eq!(get(addr, "/blog/style.css").await, (200, "h1 { color: red }".to_string()));
    assert_eq!(get(addr, "/robots.txt").await, (200, "User-agent: *".to_string()));
    assert_eq!(
        get(addr, "/nowhere").await,
        (404, "<p>missing /nowhere</p>".to_string())
    );

    server.shutdown();
    server.wait().await.unwrap();
}

#[tokio::test]
async fn test_failed_privilege_drop_refuses_to_serve() {
    let root = TempDir::new().unwrap();
    std::fs::create_dir_all(root.path().join("bundles")).unwrap();
    let port = free_port();
    let mut env = local_env();
    env.web.port = port;
    env.permissions = Some(Permissions {
        user: IdSpec::Name("grimm-no-such-user".into()),
        group: IdSpec::Name("grimm-no-such-group".into()),
    });

    let grimm = Arc::new(
        Grimm::new(GrimmConfig::standard(root.path(), env))
            .await
            .unwrap(),
    );
    let err = grimm.start().await.err().unwrap();

    assert!(matches!(err, StartupError::PrivilegeDrop(_)));
    assert_eq!(err.exit_code(), EXIT_PRIVILEGE_DROP);
    assert!(TcpStream::connect(("127.0.0.1", port)).await.is_err());
}

#[tokio::test]
async fn test_missing_bundles_root_exits_with_two() {
    let root = TempDir::new().unwrap();
    let called = Arc::new(Mutex::new(false));
    let flag = called.clone();
    let bundles = StaticBundles::new().with(
        "_errors",
        FnBundle::new(move |_ctx, _locals| {
            *flag.lock() = true;
            std::future::ready(Ok::<(), BundleError>(()))
        }),
    );
    let config = GrimmConfig::standard(root.path(), local_env())
        .with_bundles(BundleSources::empty().with(bundles))
        .with_privileges(Unprivileged);

    let grimm = Arc::new(Grimm::new(config).await.unwrap());
    let err = grimm.start().await.err().unwrap();

    assert!(matches!(err, StartupError::Bundles(_)));
    assert_eq!(err.exit_code(), 2);
    assert!(!*called.lock());
}

#[tokio::test]
async fn test_lexicographic_dispatch_keeps_errors_last() {
    let root = TempDir::new().unwrap();
    let order = Arc::new(Mutex::new(Vec::new()));
    let bundles = StaticBundles::new();
    for name in ["shop", "_errors", "admin", "blog"] {
        write(root.path(), &format!("bundles/{name}/index"), "");
        let order = order.clone();
        bundles.register(
            name,
            FnBundle::new(move |_ctx, locals: Locals| {
                order.lock().push(locals.name);
                std::future::ready(Ok::<(), BundleError>(()))
            }),
        );
    }
    let config = GrimmConfig::standard(root.path(), local_env())
        .with_bundles(BundleSources::empty().with(bundles))
        .with_bundle_order(LoadOrder::Lexicographic);

    let grimm = Arc::new(Grimm::new(config).await.unwrap());
    let report = grimm.load_bundles().await.unwrap();

    assert_eq!(*order.lock(), vec!["admin", "blog", "shop", "_errors"]);
    assert_eq!(report.dispatched, *order.lock());
}

#[tokio::test]
async fn test_conflicting_bundle_routes_fail_before_binding() {
    let root = TempDir::new().unwrap();
    write(root.path(), "bundles/users/index", "");
    write(root.path(), "bundles/profiles/index", "");
    let bundles = StaticBundles::new()
        .with(
            "users",
            FnBundle::new(|ctx: Arc<dyn Context>, _locals: Locals| async move {
                ctx.get("/people/:id", RouteHandler::new(|_req| async { "user" }));
                Ok::<(), BundleError>(())
            }),
        )
        .with(
            "profiles",
            FnBundle::new(|ctx: Arc<dyn Context>, _locals: Locals| async move {
                ctx.get("/people/:name", RouteHandler::new(|_req| async { "profile" }));
                Ok::<(), BundleError>(())
            }),
        );
    let port = free_port();
    let mut env = local_env();
    env.web.port = port;
    let config = GrimmConfig::standard(root.path(), env)
        .with_bundles(BundleSources::empty().with(bundles))
        .with_privileges(Unprivileged);

    let grimm = Arc::new(Grimm::new(config).await.unwrap());
    let err = grimm.start().await.err().unwrap();

    assert!(matches!(err, StartupError::Routes(ref e) if e.path == "/people/:name"));
    assert_eq!(err.exit_code(), 1);
    assert!(TcpStream::connect(("127.0.0.1", port)).await.is_err());
}

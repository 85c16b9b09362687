mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{node, Fixture};
use svckit::runtime::{check, run, RunOptions, ShutdownOptions};
use svckit::{resolve_all, ReloadOptions};
use tokio_util::sync::CancellationToken;

fn options(fx: &Fixture, hot_reload: bool, shutdown: ShutdownOptions) -> RunOptions {
    RunOptions {
        services_dir: fx.dir.path().to_path_buf(),
        loader: fx.loader.clone(),
        hot_reload,
        reload: ReloadOptions {
            debounce: Duration::ZERO,
        },
        shutdown,
    }
}

#[tokio::test]
async fn check_rejects_cycles_without_constructing() {
    let fx = Fixture::new(&[("Left", &["Right"]), ("Right", &["Left"])]);
    fx.write("left.yaml", "Left", "v1");
    fx.write("right.yaml", "Right", "v1");

    let err = check(fx.dir.path(), fx.loader.as_ref()).await.unwrap_err();
    assert!(err.to_string().contains("cyclic dependency"), "{err}");
    assert_eq!(fx.builds("Left") + fx.builds("Right"), 0);
}

#[tokio::test]
async fn run_stops_when_the_shutdown_future_completes() {
    let fx = Fixture::new(&[("Base", &[]), ("Top", &["Base"])]);
    fx.write("base.yaml", "Base", "v1");
    fx.write("top.yaml", "Top", "v1");

    let opts = options(&fx, true, ShutdownOptions::Future(Box::pin(async {})));
    tokio::time::timeout(Duration::from_secs(10), run(opts))
        .await
        .expect("run should return after shutdown")
        .unwrap();

    assert_eq!(fx.builds("Base"), 1);
    assert_eq!(fx.builds("Top"), 1);
}

#[tokio::test]
async fn startup_failure_is_fatal() {
    let fx = Fixture::new(&[("Base", &[]), ("Top", &["Base"])]);
    fx.write_raw("base.yaml", "service: Base\nconfig:\n  fail: true\n");
    fx.write("top.yaml", "Top", "v1");

    let token = CancellationToken::new();
    let err = run(options(&fx, false, ShutdownOptions::Token(token)))
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("Base refused to start"), "{err:#}");
}

#[tokio::test]
async fn unknown_factory_in_manifest_fails_discovery() {
    let fx = Fixture::new(&[("Base", &[])]);
    fx.write("base.yaml", "Nope", "v1");

    let token = CancellationToken::new();
    let err = run(options(&fx, false, ShutdownOptions::Token(token)))
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("no factory registered for 'Nope'"), "{err:#}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn watcher_reloads_on_file_change() {
    let fx = Fixture::new(&[("Base", &[]), ("Top", &["Base"])]);
    fx.write("base.yaml", "Base", "v1");
    fx.write("top.yaml", "Top", "v1");

    let container = fx.container().await;
    resolve_all(&container).await.unwrap();

    let cancel = CancellationToken::new();
    let handle = Arc::new(fx.supervisor(&container))
        .watch(fx.dir.path(), cancel.clone())
        .unwrap();

    fx.write("base.yaml", "Base", "v2");

    let reloaded = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            if let Some(top) = container.instance("top") {
                let base = &node(&top).deps[0];
                if node(base).tag == "v2" {
                    break;
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    assert!(reloaded.is_ok(), "watcher did not pick up the change");

    cancel.cancel();
    handle.await.unwrap();
    assert_eq!(node(&container.instance("base").unwrap()).tag, "v2");
}

#[tokio::test]
async fn shutdown_releases_instances() {
    let fx = Fixture::new(&[("Base", &[])]);
    fx.write("base.yaml", "Base", "v1");
    let container = fx.container().await;
    resolve_all(&container).await.unwrap();

    container.shutdown().await;
    assert!(container.instance("base").is_none());
    assert!(container.statuses().iter().all(|s| !s.live));
}

